//! Change-set collection: the snapshot of work a run starts from.

use git2::{BranchType, Repository, Status, StatusOptions};
use tracing::info;

use crate::error::GitError;

/// Immutable snapshot of the repository's pending work, grouped by category.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub deleted: Vec<String>,
    pub untracked: Vec<String>,
    pub modified: Vec<String>,
    pub staged: Vec<String>,
    /// Local commits not yet on the upstream branch.
    pub unpushed_commits: usize,
}

impl ChangeSet {
    /// True when there is nothing to stage, commit, or push.
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty()
            && self.untracked.is_empty()
            && self.modified.is_empty()
            && self.staged.is_empty()
            && self.unpushed_commits == 0
    }

    /// Paths that enter the per-file work queue, in processing order.
    ///
    /// Staged paths are included because they are unstaged at startup and
    /// then handled like any other change.
    pub fn work_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for path in self
            .untracked
            .iter()
            .chain(self.modified.iter())
            .chain(self.staged.iter())
        {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }
}

/// Collect the current change set from the repository.
pub fn collect_change_set(repo: &Repository) -> Result<ChangeSet, GitError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(GitError::StatusFailed)?;

    let mut change_set = ChangeSet::default();

    for entry in statuses.iter() {
        let Some(path) = entry.path() else { continue };
        let status = entry.status();

        if status.contains(Status::WT_DELETED) {
            change_set.deleted.push(path.to_string());
        }
        if status.contains(Status::WT_NEW) {
            change_set.untracked.push(path.to_string());
        }
        if status.contains(Status::WT_MODIFIED) {
            change_set.modified.push(path.to_string());
        }
        if status.intersects(
            Status::INDEX_NEW
                | Status::INDEX_MODIFIED
                | Status::INDEX_DELETED
                | Status::INDEX_RENAMED
                | Status::INDEX_TYPECHANGE,
        ) {
            change_set.staged.push(path.to_string());
        }
    }

    change_set.unpushed_commits = count_unpushed_commits(repo)?;

    Ok(change_set)
}

/// Count commits on the current branch that the upstream does not have.
///
/// A branch with no upstream reports zero; the push gate surfaces the
/// missing-upstream condition when it matters.
fn count_unpushed_commits(repo: &Repository) -> Result<usize, GitError> {
    let head = match repo.head() {
        Ok(h) => h,
        // Unborn branch: nothing committed, nothing to push.
        Err(e)
            if e.code() == git2::ErrorCode::UnbornBranch
                || e.code() == git2::ErrorCode::NotFound =>
        {
            return Ok(0);
        }
        Err(e) => return Err(GitError::StatusFailed(e)),
    };

    if !head.is_branch() {
        return Err(GitError::DetachedHead);
    }

    let branch_name = head.shorthand().ok_or(GitError::DetachedHead)?.to_string();
    let branch = repo
        .find_branch(&branch_name, BranchType::Local)
        .map_err(GitError::StatusFailed)?;

    let Ok(upstream) = branch.upstream() else {
        return Ok(0);
    };

    let local_oid = head.target().ok_or(GitError::DetachedHead)?;
    let upstream_oid = upstream
        .get()
        .target()
        .ok_or_else(|| GitError::StatusFailed(git2::Error::from_str("upstream has no target")))?;

    let (ahead, _behind) = repo
        .graph_ahead_behind(local_oid, upstream_oid)
        .map_err(GitError::StatusFailed)?;

    Ok(ahead)
}

/// Log the snapshot's counts, one structured line per category.
pub fn log_change_stats(change_set: &ChangeSet) {
    info!(count = change_set.deleted.len(), "deleted files");
    info!(count = change_set.untracked.len(), "untracked files");
    info!(count = change_set.modified.len(), "modified files");
    info!(count = change_set.staged.len(), "staged files");
    info!(count = change_set.unpushed_commits, "unpushed commits");
}
