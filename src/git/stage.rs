//! Staging, per-path diffing, and commit creation using git2.

use std::path::Path;

use git2::{DiffFormat, DiffOptions, ErrorCode, Oid, Repository, Tree};
use tracing::{debug, info};

use crate::error::GitError;

/// Resolve the HEAD tree, distinguishing empty-repo states from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found),
/// `Ok(Some(tree))` for repos with a valid HEAD.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(GitError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(GitError::DiffFailed)?;
    Ok(Some(tree))
}

/// Stage one path into the index.
///
/// A path missing from the working tree is staged as a removal.
pub fn stage_path(repo: &Repository, path: &str) -> Result<(), GitError> {
    let mut index = repo.index().map_err(|e| GitError::StagingFailed {
        path: path.to_string(),
        source: e,
    })?;

    let on_disk = repo
        .workdir()
        .map(|w| w.join(path).exists())
        .unwrap_or(false);

    let result = if on_disk {
        index.add_path(Path::new(path))
    } else {
        index.remove_path(Path::new(path))
    };
    result.map_err(|e| GitError::StagingFailed {
        path: path.to_string(),
        source: e,
    })?;

    index.write().map_err(|e| GitError::StagingFailed {
        path: path.to_string(),
        source: e,
    })?;

    debug!(file = path, "staged");
    Ok(())
}

/// Collect the staged diff (HEAD tree vs index) scoped to one path.
pub fn staged_diff_for_path(repo: &Repository, path: &str) -> Result<String, GitError> {
    let head_tree = resolve_head_tree(repo)?;

    let mut opts = DiffOptions::new();
    opts.pathspec(path);

    let diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))
        .map_err(GitError::DiffFailed)?;

    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        if origin == '+' || origin == '-' || origin == ' ' {
            text.push(origin);
        }
        text.push_str(std::str::from_utf8(line.content()).unwrap_or(""));
        true
    })
    .map_err(GitError::DiffFailed)?;

    Ok(text)
}

/// Commit whatever is currently staged with the given message.
///
/// Handles the unborn-branch case by creating a root commit.
pub fn commit_staged(repo: &Repository, message: &str) -> Result<Oid, GitError> {
    let mut index = repo.index().map_err(GitError::CommitFailed)?;
    let tree_id = index.write_tree().map_err(GitError::CommitFailed)?;
    let tree = repo.find_tree(tree_id).map_err(GitError::CommitFailed)?;

    let sig = repo.signature().map_err(GitError::ConfigError)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().map_err(GitError::CommitFailed)?),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(GitError::CommitFailed(e)),
    };
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, message.trim(), &tree, &parents)
        .map_err(GitError::CommitFailed)?;

    Ok(oid)
}

/// Reset the index to HEAD, de-staging everything.
///
/// Pre-staged files are handled through the same per-file workflow as
/// untracked and modified ones, so the run starts from a clean index.
pub fn unstage_all(repo: &Repository) -> Result<(), GitError> {
    let mut index = repo.index().map_err(GitError::UnstageFailed)?;

    match resolve_head_tree(repo)? {
        Some(tree) => index.read_tree(&tree).map_err(GitError::UnstageFailed)?,
        None => index.clear().map_err(GitError::UnstageFailed)?,
    }
    index.write().map_err(GitError::UnstageFailed)?;

    debug!("index reset to HEAD");
    Ok(())
}

/// Commit each deleted file up front with a fixed chore message.
///
/// Deletions carry no content worth a generated message, so they bypass the
/// completion service entirely.
pub fn commit_deleted_files(repo: &Repository, deleted: &[String]) -> Result<Vec<Oid>, GitError> {
    let mut oids = Vec::with_capacity(deleted.len());

    for path in deleted {
        let mut index = repo.index().map_err(|e| GitError::StagingFailed {
            path: path.clone(),
            source: e,
        })?;
        index
            .remove_path(Path::new(path))
            .map_err(|e| GitError::StagingFailed {
                path: path.clone(),
                source: e,
            })?;
        index.write().map_err(|e| GitError::StagingFailed {
            path: path.clone(),
            source: e,
        })?;

        let message = format!("chore({path}): deleted file");
        let oid = commit_staged(repo, &message)?;
        info!(file = %path, status = "committed", "deleted file");
        oids.push(oid);
    }

    Ok(oids)
}
