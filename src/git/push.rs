//! Push gate: reconcile with the remote before work, publish after.
//!
//! Network and ref-mutating operations shell out to the system `git` binary
//! so the user's credential helpers, SSH agent, and rebase configuration are
//! inherited.

use std::process::Stdio;

use git2::Repository;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{GitError, PushError};

/// The current branch and its remote, e.g. `("main", "origin")`.
pub struct BranchInfo {
    pub name: String,
    pub remote: String,
}

impl BranchInfo {
    pub fn upstream(&self) -> String {
        format!("{}/{}", self.remote, self.name)
    }
}

/// Discover the checked-out branch.
pub fn current_branch(repo: &Repository) -> Result<BranchInfo, GitError> {
    let head = repo.head().map_err(GitError::StatusFailed)?;
    if !head.is_branch() {
        return Err(GitError::DetachedHead);
    }
    let name = head.shorthand().ok_or(GitError::DetachedHead)?.to_string();

    let remote = repo
        .branch_upstream_remote(head.name().unwrap_or_default())
        .ok()
        .and_then(|buf| buf.as_str().map(String::from))
        .unwrap_or_else(|| "origin".to_string());

    Ok(BranchInfo { name, remote })
}

/// Rebase pending remote changes onto the local branch before work begins.
///
/// Sequence: fetch, stash uncommitted changes, rebase onto the upstream,
/// restore the stash. A failed stash pop is reported but not fatal; the
/// stash entry survives for manual recovery.
pub async fn prepare(branch: &BranchInfo) -> Result<(), PushError> {
    run_git(&["fetch", &branch.remote])
        .await
        .map_err(PushError::FetchFailed)?;

    if upstream_missing(branch).await? {
        return Err(PushError::NoUpstream(branch.name.clone()));
    }

    let stashed = working_tree_dirty().await?;
    if stashed {
        run_git(&[
            "stash",
            "push",
            "--include-untracked",
            "-m",
            "hermod: auto stash before rebase",
        ])
        .await
        .map_err(PushError::StashFailed)?;
    }

    let upstream = branch.upstream();
    let rebase_result = run_git(&["rebase", &upstream]).await;

    if let Err(e) = &rebase_result {
        // Leave the tree as git left it; conflict resolution is manual.
        warn!("rebase onto {upstream} failed: {e}");
    }

    if stashed {
        if let Err(e) = run_git(&["stash", "pop"]).await {
            warn!("could not restore stashed changes (kept in stash): {e}");
        }
    }

    rebase_result.map_err(|stderr| PushError::RebaseFailed { upstream, stderr })?;

    info!(branch = %branch.name, "rebased onto remote");
    Ok(())
}

/// Publish all local commits, then optionally nudge the GitOps reconciler.
pub async fn publish(branch: &BranchInfo, no_flux: bool) -> Result<(), PushError> {
    run_git(&["push", &branch.remote, &branch.name])
        .await
        .map_err(PushError::PushFailed)?;

    info!(branch = %branch.name, remote = %branch.remote, "pushed to remote");

    if !no_flux {
        reconcile_flux().await;
    }

    Ok(())
}

/// Ask flux to pick up the just-pushed commits.
///
/// Failure is a warning only: the commits are published and the reconciler
/// will catch up on its own interval.
async fn reconcile_flux() {
    if which::which("flux").is_err() {
        return;
    }

    match run_command("flux", &["reconcile", "source", "git", "flux-system"]).await {
        Ok(_) => info!("flux source reconciled"),
        Err(e) => warn!("flux reconcile failed: {e}"),
    }
}

async fn upstream_missing(branch: &BranchInfo) -> Result<bool, PushError> {
    let upstream = branch.upstream();
    let output = Command::new("git")
        .args(["rev-parse", "--verify", "--quiet", &upstream])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(PushError::GitUnavailable)?;
    Ok(!output.status.success())
}

async fn working_tree_dirty() -> Result<bool, PushError> {
    let output = run_git(&["status", "--porcelain"])
        .await
        .map_err(|e| PushError::StashFailed(format!("git status: {e}")))?;
    Ok(!output.trim().is_empty())
}

/// Run a git subcommand, returning stdout or the captured stderr.
///
/// Callers map the error onto the [`PushError`] variant for their step.
async fn run_git(args: &[&str]) -> Result<String, String> {
    run_command("git", args).await
}

async fn run_command(program: &str, args: &[&str]) -> Result<String, String> {
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(stderr.trim().to_string());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
