//! hermod - CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use git2::Repository;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hermod::config::RunOptions;
use hermod::git::{
    collect_change_set, commit_deleted_files, current_branch, log_change_stats, prepare, publish,
    unstage_all,
};
use hermod::hooks::{ParserConfig, PreCommitRunner, check_pre_commit_installed};
use hermod::llm::{ClaudeClient, GeneratorConfig, check_claude_installed};
use hermod::orchestrator::{Limits, Orchestrator, RunReport};
use hermod::secrets::SopsEncryptor;

/// Turn a dirty working tree into validated conventional commits and push them.
#[derive(Parser, Debug)]
#[command(name = "hermod")]
#[command(about = "Stage, validate, and commit pending changes with generated messages")]
#[command(version)]
struct Cli {
    /// Files to process (defaults to auto-detecting all pending changes)
    files: Vec<String>,

    /// Path to the git repository
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,

    /// Process and commit only one file, then exit
    #[arg(long)]
    oneshot: bool,

    /// Validate and generate but do not commit or push
    #[arg(long)]
    dry_run: bool,

    /// Skip pre-commit hook validation
    #[arg(long)]
    no_verify: bool,

    /// Skip the push gate (rebase before, push after)
    #[arg(long)]
    no_push: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "hermod=debug" } else { "hermod=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(report) if report.is_clean() => ExitCode::SUCCESS,
        Ok(report) => {
            for task in &report.failed {
                error!(
                    file = %task.path,
                    attempts = task.failure_count,
                    "could not be committed"
                );
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunReport> {
    // Step 1: Open the repository and make its root the working directory,
    // so hook and git subprocesses resolve paths the same way we do.
    let repo = Repository::discover(&cli.repo_path).context(
        "Not a git repository. Run hermod from within a git repository or pass --repo-path.",
    )?;
    let workdir = repo
        .workdir()
        .context("Bare repositories have no working tree to commit from")?
        .to_path_buf();
    std::env::set_current_dir(&workdir).context("Failed to enter repository root")?;

    // Step 2: Settings file, then CLI overrides.
    let mut options = RunOptions::load(&workdir).context("Failed to read settings")?;
    options.no_commit |= cli.dry_run;
    options.no_push |= cli.no_push;
    options.no_pre_commit |= cli.no_verify;

    // Step 3: Check prerequisites.
    if !options.no_pre_commit {
        check_pre_commit_installed()
            .await
            .context("pre-commit is required for hook validation (or pass --no-verify)")?;
    }
    check_claude_installed()
        .await
        .context("Claude Code CLI is required for message generation")?;

    // Step 4: Snapshot the pending work.
    let change_set = collect_change_set(&repo).context("Failed to read repository status")?;
    log_change_stats(&change_set);

    if change_set.is_empty() && cli.files.is_empty() {
        info!("working tree clean and nothing to push, exiting");
        return Ok(RunReport::default());
    }

    // Step 5: Reconcile with the remote before touching the index.
    let branch = current_branch(&repo).context("Failed to resolve current branch")?;
    if !options.no_push {
        prepare(&branch)
            .await
            .context("Failed to rebase onto the remote")?;
    }

    // Step 6: Deletions are committed up front with a fixed message, and
    // pre-staged files are unstaged so every path takes the same route.
    let deleted_commits = if options.no_commit {
        Vec::new()
    } else {
        commit_deleted_files(&repo, &change_set.deleted)
            .context("Failed to commit deleted files")?
    };
    unstage_all(&repo).context("Failed to unstage files")?;

    // Step 7: Build the work queue.
    let mut paths = if cli.files.is_empty() {
        change_set.work_paths()
    } else {
        cli.files.clone()
    };
    if cli.oneshot && paths.len() > 1 {
        info!("oneshot mode, processing first file only");
        paths.truncate(1);
    }

    // Step 8: Drive every file through the state machine.
    let hooks = PreCommitRunner;
    let client = ClaudeClient;
    let encryptor = SopsEncryptor;
    let generator_config = GeneratorConfig {
        save_responses: !options.no_save_api,
        ..GeneratorConfig::default()
    };

    let orchestrator = Orchestrator::new(
        &repo,
        &hooks,
        &client,
        &encryptor,
        options.clone(),
        ParserConfig::default(),
        generator_config,
        Limits::default(),
    );

    let report = orchestrator
        .run(paths)
        .await
        .context("Orchestration aborted")?;

    // Step 9: Publish everything that reached Done, the up-front deletion
    // commits, and anything that was already committed but not pushed.
    if options.no_push || options.no_commit {
        info!("push disabled, leaving commits local");
    } else if nothing_to_push(&report, deleted_commits.len(), change_set.unpushed_commits) {
        info!("nothing to push");
    } else {
        publish(&branch, options.no_flux)
            .await
            .context("Failed to push to the remote")?;
    }

    info!(
        done = report.done.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "run complete"
    );
    if !report.is_clean() {
        warn!("some files could not be committed, see the failure list");
    }

    Ok(report)
}

/// Whether the push step can be skipped outright.
///
/// Deletion commits made up front count even when every queued file ended
/// Skipped, as does anything committed before this run started.
fn nothing_to_push(report: &RunReport, deleted_commits: usize, unpushed_commits: usize) -> bool {
    report.done.is_empty() && deleted_commits == 0 && unpushed_commits == 0
}
