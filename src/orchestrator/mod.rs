//! Per-file orchestration: the staging → validation → commit state machine.
//!
//! Files are processed one at a time because the shared git index is not
//! safe for concurrent staging or committing. Each path moves through an
//! explicit [`FileTask`], and fixable hook failures loop the task back to
//! staging under a bounded requeue count. Unrecognized hook failures abort
//! the entire run; message-generation exhaustion fails only the one file.

pub mod task;

use std::collections::VecDeque;

use git2::Repository;
use tracing::{error, info, warn};

use crate::config::RunOptions;
use crate::error::OrchestratorError;
use crate::git::stage::{commit_staged, stage_path, staged_diff_for_path, unstage_all};
use crate::hooks::parser::{
    HookResult, HookStatus, ParserConfig, log_hook_result, parse_hook_output,
};
use crate::hooks::runner::HookRunner;
use crate::llm::client::CompletionClient;
use crate::llm::generate::{GeneratorConfig, generate_commit_message};
use crate::secrets::SecretEncryptor;

pub use task::{FileTask, Limits, TaskState};

/// What a round of hook validation means for the task.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HookDecision {
    /// Every block parsed to Passed or Skipped (Other is informational).
    Passed,
    /// A failure the orchestrator can correct, then re-stage and re-validate.
    Fixable(FixableReason),
    /// A failure with no recognized remediation.
    Terminal {
        hook_id: String,
        exit_code: i32,
        diagnostics: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FixableReason {
    /// A hook detected an unencrypted secret; encrypt in place.
    UnencryptedSecret,
    /// The hook rewrote the file itself; re-stage the corrected content.
    FilesModified,
}

/// Outcome of a full orchestration pass.
#[derive(Debug, Default)]
pub struct RunReport {
    pub done: Vec<String>,
    pub failed: Vec<FileTask>,
    pub skipped: Vec<String>,
}

impl RunReport {
    /// True when no file was left in the Failed set.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives every file of a run through the state machine.
pub struct Orchestrator<'a> {
    repo: &'a Repository,
    hooks: &'a dyn HookRunner,
    client: &'a dyn CompletionClient,
    encryptor: &'a dyn SecretEncryptor,
    options: RunOptions,
    parser_config: ParserConfig,
    generator_config: GeneratorConfig,
    limits: Limits,
}

impl<'a> Orchestrator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: &'a Repository,
        hooks: &'a dyn HookRunner,
        client: &'a dyn CompletionClient,
        encryptor: &'a dyn SecretEncryptor,
        options: RunOptions,
        parser_config: ParserConfig,
        generator_config: GeneratorConfig,
        limits: Limits,
    ) -> Self {
        Self {
            repo,
            hooks,
            client,
            encryptor,
            options,
            parser_config,
            generator_config,
            limits,
        }
    }

    /// Process every path in order.
    ///
    /// Terminal hook failures and staging failures abort the run; paths that
    /// exhaust message generation land in the report's Failed set and the
    /// run continues.
    pub async fn run(&self, paths: Vec<String>) -> Result<RunReport, OrchestratorError> {
        let mut queue: VecDeque<FileTask> = paths.into_iter().map(FileTask::new).collect();
        let mut report = RunReport::default();

        while let Some(mut task) = queue.pop_front() {
            info!(file = %task.path, "processing");
            self.process_file(&mut task).await?;

            match task.state {
                TaskState::Done => report.done.push(task.path.clone()),
                TaskState::Skipped => report.skipped.push(task.path.clone()),
                TaskState::Failed => {
                    warn!(file = %task.path, "left in failed set");
                    report.failed.push(task.clone());
                }
                other => {
                    // The state machine only exits on terminal states.
                    unreachable!("task '{}' finished in non-terminal state {other}", task.path)
                }
            }
        }

        Ok(report)
    }

    /// Drive one task from Pending to a terminal state.
    async fn process_file(&self, task: &mut FileTask) -> Result<(), OrchestratorError> {
        loop {
            // Pending → Staged. Staging failure is fatal for the whole run:
            // the shared index may be inconsistent.
            stage_path(self.repo, &task.path).map_err(|e| OrchestratorError::StagingFatal {
                path: task.path.clone(),
                source: e,
            })?;
            task.transition(TaskState::Staged);

            if self.options.no_pre_commit {
                task.transition(TaskState::HookPassed);
                break;
            }

            task.transition(TaskState::HookRunning);
            let run = self.hooks.run(&task.path).await?;
            let results = parse_hook_output(&run.output, &self.parser_config);
            for result in &results {
                log_hook_result(&task.path, result);
            }

            match decide(&results) {
                HookDecision::Passed => {
                    task.transition(TaskState::HookPassed);
                    break;
                }
                HookDecision::Fixable(reason) => {
                    task.transition(TaskState::HookFixableFailure);

                    // Without the toggle there is nothing we may do to the
                    // file; escalate before counting a requeue attempt.
                    if reason == FixableReason::UnencryptedSecret && !self.options.encrypt_secrets
                    {
                        task.transition(TaskState::HookTerminalFailure);
                        return Err(terminal_from_results(&task.path, &results));
                    }

                    if task.requeue_count >= self.limits.max_requeue {
                        task.transition(TaskState::HookTerminalFailure);
                        return Err(OrchestratorError::RequeueExhausted {
                            path: task.path.clone(),
                            attempts: task.requeue_count,
                        });
                    }
                    task.requeue_count += 1;

                    match reason {
                        FixableReason::UnencryptedSecret => {
                            info!(file = %task.path, "encrypting detected secret");
                            self.encryptor.encrypt(&task.path).await?;
                        }
                        FixableReason::FilesModified => {
                            info!(
                                file = %task.path,
                                attempt = task.requeue_count,
                                max = self.limits.max_requeue,
                                "rewritten by hook, restaging"
                            );
                        }
                    }

                    task.transition(TaskState::Requeued);
                    task.transition(TaskState::Pending);
                    continue;
                }
                HookDecision::Terminal {
                    hook_id,
                    exit_code,
                    diagnostics,
                } => {
                    task.transition(TaskState::HookTerminalFailure);
                    error!(
                        file = %task.path,
                        hook_id = %hook_id,
                        exit_code,
                        "hook failed with no recognized remediation"
                    );
                    return Err(OrchestratorError::HookTerminal {
                        path: task.path.clone(),
                        hook_id,
                        exit_code,
                        diagnostics,
                    });
                }
            }
        }

        // HookPassed → MessagePending → Committed → Done.
        self.generate_and_commit(task).await
    }

    /// Generate a message for the staged diff, then commit.
    async fn generate_and_commit(&self, task: &mut FileTask) -> Result<(), OrchestratorError> {
        let diff = staged_diff_for_path(self.repo, &task.path)?;
        if diff.trim().is_empty() {
            info!(file = %task.path, "nothing staged, skipping");
            task.transition(TaskState::Skipped);
            return Ok(());
        }

        task.transition(TaskState::MessagePending);

        loop {
            match generate_commit_message(self.client, &diff, &self.generator_config).await {
                Ok(record) => {
                    if self.options.no_commit {
                        info!(file = %task.path, "dry run, skipping commit");
                        task.transition(TaskState::Skipped);
                        return Ok(());
                    }

                    let oid = commit_staged(self.repo, &record.message)?;
                    info!(
                        file = %task.path,
                        commit = %oid,
                        fingerprint = %record.source_diff_fingerprint,
                        "committed"
                    );
                    task.transition(TaskState::Committed);
                    task.transition(TaskState::Done);
                    return Ok(());
                }
                Err(e) => {
                    if task.failure_count >= self.limits.max_failure {
                        // Exhausted: fail this file only, the run continues.
                        // Its staged content must not leak into the next
                        // file's commit.
                        error!(file = %task.path, "message generation exhausted: {e}");
                        unstage_all(self.repo)?;
                        task.transition(TaskState::Failed);
                        return Ok(());
                    }
                    task.failure_count += 1;
                    warn!(
                        file = %task.path,
                        attempt = task.failure_count,
                        max = self.limits.max_failure,
                        "message generation failed: {e}"
                    );
                }
            }
        }
    }
}

/// Fold a round of parsed hook results into one decision.
///
/// Any unrecognized failure wins over fixable ones: a broken hook may mean a
/// broken environment, and committing past it would be worse than stopping.
fn decide(results: &[HookResult]) -> HookDecision {
    let mut fixable: Option<FixableReason> = None;

    for result in results {
        if result.status != HookStatus::Failed {
            continue;
        }

        let secret = result.exceptions.iter().any(|e| e.unencrypted_secret());
        let modified = result.exceptions.iter().any(|e| e.modified_files());

        if secret {
            // Secrets outrank formatting: the encryption pass also rewrites
            // the file, so revalidation covers both.
            fixable = Some(FixableReason::UnencryptedSecret);
        } else if modified {
            fixable.get_or_insert(FixableReason::FilesModified);
        } else {
            return terminal_decision(result);
        }
    }

    match fixable {
        Some(reason) => HookDecision::Fixable(reason),
        None => HookDecision::Passed,
    }
}

fn terminal_decision(result: &HookResult) -> HookDecision {
    match result.exceptions.first() {
        Some(exception) => HookDecision::Terminal {
            hook_id: exception.hook_id.clone(),
            exit_code: exception.exit_code,
            diagnostics: exception.exception_messages.clone(),
        },
        None => HookDecision::Terminal {
            hook_id: result.message.clone(),
            exit_code: -1,
            diagnostics: vec![result.raw_message.clone()],
        },
    }
}

fn terminal_from_results(path: &str, results: &[HookResult]) -> OrchestratorError {
    for result in results {
        if result.status == HookStatus::Failed {
            if let HookDecision::Terminal {
                hook_id,
                exit_code,
                diagnostics,
            } = terminal_decision(result)
            {
                return OrchestratorError::HookTerminal {
                    path: path.to_string(),
                    hook_id,
                    exit_code,
                    diagnostics,
                };
            }
        }
    }
    OrchestratorError::HookTerminal {
        path: path.to_string(),
        hook_id: String::new(),
        exit_code: -1,
        diagnostics: Vec::new(),
    }
}
