//! hermod - turns a dirty working tree into validated conventional commits
//! and pushes them upstream.
//!
//! # Overview
//!
//! hermod inspects the repository for pending changes, stages each file,
//! validates it with pre-commit hooks (classifying the runner's free-text
//! output into structured decisions and auto-correcting what it can),
//! generates a Conventional Commits message for the staged diff via the
//! Claude Code CLI, commits, and publishes everything through a rebase-then-
//! push gate.

pub mod config;
pub mod error;
pub mod git;
pub mod hooks;
pub mod llm;
pub mod orchestrator;
pub mod secrets;

// Re-export commonly used types
pub use config::RunOptions;
pub use error::{
    ConfigError, GitError, HookError, LlmError, OrchestratorError, PushError, SecretError,
};
pub use git::ChangeSet;
pub use hooks::{HookResult, HookStatus, ParserConfig, Template};
pub use llm::{CommitRecord, GeneratorConfig};
pub use orchestrator::{FileTask, Limits, Orchestrator, RunReport, TaskState};
