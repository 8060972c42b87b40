//! Error types for hermod modules using thiserror.

use thiserror::Error;

/// Errors from git inspection, staging, and commit operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to read repository status: {0}")]
    StatusFailed(#[source] git2::Error),

    #[error("Failed to stage '{path}': {source}")]
    StagingFailed {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to unstage files: {0}")]
    UnstageFailed(#[source] git2::Error),

    #[error("Failed to collect diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    ConfigError(#[source] git2::Error),

    #[error("Repository is in a detached-HEAD state; check out a branch first")]
    DetachedHead,
}

/// Errors from invoking the hook runner.
#[derive(Error, Debug)]
pub enum HookError {
    #[error(
        "pre-commit not found. Install with: pip install pre-commit (or brew install pre-commit)"
    )]
    NotInstalled,

    #[error("Failed to spawn hook runner: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Hook runner timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors from the completion service and message generation.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Claude Code CLI not found. Install with: npm install -g @anthropic-ai/claude-code")]
    NotInstalled,

    #[error("Failed to spawn completion process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Completion process timed out after {0} seconds")]
    Timeout(u64),

    #[error("Completion CLI exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Completion service returned an error: {0}")]
    ServiceError(String),

    #[error("Completion service returned an empty message")]
    EmptyResponse,

    #[error("Generated message does not follow 'type(scope): description', got: {0}")]
    InvalidMessage(String),

    #[error("All {attempts} generation attempts failed: {last}")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        last: Box<LlmError>,
    },

    #[error("Failed to persist raw response: {0}")]
    SaveFailed(#[source] std::io::Error),
}

/// Errors from the push gate (fetch / stash / rebase / push).
#[derive(Error, Debug)]
pub enum PushError {
    #[error("git fetch failed: {0}")]
    FetchFailed(String),

    #[error("git stash failed: {0}")]
    StashFailed(String),

    #[error("git rebase onto {upstream} failed: {stderr}")]
    RebaseFailed { upstream: String, stderr: String },

    #[error("git push failed: {0}")]
    PushFailed(String),

    #[error("Failed to run git: {0}")]
    GitUnavailable(#[source] std::io::Error),

    #[error("Branch '{0}' has no upstream. Push it first: git push --set-upstream origin {0}")]
    NoUpstream(String),
}

/// Errors from the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid setting on line {line}: '{text}' (expected KEY=value)")]
    InvalidLine { line: usize, text: String },
}

/// Errors from the secret-encryption remediation.
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("sops not found. Install with: brew install sops (or from the sops releases page)")]
    NotInstalled,

    #[error("Failed to spawn sops: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("sops failed to encrypt '{path}': {stderr}")]
    EncryptFailed { path: String, stderr: String },
}

/// Fatal orchestration errors that abort the entire run.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Staging failed for '{path}' (the shared index may be inconsistent): {source}")]
    StagingFatal {
        path: String,
        #[source]
        source: GitError,
    },

    #[error(
        "Hook '{hook_id}' failed for '{path}' (exit code {exit_code}) with no recognized remediation"
    )]
    HookTerminal {
        path: String,
        hook_id: String,
        exit_code: i32,
        diagnostics: Vec<String>,
    },

    #[error("Hook validation for '{path}' still failing after {attempts} requeue attempts")]
    RequeueExhausted { path: String, attempts: u32 },

    #[error("Hook runner failed: {0}")]
    Hook(#[from] HookError),

    #[error("Secret remediation failed: {0}")]
    Secret(#[from] SecretError),

    #[error("Git operation failed: {0}")]
    Git(#[from] GitError),
}
