//! Commit-message generation via an external completion service.

pub mod client;
pub mod generate;
pub mod prompt;

pub use client::{ClaudeClient, Completion, CompletionClient, check_claude_installed};
pub use generate::{
    CommitRecord, GeneratorConfig, MAX_ATTEMPTS, diff_fingerprint, generate_commit_message,
    is_conventional,
};
pub use prompt::{COMMIT_MESSAGE_SYSTEM, build_user_prompt};
