//! Completion-service client (Claude CLI subprocess).

use std::env;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use crate::error::LlmError;

/// Default timeout for a completion call (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Environment variable to override the default timeout.
const TIMEOUT_ENV_VAR: &str = "HERMOD_LLM_TIMEOUT";

/// A single completion response.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The extracted message text.
    pub text: String,
    /// The raw response body as received, for optional persistence.
    pub raw: String,
}

/// The seam between the generator and the external completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Issue one blocking completion call with a system instruction and a
    /// user payload.
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, LlmError>;
}

/// Shells out to the Claude Code CLI with `--output-format json`.
pub struct ClaudeClient;

/// Claude CLI JSON envelope when using --output-format json.
#[derive(Deserialize)]
struct ClaudeCliResponse {
    result: String,
    #[serde(default)]
    is_error: bool,
}

fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

/// Check that the Claude Code CLI is installed and accessible.
///
/// This is the run's "required credential" check: when message generation
/// will be needed and the CLI is missing, the run must not start.
pub async fn check_claude_installed() -> Result<(), LlmError> {
    if which::which("claude").is_err() {
        return Err(LlmError::NotInstalled);
    }

    let version_check = Command::new("claude")
        .arg("--version")
        .output()
        .await
        .map_err(LlmError::SpawnFailed)?;

    if !version_check.status.success() {
        return Err(LlmError::NotInstalled);
    }

    Ok(())
}

#[async_trait]
impl CompletionClient for ClaudeClient {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, LlmError> {
        let timeout_duration = get_timeout();
        let timeout_secs = timeout_duration.as_secs();

        let prompt = format!("{system}\n\n{user}");

        let output = timeout(
            timeout_duration,
            Command::new("claude")
                .arg("-p")
                .arg(&prompt)
                .arg("--output-format")
                .arg("json")
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| LlmError::Timeout(timeout_secs))?
        .map_err(LlmError::SpawnFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let code = output.status.code().unwrap_or(-1);
            return Err(LlmError::NonZeroExit { code, stderr });
        }

        let raw = String::from_utf8_lossy(&output.stdout).to_string();
        let text = decode_envelope(&raw)?;
        Ok(Completion { text, raw })
    }
}

/// Decode the CLI's JSON envelope into the message text.
///
/// Transport-level escaping (`\n`, `\"`, unicode escapes) is undone by the
/// JSON decode. Responses that are not an envelope are passed through as-is.
pub fn decode_envelope(response: &str) -> Result<String, LlmError> {
    match serde_json::from_str::<ClaudeCliResponse>(response) {
        Ok(envelope) if envelope.is_error => Err(LlmError::ServiceError(envelope.result)),
        Ok(envelope) => Ok(envelope.result),
        Err(_) => Ok(response.to_string()),
    }
}
