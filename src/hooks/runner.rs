//! Hook runner invocation.

use std::env;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use crate::error::HookError;

/// Default timeout for a single hook run (10 minutes; environment setup on a
/// cold cache can be slow).
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Environment variable to override the default timeout.
const TIMEOUT_ENV_VAR: &str = "HERMOD_HOOK_TIMEOUT";

/// Captured output of one hook run.
#[derive(Debug, Clone)]
pub struct HookRunOutput {
    /// Combined stdout + stderr text, in that order.
    pub output: String,
    pub exit_code: i32,
}

/// The seam between the orchestrator and the external hook runner.
///
/// Production code uses [`PreCommitRunner`]; tests inject a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HookRunner: Send + Sync {
    /// Run the configured hooks against exactly one path.
    async fn run(&self, path: &str) -> Result<HookRunOutput, HookError>;
}

/// Runs `pre-commit run --files <path>` as a subprocess.
pub struct PreCommitRunner;

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

/// Check that pre-commit is installed and accessible.
pub async fn check_pre_commit_installed() -> Result<(), HookError> {
    if which::which("pre-commit").is_err() {
        return Err(HookError::NotInstalled);
    }

    let version_check = Command::new("pre-commit")
        .arg("--version")
        .output()
        .await
        .map_err(HookError::SpawnFailed)?;

    if !version_check.status.success() {
        return Err(HookError::NotInstalled);
    }

    Ok(())
}

#[async_trait]
impl HookRunner for PreCommitRunner {
    async fn run(&self, path: &str) -> Result<HookRunOutput, HookError> {
        let timeout_duration = get_timeout();
        let timeout_secs = timeout_duration.as_secs();

        let output = timeout(
            timeout_duration,
            Command::new("pre-commit")
                .arg("run")
                .arg("--files")
                .arg(path)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| HookError::Timeout(timeout_secs))?
        .map_err(HookError::SpawnFailed)?;

        // A non-zero exit is the normal failure signal; the textual output
        // carries the detail, so it is not an error at this layer.
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            combined.push_str(&stderr);
        }

        Ok(HookRunOutput {
            output: combined,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_timeout_default() {
        temp_env::with_var_unset(TIMEOUT_ENV_VAR, || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    #[serial]
    fn test_get_timeout_from_env() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("45"), || {
            assert_eq!(get_timeout(), Duration::from_secs(45));
        });
    }

    #[test]
    #[serial]
    fn test_get_timeout_invalid_env_uses_default() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("soon"), || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    /// Non-zero exit codes from the runner are data, not errors.
    #[tokio::test]
    #[cfg(unix)]
    async fn test_nonzero_exit_captured_as_output() {
        struct ShRunner;

        #[async_trait]
        impl HookRunner for ShRunner {
            async fn run(&self, _path: &str) -> Result<HookRunOutput, HookError> {
                let output = Command::new("sh")
                    .arg("-c")
                    .arg("echo 'diagnostic' >&2; exit 1")
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .output()
                    .await
                    .map_err(HookError::SpawnFailed)?;
                let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                Ok(HookRunOutput {
                    output: combined,
                    exit_code: output.status.code().unwrap_or(-1),
                })
            }
        }

        let result = ShRunner.run("file.py").await.unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("diagnostic"));
    }

    #[tokio::test]
    async fn test_mock_runner_returns_scripted_output() {
        let mut mock = MockHookRunner::new();
        mock.expect_run().returning(|_| {
            Ok(HookRunOutput {
                output: "black....Passed".to_string(),
                exit_code: 0,
            })
        });

        let result = mock.run("a.py").await.unwrap();
        assert_eq!(result.exit_code, 0);
    }
}
