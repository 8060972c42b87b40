//! Secret-encryption remediation.
//!
//! When a hook reports an unencrypted secret, the file is encrypted in place
//! with sops and re-staged. The cryptography itself lives entirely in the
//! external tool.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::SecretError;

/// The seam between the orchestrator and the external encryption tool.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretEncryptor: Send + Sync {
    /// Encrypt one file in place.
    async fn encrypt(&self, path: &str) -> Result<(), SecretError>;
}

/// Runs `sops --encrypt --in-place <path>`.
pub struct SopsEncryptor;

#[async_trait]
impl SecretEncryptor for SopsEncryptor {
    async fn encrypt(&self, path: &str) -> Result<(), SecretError> {
        if which::which("sops").is_err() {
            return Err(SecretError::NotInstalled);
        }

        let output = Command::new("sops")
            .arg("--encrypt")
            .arg("--in-place")
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(SecretError::SpawnFailed)?;

        if !output.status.success() {
            return Err(SecretError::EncryptFailed {
                path: path.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(file = path, status = "encrypted");
        Ok(())
    }
}
