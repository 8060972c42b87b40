//! Run options sourced from the `.hermodrc` settings file and CLI flags.

use std::path::Path;

use tracing::warn;

use crate::error::ConfigError;

/// Name of the settings file at the repository root.
pub const SETTINGS_FILE: &str = ".hermodrc";

/// Toggles controlling a run. All default to off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Validate and generate, but never commit (implies no push).
    pub no_commit: bool,
    /// Commit locally but never push.
    pub no_push: bool,
    /// Skip hook validation entirely.
    pub no_pre_commit: bool,
    /// Skip the flux reconcile follow-up after a push.
    pub no_flux: bool,
    /// Do not persist raw completion-service responses.
    pub no_save_api: bool,
    /// Remediate unencrypted-secret hook failures by encrypting the file
    /// in place and revalidating.
    pub encrypt_secrets: bool,
}

impl RunOptions {
    /// Load options from the settings file at the repository root, if present.
    pub fn load(repo_root: &Path) -> Result<Self, ConfigError> {
        let path = repo_root.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parse key=value settings text.
    ///
    /// Blank lines and `#` comments are ignored; unknown keys are warned
    /// about and skipped so older and newer settings files interoperate.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut options = Self::default();

        for (idx, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::InvalidLine {
                    line: idx + 1,
                    text: raw_line.to_string(),
                });
            };

            let enabled = parse_bool(value.trim());
            match key.trim() {
                "NO_COMMIT" => options.no_commit = enabled,
                "NO_PUSH" => options.no_push = enabled,
                "NO_PRE_COMMIT" => options.no_pre_commit = enabled,
                "NO_FLUX" => options.no_flux = enabled,
                "NO_SAVE_API" => options.no_save_api = enabled,
                "ENCRYPT_SECRETS" => options.encrypt_secrets = enabled,
                other => warn!("ignoring unknown setting '{other}'"),
            }
        }

        Ok(options)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
