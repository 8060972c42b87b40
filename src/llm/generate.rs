//! Bounded-retry commit-message generation with response persistence.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::llm::client::CompletionClient;
use crate::llm::prompt::{COMMIT_MESSAGE_SYSTEM, build_user_prompt};

/// Total attempts per generator invocation.
pub const MAX_ATTEMPTS: u32 = 5;

/// Backoff base after the second consecutive failure.
const BACKOFF_BASE_SECS: u64 = 3;

/// Column limit for body lines.
const WRAP_WIDTH: usize = 72;

/// Generator settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Persist each successful raw response for audit.
    pub save_responses: bool,
    /// Directory for persisted responses.
    pub responses_dir: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            save_responses: true,
            responses_dir: PathBuf::from(".hermod/responses"),
        }
    }
}

/// A finished message, ready to be committed.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub message: String,
    pub source_diff_fingerprint: String,
    pub timestamp: DateTime<Utc>,
}

/// Sleep between attempts: nothing after the first failure, then 3s doubling
/// (3, 6, 12) after failures two through four.
fn retry_delay(failed_attempt: u32) -> Duration {
    if failed_attempt <= 1 {
        Duration::ZERO
    } else {
        Duration::from_secs(BACKOFF_BASE_SECS << (failed_attempt - 2))
    }
}

/// Generate a conventional commit message for a staged diff.
///
/// Calls the completion service up to [`MAX_ATTEMPTS`] times with backoff.
/// An empty response, an error-flagged response, or a message failing the
/// structural check all count as a failed attempt. Exhausting every attempt
/// returns [`LlmError::AttemptsExhausted`].
pub async fn generate_commit_message(
    client: &dyn CompletionClient,
    diff: &str,
    config: &GeneratorConfig,
) -> Result<CommitRecord, LlmError> {
    let user_prompt = build_user_prompt(diff);
    let fingerprint = diff_fingerprint(diff);

    let mut last_error = None;

    for attempt in 1..=MAX_ATTEMPTS {
        let delay = retry_delay(attempt - 1);
        if !delay.is_zero() {
            debug!(attempt, delay_secs = delay.as_secs(), "waiting before retry");
        }
        tokio::time::sleep(delay).await;

        match attempt_once(client, COMMIT_MESSAGE_SYSTEM, &user_prompt).await {
            Ok((message, raw)) => {
                let timestamp = Utc::now();
                if config.save_responses {
                    if let Err(e) = persist_response(config, &fingerprint, timestamp, &raw) {
                        // Persistence is an audit convenience, not a gate.
                        warn!("Could not persist raw response: {e}");
                    }
                }
                return Ok(CommitRecord {
                    message,
                    source_diff_fingerprint: fingerprint,
                    timestamp,
                });
            }
            Err(e) => {
                info!(attempt, max = MAX_ATTEMPTS, "generation attempt failed: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(LlmError::AttemptsExhausted {
        attempts: MAX_ATTEMPTS,
        last: Box::new(last_error.unwrap_or(LlmError::EmptyResponse)),
    })
}

/// One completion call: decode, clean, validate, wrap.
async fn attempt_once(
    client: &dyn CompletionClient,
    system: &str,
    user: &str,
) -> Result<(String, String), LlmError> {
    let completion = client.complete(system, user).await?;

    let message = clean_message(&completion.text);
    if message.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    if !is_conventional(&message) {
        return Err(LlmError::InvalidMessage(
            message.lines().next().unwrap_or_default().to_string(),
        ));
    }

    Ok((wrap_body(&message), completion.raw))
}

/// Strip markdown fences and surrounding whitespace from the response text.
fn clean_message(text: &str) -> String {
    text.replace("```", "").trim().to_string()
}

static CONVENTIONAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(feat|fix|build|chore|ci|docs|style|refactor|perf|test|revert)(\([^)]+\))?!?: \S.*$",
    )
    .expect("commit message pattern is valid")
});

/// Structural check on the first line: `type(scope): description`.
///
/// Scope is optional, `!` marks a breaking change.
pub fn is_conventional(message: &str) -> bool {
    let first_line = message.lines().next().unwrap_or_default();
    CONVENTIONAL_PATTERN.is_match(first_line)
}

/// Wrap body lines at the column limit; the subject line is left intact.
fn wrap_body(message: &str) -> String {
    let mut lines = message.lines();
    let mut out: Vec<String> = Vec::new();

    if let Some(subject) = lines.next() {
        out.push(subject.to_string());
    }

    for line in lines {
        if line.len() <= WRAP_WIDTH {
            out.push(line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in line.split_whitespace() {
            if current.is_empty() {
                current = word.to_string();
            } else if current.len() + 1 + word.len() <= WRAP_WIDTH {
                current.push(' ');
                current.push_str(word);
            } else {
                out.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
    }

    out.join("\n")
}

/// Short hex fingerprint of the source diff.
pub fn diff_fingerprint(diff: &str) -> String {
    let digest = Sha256::digest(diff.as_bytes());
    hex::encode(&digest[..6])
}

/// Write the raw response under a timestamped, fingerprinted name.
///
/// Written through a temp file in the same directory, so a crash never
/// leaves a truncated record behind.
fn persist_response(
    config: &GeneratorConfig,
    fingerprint: &str,
    timestamp: DateTime<Utc>,
    raw: &str,
) -> Result<(), LlmError> {
    use std::io::Write;

    std::fs::create_dir_all(&config.responses_dir).map_err(LlmError::SaveFailed)?;
    let name = format!("{}-{}.json", timestamp.format("%Y%m%dT%H%M%SZ"), fingerprint);
    let path = config.responses_dir.join(name);

    let mut file =
        tempfile::NamedTempFile::new_in(&config.responses_dir).map_err(LlmError::SaveFailed)?;
    file.write_all(raw.as_bytes()).map_err(LlmError::SaveFailed)?;
    file.persist(&path)
        .map_err(|e| LlmError::SaveFailed(e.error))?;

    debug!(path = %path.display(), "persisted raw response");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{Completion, MockCompletionClient};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn no_save_config(dir: &std::path::Path) -> GeneratorConfig {
        GeneratorConfig {
            save_responses: false,
            responses_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_retry_delay_schedule() {
        assert_eq!(retry_delay(0), Duration::ZERO);
        assert_eq!(retry_delay(1), Duration::ZERO);
        assert_eq!(retry_delay(2), Duration::from_secs(3));
        assert_eq!(retry_delay(3), Duration::from_secs(6));
        assert_eq!(retry_delay(4), Duration::from_secs(12));
    }

    #[test]
    fn test_is_conventional_accepts_standard_forms() {
        assert!(is_conventional("feat(core): add X"));
        assert!(is_conventional("fix: handle empty input"));
        assert!(is_conventional("refactor(parser)!: drop legacy templates"));
        assert!(is_conventional(
            "feat(api): add endpoint\n\nBody explaining why."
        ));
    }

    #[test]
    fn test_is_conventional_rejects_malformed() {
        assert!(!is_conventional("added a feature"));
        assert!(!is_conventional("feat add X"));
        assert!(!is_conventional("feat(core):"));
        assert!(!is_conventional("FEAT(core): shouting"));
        assert!(!is_conventional(""));
    }

    #[test]
    fn test_clean_message_strips_fences() {
        let text = "```\nfeat(core): add X\n```";
        assert_eq!(clean_message(text), "feat(core): add X");
    }

    #[test]
    fn test_wrap_body_leaves_subject_alone() {
        let long_subject = format!("feat(core): {}", "a".repeat(80));
        let wrapped = wrap_body(&long_subject);
        assert_eq!(wrapped, long_subject);
    }

    #[test]
    fn test_wrap_body_wraps_long_lines() {
        let body_word = "word ".repeat(30);
        let message = format!("feat(core): add X\n\n{}", body_word.trim());
        let wrapped = wrap_body(&message);
        for line in wrapped.lines().skip(1) {
            assert!(line.len() <= WRAP_WIDTH, "line too long: {line}");
        }
        assert!(wrapped.split_whitespace().count() >= 30);
    }

    #[test]
    fn test_diff_fingerprint_is_stable_and_short() {
        let a = diff_fingerprint("diff text");
        let b = diff_fingerprint("diff text");
        let c = diff_fingerprint("other diff");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 12);
    }

    #[tokio::test]
    async fn test_generate_success_first_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = MockCompletionClient::new();
        client.expect_complete().times(1).returning(|_, _| {
            Ok(Completion {
                text: "feat(core): add X".to_string(),
                raw: r#"{"result":"feat(core): add X"}"#.to_string(),
            })
        });

        let record = generate_commit_message(&client, "diff", &no_save_config(dir.path()))
            .await
            .unwrap();
        assert_eq!(record.message, "feat(core): add X");
        assert_eq!(record.source_diff_fingerprint, diff_fingerprint("diff"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_empty_responses_exhaust_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let mut client = MockCompletionClient::new();
        client.expect_complete().returning(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(Completion {
                text: String::new(),
                raw: String::new(),
            })
        });

        let result = generate_commit_message(&client, "diff", &no_save_config(dir.path())).await;
        assert!(matches!(
            result,
            Err(LlmError::AttemptsExhausted { attempts: 5, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_invalid_message_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let mut client = MockCompletionClient::new();
        client.expect_complete().returning(move |_, _| {
            let n = calls_clone.fetch_add(1, Ordering::SeqCst);
            let text = if n < 2 {
                "this is not conventional".to_string()
            } else {
                "fix(parser): handle empty input".to_string()
            };
            Ok(Completion {
                raw: text.clone(),
                text,
            })
        });

        let record = generate_commit_message(&client, "diff", &no_save_config(dir.path()))
            .await
            .unwrap();
        assert_eq!(record.message, "fix(parser): handle empty input");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_generate_persists_response_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            save_responses: true,
            responses_dir: dir.path().join("responses"),
        };

        let mut client = MockCompletionClient::new();
        client.expect_complete().returning(|_, _| {
            Ok(Completion {
                text: "feat(core): add X".to_string(),
                raw: r#"{"result":"feat(core): add X"}"#.to_string(),
            })
        });

        let record = generate_commit_message(&client, "diff", &config).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(&config.responses_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].contains(&record.source_diff_fingerprint));
        assert!(entries[0].ends_with(".json"));
    }
}
