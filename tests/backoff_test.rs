//! Retry-schedule timing for message generation, under a paused clock.

mod common;

use common::ScriptedClient;
use hermod::error::LlmError;
use hermod::llm::{GeneratorConfig, MAX_ATTEMPTS, generate_commit_message};
use tokio::time::Instant;

fn no_save_config() -> GeneratorConfig {
    GeneratorConfig {
        save_responses: false,
        ..GeneratorConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_success_on_fifth_attempt_waits_twenty_one_seconds() {
    // Four empty responses, then a valid message.
    let client = ScriptedClient::new(vec![
        Err(()),
        Err(()),
        Err(()),
        Err(()),
        Ok("feat(core): add X"),
    ]);

    let start = Instant::now();
    let record = generate_commit_message(&client, "diff", &no_save_config())
        .await
        .unwrap();

    // Delays between attempts: 0, 3, 6, 12 seconds.
    assert_eq!(start.elapsed().as_secs(), 21);
    assert_eq!(record.message, "feat(core): add X");
    assert_eq!(client.call_count(), MAX_ATTEMPTS as usize);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_stops_after_five_attempts() {
    let client = ScriptedClient::new(vec![Err(())]);

    let start = Instant::now();
    let result = generate_commit_message(&client, "diff", &no_save_config()).await;

    assert!(matches!(
        result,
        Err(LlmError::AttemptsExhausted { attempts: 5, .. })
    ));
    assert_eq!(client.call_count(), MAX_ATTEMPTS as usize);
    // Same schedule as the success case; no delay follows the last attempt.
    assert_eq!(start.elapsed().as_secs(), 21);
}

#[tokio::test]
async fn test_first_attempt_success_incurs_no_delay() {
    let client = ScriptedClient::always("fix(parser): handle empty input");

    let record = generate_commit_message(&client, "diff", &no_save_config())
        .await
        .unwrap();

    assert_eq!(record.message, "fix(parser): handle empty input");
    assert_eq!(client.call_count(), 1);
}
