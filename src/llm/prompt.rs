//! Prompt construction for commit-message generation.

/// Maximum characters of diff text sent to the completion service.
const MAX_DIFF_PROMPT_LENGTH: usize = 30_000;

/// The system instruction describing the commit-message convention.
pub const COMMIT_MESSAGE_SYSTEM: &str = "\
Generate a commit message based solely on the staged diffs provided, ensuring \
accuracy and relevance to the actual changes. Avoid speculative or unnecessary \
footers, such as references to non-existent issues.

Follow the Conventional Commits standard using the following format:

    <type>(<scope>): <description>
    [optional body]
    [optional footer/breaking changes]

Ensure the following:
- Type: use fix for patches that fix bugs, feat for new features, and other
  recognized types as per conventions (build, chore, ci, docs, style,
  refactor, perf, test).
- Scope: the most specific of application name, file name, class name,
  method/function name, or feature name. If in doubt, use the name of the
  file being modified.
- Description: imperative mood, factual, based only on the provided diff.
- Breaking changes: include a BREAKING CHANGE: footer or append ! after the
  type/scope.
- Use bullet points in the body when more than one item is discussed.
- Do not add Co-authored-by or other footers unless explicitly required.
- Respond with the commit message only, no surrounding commentary.";

/// Build the user payload carrying the staged diff.
pub fn build_user_prompt(diff: &str) -> String {
    let diff = truncate_diff(diff, MAX_DIFF_PROMPT_LENGTH);
    format!("Generate a git commit message based on these diffs:\n\"{diff}\"")
}

/// Truncate on a char boundary so large diffs stay within the prompt budget.
fn truncate_diff(diff: &str, max_len: usize) -> &str {
    if diff.len() <= max_len {
        return diff;
    }
    let mut end = max_len;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    &diff[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_contains_diff() {
        let prompt = build_user_prompt("diff --git a/x b/x");
        assert!(prompt.contains("diff --git a/x b/x"));
        assert!(prompt.starts_with("Generate a git commit message"));
    }

    #[test]
    fn test_system_prompt_describes_convention() {
        assert!(COMMIT_MESSAGE_SYSTEM.contains("<type>(<scope>): <description>"));
        assert!(COMMIT_MESSAGE_SYSTEM.contains("BREAKING CHANGE"));
    }

    #[test]
    fn test_large_diff_is_truncated() {
        let diff = "x".repeat(MAX_DIFF_PROMPT_LENGTH + 100);
        let prompt = build_user_prompt(&diff);
        assert!(prompt.len() < diff.len());
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        let diff = "é".repeat(MAX_DIFF_PROMPT_LENGTH);
        // Must not panic on a multi-byte boundary.
        let _ = build_user_prompt(&diff);
    }
}
