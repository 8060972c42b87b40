//! Classification of hook-runner output into structured results.
//!
//! pre-commit prints one line per hook, padded with a fill character to a
//! fixed width, with the status token at the trailing edge:
//!
//! ```text
//! autopep8..................................................................Passed
//! check json............................................................(no files to check)Skipped
//! flake8...................................................................Failed
//! - hook id: flake8
//! - exit code: 1
//!
//! example.py:1:1: F401 'os' imported but unused
//! ```
//!
//! Each line (plus any exception block hanging off a `Failed` line) is
//! classified into exactly one [`HookResult`]. Lines matching none of the
//! recognized shapes become [`Template::Other`] and are treated as
//! informational.

use tracing::{debug, error, info, warn};

/// Which of the four recognized output shapes a block matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Passed,
    SkippedWithReason,
    FailedWithException,
    Other,
}

/// Parsed status of a single hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStatus {
    Passed,
    Skipped,
    Failed,
    Other,
}

impl HookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStatus::Passed => "Passed",
            HookStatus::Skipped => "Skipped",
            HookStatus::Failed => "Failed",
            HookStatus::Other => "",
        }
    }
}

/// Diagnostic detail attached to a `Failed` hook line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookException {
    pub hook_id: String,
    pub exit_code: i32,
    /// Free-form diagnostic lines, collected verbatim.
    pub exception_messages: Vec<String>,
    /// Paths the hook rewrote, when it reported "files were modified by this hook".
    pub files_modified: Vec<String>,
}

impl HookException {
    /// Whether this exception indicates the hook auto-corrected the file.
    pub fn modified_files(&self) -> bool {
        !self.files_modified.is_empty()
    }

    /// Whether this exception indicates an unencrypted secret was detected.
    pub fn unencrypted_secret(&self) -> bool {
        self.exception_messages
            .iter()
            .any(|m| m.to_lowercase().contains("unencrypted secret"))
    }
}

/// One classified block of hook-runner output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookResult {
    pub template: Template,
    /// The unmodified first line of the block.
    pub raw_message: String,
    /// The hook's name column, with padding stripped.
    pub message: String,
    /// The parenthesized skip reason, when present.
    pub reason: Option<String>,
    pub status: HookStatus,
    pub exceptions: Vec<HookException>,
}

/// Parser configuration: the runner's line width and fill character.
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    pub width: usize,
    pub fill: char,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { width: 80, fill: '.' }
    }
}

/// The phrase a hook emits when it rewrote the files it checked.
pub const FILES_MODIFIED_MARKER: &str = "files were modified by this hook";

/// Parse a complete hook-runner output capture into one result per block.
pub fn parse_hook_output(output: &str, config: &ParserConfig) -> Vec<HookResult> {
    let lines: Vec<&str> = output.lines().collect();
    let mut results = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;

        if line.trim().is_empty() {
            continue;
        }

        let mut result = classify_line(line, config);
        if result.status == HookStatus::Failed {
            // Exception blocks belong to the preceding Failed line; consume
            // them until the next status line or end of output.
            while i < lines.len() && !is_status_line(lines[i], config) {
                if let Some((exception, consumed)) = parse_exception_block(&lines[i..], config) {
                    result.exceptions.push(exception);
                    i += consumed;
                } else if lines[i].trim().is_empty() {
                    i += 1;
                } else {
                    // Diagnostic text before any `hook id:` header; keep it
                    // on the most recent exception if one exists.
                    match result.exceptions.last_mut() {
                        Some(last) => last.exception_messages.push(lines[i].to_string()),
                        None => break,
                    }
                    i += 1;
                }
            }
        }
        results.push(result);
    }

    results
}

/// Classify a single line into one of the four templates.
///
/// The status token is located at the line's trailing edge; everything before
/// it, minus any parenthesized reason and the run of fill characters, is the
/// message column.
pub fn classify_line(line: &str, config: &ParserConfig) -> HookResult {
    let raw = line.to_string();

    if let Some(before) = line.strip_suffix("Passed") {
        let message = strip_padding(before, config.fill);
        if !message.is_empty() && before.len() > message.len() {
            return HookResult {
                template: Template::Passed,
                raw_message: raw,
                message: message.to_string(),
                reason: None,
                status: HookStatus::Passed,
                exceptions: Vec::new(),
            };
        }
    }

    if let Some(before) = line.strip_suffix("Skipped") {
        // Reason sits in parentheses immediately before the status token.
        if before.ends_with(')') {
            if let Some(open) = before.rfind('(') {
                let reason = &before[open + 1..before.len() - 1];
                let message = strip_padding(&before[..open], config.fill);
                if !message.is_empty() {
                    return HookResult {
                        template: Template::SkippedWithReason,
                        raw_message: raw,
                        message: message.to_string(),
                        reason: Some(reason.to_string()),
                        status: HookStatus::Skipped,
                        exceptions: Vec::new(),
                    };
                }
            }
        }
    }

    if let Some(before) = line.strip_suffix("Failed") {
        let message = strip_padding(before, config.fill);
        if !message.is_empty() && before.len() > message.len() {
            return HookResult {
                template: Template::FailedWithException,
                raw_message: raw,
                message: message.to_string(),
                reason: None,
                status: HookStatus::Failed,
                exceptions: Vec::new(),
            };
        }
    }

    HookResult {
        template: Template::Other,
        raw_message: raw,
        message: String::new(),
        reason: None,
        status: HookStatus::Other,
        exceptions: Vec::new(),
    }
}

/// Whether a line is one of the three padded status lines (not `Other`).
fn is_status_line(line: &str, config: &ParserConfig) -> bool {
    classify_line(line, config).template != Template::Other
}

/// Strip the trailing run of fill characters from the message column.
fn strip_padding(text: &str, fill: char) -> &str {
    text.trim_end_matches(fill)
}

/// Parse one exception block starting at `hook id:`.
///
/// Returns the exception and the number of lines consumed, or `None` when the
/// slice does not start with a `hook id:` header.
fn parse_exception_block(
    lines: &[&str],
    config: &ParserConfig,
) -> Option<(HookException, usize)> {
    let hook_id = header_value(lines.first()?, "hook id:")?;

    let mut exception = HookException {
        hook_id,
        ..Default::default()
    };
    let mut i = 1;

    if let Some(code) = lines.get(i).and_then(|l| header_value(l, "exit code:")) {
        exception.exit_code = code.trim().parse().unwrap_or(-1);
        i += 1;
    }

    // Skip the blank separator between the headers and the diagnostics.
    while lines.get(i).is_some_and(|l| l.trim().is_empty()) {
        i += 1;
    }

    let mut collecting_files = false;
    while let Some(line) = lines.get(i) {
        if line.trim().is_empty() || header_value(line, "hook id:").is_some() {
            break;
        }
        if is_status_line(line, config) {
            break;
        }

        if collecting_files {
            exception.files_modified.push(line.trim().to_string());
        } else {
            exception.exception_messages.push(line.to_string());
            if line.contains(FILES_MODIFIED_MARKER) {
                collecting_files = true;
            }
        }
        i += 1;
    }

    Some((exception, i))
}

/// Extract the value of a `- hook id:` / `hook id:` style header line.
///
/// The leading `- ` is optional; pre-commit emits it, the distilled grammar
/// omits it.
fn header_value(line: &str, key: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix("- ").unwrap_or(trimmed);
    trimmed
        .strip_prefix(key)
        .map(|rest| rest.trim().to_string())
}

/// Emit the structured status line for one parsed result.
///
/// Presentation is decoupled from parsing: this takes exactly the fields the
/// result already carries.
pub fn log_hook_result(path: &str, result: &HookResult) {
    match result.status {
        HookStatus::Passed => {
            info!(file = path, hook = %result.message, status = "Passed");
        }
        HookStatus::Skipped => {
            info!(
                file = path,
                hook = %result.message,
                status = "Skipped",
                reason = result.reason.as_deref().unwrap_or(""),
            );
        }
        HookStatus::Failed => {
            error!(file = path, hook = %result.message, status = "Failed");
            for exception in &result.exceptions {
                error!(
                    file = path,
                    hook_id = %exception.hook_id,
                    exit_code = exception.exit_code,
                );
                for diagnostic in &exception.exception_messages {
                    error!(file = path, "{diagnostic}");
                }
                for modified in &exception.files_modified {
                    warn!(file = path, modified = %modified, "rewritten by hook");
                }
            }
        }
        HookStatus::Other => {
            debug!(file = path, "{}", result.raw_message);
        }
    }
}
