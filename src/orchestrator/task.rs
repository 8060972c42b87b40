//! Per-file task state.

use std::fmt;

use tracing::debug;

/// Bounds on the per-file retry loops.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum hook-validation requeues per file.
    pub max_requeue: u32,
    /// Maximum message-generation invocations per file.
    pub max_failure: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_requeue: 5,
            max_failure: 5,
        }
    }
}

/// Where a file sits in the staging → validation → commit pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Staged,
    HookRunning,
    HookPassed,
    HookFixableFailure,
    HookTerminalFailure,
    MessagePending,
    Committed,
    Requeued,
    Done,
    Failed,
    Skipped,
}

impl TaskState {
    /// Terminal states remove the task from the active set.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed | TaskState::Skipped)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Pending => "Pending",
            TaskState::Staged => "Staged",
            TaskState::HookRunning => "HookRunning",
            TaskState::HookPassed => "HookPassed",
            TaskState::HookFixableFailure => "HookFixableFailure",
            TaskState::HookTerminalFailure => "HookTerminalFailure",
            TaskState::MessagePending => "MessagePending",
            TaskState::Committed => "Committed",
            TaskState::Requeued => "Requeued",
            TaskState::Done => "Done",
            TaskState::Failed => "Failed",
            TaskState::Skipped => "Skipped",
        };
        f.write_str(name)
    }
}

/// One path moving through the pipeline.
///
/// Mutated only by the orchestrator's transition logic; the counters never
/// exceed the configured [`Limits`].
#[derive(Debug, Clone)]
pub struct FileTask {
    pub path: String,
    pub state: TaskState,
    pub requeue_count: u32,
    pub failure_count: u32,
}

impl FileTask {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: TaskState::Pending,
            requeue_count: 0,
            failure_count: 0,
        }
    }

    /// Move to a new state, emitting the structured transition line.
    pub fn transition(&mut self, to: TaskState) {
        debug!(file = %self.path, from = %self.state, to = %to, "transition");
        self.state = to;
    }
}
