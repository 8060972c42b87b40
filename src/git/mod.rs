//! Git operations using git2-rs (inspection, staging, committing) and the
//! system git binary (network and ref mutation).

pub mod push;
pub mod stage;
pub mod status;

pub use push::{BranchInfo, current_branch, prepare, publish};
pub use stage::{
    commit_deleted_files, commit_staged, stage_path, staged_diff_for_path, unstage_all,
};
pub use status::{ChangeSet, collect_change_set, log_change_stats};
