//! Hook runner invocation and output classification.

pub mod parser;
pub mod runner;

pub use parser::{
    HookException, HookResult, HookStatus, ParserConfig, Template, classify_line,
    log_hook_result, parse_hook_output,
};
pub use runner::{HookRunOutput, HookRunner, PreCommitRunner, check_pre_commit_installed};
