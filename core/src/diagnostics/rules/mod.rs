//! Diagnostic Rules
//!
//! One rule per file:
//!
//! - `missing_condition.rs` - Empty conditions and handler-less `try`
//! - `unreachable_code.rs` - Statements after `return`, `throw`, `break` or `continue`
//! - `max_nesting_depth.rs` - Statements nested too deeply to follow

mod max_nesting_depth;
mod missing_condition;
mod unreachable_code;

pub use max_nesting_depth::{MaxNestingDepthRule, MAX_NEST_DEPTH};
pub use missing_condition::MissingConditionRule;
pub use unreachable_code::UnreachableCodeRule;
