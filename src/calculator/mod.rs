//! Calculator engine.
//!
//! This module provides:
//! - A formula editor that turns keystrokes into a display formula
//! - A recursive-descent evaluator for the finished formula
//! - Number formatting with locale separators
//! - Session snapshots and clipboard copy of results

mod clipboard;
mod editor;
mod error;
mod evaluation;
mod format;
mod input;
mod snapshot;

pub use clipboard::copy_result;
pub use editor::{Display, FormulaEditor, FormulaState, KeyState};
pub use error::{EvalError, StateCorruptError};
pub use evaluation::{MAX_NESTING_DEPTH, evaluate};
pub use format::{ERROR_MARKER, NumberFormatConfig, NumberFormatter};
pub use input::{InputError, InputEvent, Operator, parse_keys};
pub use snapshot::{restore_state, serialize_state};
