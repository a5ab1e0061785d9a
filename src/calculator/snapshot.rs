//! Session snapshots.
//!
//! A snapshot is a flat JSON object written when a session is suspended and
//! read back when it resumes.

use serde::{Deserialize, Serialize};

use super::editor::{FormulaState, KeyState, unmatched_parentheses};
use super::error::StateCorruptError;
use super::format::ERROR_MARKER;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    result: String,
    previous_calculation: String,
    last_key: String,
    displayed_formula: String,
    #[serde(default)]
    open_parentheses_count: u32,
}

pub fn serialize_state(state: &FormulaState) -> serde_json::Result<String> {
    serde_json::to_string(&Snapshot {
        result: state.last_result.clone(),
        previous_calculation: state.last_formula_evaluated.clone(),
        last_key: state.last_key.as_str().to_string(),
        displayed_formula: state.displayed_formula.clone(),
        open_parentheses_count: state.open_parenthesis_count,
    })
}

pub fn restore_state(json: &str) -> Result<FormulaState, StateCorruptError> {
    let snapshot: Snapshot = serde_json::from_str(json)?;

    let last_key = KeyState::parse(&snapshot.last_key).ok_or_else(|| {
        StateCorruptError::Inconsistent(format!("unknown last key '{}'", snapshot.last_key))
    })?;

    if last_key == KeyState::AfterError && snapshot.displayed_formula != ERROR_MARKER {
        return Err(StateCorruptError::Inconsistent(format!(
            "error state recorded but formula is '{}'",
            snapshot.displayed_formula
        )));
    }

    let unmatched = unmatched_parentheses(&snapshot.displayed_formula);
    if unmatched != snapshot.open_parentheses_count {
        return Err(StateCorruptError::Inconsistent(format!(
            "{} open parentheses recorded but formula '{}' has {}",
            snapshot.open_parentheses_count, snapshot.displayed_formula, unmatched
        )));
    }

    Ok(FormulaState {
        displayed_formula: snapshot.displayed_formula,
        last_result: snapshot.result,
        last_formula_evaluated: snapshot.previous_calculation,
        open_parenthesis_count: snapshot.open_parentheses_count,
        last_key,
    })
}
