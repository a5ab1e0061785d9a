//! The formula editor state machine.
//!
//! Applies keystrokes to the formula under construction. The editor only
//! manipulates display text; arithmetic is left to [`evaluate`] when the
//! user presses equals.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use super::error::{EvalError, StateCorruptError};
use super::evaluation::evaluate;
use super::format::{ERROR_MARKER, NumberFormatter};
use super::input::{InputEvent, Operator};
use super::snapshot;
use crate::history::{HistoryEntry, HistorySink};

/// The last structural action, consulted by operations that reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Idle,
    AfterOperator,
    AfterEvaluation,
    AfterError,
    /// Backspace emptied the formula.
    Cleared,
}

impl KeyState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::AfterOperator => "operator",
            Self::AfterEvaluation => "equals",
            Self::AfterError => "error",
            Self::Cleared => "clear",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" => Some(Self::Idle),
            "operator" => Some(Self::AfterOperator),
            "equals" => Some(Self::AfterEvaluation),
            "error" => Some(Self::AfterError),
            "clear" => Some(Self::Cleared),
            _ => None,
        }
    }
}

/// Everything needed to resume a calculator session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormulaState {
    /// The formula as typed, with grouping separators and display glyphs.
    pub displayed_formula: String,
    /// What the main readout currently shows.
    pub last_result: String,
    /// The formula that produced the last evaluation.
    pub last_formula_evaluated: String,
    /// Number of unmatched `(` in `displayed_formula`.
    pub open_parenthesis_count: u32,
    pub last_key: KeyState,
}

impl Default for FormulaState {
    fn default() -> Self {
        Self {
            displayed_formula: "0".to_string(),
            last_result: "0".to_string(),
            last_formula_evaluated: String::new(),
            open_parenthesis_count: 0,
            last_key: KeyState::Idle,
        }
    }
}

/// The two strings the presentation layer renders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Display {
    /// Small line above the readout: the last evaluated formula.
    pub formula: String,
    /// Main readout: the formula under edit or the last result.
    pub result: String,
}

/// A calculator session.
pub struct FormulaEditor {
    state: FormulaState,
    formatter: NumberFormatter,
    history: Option<Box<dyn HistorySink>>,
}

impl FormulaEditor {
    pub fn new(formatter: NumberFormatter) -> Self {
        Self {
            state: FormulaState::default(),
            formatter,
            history: None,
        }
    }

    /// Send every successful evaluation to `sink`.
    pub fn with_history(mut self, sink: impl HistorySink + 'static) -> Self {
        self.history = Some(Box::new(sink));
        self
    }

    pub fn state(&self) -> &FormulaState {
        &self.state
    }

    pub fn formatter(&self) -> &NumberFormatter {
        &self.formatter
    }

    pub fn display(&self) -> Display {
        Display {
            formula: self.state.last_formula_evaluated.clone(),
            result: self.state.last_result.clone(),
        }
    }

    /// Apply one input event and return what should be shown.
    pub fn apply(&mut self, event: InputEvent) -> Display {
        debug!(?event, formula = %self.state.displayed_formula, "Applying input");
        match event {
            InputEvent::Digit(digit) => self.append_digit(digit),
            InputEvent::DecimalPoint => self.append_decimal_point(),
            InputEvent::OpenParenthesis => self.append_open_parenthesis(),
            InputEvent::CloseParenthesis => self.append_close_parenthesis(),
            InputEvent::Operator(op) => self.apply_operator(op),
            InputEvent::ToggleNegative => self.toggle_negative().1,
            InputEvent::Equals => self.evaluate(),
            InputEvent::Backspace => self.backspace(),
            InputEvent::Reset => self.full_reset(),
            InputEvent::LoadNumber(number) => self.load_number(&number),
        }
    }

    pub fn append_digit(&mut self, digit: u8) -> Display {
        debug_assert!(digit <= 9);
        self.clear_error_marker("");

        if self.state.displayed_formula == "0" {
            if digit == 0 {
                return self.display();
            }
            self.state.displayed_formula.clear();
        }

        if matches!(self.last_char(), Some(')' | '%')) {
            self.state.displayed_formula.push(Operator::Multiply.glyph());
        }

        self.state
            .displayed_formula
            .push(char::from(b'0' + digit.min(9)));
        self.regroup();
        self.state.last_key = KeyState::Idle;
        self.show_formula()
    }

    pub fn append_decimal_point(&mut self) -> Display {
        self.clear_error_marker("");
        let separator = self.formatter.decimal_separator();

        let last_number = self
            .state
            .displayed_formula
            .rsplit(|c: char| Operator::is_glyph(c) || matches!(c, '(' | ')' | '^'))
            .next()
            .unwrap_or_default();
        if last_number.contains(separator) {
            return self.display();
        }

        match self.last_char() {
            Some(c) if c.is_ascii_digit() => {}
            Some(')' | '%') => {
                self.state.displayed_formula.push(Operator::Multiply.glyph());
                self.state.displayed_formula.push('0');
            }
            _ => self.state.displayed_formula.push('0'),
        }
        self.state.displayed_formula.push(separator);
        self.state.last_key = KeyState::Idle;
        self.show_formula()
    }

    pub fn append_open_parenthesis(&mut self) -> Display {
        self.clear_error_marker("");
        if self.state.displayed_formula == "0" {
            self.state.displayed_formula.clear();
        }

        if self
            .last_char()
            .is_some_and(|c| c.is_ascii_digit() || c == ')' || c == '%')
        {
            self.state.displayed_formula.push(Operator::Multiply.glyph());
        }

        self.state.displayed_formula.push('(');
        self.state.open_parenthesis_count += 1;
        self.state.last_key = KeyState::Idle;
        self.show_formula()
    }

    pub fn append_close_parenthesis(&mut self) -> Display {
        if self.state.open_parenthesis_count == 0 {
            return self.display();
        }

        self.state.displayed_formula.push(')');
        self.state.open_parenthesis_count -= 1;
        self.state.last_key = KeyState::Idle;
        self.show_formula()
    }

    /// Append an operator, replacing any operator already at the end.
    pub fn apply_operator(&mut self, op: Operator) -> Display {
        self.clear_error_marker("0");

        let separator = self.formatter.decimal_separator();
        if self
            .last_char()
            .is_some_and(|c| Operator::is_glyph(c) || c == separator)
        {
            self.state.displayed_formula.pop();
            if self.last_char().is_some_and(Operator::is_glyph) {
                self.state.displayed_formula.pop();
            }
        }

        match self.last_char() {
            // Only a sign may start a formula or a parenthesized group.
            None | Some('(') => {
                if op == Operator::Minus {
                    self.state.displayed_formula.push(op.glyph());
                }
            }
            Some(_) => self.state.displayed_formula.push(op.glyph()),
        }

        self.state.last_key = KeyState::AfterOperator;
        self.show_formula()
    }

    /// Turn a bare "0" into a leading minus.
    ///
    /// Returns whether the formula changed, so the caller can give feedback
    /// when it did not.
    pub fn toggle_negative(&mut self) -> (bool, Display) {
        if self.state.displayed_formula != "0" {
            return (false, self.display());
        }

        self.state.displayed_formula = Operator::Minus.glyph().to_string();
        self.state.last_key = KeyState::Idle;
        (true, self.show_formula())
    }

    /// Close open parentheses, evaluate, and record the result in history.
    pub fn evaluate(&mut self) -> Display {
        if self.state.displayed_formula.is_empty() || self.is_error() {
            return self.display();
        }

        let mut formula = self.state.displayed_formula.clone();
        for _ in 0..self.state.open_parenthesis_count {
            formula.push(')');
        }
        self.state.open_parenthesis_count = 0;

        let expression = self.formatter.normalize(&formula);
        match evaluate(&expression).and_then(finite) {
            Ok(value) => {
                let result = self
                    .formatter
                    .format_for_display(&self.formatter.format_double(value));
                info!(%expression, %result, "Evaluated formula");

                self.record_history(HistoryEntry::new(
                    formula.clone(),
                    result.clone(),
                    now_millis(),
                ));

                self.state.last_formula_evaluated = formula;
                self.state.displayed_formula = result.clone();
                self.state.last_result = result;
                self.state.last_key = KeyState::AfterEvaluation;
            }
            Err(err) => {
                debug!(%expression, error = %err, "Evaluation failed");
                self.state.displayed_formula = ERROR_MARKER.to_string();
                self.state.last_result = ERROR_MARKER.to_string();
                self.state.last_key = KeyState::AfterError;
            }
        }

        self.display()
    }

    pub fn backspace(&mut self) -> Display {
        if self.is_error() {
            return self.full_reset();
        }

        self.state.displayed_formula.pop();
        self.state.open_parenthesis_count = unmatched_parentheses(&self.state.displayed_formula);

        if self.state.displayed_formula.is_empty() || self.state.displayed_formula == "0" {
            self.state.displayed_formula = "0".to_string();
            self.state.open_parenthesis_count = 0;
            self.state.last_key = KeyState::Cleared;
        }

        self.regroup();
        self.show_formula()
    }

    pub fn full_reset(&mut self) -> Display {
        self.state.open_parenthesis_count = 0;
        self.state.last_key = KeyState::Idle;
        self.state.displayed_formula.clear();
        self.state.last_result = "0".to_string();
        self.state.last_formula_evaluated.clear();
        self.display()
    }

    /// Replace the session with `number`, e.g. a result picked from history.
    pub fn load_number(&mut self, number: &str) -> Display {
        self.full_reset();
        self.state.displayed_formula = drop_unmatched_close(number.trim());
        self.state.open_parenthesis_count = unmatched_parentheses(&self.state.displayed_formula);
        self.regroup();
        self.show_formula()
    }

    pub fn serialize_state(&self) -> serde_json::Result<String> {
        snapshot::serialize_state(&self.state)
    }

    /// Replace the session with a serialized snapshot.
    ///
    /// On failure the current state is left untouched; callers usually follow
    /// up with [`FormulaEditor::full_reset`].
    pub fn restore_state(&mut self, json: &str) -> Result<Display, StateCorruptError> {
        self.state = snapshot::restore_state(json)?;
        Ok(self.display())
    }

    fn is_error(&self) -> bool {
        self.state.last_key == KeyState::AfterError
    }

    fn clear_error_marker(&mut self, replacement: &str) {
        if self.is_error() {
            self.state.displayed_formula = replacement.to_string();
            self.state.last_key = KeyState::Idle;
        }
    }

    fn last_char(&self) -> Option<char> {
        self.state.displayed_formula.chars().next_back()
    }

    fn regroup(&mut self) {
        self.state.displayed_formula = self.formatter.regroup(&self.state.displayed_formula);
    }

    fn show_formula(&mut self) -> Display {
        self.state.last_result = self.state.displayed_formula.clone();
        self.display()
    }

    fn record_history(&self, entry: HistoryEntry) {
        if let Some(history) = &self.history {
            history.record(entry);
        }
    }
}

fn finite(value: f64) -> Result<f64, EvalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NumericOverflow)
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Remove every `)` that has no `(` before it to close.
fn drop_unmatched_close(formula: &str) -> String {
    let mut open = 0u32;
    formula
        .chars()
        .filter(|&c| match c {
            '(' => {
                open += 1;
                true
            }
            ')' if open == 0 => false,
            ')' => {
                open -= 1;
                true
            }
            _ => true,
        })
        .collect()
}

/// Count `(` without a matching `)`.
pub(crate) fn unmatched_parentheses(formula: &str) -> u32 {
    formula.chars().fold(0u32, |open, c| match c {
        '(' => open + 1,
        ')' => open.saturating_sub(1),
        _ => open,
    })
}
