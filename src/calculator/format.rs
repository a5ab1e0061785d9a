//! Number formatting for the formula display.
//!
//! Converts between raw digit runs and grouped display strings, normalizes a
//! display formula into evaluator input, and renders evaluated doubles.

use serde::{Deserialize, Serialize};

/// Literal shown in place of a formula when evaluation fails.
pub const ERROR_MARKER: &str = "Error";

/// Locale-dependent separators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberFormatConfig {
    pub decimal_separator: char,
    pub grouping_separator: char,
}

impl Default for NumberFormatConfig {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            grouping_separator: ',',
        }
    }
}

/// Formats numeric runs using a fixed [`NumberFormatConfig`].
#[derive(Clone, Debug, Default)]
pub struct NumberFormatter {
    config: NumberFormatConfig,
}

impl NumberFormatter {
    pub fn new(config: NumberFormatConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> NumberFormatConfig {
        self.config
    }

    pub fn decimal_separator(&self) -> char {
        self.config.decimal_separator
    }

    pub fn grouping_separator(&self) -> char {
        self.config.grouping_separator
    }

    /// Whether `c` can be part of a numeric run in the display formula.
    pub fn is_numeric_char(&self, c: char) -> bool {
        c.is_ascii_digit() || c == self.config.decimal_separator || c == self.config.grouping_separator
    }

    pub fn strip_grouping(&self, text: &str) -> String {
        text.chars()
            .filter(|&c| c != self.config.grouping_separator)
            .collect()
    }

    /// Group the integer part of a single number in threes.
    ///
    /// Existing separators are stripped first, so the result does not depend
    /// on how the input was grouped. The fractional part is left alone.
    pub fn format_for_display(&self, number: &str) -> String {
        let raw = self.strip_grouping(number);
        let (sign, unsigned) = match raw.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", raw.as_str()),
        };

        let (integer, fraction) = match unsigned.split_once(self.config.decimal_separator) {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (unsigned, None),
        };

        let mut formatted = String::with_capacity(raw.len() + raw.len() / 3);
        formatted.push_str(sign);
        formatted.push_str(&group_digits(integer, self.config.grouping_separator));
        if let Some(fraction) = fraction {
            formatted.push(self.config.decimal_separator);
            formatted.push_str(fraction);
        }
        formatted
    }

    /// Regroup every numeric run in a display formula.
    pub fn regroup(&self, formula: &str) -> String {
        let mut result = String::with_capacity(formula.len());
        let mut run = String::new();

        for c in formula.chars() {
            if self.is_numeric_char(c) {
                run.push(c);
                continue;
            }
            if !run.is_empty() {
                result.push_str(&self.format_for_display(&run));
                run.clear();
            }
            result.push(c);
        }
        if !run.is_empty() {
            result.push_str(&self.format_for_display(&run));
        }

        result
    }

    /// Convert a display formula into evaluator input.
    pub fn normalize(&self, formula: &str) -> String {
        formula
            .chars()
            .filter(|&c| c != self.config.grouping_separator)
            .map(|c| match c {
                c if c == self.config.decimal_separator => '.',
                '×' => '*',
                '÷' => '/',
                c => c,
            })
            .collect()
    }

    /// Render an evaluated value as the shortest decimal string that parses
    /// back to the same double, without grouping.
    ///
    /// Non-finite values become [`ERROR_MARKER`].
    pub fn format_double(&self, value: f64) -> String {
        if !value.is_finite() {
            return ERROR_MARKER.to_string();
        }

        // Avoid showing "-0".
        let value = if value == 0.0 { 0.0 } else { value };
        let canonical = value.to_string();

        if self.config.decimal_separator == '.' {
            canonical
        } else {
            canonical.replace('.', &self.config.decimal_separator.to_string())
        }
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.chars().count();
    let mut grouped = String::with_capacity(len + len / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }

    grouped
}
