//! Input events accepted by the formula editor.
//!
//! Also parses compact key scripts such as `12+3×(4=` into events so that a
//! driver without a keypad can feed the editor.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Binary operator keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Percent,
}

impl Operator {
    pub const ALL: [Operator; 5] = [
        Self::Plus,
        Self::Minus,
        Self::Multiply,
        Self::Divide,
        Self::Percent,
    ];

    /// The character shown in the display formula.
    pub fn glyph(self) -> char {
        match self {
            Self::Plus => '+',
            Self::Minus => '-',
            Self::Multiply => '×',
            Self::Divide => '÷',
            Self::Percent => '%',
        }
    }

    /// Check whether `c` is the display glyph of any operator.
    pub fn is_glyph(c: char) -> bool {
        Self::ALL.iter().any(|op| op.glyph() == c)
    }

    fn from_key(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Plus),
            '-' | '−' => Some(Self::Minus),
            '*' | '×' | 'x' => Some(Self::Multiply),
            '/' | '÷' => Some(Self::Divide),
            '%' => Some(Self::Percent),
            _ => None,
        }
    }
}

/// A single keystroke delivered to the editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Digit(u8),
    DecimalPoint,
    OpenParenthesis,
    CloseParenthesis,
    Operator(Operator),
    ToggleNegative,
    Equals,
    Backspace,
    /// Long-press on backspace.
    Reset,
    /// Replace the formula with a number, e.g. a recalled history result.
    LoadNumber(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unrecognized key '{key}' at position {position}")]
    UnknownKey { key: char, position: usize },
}

lazy_static! {
    /// Characters allowed in a key script.
    static ref KEY_SCRIPT_CHARS: Regex = Regex::new(
        r"^[\d\s\.,\+\-−\*x×/÷%\(\)=<C~]*$"
    ).unwrap();
}

/// Parse a key script into input events.
///
/// Digits, `.` or `,` (decimal point), `(`, `)`, `+ - * / × ÷ %`, `=`,
/// `<` (backspace), `C` (reset) and `~` (toggle negative). Whitespace is
/// ignored.
pub fn parse_keys(script: &str) -> Result<Vec<InputEvent>, InputError> {
    if !KEY_SCRIPT_CHARS.is_match(script) {
        let (position, key) = script
            .chars()
            .enumerate()
            .find(|&(_, c)| !KEY_SCRIPT_CHARS.is_match(c.encode_utf8(&mut [0; 4])))
            .unwrap_or((0, '?'));
        return Err(InputError::UnknownKey { key, position });
    }

    let mut events = Vec::with_capacity(script.len());
    for (position, key) in script.chars().enumerate() {
        if key.is_whitespace() {
            continue;
        }
        events.push(key_to_event(key).ok_or(InputError::UnknownKey { key, position })?);
    }
    Ok(events)
}

fn key_to_event(key: char) -> Option<InputEvent> {
    if let Some(digit) = key.to_digit(10) {
        return Some(InputEvent::Digit(digit as u8));
    }
    if let Some(op) = Operator::from_key(key) {
        return Some(InputEvent::Operator(op));
    }

    match key {
        '.' | ',' => Some(InputEvent::DecimalPoint),
        '(' => Some(InputEvent::OpenParenthesis),
        ')' => Some(InputEvent::CloseParenthesis),
        '=' => Some(InputEvent::Equals),
        '<' => Some(InputEvent::Backspace),
        'C' => Some(InputEvent::Reset),
        '~' => Some(InputEvent::ToggleNegative),
        _ => None,
    }
}
