//! Error kinds produced by the calculator engine.

use thiserror::Error;

/// Failure while evaluating a normalized expression.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EvalError {
    /// Malformed expression, trailing input, or a character the grammar does not know.
    #[error("unexpected {} at position {position}", describe(.found))]
    UnexpectedToken {
        /// Byte offset into the normalized expression.
        position: usize,
        /// The offending character, `None` at end of input.
        found: Option<char>,
    },
    /// An identifier that is not a known function.
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    /// Groups, signs or powers nested deeper than the parser will follow.
    #[error("expression nested deeper than {limit} levels at position {position}")]
    NestingTooDeep { position: usize, limit: usize },
    /// A value outside the range of an `f64`.
    #[error("numeric overflow")]
    NumericOverflow,
}

fn describe(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("'{c}'"),
        None => "end of input".to_string(),
    }
}

/// A session snapshot could not be restored.
#[derive(Debug, Error)]
pub enum StateCorruptError {
    #[error("malformed calculator state: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("inconsistent calculator state: {0}")]
    Inconsistent(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = EvalError::UnexpectedToken {
            position: 3,
            found: Some('x'),
        };
        assert_eq!(err.to_string(), "unexpected 'x' at position 3");

        let err = EvalError::UnexpectedToken {
            position: 5,
            found: None,
        };
        assert_eq!(err.to_string(), "unexpected end of input at position 5");

        assert_eq!(
            EvalError::UnknownFunction("cos".into()).to_string(),
            "unknown function: cos"
        );

        assert_eq!(
            EvalError::NestingTooDeep {
                position: 256,
                limit: 256
            }
            .to_string(),
            "expression nested deeper than 256 levels at position 256"
        );
    }
}
