//! Expression evaluation.
//!
//! A recursive-descent parser over the normalized expression (ASCII operators,
//! `.` as decimal separator, no grouping). Grammar, loosest binding first:
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := factor (('*' | '/') factor)*
//! factor     := ('+' | '-') factor
//!             | ( '(' expression ')' | number | identifier factor ) ('^' factor)? ('%')?
//! ```

use super::error::EvalError;

/// Deepest nesting of factors (groups, signs, powers, function arguments)
/// a single evaluation will descend into.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Evaluate a normalized expression to a double.
///
/// Division by zero is not an error here; it yields an infinity or NaN that
/// the caller decides how to present.
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    Parser::new(expression).parse()
}

/// Cursor state for a single evaluation.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
    current: Option<char>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            current: input.chars().next(),
            depth: 0,
        }
    }

    fn advance(&mut self) {
        if let Some(c) = self.current {
            self.pos += c.len_utf8();
        }
        self.current = self.input[self.pos..].chars().next();
    }

    fn skip_whitespace(&mut self) {
        while self.current.is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Consume `expected` if it is the next non-space character.
    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.current == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> EvalError {
        EvalError::UnexpectedToken {
            position: self.pos,
            found: self.current,
        }
    }

    fn parse(mut self) -> Result<f64, EvalError> {
        let value = self.parse_expression()?;
        self.skip_whitespace();
        if self.current.is_some() {
            return Err(self.unexpected());
        }
        Ok(value)
    }

    fn parse_expression(&mut self) -> Result<f64, EvalError> {
        let mut value = self.parse_term()?;
        loop {
            if self.eat('+') {
                value += self.parse_term()?;
            } else if self.eat('-') {
                value -= self.parse_term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.parse_factor()?;
        loop {
            if self.eat('*') {
                value *= self.parse_factor()?;
            } else if self.eat('/') {
                value /= self.parse_factor()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_factor(&mut self) -> Result<f64, EvalError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(EvalError::NestingTooDeep {
                position: self.pos,
                limit: MAX_NESTING_DEPTH,
            });
        }

        self.depth += 1;
        let value = self.parse_nested_factor();
        self.depth -= 1;
        value
    }

    fn parse_nested_factor(&mut self) -> Result<f64, EvalError> {
        if self.eat('+') {
            return self.parse_factor();
        }
        if self.eat('-') {
            return Ok(-self.parse_factor()?);
        }

        let mut value = if self.eat('(') {
            let inner = self.parse_expression()?;
            if !self.eat(')') {
                return Err(self.unexpected());
            }
            inner
        } else {
            match self.current {
                Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number()?,
                Some(c) if c.is_ascii_lowercase() => self.parse_function()?,
                _ => return Err(self.unexpected()),
            }
        };

        if self.eat('^') {
            value = value.powf(self.parse_factor()?);
        }
        if self.eat('%') {
            value /= 100.0;
        }
        Ok(value)
    }

    fn parse_number(&mut self) -> Result<f64, EvalError> {
        let start = self.pos;
        while self.current.is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.advance();
        }

        let literal = &self.input[start..self.pos];
        let value: f64 = literal.parse().map_err(|_| EvalError::UnexpectedToken {
            position: start,
            found: literal.chars().next(),
        })?;

        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NumericOverflow)
        }
    }

    fn parse_function(&mut self) -> Result<f64, EvalError> {
        let start = self.pos;
        while self.current.is_some_and(|c| c.is_ascii_lowercase()) {
            self.advance();
        }

        match &self.input[start..self.pos] {
            "sqrt" => Ok(self.parse_factor()?.sqrt()),
            other => Err(EvalError::UnknownFunction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2+3*4"), Ok(14.0));
        assert_eq!(evaluate("(2+3)*4"), Ok(20.0));
        assert_eq!(evaluate("10-4-3"), Ok(3.0));
        assert_eq!(evaluate("12/3/2"), Ok(2.0));
    }

    #[test]
    fn test_unary_sign() {
        assert_eq!(evaluate("-5+2"), Ok(-3.0));
        assert_eq!(evaluate("+5"), Ok(5.0));
        assert_eq!(evaluate("3*-2"), Ok(-6.0));
        assert_eq!(evaluate("--4"), Ok(4.0));
        // Unary minus applies after the exponent.
        assert_eq!(evaluate("-2^2"), Ok(-4.0));
    }

    #[test]
    fn test_power_and_percent() {
        assert_eq!(evaluate("2^10"), Ok(1024.0));
        assert_eq!(evaluate("2^3^2"), Ok(512.0));
        assert_eq!(evaluate("50%"), Ok(0.5));
        assert_eq!(evaluate("200*10%"), Ok(20.0));
        assert_eq!(evaluate("(10+40)%"), Ok(0.5));
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(evaluate("sqrt9"), Ok(3.0));
        assert_eq!(evaluate("sqrt(16)+1"), Ok(5.0));
        assert_eq!(evaluate("2*sqrt4"), Ok(4.0));
    }

    #[test]
    fn test_decimals_and_whitespace() {
        assert_eq!(evaluate("0.5+0.25"), Ok(0.75));
        assert_eq!(evaluate(".5*2"), Ok(1.0));
        assert_eq!(evaluate("5."), Ok(5.0));
        assert_eq!(evaluate(" 1 + 2 "), Ok(3.0));
    }

    #[test]
    fn test_division_by_zero_is_not_an_error() {
        assert_eq!(evaluate("10/0"), Ok(f64::INFINITY));
        assert!(evaluate("0/0").unwrap().is_nan());
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            evaluate("cos0"),
            Err(EvalError::UnknownFunction("cos".to_string()))
        );
    }

    #[test]
    fn test_unexpected_tokens() {
        assert_eq!(
            evaluate("2+"),
            Err(EvalError::UnexpectedToken {
                position: 2,
                found: None
            })
        );
        assert_eq!(
            evaluate("2)"),
            Err(EvalError::UnexpectedToken {
                position: 1,
                found: Some(')')
            })
        );
        assert_eq!(
            evaluate("(2+3"),
            Err(EvalError::UnexpectedToken {
                position: 4,
                found: None
            })
        );
        assert!(matches!(
            evaluate("1.2.3"),
            Err(EvalError::UnexpectedToken { position: 0, .. })
        ));
        assert!(matches!(
            evaluate("Error"),
            Err(EvalError::UnexpectedToken { position: 0, .. })
        ));
        assert!(evaluate("").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let depth = 10_000;
        let nested = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(matches!(
            evaluate(&nested),
            Err(EvalError::NestingTooDeep { limit: MAX_NESTING_DEPTH, .. })
        ));

        let signs = format!("{}1", "-".repeat(depth));
        assert!(matches!(
            evaluate(&signs),
            Err(EvalError::NestingTooDeep { .. })
        ));

        let powers = vec!["2"; depth].join("^");
        assert!(matches!(
            evaluate(&powers),
            Err(EvalError::NestingTooDeep { .. })
        ));

        let shallow = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&shallow), Ok(1.0));
    }

    #[test]
    fn test_literal_overflow() {
        let huge = "9".repeat(400);
        assert_eq!(evaluate(&huge), Err(EvalError::NumericOverflow));
    }
}
