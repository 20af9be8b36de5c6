//! Arithmetic-only evaluator for the numeric size fields.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('**' unary)?
//! primary := number | '(' expr ')'
//! ```
//!
//! Nothing else is accepted: no identifiers, calls or assignments.

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("expression ended unexpectedly")]
    UnexpectedEnd,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("expression nests deeper than {MAX_DEPTH} levels")]
    TooDeep,
    #[error("result is not a finite number")]
    NotFinite,
}

/// Evaluates `input` as an arithmetic expression.
pub fn evaluate(input: &str) -> Result<f64, ExprError> {
    let mut parser = Parser {
        input,
        offset: 0,
        depth: 0,
    };
    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err(ExprError::Empty);
    }
    let value = parser.expr()?;
    parser.skip_whitespace();
    if let Some(ch) = parser.peek() {
        return Err(ExprError::UnexpectedChar {
            ch,
            offset: parser.offset,
        });
    }
    if !value.is_finite() {
        return Err(ExprError::NotFinite);
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a str,
    offset: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.offset..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.input[self.offset..].starts_with(token) {
            self.offset += token.len();
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        loop {
            if self.eat("+") {
                value += self.term()?;
            } else if self.eat("-") {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.unary()?;
        loop {
            self.skip_whitespace();
            // `**` binds tighter and is handled in `power`.
            if self.input[self.offset..].starts_with("**") {
                return Ok(value);
            }
            if self.eat("*") {
                value *= self.unary()?;
            } else if self.eat("/") {
                let divisor = self.unary()?;
                if divisor == 0.0 {
                    return Err(ExprError::DivisionByZero);
                }
                value /= divisor;
            } else if self.eat("%") {
                let divisor = self.unary()?;
                if divisor == 0.0 {
                    return Err(ExprError::DivisionByZero);
                }
                value %= divisor;
            } else {
                return Ok(value);
            }
        }
    }

    fn unary(&mut self) -> Result<f64, ExprError> {
        self.enter()?;
        let result = if self.eat("-") {
            self.unary().map(|value| -value)
        } else if self.eat("+") {
            self.unary()
        } else {
            self.power()
        };
        self.depth -= 1;
        result
    }

    fn power(&mut self) -> Result<f64, ExprError> {
        let base = self.primary()?;
        if self.eat("**") {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, ExprError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(ExprError::UnexpectedEnd),
            Some('(') => {
                self.bump();
                self.enter()?;
                let value = self.expr()?;
                self.depth -= 1;
                if !self.eat(")") {
                    return match self.peek() {
                        Some(ch) => Err(ExprError::UnexpectedChar {
                            ch,
                            offset: self.offset,
                        }),
                        None => Err(ExprError::UnexpectedEnd),
                    };
                }
                Ok(value)
            }
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.number(),
            Some(ch) => Err(ExprError::UnexpectedChar {
                ch,
                offset: self.offset,
            }),
        }
    }

    fn number(&mut self) -> Result<f64, ExprError> {
        let start = self.offset;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '.')
        {
            self.bump();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let checkpoint = self.offset;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                    self.bump();
                }
            } else {
                self.offset = checkpoint;
            }
        }
        let literal = &self.input[start..self.offset];
        literal
            .parse::<f64>()
            .map_err(|_| ExprError::InvalidNumber(literal.to_string()))
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_arithmetic() {
        assert_eq!(evaluate("800"), Ok(800.0));
        assert_eq!(evaluate(" 1920 / 2 "), Ok(960.0));
        assert_eq!(evaluate("2 + 3 * 4"), Ok(14.0));
        assert_eq!(evaluate("(2 + 3) * 4"), Ok(20.0));
        assert_eq!(evaluate("-3 + 5"), Ok(2.0));
        assert_eq!(evaluate("2 ** 3 ** 2"), Ok(512.0));
        assert_eq!(evaluate("2 * 2 ** 3"), Ok(16.0));
        assert_eq!(evaluate("10 % 4"), Ok(2.0));
        assert_eq!(evaluate("1.5e2"), Ok(150.0));
        assert_eq!(evaluate(".5 * 4"), Ok(2.0));
    }

    #[test]
    fn rejects_code() {
        assert!(matches!(
            evaluate("alert(1)"),
            Err(ExprError::UnexpectedChar { ch: 'a', offset: 0 })
        ));
        assert!(matches!(
            evaluate("1; 2"),
            Err(ExprError::UnexpectedChar { ch: ';', .. })
        ));
        assert_eq!(evaluate(""), Err(ExprError::Empty));
        assert_eq!(evaluate("1 +"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("1 / 0"), Err(ExprError::DivisionByZero));
        assert!(matches!(evaluate("1.2.3"), Err(ExprError::InvalidNumber(_))));
        assert_eq!(evaluate("10 ** 400"), Err(ExprError::NotFinite));
    }

    #[test]
    fn bounds_nesting() {
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(evaluate(&deep), Err(ExprError::TooDeep));
        let minus = format!("{}1", "-".repeat(200));
        assert_eq!(evaluate(&minus), Err(ExprError::TooDeep));
    }
}
