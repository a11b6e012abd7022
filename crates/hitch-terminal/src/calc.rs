//! Arithmetic expression evaluator used by `calc`.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := factor (('*' | '/') factor)*
//! factor     := ('+' | '-') factor
//!             | ( '(' expression ')' | number | function factor ) ('^' factor)?
//! ```
//!
//! `sqrt`, `sin`, `cos` and `tan` are supported; trig functions take degrees.

/// Evaluation failures. Positions are byte offsets into the input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unexpected '{found}' at {pos}")]
    UnexpectedChar { found: char, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("missing ')' for '(' at {0}")]
    MissingParen(usize),
}

/// Evaluate `input` to a double.
pub fn evaluate(input: &str) -> Result<f64, EvalError> {
    let mut parser = Parser { src: input, pos: 0 };
    let value = parser.expression()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(value),
        Some(found) => Err(EvalError::UnexpectedChar {
            found,
            pos: parser.pos,
        }),
    }
}

/// Render a result the way the calculator prints it (`4.0`, `0.5`).
pub fn format_result(value: f64) -> String {
    format!("{value:?}")
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expression(&mut self) -> Result<f64, EvalError> {
        let mut x = self.term()?;
        loop {
            if self.eat('+') {
                x += self.term()?;
            } else if self.eat('-') {
                x -= self.term()?;
            } else {
                return Ok(x);
            }
        }
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut x = self.factor()?;
        loop {
            if self.eat('*') {
                x *= self.factor()?;
            } else if self.eat('/') {
                x /= self.factor()?;
            } else {
                return Ok(x);
            }
        }
    }

    fn factor(&mut self) -> Result<f64, EvalError> {
        if self.eat('+') {
            return self.factor();
        }
        if self.eat('-') {
            return Ok(-self.factor()?);
        }

        self.skip_ws();
        let start = self.pos;
        let mut x = match self.peek() {
            None => return Err(EvalError::UnexpectedEnd),
            Some('(') => {
                self.bump();
                let inner = self.expression()?;
                if !self.eat(')') {
                    return Err(EvalError::MissingParen(start));
                }
                inner
            },
            Some(c) if c.is_ascii_digit() || c == '.' => {
                while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                    self.bump();
                }
                let text = &self.src[start..self.pos];
                text.parse::<f64>()
                    .map_err(|_| EvalError::InvalidNumber(text.to_string()))?
            },
            Some(c) if c.is_ascii_lowercase() => {
                while self.peek().is_some_and(|c| c.is_ascii_lowercase()) {
                    self.bump();
                }
                let name = &self.src[start..self.pos];
                let arg = self.factor()?;
                apply_function(name, arg)?
            },
            Some(found) => return Err(EvalError::UnexpectedChar { found, pos: start }),
        };

        if self.eat('^') {
            x = x.powf(self.factor()?);
        }
        Ok(x)
    }
}

fn apply_function(name: &str, arg: f64) -> Result<f64, EvalError> {
    match name {
        "sqrt" => Ok(arg.sqrt()),
        "sin" => Ok(arg.to_radians().sin()),
        "cos" => Ok(arg.to_radians().cos()),
        "tan" => Ok(arg.to_radians().tan()),
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}
