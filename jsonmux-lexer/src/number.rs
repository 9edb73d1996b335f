use crate::error::{LexError, Result};

/// Which optional parts a number token turned out to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumberShape {
    /// A `.digits` fractional part was present.
    pub has_fraction: bool,
    /// An `e`/`E` exponent part was present.
    pub has_exponent: bool,
}

impl NumberShape {
    /// A number with this shape can be coerced to an integer (no `.` and
    /// no exponent part — per the JSON number grammar an exponent always
    /// implies floating-point semantics even when its value is whole).
    #[must_use]
    pub fn is_integral(&self) -> bool {
        !self.has_fraction && !self.has_exponent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    AfterSign,
    Zero,
    IntDigits,
    Dot,
    FracDigits,
    ExpE,
    ExpSign,
    ExpDigits,
}

/// Accumulates and validates one JSON number token,
/// `-?(0|[1-9]\d*)(\.\d+)?([eE][+-]?\d+)?`, one character at a time.
#[derive(Debug, Clone)]
pub struct NumberAccumulator {
    buf: String,
    phase: Phase,
    shape: NumberShape,
}

impl NumberAccumulator {
    /// Starts a new accumulator with the first character of the number
    /// (a `-` or an ASCII digit).
    ///
    /// # Errors
    /// Returns `InvalidNumber` if `first` cannot begin a JSON number.
    pub fn start(first: char) -> Result<Self> {
        let mut acc = Self {
            buf: String::new(),
            phase: Phase::Start,
            shape: NumberShape::default(),
        };
        acc.feed(first)?;
        Ok(acc)
    }

    /// Feeds the next character.
    ///
    /// Returns `Ok(true)` if `c` was consumed as part of the number, or
    /// `Ok(false)` if `c` terminates the number — in which case the caller
    /// owns `c` and must re-dispatch it without having consumed it from
    /// the accumulator's perspective.
    ///
    /// # Errors
    /// Returns `InvalidNumber` if `c` cannot legally appear in its
    /// position per the JSON number grammar.
    pub fn feed(&mut self, c: char) -> Result<bool> {
        match self.phase {
            Phase::Start => {
                if c == '-' {
                    self.buf.push(c);
                    self.phase = Phase::AfterSign;
                    Ok(true)
                } else {
                    self.first_digit(c)
                }
            }
            Phase::AfterSign => self.first_digit(c),
            Phase::Zero => {
                if c.is_ascii_digit() {
                    Err(self.invalid())
                } else if c == '.' {
                    self.buf.push(c);
                    self.shape.has_fraction = true;
                    self.phase = Phase::Dot;
                    Ok(true)
                } else if c == 'e' || c == 'E' {
                    self.buf.push(c);
                    self.shape.has_exponent = true;
                    self.phase = Phase::ExpE;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Phase::IntDigits => {
                if c.is_ascii_digit() {
                    self.buf.push(c);
                    Ok(true)
                } else if c == '.' {
                    self.buf.push(c);
                    self.shape.has_fraction = true;
                    self.phase = Phase::Dot;
                    Ok(true)
                } else if c == 'e' || c == 'E' {
                    self.buf.push(c);
                    self.shape.has_exponent = true;
                    self.phase = Phase::ExpE;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Phase::Dot => {
                if c.is_ascii_digit() {
                    self.buf.push(c);
                    self.phase = Phase::FracDigits;
                    Ok(true)
                } else {
                    Err(self.invalid())
                }
            }
            Phase::FracDigits => {
                if c.is_ascii_digit() {
                    self.buf.push(c);
                    Ok(true)
                } else if c == 'e' || c == 'E' {
                    self.buf.push(c);
                    self.shape.has_exponent = true;
                    self.phase = Phase::ExpE;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Phase::ExpE => {
                if c == '+' || c == '-' {
                    self.buf.push(c);
                    self.phase = Phase::ExpSign;
                    Ok(true)
                } else if c.is_ascii_digit() {
                    self.buf.push(c);
                    self.phase = Phase::ExpDigits;
                    Ok(true)
                } else {
                    Err(self.invalid())
                }
            }
            Phase::ExpSign => {
                if c.is_ascii_digit() {
                    self.buf.push(c);
                    self.phase = Phase::ExpDigits;
                    Ok(true)
                } else {
                    Err(self.invalid())
                }
            }
            Phase::ExpDigits => {
                if c.is_ascii_digit() {
                    self.buf.push(c);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn first_digit(&mut self, c: char) -> Result<bool> {
        if c == '0' {
            self.buf.push(c);
            self.phase = Phase::Zero;
            Ok(true)
        } else if c.is_ascii_digit() {
            self.buf.push(c);
            self.phase = Phase::IntDigits;
            Ok(true)
        } else {
            Err(self.invalid())
        }
    }

    fn invalid(&self) -> LexError {
        LexError::InvalidNumber(self.buf.clone())
    }

    /// Finishes the number, returning the raw token text and its shape.
    ///
    /// # Errors
    /// Returns `InvalidNumber` if the number ended in a state that is not
    /// a valid grammar completion (e.g. a bare `-` with no digits, which
    /// can only happen if the caller terminates input mid-token).
    pub fn finish(self) -> Result<(String, NumberShape)> {
        match self.phase {
            Phase::Zero | Phase::IntDigits | Phase::FracDigits | Phase::ExpDigits => {
                Ok((self.buf, self.shape))
            }
            _ => Err(LexError::InvalidNumber(self.buf)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(s: &str) -> Result<(String, NumberShape)> {
        let mut chars = s.chars();
        let mut acc = NumberAccumulator::start(chars.next().unwrap())?;
        for c in chars {
            if !acc.feed(c)? {
                break;
            }
        }
        acc.finish()
    }

    #[test]
    fn integers() {
        let (raw, shape) = run("42").unwrap();
        assert_eq!(raw, "42");
        assert!(shape.is_integral());
    }

    #[test]
    fn negative_zero_is_valid_leading_zero() {
        let (raw, _) = run("-0").unwrap();
        assert_eq!(raw, "-0");
    }

    #[test]
    fn rejects_leading_zero_with_more_digits() {
        assert!(run("012").is_err());
    }

    #[test]
    fn floats() {
        let (raw, shape) = run("3.5").unwrap();
        assert_eq!(raw, "3.5");
        assert!(shape.has_fraction);
        assert!(!shape.is_integral());
    }

    #[test]
    fn exponents() {
        let (raw, shape) = run("1e10").unwrap();
        assert_eq!(raw, "1e10");
        assert!(shape.has_exponent);
        assert!(!shape.is_integral());

        let (raw, _) = run("1.5e-3").unwrap();
        assert_eq!(raw, "1.5e-3");
    }

    #[test]
    fn rejects_bare_dot() {
        assert!(run("1.").is_err());
    }

    #[test]
    fn rejects_bare_exponent() {
        assert!(run("1e").is_err());
    }
}
