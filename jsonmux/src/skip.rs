use jsonmux_lexer::{EscapeAccumulator, LiteralMatcher, NumberAccumulator};

use crate::error::DemuxError;

/// What finishing `feed` means for the caller.
pub(crate) enum SkipOutcome {
    /// The character was consumed and the balanced value is not yet complete.
    Continue,
    /// The character was consumed and it completed the balanced value.
    Done,
    /// The character was *not* consumed; the balanced value completed
    /// before it and the caller must re-dispatch it to the outer state
    /// machine.
    DoneReconsume,
}

enum Container {
    Object,
    Array,
}

/// What the next structural character is expected to mean.
enum Next {
    Value,
    ObjectKeyOrClose,
    ObjectKey,
    ObjectColon,
    ArrayValueOrClose,
    AfterValue,
}

enum Token {
    String(EscapeAccumulator),
    Number(NumberAccumulator),
    Literal(LiteralMatcher),
}

/// Consumes exactly one balanced JSON value (object, array, string, number
/// or literal) without routing any of it anywhere. Used for fields whose
/// name is not present in the declared schema under permissive mode.
pub(crate) struct Skipper {
    frames: Vec<Container>,
    next: Next,
    token: Option<Token>,
}

impl Skipper {
    pub(crate) fn new() -> Self {
        Self {
            frames: Vec::new(),
            next: Next::Value,
            token: None,
        }
    }

    pub(crate) fn feed(&mut self, c: char) -> Result<SkipOutcome, DemuxError> {
        if let Some(tok) = self.token.take() {
            return self.feed_token(tok, c);
        }
        self.dispatch_structural(c)
    }

    fn feed_token(&mut self, tok: Token, c: char) -> Result<SkipOutcome, DemuxError> {
        match tok {
            Token::String(mut esc) => {
                if esc.is_idle() && c == '"' {
                    esc.finish()?;
                    return self.after_value_consumed();
                }
                esc.feed(c)?;
                self.token = Some(Token::String(esc));
                Ok(SkipOutcome::Continue)
            }
            Token::Literal(mut matcher) => {
                if matcher.feed(c)?.is_some() {
                    return self.after_value_consumed();
                }
                self.token = Some(Token::Literal(matcher));
                Ok(SkipOutcome::Continue)
            }
            Token::Number(mut acc) => {
                if acc.feed(c)? {
                    self.token = Some(Token::Number(acc));
                    return Ok(SkipOutcome::Continue);
                }
                acc.finish()?;
                if self.frames.is_empty() {
                    return Ok(SkipOutcome::DoneReconsume);
                }
                self.next = Next::AfterValue;
                self.dispatch_structural(c)
            }
        }
    }

    fn after_value_consumed(&mut self) -> Result<SkipOutcome, DemuxError> {
        if matches!(self.next, Next::ObjectColon) {
            // The value just closed was an object key; `next` is already
            // primed to expect the colon that follows it.
            return Ok(SkipOutcome::Continue);
        }
        if self.frames.is_empty() {
            return Ok(SkipOutcome::Done);
        }
        self.next = Next::AfterValue;
        Ok(SkipOutcome::Continue)
    }

    fn close_frame(&mut self) -> Result<SkipOutcome, DemuxError> {
        self.frames.pop();
        if self.frames.is_empty() {
            Ok(SkipOutcome::Done)
        } else {
            self.next = Next::AfterValue;
            Ok(SkipOutcome::Continue)
        }
    }

    fn dispatch_structural(&mut self, c: char) -> Result<SkipOutcome, DemuxError> {
        match self.next {
            Next::Value | Next::ObjectKeyOrClose | Next::ObjectKey | Next::ArrayValueOrClose => {
                if c.is_whitespace() {
                    return Ok(SkipOutcome::Continue);
                }
                match (&self.next, c) {
                    (Next::ObjectKeyOrClose, '}') => return self.close_frame(),
                    (Next::ArrayValueOrClose, ']') => return self.close_frame(),
                    _ => {}
                }
                match c {
                    '"' => {
                        self.token = Some(Token::String(EscapeAccumulator::new()));
                        if matches!(self.next, Next::ObjectKeyOrClose | Next::ObjectKey) {
                            self.next = Next::ObjectColon;
                        }
                        Ok(SkipOutcome::Continue)
                    }
                    '{' => {
                        self.frames.push(Container::Object);
                        self.next = Next::ObjectKeyOrClose;
                        Ok(SkipOutcome::Continue)
                    }
                    '[' => {
                        self.frames.push(Container::Array);
                        self.next = Next::ArrayValueOrClose;
                        Ok(SkipOutcome::Continue)
                    }
                    '-' | '0'..='9' => {
                        self.token = Some(Token::Number(NumberAccumulator::start(c)?));
                        Ok(SkipOutcome::Continue)
                    }
                    't' | 'f' | 'n' => {
                        self.token = Some(Token::Literal(LiteralMatcher::start(c)?));
                        Ok(SkipOutcome::Continue)
                    }
                    other => Err(DemuxError::MalformedInput(other, "expected a value while skipping")),
                }
            }
            Next::ObjectColon => {
                if c.is_whitespace() {
                    return Ok(SkipOutcome::Continue);
                }
                if c == ':' {
                    self.next = Next::Value;
                    Ok(SkipOutcome::Continue)
                } else {
                    Err(DemuxError::MalformedInput(c, "expected ':' while skipping an object key"))
                }
            }
            Next::AfterValue => {
                if c.is_whitespace() {
                    return Ok(SkipOutcome::Continue);
                }
                match self.frames.last() {
                    None => unreachable!("AfterValue with no open frame resolves without dispatch"),
                    Some(Container::Object) => match c {
                        ',' => {
                            self.next = Next::ObjectKey;
                            Ok(SkipOutcome::Continue)
                        }
                        '}' => self.close_frame(),
                        other => Err(DemuxError::MalformedInput(other, "expected ',' or '}' while skipping")),
                    },
                    Some(Container::Array) => match c {
                        ',' => {
                            self.next = Next::Value;
                            Ok(SkipOutcome::Continue)
                        }
                        ']' => self.close_frame(),
                        other => Err(DemuxError::MalformedInput(other, "expected ',' or ']' while skipping")),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(s: &str) -> (Vec<bool>, Result<(), DemuxError>) {
        let mut skipper = Skipper::new();
        let mut consumed = Vec::new();
        for c in s.chars() {
            match skipper.feed(c) {
                Ok(SkipOutcome::Continue) => consumed.push(true),
                Ok(SkipOutcome::Done) => {
                    consumed.push(true);
                    return (consumed, Ok(()));
                }
                Ok(SkipOutcome::DoneReconsume) => {
                    consumed.push(false);
                    return (consumed, Ok(()));
                }
                Err(e) => return (consumed, Err(e)),
            }
        }
        (consumed, Ok(()))
    }

    #[test]
    fn skips_bare_scalar() {
        let (_, result) = run("true,");
        assert!(result.is_ok());
    }

    #[test]
    fn skips_bare_number_with_lookahead() {
        let (consumed, result) = run("42,");
        assert!(result.is_ok());
        // the trailing ',' is not part of the number and is unconsumed
        assert_eq!(consumed, vec![true, true, false]);
    }

    #[test]
    fn skips_nested_object() {
        let (_, result) = run(r#"{"a":[1,2,{"b":"c"}],"d":null}"#);
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_malformed_object() {
        let (_, result) = run(r#"{"a" "b"}"#);
        assert!(result.is_err());
    }
}
