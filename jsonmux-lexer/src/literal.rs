use crate::error::{LexError, Result};

/// One of the three JSON literal tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    True,
    False,
    Null,
}

/// Matches `true`, `false` or `null` one character at a time.
#[derive(Debug, Clone)]
pub struct LiteralMatcher {
    word: &'static str,
    pos: usize,
}

impl LiteralMatcher {
    /// Starts matching based on the first character of the literal.
    ///
    /// # Errors
    /// Returns `InvalidLiteral` if `first` cannot begin any of the three
    /// literals.
    pub fn start(first: char) -> Result<Self> {
        let word = match first {
            't' => "true",
            'f' => "false",
            'n' => "null",
            other => return Err(LexError::InvalidLiteral(other)),
        };
        Ok(Self { word, pos: 1 })
    }

    /// Feeds the next character. Returns the matched literal once the word
    /// is fully consumed.
    ///
    /// # Errors
    /// Returns `InvalidLiteral` as soon as `c` diverges from the literal
    /// this matcher committed to at `start`.
    pub fn feed(&mut self, c: char) -> Result<Option<Literal>> {
        let expected = self
            .word
            .as_bytes()
            .get(self.pos)
            .copied()
            .map(char::from)
            .expect("feed called after literal already matched");
        if c != expected {
            return Err(LexError::InvalidLiteral(c));
        }
        self.pos += 1;
        if self.pos == self.word.len() {
            return Ok(Some(match self.word {
                "true" => Literal::True,
                "false" => Literal::False,
                _ => Literal::Null,
            }));
        }
        Ok(None)
    }
}
