use crate::error::{LexError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inner {
    Plain,
    Backslash,
    Unicode { digits: u8, value: u16 },
}

/// Decodes JSON string escapes one input character at a time.
///
/// Feed every character that appears between the opening and closing
/// quotes of a JSON string (the caller is responsible for recognizing the
/// closing, unescaped `"` and never feeding it here). A plain character
/// decodes to itself immediately; a multi-character escape (`\n`,
/// `\uXXXX`, a surrogate pair) yields `None` for its intermediate
/// characters and the decoded code point on the character that completes
/// it.
#[derive(Debug, Clone, Default)]
pub struct EscapeAccumulator {
    inner: Inner,
    pending_high_surrogate: Option<u16>,
}

impl Default for Inner {
    fn default() -> Self {
        Inner::Plain
    }
}

impl EscapeAccumulator {
    /// Creates a fresh accumulator, ready to decode a new string's contents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one character of string content.
    pub fn feed(&mut self, c: char) -> Result<Option<char>> {
        match self.inner {
            Inner::Plain => {
                if c == '\\' {
                    self.inner = Inner::Backslash;
                    Ok(None)
                } else {
                    self.emit(c)
                }
            }
            Inner::Backslash => {
                self.inner = Inner::Plain;
                match c {
                    '"' => self.emit('"'),
                    '\\' => self.emit('\\'),
                    '/' => self.emit('/'),
                    'b' => self.emit('\u{8}'),
                    'f' => self.emit('\u{c}'),
                    'n' => self.emit('\n'),
                    'r' => self.emit('\r'),
                    't' => self.emit('\t'),
                    'u' => {
                        self.inner = Inner::Unicode { digits: 0, value: 0 };
                        Ok(None)
                    }
                    other => Err(LexError::InvalidEscape(other)),
                }
            }
            Inner::Unicode { digits, value } => {
                let digit = c
                    .to_digit(16)
                    .ok_or(LexError::InvalidUnicodeEscape(c))?;
                #[allow(clippy::cast_possible_truncation)]
                let value = (value << 4) | (digit as u16);
                let digits = digits + 1;
                if digits < 4 {
                    self.inner = Inner::Unicode { digits, value };
                    return Ok(None);
                }
                self.inner = Inner::Plain;
                self.combine_unicode(value)
            }
        }
    }

    /// True while a high surrogate is waiting for its matching low surrogate.
    #[must_use]
    pub fn has_pending_surrogate(&self) -> bool {
        self.pending_high_surrogate.is_some()
    }

    /// True when the accumulator is not in the middle of a `\` or `\uXXXX`
    /// escape. The closing quote of a JSON string is only unambiguous when
    /// this is true.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.inner, Inner::Plain)
    }

    /// Call once the closing quote has been recognized. Errors if a high
    /// surrogate is still waiting for its partner.
    pub fn finish(&self) -> Result<()> {
        if self.pending_high_surrogate.is_some() {
            return Err(LexError::UnpairedSurrogate(self.pending_high_surrogate.unwrap()));
        }
        Ok(())
    }

    fn emit(&mut self, c: char) -> Result<Option<char>> {
        if let Some(high) = self.pending_high_surrogate.take() {
            return Err(LexError::UnpairedSurrogate(high));
        }
        Ok(Some(c))
    }

    fn combine_unicode(&mut self, value: u16) -> Result<Option<char>> {
        if let Some(high) = self.pending_high_surrogate.take() {
            return if (0xDC00..=0xDFFF).contains(&value) {
                Ok(Some(decode_surrogate_pair(high, value)))
            } else {
                Err(LexError::UnpairedSurrogate(high))
            };
        }
        if (0xD800..=0xDBFF).contains(&value) {
            self.pending_high_surrogate = Some(value);
            return Ok(None);
        }
        if (0xDC00..=0xDFFF).contains(&value) {
            return Err(LexError::UnpairedSurrogate(value));
        }
        Ok(Some(char::from_u32(u32::from(value)).unwrap_or('\u{FFFD}')))
    }
}

fn decode_surrogate_pair(high: u16, low: u16) -> char {
    let c = 0x1_0000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
    char::from_u32(c).unwrap_or('\u{FFFD}')
}
