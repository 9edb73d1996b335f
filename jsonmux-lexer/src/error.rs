/// Errors from the low-level character accumulators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    /// A `\` was followed by a character that is not a valid JSON escape.
    #[error("invalid escape character {0:?}")]
    InvalidEscape(char),
    /// A `\uXXXX` escape contained a non-hex-digit character.
    #[error("invalid hex digit {0:?} in \\u escape")]
    InvalidUnicodeEscape(char),
    /// A high surrogate (`\uD800`-`\uDBFF`) was not followed by a matching
    /// low surrogate escape.
    #[error("unpaired UTF-16 surrogate U+{0:04X}")]
    UnpairedSurrogate(u16),
    /// The accumulated number token does not match the JSON number grammar.
    #[error("malformed number token {0:?}")]
    InvalidNumber(String),
    /// A character did not continue any of `true`, `false`, `null`.
    #[error("invalid literal character {0:?}")]
    InvalidLiteral(char),
}

/// Convenience alias for results from this crate.
pub type Result<T> = core::result::Result<T, LexError>;
