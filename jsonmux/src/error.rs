/// Errors produced while feeding characters into a [`crate::Demux`], while
/// coercing a completed token, or while checking schema conformance.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DemuxError {
    /// A character was not valid in the lexer's current state.
    #[error("malformed input: unexpected {0:?} ({1})")]
    MalformedInput(char, &'static str),

    /// A key was not present in the schema (strict mode).
    #[error("unknown field {0:?}")]
    UnknownField(String),

    /// A completed token's shape does not match the field's declared kind.
    #[error("field {field:?}: expected {expected}, found a {actual} token")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A completed string is not a member of the field's enumerated set.
    #[error("field {field:?}: {value:?} is not a declared enum member")]
    InvalidEnumValue { field: String, value: String },

    /// A completed integer token does not fit the target integer type.
    #[error("field {field:?}: {raw:?} overflows the integer range")]
    NumericOverflow { field: String, raw: String },

    /// Non-whitespace characters were fed after the root object closed.
    #[error("extraneous input after the root object closed")]
    ExtraneousInput,

    /// The root object closed without this field ever appearing.
    #[error("field {0:?} was never provided")]
    FieldNeverProvided(String),

    /// `assert_conforms_to` found a structural mismatch.
    #[error("schema mismatch at {path}: {detail}")]
    SchemaMismatch { path: String, detail: String },

    /// A sink was resolved, closed or failed a second time. This is a bug
    /// in the lexer driving the sink, not a condition callers recover
    /// from: it surfaces as a panic from [`crate::SingleSink`] /
    /// [`crate::StreamSink`] rather than a `Result`, but the variant still
    /// exists so that panic message can name it.
    #[error("sink was already resolved or failed")]
    AlreadyTerminal,

    /// Further input was fed to a parser already in the poisoned state.
    #[error("parser is poisoned by a previous error: {0}")]
    Poisoned(Box<DemuxError>),

    /// A lexical error from the underlying character accumulators.
    #[error(transparent)]
    Lex(#[from] jsonmux_lexer::LexError),
}

/// Convenience alias for results from this crate.
pub type Result<T> = core::result::Result<T, DemuxError>;
