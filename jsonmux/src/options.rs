/// How an unrecognized field name is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFieldMode {
    /// Fail the parse with `DemuxError::UnknownField`. Safer, and the
    /// recommended default.
    #[default]
    Strict,
    /// Consume a full balanced value for the unknown key without routing
    /// it anywhere, and keep parsing.
    Skip,
}

/// Configuration accepted by [`crate::Demux::new`].
#[derive(Debug, Clone, Default)]
pub struct DemuxOptions {
    pub unknown_field_mode: UnknownFieldMode,
}

impl DemuxOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_unknown_field_mode(mut self, mode: UnknownFieldMode) -> Self {
        self.unknown_field_mode = mode;
        self
    }
}
