use std::sync::Arc;

use crate::demux::Demux;
use crate::sink::{SingleSink, StreamSink};

/// A fully coerced field value, produced by the coercer at token close.
///
/// A nested object field never produces one of these: its value lives on
/// the sub-demultiplexer itself, reached through `FieldSink::Nested`.
#[derive(Debug, Clone)]
pub enum DemuxValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    /// Confirmed to be a member of the field's enumerated set.
    Enumerated(String),
}

/// The live sink backing one declared field for the lifetime of a parse.
///
/// `Nested` holds the sub-demultiplexer directly rather than behind a
/// `SingleSink<Arc<Demux>>`, since the nested object's own fields resolve
/// independently as soon as it is constructed; there is nothing to await
/// for the `Nested` handle itself.
pub enum FieldSink {
    Single(SingleSink<DemuxValue>),
    Stream(StreamSink<char>),
    Nested(Arc<Demux>),
}

impl FieldSink {
    #[must_use]
    pub fn as_single(&self) -> Option<&SingleSink<DemuxValue>> {
        match self {
            Self::Single(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_stream(&self) -> Option<&StreamSink<char>> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_nested(&self) -> Option<&Arc<Demux>> {
        match self {
            Self::Nested(d) => Some(d),
            _ => None,
        }
    }
}
