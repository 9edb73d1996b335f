#![doc = include_str!("../README.md")]

mod coerce;
mod demux;
mod skip;

/// Conformance checking against an externally-supplied schema description.
pub mod conformance;
/// Errors produced by this crate.
pub mod error;
/// Ambient parser configuration.
pub mod options;
/// The declarative field schema.
pub mod schema;
/// Per-field producer/consumer rendezvous primitives.
pub mod sink;
/// Coerced field values.
pub mod value;

pub use demux::Demux;
pub use error::DemuxError;
pub use options::{DemuxOptions, UnknownFieldMode};
pub use schema::{FieldEntry, Schema, SchemaBuilder, SinkKind, ValueKind};
pub use sink::{SingleSink, StreamCursor, StreamSink};
pub use value::{DemuxValue, FieldSink};

#[cfg(feature = "derive")]
pub use jsonmux_derive::DemuxSchema;

/// Implemented by a struct that can describe its own field schema,
/// typically via `#[derive(DemuxSchema)]`.
pub trait DemuxSchemaDef {
    fn demux_schema() -> Schema;
}
