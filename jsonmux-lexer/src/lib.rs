#![doc = include_str!("../README.md")]

//! Character accumulators shared by the `jsonmux` state machine.
//!
//! This crate knows nothing about field schemas or sinks; it only
//! understands the lexical shape of JSON string escapes, numbers and
//! `true`/`false`/`null` literals, one character at a time.

/// Error types for the low-level accumulators.
pub mod error;
/// Incremental decoding of JSON string escape sequences.
pub mod escape;
/// Incremental matching of the `true`/`false`/`null` literals.
pub mod literal;
/// Incremental validation and accumulation of a JSON number token.
pub mod number;

pub use error::{LexError, Result};
pub use escape::EscapeAccumulator;
pub use literal::{Literal, LiteralMatcher};
pub use number::{NumberAccumulator, NumberShape};
