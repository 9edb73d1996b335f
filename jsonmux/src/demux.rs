use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jsonmux_lexer::{EscapeAccumulator, LiteralMatcher, NumberAccumulator};
use tracing::{debug, trace, warn};

use crate::coerce;
use crate::error::DemuxError;
use crate::options::DemuxOptions;
use crate::schema::{FieldEntry, Schema, SinkKind, ValueKind};
use crate::skip::{SkipOutcome, Skipper};
use crate::sink::{SingleSink, StreamSink};
use crate::value::{DemuxValue, FieldSink};

#[derive(Clone, Copy)]
enum Shape {
    String,
    Number,
    Literal,
    Object,
    Array,
}

impl Shape {
    fn name(self) -> &'static str {
        match self {
            Shape::String => "string",
            Shape::Number => "number",
            Shape::Literal => "literal",
            Shape::Object => "object",
            Shape::Array => "array",
        }
    }
}

fn classify_shape(c: char) -> Option<Shape> {
    match c {
        '"' => Some(Shape::String),
        '-' => Some(Shape::Number),
        d if d.is_ascii_digit() => Some(Shape::Number),
        't' | 'f' | 'n' => Some(Shape::Literal),
        '{' => Some(Shape::Object),
        '[' => Some(Shape::Array),
        _ => None,
    }
}

/// Whether `entry`'s own accumulator can hold a token of the given shape,
/// without going through the skip machine.
fn is_native_shape(entry: &FieldEntry, shape: Shape) -> bool {
    match (&entry.sink_kind, &entry.value_kind, shape) {
        (_, ValueKind::Nested(_), Shape::Object) => true,
        (_, ValueKind::Nested(_), _) => false,
        (SinkKind::Stream, _, Shape::String) => true,
        (SinkKind::Stream, _, _) => false,
        (SinkKind::Single, _, Shape::String | Shape::Number | Shape::Literal) => true,
        (SinkKind::Single, _, Shape::Object | Shape::Array) => false,
    }
}

enum LexState {
    BeforeObject,
    ExpectKeyOrClose { allow_close: bool },
    StringKey { buf: String, escape: EscapeAccumulator },
    ExpectColon { key: String },
    ExpectValue { key: String },
    ValueString { key: String, buf: String, escape: EscapeAccumulator },
    ValueStreamString { key: String, escape: EscapeAccumulator },
    ValueNumber { key: String, acc: NumberAccumulator },
    ValueLiteral { key: String, matcher: LiteralMatcher },
    ValueNested { key: String, child: Arc<Demux> },
    SkippingValue(Skipper),
    ExpectCommaOrClose,
    Done,
    Poisoned(DemuxError),
}

enum StepResult {
    /// `c` was consumed; `state` is what comes next.
    Consumed(LexState),
    /// `c` was *not* consumed; `state` is what comes next and `c` must be
    /// fed again against it.
    Reconsume(LexState),
}

/// A character-driven demultiplexer for one JSON object.
///
/// Construct with [`Demux::new`], feed characters with [`Demux::feed_char`]
/// or [`Demux::feed_chunks`], and read field values off the sinks returned
/// by [`Demux::get`], [`Demux::stream`] or [`Demux::nested`] — from any
/// task, at any time, including before the corresponding character has
/// arrived.
pub struct Demux {
    schema: Schema,
    options: DemuxOptions,
    sinks: Vec<FieldSink>,
    index: HashMap<String, usize>,
    state: Mutex<LexState>,
    span: tracing::Span,
}

impl Demux {
    /// Builds a demultiplexer for `schema` with default options.
    #[must_use]
    pub fn new(schema: Schema) -> Arc<Self> {
        Self::with_options(schema, DemuxOptions::new())
    }

    /// Builds a demultiplexer for `schema`, eagerly constructing every
    /// declared field's sink (including nested sub-demultiplexers) so that
    /// consumers may start awaiting them before any character is fed.
    #[must_use]
    pub fn with_options(schema: Schema, options: DemuxOptions) -> Arc<Self> {
        let span = tracing::info_span!("jsonmux::demux");
        let mut index = HashMap::with_capacity(schema.len());
        let mut sinks = Vec::with_capacity(schema.len());
        for (i, entry) in schema.fields().enumerate() {
            index.insert(entry.name.clone(), i);
            let sink = match (&entry.sink_kind, &entry.value_kind) {
                (SinkKind::Stream, _) => FieldSink::Stream(StreamSink::new()),
                (SinkKind::Single, ValueKind::Nested(sub)) => {
                    FieldSink::Nested(Demux::with_options((**sub).clone(), options.clone()))
                }
                (SinkKind::Single, _) => FieldSink::Single(SingleSink::new()),
            };
            sinks.push(sink);
        }
        Arc::new(Self {
            schema,
            options,
            sinks,
            index,
            state: Mutex::new(LexState::BeforeObject),
            span,
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SingleSink<DemuxValue>> {
        self.find(name)?.as_single()
    }

    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamSink<char>> {
        self.find(name)?.as_stream()
    }

    #[must_use]
    pub fn nested(&self, name: &str) -> Option<&Arc<Demux>> {
        self.find(name)?.as_nested()
    }

    fn find(&self, name: &str) -> Option<&FieldSink> {
        self.sinks.get(*self.index.get(name)?)
    }

    fn sink(&self, name: &str) -> &FieldSink {
        self.find(name)
            .expect("key reached a sink-touching state only after a successful schema lookup")
    }

    /// Feeds one character. Synchronous and non-suspending: it either
    /// advances internal state or returns an error; it never blocks on a
    /// sink.
    ///
    /// # Errors
    /// Returns the same error the parser poisons itself with. Once
    /// poisoned, every subsequent call returns `DemuxError::Poisoned`
    /// wrapping the original cause.
    pub fn feed_char(&self, c: char) -> Result<(), DemuxError> {
        let _entered = self.span.enter();
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let LexState::Poisoned(e) = &*guard {
            return Err(DemuxError::Poisoned(Box::new(e.clone())));
        }
        let mut pending = c;
        loop {
            let current = std::mem::replace(&mut *guard, LexState::Poisoned(DemuxError::ExtraneousInput));
            match self.step(current, pending) {
                Ok(StepResult::Consumed(next)) => {
                    *guard = next;
                    return Ok(());
                }
                Ok(StepResult::Reconsume(next)) => {
                    *guard = next;
                }
                Err(e) => {
                    warn!(error = %e, "demux poisoned");
                    *guard = LexState::Poisoned(e.clone());
                    drop(guard);
                    self.fail_all_sinks(e.clone());
                    return Err(e);
                }
            }
        }
    }

    /// Feeds every character of `chunk` in order. Chunk boundaries carry no
    /// meaning: `feed_chunks("ab")` and `feed_chunks("a")` then
    /// `feed_chunks("b")` leave the parser in the same state.
    ///
    /// # Errors
    /// See [`Demux::feed_char`].
    pub fn feed_chunks(&self, chunk: &str) -> Result<(), DemuxError> {
        for c in chunk.chars() {
            self.feed_char(c)?;
        }
        Ok(())
    }

    /// Poisons the parser and fails every sink not already terminal,
    /// recursively through nested sub-demultiplexers.
    pub fn abort(&self, error: DemuxError) {
        {
            let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if matches!(*guard, LexState::Done | LexState::Poisoned(_)) {
                return;
            }
            *guard = LexState::Poisoned(error.clone());
        }
        self.fail_all_sinks(error);
    }

    /// Fails every sink not already terminal with `error`, recursing into
    /// nested sub-demultiplexers. Does not touch `self.state` — callers that
    /// already hold the state lock must drop it first.
    fn fail_all_sinks(&self, error: DemuxError) {
        for sink in &self.sinks {
            match sink {
                FieldSink::Single(s) => {
                    if !s.is_terminal() {
                        s.fail(error.clone());
                    }
                }
                FieldSink::Stream(s) => {
                    if !s.is_terminal() {
                        s.fail(error.clone());
                    }
                }
                FieldSink::Nested(child) => child.abort(error.clone()),
            }
        }
    }

    fn is_done(&self) -> bool {
        matches!(*self.state.lock().unwrap_or_else(|e| e.into_inner()), LexState::Done)
    }

    fn was_started(&self) -> bool {
        !matches!(*self.state.lock().unwrap_or_else(|e| e.into_inner()), LexState::BeforeObject)
    }

    /// Fails every sink not yet terminal with `FieldNeverProvided`, and
    /// recursively aborts any nested sub-demultiplexer whose key never
    /// appeared at all.
    fn finalize(&self) {
        for (i, entry) in self.schema.fields().enumerate() {
            match &self.sinks[i] {
                FieldSink::Single(s) => {
                    if !s.is_terminal() {
                        s.fail(DemuxError::FieldNeverProvided(entry.name.clone()));
                    }
                }
                FieldSink::Stream(s) => {
                    if !s.is_terminal() {
                        s.fail(DemuxError::FieldNeverProvided(entry.name.clone()));
                    }
                }
                FieldSink::Nested(child) => {
                    if !child.was_started() {
                        child.abort(DemuxError::FieldNeverProvided(entry.name.clone()));
                    }
                }
            }
        }
        debug!("object closed");
    }

    fn fail_mismatched(&self, entry: &FieldEntry, key: &str, shape: Shape) {
        let err = DemuxError::TypeMismatch {
            field: key.to_string(),
            expected: coerce::expected_name(&entry.value_kind),
            actual: shape.name(),
        };
        match self.sink(key) {
            FieldSink::Single(s) => s.fail(err),
            FieldSink::Stream(s) => s.fail(err),
            FieldSink::Nested(child) => child.abort(err),
        }
    }

    fn drive_skipper(&self, mut skipper: Skipper, c: char) -> Result<StepResult, DemuxError> {
        match skipper.feed(c)? {
            SkipOutcome::Continue => Ok(StepResult::Consumed(LexState::SkippingValue(skipper))),
            SkipOutcome::Done => Ok(StepResult::Consumed(LexState::ExpectCommaOrClose)),
            SkipOutcome::DoneReconsume => Ok(StepResult::Reconsume(LexState::ExpectCommaOrClose)),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn step(&self, state: LexState, c: char) -> Result<StepResult, DemuxError> {
        use LexState::{
            BeforeObject, Done, ExpectColon, ExpectCommaOrClose, ExpectKeyOrClose, ExpectValue,
            Poisoned, SkippingValue, StringKey, ValueLiteral, ValueNested, ValueNumber,
            ValueStreamString, ValueString,
        };
        trace!(char = %c, "feed");
        match state {
            Poisoned(e) => unreachable!("feed_char short-circuits before reaching a poisoned step: {e}"),

            BeforeObject => {
                if c.is_whitespace() {
                    Ok(StepResult::Consumed(BeforeObject))
                } else if c == '{' {
                    Ok(StepResult::Consumed(ExpectKeyOrClose { allow_close: true }))
                } else {
                    Err(DemuxError::MalformedInput(c, "expected '{' to start the object"))
                }
            }

            ExpectKeyOrClose { allow_close } => {
                if c.is_whitespace() {
                    Ok(StepResult::Consumed(ExpectKeyOrClose { allow_close }))
                } else if c == '"' {
                    Ok(StepResult::Consumed(StringKey { buf: String::new(), escape: EscapeAccumulator::new() }))
                } else if c == '}' && allow_close {
                    self.finalize();
                    Ok(StepResult::Consumed(Done))
                } else {
                    Err(DemuxError::MalformedInput(c, "expected a field name or '}'"))
                }
            }

            StringKey { mut buf, mut escape } => {
                if escape.is_idle() && c == '"' {
                    escape.finish()?;
                    Ok(StepResult::Consumed(ExpectColon { key: buf }))
                } else {
                    if let Some(d) = escape.feed(c)? {
                        buf.push(d);
                    }
                    Ok(StepResult::Consumed(StringKey { buf, escape }))
                }
            }

            ExpectColon { key } => {
                if c.is_whitespace() {
                    Ok(StepResult::Consumed(ExpectColon { key }))
                } else if c == ':' {
                    Ok(StepResult::Consumed(ExpectValue { key }))
                } else {
                    Err(DemuxError::MalformedInput(c, "expected ':' after a field name"))
                }
            }

            ExpectValue { key } => {
                if c.is_whitespace() {
                    return Ok(StepResult::Consumed(ExpectValue { key }));
                }
                match self.schema.lookup(&key) {
                    None => match self.options.unknown_field_mode {
                        crate::options::UnknownFieldMode::Strict => {
                            Err(DemuxError::UnknownField(key))
                        }
                        crate::options::UnknownFieldMode::Skip => {
                            self.drive_skipper(Skipper::new(), c)
                        }
                    },
                    Some(entry) => {
                        let shape = classify_shape(c)
                            .ok_or(DemuxError::MalformedInput(c, "expected a value"))?;
                        if is_native_shape(entry, shape) {
                            match shape {
                                Shape::String => match entry.sink_kind {
                                    SinkKind::Stream => Ok(StepResult::Consumed(ValueStreamString {
                                        key,
                                        escape: EscapeAccumulator::new(),
                                    })),
                                    SinkKind::Single => Ok(StepResult::Consumed(ValueString {
                                        key,
                                        buf: String::new(),
                                        escape: EscapeAccumulator::new(),
                                    })),
                                },
                                Shape::Number => Ok(StepResult::Consumed(ValueNumber {
                                    key,
                                    acc: NumberAccumulator::start(c)?,
                                })),
                                Shape::Literal => Ok(StepResult::Consumed(ValueLiteral {
                                    key,
                                    matcher: LiteralMatcher::start(c)?,
                                })),
                                Shape::Object => {
                                    let child = self
                                        .sink(&key)
                                        .as_nested()
                                        .expect("native Object shape implies a Nested sink")
                                        .clone();
                                    child.feed_char(c)?;
                                    Ok(StepResult::Consumed(ValueNested { key, child }))
                                }
                                Shape::Array => unreachable!("Array is never a native shape"),
                            }
                        } else {
                            self.fail_mismatched(entry, &key, shape);
                            self.drive_skipper(Skipper::new(), c)
                        }
                    }
                }
            }

            SkippingValue(mut skipper) => match skipper.feed(c)? {
                SkipOutcome::Continue => Ok(StepResult::Consumed(SkippingValue(skipper))),
                SkipOutcome::Done => Ok(StepResult::Consumed(ExpectCommaOrClose)),
                SkipOutcome::DoneReconsume => Ok(StepResult::Reconsume(ExpectCommaOrClose)),
            },

            ValueString { key, mut buf, mut escape } => {
                if escape.is_idle() && c == '"' {
                    escape.finish()?;
                    let entry = self.schema.lookup(&key).expect("routed key always has a schema entry");
                    let coerced = coerce::coerce_string(&key, &entry.value_kind, buf);
                    let sink = self.sink(&key).as_single().expect("ValueString only reached for Single sinks");
                    match coerced {
                        Ok(v) => sink.resolve(v),
                        Err(e) => sink.fail(e),
                    }
                    Ok(StepResult::Consumed(ExpectCommaOrClose))
                } else {
                    if let Some(d) = escape.feed(c)? {
                        buf.push(d);
                    }
                    Ok(StepResult::Consumed(ValueString { key, buf, escape }))
                }
            }

            ValueStreamString { key, mut escape } => {
                if escape.is_idle() && c == '"' {
                    escape.finish()?;
                    self.sink(&key)
                        .as_stream()
                        .expect("ValueStreamString only reached for Stream sinks")
                        .close();
                    Ok(StepResult::Consumed(ExpectCommaOrClose))
                } else {
                    if let Some(d) = escape.feed(c)? {
                        self.sink(&key)
                            .as_stream()
                            .expect("ValueStreamString only reached for Stream sinks")
                            .push(d);
                    }
                    Ok(StepResult::Consumed(ValueStreamString { key, escape }))
                }
            }

            ValueNumber { key, mut acc } => {
                if acc.feed(c)? {
                    Ok(StepResult::Consumed(ValueNumber { key, acc }))
                } else {
                    let (raw, shape) = acc.finish()?;
                    let entry = self.schema.lookup(&key).expect("routed key always has a schema entry");
                    let coerced = coerce::coerce_number(&key, &entry.value_kind, raw, shape);
                    let sink = self.sink(&key).as_single().expect("ValueNumber only reached for Single sinks");
                    match coerced {
                        Ok(v) => sink.resolve(v),
                        Err(e) => sink.fail(e),
                    }
                    Ok(StepResult::Reconsume(ExpectCommaOrClose))
                }
            }

            ValueLiteral { key, mut matcher } => match matcher.feed(c)? {
                Some(lit) => {
                    let entry = self.schema.lookup(&key).expect("routed key always has a schema entry");
                    let coerced = coerce::coerce_literal(&key, &entry.value_kind, lit);
                    let sink = self.sink(&key).as_single().expect("ValueLiteral only reached for Single sinks");
                    match coerced {
                        Ok(v) => sink.resolve(v),
                        Err(e) => sink.fail(e),
                    }
                    Ok(StepResult::Consumed(ExpectCommaOrClose))
                }
                None => Ok(StepResult::Consumed(ValueLiteral { key, matcher })),
            },

            ValueNested { key, child } => {
                child.feed_char(c)?;
                if child.is_done() {
                    Ok(StepResult::Consumed(ExpectCommaOrClose))
                } else {
                    Ok(StepResult::Consumed(ValueNested { key, child }))
                }
            }

            ExpectCommaOrClose => {
                if c.is_whitespace() {
                    Ok(StepResult::Consumed(ExpectCommaOrClose))
                } else if c == ',' {
                    Ok(StepResult::Consumed(ExpectKeyOrClose { allow_close: false }))
                } else if c == '}' {
                    self.finalize();
                    Ok(StepResult::Consumed(Done))
                } else {
                    Err(DemuxError::MalformedInput(c, "expected ',' or '}'"))
                }
            }

            Done => {
                if c.is_whitespace() {
                    Ok(StepResult::Consumed(Done))
                } else {
                    Err(DemuxError::ExtraneousInput)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::options::{DemuxOptions, UnknownFieldMode};
    use crate::schema::{SchemaBuilder, SinkKind, ValueKind};

    use super::*;

    #[tokio::test]
    async fn scalars_resolve() {
        let schema = SchemaBuilder::new()
            .field("name", SinkKind::Single, ValueKind::String)
            .field("age", SinkKind::Single, ValueKind::Integer)
            .build();
        let demux = Demux::new(schema);
        demux.feed_chunks(r#"{"name":"ada","age":36}"#).unwrap();
        match demux.get("name").unwrap().get().await.unwrap() {
            DemuxValue::String(s) => assert_eq!(s, "ada"),
            other => panic!("unexpected {other:?}"),
        }
        match demux.get("age").unwrap().get().await.unwrap() {
            DemuxValue::Integer(36) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_field_emits_fragments_as_they_arrive() {
        let schema = SchemaBuilder::new()
            .field("text", SinkKind::Stream, ValueKind::String)
            .build();
        let demux = Demux::new(schema);
        let mut cursor = demux.stream("text").unwrap().iterate();
        demux.feed_chunks(r#"{"text":"hi"}"#).unwrap();
        let mut out = String::new();
        while let Some(Ok(c)) = cursor.next().await {
            out.push(c);
        }
        assert_eq!(out, "hi");
    }

    #[tokio::test]
    async fn nested_object_resolves_independently() {
        let inner = SchemaBuilder::new()
            .field("city", SinkKind::Single, ValueKind::String)
            .build();
        let schema = SchemaBuilder::new()
            .field("address", SinkKind::Single, ValueKind::Nested(Arc::new(inner)))
            .build();
        let demux = Demux::new(schema);
        demux.feed_chunks(r#"{"address":{"city":"nyc"}}"#).unwrap();
        let child = demux.nested("address").unwrap();
        match child.get("city").unwrap().get().await.unwrap() {
            DemuxValue::String(s) => assert_eq!(s, "nyc"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn enumerated_field_rejects_unknown_member() {
        let members = Arc::new(std::collections::BTreeSet::from(["a".to_string(), "b".to_string()]));
        let schema = SchemaBuilder::new()
            .field("role", SinkKind::Single, ValueKind::Enumerated(members))
            .build();
        let demux = Demux::new(schema);
        demux.feed_chunks(r#"{"role":"c"}"#).unwrap();
        let err = demux.get("role").unwrap().get().await.unwrap_err();
        assert!(matches!(err, DemuxError::InvalidEnumValue { .. }));
    }

    #[tokio::test]
    async fn escapes_decode_inside_values() {
        let schema = SchemaBuilder::new()
            .field("msg", SinkKind::Single, ValueKind::String)
            .build();
        let demux = Demux::new(schema);
        demux.feed_chunks(r#"{"msg":"a\nb"}"#).unwrap();
        match demux.get("msg").unwrap().get().await.unwrap() {
            DemuxValue::String(s) => assert_eq!(s, "a\nb"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_field_strict_poisons() {
        let schema = SchemaBuilder::new()
            .field("name", SinkKind::Single, ValueKind::String)
            .build();
        let demux = Demux::new(schema);
        let err = demux.feed_chunks(r#"{"surprise":1}"#).unwrap_err();
        assert!(matches!(err, DemuxError::UnknownField(_)));
    }

    #[tokio::test]
    async fn unknown_field_skip_mode_continues_parsing() {
        let schema = SchemaBuilder::new()
            .field("name", SinkKind::Single, ValueKind::String)
            .build();
        let demux = Demux::with_options(
            schema,
            DemuxOptions::new().with_unknown_field_mode(UnknownFieldMode::Skip),
        );
        demux
            .feed_chunks(r#"{"surprise":{"a":[1,2,3]},"name":"ok"}"#)
            .unwrap();
        match demux.get("name").unwrap().get().await.unwrap() {
            DemuxValue::String(s) => assert_eq!(s, "ok"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn field_never_provided_resolves_instead_of_hanging() {
        let schema = SchemaBuilder::new()
            .field("name", SinkKind::Single, ValueKind::String)
            .build();
        let demux = Demux::new(schema);
        demux.feed_chunks("{}").unwrap();
        let err = demux.get("name").unwrap().get().await.unwrap_err();
        assert!(matches!(err, DemuxError::FieldNeverProvided(_)));
    }

    #[tokio::test]
    async fn extraneous_trailing_content_is_rejected() {
        let schema = SchemaBuilder::new()
            .field("name", SinkKind::Single, ValueKind::String)
            .build();
        let demux = Demux::new(schema);
        let err = demux.feed_chunks(r#"{"name":"a"}x"#).unwrap_err();
        assert!(matches!(err, DemuxError::ExtraneousInput));
    }

    #[tokio::test]
    async fn parse_error_fails_pending_sinks_instead_of_hanging() {
        let schema = SchemaBuilder::new()
            .field("name", SinkKind::Single, ValueKind::String)
            .field("age", SinkKind::Single, ValueKind::Integer)
            .build();
        let demux = Demux::new(schema);
        let age = demux.get("age").unwrap();
        assert!(demux.feed_chunks(r#"{"name":"a","age":"#).is_ok());
        assert!(demux.feed_char('x').is_err());
        assert!(age.get().await.is_err());
    }

    #[tokio::test]
    async fn chunk_boundaries_do_not_affect_the_result() {
        let schema = SchemaBuilder::new()
            .field("n", SinkKind::Single, ValueKind::Integer)
            .build();
        let demux = Demux::new(schema);
        for piece in [r#"{"n""#, r#":4"#, "2}"] {
            demux.feed_chunks(piece).unwrap();
        }
        match demux.get("n").unwrap().get().await.unwrap() {
            DemuxValue::Integer(42) => {}
            other => panic!("unexpected {other:?}"),
        }
    }
}
