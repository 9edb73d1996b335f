use std::collections::BTreeSet;
use std::sync::Arc;

/// Which sink variant a declared field is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Resolves once, to one value.
    Single,
    /// Emits an ordered, replayable sequence of fragments.
    Stream,
}

/// The semantic type declared for a field.
#[derive(Debug, Clone)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    Null,
    /// A string restricted to a fixed member set.
    Enumerated(Arc<BTreeSet<String>>),
    /// A field whose value is itself a JSON object, parsed by a
    /// sub-demultiplexer built from the given schema.
    Nested(Arc<Schema>),
}

impl PartialEq for ValueKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String, Self::String)
            | (Self::Integer, Self::Integer)
            | (Self::Float, Self::Float)
            | (Self::Boolean, Self::Boolean)
            | (Self::Null, Self::Null) => true,
            (Self::Enumerated(a), Self::Enumerated(b)) => a == b,
            (Self::Nested(a), Self::Nested(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

/// One declared field: its name, which sink variant backs it, and its
/// scalar type.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub name: String,
    pub sink_kind: SinkKind,
    pub value_kind: ValueKind,
}

/// An immutable, declaratively-built field-to-(sink-kind, value-kind)
/// table, fixed before any character is fed.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    entries: Arc<Vec<FieldEntry>>,
}

impl PartialEq for FieldEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.sink_kind == other.sink_kind
            && self.value_kind == other.value_kind
    }
}

impl Schema {
    /// All declared field entries, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldEntry> {
        self.entries.iter()
    }

    /// Looks up a field's declared entry by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&FieldEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a [`Schema`] declaratively.
///
/// # Panics
/// `build` panics if a field is declared `SinkKind::Stream` with anything
/// other than `ValueKind::String` — streaming fragments are only
/// meaningful for string content, so pairing `Stream` with a different
/// value kind is a schema-construction bug, not a runtime parse error.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entries: Vec<FieldEntry>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, sink_kind: SinkKind, value_kind: ValueKind) -> Self {
        let name = name.into();
        assert!(
            sink_kind != SinkKind::Stream || matches!(value_kind, ValueKind::String),
            "field {name:?}: a Stream sink is only valid for ValueKind::String"
        );
        self.entries.push(FieldEntry {
            name,
            sink_kind,
            value_kind,
        });
        self
    }

    #[must_use]
    pub fn build(self) -> Schema {
        Schema {
            entries: Arc::new(self.entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_declared_field() {
        let schema = SchemaBuilder::new()
            .field("a", SinkKind::Single, ValueKind::String)
            .build();
        assert!(schema.lookup("a").is_some());
        assert!(schema.lookup("b").is_none());
    }

    #[test]
    #[should_panic(expected = "Stream sink is only valid")]
    fn stream_requires_string_kind() {
        let _ = SchemaBuilder::new().field("a", SinkKind::Stream, ValueKind::Integer);
    }
}
