use std::collections::BTreeSet;

use crate::error::DemuxError;
use crate::schema::{Schema, ValueKind};

/// The shape of one field as described by an external model description
/// (for example, a function-calling schema handed to an LLM). This type
/// is deliberately independent from [`ValueKind`]: the external
/// description is produced by something outside this crate, and the
/// conformance checker exists precisely to verify the two agree, not to
/// assume they share a representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValueKind {
    String,
    Integer,
    Float,
    Boolean,
    Null,
    Enumerated(BTreeSet<String>),
    Nested(Box<ModelSchema>),
}

/// One field of an external model description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelField {
    pub name: String,
    pub kind: ModelValueKind,
}

/// An external description of an object's fields, to check a [`Schema`]
/// against.
#[derive(Debug, Clone, Default)]
pub struct ModelSchema {
    pub fields: Vec<ModelField>,
}

impl ModelSchema {
    #[must_use]
    pub fn new(fields: Vec<ModelField>) -> Self {
        Self { fields }
    }
}

/// One divergence found while comparing a [`Schema`] against a
/// [`ModelSchema`], qualified by the dotted path to where it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformanceMismatch {
    pub path: String,
    pub detail: String,
}

/// The full set of divergences found by [`diff_conformance`], rather than
/// just the first.
#[derive(Debug, Clone, Default)]
pub struct ConformanceReport {
    pub mismatches: Vec<ConformanceMismatch>,
}

impl ConformanceReport {
    #[must_use]
    pub fn is_conformant(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Checks `schema` against `model`, returning the first divergence found.
///
/// # Errors
/// Returns `DemuxError::SchemaMismatch` on the first field where the two
/// disagree: a field present in one but not the other, a differing value
/// kind, a differing enumerated member set, or (recursively) a divergence
/// inside a nested object's own fields.
pub fn assert_conforms_to(schema: &Schema, model: &ModelSchema) -> Result<(), DemuxError> {
    match diff_conformance(schema, model).mismatches.into_iter().next() {
        Some(m) => Err(DemuxError::SchemaMismatch { path: m.path, detail: m.detail }),
        None => Ok(()),
    }
}

/// Checks `schema` against `model`, collecting every divergence rather
/// than stopping at the first.
#[must_use]
pub fn diff_conformance(schema: &Schema, model: &ModelSchema) -> ConformanceReport {
    let mut report = ConformanceReport::default();
    diff_at("$", schema, model, &mut report);
    report
}

fn diff_at(path: &str, schema: &Schema, model: &ModelSchema, report: &mut ConformanceReport) {
    for entry in schema.fields() {
        let field_path = format!("{path}.{}", entry.name);
        match model.fields.iter().find(|f| f.name == entry.name) {
            None => report.mismatches.push(ConformanceMismatch {
                path: field_path,
                detail: "field is declared but missing from the model description".to_string(),
            }),
            Some(model_field) => diff_kind(&field_path, &entry.value_kind, &model_field.kind, report),
        }
    }
    for model_field in &model.fields {
        if schema.lookup(&model_field.name).is_none() {
            report.mismatches.push(ConformanceMismatch {
                path: format!("{path}.{}", model_field.name),
                detail: "field is in the model description but not declared".to_string(),
            });
        }
    }
}

fn diff_kind(path: &str, ours: &ValueKind, theirs: &ModelValueKind, report: &mut ConformanceReport) {
    match (ours, theirs) {
        (ValueKind::String, ModelValueKind::String)
        | (ValueKind::Integer, ModelValueKind::Integer)
        | (ValueKind::Float, ModelValueKind::Float)
        | (ValueKind::Boolean, ModelValueKind::Boolean)
        | (ValueKind::Null, ModelValueKind::Null) => {}
        (ValueKind::Enumerated(ours), ModelValueKind::Enumerated(theirs)) => {
            if ours.as_ref() != theirs {
                report.mismatches.push(ConformanceMismatch {
                    path: path.to_string(),
                    detail: "enumerated member sets differ".to_string(),
                });
            }
        }
        (ValueKind::Nested(ours), ModelValueKind::Nested(theirs)) => {
            diff_at(path, ours, theirs, report);
        }
        (ours, theirs) => report.mismatches.push(ConformanceMismatch {
            path: path.to_string(),
            detail: format!("declared as {ours:?}, model describes it as {theirs:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::schema::{SchemaBuilder, SinkKind};

    use super::*;

    #[test]
    fn conforms_when_identical() {
        let schema = SchemaBuilder::new()
            .field("name", SinkKind::Single, ValueKind::String)
            .build();
        let model = ModelSchema::new(vec![ModelField { name: "name".to_string(), kind: ModelValueKind::String }]);
        assert!(assert_conforms_to(&schema, &model).is_ok());
    }

    #[test]
    fn reports_missing_and_extra_fields() {
        let schema = SchemaBuilder::new()
            .field("name", SinkKind::Single, ValueKind::String)
            .field("age", SinkKind::Single, ValueKind::Integer)
            .build();
        let model = ModelSchema::new(vec![
            ModelField { name: "name".to_string(), kind: ModelValueKind::String },
            ModelField { name: "email".to_string(), kind: ModelValueKind::String },
        ]);
        let report = diff_conformance(&schema, &model);
        assert_eq!(report.mismatches.len(), 2);
    }

    #[test]
    fn recurses_into_nested_schemas() {
        let inner = SchemaBuilder::new()
            .field("city", SinkKind::Single, ValueKind::String)
            .build();
        let schema = SchemaBuilder::new()
            .field("address", SinkKind::Single, ValueKind::Nested(Arc::new(inner)))
            .build();
        let model = ModelSchema::new(vec![ModelField {
            name: "address".to_string(),
            kind: ModelValueKind::Nested(Box::new(ModelSchema::new(vec![ModelField {
                name: "zip".to_string(),
                kind: ModelValueKind::String,
            }]))),
        }]);
        let report = diff_conformance(&schema, &model);
        assert_eq!(report.mismatches.len(), 2);
        assert!(report.mismatches.iter().any(|m| m.path == "$.address.city"));
        assert!(report.mismatches.iter().any(|m| m.path == "$.address.zip"));
    }
}
