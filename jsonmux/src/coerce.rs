use jsonmux_lexer::{Literal, NumberShape};

use crate::error::DemuxError;
use crate::schema::ValueKind;
use crate::value::DemuxValue;

/// Coerces a completed string token.
///
/// `String` and `Enumerated` are the only value kinds a string token can
/// satisfy; everything else is a type mismatch.
pub(crate) fn coerce_string(
    field: &str,
    value_kind: &ValueKind,
    raw: String,
) -> Result<DemuxValue, DemuxError> {
    match value_kind {
        ValueKind::String => Ok(DemuxValue::String(raw)),
        ValueKind::Enumerated(members) => {
            if members.contains(&raw) {
                Ok(DemuxValue::Enumerated(raw))
            } else {
                Err(DemuxError::InvalidEnumValue { field: field.to_string(), value: raw })
            }
        }
        other => Err(DemuxError::TypeMismatch {
            field: field.to_string(),
            expected: expected_name(other),
            actual: "string",
        }),
    }
}

/// Coerces a completed number token.
///
/// An integral-shaped token (no `.` and no exponent) satisfies `Integer`;
/// any well-formed number satisfies `Float`, since widening an integer to
/// `f64` never loses the ability to represent the value as a float.
pub(crate) fn coerce_number(
    field: &str,
    value_kind: &ValueKind,
    raw: String,
    shape: NumberShape,
) -> Result<DemuxValue, DemuxError> {
    match value_kind {
        ValueKind::Integer => {
            if !shape.is_integral() {
                return Err(DemuxError::TypeMismatch {
                    field: field.to_string(),
                    expected: "integer",
                    actual: "number",
                });
            }
            raw.parse::<i64>()
                .map(DemuxValue::Integer)
                .map_err(|_| DemuxError::NumericOverflow { field: field.to_string(), raw })
        }
        ValueKind::Float => raw
            .parse::<f64>()
            .map(DemuxValue::Float)
            .map_err(|_| DemuxError::NumericOverflow { field: field.to_string(), raw }),
        other => Err(DemuxError::TypeMismatch {
            field: field.to_string(),
            expected: expected_name(other),
            actual: "number",
        }),
    }
}

/// Coerces a completed `true` / `false` / `null` literal.
pub(crate) fn coerce_literal(
    field: &str,
    value_kind: &ValueKind,
    literal: Literal,
) -> Result<DemuxValue, DemuxError> {
    match (value_kind, literal) {
        (ValueKind::Boolean, Literal::True) => Ok(DemuxValue::Boolean(true)),
        (ValueKind::Boolean, Literal::False) => Ok(DemuxValue::Boolean(false)),
        (ValueKind::Null, Literal::Null) => Ok(DemuxValue::Null),
        (other, literal) => Err(DemuxError::TypeMismatch {
            field: field.to_string(),
            expected: expected_name(other),
            actual: literal_name(literal),
        }),
    }
}

pub(crate) fn expected_name(kind: &ValueKind) -> &'static str {
    match kind {
        ValueKind::String => "string",
        ValueKind::Integer => "integer",
        ValueKind::Float => "float",
        ValueKind::Boolean => "boolean",
        ValueKind::Null => "null",
        ValueKind::Enumerated(_) => "enumerated string",
        ValueKind::Nested(_) => "object",
    }
}

fn literal_name(literal: Literal) -> &'static str {
    match literal {
        Literal::True | Literal::False => "boolean",
        Literal::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn string_into_string_kind() {
        let v = coerce_string("name", &ValueKind::String, "hi".to_string()).unwrap();
        assert!(matches!(v, DemuxValue::String(s) if s == "hi"));
    }

    #[test]
    fn string_into_enum_kind_rejects_unknown_member() {
        let set = Arc::new(BTreeSet::from(["a".to_string()]));
        let err = coerce_string("role", &ValueKind::Enumerated(set), "b".to_string()).unwrap_err();
        assert!(matches!(err, DemuxError::InvalidEnumValue { .. }));
    }

    #[test]
    fn integer_rejects_float_shaped_token() {
        let shape = NumberShape { has_fraction: true, has_exponent: false };
        let err = coerce_number("n", &ValueKind::Integer, "1.5".to_string(), shape).unwrap_err();
        assert!(matches!(err, DemuxError::TypeMismatch { .. }));
    }

    #[test]
    fn float_accepts_integral_token() {
        let shape = NumberShape { has_fraction: false, has_exponent: false };
        let v = coerce_number("n", &ValueKind::Float, "3".to_string(), shape).unwrap();
        assert!(matches!(v, DemuxValue::Float(f) if f == 3.0));
    }

    #[test]
    fn literal_type_mismatch() {
        let err = coerce_literal("flag", &ValueKind::Null, Literal::True).unwrap_err();
        assert!(matches!(err, DemuxError::TypeMismatch { .. }));
    }
}
