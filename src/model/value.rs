//! Typed property values and the declared kinds they are validated against.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Rotation, Vector};
use crate::{Error, Result};

/// A value stored in (or offered to) a node property slot.
///
/// `Text` doubles as the textual input form: assigning `Value::Text("1 2 3")`
/// to a vector property parses it into `Value::Vector`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Vector(Vector),
    Rotation(Rotation),
    Scalar(f64),
    Text(String),
}

/// Declared type of a property slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Vector,
    Rotation,
    Scalar,
    Text,
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Vector(_) => "VECTOR",
            Value::Rotation(_) => "ROTATION",
            Value::Scalar(_) => "SCALAR",
            Value::Text(_) => "TEXT",
        }
    }

    /// The property kind this value natively belongs to.
    pub fn kind(&self) -> PropertyKind {
        match self {
            Value::Vector(_) => PropertyKind::Vector,
            Value::Rotation(_) => PropertyKind::Rotation,
            Value::Scalar(_) => PropertyKind::Scalar,
            Value::Text(_) => PropertyKind::Text,
        }
    }

    pub fn as_vector(&self) -> Option<Vector> {
        match self {
            Value::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_rotation(&self) -> Option<Rotation> {
        match self {
            Value::Rotation(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

// ============================================================================
// Validation against a declared kind
// ============================================================================

impl PropertyKind {
    /// Validate `value` for a property of this kind, parsing textual input.
    ///
    /// The returned value is always of this kind. Non-finite numbers are
    /// rejected whether they arrive typed or as text.
    pub fn coerce(self, property: &str, value: Value) -> Result<Value> {
        let invalid = |reason: String| Error::InvalidArgument {
            property: property.to_string(),
            reason,
        };

        match (self, value) {
            (PropertyKind::Vector, Value::Vector(v)) if v.is_finite() => Ok(Value::Vector(v)),
            (PropertyKind::Vector, Value::Text(s)) => Vector::parse(&s)
                .map(Value::Vector)
                .map_err(|e| e.into_invalid(property)),

            (PropertyKind::Rotation, Value::Rotation(r)) if r.is_finite() => Ok(Value::Rotation(r)),
            (PropertyKind::Rotation, Value::Text(s)) => Rotation::parse(&s)
                .map(Value::Rotation)
                .map_err(|e| e.into_invalid(property)),

            (PropertyKind::Scalar, Value::Scalar(f)) if f.is_finite() => Ok(Value::Scalar(f)),
            (PropertyKind::Scalar, Value::Text(s)) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Scalar(f)),
                Ok(_) => Err(invalid("value must be finite".into())),
                Err(_) => Err(invalid(format!("{s:?} is not a number"))),
            },

            (PropertyKind::Text, Value::Text(s)) => Ok(Value::Text(s)),

            (kind, other) if kind == other.kind() => Err(invalid("value must be finite".into())),
            (kind, other) => Err(invalid(format!(
                "expected {}, got {} {}",
                kind.type_name(),
                other.type_name(),
                other
            ))),
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            PropertyKind::Vector => "VECTOR",
            PropertyKind::Rotation => "ROTATION",
            PropertyKind::Scalar => "SCALAR",
            PropertyKind::Text => "TEXT",
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<Vector> for Value { fn from(v: Vector) -> Self { Value::Vector(v) } }
impl From<Rotation> for Value { fn from(v: Rotation) -> Self { Value::Rotation(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Scalar(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Scalar(f64::from(v)) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::Text(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::Text(v.to_owned()) } }

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Vector(v) => write!(f, "{v}"),
            Value::Rotation(r) => write!(f, "{r}"),
            Value::Scalar(s) => write!(f, "{s}"),
            Value::Text(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::Text("hello".into()));
        assert_eq!(Value::from(26), Value::Scalar(26.0));
        assert_eq!(Value::from(0.5), Value::Scalar(0.5));
        assert_eq!(Value::from(Vector::ONE), Value::Vector(Vector::ONE));
    }

    #[test]
    fn test_coerce_parses_text() {
        assert_eq!(
            PropertyKind::Vector.coerce("position", "3 4 5".into()).unwrap(),
            Value::Vector(Vector::new(3.0, 4.0, 5.0))
        );
        assert_eq!(
            PropertyKind::Scalar.coerce("mass", " 10 ".into()).unwrap(),
            Value::Scalar(10.0)
        );
    }

    #[test]
    fn test_coerce_rejects_wrong_kind() {
        let err = PropertyKind::Vector.coerce("velocity", Value::Scalar(1.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { ref property, .. } if property == "velocity"));

        let err = PropertyKind::Text.coerce("material", Value::Scalar(1.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_coerce_rejects_non_finite() {
        assert!(PropertyKind::Scalar.coerce("mass", "NaN".into()).is_err());
        assert!(PropertyKind::Scalar.coerce("mass", Value::Scalar(f64::INFINITY)).is_err());
        assert!(PropertyKind::Vector
            .coerce("position", Value::Vector(Vector::new(f64::NAN, 0.0, 0.0)))
            .is_err());
        assert!(PropertyKind::Rotation
            .coerce("rotation", Value::Rotation(Rotation::new(0.0, f64::INFINITY, 0.0)))
            .is_err());
    }
}
