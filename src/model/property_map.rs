//! PropertyMap: the typed slots carried by every node.

use hashbrown::HashMap;

use super::{PropertyKind, Value};
use crate::Result;

/// A map of property names to typed slots.
pub type PropertyMap = HashMap<String, Slot>;

/// One declared property: its kind, its default, and the stored value once
/// materialized.
///
/// `value` stays `None` until the first read or write, so untouched slots
/// keep reporting whatever their declared default is.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    kind: PropertyKind,
    default: Value,
    value: Option<Value>,
}

impl Slot {
    pub fn new(kind: PropertyKind, default: Value) -> Self {
        debug_assert_eq!(kind, default.kind());
        Self { kind, default, value: None }
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn is_materialized(&self) -> bool {
        self.value.is_some()
    }

    /// Current value, materializing the default on first access.
    pub fn get(&mut self) -> &Value {
        self.value.get_or_insert_with(|| self.default.clone())
    }

    /// Current value without materializing.
    pub fn peek(&self) -> &Value {
        self.value.as_ref().unwrap_or(&self.default)
    }

    /// Validate and store. On error the previous value is left untouched.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<&Value> {
        let value = self.kind.coerce(name, value)?;
        Ok(self.value.insert(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vector;

    #[test]
    fn test_lazy_default() {
        let mut slot = Slot::new(PropertyKind::Vector, Value::Vector(Vector::ONE));
        assert!(!slot.is_materialized());
        assert_eq!(slot.peek(), &Value::Vector(Vector::ONE));
        assert!(!slot.is_materialized());
        assert_eq!(slot.get(), &Value::Vector(Vector::ONE));
        assert!(slot.is_materialized());
    }

    #[test]
    fn test_failed_assign_keeps_previous() {
        let mut slot = Slot::new(PropertyKind::Scalar, Value::Scalar(0.0));
        slot.assign("mass", "26".into()).unwrap();
        assert!(slot.assign("mass", "heavy".into()).is_err());
        assert_eq!(slot.peek(), &Value::Scalar(26.0));
    }
}
