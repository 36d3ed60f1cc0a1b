//! Field value types for records.
//!
//! Record fields support primitives plus references to other records.
//! A [`FieldValue::Reference`] is how a reconciled child points at its
//! parent record.

use serde::{Deserialize, Serialize};

use crate::record::RecordId;

/// Possible values a record field can hold.
///
/// # Examples
///
/// ```
/// use reconciler::FieldValue;
///
/// let name = FieldValue::String("Doe".to_string());
/// let active = FieldValue::Bool(true);
///
/// assert!(name.is_string());
/// assert!(active.is_bool());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Identifier of another record (e.g., a child's pointer to its parent).
    Reference(RecordId),
    /// Arbitrary structured JSON data.
    Structured(serde_json::Value),
    Null,
}

impl FieldValue {
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }

    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_reference(&self) -> Option<RecordId> {
        match self {
            Self::Reference(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Structured(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Reference(_) => "reference",
            Self::Structured(_) => "structured",
            Self::Null => "null",
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Reference(v) => write!(f, "ref:{v}"),
            Self::Structured(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
        }
    }
}

// Convenient From implementations
impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<RecordId> for FieldValue {
    fn from(v: RecordId) -> Self {
        Self::Reference(v)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Structured(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_bool() {
        let val = FieldValue::Bool(true);
        assert!(val.is_bool());
        assert_eq!(val.as_bool(), Some(true));
        assert_eq!(val.type_name(), "bool");
    }

    #[test]
    fn test_value_int() {
        let val = FieldValue::Int(42);
        assert!(val.is_int());
        assert_eq!(val.as_int(), Some(42));
        assert_eq!(val.as_float(), Some(42.0)); // Int can be read as float
        assert_eq!(val.type_name(), "int");
    }

    #[test]
    fn test_value_string() {
        let val = FieldValue::String("Doe".to_string());
        assert!(val.is_string());
        assert_eq!(val.as_string(), Some("Doe"));
        assert_eq!(val.type_name(), "string");
    }

    #[test]
    fn test_value_reference() {
        let id = RecordId::new();
        let val = FieldValue::Reference(id);
        assert!(val.is_reference());
        assert_eq!(val.as_reference(), Some(id));
        assert_eq!(val.type_name(), "reference");
    }

    #[test]
    fn test_value_structured() {
        let json = serde_json::json!({"street": "1 Main St"});
        let val = FieldValue::Structured(json.clone());
        assert!(val.is_structured());
        assert_eq!(val.as_structured(), Some(&json));
        assert_eq!(val.type_name(), "structured");
    }

    #[test]
    fn test_value_null() {
        let val = FieldValue::Null;
        assert!(val.is_null());
        assert_eq!(val.type_name(), "null");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", FieldValue::Bool(true)), "true");
        assert_eq!(format!("{}", FieldValue::Int(42)), "42");
        assert_eq!(format!("{}", FieldValue::String("hi".into())), "\"hi\"");
        assert_eq!(format!("{}", FieldValue::Null), "null");
    }

    #[test]
    fn test_value_from_conversions() {
        let _: FieldValue = true.into();
        let _: FieldValue = 42i32.into();
        let _: FieldValue = 42i64.into();
        let _: FieldValue = 3.14f64.into();
        let _: FieldValue = "hello".into();
        let _: FieldValue = String::from("hello").into();
        let _: FieldValue = RecordId::new().into();
    }

    #[test]
    fn test_value_serialization() {
        let val = FieldValue::String("test".into());
        let json = serde_json::to_string(&val).unwrap();
        let deserialized: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(val, deserialized);
    }

    #[test]
    fn test_value_type_mismatch() {
        let val = FieldValue::Bool(true);
        assert!(val.as_int().is_none());
        assert!(val.as_float().is_none());
        assert!(val.as_string().is_none());
        assert!(val.as_reference().is_none());
    }
}
