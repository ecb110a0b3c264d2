use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::descriptor::{AnyRecord, Mappable, TypeKey};

/// A field value in transit between a source getter and a destination setter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
    Enum(EnumValue),
    Seq(Seq),
    Object(ObjectRef),
}

/// A member of a fieldless enum, carried by name and discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: &'static str,
    pub member: &'static str,
    pub discriminant: i64,
}

/// Shape a sequence is materialized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeqKind {
    /// Fixed-size array (`Box<[T]>`).
    Array,
    /// Growable list (`Vec<T>`).
    List,
    /// Any other ordered collection.
    Collection,
}

/// An ordered sequence of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Seq {
    pub kind: SeqKind,
    pub items: Vec<Value>,
}

impl Seq {
    pub fn new(kind: SeqKind, items: Vec<Value>) -> Self {
        Self { kind, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Shared reference to a record.
///
/// Cloning shares the record. Equality is reference identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn AnyRecord>);

impl ObjectRef {
    pub fn new<T: Mappable>(record: Arc<T>) -> Self {
        ObjectRef(record)
    }

    pub(crate) fn from_boxed(record: Box<dyn AnyRecord>) -> Self {
        ObjectRef(Arc::from(record))
    }

    pub fn type_key(&self) -> TypeKey {
        self.0.type_key()
    }

    pub fn record(&self) -> &dyn AnyRecord {
        self.0.as_ref()
    }

    /// Recover the typed `Arc`, sharing the same allocation.
    pub fn downcast<T: Mappable>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).into_any_arc().downcast::<T>().ok()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({} @ {:p})", self.type_key(), Arc::as_ptr(&self.0))
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::DateTime(_) => "date-time",
            Value::Uuid(_) => "uuid",
            Value::Enum(_) => "enum",
            Value::Seq(_) => "sequence",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Enum(v) => write!(f, "{}", v.member),
            Value::Seq(seq) => write!(f, "[{} items]", seq.len()),
            Value::Object(obj) => write!(f, "{}", obj.type_key()),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::AddressDto;

    #[test]
    fn test_object_ref_identity() {
        let address = Arc::new(AddressDto::new("Main St", "Springfield"));
        let first = ObjectRef::new(Arc::clone(&address));
        let second = first.clone();
        let other = ObjectRef::new(Arc::new(AddressDto::new("Main St", "Springfield")));

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(first.type_key(), TypeKey::of::<AddressDto>());
    }

    #[test]
    fn test_object_ref_downcast_shares_allocation() {
        let address = Arc::new(AddressDto::new("Elm St", "Shelbyville"));
        let obj = ObjectRef::new(Arc::clone(&address));

        let back = obj.downcast::<AddressDto>().unwrap();
        assert!(Arc::ptr_eq(&address, &back));
        assert!(obj.downcast::<crate::fixtures::AddressEntity>().is_none());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Float(2.0).to_string(), "2");
        assert_eq!(Value::from("abc").to_string(), "abc");
        let status = Value::Enum(EnumValue {
            type_name: "Status",
            member: "Active",
            discriminant: 1,
        });
        assert_eq!(status.to_string(), "Active");
    }
}
