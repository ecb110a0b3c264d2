use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    descriptor::{Mappable, TypeKey},
    error::ConversionError,
    value::{ObjectRef, Seq, SeqKind, Value},
};

/// Declared type of a field, used to drive conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Bool,
    Int(IntKind),
    Float,
    Decimal,
    Text,
    DateTime,
    Uuid,
    Enum(EnumShape),
    Nullable(Box<FieldType>),
    Seq {
        kind: SeqKind,
        element: Option<Box<FieldType>>,
    },
    Record(TypeKey),
    /// Accepts any value unchanged.
    Any,
}

/// Integer widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

/// Member table of a fieldless enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumShape {
    pub name: &'static str,
    pub members: &'static [(&'static str, i64)],
}

/// Coarse classification of a field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Scalar,
    Enum,
    Nullable,
    Sequence,
    Complex,
    Dynamic,
}

impl IntKind {
    pub fn is_signed(self) -> bool {
        matches!(self, IntKind::I8 | IntKind::I16 | IntKind::I32 | IntKind::I64)
    }

    pub fn range(self) -> (i128, i128) {
        match self {
            IntKind::I8 => (i8::MIN as i128, i8::MAX as i128),
            IntKind::I16 => (i16::MIN as i128, i16::MAX as i128),
            IntKind::I32 => (i32::MIN as i128, i32::MAX as i128),
            IntKind::I64 => (i64::MIN as i128, i64::MAX as i128),
            IntKind::U8 => (0, u8::MAX as i128),
            IntKind::U16 => (0, u16::MAX as i128),
            IntKind::U32 => (0, u32::MAX as i128),
            IntKind::U64 => (0, u64::MAX as i128),
        }
    }
}

impl fmt::Display for IntKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntKind::I8 => "i8",
            IntKind::I16 => "i16",
            IntKind::I32 => "i32",
            IntKind::I64 => "i64",
            IntKind::U8 => "u8",
            IntKind::U16 => "u16",
            IntKind::U32 => "u32",
            IntKind::U64 => "u64",
        };
        f.write_str(name)
    }
}

impl EnumShape {
    pub fn by_name(&self, name: &str) -> Option<(&'static str, i64)> {
        self.members
            .iter()
            .copied()
            .find(|(member, _)| *member == name || member.to_lowercase() == name.to_lowercase())
    }

    pub fn by_discriminant(&self, discriminant: i64) -> Option<(&'static str, i64)> {
        self.members
            .iter()
            .copied()
            .find(|(_, value)| *value == discriminant)
    }
}

impl FieldType {
    pub fn category(&self) -> TypeCategory {
        match self {
            FieldType::Bool
            | FieldType::Int(_)
            | FieldType::Float
            | FieldType::Decimal
            | FieldType::Text
            | FieldType::DateTime
            | FieldType::Uuid => TypeCategory::Scalar,
            FieldType::Enum(_) => TypeCategory::Enum,
            FieldType::Nullable(_) => TypeCategory::Nullable,
            FieldType::Seq { .. } => TypeCategory::Sequence,
            FieldType::Record(_) => TypeCategory::Complex,
            FieldType::Any => TypeCategory::Dynamic,
        }
    }

    pub fn nullable(inner: FieldType) -> Self {
        FieldType::Nullable(Box::new(inner))
    }

    pub fn seq(kind: SeqKind, element: FieldType) -> Self {
        FieldType::Seq {
            kind,
            element: Some(Box::new(element)),
        }
    }

    /// Value written when the source is null.
    pub fn zero_value(&self) -> Value {
        match self {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int(kind) if kind.is_signed() => Value::Int(0),
            FieldType::Int(_) => Value::UInt(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Decimal => Value::Decimal(Decimal::ZERO),
            FieldType::Text => Value::Text(String::new()),
            FieldType::DateTime => Value::DateTime(NaiveDateTime::default()),
            FieldType::Uuid => Value::Uuid(Uuid::nil()),
            FieldType::Enum(shape) => shape
                .by_discriminant(0)
                .or_else(|| shape.members.first().copied())
                .map_or(Value::Null, |(member, discriminant)| {
                    Value::Enum(crate::value::EnumValue {
                        type_name: shape.name,
                        member,
                        discriminant,
                    })
                }),
            FieldType::Seq { kind, .. } => Value::Seq(Seq::new(*kind, Vec::new())),
            FieldType::Nullable(_) | FieldType::Record(_) | FieldType::Any => Value::Null,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => write!(f, "bool"),
            FieldType::Int(kind) => write!(f, "{}", kind),
            FieldType::Float => write!(f, "float"),
            FieldType::Decimal => write!(f, "decimal"),
            FieldType::Text => write!(f, "text"),
            FieldType::DateTime => write!(f, "date-time"),
            FieldType::Uuid => write!(f, "uuid"),
            FieldType::Enum(shape) => write!(f, "{}", shape.name),
            FieldType::Nullable(inner) => write!(f, "Option<{}>", inner),
            FieldType::Seq { kind, element } => match element {
                Some(element) => write!(f, "{:?}<{}>", kind, element),
                None => write!(f, "{:?}", kind),
            },
            FieldType::Record(key) => write!(f, "{}", key),
            FieldType::Any => write!(f, "any"),
        }
    }
}

/// A Rust type that can sit in a mapped field.
pub trait MapValue: Sized {
    fn field_type() -> FieldType;

    fn to_value(&self) -> Value;

    /// Strict conversion back; the conversion engine has already coerced the value.
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

impl MapValue for bool {
    fn field_type() -> FieldType {
        FieldType::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(ConversionError::mismatch("bool", &other)),
        }
    }
}

macro_rules! int_map_value {
    ($($ty:ty => $kind:ident, $variant:ident, $wide:ty);* $(;)?) => {$(
        impl MapValue for $ty {
            fn field_type() -> FieldType {
                FieldType::Int(IntKind::$kind)
            }

            fn to_value(&self) -> Value {
                Value::$variant(*self as $wide)
            }

            fn from_value(value: Value) -> Result<Self, ConversionError> {
                match value {
                    Value::Int(v) => <$ty>::try_from(v)
                        .map_err(|_| ConversionError::out_of_range(v, stringify!($ty))),
                    Value::UInt(v) => <$ty>::try_from(v)
                        .map_err(|_| ConversionError::out_of_range(v, stringify!($ty))),
                    other => Err(ConversionError::mismatch(stringify!($ty), &other)),
                }
            }
        }
    )*};
}

int_map_value! {
    i8 => I8, Int, i64;
    i16 => I16, Int, i64;
    i32 => I32, Int, i64;
    i64 => I64, Int, i64;
    isize => I64, Int, i64;
    u8 => U8, UInt, u64;
    u16 => U16, UInt, u64;
    u32 => U32, UInt, u64;
    u64 => U64, UInt, u64;
    usize => U64, UInt, u64;
}

impl MapValue for f64 {
    fn field_type() -> FieldType {
        FieldType::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(v) => Ok(v),
            other => Err(ConversionError::mismatch("f64", &other)),
        }
    }
}

impl MapValue for f32 {
    fn field_type() -> FieldType {
        FieldType::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(v) => Ok(v as f32),
            other => Err(ConversionError::mismatch("f32", &other)),
        }
    }
}

impl MapValue for Decimal {
    fn field_type() -> FieldType {
        FieldType::Decimal
    }

    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Decimal(v) => Ok(v),
            other => Err(ConversionError::mismatch("decimal", &other)),
        }
    }
}

impl MapValue for String {
    fn field_type() -> FieldType {
        FieldType::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(ConversionError::mismatch("String", &other)),
        }
    }
}

impl MapValue for NaiveDateTime {
    fn field_type() -> FieldType {
        FieldType::DateTime
    }

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::DateTime(v) => Ok(v),
            other => Err(ConversionError::mismatch("NaiveDateTime", &other)),
        }
    }
}

impl MapValue for Uuid {
    fn field_type() -> FieldType {
        FieldType::Uuid
    }

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Uuid(v) => Ok(v),
            other => Err(ConversionError::mismatch("Uuid", &other)),
        }
    }
}

impl<T: MapValue> MapValue for Option<T> {
    fn field_type() -> FieldType {
        FieldType::nullable(T::field_type())
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

fn seq_items<T: MapValue>(value: Value, expected: &str) -> Result<Vec<T>, ConversionError> {
    match value {
        Value::Seq(seq) => seq.items.into_iter().map(T::from_value).collect(),
        other => Err(ConversionError::mismatch(expected, &other)),
    }
}

impl<T: MapValue> MapValue for Vec<T> {
    fn field_type() -> FieldType {
        FieldType::seq(SeqKind::List, T::field_type())
    }

    fn to_value(&self) -> Value {
        Value::Seq(Seq::new(
            SeqKind::List,
            self.iter().map(MapValue::to_value).collect(),
        ))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        seq_items(value, "Vec")
    }
}

impl<T: MapValue> MapValue for Box<[T]> {
    fn field_type() -> FieldType {
        FieldType::seq(SeqKind::Array, T::field_type())
    }

    fn to_value(&self) -> Value {
        Value::Seq(Seq::new(
            SeqKind::Array,
            self.iter().map(MapValue::to_value).collect(),
        ))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        seq_items(value, "array").map(Vec::into_boxed_slice)
    }
}

impl<T: MapValue> MapValue for VecDeque<T> {
    fn field_type() -> FieldType {
        FieldType::seq(SeqKind::Collection, T::field_type())
    }

    fn to_value(&self) -> Value {
        Value::Seq(Seq::new(
            SeqKind::Collection,
            self.iter().map(MapValue::to_value).collect(),
        ))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        seq_items(value, "VecDeque").map(VecDeque::from)
    }
}

/// A raw sequence has no declared element type.
impl MapValue for Seq {
    fn field_type() -> FieldType {
        FieldType::Seq {
            kind: SeqKind::Collection,
            element: None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Seq(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Seq(seq) => Ok(seq),
            other => Err(ConversionError::mismatch("sequence", &other)),
        }
    }
}

impl<T: Mappable> MapValue for Arc<T> {
    fn field_type() -> FieldType {
        FieldType::Record(TypeKey::of::<T>())
    }

    fn to_value(&self) -> Value {
        Value::Object(ObjectRef::new(Arc::clone(self)))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Object(obj) => {
                obj.downcast::<T>()
                    .ok_or_else(|| ConversionError::TypeMismatch {
                        expected: TypeKey::of::<T>().to_string(),
                        found: obj.type_key().to_string(),
                    })
            }
            other => Err(ConversionError::mismatch(TypeKey::of::<T>(), &other)),
        }
    }
}

impl MapValue for Value {
    fn field_type() -> FieldType {
        FieldType::Any
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

/// Implement [`MapValue`] for a fieldless enum with explicit discriminants.
///
/// ```
/// use object_mapper::map_enum;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Status {
///     Active = 1,
///     Suspended = 2,
/// }
///
/// map_enum!(Status { Active = 1, Suspended = 2 });
/// ```
#[macro_export]
macro_rules! map_enum {
    ($ty:ident { $($variant:ident = $disc:expr),+ $(,)? }) => {
        impl $crate::MapValue for $ty {
            fn field_type() -> $crate::FieldType {
                $crate::FieldType::Enum($crate::EnumShape {
                    name: stringify!($ty),
                    members: &[$((stringify!($variant), $disc)),+],
                })
            }

            fn to_value(&self) -> $crate::Value {
                let (member, discriminant): (&'static str, i64) = match self {
                    $($ty::$variant => (stringify!($variant), $disc),)+
                };
                $crate::Value::Enum($crate::EnumValue {
                    type_name: stringify!($ty),
                    member,
                    discriminant,
                })
            }

            fn from_value(value: $crate::Value) -> Result<Self, $crate::ConversionError> {
                match value {
                    $crate::Value::Enum(e) if e.type_name == stringify!($ty) => {
                        $(if e.discriminant == $disc {
                            return Ok($ty::$variant);
                        })+
                        Err($crate::ConversionError::UndefinedEnumValue {
                            enum_name: stringify!($ty).to_string(),
                            value: e.discriminant.to_string(),
                        })
                    }
                    other => Err($crate::ConversionError::TypeMismatch {
                        expected: stringify!($ty).to_string(),
                        found: other.kind_name().to_string(),
                    }),
                }
            }
        }
    };
}
