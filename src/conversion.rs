//! Type-driven value conversion.
//!
//! Conversion is driven by the destination field's declared [`FieldType`]:
//! nullable wrappers are unwrapped, records are re-mapped (or shared when
//! deep copy is off), sequences are converted element by element, and scalar
//! and enum targets are coerced.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::{
    descriptor::TypeKey,
    diagnostics::MappingDiagnostic,
    error::ConversionError,
    field_type::{EnumShape, FieldType, IntKind, TypeCategory},
    mapper::Mapper,
    type_mapping::MappingOptions,
    value::{EnumValue, ObjectRef, Seq, SeqKind, Value},
};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

impl Mapper {
    /// Convert `value` to `target`. With deep copy on, records are re-mapped
    /// into fresh instances even when source and target are the same type.
    pub(crate) fn convert_value(
        &self,
        value: Value,
        target: &FieldType,
        options: &MappingOptions,
        diagnostics: &mut Vec<MappingDiagnostic>,
    ) -> Result<Value, ConversionError> {
        if value.is_null() {
            return Ok(target.zero_value());
        }

        match (value, target) {
            (value, FieldType::Nullable(inner)) => {
                self.convert_value(value, inner, options, diagnostics)
            }
            // same-type records are copied too, so a deep copy never shares
            (Value::Object(obj), FieldType::Record(key)) if options.deep_copy => Ok(Value::Object(
                self.copy_record(&obj, *key, diagnostics),
            )),
            (Value::Object(obj), FieldType::Record(_)) => Ok(Value::Object(obj)),
            (value, target) if satisfies(&value, target) => Ok(value),
            (Value::Seq(seq), FieldType::Seq { kind, element }) => {
                self.convert_seq(seq, *kind, element.as_deref(), options, diagnostics)
            }
            (value, target) if target.category() == TypeCategory::Scalar => {
                coerce_scalar(value, target)
            }
            (value, FieldType::Enum(shape)) => coerce_enum(value, shape),
            (value, _) => Ok(value),
        }
    }

    fn copy_record(
        &self,
        source: &ObjectRef,
        destination: TypeKey,
        diagnostics: &mut Vec<MappingDiagnostic>,
    ) -> ObjectRef {
        let mut instance = self.descriptors().get(destination).instantiate();
        self.map_object(
            source.record().as_any(),
            source.type_key(),
            instance.as_any_mut(),
            destination,
            diagnostics,
        );
        ObjectRef::from_boxed(instance)
    }

    fn convert_seq(
        &self,
        seq: Seq,
        kind: SeqKind,
        element: Option<&FieldType>,
        options: &MappingOptions,
        diagnostics: &mut Vec<MappingDiagnostic>,
    ) -> Result<Value, ConversionError> {
        let Some(element) = element else {
            return Ok(Value::Seq(seq));
        };

        let mut items = Vec::with_capacity(seq.items.len());
        for item in seq.items {
            items.push(self.convert_value(item, element, options, diagnostics)?);
        }
        Ok(Value::Seq(Seq::new(kind, items)))
    }
}

/// True when `value` can be stored in `target` without any conversion.
fn satisfies(value: &Value, target: &FieldType) -> bool {
    match (value, target) {
        (_, FieldType::Any) => true,
        (Value::Bool(_), FieldType::Bool)
        | (Value::Float(_), FieldType::Float)
        | (Value::Decimal(_), FieldType::Decimal)
        | (Value::Text(_), FieldType::Text)
        | (Value::DateTime(_), FieldType::DateTime)
        | (Value::Uuid(_), FieldType::Uuid)
        | (Value::Int(_), FieldType::Int(IntKind::I64))
        | (Value::UInt(_), FieldType::Int(IntKind::U64)) => true,
        (Value::Enum(e), FieldType::Enum(shape)) => e.type_name == shape.name,
        _ => false,
    }
}

fn coerce_scalar(value: Value, target: &FieldType) -> Result<Value, ConversionError> {
    match target {
        FieldType::Bool => to_bool(value).map(Value::Bool),
        FieldType::Int(kind) => to_int(value, *kind),
        FieldType::Float => to_float(value).map(Value::Float),
        FieldType::Decimal => to_decimal(value).map(Value::Decimal),
        FieldType::Text => to_text(value).map(Value::Text),
        FieldType::DateTime => to_datetime(value).map(Value::DateTime),
        FieldType::Uuid => to_uuid(value).map(Value::Uuid),
        _ => Ok(value),
    }
}

fn to_bool(value: Value) -> Result<bool, ConversionError> {
    match value {
        Value::Bool(v) => Ok(v),
        Value::Int(v) => Ok(v != 0),
        Value::UInt(v) => Ok(v != 0),
        Value::Float(v) => Ok(v != 0.0),
        Value::Decimal(v) => Ok(!v.is_zero()),
        Value::Enum(e) => Ok(e.discriminant != 0),
        Value::Text(text) => {
            let trimmed = text.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(ConversionError::parse(&text, "bool"))
            }
        }
        other => Err(ConversionError::unsupported(other.kind_name(), "bool")),
    }
}

fn to_int(value: Value, kind: IntKind) -> Result<Value, ConversionError> {
    let wide: i128 = match &value {
        Value::Int(v) => i128::from(*v),
        Value::UInt(v) => i128::from(*v),
        Value::Bool(v) => i128::from(*v),
        Value::Enum(e) => i128::from(e.discriminant),
        Value::Float(v) => {
            if !v.is_finite() {
                return Err(ConversionError::out_of_range(v, kind));
            }
            v.round_ties_even() as i128
        }
        Value::Decimal(v) => v
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_i128()
            .ok_or_else(|| ConversionError::out_of_range(v, kind))?,
        Value::Text(text) => text
            .trim()
            .parse::<i128>()
            .map_err(|_| ConversionError::parse(text, kind))?,
        other => return Err(ConversionError::unsupported(other.kind_name(), kind)),
    };

    let (min, max) = kind.range();
    if wide < min || wide > max {
        return Err(ConversionError::out_of_range(&value, kind));
    }
    Ok(if kind.is_signed() {
        Value::Int(wide as i64)
    } else {
        Value::UInt(wide as u64)
    })
}

fn to_float(value: Value) -> Result<f64, ConversionError> {
    match value {
        Value::Float(v) => Ok(v),
        Value::Int(v) => Ok(v as f64),
        Value::UInt(v) => Ok(v as f64),
        Value::Bool(v) => Ok(if v { 1.0 } else { 0.0 }),
        Value::Enum(e) => Ok(e.discriminant as f64),
        Value::Decimal(v) => v
            .to_f64()
            .ok_or_else(|| ConversionError::out_of_range(v, "float")),
        Value::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| ConversionError::parse(&text, "float")),
        other => Err(ConversionError::unsupported(other.kind_name(), "float")),
    }
}

fn to_decimal(value: Value) -> Result<Decimal, ConversionError> {
    match value {
        Value::Decimal(v) => Ok(v),
        Value::Int(v) => Ok(Decimal::from(v)),
        Value::UInt(v) => Ok(Decimal::from(v)),
        Value::Bool(v) => Ok(Decimal::from(u8::from(v))),
        Value::Enum(e) => Ok(Decimal::from(e.discriminant)),
        Value::Float(v) => {
            Decimal::try_from(v).map_err(|_| ConversionError::out_of_range(v, "decimal"))
        }
        Value::Text(text) => {
            Decimal::from_str(text.trim()).map_err(|_| ConversionError::parse(&text, "decimal"))
        }
        other => Err(ConversionError::unsupported(other.kind_name(), "decimal")),
    }
}

fn to_text(value: Value) -> Result<String, ConversionError> {
    match value {
        Value::Text(text) => Ok(text),
        Value::Seq(_) | Value::Object(_) | Value::Null => {
            Err(ConversionError::unsupported(value.kind_name(), "text"))
        }
        scalar => Ok(scalar.to_string()),
    }
}

fn to_datetime(value: Value) -> Result<NaiveDateTime, ConversionError> {
    match value {
        Value::DateTime(v) => Ok(v),
        Value::Text(text) => parse_datetime(text.trim())
            .ok_or_else(|| ConversionError::parse(&text, "date-time")),
        other => Err(ConversionError::unsupported(other.kind_name(), "date-time")),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(with_offset) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn to_uuid(value: Value) -> Result<Uuid, ConversionError> {
    match value {
        Value::Uuid(v) => Ok(v),
        Value::Text(text) => {
            Uuid::parse_str(text.trim()).map_err(|_| ConversionError::parse(&text, "uuid"))
        }
        other => Err(ConversionError::unsupported(other.kind_name(), "uuid")),
    }
}

fn coerce_enum(value: Value, shape: &EnumShape) -> Result<Value, ConversionError> {
    let undefined = |discriminant: String| ConversionError::UndefinedEnumValue {
        enum_name: shape.name.to_string(),
        value: discriminant,
    };
    let by_discriminant = |discriminant: i64| {
        shape
            .by_discriminant(discriminant)
            .ok_or_else(|| undefined(discriminant.to_string()))
    };

    let (member, discriminant) = match &value {
        Value::Text(text) => {
            let text = text.trim();
            match text.parse::<i64>() {
                Ok(number) => by_discriminant(number)?,
                Err(_) => shape
                    .by_name(text)
                    .ok_or_else(|| ConversionError::UnknownEnumMember {
                        enum_name: shape.name.to_string(),
                        member: text.to_string(),
                    })?,
            }
        }
        Value::Int(v) => by_discriminant(*v)?,
        Value::UInt(v) => {
            let signed = i64::try_from(*v).map_err(|_| undefined(v.to_string()))?;
            by_discriminant(signed)?
        }
        Value::Bool(v) => by_discriminant(i64::from(*v))?,
        Value::Enum(e) => by_discriminant(e.discriminant)?,
        other => return Err(ConversionError::unsupported(other.kind_name(), shape.name)),
    };

    Ok(Value::Enum(EnumValue {
        type_name: shape.name,
        member,
        discriminant,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::field_type::MapValue;
    use crate::fixtures::{AccountState, AddressDto, AddressEntity, Point, Status};
    use crate::registry::MapperConfiguration;

    fn mapper() -> Mapper {
        MapperConfiguration::new().build()
    }

    fn convert(value: Value, target: &FieldType) -> Result<Value, ConversionError> {
        mapper().convert(value, target, &MappingOptions::default())
    }

    #[test]
    fn test_null_becomes_zero_value() {
        assert_eq!(convert(Value::Null, &FieldType::Int(IntKind::I32)).unwrap(), Value::Int(0));
        assert_eq!(convert(Value::Null, &FieldType::Bool).unwrap(), Value::Bool(false));
        assert_eq!(
            convert(Value::Null, &FieldType::nullable(FieldType::Text)).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_identity_when_type_already_matches() {
        let text = Value::from("unchanged");
        assert_eq!(convert(text.clone(), &FieldType::Text).unwrap(), text);
        assert_eq!(convert(Value::Int(7), &FieldType::Any).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_nullable_target_unwraps() {
        let target = FieldType::nullable(FieldType::Int(IntKind::I64));
        assert_eq!(convert(Value::from("42"), &target).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(convert(Value::Int(5), &FieldType::Float).unwrap(), Value::Float(5.0));
        assert_eq!(
            convert(Value::Float(2.5), &FieldType::Int(IntKind::I32)).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            convert(Value::Float(3.5), &FieldType::Int(IntKind::I32)).unwrap(),
            Value::Int(4)
        );
        assert_eq!(
            convert(Value::Int(200), &FieldType::Int(IntKind::U8)).unwrap(),
            Value::UInt(200)
        );
        assert_eq!(
            convert(Value::Bool(true), &FieldType::Int(IntKind::I16)).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            convert(Value::Float(1.25), &FieldType::Decimal).unwrap(),
            Value::Decimal(Decimal::new(125, 2))
        );
    }

    #[test]
    fn test_integer_range_is_checked() {
        let err = convert(Value::Int(300), &FieldType::Int(IntKind::U8)).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange { .. }));

        let err = convert(Value::Int(-1), &FieldType::Int(IntKind::U32)).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange { .. }));

        let err = convert(Value::Float(f64::NAN), &FieldType::Int(IntKind::I64)).unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange { .. }));
    }

    #[test]
    fn test_text_parsing_and_formatting() {
        assert_eq!(
            convert(Value::from(" 17 "), &FieldType::Int(IntKind::I32)).unwrap(),
            Value::Int(17)
        );
        assert_eq!(convert(Value::from("TRUE"), &FieldType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(convert(Value::Float(1.5), &FieldType::Text).unwrap(), Value::from("1.5"));
        assert_eq!(convert(Value::Int(-3), &FieldType::Text).unwrap(), Value::from("-3"));

        let err = convert(Value::from("1.5"), &FieldType::Int(IntKind::I32)).unwrap_err();
        assert!(matches!(err, ConversionError::Parse { .. }));
    }

    #[test]
    fn test_datetime_and_uuid_parsing() {
        let parsed = convert(Value::from("2024-03-01T10:20:30Z"), &FieldType::DateTime).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 20, 30)
            .unwrap();
        assert_eq!(parsed, Value::DateTime(expected));

        let date_only = convert(Value::from("2024-03-01"), &FieldType::DateTime).unwrap();
        assert_eq!(
            date_only,
            Value::DateTime(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
        );

        let id = Uuid::new_v4();
        assert_eq!(
            convert(Value::Text(id.to_string()), &FieldType::Uuid).unwrap(),
            Value::Uuid(id)
        );
        assert_eq!(convert(Value::Uuid(id), &FieldType::Text).unwrap(), Value::Text(id.to_string()));
        assert!(convert(Value::from("not-a-uuid"), &FieldType::Uuid).is_err());
    }

    #[test]
    fn test_enum_from_text_is_case_insensitive() {
        let target = Status::field_type();
        assert_eq!(
            convert(Value::from("suspended"), &target).unwrap(),
            Status::Suspended.to_value()
        );
        assert_eq!(convert(Value::from("1"), &target).unwrap(), Status::Active.to_value());

        let err = convert(Value::from("archived"), &target).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownEnumMember { .. }));
    }

    #[test]
    fn test_enum_from_integral_representation() {
        let target = AccountState::field_type();
        assert_eq!(convert(Value::Int(2), &target).unwrap(), AccountState::Suspended.to_value());
        assert_eq!(
            convert(Status::Active.to_value(), &target).unwrap(),
            AccountState::Active.to_value()
        );

        let err = convert(Value::Int(9), &target).unwrap_err();
        assert!(matches!(err, ConversionError::UndefinedEnumValue { .. }));
        assert!(convert(Value::Float(1.0), &target).is_err());
    }

    #[test]
    fn test_enum_to_scalar() {
        assert_eq!(
            convert(Status::Suspended.to_value(), &FieldType::Int(IntKind::I32)).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            convert(Status::Suspended.to_value(), &FieldType::Text).unwrap(),
            Value::from("Suspended")
        );
    }

    #[test]
    fn test_sequence_conversion_preserves_order() {
        let source = vec![1i32, 2, 3].to_value();
        let converted = convert(source, &<Vec<String> as MapValue>::field_type()).unwrap();
        assert_eq!(
            converted,
            Value::Seq(Seq::new(
                SeqKind::List,
                vec![Value::from("1"), Value::from("2"), Value::from("3")]
            ))
        );
    }

    #[test]
    fn test_sequence_materializes_destination_kind() {
        let source = vec![4i64, 5].to_value();
        match convert(source.clone(), &<Box<[i32]> as MapValue>::field_type()).unwrap() {
            Value::Seq(seq) => {
                assert_eq!(seq.kind, SeqKind::Array);
                assert_eq!(seq.items, vec![Value::Int(4), Value::Int(5)]);
            }
            other => panic!("unexpected value {:?}", other),
        }

        // no element type: the source sequence is returned as is
        let raw = convert(source.clone(), &<Seq as MapValue>::field_type()).unwrap();
        assert_eq!(raw, source);
    }

    #[test]
    fn test_sequence_element_failure_fails_whole_value() {
        let source = vec!["1".to_string(), "x".to_string()].to_value();
        assert!(convert(source, &<Vec<i32> as MapValue>::field_type()).is_err());
    }

    #[test]
    fn test_record_deep_copy() {
        let address = Arc::new(AddressDto::new("Main St", "Springfield"));
        let source = address.to_value();

        let copied = convert(source, &<Arc<AddressEntity> as MapValue>::field_type()).unwrap();
        let entity = <Arc<AddressEntity> as MapValue>::from_value(copied).unwrap();
        assert_eq!(entity.street, "Main St");
        assert_eq!(entity.city, "Springfield");
    }

    #[test]
    fn test_record_same_type_deep_copy_is_new_instance() {
        let point = Arc::new(Point { x: 1, y: 2 });
        let copied = convert(point.to_value(), &<Arc<Point> as MapValue>::field_type()).unwrap();
        let copied = <Arc<Point> as MapValue>::from_value(copied).unwrap();

        assert_eq!(*copied, *point);
        assert!(!Arc::ptr_eq(&copied, &point));
    }

    #[test]
    fn test_record_shared_without_deep_copy() {
        let point = Arc::new(Point { x: 1, y: 2 });
        let options = MappingOptions {
            deep_copy: false,
            ..MappingOptions::default()
        };
        let shared = mapper()
            .convert(point.to_value(), &<Arc<Point> as MapValue>::field_type(), &options)
            .unwrap();
        let shared = <Arc<Point> as MapValue>::from_value(shared).unwrap();
        assert!(Arc::ptr_eq(&shared, &point));
    }

    #[test]
    fn test_object_to_text_is_unsupported() {
        let point = Arc::new(Point { x: 1, y: 2 });
        let err = convert(point.to_value(), &FieldType::Text).unwrap_err();
        assert!(matches!(err, ConversionError::Unsupported { .. }));
    }
}
