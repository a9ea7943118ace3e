//! # Result Marshaller
//!
//! Converts returned object graphs back into generic [`Value`]s, walking the readable
//! fields of each message. It mirrors [`crate::build::ObjectBuilder`] in the read direction:
//!
//! * Map entries are keyed by text: string keys are normalized (`myKey` → `my-key`),
//!   numeric and boolean keys are rendered as they print.
//! * Lists are marshalled element-wise.
//! * `google.protobuf.Timestamp` messages become [`Value::Timestamp`] and
//!   `google.type.Decimal` messages become their decimal text.
//! * Other messages become maps of their set fields, keyed by normalized field name.
//!   Boolean `is_*` fields are reported as `name?`. Unset fields are omitted. A field
//!   with presence (`optional`, message, oneof member) is kept whenever it is set, even
//!   to its default value. A proto3 field without presence that holds its default value
//!   cannot be told apart from an unset one and is omitted as well.
//! * Enum numbers are reported by constant name when the declared type is known.
use crate::{
    coerce::{DECIMAL_TYPE, TIMESTAMP_TYPE},
    config::Settings,
    naming,
    types::{FieldAccessor, TypeRef},
    value::Value,
};
use chrono::{DateTime, FixedOffset};
use prost_reflect::{DynamicMessage, MapKey, ReflectMessage, Value as ReflectValue};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct Marshaller {
    unwrap_root: bool,
}

impl Marshaller {
    pub fn new(settings: &Settings) -> Self {
        Self {
            unwrap_root: settings.unwrap_root,
        }
    }

    /// Marshals `value`, whose declared type is `ty` when known.
    pub fn marshal(&self, value: Option<&ReflectValue>, ty: Option<&TypeRef>) -> Value {
        value.map_or(Value::Null, |value| marshal_value(value, ty))
    }

    /// Marshals the top-level result of a call, applying root unwrapping when enabled.
    pub fn marshal_root(&self, value: Option<&ReflectValue>, ty: Option<&TypeRef>) -> Value {
        let marshalled = self.marshal(value, ty);
        if self.unwrap_root {
            unwrap_root(marshalled)
        } else {
            marshalled
        }
    }
}

/// Collapses a single-key map into the value of that key.
pub fn unwrap_root(value: Value) -> Value {
    match value {
        Value::Map(mut entries) if entries.len() == 1 => entries
            .pop_first()
            .map(|(_, inner)| inner)
            .unwrap_or_default(),
        other => other,
    }
}

/// Marshals a value without any declared type information.
pub fn scalar_value(value: &ReflectValue) -> Value {
    marshal_value(value, None)
}

fn marshal_value(value: &ReflectValue, ty: Option<&TypeRef>) -> Value {
    match value {
        ReflectValue::Bool(b) => Value::Bool(*b),
        ReflectValue::I32(i) => Value::Int((*i).into()),
        ReflectValue::I64(i) => Value::Int(*i),
        ReflectValue::U32(u) => Value::Int((*u).into()),
        ReflectValue::U64(u) => i64::try_from(*u).map_or(Value::Float(*u as f64), Value::Int),
        ReflectValue::F32(f) => Value::Float((*f).into()),
        ReflectValue::F64(f) => Value::Float(*f),
        ReflectValue::String(s) => Value::String(s.clone()),
        ReflectValue::Bytes(b) => Value::Bytes(b.to_vec()),
        ReflectValue::EnumNumber(number) => match ty {
            Some(TypeRef::Enum(enumeration)) => enumeration
                .get_value(*number)
                .map_or(Value::Int((*number).into()), |constant| {
                    Value::String(constant.name().to_string())
                }),
            _ => Value::Int((*number).into()),
        },
        ReflectValue::Message(message) => marshal_message(message),
        ReflectValue::List(items) => {
            let element = match ty {
                Some(TypeRef::List(inner)) => Some(inner.as_ref()),
                _ => None,
            };
            Value::List(
                items
                    .iter()
                    .map(|item| marshal_value(item, element))
                    .collect(),
            )
        }
        ReflectValue::Map(entries) => {
            let element = match ty {
                Some(TypeRef::Map { value, .. }) => Some(value.as_ref()),
                _ => None,
            };
            Value::Map(
                entries
                    .iter()
                    .map(|(key, item)| (map_key_text(key), marshal_value(item, element)))
                    .collect(),
            )
        }
    }
}

fn marshal_message(message: &DynamicMessage) -> Value {
    let descriptor = message.descriptor();

    match descriptor.full_name() {
        TIMESTAMP_TYPE => {
            if let Some(ts) = timestamp(message) {
                return Value::Timestamp(ts);
            }
        }
        DECIMAL_TYPE => {
            if let Some(text) = message
                .get_field_by_name("value")
                .and_then(|v| v.as_str().map(str::to_string))
            {
                return Value::String(text);
            }
        }
        _ => {}
    }

    let mut out = BTreeMap::new();
    for (field, value) in message.fields() {
        let accessor = FieldAccessor::new(field);
        out.insert(
            accessor.key().to_string(),
            marshal_value(value, Some(accessor.ty())),
        );
    }
    Value::Map(out)
}

fn timestamp(message: &DynamicMessage) -> Option<DateTime<FixedOffset>> {
    let seconds = message.get_field_by_name("seconds")?.as_i64()?;
    let nanos = message.get_field_by_name("nanos")?.as_i32()?;
    DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?).map(|ts| ts.fixed_offset())
}

fn map_key_text(key: &MapKey) -> String {
    match key {
        MapKey::Bool(b) => b.to_string(),
        MapKey::I32(i) => i.to_string(),
        MapKey::I64(i) => i.to_string(),
        MapKey::U32(u) => u.to_string(),
        MapKey::U64(u) => u.to_string(),
        MapKey::String(s) => naming::normalize(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unwrapping_collapses_single_key_maps() {
        let nested = Value::map([("items", Value::map([("name", "x")]))]);

        assert_eq!(
            unwrap_root(nested.clone()),
            Value::map([("name", "x")])
        );

        let two_keys = Value::map([("a", 1), ("b", 2)]);
        assert_eq!(unwrap_root(two_keys.clone()), two_keys);
        assert_eq!(unwrap_root(Value::from("plain")), Value::from("plain"));
    }

    #[test]
    fn test_marshal_root_honours_toggle() {
        let value = ReflectValue::Map(
            [(
                MapKey::String("items".into()),
                ReflectValue::String("x".into()),
            )]
            .into_iter()
            .collect(),
        );

        let off = Marshaller::new(&Settings::default());
        assert_eq!(
            off.marshal_root(Some(&value), None),
            Value::map([("items", "x")])
        );

        let on = Marshaller::new(&Settings {
            unwrap_root: true,
            ..Settings::default()
        });
        assert_eq!(on.marshal_root(Some(&value), None), Value::from("x"));
    }

    #[test]
    fn test_map_keys_become_text() {
        let strings = ReflectValue::Map(
            [
                (MapKey::String("myKey".into()), ReflectValue::I32(1)),
                (MapKey::String("other_key".into()), ReflectValue::I32(2)),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(
            scalar_value(&strings),
            Value::map([("my-key", 1), ("other-key", 2)])
        );

        let numbers = ReflectValue::Map(
            [
                (MapKey::I64(-7), ReflectValue::Bool(true)),
                (MapKey::Bool(false), ReflectValue::Bool(false)),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(
            scalar_value(&numbers),
            Value::map([("-7", true), ("false", false)])
        );
    }

    #[test]
    fn test_scalars_and_null() {
        let marshaller = Marshaller::default();

        assert_eq!(marshaller.marshal(None, None), Value::Null);
        assert_eq!(scalar_value(&ReflectValue::U32(7)), Value::Int(7));
        assert_eq!(scalar_value(&ReflectValue::F32(0.5)), Value::Float(0.5));
        assert!(matches!(
            scalar_value(&ReflectValue::U64(u64::MAX)),
            Value::Float(_)
        ));
        assert_eq!(
            scalar_value(&ReflectValue::List(vec![
                ReflectValue::Bool(true),
                ReflectValue::String("a".into())
            ])),
            Value::List(vec![Value::Bool(true), Value::from("a")])
        );
    }
}
