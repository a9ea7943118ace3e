//! # Coercion
//!
//! Converts generic leaf values into the primitive representation a declared type
//! expects. Resolution order for a target type:
//!
//! 1. The value already has the exact shape of the target: returned as is.
//! 2. The target is an enum: case-insensitive match against the enum constants.
//!    Besides the full constant name, two forms are accepted: the name without the
//!    enum's prefix (`active` for `BUCKET_STATUS_ACTIVE`) and an integer, which selects
//!    the constant with that number.
//! 3. Otherwise the [`CoercionRegistry`] converter registered for the target is applied.
//!
//! The registry ships with converters for every protobuf scalar plus
//! `google.protobuf.Timestamp` and `google.type.Decimal`, and can be extended at runtime.
mod builtin;
pub mod date;
mod registry;

pub use registry::{CoercionContext, CoercionRegistry, Converter};

use crate::{
    config::Settings,
    naming,
    types::{ScalarKind, TypeRef},
    value::Value,
};
use prost::bytes::Bytes;
use prost_reflect::{EnumDescriptor, Value as ReflectValue};

pub const TIMESTAMP_TYPE: &str = "google.protobuf.Timestamp";
pub const DECIMAL_TYPE: &str = "google.type.Decimal";

#[derive(Debug, thiserror::Error)]
pub enum CoerceError {
    #[error("'{value}' does not match any constant of enum '{enumeration}'")]
    NoMatchingEnumValue { enumeration: String, value: String },
    #[error("No coercion registered for type '{0}'")]
    UnregisteredType(String),
    #[error("Failed to parse '{input}' as a date with pattern '{pattern}'")]
    DateParse { input: String, pattern: String },
    #[error("Cannot convert {found} value to '{target}': {reason}")]
    InvalidValue {
        target: String,
        found: &'static str,
        reason: String,
    },
}

/// Coerces `value` into the primitive representation of `target`.
pub fn coerce(
    value: &Value,
    target: &TypeRef,
    registry: &CoercionRegistry,
    settings: &Settings,
) -> Result<ReflectValue, CoerceError> {
    if let Some(same) = exact(value, target) {
        return Ok(same);
    }

    if let TypeRef::Enum(enumeration) = target {
        return coerce_enum(value, enumeration);
    }

    let converter = target
        .type_key()
        .and_then(|key| registry.get(&key))
        .ok_or_else(|| CoerceError::UnregisteredType(target.to_string()))?;

    converter(value, &CoercionContext { target, settings })
}

fn exact(value: &Value, target: &TypeRef) -> Option<ReflectValue> {
    let TypeRef::Scalar(kind) = target else {
        return None;
    };

    match (value, kind) {
        (Value::Bool(b), ScalarKind::Bool) => Some(ReflectValue::Bool(*b)),
        (Value::Int(i), ScalarKind::I64) => Some(ReflectValue::I64(*i)),
        (Value::Float(f), ScalarKind::F64) => Some(ReflectValue::F64(*f)),
        (Value::String(s), ScalarKind::String) => Some(ReflectValue::String(s.clone())),
        (Value::Bytes(b), ScalarKind::Bytes) => Some(ReflectValue::Bytes(Bytes::from(b.clone()))),
        _ => None,
    }
}

/// Matches a value against the constants of an enum.
///
/// The comparison ignores case and treats `-` like `_`. Constants can also be addressed
/// without their enum-name prefix (`active` matches `BUCKET_STATUS_ACTIVE` in
/// `BucketStatus`), and integers select a constant by number.
pub fn coerce_enum(
    value: &Value,
    enumeration: &EnumDescriptor,
) -> Result<ReflectValue, CoerceError> {
    let no_match = || CoerceError::NoMatchingEnumValue {
        enumeration: enumeration.full_name().to_string(),
        value: value.to_text().unwrap_or_else(|| value.kind_name().to_string()),
    };

    if let Value::Int(number) = value {
        return i32::try_from(*number)
            .ok()
            .and_then(|n| enumeration.get_value(n))
            .map(|v| ReflectValue::EnumNumber(v.number()))
            .ok_or_else(no_match);
    }

    let wanted = fold(&value.to_text().ok_or_else(no_match)?);
    let prefix = format!("{}_", fold(&naming::normalize(enumeration.name())));

    enumeration
        .values()
        .find(|constant| {
            let name = fold(constant.name());
            name == wanted || name.strip_prefix(&prefix) == Some(wanted.as_str())
        })
        .map(|constant| ReflectValue::EnumNumber(constant.number()))
        .ok_or_else(no_match)
}

fn fold(text: &str) -> String {
    text.trim().to_lowercase().replace('-', "_")
}
