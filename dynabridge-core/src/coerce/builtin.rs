//! Built-in converters installed in every default [`super::CoercionRegistry`].
use super::{CoerceError, CoercionContext, Converter, DECIMAL_TYPE, TIMESTAMP_TYPE, date};
use crate::{
    types::{ScalarKind, TypeKey},
    value::Value,
};
use prost::bytes::Bytes;
use prost_reflect::{DynamicMessage, Value as ReflectValue};
use std::sync::Arc;

pub(super) fn converters() -> Vec<(TypeKey, Converter)> {
    vec![
        entry(TypeKey::Scalar(ScalarKind::Bool), to_bool),
        entry(TypeKey::Scalar(ScalarKind::I32), to_i32),
        entry(TypeKey::Scalar(ScalarKind::I64), to_i64),
        entry(TypeKey::Scalar(ScalarKind::U32), to_u32),
        entry(TypeKey::Scalar(ScalarKind::U64), to_u64),
        entry(TypeKey::Scalar(ScalarKind::F32), to_f32),
        entry(TypeKey::Scalar(ScalarKind::F64), to_f64),
        entry(TypeKey::Scalar(ScalarKind::String), to_string),
        entry(TypeKey::Scalar(ScalarKind::Bytes), to_bytes),
        entry(TypeKey::Message(TIMESTAMP_TYPE.into()), to_timestamp),
        entry(TypeKey::Message(DECIMAL_TYPE.into()), to_decimal),
    ]
}

fn entry<F>(key: TypeKey, converter: F) -> (TypeKey, Converter)
where
    F: Fn(&Value, &CoercionContext<'_>) -> Result<ReflectValue, CoerceError>
        + Send
        + Sync
        + 'static,
{
    (key, Arc::new(converter))
}

fn invalid(value: &Value, ctx: &CoercionContext<'_>, reason: impl Into<String>) -> CoerceError {
    CoerceError::InvalidValue {
        target: ctx.target.to_string(),
        found: value.kind_name(),
        reason: reason.into(),
    }
}

fn to_bool(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    let b = match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => true,
            "false" | "no" | "0" => false,
            _ => return Err(invalid(value, ctx, format!("'{s}' is not a boolean"))),
        },
        _ => return Err(invalid(value, ctx, "expected a boolean")),
    };
    Ok(ReflectValue::Bool(b))
}

fn integer(value: &Value, ctx: &CoercionContext<'_>) -> Result<i128, CoerceError> {
    match value {
        Value::Int(i) => Ok(i128::from(*i)),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(*f as i128),
        Value::String(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|e| invalid(value, ctx, format!("'{s}' is not an integer: {e}"))),
        _ => Err(invalid(value, ctx, "expected an integer")),
    }
}

fn narrow<T: TryFrom<i128>>(
    value: &Value,
    ctx: &CoercionContext<'_>,
) -> Result<T, CoerceError> {
    let wide = integer(value, ctx)?;
    T::try_from(wide).map_err(|_| invalid(value, ctx, format!("{wide} is out of range")))
}

fn to_i32(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    narrow(value, ctx).map(ReflectValue::I32)
}

fn to_i64(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    narrow(value, ctx).map(ReflectValue::I64)
}

fn to_u32(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    narrow(value, ctx).map(ReflectValue::U32)
}

fn to_u64(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    narrow(value, ctx).map(ReflectValue::U64)
}

fn float(value: &Value, ctx: &CoercionContext<'_>) -> Result<f64, CoerceError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(value, ctx, format!("'{s}' is not a number: {e}"))),
        _ => Err(invalid(value, ctx, "expected a number")),
    }
}

fn to_f32(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    float(value, ctx).map(|f| ReflectValue::F32(f as f32))
}

fn to_f64(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    float(value, ctx).map(ReflectValue::F64)
}

fn to_string(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    value
        .to_text()
        .map(ReflectValue::String)
        .ok_or_else(|| invalid(value, ctx, "expected a scalar"))
}

fn to_bytes(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    let bytes = match value {
        Value::Bytes(b) => b.clone(),
        Value::String(s) => s.as_bytes().to_vec(),
        Value::List(items) => items
            .iter()
            .map(|item| match item {
                Value::Int(i) => u8::try_from(*i).ok(),
                _ => None,
            })
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| invalid(value, ctx, "list elements must be integers in 0..=255"))?,
        _ => return Err(invalid(value, ctx, "expected bytes or a string")),
    };
    Ok(ReflectValue::Bytes(Bytes::from(bytes)))
}

fn new_message(value: &Value, ctx: &CoercionContext<'_>) -> Result<DynamicMessage, CoerceError> {
    ctx.target
        .message_descriptor()
        .map(|descriptor| DynamicMessage::new(descriptor.clone()))
        .ok_or_else(|| invalid(value, ctx, "target is not a message type"))
}

fn set(
    message: &mut DynamicMessage,
    field: &str,
    field_value: ReflectValue,
    value: &Value,
    ctx: &CoercionContext<'_>,
) -> Result<(), CoerceError> {
    message
        .try_set_field_by_name(field, field_value)
        .map_err(|e| invalid(value, ctx, e.to_string()))
}

fn to_timestamp(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    let instant = date::to_datetime(value, &ctx.settings.date_format).map_err(|e| match e {
        date::DateError::Parse { input, pattern } => CoerceError::DateParse { input, pattern },
        date::DateError::Unsupported(reason) => invalid(value, ctx, reason),
    })?;

    let mut message = new_message(value, ctx)?;
    set(
        &mut message,
        "seconds",
        ReflectValue::I64(instant.timestamp()),
        value,
        ctx,
    )?;
    set(
        &mut message,
        "nanos",
        ReflectValue::I32(instant.timestamp_subsec_nanos() as i32),
        value,
        ctx,
    )?;
    Ok(ReflectValue::Message(message))
}

fn to_decimal(value: &Value, ctx: &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> {
    let text = match value {
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => f.to_string(),
        Value::String(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => trimmed.to_string(),
                _ => return Err(invalid(value, ctx, format!("'{s}' is not a decimal number"))),
            }
        }
        _ => return Err(invalid(value, ctx, "expected a decimal number")),
    };

    let mut message = new_message(value, ctx)?;
    set(&mut message, "value", ReflectValue::String(text), value, ctx)?;
    Ok(ReflectValue::Message(message))
}
