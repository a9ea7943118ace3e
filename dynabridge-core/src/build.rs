//! # Object Builder
//!
//! Builds typed request values out of generic input by walking the writable fields of
//! the target message type.
//!
//! * Leaves (scalars, enums and message types with a registered coercion) go through
//!   [`crate::coerce::coerce`].
//! * Other messages are instantiated with every field at its default and populated
//!   from a map, recursively.
//! * Lists and maps are converted element-wise using the element type carried by the
//!   declared [`TypeRef`], so nested containers of messages work at any depth.
//!
//! Keys without a matching field are skipped. `null` leaves a field unset.
use crate::{
    coerce::{self, CoerceError, CoercionRegistry},
    config::Settings,
    types::{self, ScalarKind, TypeRef},
    value::Value,
};
use prost_reflect::{
    DynamicMessage, MapKey, MessageDescriptor, ReflectMessage, Value as ReflectValue,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Coerce(#[from] CoerceError),
    #[error("Expected a value shaped like '{expected}', found a {found}")]
    ShapeMismatch {
        expected: String,
        found: &'static str,
    },
    #[error("Failed to set field '{field}': '{message}'")]
    SetField { field: String, message: String },
}

/// Builds request values against the coercions and settings of one call.
pub struct ObjectBuilder<'a> {
    registry: &'a CoercionRegistry,
    settings: &'a Settings,
}

impl<'a> ObjectBuilder<'a> {
    pub fn new(registry: &'a CoercionRegistry, settings: &'a Settings) -> Self {
        Self { registry, settings }
    }

    /// Converts `value` into an instance of `ty`. `null` yields `None`.
    pub fn build(&self, ty: &TypeRef, value: &Value) -> Result<Option<ReflectValue>, BuildError> {
        if value.is_null() {
            return Ok(None);
        }

        let built = match ty {
            TypeRef::Message(descriptor) if !self.registry.is_leaf(ty) => {
                ReflectValue::Message(self.build_message(descriptor, value)?)
            }
            TypeRef::List(element) => {
                // a lone value stands for a one-element list
                let items = match value {
                    Value::List(items) => items.as_slice(),
                    single => std::slice::from_ref(single),
                };
                let mut built = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(converted) = self.build(element, item)? {
                        built.push(converted);
                    }
                }
                ReflectValue::List(built)
            }
            TypeRef::Map { key, value: element } => {
                let entries = value.as_map().ok_or_else(|| mismatch(ty, value))?;
                let mut built = HashMap::with_capacity(entries.len());
                for (k, v) in entries {
                    if let Some(converted) = self.build(element, v)? {
                        built.insert(self.map_key(*key, k)?, converted);
                    }
                }
                ReflectValue::Map(built)
            }
            leaf => coerce::coerce(value, leaf, self.registry, self.settings)?,
        };

        Ok(Some(built))
    }

    /// Instantiates `descriptor` and populates it from a map value.
    pub fn build_message(
        &self,
        descriptor: &MessageDescriptor,
        value: &Value,
    ) -> Result<DynamicMessage, BuildError> {
        match value {
            Value::Map(fields) => self.populate(DynamicMessage::new(descriptor.clone()), fields),
            other => Err(BuildError::ShapeMismatch {
                expected: descriptor.full_name().to_string(),
                found: other.kind_name(),
            }),
        }
    }

    /// Writes every recognised key of `fields` into `message`.
    pub fn populate(
        &self,
        mut message: DynamicMessage,
        fields: &BTreeMap<String, Value>,
    ) -> Result<DynamicMessage, BuildError> {
        let descriptor = message.descriptor();

        for (key, value) in fields {
            let Some(accessor) = types::find_accessor(&descriptor, key) else {
                tracing::debug!(
                    message_type = descriptor.full_name(),
                    key = key.as_str(),
                    "skipping unknown key"
                );
                continue;
            };

            let Some(converted) = self.build(accessor.ty(), value)? else {
                continue;
            };

            message
                .try_set_field(accessor.descriptor(), converted)
                .map_err(|e| BuildError::SetField {
                    field: accessor.name().to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(message)
    }

    fn map_key(&self, kind: ScalarKind, key: &str) -> Result<MapKey, BuildError> {
        let ty = TypeRef::Scalar(kind);
        let coerced = coerce::coerce(&Value::from(key), &ty, self.registry, self.settings)?;

        match coerced {
            ReflectValue::Bool(b) => Ok(MapKey::Bool(b)),
            ReflectValue::I32(i) => Ok(MapKey::I32(i)),
            ReflectValue::I64(i) => Ok(MapKey::I64(i)),
            ReflectValue::U32(u) => Ok(MapKey::U32(u)),
            ReflectValue::U64(u) => Ok(MapKey::U64(u)),
            ReflectValue::String(s) => Ok(MapKey::String(s)),
            _ => Err(BuildError::ShapeMismatch {
                expected: format!("{kind} map key"),
                found: "string",
            }),
        }
    }
}

fn mismatch(ty: &TypeRef, value: &Value) -> BuildError {
    BuildError::ShapeMismatch {
        expected: ty.to_string(),
        found: value.kind_name(),
    }
}
