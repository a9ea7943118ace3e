use super::{CoerceError, builtin};
use crate::{
    config::Settings,
    types::{TypeKey, TypeRef},
    value::Value,
};
use arc_swap::ArcSwap;
use prost_reflect::Value as ReflectValue;
use std::{collections::HashMap, fmt, sync::Arc};

/// What a converter gets to know about the conversion it performs.
pub struct CoercionContext<'a> {
    /// The declared target type. Message converters use it to instantiate the message.
    pub target: &'a TypeRef,
    pub settings: &'a Settings,
}

pub type Converter =
    Arc<dyn Fn(&Value, &CoercionContext<'_>) -> Result<ReflectValue, CoerceError> + Send + Sync>;

/// Mapping from primitive target type to converter.
///
/// Readers never lock: every registration publishes a fresh map with a single atomic swap.
/// Entries can be added or overridden but never removed.
pub struct CoercionRegistry {
    converters: ArcSwap<HashMap<TypeKey, Converter>>,
}

impl CoercionRegistry {
    /// A registry without any converter, not even the built-in ones.
    pub fn empty() -> Self {
        Self {
            converters: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    pub fn register<F>(&self, key: TypeKey, converter: F)
    where
        F: Fn(&Value, &CoercionContext<'_>) -> Result<ReflectValue, CoerceError>
            + Send
            + Sync
            + 'static,
    {
        self.register_converter(key, Arc::new(converter));
    }

    pub fn register_converter(&self, key: TypeKey, converter: Converter) {
        tracing::debug!(target_type = %key, "registering coercion");
        self.converters.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(key.clone(), converter.clone());
            next
        });
    }

    pub fn get(&self, key: &TypeKey) -> Option<Converter> {
        self.converters.load().get(key).cloned()
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.converters.load().contains_key(key)
    }

    /// Whether `ty` is a leaf for the object builder: scalars, enums and registered messages.
    pub fn is_leaf(&self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Scalar(_) | TypeRef::Enum(_) => true,
            TypeRef::Message(_) => ty.type_key().is_some_and(|key| self.contains(&key)),
            TypeRef::List(_) | TypeRef::Map { .. } => false,
        }
    }

    /// Whether `ty` is a request-object type, i.e. a message built field by field.
    pub fn is_complex(&self, ty: &TypeRef) -> bool {
        matches!(ty, TypeRef::Message(_)) && !self.is_leaf(ty)
    }
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        let registry = Self::empty();
        for (key, converter) in builtin::converters() {
            registry.register_converter(key, converter);
        }
        registry
    }
}

impl fmt::Debug for CoercionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let converters = self.converters.load();
        let mut keys: Vec<String> = converters.keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("CoercionRegistry")
            .field("types", &keys)
            .finish()
    }
}
