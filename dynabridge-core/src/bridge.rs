//! # Bridge
//!
//! The explicit context every interned function is bound to. It owns the state the
//! calls share:
//!
//! * the default [`Credential`],
//! * the [`Settings`] (date pattern, root unwrapping),
//! * the [`CoercionRegistry`],
//! * the [`ClientFactory`] and its client cache,
//! * the method catalogs, built once per class.
//!
//! A `Bridge` is a cheap handle: clones share the same state. Credential, settings and
//! registry updates are atomic swaps that affect every subsequent call made through any
//! clone.
use crate::{
    catalog::Catalog,
    client::{ClassId, ClientClass, ClientFactory},
    coerce::{CoerceError, CoercionContext, CoercionRegistry},
    config::Settings,
    credential::Credential,
    function::{InternedFunction, Namespace},
    types::TypeKey,
    value::Value,
};
use arc_swap::{ArcSwap, ArcSwapOption};
use prost_reflect::Value as ReflectValue;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

#[derive(Clone, Default)]
pub struct Bridge {
    shared: Arc<Shared>,
}

struct Shared {
    default_credential: ArcSwapOption<Credential>,
    settings: ArcSwap<Settings>,
    registry: CoercionRegistry,
    factory: ClientFactory,
    catalogs: Mutex<HashMap<ClassId, (Arc<dyn ClientClass>, Arc<Catalog>)>>,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            default_credential: ArcSwapOption::empty(),
            settings: ArcSwap::from_pointee(Settings::default()),
            registry: CoercionRegistry::default(),
            factory: ClientFactory::new(),
            catalogs: Mutex::new(HashMap::new()),
        }
    }
}

impl Bridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        let bridge = Self::new();
        bridge.shared.settings.store(Arc::new(settings));
        bridge
    }

    /// Interns every catalog entry of `class` into a fresh namespace.
    pub fn intern(&self, class: Arc<dyn ClientClass>) -> Namespace {
        let mut namespace = Namespace::new();
        self.intern_into(class, &mut namespace);
        namespace
    }

    /// Interns every catalog entry of `class` into `namespace`, replacing same-named functions.
    pub fn intern_into(&self, class: Arc<dyn ClientClass>, namespace: &mut Namespace) {
        let catalog = self.catalog(&class);
        for entry in catalog.entries() {
            namespace.insert(InternedFunction::new(entry, class.clone(), self.clone()));
        }
    }

    /// The catalog of `class`, built on first use.
    pub fn catalog(&self, class: &Arc<dyn ClientClass>) -> Arc<Catalog> {
        let mut catalogs = self
            .shared
            .catalogs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let (_, catalog) = catalogs
            .entry(ClassId::of(class))
            .or_insert_with(|| (class.clone(), Arc::new(Catalog::build(class.as_ref()))));
        catalog.clone()
    }

    pub fn set_default_credential(&self, credential: Credential) {
        tracing::debug!(credential = ?credential, "default credential replaced");
        self.shared.default_credential.store(Some(Arc::new(credential)));
    }

    pub fn clear_default_credential(&self) {
        self.shared.default_credential.store(None);
    }

    pub fn default_credential(&self) -> Option<Arc<Credential>> {
        self.shared.default_credential.load_full()
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.shared.settings.load_full()
    }

    pub fn set_date_format(&self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        self.shared.settings.rcu(|current| Settings {
            date_format: pattern.clone(),
            ..Settings::clone(current)
        });
    }

    pub fn set_root_unwrapping(&self, enabled: bool) {
        self.shared.settings.rcu(|current| Settings {
            unwrap_root: enabled,
            ..Settings::clone(current)
        });
    }

    /// Registers or overrides the converter for `key`.
    pub fn register_coercion<F>(&self, key: TypeKey, converter: F)
    where
        F: Fn(&Value, &CoercionContext<'_>) -> Result<ReflectValue, CoerceError>
            + Send
            + Sync
            + 'static,
    {
        self.shared.registry.register(key, converter);
    }

    pub fn registry(&self) -> &CoercionRegistry {
        &self.shared.registry
    }

    pub fn factory(&self) -> &ClientFactory {
        &self.shared.factory
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("default_credential", &self.default_credential())
            .field("settings", &self.settings())
            .field("registry", &self.shared.registry)
            .finish_non_exhaustive()
    }
}
