//! # Interned Functions
//!
//! An [`InternedFunction`] is one catalog entry turned into a callable. A call runs:
//!
//! 1. Credential resolution: scoped, then leading argument, then the bridge default.
//! 2. Overload resolution. A lone map argument that matches nothing is retried once
//!    spread into key/value pairs.
//! 3. Client lookup through the factory.
//! 4. Argument construction: one request object, or positional coercion.
//! 5. Invocation.
//! 6. Marshalling of the result, or translation of the failure into a [`ServiceError`].
use crate::{
    BoxError,
    bridge::Bridge,
    build::{BuildError, ObjectBuilder},
    catalog::CatalogEntry,
    client::{ClientClass, ClientError, ConfigurationError, OperationDescriptor},
    credential::{self, Credential},
    marshal::Marshaller,
    resolve::{self, Arg, Args, Resolution, Strategy},
    service_error::ServiceError,
    value::Value,
};
use prost_reflect::Value as ReflectValue;
use std::{collections::BTreeMap, fmt, sync::Arc};

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("No overload of '{operation}' accepts {arguments} argument(s)")]
    NoMatchingOverload { operation: String, arguments: usize },
    #[error("Invalid arguments for '{operation}': {reason}")]
    InvalidArguments { operation: String, reason: String },
    #[error("Failed to build the arguments of '{operation}': '{source}'")]
    Build {
        operation: String,
        #[source]
        source: BuildError,
    },
    #[error("Failed to construct a '{class}' client: '{source}'")]
    Construction {
        class: String,
        #[source]
        source: BoxError,
    },
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<ClientError> for CallError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Configuration(e) => CallError::Configuration(e),
            ClientError::Construction { class, source } => CallError::Construction { class, source },
        }
    }
}

#[derive(Clone)]
pub struct InternedFunction {
    name: String,
    overloads: Arc<[OperationDescriptor]>,
    class: Arc<dyn ClientClass>,
    bridge: Bridge,
}

impl InternedFunction {
    pub(crate) fn new(entry: &CatalogEntry, class: Arc<dyn ClientClass>, bridge: Bridge) -> Self {
        Self {
            name: entry.name.clone(),
            overloads: entry.overloads.clone().into(),
            class,
            bridge,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn overloads(&self) -> &[OperationDescriptor] {
        &self.overloads
    }

    pub async fn call(&self, args: Args) -> Result<Value, CallError> {
        let credential = self.effective_credential(&args);
        let registry = self.bridge.registry();
        let settings = self.bridge.settings();

        let flattened = match resolve::resolve(&self.overloads, args.items(), registry) {
            Some(_) => None,
            None => args.flatten_single_map(),
        };
        let items = flattened.as_ref().map_or(args.items(), Args::items);

        let resolution = resolve::resolve(&self.overloads, items, registry).ok_or_else(|| {
            CallError::NoMatchingOverload {
                operation: self.name.clone(),
                arguments: args.len(),
            }
        })?;

        tracing::debug!(
            operation = self.name.as_str(),
            overload = %resolution.overload,
            strategy = ?resolution.strategy,
            "resolved overload"
        );

        let client = self
            .bridge
            .factory()
            .get_client(&self.class, &credential)
            .await?;

        let builder = ObjectBuilder::new(registry, &settings);
        let arguments = self.arguments(&builder, &resolution, items)?;

        match client.invoke(resolution.overload, arguments).await {
            Ok(result) => Ok(Marshaller::new(&settings)
                .marshal_root(result.as_ref(), resolution.overload.output.as_ref())),
            Err(error) => {
                let record = ServiceError::translate(&*error, self.class.class_name());
                tracing::warn!(operation = self.name.as_str(), error = %record, "call failed");
                Err(CallError::Service(record))
            }
        }
    }

    fn effective_credential(&self, args: &Args) -> Credential {
        credential::current()
            .or_else(|| args.leading_credential().cloned())
            .or_else(|| self.bridge.default_credential().map(|c| Credential::clone(&c)))
            .unwrap_or_default()
    }

    fn arguments(
        &self,
        builder: &ObjectBuilder<'_>,
        resolution: &Resolution<'_>,
        items: &[Arg],
    ) -> Result<Vec<Option<ReflectValue>>, CallError> {
        let params = &resolution.overload.params;
        let mut arguments: Vec<Option<ReflectValue>> = vec![None; params.len()];

        match resolution.strategy {
            Strategy::NoArguments => {}
            Strategy::Positional => {
                for (slot, (param, item)) in arguments.iter_mut().zip(params.iter().zip(items)) {
                    *slot = builder
                        .build(param, &item.to_value())
                        .map_err(|source| self.build_error(source))?;
                }
            }
            Strategy::RequestObject => {
                let registry = self.bridge.registry();
                let last = params.len() - 1;
                let target = if registry.is_complex(&params[0]) { 0 } else { last };

                let (pairs, payload) = if items.len() % 2 == 1 {
                    (&items[..items.len() - 1], items.last())
                } else {
                    (items, None)
                };

                let fields = self.pairs(pairs)?;
                arguments[target] = builder
                    .build(&params[target], &Value::Map(fields))
                    .map_err(|source| self.build_error(source))?;

                if let Some(payload) = payload {
                    arguments[last] = builder
                        .build(&params[last], &payload.to_value())
                        .map_err(|source| self.build_error(source))?;
                }
            }
        }

        Ok(arguments)
    }

    fn pairs(&self, items: &[Arg]) -> Result<BTreeMap<String, Value>, CallError> {
        items
            .chunks(2)
            .map(|pair| match pair {
                [Arg::Field(key), value] | [Arg::Value(Value::String(key)), value] => {
                    Ok((key.clone(), value.to_value()))
                }
                [key, _] => Err(CallError::InvalidArguments {
                    operation: self.name.clone(),
                    reason: format!("expected a field name, found {:?}", key.to_value()),
                }),
                _ => Err(CallError::InvalidArguments {
                    operation: self.name.clone(),
                    reason: "dangling key without a value".to_string(),
                }),
            })
            .collect()
    }

    fn build_error(&self, source: BuildError) -> CallError {
        CallError::Build {
            operation: self.name.clone(),
            source,
        }
    }
}

impl fmt::Debug for InternedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternedFunction")
            .field("name", &self.name)
            .field("class", &self.class.class_name())
            .field("overloads", &self.overloads.len())
            .finish()
    }
}

/// The functions interned from one or more client classes, by normalized name.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    functions: Vec<InternedFunction>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `function`, replacing any function with the same name.
    pub fn insert(&mut self, function: InternedFunction) {
        match self.functions.iter_mut().find(|f| f.name == function.name) {
            Some(existing) => *existing = function,
            None => self.functions.push(function),
        }
    }

    /// Looks up a function by name, in any naming convention.
    pub fn function(&self, name: &str) -> Option<&InternedFunction> {
        let name = crate::naming::normalize(name);
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.name())
    }

    pub fn functions(&self) -> &[InternedFunction] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub async fn call(&self, name: &str, args: Args) -> Result<Value, CallError> {
        let function = self
            .function(name)
            .ok_or_else(|| CallError::UnknownOperation(name.to_string()))?;
        function.call(args).await
    }
}
