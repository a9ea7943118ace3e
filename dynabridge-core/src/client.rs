//! # Client Family
//!
//! The engine never looks at live objects. A family of service clients is described by
//! two traits:
//!
//! * **[`ClientClass`]**: the "class". It publishes the table of its public operations,
//!   produced ahead of time from the service descriptor, and constructs instances
//!   from a [`Credential`].
//! * **[`ClientInstance`]**: a constructed, authenticated handle that invokes operations
//!   with already-typed arguments.
//!
//! Instances are created and memoized by the [`ClientFactory`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use dynabridge_core::{Bridge, Credential, GrpcServiceClass, resolve::Args};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("descriptor.bin")?;
//! let class = GrpcServiceClass::from_file_descriptor_set(
//!     &bytes,
//!     "storage.v1.BucketService",
//!     "http://localhost:50051",
//! )?;
//!
//! let bridge = Bridge::new();
//! bridge.set_default_credential(Credential::new("AK", "SK"));
//!
//! let storage = bridge.intern(Arc::new(class));
//! let buckets = storage.call("list-buckets", Args::new()).await?;
//! # Ok(())
//! # }
//! ```
pub mod factory;

pub use factory::{
    ClassId, ClientError, ClientFactory, ClientIdentity, ConfigurationError, derive_region,
};

use crate::{BoxError, credential::Credential, types::TypeRef};
use prost_reflect::Value as ReflectValue;
use std::fmt;

/// A callable operation: its raw name and declared shape.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    pub name: String,
    pub params: Vec<TypeRef>,
    /// `None` for operations returning nothing.
    pub output: Option<TypeRef>,
}

impl OperationDescriptor {
    pub fn new(name: impl Into<String>, params: Vec<TypeRef>, output: Option<TypeRef>) -> Self {
        Self {
            name: name.into(),
            params,
            output,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")?;
        if let Some(output) = &self.output {
            write!(f, " -> {output}")?;
        }
        Ok(())
    }
}

/// A family member whose operations can be interned.
pub trait ClientClass: Send + Sync {
    /// Stable name of the class. Clients are cached per class name.
    fn class_name(&self) -> &str;

    /// Every public operation in declaration order, overloads included.
    fn operations(&self) -> Vec<OperationDescriptor>;

    /// Builds a new client authenticated with `credential`.
    fn construct(&self, credential: &Credential) -> Result<Box<dyn ClientInstance>, BoxError>;
}

#[tonic::async_trait]
pub trait ClientInstance: Send + Sync {
    fn set_region(&mut self, region: &str);

    /// Invokes `operation` with one argument per declared parameter.
    ///
    /// Failures reported by the remote service must be reachable through the
    /// [`std::error::Error::source`] chain of the returned error.
    async fn invoke(
        &self,
        operation: &OperationDescriptor,
        arguments: Vec<Option<ReflectValue>>,
    ) -> Result<Option<ReflectValue>, BoxError>;
}
