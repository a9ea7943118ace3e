//! # Dynabridge Core
//!
//! `dynabridge-core` exposes every operation of a family of strongly-typed service clients
//! as functions over loosely-typed data, without writing one function per operation.
//!
//! ## Key Components
//!
//! * **[`Bridge`]:** The context object. It owns the default credential, the settings, the
//!   coercion registry, the client cache and the method catalogs.
//! * **[`ClientClass`] & [`ClientInstance`]:** The client family. A class publishes its
//!   operations as [`OperationDescriptor`]s and constructs authenticated instances.
//! * **[`Namespace`] & [`InternedFunction`]:** One callable per operation name. A call
//!   resolves the credential and the overload, builds the typed arguments, invokes the
//!   client and marshals the result back into a [`Value`].
//! * **[`GrpcServiceClass`]:** A ready-made client family for any service found in a
//!   `FileDescriptorSet`.
//!
//! ## Data flow
//!
//! Generic input ([`Value`]) is turned into `prost_reflect` values by the
//! [`build::ObjectBuilder`], leaf by leaf through the [`coerce::CoercionRegistry`].
//! Results go the other way through the [`marshal::Marshaller`]. Failures reported by the
//! remote service surface as a [`ServiceError`] record.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod bridge;
pub mod build;
pub mod catalog;
pub mod client;
pub mod coerce;
pub mod config;
pub mod credential;
pub mod function;
pub mod grpc;
pub mod marshal;
pub mod naming;
pub mod resolve;
pub mod service_error;
pub mod types;
pub mod value;

pub use bridge::Bridge;
pub use client::{ClientClass, ClientInstance, OperationDescriptor};
pub use config::Settings;
pub use credential::Credential;
pub use function::{CallError, InternedFunction, Namespace};
pub use grpc::GrpcServiceClass;
pub use resolve::Args;
pub use service_error::ServiceError;
pub use types::{ScalarKind, TypeKey, TypeRef};
pub use value::Value;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
