//! # gRPC Client Family
//!
//! Services described by `prost-reflect` descriptors, exposed as a [`crate::ClientClass`]:
//!
//! * [`service`]: the class/instance pair built from a `FileDescriptorSet`.
//! * [`client`]: the generic transport, calling any method with `DynamicMessage` payloads.
//! * [`codec`]: the `tonic` codec encoding and decoding those payloads.
pub mod client;
pub mod codec;
pub mod service;

pub use service::{GrpcServiceClass, GrpcServiceError, InvokeError};
