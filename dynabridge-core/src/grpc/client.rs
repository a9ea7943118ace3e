//! # Generic gRPC Client
//!
//! Wraps a `tonic` client so that any method described by a `MethodDescriptor` can be
//! called with `DynamicMessage` payloads.
//!
//! * The HTTP/2 path (`/package.Service/Method`) is built at runtime.
//! * Headers are given as string pairs and validated into a `MetadataMap`.
//! * Unary, server streaming, client streaming and bidirectional calls each have a method.
//!
//! Every call returns `Ok(Err(Status))` when the server answered with an error, and
//! `Err(GrpcRequestError)` when the request could not be sent at all.
use super::codec::DynamicCodec;
use crate::BoxError;
use futures_util::Stream;
use http::uri::PathAndQuery;
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MethodDescriptor};
use std::str::FromStr;
use tonic::{
    Request, Response, Status, Streaming,
    client::GrpcService,
    metadata::{
        MetadataKey, MetadataValue,
        errors::{InvalidMetadataKey, InvalidMetadataValue},
    },
    transport::Channel,
};

#[derive(thiserror::Error, Debug)]
pub enum GrpcRequestError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
    #[error("Invalid metadata (header) key '{key}': '{source}'")]
    InvalidMetadataKey {
        key: String,
        source: InvalidMetadataKey,
    },
    #[error("Invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidMetadataValue {
        key: String,
        source: InvalidMetadataValue,
    },
    #[error("Invalid gRPC path '{0}'")]
    InvalidPath(String),
}

/// A gRPC client for methods only known through their descriptors.
#[derive(Debug, Clone)]
pub struct GrpcClient<S = Channel> {
    client: tonic::client::Grpc<S>,
}

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Single request, single response.
    pub async fn unary(
        &mut self,
        method: MethodDescriptor,
        payload: DynamicMessage,
        headers: Vec<(String, String)>,
    ) -> Result<Result<DynamicMessage, Status>, GrpcRequestError> {
        let (request, path, codec) = self.prepare(&method, payload, headers).await?;
        let response = self.client.unary(request, path, codec).await;
        Ok(response.map(Response::into_inner))
    }

    /// Single request, stream of responses.
    pub async fn server_streaming(
        &mut self,
        method: MethodDescriptor,
        payload: DynamicMessage,
        headers: Vec<(String, String)>,
    ) -> Result<Result<Streaming<DynamicMessage>, Status>, GrpcRequestError> {
        let (request, path, codec) = self.prepare(&method, payload, headers).await?;
        let response = self.client.server_streaming(request, path, codec).await;
        Ok(response.map(Response::into_inner))
    }

    /// Stream of requests, single response.
    pub async fn client_streaming(
        &mut self,
        method: MethodDescriptor,
        payloads: impl Stream<Item = DynamicMessage> + Send + 'static,
        headers: Vec<(String, String)>,
    ) -> Result<Result<DynamicMessage, Status>, GrpcRequestError> {
        let (request, path, codec) = self.prepare(&method, payloads, headers).await?;
        let response = self.client.client_streaming(request, path, codec).await;
        Ok(response.map(Response::into_inner))
    }

    /// Stream of requests, stream of responses.
    pub async fn bidirectional_streaming(
        &mut self,
        method: MethodDescriptor,
        payloads: impl Stream<Item = DynamicMessage> + Send + 'static,
        headers: Vec<(String, String)>,
    ) -> Result<Result<Streaming<DynamicMessage>, Status>, GrpcRequestError> {
        let (request, path, codec) = self.prepare(&method, payloads, headers).await?;
        let response = self.client.streaming(request, path, codec).await;
        Ok(response.map(Response::into_inner))
    }

    /// Waits for the service to be ready and assembles the pieces of a call.
    async fn prepare<T>(
        &mut self,
        method: &MethodDescriptor,
        payload: T,
        headers: Vec<(String, String)>,
    ) -> Result<(Request<T>, PathAndQuery, DynamicCodec), GrpcRequestError> {
        self.client
            .ready()
            .await
            .map_err(|e| GrpcRequestError::ClientNotReady(e.into()))?;

        let request = build_request(payload, headers)?;
        let path = http_path(method)?;
        let codec = DynamicCodec::new(method.input(), method.output());
        Ok((request, path, codec))
    }
}

fn http_path(method: &MethodDescriptor) -> Result<PathAndQuery, GrpcRequestError> {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    PathAndQuery::from_str(&path).map_err(|_| GrpcRequestError::InvalidPath(path))
}

fn build_request<T>(
    payload: T,
    headers: Vec<(String, String)>,
) -> Result<Request<T>, GrpcRequestError> {
    let mut request = Request::new(payload);
    for (name, value) in headers {
        let key = MetadataKey::from_str(&name).map_err(|source| {
            GrpcRequestError::InvalidMetadataKey {
                key: name.clone(),
                source,
            }
        })?;
        let value = MetadataValue::from_str(&value)
            .map_err(|source| GrpcRequestError::InvalidMetadataValue { key: name, source })?;
        request.metadata_mut().insert(key, value);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_become_metadata() {
        let request = build_request(
            (),
            vec![
                ("x-access-key".to_string(), "AK".to_string()),
                ("x-region".to_string(), "EU_WEST_1".to_string()),
            ],
        )
        .unwrap();

        let metadata = request.metadata();
        assert_eq!(metadata.get("x-access-key").unwrap(), "AK");
        assert_eq!(metadata.get("x-region").unwrap(), "EU_WEST_1");
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let err = build_request((), vec![("bad header".to_string(), "v".to_string())]).unwrap_err();

        assert!(matches!(
            err,
            GrpcRequestError::InvalidMetadataKey { key, .. } if key == "bad header"
        ));
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let err = build_request((), vec![("x-key".to_string(), "line\nbreak".to_string())])
            .unwrap_err();

        assert!(matches!(err, GrpcRequestError::InvalidMetadataValue { .. }));
    }
}
