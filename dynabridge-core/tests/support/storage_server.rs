//! A `BucketService` server working on `DynamicMessage`s through `DynamicCodec`, served
//! in-process the same way a generated `tonic` server would be.
use super::{all_buckets, bucket, storage_service, string_field};
use dynabridge_core::{grpc::codec::DynamicCodec, service_error::REQUEST_ID_HEADER};
use futures_util::TryStreamExt;
use prost_reflect::{DynamicMessage, MethodDescriptor, Value as ReflectValue};
use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};
use tonic::{
    Request, Response, Status, Streaming,
    codegen::{Body, BoxFuture, BoxStream, Service, StdError, http},
    metadata::{MetadataMap, MetadataValue},
    server::{ClientStreamingService, Grpc, ServerStreamingService, UnaryService},
};

#[derive(Clone, Default)]
pub struct StorageServer {
    metadata: Arc<Mutex<Vec<MetadataMap>>>,
}

impl StorageServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata of the most recent request.
    pub fn last_metadata(&self) -> MetadataMap {
        self.metadata
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request received")
    }

    /// Number of requests received so far.
    pub fn requests(&self) -> usize {
        self.metadata.lock().unwrap().len()
    }

    fn record(&self, metadata: &MetadataMap) {
        self.metadata.lock().unwrap().push(metadata.clone());
    }
}

impl<B> Service<http::Request<B>> for StorageServer
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let service = storage_service();
        let prefix = format!("/{}/", service.full_name());
        let method = req
            .uri()
            .path()
            .strip_prefix(prefix.as_str())
            .and_then(|name| service.methods().find(|m| m.name() == name));

        let Some(method) = method else {
            return Box::pin(async { Ok(Status::unimplemented("unknown method").into_http()) });
        };

        let handler = Handler {
            server: self.clone(),
            method: method.clone(),
        };
        let mut grpc = Grpc::new(DynamicCodec::new(method.output(), method.input()));

        Box::pin(async move {
            let response = match (method.is_client_streaming(), method.is_server_streaming()) {
                (false, false) => grpc.unary(handler, req).await,
                (false, true) => grpc.server_streaming(handler, req).await,
                (true, false) => grpc.client_streaming(handler, req).await,
                (true, true) => Status::unimplemented("bidirectional streaming").into_http(),
            };
            Ok(response)
        })
    }
}

struct Handler {
    server: StorageServer,
    method: MethodDescriptor,
}

impl UnaryService<DynamicMessage> for Handler {
    type Response = DynamicMessage;
    type Future = BoxFuture<Response<DynamicMessage>, Status>;

    fn call(&mut self, request: Request<DynamicMessage>) -> Self::Future {
        self.server.record(request.metadata());
        let method = self.method.name().to_string();
        let name = string_field(request.get_ref(), "bucket_name");

        Box::pin(async move {
            match method.as_str() {
                _ if name.is_empty() => Err(Status::invalid_argument("bucket name is required")),
                "GetBucket" => Ok(Response::new(bucket(&name, 1, 42))),
                "DeleteBucket" => {
                    let mut status = Status::not_found(format!("bucket '{name}' does not exist"));
                    status
                        .metadata_mut()
                        .insert(REQUEST_ID_HEADER, MetadataValue::from_static("req-grpc-404"));
                    Err(status)
                }
                other => Err(Status::unimplemented(other.to_string())),
            }
        })
    }
}

impl ServerStreamingService<DynamicMessage> for Handler {
    type Response = DynamicMessage;
    type ResponseStream = BoxStream<DynamicMessage>;
    type Future = BoxFuture<Response<Self::ResponseStream>, Status>;

    fn call(&mut self, request: Request<DynamicMessage>) -> Self::Future {
        self.server.record(request.metadata());
        let prefix = string_field(request.get_ref(), "prefix");

        let buckets: Vec<Result<DynamicMessage, Status>> = all_buckets()
            .into_iter()
            .filter(|b| string_field(b, "name").starts_with(&prefix))
            .map(Ok)
            .collect();
        let stream: Self::ResponseStream = Box::pin(tokio_stream::iter(buckets));

        Box::pin(async move { Ok(Response::new(stream)) })
    }
}

impl ClientStreamingService<DynamicMessage> for Handler {
    type Response = DynamicMessage;
    type Future = BoxFuture<Response<DynamicMessage>, Status>;

    fn call(&mut self, request: Request<Streaming<DynamicMessage>>) -> Self::Future {
        self.server.record(request.metadata());
        let output = self.method.output();

        Box::pin(async move {
            let buckets: Vec<DynamicMessage> = request.into_inner().try_collect().await?;
            let mut response = DynamicMessage::new(output);
            response.set_field_by_name("count", ReflectValue::I32(buckets.len() as i32));
            Ok(Response::new(response))
        })
    }
}
