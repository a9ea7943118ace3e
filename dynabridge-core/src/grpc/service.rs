//! # gRPC Client Family
//!
//! [`GrpcServiceClass`] turns any service of a `FileDescriptorSet` into a
//! [`ClientClass`], the way a code generator would turn it into a client type:
//!
//! | Method kind      | Overloads                        | Output               |
//! |------------------|----------------------------------|----------------------|
//! | Unary            | `()` and `(Request)`             | `Response`           |
//! | Server streaming | `()` and `(Request)`             | `list<Response>`     |
//! | Client streaming | `(list<Request>)`                | `Response`           |
//! | Bidirectional    | `(list<Request>)`                | `list<Response>`     |
//!
//! The zero-argument overloads send the default request message.
//!
//! Credentials travel as request metadata (`x-access-key`, `x-secret-key`), the region
//! applied by the client factory as `x-region`.
//!
//! Clients either connect lazily to a URL (a credential endpoint containing `://`
//! replaces the class's default URL) or wrap an in-process `tonic` service given to
//! [`GrpcServiceClass::from_service`].
use super::client::{GrpcClient, GrpcRequestError};
use crate::{
    BoxError,
    client::{ClientClass, ClientInstance, OperationDescriptor},
    credential::Credential,
    types::TypeRef,
};
use futures_util::TryStreamExt;
use http_body::Body as HttpBody;
use prost_reflect::{
    DescriptorError, DescriptorPool, DynamicMessage, MethodDescriptor, ServiceDescriptor,
    Value as ReflectValue,
};
use std::{fmt, sync::Arc};
use tonic::{client::GrpcService, transport::Endpoint};

pub const ACCESS_KEY_HEADER: &str = "x-access-key";
pub const SECRET_KEY_HEADER: &str = "x-secret-key";
pub const REGION_HEADER: &str = "x-region";

#[derive(Debug, thiserror::Error)]
pub enum GrpcServiceError {
    #[error("Invalid file descriptor set: '{0}'")]
    Descriptor(#[from] DescriptorError),
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("Method '{0}' not found")]
    MethodNotFound(String),
    #[error("Method '{method}' expects {expected}")]
    UnexpectedArgument {
        method: String,
        expected: &'static str,
    },
    #[error("gRPC client request error: '{0}'")]
    Request(#[from] GrpcRequestError),
    #[error("gRPC call failed")]
    Status(#[source] tonic::Status),
}

type Connect = dyn Fn(&ServiceDescriptor, &Credential) -> Box<dyn ClientInstance> + Send + Sync;

#[derive(Clone)]
enum Transport {
    Url(String),
    Service(Arc<Connect>),
}

#[derive(Clone)]
pub struct GrpcServiceClass {
    service: ServiceDescriptor,
    transport: Transport,
}

impl GrpcServiceClass {
    /// A class whose clients connect to `default_url` unless the credential names a URL.
    pub fn new(service: ServiceDescriptor, default_url: impl Into<String>) -> Self {
        Self {
            service,
            transport: Transport::Url(default_url.into()),
        }
    }

    /// A class whose clients all call `transport`, typically an in-process server.
    pub fn from_service<S>(service: ServiceDescriptor, transport: S) -> Self
    where
        S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
        S::Future: Send,
        S::Error: Into<BoxError>,
        S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
        <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
    {
        let connect = move |service: &ServiceDescriptor, credential: &Credential| {
            let client = GrpcClient::new(transport.clone());
            Box::new(GrpcServiceInstance::new(service.clone(), client, credential.clone()))
                as Box<dyn ClientInstance>
        };

        Self {
            service,
            transport: Transport::Service(Arc::new(connect)),
        }
    }

    /// Builds the class of `service_name` out of an encoded `FileDescriptorSet`.
    pub fn from_file_descriptor_set(
        bytes: &[u8],
        service_name: &str,
        default_url: impl Into<String>,
    ) -> Result<Self, GrpcServiceError> {
        let pool = DescriptorPool::decode(bytes)?;
        Self::from_pool(&pool, service_name, default_url)
    }

    pub fn from_pool(
        pool: &DescriptorPool,
        service_name: &str,
        default_url: impl Into<String>,
    ) -> Result<Self, GrpcServiceError> {
        let service = pool
            .get_service_by_name(service_name)
            .ok_or_else(|| GrpcServiceError::ServiceNotFound(service_name.to_string()))?;
        Ok(Self::new(service, default_url))
    }

    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }
}

impl fmt::Debug for GrpcServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transport = match &self.transport {
            Transport::Url(url) => url.as_str(),
            Transport::Service(_) => "<in-process>",
        };
        f.debug_struct("GrpcServiceClass")
            .field("service", &self.service.full_name())
            .field("transport", &transport)
            .finish()
    }
}

impl ClientClass for GrpcServiceClass {
    fn class_name(&self) -> &str {
        self.service.full_name()
    }

    fn operations(&self) -> Vec<OperationDescriptor> {
        self.service.methods().flat_map(|m| operations(&m)).collect()
    }

    fn construct(&self, credential: &Credential) -> Result<Box<dyn ClientInstance>, BoxError> {
        let default_url = match &self.transport {
            Transport::Service(connect) => return Ok(connect(&self.service, credential)),
            Transport::Url(url) => url.as_str(),
        };

        let url = credential
            .endpoint
            .as_deref()
            .filter(|endpoint| endpoint.contains("://"))
            .unwrap_or(default_url);
        tracing::debug!(service = self.service.full_name(), url, "connecting lazily");

        let channel = Endpoint::from_shared(url.to_string())?.connect_lazy();
        let client = GrpcClient::new(channel);
        Ok(Box::new(GrpcServiceInstance::new(
            self.service.clone(),
            client,
            credential.clone(),
        )))
    }
}

fn operations(method: &MethodDescriptor) -> Vec<OperationDescriptor> {
    let input = TypeRef::Message(method.input());
    let output = TypeRef::Message(method.output());
    let output = if method.is_server_streaming() {
        TypeRef::list(output)
    } else {
        output
    };

    let name = method.name();
    if method.is_client_streaming() {
        vec![OperationDescriptor::new(
            name,
            vec![TypeRef::list(input)],
            Some(output),
        )]
    } else {
        vec![
            OperationDescriptor::new(name, vec![], Some(output.clone())),
            OperationDescriptor::new(name, vec![input], Some(output)),
        ]
    }
}

struct GrpcServiceInstance<S> {
    service: ServiceDescriptor,
    client: GrpcClient<S>,
    credential: Credential,
    region: Option<String>,
}

impl<S> GrpcServiceInstance<S> {
    fn new(service: ServiceDescriptor, client: GrpcClient<S>, credential: Credential) -> Self {
        Self {
            service,
            client,
            credential,
            region: None,
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        [
            (ACCESS_KEY_HEADER, self.credential.access_key.as_ref()),
            (SECRET_KEY_HEADER, self.credential.secret_key.as_ref()),
            (REGION_HEADER, self.region.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v.clone())))
        .collect()
    }
}

#[tonic::async_trait]
impl<S> ClientInstance for GrpcServiceInstance<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    fn set_region(&mut self, region: &str) {
        self.region = Some(region.to_string());
    }

    async fn invoke(
        &self,
        operation: &OperationDescriptor,
        arguments: Vec<Option<ReflectValue>>,
    ) -> Result<Option<ReflectValue>, BoxError> {
        let method = self
            .service
            .methods()
            .find(|m| m.name() == operation.name)
            .ok_or_else(|| InvokeError::MethodNotFound(operation.name.clone()))?;

        let mut client = self.client.clone();
        let headers = self.headers();
        let argument = arguments.into_iter().next().flatten();

        let response = match (method.is_client_streaming(), method.is_server_streaming()) {
            (false, false) => {
                let request = request_message(&method, argument)?;
                let response = client
                    .unary(method, request, headers)
                    .await?
                    .map_err(InvokeError::Status)?;
                ReflectValue::Message(response)
            }
            (false, true) => {
                let request = request_message(&method, argument)?;
                let stream = client
                    .server_streaming(method, request, headers)
                    .await?
                    .map_err(InvokeError::Status)?;
                collect(stream).await?
            }
            (true, false) => {
                let requests = request_messages(&method, argument)?;
                let response = client
                    .client_streaming(method, tokio_stream::iter(requests), headers)
                    .await?
                    .map_err(InvokeError::Status)?;
                ReflectValue::Message(response)
            }
            (true, true) => {
                let requests = request_messages(&method, argument)?;
                let stream = client
                    .bidirectional_streaming(method, tokio_stream::iter(requests), headers)
                    .await?
                    .map_err(InvokeError::Status)?;
                collect(stream).await?
            }
        };

        Ok(Some(response))
    }
}

async fn collect(stream: tonic::Streaming<DynamicMessage>) -> Result<ReflectValue, InvokeError> {
    let messages: Vec<DynamicMessage> = stream.try_collect().await.map_err(InvokeError::Status)?;
    Ok(ReflectValue::List(
        messages.into_iter().map(ReflectValue::Message).collect(),
    ))
}

fn request_message(
    method: &MethodDescriptor,
    argument: Option<ReflectValue>,
) -> Result<DynamicMessage, InvokeError> {
    match argument {
        None => Ok(DynamicMessage::new(method.input())),
        Some(ReflectValue::Message(message)) => Ok(message),
        Some(_) => Err(InvokeError::UnexpectedArgument {
            method: method.full_name().to_string(),
            expected: "a request message",
        }),
    }
}

fn request_messages(
    method: &MethodDescriptor,
    argument: Option<ReflectValue>,
) -> Result<Vec<DynamicMessage>, InvokeError> {
    let unexpected = || InvokeError::UnexpectedArgument {
        method: method.full_name().to_string(),
        expected: "a list of request messages",
    };

    match argument {
        None => Ok(Vec::new()),
        Some(ReflectValue::List(items)) => items
            .into_iter()
            .map(|item| match item {
                ReflectValue::Message(message) => Ok(message),
                _ => Err(unexpected()),
            })
            .collect(),
        Some(_) => Err(unexpected()),
    }
}
