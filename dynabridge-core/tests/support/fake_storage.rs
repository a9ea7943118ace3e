//! An in-memory storage client family. Every constructed client is counted and every
//! invocation recorded, so tests can observe what the engine handed to the client.
use super::{all_buckets, bucket, message, string_field};
use dynabridge_core::{
    BoxError, ClientClass, ClientInstance, Credential, OperationDescriptor, ScalarKind,
    ServiceError, TypeRef,
    service_error::REQUEST_ID_HEADER,
};
use prost_reflect::Value as ReflectValue;
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tonic::{Status, metadata::MetadataValue};

pub const FAKE_STORAGE_CLASS: &str = "storage.FakeStorageClient";

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub operation: String,
    pub arguments: Vec<Option<ReflectValue>>,
}

#[derive(Clone, Default)]
pub struct FakeStorage {
    constructions: Arc<AtomicUsize>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
    construction_delay: Option<Duration>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes construction slow enough for concurrent first calls to overlap.
    pub fn with_construction_delay(mut self, delay: Duration) -> Self {
        self.construction_delay = Some(delay);
        self
    }

    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn last_invocation(&self) -> Invocation {
        self.invocations().pop().expect("no invocation recorded")
    }
}

fn op(name: &str, params: Vec<TypeRef>, output: Option<TypeRef>) -> OperationDescriptor {
    OperationDescriptor::new(name, params, output)
}

fn msg(name: &str) -> TypeRef {
    TypeRef::Message(message(name))
}

fn scalar(kind: ScalarKind) -> TypeRef {
    TypeRef::Scalar(kind)
}

impl ClientClass for FakeStorage {
    fn class_name(&self) -> &str {
        FAKE_STORAGE_CLASS
    }

    fn operations(&self) -> Vec<OperationDescriptor> {
        let string = || scalar(ScalarKind::String);
        let buckets = || Some(TypeRef::list(msg("Bucket")));

        vec![
            op("init", vec![], None),
            op("listBuckets", vec![], buckets()),
            op("listBuckets", vec![msg("ListBucketsRequest")], buckets()),
            op("getBucket", vec![msg("GetBucketRequest")], Some(msg("Bucket"))),
            op("getBucket", vec![string()], Some(msg("Bucket"))),
            op("getBucketLocation", vec![string()], Some(string())),
            op(
                "putObject",
                vec![msg("PutObjectRequest"), scalar(ScalarKind::Bytes)],
                Some(string()),
            ),
            op("echoBucket", vec![msg("Bucket")], Some(msg("Bucket"))),
            op(
                "createBucket",
                vec![msg("CreateBucketRequest")],
                Some(msg("CreateBucketRequest")),
            ),
            op(
                "countObjects",
                vec![string(), scalar(ScalarKind::I32)],
                Some(scalar(ScalarKind::I64)),
            ),
            op("whoAmI", vec![], Some(string())),
            op("currentRegion", vec![], Some(string())),
            op("deleteBucket", vec![string()], None),
            op("getObject", vec![string()], Some(scalar(ScalarKind::Bytes))),
            op("setEndpoint", vec![string()], None),
            op("setRegion", vec![string()], None),
            op("getCachedResponseMetadata", vec![msg("GetBucketRequest")], None),
        ]
    }

    fn construct(&self, credential: &Credential) -> Result<Box<dyn ClientInstance>, BoxError> {
        if let Some(delay) = self.construction_delay {
            std::thread::sleep(delay);
        }
        self.constructions.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakeStorageClient {
            credential: credential.clone(),
            region: None,
            invocations: self.invocations.clone(),
        }))
    }
}

struct FakeStorageClient {
    credential: Credential,
    region: Option<String>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

/// Wraps a status the way a transport layer would.
#[derive(Debug, thiserror::Error)]
#[error("transport failure")]
pub struct TransportError(#[source] pub Status);

#[tonic::async_trait]
impl ClientInstance for FakeStorageClient {
    fn set_region(&mut self, region: &str) {
        self.region = Some(region.to_string());
    }

    async fn invoke(
        &self,
        operation: &OperationDescriptor,
        arguments: Vec<Option<ReflectValue>>,
    ) -> Result<Option<ReflectValue>, BoxError> {
        self.invocations.lock().unwrap().push(Invocation {
            operation: operation.name.clone(),
            arguments: arguments.clone(),
        });

        let mut args = arguments.into_iter();
        let mut next = move || args.next().flatten();

        let result = match operation.name.as_str() {
            "listBuckets" => {
                let (prefix, limit) = match next() {
                    Some(ReflectValue::Message(request)) => (
                        string_field(&request, "prefix"),
                        request
                            .get_field_by_name("limit")
                            .and_then(|v| v.as_i32())
                            .unwrap_or_default(),
                    ),
                    _ => (String::new(), 0),
                };
                let limit = if limit > 0 { limit as usize } else { usize::MAX };
                let buckets = all_buckets()
                    .into_iter()
                    .filter(|b| string_field(b, "name").starts_with(&prefix))
                    .take(limit)
                    .map(ReflectValue::Message)
                    .collect();
                ReflectValue::List(buckets)
            }
            "getBucket" => {
                let name = match next() {
                    Some(ReflectValue::Message(request)) => string_field(&request, "bucket_name"),
                    Some(ReflectValue::String(name)) => name,
                    _ => String::new(),
                };
                ReflectValue::Message(bucket(&name, 1, 0))
            }
            "getBucketLocation" => ReflectValue::String(
                self.region.clone().unwrap_or_else(|| "US_EAST_1".to_string()),
            ),
            "putObject" => {
                let key = match next() {
                    Some(ReflectValue::Message(request)) => string_field(&request, "key"),
                    _ => String::new(),
                };
                let size = match next() {
                    Some(ReflectValue::Bytes(content)) => content.len(),
                    _ => 0,
                };
                ReflectValue::String(format!("{key}:{size}"))
            }
            "echoBucket" | "createBucket" => return Ok(next()),
            "countObjects" => {
                let bucket = next().and_then(|v| v.as_str().map(str::len)).unwrap_or(0);
                let limit = next().and_then(|v| v.as_i32()).unwrap_or(0);
                ReflectValue::I64(bucket as i64 * i64::from(limit))
            }
            "whoAmI" => {
                tokio::task::yield_now().await;
                ReflectValue::String(self.credential.access_key.clone().unwrap_or_default())
            }
            "currentRegion" => ReflectValue::String(self.region.clone().unwrap_or_default()),
            "deleteBucket" => {
                return Err(Box::new(ServiceError {
                    error_code: Some("BucketNotEmpty".to_string()),
                    error_type: Some("Client".to_string()),
                    status_code: Some(409),
                    request_id: Some("req-409".to_string()),
                    message: Some("The bucket you tried to delete is not empty".to_string()),
                    ..ServiceError::default()
                }));
            }
            "getObject" => {
                let mut status = Status::not_found("The specified key does not exist");
                status
                    .metadata_mut()
                    .insert(REQUEST_ID_HEADER, MetadataValue::from_static("req-404"));
                return Err(Box::new(TransportError(status)));
            }
            other => return Err(format!("unsupported operation '{other}'").into()),
        };

        Ok(Some(result))
    }
}
