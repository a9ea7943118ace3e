//! # Service Errors
//!
//! A failed invocation comes back as a boxed error whose outer layers are transport
//! or client wrappers. [`ServiceError::translate`] digs through the
//! [`Error::source`] chain for the underlying service failure (a `tonic::Status`, or a
//! [`ServiceError`] a client already produced) and flattens it into one record.
//!
//! Every field is optional: whatever the failure does not carry is left as `None`.
use crate::value::Value;
use std::{error::Error, fmt};
use tonic::{Code, Status};

/// Header carrying the request id assigned by the remote service.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceError {
    pub error_code: Option<String>,
    /// `Client` when the caller is at fault, `Service` otherwise.
    pub error_type: Option<String>,
    pub status_code: Option<u16>,
    pub request_id: Option<String>,
    pub service_name: Option<String>,
    pub message: Option<String>,
    pub stack_trace: Option<String>,
}

impl ServiceError {
    /// Translates the failure of a call made against `service_name`.
    pub fn translate(error: &(dyn Error + 'static), service_name: &str) -> Self {
        let mut record = chain(error)
            .find_map(|cause| {
                cause
                    .downcast_ref::<ServiceError>()
                    .cloned()
                    .or_else(|| cause.downcast_ref::<Status>().map(ServiceError::from_status))
            })
            .unwrap_or_else(|| ServiceError {
                message: Some(error.to_string()),
                ..ServiceError::default()
            });

        record.service_name.get_or_insert_with(|| service_name.to_string());
        record.stack_trace.get_or_insert_with(|| stack_trace(error));
        record
    }

    pub fn from_status(status: &Status) -> Self {
        let code = status.code();
        let message = (!status.message().is_empty()).then(|| status.message().to_string());
        let request_id = status
            .metadata()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        ServiceError {
            error_code: Some(format!("{code:?}")),
            error_type: Some(error_type(code).to_string()),
            status_code: Some(http_status(code)),
            request_id,
            message,
            ..ServiceError::default()
        }
    }

    /// The record as a generic map with hyphenated keys.
    pub fn to_value(&self) -> Value {
        Value::map([
            ("error-code", Value::from(self.error_code.clone())),
            ("error-type", Value::from(self.error_type.clone())),
            ("status-code", Value::from(self.status_code.map(u32::from))),
            ("request-id", Value::from(self.request_id.clone())),
            ("service-name", Value::from(self.service_name.clone())),
            ("message", Value::from(self.message.clone())),
            ("stack-trace", Value::from(self.stack_trace.clone())),
        ])
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Service error")?;
        if let Some(service) = &self.service_name {
            write!(f, " from '{service}'")?;
        }
        if let Some(code) = &self.error_code {
            write!(f, " ({code})")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl Error for ServiceError {}

fn chain<'a>(error: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(error), |&cause| cause.source())
}

fn stack_trace(error: &(dyn Error + 'static)) -> String {
    chain(error)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\ncaused by: ")
}

fn error_type(code: Code) -> &'static str {
    match code {
        Code::InvalidArgument
        | Code::NotFound
        | Code::AlreadyExists
        | Code::PermissionDenied
        | Code::Unauthenticated
        | Code::FailedPrecondition
        | Code::OutOfRange
        | Code::Cancelled => "Client",
        _ => "Service",
    }
}

fn http_status(code: Code) -> u16 {
    match code {
        Code::Ok => 200,
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => 400,
        Code::Unauthenticated => 401,
        Code::PermissionDenied => 403,
        Code::NotFound => 404,
        Code::AlreadyExists | Code::Aborted => 409,
        Code::ResourceExhausted => 429,
        Code::Cancelled => 499,
        Code::Unimplemented => 501,
        Code::Unavailable => 503,
        Code::DeadlineExceeded => 504,
        _ => 500,
    }
}
