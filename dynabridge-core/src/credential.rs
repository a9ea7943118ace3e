//! # Credentials
//!
//! A [`Credential`] is the `(access key, secret key, endpoint)` triple a client is
//! constructed with. It takes part in the client cache key, so equal credentials always
//! share one client instance.
//!
//! Three sources are consulted for every call, highest precedence first:
//!
//! 1. A credential bound with [`scoped`] around the calling future.
//! 2. A credential passed as the leading argument of the call.
//! 3. The default credential of the [`crate::Bridge`].
//!
//! Scoped credentials live in a task-local, so concurrent calls on other tasks never
//! observe each other's overrides.
use crate::{naming, value::Value};
use std::{fmt, future::Future};

tokio::task_local! {
    static SCOPED: Credential;
}

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Credential {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Either a URL or a bare region-like name (e.g. `us-east-1`).
    pub endpoint: Option<String>,
}

impl Credential {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: Some(access_key.into()),
            secret_key: Some(secret_key.into()),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Reads a credential out of a map with `access-key`, `secret-key` and `endpoint` keys.
    ///
    /// Any naming convention is accepted for the keys (`accessKey`, `access_key`, ...).
    /// Returns `None` when the value is not such a map, or carries other keys.
    pub fn from_value(value: &Value) -> Option<Self> {
        let entries = value.as_map()?;
        let mut credential = Credential::default();

        for (key, value) in entries {
            let slot = match naming::normalize(key).as_str() {
                "access-key" => &mut credential.access_key,
                "secret-key" => &mut credential.secret_key,
                "endpoint" => &mut credential.endpoint,
                _ => return None,
            };
            *slot = value.to_text();
        }

        (credential.access_key.is_some() || credential.secret_key.is_some()).then_some(credential)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Runs `future` with `credential` overriding every other credential source.
pub async fn scoped<F: Future>(credential: Credential, future: F) -> F::Output {
    SCOPED.scope(credential, future).await
}

/// The credential bound by an enclosing [`scoped`] call on the current task, if any.
pub fn current() -> Option<Credential> {
    SCOPED.try_with(Credential::clone).ok()
}
