use super::{ClientClass, ClientInstance};
use crate::{BoxError, credential::Credential};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OnceCell};

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Credential is missing '{0}'")]
    MissingField(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Failed to construct a '{class}' client: '{source}'")]
    Construction {
        class: String,
        #[source]
        source: BoxError,
    },
}

/// Identity of one client class value.
///
/// Two classes sharing a name (the same gRPC service dialed at two URLs, say) are
/// distinct classes. Caches keyed by a `ClassId` hold the class itself so the address
/// cannot be reused while the entry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(usize);

impl ClassId {
    pub fn of(class: &Arc<dyn ClientClass>) -> Self {
        Self(Arc::as_ptr(class).cast::<()>() as usize)
    }
}

/// The client cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity {
    pub class: ClassId,
    pub credential: Credential,
}

type Slot = Arc<OnceCell<Arc<dyn ClientInstance>>>;

struct Entry {
    class: Arc<dyn ClientClass>,
    slot: Slot,
}

/// Constructs clients lazily and keeps them for the lifetime of the factory.
///
/// The map lock is only held to fetch the slot of an identity. Construction happens
/// inside the slot, so concurrent first requests for one identity build a single
/// client while other identities proceed independently.
#[derive(Default)]
pub struct ClientFactory {
    clients: Mutex<HashMap<ClientIdentity, Entry>>,
}

impl ClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_client(
        &self,
        class: &Arc<dyn ClientClass>,
        credential: &Credential,
    ) -> Result<Arc<dyn ClientInstance>, ClientError> {
        validate(credential)?;

        let identity = ClientIdentity {
            class: ClassId::of(class),
            credential: credential.clone(),
        };

        let (class, slot) = {
            let mut clients = self.clients.lock().await;
            let entry = clients.entry(identity).or_insert_with(|| Entry {
                class: class.clone(),
                slot: Slot::default(),
            });
            (entry.class.clone(), entry.slot.clone())
        };

        let client = slot
            .get_or_try_init(|| async { construct(class.as_ref(), credential) })
            .await?;

        Ok(client.clone())
    }

    /// Number of clients constructed so far.
    pub async fn len(&self) -> usize {
        let clients = self.clients.lock().await;
        clients
            .values()
            .filter(|entry| entry.slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn validate(credential: &Credential) -> Result<(), ConfigurationError> {
    let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.trim().is_empty());

    if !present(&credential.access_key) {
        return Err(ConfigurationError::MissingField("access-key"));
    }
    if !present(&credential.secret_key) {
        return Err(ConfigurationError::MissingField("secret-key"));
    }
    Ok(())
}

fn construct(
    class: &dyn ClientClass,
    credential: &Credential,
) -> Result<Arc<dyn ClientInstance>, ClientError> {
    tracing::debug!(class = class.class_name(), "constructing client");

    let mut client = class
        .construct(credential)
        .map_err(|source| ClientError::Construction {
            class: class.class_name().to_string(),
            source,
        })?;

    if let Some(endpoint) = &credential.endpoint {
        let region = derive_region(endpoint);
        tracing::debug!(
            class = class.class_name(),
            region = region.as_str(),
            "applying region"
        );
        client.set_region(&region);
    }

    Ok(Arc::from(client))
}

/// Derives a region identifier from an endpoint: scheme, path and port are dropped, the
/// host is uppercased and `-`/`.` become `_` (`https://eu-west-1:443` → `EU_WEST_1`).
pub fn derive_region(endpoint: &str) -> String {
    let host = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    let host = host.split(['/', '?']).next().unwrap_or(host);
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };

    host.trim().to_uppercase().replace(['-', '.'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_region() {
        assert_eq!(derive_region("us-east-1"), "US_EAST_1");
        assert_eq!(derive_region("https://eu-west-1:443"), "EU_WEST_1");
        assert_eq!(
            derive_region("http://storage.eu-west-1.local/path"),
            "STORAGE_EU_WEST_1_LOCAL"
        );
    }

    #[test]
    fn test_validation_names_missing_field() {
        let no_secret = Credential {
            access_key: Some("AK".into()),
            ..Credential::default()
        };
        assert!(matches!(
            validate(&no_secret),
            Err(ConfigurationError::MissingField("secret-key"))
        ));

        let blank_access = Credential::new("  ", "SK");
        assert!(matches!(
            validate(&blank_access),
            Err(ConfigurationError::MissingField("access-key"))
        ));

        assert!(validate(&Credential::new("AK", "SK")).is_ok());
    }
}
