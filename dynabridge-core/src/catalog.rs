//! # Method Catalog
//!
//! Groups the operations of a [`ClientClass`] by normalized name, dropping the
//! infrastructure operations that must never become callable functions.
use crate::{
    client::{ClientClass, OperationDescriptor},
    naming,
};

/// Operations never exposed as functions, in normalized form.
pub const DENYLIST: &[&str] = &[
    "init",
    "invoke",
    "set-endpoint",
    "set-region",
    "get-cached-response-metadata",
    "get-service-abbreviation",
];

pub fn is_denylisted(name: &str) -> bool {
    DENYLIST.contains(&naming::normalize(name).as_str())
}

/// One callable name and its overloads, in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub overloads: Vec<OperationDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    class_name: String,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn build(class: &dyn ClientClass) -> Self {
        let mut entries: Vec<CatalogEntry> = Vec::new();

        for operation in class.operations() {
            let name = naming::normalize(&operation.name);
            if DENYLIST.contains(&name.as_str()) {
                continue;
            }

            match entries.iter_mut().find(|entry| entry.name == name) {
                Some(entry) => entry.overloads.push(operation),
                None => entries.push(CatalogEntry {
                    name,
                    overloads: vec![operation],
                }),
            }
        }

        tracing::debug!(
            class = class.class_name(),
            operations = entries.len(),
            "built method catalog"
        );

        Self {
            class_name: class.class_name().to_string(),
            entries,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Looks up an entry by name, in any naming convention.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        let name = naming::normalize(name);
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
