//! Document-store abstraction used by the intent handlers.
//!
//! Handlers only need exact-match filtering and whole-collection listing, so
//! a backend is anything that can keep named collections of JSON records.

pub mod json_store;
pub mod memory_store;

pub use json_store::JsonStore;
pub use memory_store::MemoryStore;

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub reference: DocumentRef,
    pub record: Record,
}

pub trait DocumentStore {
    /// Appends a record and returns its generated id.
    fn add(&mut self, collection: &str, record: Record) -> Result<String, AppError>;

    /// Documents whose `field` equals `value` exactly, in insertion order.
    fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, AppError>;

    /// Merges `partial` into the referenced record.
    fn update_by_ref(&mut self, reference: &DocumentRef, partial: Record) -> Result<(), AppError>;

    fn delete_by_ref(&mut self, reference: &DocumentRef) -> Result<(), AppError>;

    /// Every document in the collection, in insertion order.
    fn list_all(&self, collection: &str) -> Result<Vec<StoredDocument>, AppError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    pub id: String,
    pub fields: Record,
}

/// Collections shared by both backends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Collections {
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<StoredRecord>>,
}

impl Collections {
    pub fn add(&mut self, collection: &str, record: Record) -> String {
        self.next_id += 1;
        let id = format!("doc-{}", self.next_id);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredRecord {
                id: id.clone(),
                fields: record,
            });
        id
    }

    pub fn query(&self, collection: &str, field: &str, value: &Value) -> Vec<StoredDocument> {
        self.documents(collection)
            .into_iter()
            .filter(|document| document.record.get(field) == Some(value))
            .collect()
    }

    pub fn update(&mut self, reference: &DocumentRef, partial: Record) -> Result<(), AppError> {
        let stored = self
            .collections
            .get_mut(&reference.collection)
            .and_then(|records| records.iter_mut().find(|record| record.id == reference.id))
            .ok_or_else(|| AppError::invalid_input("document not found"))?;

        for (key, value) in partial {
            stored.fields.insert(key, value);
        }
        Ok(())
    }

    pub fn delete(&mut self, reference: &DocumentRef) -> Result<(), AppError> {
        let records = self
            .collections
            .get_mut(&reference.collection)
            .ok_or_else(|| AppError::invalid_input("document not found"))?;
        let index = records
            .iter()
            .position(|record| record.id == reference.id)
            .ok_or_else(|| AppError::invalid_input("document not found"))?;
        records.remove(index);
        Ok(())
    }

    pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .map(|record| StoredDocument {
                        reference: DocumentRef {
                            collection: collection.to_string(),
                            id: record.id.clone(),
                        },
                        record: record.fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
