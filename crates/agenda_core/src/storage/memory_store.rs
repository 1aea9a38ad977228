use super::{Collections, DocumentRef, DocumentStore, Record, StoredDocument};
use crate::error::AppError;
use serde_json::Value;

/// Process-local store. Ids are sequential (`doc-1`, `doc-2`, ...).
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Collections,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn add(&mut self, collection: &str, record: Record) -> Result<String, AppError> {
        Ok(self.state.add(collection, record))
    }

    fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, AppError> {
        Ok(self.state.query(collection, field, value))
    }

    fn update_by_ref(&mut self, reference: &DocumentRef, partial: Record) -> Result<(), AppError> {
        self.state.update(reference, partial)
    }

    fn delete_by_ref(&mut self, reference: &DocumentRef) -> Result<(), AppError> {
        self.state.delete(reference)
    }

    fn list_all(&self, collection: &str) -> Result<Vec<StoredDocument>, AppError> {
        Ok(self.state.documents(collection))
    }
}
