use super::{Collections, DocumentRef, DocumentStore, Record, StoredDocument};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SCHEMA_VERSION: u32 = 2;
const STORE_FILE_NAME: &str = "store.json";
const STORE_ENV_VAR: &str = "AGENDA_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredFile {
    schema_version: u32,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    collections: BTreeMap<String, Vec<super::StoredRecord>>,
}

/// Store backed by a single JSON file, re-read and rewritten on every call.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(store_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<T>(
        &mut self,
        change: impl FnOnce(&mut Collections) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut state = load_state(&self.path)?;
        let result = change(&mut state)?;
        save_state(&self.path, &state)?;
        Ok(result)
    }
}

impl DocumentStore for JsonStore {
    fn add(&mut self, collection: &str, record: Record) -> Result<String, AppError> {
        self.mutate(|state| Ok(state.add(collection, record)))
    }

    fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, AppError> {
        Ok(load_state(&self.path)?.query(collection, field, value))
    }

    fn update_by_ref(&mut self, reference: &DocumentRef, partial: Record) -> Result<(), AppError> {
        self.mutate(|state| state.update(reference, partial))
    }

    fn delete_by_ref(&mut self, reference: &DocumentRef) -> Result<(), AppError> {
        self.mutate(|state| state.delete(reference))
    }

    fn list_all(&self, collection: &str) -> Result<Vec<StoredDocument>, AppError> {
        Ok(load_state(&self.path)?.documents(collection))
    }
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("agenda").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("agenda")
            .join(STORE_FILE_NAME))
    }
}

pub(crate) fn load_state(path: &Path) -> Result<Collections, AppError> {
    if !path.exists() {
        return Ok(Collections::default());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredFile =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    let next_id = stored.next_id.max(highest_id(&stored.collections));
    Ok(Collections {
        next_id,
        collections: stored.collections,
    })
}

// Files written before the counter existed still carry `doc-N` ids.
fn highest_id(collections: &BTreeMap<String, Vec<super::StoredRecord>>) -> u64 {
    collections
        .values()
        .flatten()
        .filter_map(|record| record.id.strip_prefix("doc-")?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

pub(crate) fn save_state(path: &Path, state: &Collections) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredFile {
        schema_version: SCHEMA_VERSION,
        next_id: state.next_id,
        collections: state.collections.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;
    debug!(path = %path.display(), "store written");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}
