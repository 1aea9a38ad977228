use crate::datetime::TimeMode;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "AGENDA_CONFIG_PATH";
const DEFAULT_COLLECTION: &str = "tareas";
const DEFAULT_CONTEXT_LIFESPAN: u32 = 2;

/// What to do with a bare hour that has no am/pm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeridiemPolicy {
    /// Ask a follow-up question before persisting.
    #[default]
    Ask,
    /// Persist the hour as typed for later manual correction.
    StoreRaw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub time_mode: TimeMode,
    #[serde(default)]
    pub meridiem_policy: MeridiemPolicy,
    /// Turns the am/pm follow-up stays open.
    #[serde(default = "default_context_lifespan")]
    pub context_lifespan: u32,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_mode: TimeMode::default(),
            meridiem_policy: MeridiemPolicy::default(),
            context_lifespan: DEFAULT_CONTEXT_LIFESPAN,
            collection: default_collection(),
        }
    }
}

fn default_context_lifespan() -> u32 {
    DEFAULT_CONTEXT_LIFESPAN
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub time_mode: Option<TimeMode>,
    pub meridiem_policy: Option<MeridiemPolicy>,
    pub context_lifespan: Option<u32>,
    pub collection: Option<String>,
}

impl ConfigOverrides {
    /// Applies one `key = value` pair. Keys and enum values are matched after
    /// [`canonical_name`] normalization.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        let field = canonical_name(key)
            .ok_or_else(|| AppError::invalid_input("override key cannot be empty"))?;

        match field.as_str() {
            "time_mode" => self.time_mode = Some(parse_time_mode(value)?),
            "meridiem_policy" => self.meridiem_policy = Some(parse_meridiem_policy(value)?),
            "context_lifespan" => {
                let lifespan = value
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|turns| *turns > 0)
                    .ok_or_else(|| {
                        AppError::invalid_input("context_lifespan must be a positive integer")
                    })?;
                self.context_lifespan = Some(lifespan);
            }
            "collection" => {
                let collection = value.trim();
                if collection.is_empty() {
                    return Err(AppError::invalid_input("collection cannot be empty"));
                }
                self.collection = Some(collection.to_string());
            }
            other => return Err(AppError::invalid_input(format!("unknown config field '{other}'"))),
        }

        Ok(())
    }
}

pub fn parse_time_mode(raw: &str) -> Result<TimeMode, AppError> {
    match canonical_name(raw).as_deref() {
        Some("passthrough" | "raw") => Ok(TimeMode::Passthrough),
        Some("twelve_hour" | "12h" | "12_hour") => Ok(TimeMode::TwelveHour),
        _ => Err(AppError::invalid_input(format!("unknown time mode '{}'", raw.trim()))),
    }
}

pub fn parse_meridiem_policy(raw: &str) -> Result<MeridiemPolicy, AppError> {
    match canonical_name(raw).as_deref() {
        Some("ask") => Ok(MeridiemPolicy::Ask),
        Some("store_raw" | "raw") => Ok(MeridiemPolicy::StoreRaw),
        _ => Err(AppError::invalid_input(format!(
            "unknown meridiem policy '{}'",
            raw.trim()
        ))),
    }
}

/// Lowercases and joins alphanumeric runs with `_` (`"Time-Mode"` → `time_mode`).
pub fn canonical_name(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("agenda").join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("agenda")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    if config.context_lifespan == 0 {
        return Err(AppError::invalid_data(format!(
            "context_lifespan in {} must be positive",
            path.display()
        )));
    }
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(mode) = overrides.time_mode {
        merged.time_mode = mode;
    }
    if let Some(policy) = overrides.meridiem_policy {
        merged.meridiem_policy = policy;
    }
    if let Some(lifespan) = overrides.context_lifespan {
        merged.context_lifespan = lifespan;
    }
    if let Some(collection) = overrides.collection.as_ref() {
        merged.collection = collection.clone();
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, MeridiemPolicy, canonical_name, load_config_from_path,
        load_config_with_fallback_from_path, merge_overrides, parse_time_mode,
    };
    use crate::datetime::TimeMode;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("agenda-{nanos}-{file_name}"))
    }

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let path = temp_path("missing-config.json");
        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert_eq!(result.config.context_lifespan, 2);
        assert_eq!(result.config.collection, "tareas");
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let path = temp_path("invalid-config.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);
        fs::remove_file(&path).ok();

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_some());
    }

    #[test]
    fn load_config_reads_valid_file() {
        let path = temp_path("valid-config.json");
        let content = serde_json::json!({
            "time_mode": "twelve_hour",
            "meridiem_policy": "store_raw",
            "context_lifespan": 3
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.time_mode, TimeMode::TwelveHour);
        assert_eq!(loaded.meridiem_policy, MeridiemPolicy::StoreRaw);
        assert_eq!(loaded.context_lifespan, 3);
        assert_eq!(loaded.collection, "tareas");
    }

    #[test]
    fn load_config_rejects_zero_lifespan() {
        let path = temp_path("zero-lifespan.json");
        fs::write(&path, "{\"context_lifespan\": 0}").unwrap();

        let err = load_config_from_path(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn overrides_canonicalize_keys_and_values() {
        let mut overrides = ConfigOverrides::default();
        overrides.set(" Time-Mode ", "Twelve Hour").unwrap();
        overrides.set("MERIDIEM_POLICY", "store-raw").unwrap();
        overrides.set("context lifespan", "4").unwrap();

        assert_eq!(overrides.time_mode, Some(TimeMode::TwelveHour));
        assert_eq!(overrides.meridiem_policy, Some(MeridiemPolicy::StoreRaw));
        assert_eq!(overrides.context_lifespan, Some(4));
    }

    #[test]
    fn overrides_reject_bad_input() {
        let mut overrides = ConfigOverrides::default();

        assert!(overrides.set("unknown", "x").is_err());
        assert!(overrides.set("", "x").is_err());
        assert!(overrides.set("context_lifespan", "0").is_err());
        assert!(overrides.set("time_mode", "24h").is_err());
        assert!(overrides.set("collection", "  ").is_err());
    }

    #[test]
    fn merge_overrides_preserves_base_config() {
        let base = Config::default();
        let overrides = ConfigOverrides {
            time_mode: Some(TimeMode::TwelveHour),
            collection: Some("pruebas".into()),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(base.time_mode, TimeMode::Passthrough);
        assert_eq!(merged.time_mode, TimeMode::TwelveHour);
        assert_eq!(merged.collection, "pruebas");
        assert_eq!(merged.meridiem_policy, MeridiemPolicy::Ask);
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            context_lifespan: 5,
            ..Config::default()
        };

        assert_eq!(merge_overrides(&base, &ConfigOverrides::default()), base);
    }

    #[test]
    fn canonical_name_maps_variants() {
        assert_eq!(canonical_name("Time-Mode"), Some("time_mode".into()));
        assert_eq!(canonical_name("  "), None);
        assert_eq!(parse_time_mode("12h").unwrap(), TimeMode::TwelveHour);
        assert_eq!(parse_time_mode("PASSTHROUGH").unwrap(), TimeMode::Passthrough);
    }
}
