//! Configuration surface consumed by the pipeline.
//!
//! The file is TOML. An unreadable or unparsable document is fatal; a
//! malformed per-collector section is warned about and skipped without
//! touching the rest; missing fields fill with defaults. Nothing here
//! writes config back.

use crate::core::error::VigilError;
use crate::core::schemas;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Operations the file collector can be asked to monitor. `Move` exists only
/// at this level: an admitted move is split into delete + create records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchOp {
    Create,
    Modify,
    Delete,
    Move,
}

fn default_enabled() -> bool {
    true
}

fn default_sample_interval() -> u64 {
    60
}

fn default_events() -> Vec<WatchOp> {
    vec![WatchOp::Create, WatchOp::Modify, WatchOp::Delete]
}

/// Per-collector sub-configuration. Collectors read only the fields they
/// understand; unrelated fields keep their defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Watched directories; `~` expands to the user home.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Excluded directories, matched path-segment-wise against candidates.
    #[serde(default)]
    pub exclude_paths: Vec<String>,
    #[serde(default = "default_events")]
    pub events: Vec<WatchOp>,
    /// Sampling period in seconds for interval-driven collectors.
    #[serde(default = "default_sample_interval")]
    pub sample_interval: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            enabled: true,
            paths: Vec::new(),
            exclude_paths: Vec::new(),
            events: default_events(),
            sample_interval: default_sample_interval(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataCollectionConfig {
    pub collectors: BTreeMap<String, CollectorConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            db_path: schemas::DEFAULT_DB_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub storage: StorageConfig,
    pub data_collection: DataCollectionConfig,
}

impl Config {
    /// Load and parse a config file. Read and parse failures are fatal to
    /// the caller.
    pub fn load(path: &Path) -> Result<Config, VigilError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VigilError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Config::parse(&raw)?;
        if config.data_collection.collectors.is_empty() {
            log::warn!(
                "no collectors configured in {}; pipeline will start empty",
                path.display()
            );
        }
        Ok(config)
    }

    /// Parse a TOML document. The document itself failing to parse is
    /// fatal; a malformed collector section is logged and skipped so the
    /// remaining collectors are unaffected.
    pub fn parse(raw: &str) -> Result<Config, VigilError> {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct RawConfig {
            storage: StorageConfig,
            data_collection: RawDataCollection,
        }
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct RawDataCollection {
            collectors: BTreeMap<String, toml::Value>,
        }

        let raw_config: RawConfig =
            toml::from_str(raw).map_err(|e| VigilError::ConfigError(e.to_string()))?;

        let mut collectors = BTreeMap::new();
        for (name, value) in raw_config.data_collection.collectors {
            match value.try_into::<CollectorConfig>() {
                Ok(collector_config) => {
                    collectors.insert(name, collector_config);
                }
                Err(e) => {
                    log::warn!("malformed config for collector {}: {}; skipping", name, e);
                }
            }
        }

        Ok(Config {
            storage: raw_config.storage,
            data_collection: DataCollectionConfig { collectors },
        })
    }

    /// Database path with `~` expanded.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

/// Expand a leading `~` to the user home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            let rest = rest.trim_start_matches('/');
            return if rest.is_empty() { home } else { home.join(rest) };
        }
    }
    PathBuf::from(path)
}

/// Template written by `vigil init`.
pub const DEFAULT_CONFIG: &str = r#"[storage]
db_path = "~/.vigil/data.db"

[data_collection.collectors.file_activity]
enabled = true
paths = ["~/Documents"]
exclude_paths = []
events = ["create", "modify", "delete", "move"]

[data_collection.collectors.system_sample]
enabled = true
sample_interval = 60

[data_collection.collectors.app_activity]
enabled = false
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_template_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.storage.db_path, "~/.vigil/data.db");
        let fa = &config.data_collection.collectors["file_activity"];
        assert!(fa.enabled);
        assert_eq!(fa.paths, vec!["~/Documents".to_string()]);
        assert!(fa.events.contains(&WatchOp::Move));
        assert!(!config.data_collection.collectors["app_activity"].enabled);
    }

    #[test]
    fn test_missing_sections_fill_with_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.storage.db_path, schemas::DEFAULT_DB_PATH);
        assert!(config.data_collection.collectors.is_empty());
    }

    #[test]
    fn test_collector_field_defaults() {
        let config = Config::parse(
            "[data_collection.collectors.system_sample]\nenabled = true\n",
        )
        .unwrap();
        let sc = &config.data_collection.collectors["system_sample"];
        assert_eq!(sc.sample_interval, 60);
        assert_eq!(sc.events, vec![WatchOp::Create, WatchOp::Modify, WatchOp::Delete]);
    }

    #[test]
    fn test_malformed_collector_section_is_skipped_not_fatal() {
        let config = Config::parse(
            r#"
[data_collection.collectors.file_activity]
enabled = "definitely"

[data_collection.collectors.system_sample]
sample_interval = 30
"#,
        )
        .unwrap();
        assert!(!config.data_collection.collectors.contains_key("file_activity"));
        assert_eq!(
            config.data_collection.collectors["system_sample"].sample_interval,
            30
        );
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        match Config::parse("[storage\ndb_path = 3") {
            Err(VigilError::ConfigError(_)) => {}
            other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_rejects_missing_file() {
        let tmp = tempdir().unwrap();
        assert!(Config::load(&tmp.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_expand_tilde_leaves_absolute_paths_alone() {
        assert_eq!(expand_tilde("/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
