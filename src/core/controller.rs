//! Process wiring: configuration → storage → collection manager.

use crate::collectors::manager::CollectionManager;
use crate::core::config::Config;
use crate::core::error::VigilError;
use crate::core::storage::StorageEngine;
use std::sync::Arc;

/// Owns the storage engine and the collector set for one process lifetime.
pub struct Controller {
    storage: Arc<StorageEngine>,
    manager: CollectionManager,
}

impl Controller {
    /// Open the store (failure here is fatal) and instantiate the configured
    /// collectors. Ending up with zero collectors is a warning, not an
    /// error: the query surface stays available.
    pub fn initialize(config: &Config) -> Result<Controller, VigilError> {
        let storage = Arc::new(StorageEngine::open(&config.resolved_db_path())?);
        let mut manager = CollectionManager::new();
        if !manager.initialize(&config.data_collection, &storage) {
            log::warn!("no collectors were initialized; only the query surface is available");
        }
        Ok(Controller { storage, manager })
    }

    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    pub fn collector_count(&self) -> usize {
        self.manager.len()
    }

    /// Best-effort start of every collector; true iff all started.
    pub fn start(&mut self) -> bool {
        self.manager.start_all()
    }

    /// Best-effort stop; true iff all stopped cleanly.
    pub fn stop(&mut self) -> bool {
        self.manager.stop_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CollectorConfig;
    use tempfile::tempdir;

    #[test]
    fn test_initialize_start_stop_cycle() {
        let tmp = tempdir().unwrap();
        let mut config = Config::default();
        config.storage.db_path = tmp.path().join("data.db").to_string_lossy().to_string();
        config.data_collection.collectors.insert(
            "app_activity".to_string(),
            CollectorConfig::default(),
        );

        let mut controller = Controller::initialize(&config).unwrap();
        assert_eq!(controller.collector_count(), 1);
        assert!(controller.start());
        assert!(controller.stop());
    }

    #[test]
    fn test_initialize_without_collectors_keeps_query_surface() {
        let tmp = tempdir().unwrap();
        let mut config = Config::default();
        config.storage.db_path = tmp.path().join("data.db").to_string_lossy().to_string();

        let mut controller = Controller::initialize(&config).unwrap();
        assert_eq!(controller.collector_count(), 0);
        assert!(controller.start());
        assert!(
            controller
                .storage()
                .get_events(crate::core::event::EventKind::File, None, None)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_initialize_fails_when_store_path_is_unusable() {
        let tmp = tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut config = Config::default();
        config.storage.db_path = blocker
            .join("data.db")
            .to_string_lossy()
            .to_string();
        match Controller::initialize(&config) {
            Err(VigilError::StorageInitError(_)) => {}
            other => panic!("expected StorageInitError, got {:?}", other.map(|_| ())),
        }
    }
}
