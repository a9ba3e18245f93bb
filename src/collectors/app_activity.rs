//! Application activity collector.
//!
//! Tracks application focus sessions as app Event Records. No portable
//! focus-tracking source exists, so this collector is lifecycle-complete
//! but emits nothing; it still registers, starts, stops, and describes the
//! app_events schema so a platform source can slot in without touching the
//! manager or storage.

use crate::collectors::Collector;
use crate::core::config::CollectorConfig;
use crate::core::error::VigilError;
use crate::core::storage::StorageEngine;
use std::sync::Arc;

pub const NAME: &str = "app_activity";

pub fn build(
    _cfg: &CollectorConfig,
    storage: Arc<StorageEngine>,
) -> Result<Box<dyn Collector>, VigilError> {
    Ok(Box::new(ApplicationActivityCollector::new(storage)))
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "timestamp": "float",
        "app_name": "str",
        "window_title": "str",
        "focus_duration": "int",
        "active": "bool"
    })
}

pub struct ApplicationActivityCollector {
    // Bound sink, unused until a platform focus source lands.
    #[allow(dead_code)]
    storage: Arc<StorageEngine>,
    running: bool,
}

impl ApplicationActivityCollector {
    pub fn new(storage: Arc<StorageEngine>) -> ApplicationActivityCollector {
        ApplicationActivityCollector {
            storage,
            running: false,
        }
    }
}

impl Collector for ApplicationActivityCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn start(&mut self) -> Result<(), VigilError> {
        if self.running {
            return Ok(());
        }
        self.running = true;
        log::warn!("app activity collector has no focus-tracking source on this platform; no events will be emitted");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), VigilError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        log::info!("app activity collector stopped");
        Ok(())
    }

    fn describe_schema(&self) -> serde_json::Value {
        schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::StorageEngine;
    use tempfile::tempdir;

    #[test]
    fn test_lifecycle_is_idempotent() {
        let tmp = tempdir().unwrap();
        let storage = Arc::new(StorageEngine::open(&tmp.path().join("data.db")).unwrap());
        let mut c = ApplicationActivityCollector::new(storage);

        assert!(c.stop().is_ok()); // never started
        assert!(c.start().is_ok());
        assert!(c.start().is_ok()); // already running
        assert!(c.stop().is_ok());
        assert!(c.stop().is_ok()); // already stopped
    }

    #[test]
    fn test_schema_lists_app_event_fields() {
        let s = schema();
        assert_eq!(s["app_name"], "str");
        assert_eq!(s["active"], "bool");
    }
}
