//! Collection manager: registry resolution and lifecycle aggregation.
//!
//! The manager owns every instantiated collector and drives start/stop as a
//! best-effort sweep: one collector's failure is logged and never stops the
//! rest, and a partial start is an accepted terminal state, not rolled back.

use crate::collectors::{self, Collector};
use crate::core::config::DataCollectionConfig;
use crate::core::error::VigilError;
use crate::core::storage::StorageEngine;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
pub struct CollectionManager {
    collectors: BTreeMap<String, Box<dyn Collector>>,
}

impl CollectionManager {
    pub fn new() -> CollectionManager {
        CollectionManager::default()
    }

    /// Resolve and construct every enabled configured collector. Unknown
    /// names and constructor failures are logged and skipped; they never
    /// abort the remaining collectors. Returns true iff at least one
    /// collector was instantiated.
    pub fn initialize(
        &mut self,
        config: &DataCollectionConfig,
        storage: &Arc<StorageEngine>,
    ) -> bool {
        log::info!("initializing collectors");
        for (name, sub_config) in &config.collectors {
            if !sub_config.enabled {
                log::info!("collector {} disabled in config", name);
                continue;
            }
            let spec = match collectors::resolve(name) {
                Some(spec) => spec,
                None => {
                    log::error!("{}", VigilError::ResolutionError(name.clone()));
                    continue;
                }
            };
            match (spec.build)(sub_config, Arc::clone(storage)) {
                Ok(collector) => {
                    log::info!("initialized collector: {}", name);
                    self.collectors.insert(name.clone(), collector);
                }
                Err(e) => log::error!("error initializing collector {}: {}", name, e),
            }
        }
        !self.collectors.is_empty()
    }

    /// Register a collector directly, bypassing the registry.
    pub fn insert(&mut self, name: impl Into<String>, collector: Box<dyn Collector>) {
        self.collectors.insert(name.into(), collector);
    }

    /// Start every managed collector. Returns the AND of individual results.
    pub fn start_all(&mut self) -> bool {
        log::info!("starting collectors");
        let mut success = true;
        for (name, collector) in self.collectors.iter_mut() {
            match collector.start() {
                Ok(()) => log::info!("started collector: {}", name),
                Err(e) => {
                    log::error!("failed to start collector {}: {}", name, e);
                    success = false;
                }
            }
        }
        success
    }

    /// Stop every managed collector. Returns the AND of individual results.
    pub fn stop_all(&mut self) -> bool {
        log::info!("stopping collectors");
        let mut success = true;
        for (name, collector) in self.collectors.iter_mut() {
            match collector.stop() {
                Ok(()) => log::info!("stopped collector: {}", name),
                Err(e) => {
                    log::error!("failed to stop collector {}: {}", name, e);
                    success = false;
                }
            }
        }
        success
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.collectors.keys().map(|k| k.as_str()).collect()
    }
}
