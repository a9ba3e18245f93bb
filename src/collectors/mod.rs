//! Collector capability and its static registry.
//!
//! A collector observes one external activity source and pushes normalized
//! Event Records into the storage sink it was constructed with. Resolution
//! from a configured name to an implementation goes through the fixed
//! `REGISTRY` table; there is no reflective lookup.

pub mod app_activity;
pub mod file_activity;
pub mod manager;
pub mod system_sample;

use crate::core::config::CollectorConfig;
use crate::core::error::VigilError;
use crate::core::storage::StorageEngine;
use std::sync::Arc;

/// A producer over one activity source.
///
/// State machine: Stopped → Running → Stopped. `start` on a Running
/// collector and `stop` on a Stopped one are no-op successes. The storage
/// sink is supplied at construction, so an unbound collector cannot exist.
pub trait Collector {
    fn name(&self) -> &'static str;

    /// Begin observing. Partial startup must unwind before reporting failure.
    fn start(&mut self) -> Result<(), VigilError>;

    /// Stop observing, draining outstanding delivery work before returning.
    fn stop(&mut self) -> Result<(), VigilError>;

    /// Field-name → type-name mapping of the records this collector emits.
    fn describe_schema(&self) -> serde_json::Value;
}

/// One registry row: configured name plus constructor and schema functions.
pub struct CollectorSpec {
    pub name: &'static str,
    pub build: fn(&CollectorConfig, Arc<StorageEngine>) -> Result<Box<dyn Collector>, VigilError>,
    pub schema: fn() -> serde_json::Value,
}

/// All collectors that can be configured. Adding a collector: append one row.
pub const REGISTRY: &[CollectorSpec] = &[
    CollectorSpec {
        name: file_activity::NAME,
        build: file_activity::build,
        schema: file_activity::schema,
    },
    CollectorSpec {
        name: system_sample::NAME,
        build: system_sample::build,
        schema: system_sample::schema,
    },
    CollectorSpec {
        name: app_activity::NAME,
        build: app_activity::build,
        schema: app_activity::schema,
    },
];

pub fn resolve(name: &str) -> Option<&'static CollectorSpec> {
    REGISTRY.iter().find(|spec| spec.name == name)
}
