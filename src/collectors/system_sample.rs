//! System sample collector.
//!
//! A background thread samples global CPU and memory utilization on a fixed
//! interval and records one system Event Record per tick.

use crate::collectors::Collector;
use crate::core::config::CollectorConfig;
use crate::core::error::VigilError;
use crate::core::event::{EventKind, EventRecord, SystemEvent};
use crate::core::storage::StorageEngine;
use crate::core::time;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

pub const NAME: &str = "system_sample";

/// CPU utilization at or above this marks the sample "active".
const ACTIVE_CPU_THRESHOLD: f64 = 10.0;

/// Slice the interval sleep so `stop` drains within a fraction of a second
/// rather than a full sampling period.
const SLEEP_SLICE: Duration = Duration::from_millis(200);

pub fn build(
    cfg: &CollectorConfig,
    storage: Arc<StorageEngine>,
) -> Result<Box<dyn Collector>, VigilError> {
    Ok(Box::new(SystemSampleCollector::new(cfg, storage)))
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "timestamp": "float",
        "cpu_percent": "float",
        "memory_percent": "float",
        "active_window": "str",
        "state": "str"
    })
}

pub struct SystemSampleCollector {
    interval: Duration,
    storage: Arc<StorageEngine>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SystemSampleCollector {
    pub fn new(cfg: &CollectorConfig, storage: Arc<StorageEngine>) -> SystemSampleCollector {
        SystemSampleCollector {
            interval: Duration::from_secs(cfg.sample_interval.max(1)),
            storage,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl Collector for SystemSampleCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn start(&mut self) -> Result<(), VigilError> {
        if self.handle.is_some() {
            log::warn!("system sample collector already running");
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let storage = Arc::clone(&self.storage);
        let interval = self.interval;
        self.handle = Some(std::thread::spawn(move || {
            sample_loop(storage, running, interval);
        }));

        log::info!(
            "system sample collector started (interval: {}s)",
            self.interval.as_secs()
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), VigilError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("system sampling thread panicked during shutdown");
            }
            log::info!("system sample collector stopped");
        }
        Ok(())
    }

    fn describe_schema(&self) -> serde_json::Value {
        schema()
    }
}

fn sample_loop(storage: Arc<StorageEngine>, running: Arc<AtomicBool>, interval: Duration) {
    let mut sys = sysinfo::System::new_all();
    // Prime the CPU counters; usage is a delta between two refreshes.
    sys.refresh_cpu();

    while running.load(Ordering::SeqCst) {
        sliced_sleep(&running, interval);
        if !running.load(Ordering::SeqCst) {
            break;
        }

        sys.refresh_cpu();
        sys.refresh_memory();
        let record = sample(&sys);
        if let Err(e) = storage.store_events(&[record], EventKind::System) {
            log::error!("failed to store system sample: {}", e);
        }
    }
}

fn sliced_sleep(running: &AtomicBool, interval: Duration) {
    let mut remaining = interval;
    while running.load(Ordering::SeqCst) && !remaining.is_zero() {
        let slice = remaining.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}

fn sample(sys: &sysinfo::System) -> EventRecord {
    let cpus = sys.cpus();
    let cpu_percent = if cpus.is_empty() {
        0.0
    } else {
        cpus.iter().map(|cpu| cpu.cpu_usage() as f64).sum::<f64>() / cpus.len() as f64
    };

    let total_memory = sys.total_memory() as f64;
    let memory_percent = if total_memory > 0.0 {
        sys.used_memory() as f64 / total_memory * 100.0
    } else {
        0.0
    };

    let state = if cpu_percent >= ACTIVE_CPU_THRESHOLD {
        "active"
    } else {
        "idle"
    };

    EventRecord::System(SystemEvent {
        timestamp: time::now_epoch_secs(),
        cpu_percent,
        memory_percent,
        active_window: String::new(),
        state: state.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::StorageEngine;
    use tempfile::tempdir;

    fn collector(interval: u64) -> (tempfile::TempDir, SystemSampleCollector, Arc<StorageEngine>) {
        let tmp = tempdir().unwrap();
        let storage = Arc::new(StorageEngine::open(&tmp.path().join("data.db")).unwrap());
        let cfg = CollectorConfig {
            sample_interval: interval,
            ..CollectorConfig::default()
        };
        let c = SystemSampleCollector::new(&cfg, Arc::clone(&storage));
        (tmp, c, storage)
    }

    #[test]
    fn test_sample_fields_are_in_range() {
        let sys = sysinfo::System::new_all();
        match sample(&sys) {
            EventRecord::System(e) => {
                assert!(e.timestamp > 0.0);
                assert!(e.cpu_percent >= 0.0);
                assert!((0.0..=100.0).contains(&e.memory_percent));
                assert!(e.state == "active" || e.state == "idle");
                assert_eq!(e.active_window, "");
            }
            other => panic!("expected system record, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_without_start_is_a_no_op_success() {
        let (_tmp, mut c, _storage) = collector(60);
        assert!(c.stop().is_ok());
        assert!(c.stop().is_ok());
    }

    #[test]
    fn test_stop_joins_promptly_despite_long_interval() {
        let (_tmp, mut c, _storage) = collector(3600);
        c.start().unwrap();
        let begun = std::time::Instant::now();
        c.stop().unwrap();
        assert!(begun.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_repeated_start_is_a_no_op_success() {
        let (_tmp, mut c, _storage) = collector(3600);
        c.start().unwrap();
        c.start().unwrap();
        c.stop().unwrap();
    }
}
