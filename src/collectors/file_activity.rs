//! File activity collector.
//!
//! Subscribes recursively to filesystem change notifications for each
//! configured directory and normalizes them into file Event Records. Each
//! watched path gets its own native watch handle; delivery runs on the
//! backend's own thread, so everything reachable from the notification
//! handler is shared through an `Arc`.

use crate::collectors::Collector;
use crate::core::config::{CollectorConfig, WatchOp, expand_tilde};
use crate::core::error::VigilError;
use crate::core::event::{EventKind, EventRecord, FileEvent, FileOperation};
use crate::core::storage::StorageEngine;
use crate::core::time;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind as NotifyKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const NAME: &str = "file_activity";

pub fn build(
    cfg: &CollectorConfig,
    storage: Arc<StorageEngine>,
) -> Result<Box<dyn Collector>, VigilError> {
    Ok(Box::new(FileActivityCollector::new(cfg, storage)))
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "timestamp": "float",
        "operation": "str",
        "path": "str",
        "file_type": "str",
        "size": "int",
        "app": "str"
    })
}

/// One (operation, path) candidate derived from a notification, tagged with
/// the configured operation gate it must pass. A move notification yields
/// two candidates, both gated on `Move`.
#[derive(Debug, Clone, PartialEq)]
struct FileChange {
    gate: WatchOp,
    operation: FileOperation,
    path: PathBuf,
}

/// Shared with every watch handle's delivery thread.
struct WatchContext {
    excluded: Vec<PathBuf>,
    monitored: Vec<WatchOp>,
    storage: Arc<StorageEngine>,
}

pub struct FileActivityCollector {
    watched: Vec<PathBuf>,
    context: Arc<WatchContext>,
    watchers: Vec<RecommendedWatcher>,
    running: bool,
}

impl FileActivityCollector {
    pub fn new(cfg: &CollectorConfig, storage: Arc<StorageEngine>) -> FileActivityCollector {
        let watched = cfg.paths.iter().map(|p| expand_tilde(p)).collect();
        let excluded = cfg.exclude_paths.iter().map(|p| expand_tilde(p)).collect();
        FileActivityCollector {
            watched,
            context: Arc::new(WatchContext {
                excluded,
                monitored: cfg.events.clone(),
                storage,
            }),
            watchers: Vec::new(),
            running: false,
        }
    }
}

impl Collector for FileActivityCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn start(&mut self) -> Result<(), VigilError> {
        if self.running {
            log::warn!("file activity collector already running");
            return Ok(());
        }

        let mut started: Vec<RecommendedWatcher> = Vec::new();
        for path in &self.watched {
            if !path.exists() {
                log::warn!("watched path does not exist, creating: {}", path.display());
                std::fs::create_dir_all(path)?;
            }

            let context = Arc::clone(&self.context);
            let mut watcher = RecommendedWatcher::new(
                move |delivery: Result<Event, notify::Error>| match delivery {
                    Ok(event) => handle_event(&context, &event),
                    Err(e) => log::warn!("watch delivery error: {}", e),
                },
                notify::Config::default(),
            )?;
            // An error here returns early and drops `started`, which joins
            // every already-running handle before the failure is reported.
            watcher.watch(path, RecursiveMode::Recursive)?;
            log::info!("watching directory: {}", path.display());
            started.push(watcher);
        }

        self.watchers = started;
        self.running = true;
        log::info!("file activity collector started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), VigilError> {
        if !self.running {
            return Ok(());
        }
        // Dropping a handle joins its backend delivery thread; in-flight
        // notifications complete rather than being aborted.
        self.watchers.clear();
        self.running = false;
        log::info!("file activity collector stopped");
        Ok(())
    }

    fn describe_schema(&self) -> serde_json::Value {
        schema()
    }
}

fn handle_event(context: &WatchContext, event: &Event) {
    let changes = admitted(
        map_notify_event(event),
        &context.monitored,
        &context.excluded,
    );
    for change in changes {
        match build_record(change.operation, &change.path) {
            Ok(Some(record)) => {
                if let Err(e) = context.storage.store_events(&[record], EventKind::File) {
                    log::error!(
                        "failed to store file event for {}: {}",
                        change.path.display(),
                        e
                    );
                }
            }
            Ok(None) => {} // directory-level notification
            Err(e) => log::warn!("dropping file event for {}: {}", change.path.display(), e),
        }
    }
}

/// Translate a raw notification into zero or more change candidates.
///
/// Directory creates/removes are discarded here; a move becomes an
/// independent delete of the source and create of the destination.
fn map_notify_event(event: &Event) -> Vec<FileChange> {
    match &event.kind {
        NotifyKind::Create(CreateKind::Folder) => Vec::new(),
        NotifyKind::Create(_) => changes_for(event, WatchOp::Create, FileOperation::Create),
        NotifyKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::Both => {
                let mut changes = Vec::new();
                if let Some(from) = event.paths.first() {
                    changes.push(FileChange {
                        gate: WatchOp::Move,
                        operation: FileOperation::Delete,
                        path: from.clone(),
                    });
                }
                if let Some(to) = event.paths.get(1) {
                    changes.push(FileChange {
                        gate: WatchOp::Move,
                        operation: FileOperation::Create,
                        path: to.clone(),
                    });
                }
                changes
            }
            RenameMode::From => changes_for(event, WatchOp::Move, FileOperation::Delete),
            RenameMode::To => changes_for(event, WatchOp::Move, FileOperation::Create),
            // An unpaired rename with no direction carries no usable path role.
            RenameMode::Any | RenameMode::Other => Vec::new(),
        },
        NotifyKind::Modify(_) => changes_for(event, WatchOp::Modify, FileOperation::Modify),
        NotifyKind::Remove(RemoveKind::Folder) => Vec::new(),
        NotifyKind::Remove(_) => changes_for(event, WatchOp::Delete, FileOperation::Delete),
        _ => Vec::new(),
    }
}

fn changes_for(event: &Event, gate: WatchOp, operation: FileOperation) -> Vec<FileChange> {
    event
        .paths
        .iter()
        .map(|path| FileChange {
            gate,
            operation,
            path: path.clone(),
        })
        .collect()
}

/// Apply the configured operation gate and the exclusion list. Each change
/// from a split move is filtered independently.
fn admitted(
    changes: Vec<FileChange>,
    monitored: &[WatchOp],
    excluded: &[PathBuf],
) -> Vec<FileChange> {
    changes
        .into_iter()
        .filter(|change| monitored.contains(&change.gate))
        .filter(|change| !is_excluded(excluded, &change.path))
        .collect()
}

/// Path-segment-aware exclusion: `/a/b` excludes `/a/b/c` but not `/a/bc`.
fn is_excluded(excluded: &[PathBuf], candidate: &Path) -> bool {
    excluded.iter().any(|prefix| candidate.starts_with(prefix))
}

/// Construct the Event Record, stat'ing the file for create/modify sizes.
/// Returns `None` for directory-level notifications that slipped past the
/// kind filter; a delete never touches the (already gone) path.
fn build_record(
    operation: FileOperation,
    path: &Path,
) -> Result<Option<EventRecord>, VigilError> {
    let size_bytes = match operation {
        FileOperation::Delete => 0,
        _ => match std::fs::metadata(path) {
            Ok(meta) => {
                if meta.is_dir() {
                    return Ok(None);
                }
                meta.len()
            }
            // Vanished between notification and stat; record it empty.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(VigilError::ObservationError(format!(
                    "stat {}: {}",
                    path.display(),
                    e
                )));
            }
        },
    };

    let path_str = path.to_str().ok_or_else(|| {
        VigilError::ObservationError(format!("non-UTF-8 path: {}", path.display()))
    })?;
    let file_type = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Some(EventRecord::File(FileEvent {
        timestamp: time::now_epoch_secs(),
        operation,
        path: path_str.to_string(),
        file_type,
        size_bytes,
        originating_app: String::new(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rename_both(from: &str, to: &str) -> Event {
        let mut event = Event::new(NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)));
        event.paths.push(PathBuf::from(from));
        event.paths.push(PathBuf::from(to));
        event
    }

    #[test]
    fn test_exclusion_is_segment_aware() {
        let excluded = vec![PathBuf::from("/home/u/Documents")];
        assert!(is_excluded(&excluded, Path::new("/home/u/Documents/a.txt")));
        assert!(is_excluded(&excluded, Path::new("/home/u/Documents/sub/b.txt")));
        // A sibling directory sharing the prefix string is not excluded.
        assert!(!is_excluded(&excluded, Path::new("/home/u/Documents2/a.txt")));
    }

    #[test]
    fn test_move_splits_into_delete_then_create() {
        let changes = map_notify_event(&rename_both("/w/old.txt", "/w/new.txt"));
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].operation, FileOperation::Delete);
        assert_eq!(changes[0].path, PathBuf::from("/w/old.txt"));
        assert_eq!(changes[0].gate, WatchOp::Move);
        assert_eq!(changes[1].operation, FileOperation::Create);
        assert_eq!(changes[1].path, PathBuf::from("/w/new.txt"));
    }

    #[test]
    fn test_move_halves_filter_independently() {
        let changes = map_notify_event(&rename_both("/w/ignore/old.txt", "/w/new.txt"));
        let excluded = vec![PathBuf::from("/w/ignore")];
        let kept = admitted(changes, &[WatchOp::Move], &excluded);
        // Excluded source drops the delete; the create into watched space stays.
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].operation, FileOperation::Create);
        assert_eq!(kept[0].path, PathBuf::from("/w/new.txt"));
    }

    #[test]
    fn test_unmonitored_operations_are_gated_out() {
        let mut event = Event::new(NotifyKind::Modify(ModifyKind::Data(
            notify::event::DataChange::Content,
        )));
        event.paths.push(PathBuf::from("/w/a.txt"));
        let kept = admitted(
            map_notify_event(&event),
            &[WatchOp::Create, WatchOp::Delete],
            &[],
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn test_directory_notifications_are_discarded() {
        let mut event = Event::new(NotifyKind::Create(CreateKind::Folder));
        event.paths.push(PathBuf::from("/w/newdir"));
        assert!(map_notify_event(&event).is_empty());

        let mut event = Event::new(NotifyKind::Remove(RemoveKind::Folder));
        event.paths.push(PathBuf::from("/w/olddir"));
        assert!(map_notify_event(&event).is_empty());
    }

    #[test]
    fn test_build_record_stats_size_and_extension() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("report.txt");
        std::fs::write(&path, b"0123456789").unwrap();

        let record = build_record(FileOperation::Create, &path).unwrap().unwrap();
        match record {
            EventRecord::File(e) => {
                assert_eq!(e.operation, FileOperation::Create);
                assert_eq!(e.size_bytes, 10);
                assert_eq!(e.file_type, "txt");
                assert_eq!(e.originating_app, "");
                assert!(e.timestamp > 0.0);
            }
            other => panic!("expected file record, got {:?}", other),
        }
    }

    #[test]
    fn test_build_record_delete_reports_zero_without_stat() {
        let record = build_record(FileOperation::Delete, Path::new("/nowhere/gone.log"))
            .unwrap()
            .unwrap();
        match record {
            EventRecord::File(e) => {
                assert_eq!(e.size_bytes, 0);
                assert_eq!(e.file_type, "log");
            }
            other => panic!("expected file record, got {:?}", other),
        }
    }

    #[test]
    fn test_build_record_skips_directories() {
        let tmp = tempdir().unwrap();
        assert_eq!(build_record(FileOperation::Modify, tmp.path()).unwrap(), None);
    }

    #[test]
    fn test_build_record_no_extension_yields_empty_type() {
        let record = build_record(FileOperation::Delete, Path::new("/w/Makefile"))
            .unwrap()
            .unwrap();
        match record {
            EventRecord::File(e) => assert_eq!(e.file_type, ""),
            other => panic!("expected file record, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_without_start_is_a_no_op_success() {
        let tmp = tempdir().unwrap();
        let storage =
            Arc::new(crate::core::storage::StorageEngine::open(&tmp.path().join("data.db")).unwrap());
        let mut collector = FileActivityCollector::new(&CollectorConfig::default(), storage);
        assert!(collector.stop().is_ok());
    }
}
