//! Normalized Event Records.
//!
//! One Event Record is a single observation of file, application, or system
//! activity. Records are immutable once constructed and always carry the
//! timestamp of the observation, never of persistence.

use serde::{Deserialize, Serialize};

/// Discriminates the three event tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    File,
    Application,
    System,
}

impl EventKind {
    pub fn table(&self) -> &'static str {
        match self {
            EventKind::File => "file_events",
            EventKind::Application => "app_events",
            EventKind::System => "system_events",
        }
    }

    /// Resolve a kind from its external name (CLI and config surface).
    pub fn from_name(name: &str) -> Option<EventKind> {
        match name {
            "file" | "file_events" => Some(EventKind::File),
            "application" | "app_events" => Some(EventKind::Application),
            "system" | "system_events" => Some(EventKind::System),
            _ => None,
        }
    }
}

/// Operation recorded for a file event. A filesystem move never appears
/// here: it is split at observation time into a delete and a create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    Create,
    Modify,
    Delete,
}

impl FileOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileOperation::Create => "create",
            FileOperation::Modify => "modify",
            FileOperation::Delete => "delete",
        }
    }

    pub fn from_str(s: &str) -> Option<FileOperation> {
        match s {
            "create" => Some(FileOperation::Create),
            "modify" => Some(FileOperation::Modify),
            "delete" => Some(FileOperation::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    /// Observation time, seconds since epoch.
    pub timestamp: f64,
    pub operation: FileOperation,
    /// Absolute path of the affected file.
    pub path: String,
    /// Extension without the leading dot; empty if none.
    pub file_type: String,
    /// Size at notification time; 0 for deletes.
    pub size_bytes: u64,
    /// Application that caused the event; empty when unknown.
    pub originating_app: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppEvent {
    pub timestamp: f64,
    pub app_name: String,
    pub window_title: String,
    pub focus_duration_seconds: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub timestamp: f64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    /// Focused window title at sample time; empty when unavailable.
    pub active_window: String,
    pub state: String,
}

/// Tagged union over the three observation sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_kind", rename_all = "snake_case")]
pub enum EventRecord {
    File(FileEvent),
    Application(AppEvent),
    System(SystemEvent),
}

impl EventRecord {
    pub fn kind(&self) -> EventKind {
        match self {
            EventRecord::File(_) => EventKind::File,
            EventRecord::Application(_) => EventKind::Application,
            EventRecord::System(_) => EventKind::System,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            EventRecord::File(e) => e.timestamp,
            EventRecord::Application(e) => e.timestamp,
            EventRecord::System(e) => e.timestamp,
        }
    }
}
