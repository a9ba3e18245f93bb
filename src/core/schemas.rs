//! Centralized schema definitions for the activity store.
//!
//! One database holds five append-only/lookup tables: three event tables
//! keyed by observation timestamp, the derived features table, and the
//! model artifact table. All statements are idempotent so initialization
//! is safe to run against an already-populated store.

pub const DEFAULT_DB_PATH: &str = "~/.vigil/data.db";

pub const FILE_EVENTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS file_events (
        id INTEGER PRIMARY KEY,
        timestamp REAL NOT NULL,
        operation TEXT NOT NULL,
        path TEXT NOT NULL,
        file_type TEXT NOT NULL,
        size INTEGER NOT NULL,
        app TEXT NOT NULL
    )
";
pub const FILE_EVENTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_file_events_ts ON file_events(timestamp)";

pub const APP_EVENTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS app_events (
        id INTEGER PRIMARY KEY,
        timestamp REAL NOT NULL,
        app_name TEXT NOT NULL,
        window_title TEXT NOT NULL,
        focus_duration INTEGER NOT NULL,
        active BOOLEAN NOT NULL
    )
";
pub const APP_EVENTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_app_events_ts ON app_events(timestamp)";

pub const SYSTEM_EVENTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS system_events (
        id INTEGER PRIMARY KEY,
        timestamp REAL NOT NULL,
        cpu_percent REAL NOT NULL,
        memory_percent REAL NOT NULL,
        active_window TEXT NOT NULL,
        state TEXT NOT NULL
    )
";
pub const SYSTEM_EVENTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_system_events_ts ON system_events(timestamp)";

pub const FEATURES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS features (
        id INTEGER PRIMARY KEY,
        timestamp REAL NOT NULL,
        feature_type TEXT NOT NULL,
        feature_data TEXT NOT NULL
    )
";
pub const FEATURES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_features_ts ON features(timestamp)";

pub const MODELS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS models (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        version TEXT NOT NULL,
        created_at REAL NOT NULL,
        model_type TEXT NOT NULL,
        serialized_model BLOB NOT NULL,
        performance_metrics TEXT
    )
";
pub const MODELS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_models_name ON models(name, created_at)";

/// Every statement needed to bring a fresh or existing store up to date.
pub const ALL_STATEMENTS: &[&str] = &[
    FILE_EVENTS_SCHEMA,
    FILE_EVENTS_INDEX,
    APP_EVENTS_SCHEMA,
    APP_EVENTS_INDEX,
    SYSTEM_EVENTS_SCHEMA,
    SYSTEM_EVENTS_INDEX,
    FEATURES_SCHEMA,
    FEATURES_INDEX,
    MODELS_SCHEMA,
    MODELS_INDEX,
];
