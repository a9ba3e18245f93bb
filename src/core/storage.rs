//! Durable append-and-query store for events, features, and model artifacts.
//!
//! The engine owns the persisted schema exclusively. Writes from any number
//! of collector threads funnel through one persistent connection behind a
//! write mutex (the underlying store is not safe for unsynchronized
//! concurrent writers); reads open fresh connections and proceed without the
//! lock, concurrent under WAL. Atomicity is per call: a batch commits as a
//! whole or not at all, and there is no cross-call transaction.

use crate::core::db;
use crate::core::error::VigilError;
use crate::core::event::{AppEvent, EventKind, EventRecord, FileEvent, FileOperation, SystemEvent};
use crate::core::schemas;
use crate::core::time;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A derived record produced by downstream processing and stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    /// Stamped at write time, unlike event timestamps.
    pub timestamp: f64,
    pub feature_type: String,
    pub payload: serde_json::Value,
}

/// A serialized model plus metadata. Multiple versions of one name coexist;
/// retention is an external concern.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub name: String,
    pub version: String,
    pub created_at: f64,
    pub model_type: String,
    pub serialized_blob: Vec<u8>,
    pub metrics: Option<serde_json::Value>,
}

pub struct StorageEngine {
    db_path: PathBuf,
    write_conn: Mutex<Connection>,
}

impl StorageEngine {
    /// Open (creating if needed) the backing store and bring the schema up
    /// to date. Safe against an already-initialized store; any failure here
    /// is fatal to the pipeline.
    pub fn open(db_path: &Path) -> Result<StorageEngine, VigilError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VigilError::StorageInitError(format!(
                    "cannot create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let conn = db::db_connect(db_path)
            .map_err(|e| VigilError::StorageInitError(e.to_string()))?;
        for statement in schemas::ALL_STATEMENTS {
            conn.execute(statement, [])
                .map_err(|e| VigilError::StorageInitError(e.to_string()))?;
        }
        log::info!("storage initialized: {}", db_path.display());
        Ok(StorageEngine {
            db_path: db_path.to_path_buf(),
            write_conn: Mutex::new(conn),
        })
    }

    /// Append a batch of records of one kind. The batch commits atomically:
    /// a record whose variant does not match `kind` fails the call before
    /// any row is written.
    pub fn store_events(
        &self,
        records: &[EventRecord],
        kind: EventKind,
    ) -> Result<(), VigilError> {
        for record in records {
            if record.kind() != kind {
                return Err(VigilError::WriteError(format!(
                    "record of kind {:?} in a {:?} batch",
                    record.kind(),
                    kind
                )));
            }
        }
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.write_conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| VigilError::WriteError(e.to_string()))?;
        for record in records {
            let result = match record {
                EventRecord::File(e) => tx.execute(
                    "INSERT INTO file_events (timestamp, operation, path, file_type, size, app)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        e.timestamp,
                        e.operation.as_str(),
                        e.path,
                        e.file_type,
                        e.size_bytes as i64,
                        e.originating_app
                    ],
                ),
                EventRecord::Application(e) => tx.execute(
                    "INSERT INTO app_events (timestamp, app_name, window_title, focus_duration, active)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        e.timestamp,
                        e.app_name,
                        e.window_title,
                        e.focus_duration_seconds as i64,
                        e.is_active
                    ],
                ),
                EventRecord::System(e) => tx.execute(
                    "INSERT INTO system_events (timestamp, cpu_percent, memory_percent, active_window, state)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        e.timestamp,
                        e.cpu_percent,
                        e.memory_percent,
                        e.active_window,
                        e.state
                    ],
                ),
            };
            result.map_err(|e| VigilError::WriteError(e.to_string()))?;
        }
        tx.commit()
            .map_err(|e| VigilError::WriteError(e.to_string()))?;
        Ok(())
    }

    /// Fetch events of one kind, ascending by stored timestamp. Bounds are
    /// inclusive where given and open where omitted; an inverted range
    /// yields an empty result.
    pub fn get_events(
        &self,
        kind: EventKind,
        since: Option<f64>,
        until: Option<f64>,
    ) -> Result<Vec<EventRecord>, VigilError> {
        let conn = db::db_connect(&self.db_path)?;
        match kind {
            EventKind::File => {
                let (sql, bounds) = range_query(
                    "file_events",
                    "timestamp, operation, path, file_type, size, app",
                    since,
                    until,
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(bounds), |row| {
                    let op: String = row.get(1)?;
                    let operation = FileOperation::from_str(&op).ok_or_else(|| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            format!("unknown file operation '{}'", op).into(),
                        )
                    })?;
                    Ok(EventRecord::File(FileEvent {
                        timestamp: row.get(0)?,
                        operation,
                        path: row.get(2)?,
                        file_type: row.get(3)?,
                        size_bytes: row.get::<_, i64>(4)? as u64,
                        originating_app: row.get(5)?,
                    }))
                })?;
                collect_rows(rows)
            }
            EventKind::Application => {
                let (sql, bounds) = range_query(
                    "app_events",
                    "timestamp, app_name, window_title, focus_duration, active",
                    since,
                    until,
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(bounds), |row| {
                    Ok(EventRecord::Application(AppEvent {
                        timestamp: row.get(0)?,
                        app_name: row.get(1)?,
                        window_title: row.get(2)?,
                        focus_duration_seconds: row.get::<_, i64>(3)? as u64,
                        is_active: row.get(4)?,
                    }))
                })?;
                collect_rows(rows)
            }
            EventKind::System => {
                let (sql, bounds) = range_query(
                    "system_events",
                    "timestamp, cpu_percent, memory_percent, active_window, state",
                    since,
                    until,
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(bounds), |row| {
                    Ok(EventRecord::System(SystemEvent {
                        timestamp: row.get(0)?,
                        cpu_percent: row.get(1)?,
                        memory_percent: row.get(2)?,
                        active_window: row.get(3)?,
                        state: row.get(4)?,
                    }))
                })?;
                collect_rows(rows)
            }
        }
    }

    /// Append one derived feature document, stamped with the write time.
    pub fn store_features(
        &self,
        payload: &serde_json::Value,
        feature_type: &str,
    ) -> Result<(), VigilError> {
        let serialized = serde_json::to_string(payload)?;
        let conn = self.write_conn.lock();
        conn.execute(
            "INSERT INTO features (timestamp, feature_type, feature_data) VALUES (?1, ?2, ?3)",
            params![time::now_epoch_secs(), feature_type, serialized],
        )
        .map_err(|e| VigilError::WriteError(e.to_string()))?;
        Ok(())
    }

    /// Fetch stored features, most recent first, optionally filtered by
    /// type, capped at `limit` rows.
    pub fn get_features(
        &self,
        feature_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FeatureRecord>, VigilError> {
        let conn = db::db_connect(&self.db_path)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<FeatureRecord> {
            let raw: String = row.get(2)?;
            let payload = serde_json::from_str(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(FeatureRecord {
                timestamp: row.get(0)?,
                feature_type: row.get(1)?,
                payload,
            })
        };
        match feature_type {
            Some(ft) => {
                let mut stmt = conn.prepare(
                    "SELECT timestamp, feature_type, feature_data FROM features
                     WHERE feature_type = ?1 ORDER BY timestamp DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![ft, limit as i64], map_row)?;
                collect_rows(rows)
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT timestamp, feature_type, feature_data FROM features
                     ORDER BY timestamp DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit as i64], map_row)?;
                collect_rows(rows)
            }
        }
    }

    /// Store one version of a named model. Existing versions are left alone.
    pub fn store_model(
        &self,
        name: &str,
        version: &str,
        model_type: &str,
        blob: &[u8],
        metrics: Option<&serde_json::Value>,
    ) -> Result<(), VigilError> {
        let metrics_json = match metrics {
            Some(m) => Some(serde_json::to_string(m)?),
            None => None,
        };
        let conn = self.write_conn.lock();
        conn.execute(
            "INSERT INTO models (name, version, created_at, model_type, serialized_model, performance_metrics)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                name,
                version,
                time::now_epoch_secs(),
                model_type,
                blob,
                metrics_json
            ],
        )
        .map_err(|e| VigilError::WriteError(e.to_string()))?;
        Ok(())
    }

    /// Look up a model by name. With `version` the exact row is returned
    /// regardless of recency; without it, the most recently created row.
    pub fn get_model(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Option<ModelArtifact>, VigilError> {
        let conn = db::db_connect(&self.db_path)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<ModelArtifact> {
            let metrics_raw: Option<String> = row.get(5)?;
            let metrics = match metrics_raw {
                Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?),
                None => None,
            };
            Ok(ModelArtifact {
                name: row.get(0)?,
                version: row.get(1)?,
                created_at: row.get(2)?,
                model_type: row.get(3)?,
                serialized_blob: row.get(4)?,
                metrics,
            })
        };
        let artifact = match version {
            Some(v) => conn
                .query_row(
                    "SELECT name, version, created_at, model_type, serialized_model, performance_metrics
                     FROM models WHERE name = ?1 AND version = ?2 LIMIT 1",
                    params![name, v],
                    map_row,
                )
                .optional()?,
            None => conn
                .query_row(
                    "SELECT name, version, created_at, model_type, serialized_model, performance_metrics
                     FROM models WHERE name = ?1 ORDER BY created_at DESC LIMIT 1",
                    params![name],
                    map_row,
                )
                .optional()?,
        };
        Ok(artifact)
    }
}

fn range_query(
    table: &str,
    columns: &str,
    since: Option<f64>,
    until: Option<f64>,
) -> (String, Vec<f64>) {
    let mut sql = format!("SELECT {} FROM {}", columns, table);
    let mut clauses: Vec<&str> = Vec::new();
    let mut bounds: Vec<f64> = Vec::new();
    if let Some(s) = since {
        clauses.push("timestamp >= ?");
        bounds.push(s);
    }
    if let Some(u) = until {
        clauses.push("timestamp <= ?");
        bounds.push(u);
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY timestamp ASC");
    (sql, bounds)
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, VigilError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
