use crate::core::error::VigilError;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Open a connection with the pragmas every Vigil connection carries:
/// WAL journal mode (concurrent readers alongside the serialized writer),
/// a busy timeout for cross-process contention, and enforced foreign keys.
pub fn db_connect(db_path: &Path) -> Result<Connection, VigilError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(5))
        .map_err(VigilError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(VigilError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(VigilError::RusqliteError)?;
    Ok(conn)
}
