use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, Transaction, params};
use tracing::{debug, warn};

use crate::storage::Storage;

const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed key/value storage. Each key holds one whole snapshot.
pub struct SqliteStorage {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = match connect(&path) {
            Ok(conn) => conn,
            Err(err) if is_corruption_error(&err) => {
                warn!(path = %path.display(), "database is corrupt, starting from an empty one");
                backup_corrupt_db_files(&path)?;
                connect(&path)?
            }
            Err(err) => return Err(err),
        };

        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn run_with_recovery<T, F>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(&Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))?;
        match operation(&conn) {
            Ok(value) => Ok(value),
            Err(err) if is_corruption_error(&err) => {
                recover_connection(&mut conn, &self.path)?;
                operation(&conn)
            }
            Err(err) => Err(err),
        }
    }
}

impl Storage for SqliteStorage {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        debug!(key, bytes = value.len(), "writing snapshot");
        self.run_with_recovery(|conn| {
            conn.execute(
                "INSERT INTO kv_store(key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value],
            )
            .with_context(|| format!("failed to save snapshot '{key}'"))?;
            Ok(())
        })
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        self.run_with_recovery(|conn| {
            Ok(conn
                .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()
                .with_context(|| format!("failed to load snapshot '{key}'"))?)
        })
    }
}

fn create_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
    )?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

fn connect(path: &Path) -> Result<Connection> {
    let mut conn = create_connection(path)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn recover_connection(conn: &mut Connection, path: &Path) -> Result<()> {
    warn!(path = %path.display(), "database became corrupt, recreating it");
    let _ = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);");
    let old = std::mem::replace(conn, Connection::open_in_memory()?);
    drop(old);
    backup_corrupt_db_files(path)?;
    *conn = connect(path)?;
    Ok(())
}

fn backup_corrupt_db_files(db_file: &Path) -> Result<()> {
    let stamp = unix_timestamp();
    for file in [
        db_file.to_path_buf(),
        PathBuf::from(format!("{}-wal", db_file.display())),
        PathBuf::from(format!("{}-shm", db_file.display())),
    ] {
        if file.exists() {
            let backup = PathBuf::from(format!("{}.corrupt.{stamp}", file.display()));
            std::fs::rename(&file, &backup).with_context(|| {
                format!(
                    "failed to move corrupt database file from {} to {}",
                    file.display(),
                    backup.display()
                )
            })?;
        }
    }
    Ok(())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn is_corruption_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(sql_err) = cause.downcast_ref::<rusqlite::Error>() {
            return matches!(
                sql_err,
                rusqlite::Error::SqliteFailure(code, _)
                    if code.code == ErrorCode::DatabaseCorrupt
                        || code.code == ErrorCode::NotADatabase
            );
        }

        let msg = cause.to_string().to_lowercase();
        msg.contains("database disk image is malformed") || msg.contains("file is not a database")
    })
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    create_schema_version_table(conn)?;
    let mut version = get_schema_version(conn)?;

    while version < CURRENT_SCHEMA_VERSION {
        let target = version + 1;
        let tx = conn.transaction()?;
        match target {
            1 => migrate_to_v1(&tx)?,
            _ => unreachable!("unsupported schema version migration: {target}"),
        }
        set_schema_version(&tx, target)?;
        tx.commit()?;
        debug!(version = target, "applied schema migration");
        version = target;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i64> {
    Ok(conn
        .query_row(
            "SELECT version FROM schema_version WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0))
}

fn set_schema_version(tx: &Transaction<'_>, version: i64) -> Result<()> {
    tx.execute(
        "INSERT INTO schema_version(id, version) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET version = excluded.version",
        [version],
    )?;
    Ok(())
}

fn migrate_to_v1(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )?;
    Ok(())
}
