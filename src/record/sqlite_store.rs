//! SQLite implementation of RecordStore trait
//!
//! All tables share one `records` relation keyed by `(table_name, record_key)`;
//! each record is stored as a JSON document.

use crate::error::StoreError;
use crate::record::{apply_fields, check_failed, Precondition, Record, RecordKey, RecordStore};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS records (
    table_name TEXT NOT NULL,
    record_key TEXT NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (table_name, record_key)
)";

/// SQLite implementation of RecordStore
pub struct SQLiteRecordStore {
    conn: Mutex<Connection>,
}

impl SQLiteRecordStore {
    /// Open (or create) a database file, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P, wal_mode: bool) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Backend(format!("cannot create {}: {}", parent.display(), e)))?;
            }
        }
        let conn = Connection::open(path)?;
        if wal_mode {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!("SQLite journal mode: {}", mode);
        }
        info!("Opened SQLite record store at {}", path.display());
        Self::init(conn)
    }

    /// Private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Backend(format!("sqlite connection lock poisoned: {}", e)))
    }
}

fn read_record(conn: &Connection, table: &str, key: &str) -> Result<Option<Record>, StoreError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM records WHERE table_name = ?1 AND record_key = ?2",
            params![table, key],
            |row| row.get(0),
        )
        .optional()?;

    match body {
        Some(body) => Ok(Some(serde_json::from_str(&body)?)),
        None => Ok(None),
    }
}

impl RecordStore for SQLiteRecordStore {
    fn get(&self, table: &str, key: RecordKey<'_>) -> Result<Option<Record>, StoreError> {
        let conn = self.lock()?;
        read_record(&conn, table, key.value)
    }

    fn put(&self, table: &str, key: RecordKey<'_>, item: &Record) -> Result<(), StoreError> {
        let body = serde_json::to_string(item)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO records (table_name, record_key, body) VALUES (?1, ?2, ?3)
             ON CONFLICT (table_name, record_key) DO UPDATE SET body = excluded.body",
            params![table, key.value, body],
        )?;
        debug!("SQLite: put {}={} into {}", key.field, key.value, table);
        Ok(())
    }

    fn update(
        &self,
        table: &str,
        key: RecordKey<'_>,
        fields: &Record,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut record = match precondition {
            Precondition::KeyExists => {
                read_record(&tx, table, key.value)?.ok_or_else(|| check_failed(table, key))?
            }
        };
        apply_fields(&mut record, fields);

        tx.execute(
            "UPDATE records SET body = ?3 WHERE table_name = ?1 AND record_key = ?2",
            params![table, key.value, serde_json::to_string(&record)?],
        )?;
        tx.commit()?;
        debug!("SQLite: updated {}={} in {}", key.field, key.value, table);
        Ok(())
    }

    fn delete(
        &self,
        table: &str,
        key: RecordKey<'_>,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let affected = conn.execute(
            "DELETE FROM records WHERE table_name = ?1 AND record_key = ?2",
            params![table, key.value],
        )?;

        match precondition {
            Precondition::KeyExists if affected == 0 => Err(check_failed(table, key)),
            Precondition::KeyExists => {
                debug!("SQLite: deleted {}={} from {}", key.field, key.value, table);
                Ok(())
            }
        }
    }

    fn scan(&self, table: &str) -> Result<Vec<Record>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT body FROM records WHERE table_name = ?1 ORDER BY rowid")?;
        let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for body in rows {
            records.push(serde_json::from_str(&body?)?);
        }
        Ok(records)
    }
}
