use std::path::Path;

use anyhow::Result;
use include_dir::{include_dir, Dir};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use rusqlite_migration::Migrations;

use crate::types::RecordId;

use super::KeyValueBlobStore;

static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

/// Blob store backed by an `entry_meta` table in SQLite.
///
/// `update` runs inside an `IMMEDIATE` transaction, so concurrent
/// read-modify-write cycles on one record serialize instead of racing.
#[derive(Clone)]
pub struct SqliteBlobStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteBlobStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.pragma_update(None, "journal_mode", "WAL"));
        let pool = Pool::builder().build(manager)?;
        Self::from_pool(pool)
    }

    /// In-memory databases are per connection, so the pool holds exactly one.
    pub fn open_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::from_pool(pool)
    }

    fn from_pool(pool: Pool<SqliteConnectionManager>) -> Result<Self> {
        let store = Self { pool };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let migrations = Migrations::from_directory(&MIGRATIONS_DIR)?;
        let mut conn = self.pool.get()?;
        migrations.to_latest(&mut conn)?;
        Ok(())
    }
}

const SELECT_BLOB: &str = "SELECT meta_value FROM entry_meta WHERE record_id = ? AND meta_key = ?";
const UPSERT_BLOB: &str =
    "INSERT OR REPLACE INTO entry_meta (record_id, meta_key, meta_value) VALUES (?, ?, ?)";

fn read_blob(conn: &rusqlite::Connection, record_id: i64, key: &str) -> Result<Option<Vec<u8>>> {
    log::debug!("SQL QUERY: {}", SELECT_BLOB);
    let blob = conn
        .query_row(
            SELECT_BLOB,
            params![record_id, key],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()?;
    Ok(blob)
}

fn write_blob(conn: &rusqlite::Connection, record_id: i64, key: &str, blob: &[u8]) -> Result<()> {
    log::debug!("SQL EXECUTE: {}", UPSERT_BLOB);
    let affected = conn.execute(UPSERT_BLOB, params![record_id, key, blob])?;
    log::debug!("SQL EXECUTE RESULT: {} rows affected", affected);
    Ok(())
}

impl KeyValueBlobStore for SqliteBlobStore {
    fn get(&self, record_id: RecordId, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.pool.get()?;
        read_blob(&conn, i64::try_from(record_id)?, key)
    }

    fn set(&self, record_id: RecordId, key: &str, blob: &[u8]) -> Result<()> {
        let conn = self.pool.get()?;
        write_blob(&conn, i64::try_from(record_id)?, key, blob)
    }

    fn delete(&self, record_id: RecordId, key: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        log::debug!("SQL EXECUTE: DELETE FROM entry_meta WHERE record_id = ? AND meta_key = ?");
        let affected = conn.execute(
            "DELETE FROM entry_meta WHERE record_id = ? AND meta_key = ?",
            params![i64::try_from(record_id)?, key],
        )?;
        log::debug!("SQL EXECUTE RESULT: {} rows affected", affected);
        Ok(affected > 0)
    }

    fn update(
        &self,
        record_id: RecordId,
        key: &str,
        f: &mut dyn FnMut(Option<Vec<u8>>) -> Result<Option<Vec<u8>>>,
    ) -> Result<()> {
        let record_id = i64::try_from(record_id)?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = read_blob(&tx, record_id, key)?;
        if let Some(blob) = f(current)? {
            write_blob(&tx, record_id, key, &blob)?;
        }
        tx.commit()?;
        Ok(())
    }
}
