use std::path::{Path, PathBuf};

use rusqlite::Connection;

use super::{PredictionRecord, ReferenceRow, RowStore, StoreError};

/// Read queries over reference rows and the prediction log.
pub mod read;
/// SQLite schema management for the row store.
pub mod schema;
/// Insert helpers for reference rows and prediction records.
pub mod write;

mod util;

/// SQLite-backed row store holding `crops_dataset` and `predictions`.
pub struct SqliteRowStore {
    connection: Connection,
    path: PathBuf,
}

impl SqliteRowStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        util::create_parent_if_needed(path)?;
        let connection = Connection::open(path)?;
        let store = Self {
            connection,
            path: path.to_path_buf(),
        };
        store.apply_pragmas()?;
        schema::apply_schema(&store.connection)?;
        Ok(store)
    }

    /// Open a private in-memory database with the schema applied.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory()?;
        schema::apply_schema(&connection)?;
        Ok(Self {
            connection,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Return the database file backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn apply_pragmas(&self) -> Result<(), StoreError> {
        self.connection
            .execute_batch(
                "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout=5000;
             PRAGMA temp_store=MEMORY;",
            )
            .map_err(util::map_sql_error)
    }
}

impl RowStore for SqliteRowStore {
    fn reference_rows(&self, limit: usize) -> Result<Vec<ReferenceRow>, StoreError> {
        self.list_reference_rows(limit)
    }

    fn append_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        self.insert_prediction(record)
    }
}
