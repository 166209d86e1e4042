//! Database layer for the clinic stock engine.

mod schema;
mod equipment;
mod requirements;
mod stock;
mod transactions;
mod bookings;

pub use schema::*;

pub(crate) use bookings::{find_booking, insert_booking, mark_booking_completed};
pub(crate) use equipment::equipment_exists;
pub(crate) use requirements::active_requirements;
pub(crate) use stock::{find_stock, insert_stock, update_stock_counters};
pub(crate) use transactions::append_transaction;

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use thiserror::Error;

use crate::config::StoreConfig;

/// How long a writer waits for the database lock unless configured otherwise.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

impl DbError {
    /// The write lock could not be acquired within the busy timeout.
    pub fn is_busy(&self) -> bool {
        match self {
            DbError::Sqlite(e) => matches!(
                e.sqlite_error_code(),
                Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }
}

/// Turn SQLite constraint failures into `DbError::Constraint`, keep everything else.
pub(crate) fn map_constraint(e: rusqlite::Error) -> DbError {
    if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        DbError::Constraint(e.to_string())
    } else {
        DbError::Sqlite(e)
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::configure(conn, DEFAULT_BUSY_TIMEOUT, true)
    }

    /// Open the database described by a store configuration.
    pub fn open_with_config(config: &StoreConfig) -> DbResult<Self> {
        let conn = Connection::open(&config.database_path)?;
        Self::configure(conn, config.busy_timeout(), config.wal)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn, DEFAULT_BUSY_TIMEOUT, false)
    }

    fn configure(conn: Connection, busy_timeout: Duration, wal: bool) -> DbResult<Self> {
        conn.busy_timeout(busy_timeout)?;
        if wal {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            tracing::debug!(journal_mode = %mode, "configured journal mode");
        }
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a write transaction.
    ///
    /// `BEGIN IMMEDIATE` takes the database write lock before the first read, so a
    /// read-check-update sequence inside it cannot interleave with any other writer,
    /// in this process or another one sharing the file. Waiting for the lock is bounded
    /// by the busy timeout.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}
