//! Equipment stock engines.
//!
//! Every engine call runs as one write transaction: the whole multi-item
//! operation commits together or leaves no trace, stock rows and transaction log
//! alike. The `*_within` functions take an open connection so collaborators can
//! fold a stock operation into a larger transaction of their own.

mod bookings;
mod deduction;
mod reservation;
mod restock;

pub use bookings::*;
pub use deduction::*;
pub use reservation::*;
pub use restock::*;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{self, DbError};
use crate::models::{CounterError, InventoryStock, RequiredEquipment};

/// Stock engine errors.
#[derive(Error, Debug)]
pub enum StockError {
    #[error("Stock not configured for equipment {equipment_id} at health center {health_center_id}")]
    StockNotConfigured {
        health_center_id: String,
        equipment_id: String,
    },

    #[error("Not enough {equipment_name} at health center {health_center_id}: needed {needed}, available {available}")]
    InsufficientStock {
        health_center_id: String,
        equipment_id: String,
        equipment_name: String,
        needed: i64,
        available: i64,
    },

    #[error("Reserved quantity too low for equipment {equipment_id} at health center {health_center_id}: needed {needed}, reserved {reserved}")]
    ReservedTooLow {
        health_center_id: String,
        equipment_id: String,
        needed: i64,
        reserved: i64,
    },

    #[error("Available quantity too low for equipment {equipment_id} at health center {health_center_id}: needed {needed}, available {available}")]
    AvailableTooLow {
        health_center_id: String,
        equipment_id: String,
        needed: i64,
        available: i64,
    },

    #[error("Stock counter overflow for equipment {equipment_id} at health center {health_center_id}")]
    QuantityOverflow {
        health_center_id: String,
        equipment_id: String,
    },

    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("Equipment not found: {0}")]
    EquipmentNotFound(String),

    #[error("Equipment is deactivated: {0}")]
    EquipmentInactive(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Booking is not pending: {0}")]
    BookingNotPending(String),

    #[error("Stock row for equipment {equipment_id} at health center {health_center_id} changed concurrently")]
    ConcurrentUpdate {
        health_center_id: String,
        equipment_id: String,
    },

    #[error("Storage busy: {0}")]
    StorageBusy(String),

    #[error("Database error: {0}")]
    Database(DbError),
}

/// Coarse classification callers map to user-facing responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockErrorKind {
    /// Missing provisioning; an administrator has to act
    Setup,
    /// The request cannot succeed as made (not enough stock, bad input)
    ClientCorrectable,
    /// Ledger state contradicts the workflow; needs investigation
    Anomaly,
    /// Transient contention or storage trouble; retry with backoff
    Retryable,
    Internal,
}

impl StockError {
    pub fn kind(&self) -> StockErrorKind {
        match self {
            StockError::StockNotConfigured { .. }
            | StockError::EquipmentNotFound(_)
            | StockError::EquipmentInactive(_) => StockErrorKind::Setup,
            StockError::InsufficientStock { .. }
            | StockError::InvalidQuantity(_)
            | StockError::BookingNotFound(_)
            | StockError::BookingNotPending(_) => StockErrorKind::ClientCorrectable,
            StockError::ReservedTooLow { .. }
            | StockError::AvailableTooLow { .. }
            | StockError::QuantityOverflow { .. } => StockErrorKind::Anomaly,
            StockError::ConcurrentUpdate { .. } | StockError::StorageBusy(_) => {
                StockErrorKind::Retryable
            }
            StockError::Database(_) => StockErrorKind::Internal,
        }
    }

    /// Whether the same call may succeed if repeated later without any other change.
    pub fn is_retryable(&self) -> bool {
        self.kind() == StockErrorKind::Retryable
    }

    fn from_counter(err: CounterError, health_center_id: &str, required: &RequiredEquipment) -> Self {
        let health_center_id = health_center_id.to_string();
        let equipment_id = required.equipment_id.clone();
        match err {
            CounterError::InsufficientFree { needed, free } => StockError::InsufficientStock {
                health_center_id,
                equipment_id,
                equipment_name: required.equipment_name.clone(),
                needed,
                available: free,
            },
            CounterError::ReservedTooLow { needed, reserved } => StockError::ReservedTooLow {
                health_center_id,
                equipment_id,
                needed,
                reserved,
            },
            CounterError::AvailableTooLow { needed, available } => StockError::AvailableTooLow {
                health_center_id,
                equipment_id,
                needed,
                available,
            },
            CounterError::Overflow => StockError::QuantityOverflow {
                health_center_id,
                equipment_id,
            },
        }
    }
}

impl From<DbError> for StockError {
    fn from(e: DbError) -> Self {
        if e.is_busy() {
            StockError::StorageBusy(e.to_string())
        } else {
            StockError::Database(e)
        }
    }
}

impl From<rusqlite::Error> for StockError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::from(e).into()
    }
}

pub type StockResult<T> = Result<T, StockError>;

/// Quantity of one equipment moved by an operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuantity {
    pub equipment_id: String,
    pub quantity: i64,
}

/// Result of a reservation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationOutcome {
    pub reserved_items: Vec<ItemQuantity>,
    pub message: String,
}

impl ReservationOutcome {
    pub const NOTHING_REQUIRED: &'static str = "No equipment required";
    pub const RESERVED: &'static str = "Equipment reserved successfully";

    fn nothing_required() -> Self {
        Self {
            reserved_items: Vec::new(),
            message: Self::NOTHING_REQUIRED.to_string(),
        }
    }

    fn reserved(reserved_items: Vec<ItemQuantity>) -> Self {
        Self {
            reserved_items,
            message: Self::RESERVED.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Result of a deduction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeductionOutcome {
    pub deducted_items: Vec<ItemQuantity>,
}

impl DeductionOutcome {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Load the stock row an operation needs; a missing row is a setup gap.
fn configured_stock(
    conn: &Connection,
    health_center_id: &str,
    equipment_id: &str,
) -> StockResult<InventoryStock> {
    db::find_stock(conn, health_center_id, equipment_id)?.ok_or_else(|| {
        StockError::StockNotConfigured {
            health_center_id: health_center_id.to_string(),
            equipment_id: equipment_id.to_string(),
        }
    })
}

/// Write new counters back, failing if the row moved since it was read.
fn persist_counters(conn: &Connection, stock: &mut InventoryStock) -> StockResult<()> {
    if db::update_stock_counters(conn, stock)? {
        Ok(())
    } else {
        Err(StockError::ConcurrentUpdate {
            health_center_id: stock.health_center_id.clone(),
            equipment_id: stock.equipment_id.clone(),
        })
    }
}

/// Log a failed operation at the level its kind deserves.
fn log_failure(operation: &'static str, err: &StockError) {
    match err.kind() {
        StockErrorKind::Anomaly => tracing::error!(operation, error = %err, "stock ledger anomaly"),
        StockErrorKind::Internal => tracing::error!(operation, error = %err, "stock operation failed"),
        StockErrorKind::Retryable => tracing::warn!(operation, error = %err, "stock operation contended"),
        StockErrorKind::Setup | StockErrorKind::ClientCorrectable => {
            tracing::warn!(operation, error = %err, "stock operation refused")
        }
    }
}
