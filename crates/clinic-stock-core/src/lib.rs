//! Clinic Stock Core Library
//!
//! Equipment reservation, deduction and restock engine for rural health centers.
//!
//! # Architecture
//!
//! ```text
//!   Booking created            Test completed             Delivery received
//!         │                          │                           │
//!         ▼                          ▼                           ▼
//!  ReservationEngine          DeductionEngine               RestockEngine
//!  reserved += need           available -= need             available += qty
//!                             reserved  -= need
//!         │                          │                           │
//!         └──────────────┬───────────┴───────────────────────────┘
//!                        ▼
//!          ┌─────────────────────────────────┐
//!          │   BEGIN IMMEDIATE transaction   │
//!          │   inventory_stock (versioned)   │
//!          │   stock_transactions (append)   │
//!          └─────────────────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **Reserved stock is a subset of available stock.** `0 <= reserved <= available`
//! holds for every row at every observable moment, and a multi-item operation either
//! commits completely or leaves nothing behind.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer (catalog, requirements, stock ledger, audit log)
//! - [`models`]: Domain types (Equipment, InventoryStock, StockTransaction, etc.)
//! - [`engine`]: Reservation, deduction and restock engines
//! - [`config`]: Store configuration from the environment
//! - [`telemetry`]: Tracing subscriber setup

pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ConfigError, StoreConfig};
pub use db::{Database, DbError};
pub use engine::{
    BookingDirectory, BookingStore, DeductionEngine, DeductionOutcome, ItemQuantity,
    ReservationEngine, ReservationOutcome, RestockEngine, StockError, StockErrorKind,
    StockResult,
};
pub use models::{
    Booking, BookingContext, BookingStatus, Equipment, EquipmentKind, InventoryStock,
    RequiredEquipment, StockTransaction, StockTransactionType, TestEquipmentRequirement,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicStockError {
    #[error("Stock not configured: {0}")]
    StockNotConfigured(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Inconsistent stock: {0}")]
    InconsistentStock(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Retry later: {0}")]
    Retryable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<StockError> for ClinicStockError {
    fn from(e: StockError) -> Self {
        let message = e.to_string();
        match e {
            StockError::StockNotConfigured { .. } | StockError::EquipmentInactive(_) => {
                ClinicStockError::StockNotConfigured(message)
            }
            StockError::InsufficientStock { .. } => ClinicStockError::InsufficientStock(message),
            StockError::ReservedTooLow { .. }
            | StockError::AvailableTooLow { .. }
            | StockError::QuantityOverflow { .. } => ClinicStockError::InconsistentStock(message),
            StockError::EquipmentNotFound(_) | StockError::BookingNotFound(_) => {
                ClinicStockError::NotFound(message)
            }
            StockError::InvalidQuantity(_) | StockError::BookingNotPending(_) => {
                ClinicStockError::InvalidInput(message)
            }
            StockError::ConcurrentUpdate { .. } | StockError::StorageBusy(_) => {
                ClinicStockError::Retryable(message)
            }
            StockError::Database(e) => e.into(),
        }
    }
}

impl From<DbError> for ClinicStockError {
    fn from(e: DbError) -> Self {
        if e.is_busy() {
            return ClinicStockError::Retryable(e.to_string());
        }
        match e {
            DbError::NotFound(what) => ClinicStockError::NotFound(what),
            DbError::Constraint(msg) => ClinicStockError::InvalidInput(msg),
            other => ClinicStockError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ConfigError> for ClinicStockError {
    fn from(e: ConfigError) -> Self {
        ClinicStockError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for ClinicStockError {
    fn from(e: serde_json::Error) -> Self {
        ClinicStockError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicStockError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicStockError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<ClinicStockCore>, ClinicStockError> {
    let db = Database::open(&path)?;
    Ok(ClinicStockCore::wrap(db))
}

/// Open the database configured through `CLINIC_STOCK_*` environment variables.
#[uniffi::export]
pub fn open_database_from_env() -> Result<Arc<ClinicStockCore>, ClinicStockError> {
    let config = StoreConfig::from_env()?;
    let db = Database::open_with_config(&config)?;
    Ok(ClinicStockCore::wrap(db))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<ClinicStockCore>, ClinicStockError> {
    let db = Database::open_in_memory()?;
    Ok(ClinicStockCore::wrap(db))
}

/// Install the tracing subscriber for the host process.
#[uniffi::export]
pub fn init_logging(json: bool) {
    telemetry::init(json);
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicStockCore {
    db: Arc<Mutex<Database>>,
}

impl ClinicStockCore {
    fn wrap(db: Database) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }
}

#[uniffi::export]
impl ClinicStockCore {
    // =========================================================================
    // Equipment Catalog
    // =========================================================================

    /// Register a new piece of trackable equipment.
    pub fn create_equipment(
        &self,
        name: String,
        kind: String,
        description: Option<String>,
    ) -> Result<FfiEquipment, ClinicStockError> {
        let kind = EquipmentKind::parse(&kind).ok_or_else(|| {
            ClinicStockError::InvalidInput(format!("unknown equipment kind: {kind}"))
        })?;
        let mut equipment = Equipment::new(name, kind);
        equipment.description = description;

        let db = self.db.lock()?;
        db.insert_equipment(&equipment)?;
        Ok(equipment.into())
    }

    pub fn list_equipment(&self, active_only: bool) -> Result<Vec<FfiEquipment>, ClinicStockError> {
        let db = self.db.lock()?;
        let items = db.list_equipment(active_only)?;
        Ok(items.into_iter().map(|e| e.into()).collect())
    }

    pub fn deactivate_equipment(&self, equipment_id: String) -> Result<bool, ClinicStockError> {
        let db = self.db.lock()?;
        Ok(db.deactivate_equipment(&equipment_id)?)
    }

    // =========================================================================
    // Requirements
    // =========================================================================

    /// Set how many units of equipment one run of a test type consumes.
    pub fn set_requirement(
        &self,
        test_type_id: String,
        equipment_id: String,
        quantity_per_test: i64,
    ) -> Result<(), ClinicStockError> {
        let db = self.db.lock()?;
        db.set_requirement(&test_type_id, &equipment_id, quantity_per_test)?;
        Ok(())
    }

    pub fn deactivate_requirement(
        &self,
        test_type_id: String,
        equipment_id: String,
    ) -> Result<bool, ClinicStockError> {
        let db = self.db.lock()?;
        Ok(db.deactivate_requirement(&test_type_id, &equipment_id)?)
    }

    // =========================================================================
    // Stock Ledger
    // =========================================================================

    /// Provision an empty stock row for equipment at a health center.
    pub fn seed_stock(
        &self,
        health_center_id: String,
        equipment_id: String,
        minimum_threshold: i64,
    ) -> Result<FfiInventoryStock, ClinicStockError> {
        let db = self.db.lock()?;
        let stock = db.seed_stock(&health_center_id, &equipment_id, minimum_threshold)?;
        Ok(stock.into())
    }

    pub fn get_stock(
        &self,
        health_center_id: String,
        equipment_id: String,
    ) -> Result<Option<FfiInventoryStock>, ClinicStockError> {
        let db = self.db.lock()?;
        let stock = db.get_stock(&health_center_id, &equipment_id)?;
        Ok(stock.map(|s| s.into()))
    }

    /// Stock rows at or below their minimum threshold.
    pub fn list_low_stock(
        &self,
        health_center_id: String,
    ) -> Result<Vec<FfiInventoryStock>, ClinicStockError> {
        let db = self.db.lock()?;
        let rows = db.list_low_stock(&health_center_id)?;
        Ok(rows.into_iter().map(|s| s.into()).collect())
    }

    /// All stock rows of a health center as JSON.
    pub fn export_stock_report_json(
        &self,
        health_center_id: String,
    ) -> Result<String, ClinicStockError> {
        let db = self.db.lock()?;
        let rows = db.list_stock_for_center(&health_center_id)?;
        Ok(serde_json::to_string(&rows)?)
    }

    // =========================================================================
    // Engines
    // =========================================================================

    /// Reserve the equipment a test type needs at a health center.
    pub fn reserve(
        &self,
        test_type_id: String,
        health_center_id: String,
        booking_id: Option<String>,
        actor_id: Option<String>,
    ) -> Result<FfiReservation, ClinicStockError> {
        let mut db = self.db.lock()?;
        let outcome = ReservationEngine::new(&mut db).reserve(
            &test_type_id,
            &health_center_id,
            booking_id.as_deref(),
            actor_id.as_deref(),
        )?;
        Ok(outcome.into())
    }

    /// Deduct the equipment of a completed booking resolved by the caller.
    pub fn deduct(
        &self,
        booking_id: String,
        health_center_id: String,
        test_type_id: String,
        actor_id: Option<String>,
    ) -> Result<FfiDeduction, ClinicStockError> {
        let context = BookingContext {
            booking_id,
            health_center_id,
            test_type_id,
        };
        let mut db = self.db.lock()?;
        let outcome = DeductionEngine::new(&mut db).deduct(&context, actor_id.as_deref())?;
        Ok(outcome.into())
    }

    /// Add delivered units to a health center's stock.
    pub fn restock(
        &self,
        health_center_id: String,
        equipment_id: String,
        quantity: i64,
        actor_id: Option<String>,
    ) -> Result<FfiInventoryStock, ClinicStockError> {
        let mut db = self.db.lock()?;
        let stock = RestockEngine::new(&mut db).restock(
            &health_center_id,
            &equipment_id,
            quantity,
            actor_id.as_deref(),
        )?;
        Ok(stock.into())
    }

    // =========================================================================
    // Bookings
    // =========================================================================

    /// Record a booking with its equipment reserved; nothing is recorded on failure.
    pub fn create_booking(
        &self,
        health_center_id: String,
        test_type_id: String,
        actor_id: Option<String>,
    ) -> Result<FfiBooking, ClinicStockError> {
        let mut db = self.db.lock()?;
        let booked = BookingStore::new(&mut db).create_booking_with_reservation(
            &health_center_id,
            &test_type_id,
            actor_id.as_deref(),
        )?;
        Ok(FfiBooking {
            booking_id: booked.booking.booking_id,
            health_center_id: booked.booking.health_center_id,
            test_type_id: booked.booking.test_type_id,
            status: booked.booking.status.as_str().to_string(),
            reservation: booked.reservation.into(),
        })
    }

    /// Mark a booking completed and deduct its equipment.
    pub fn complete_booking(
        &self,
        booking_id: String,
        actor_id: Option<String>,
    ) -> Result<FfiDeduction, ClinicStockError> {
        let mut db = self.db.lock()?;
        let completed =
            BookingStore::new(&mut db).complete_booking(&booking_id, actor_id.as_deref())?;
        Ok(completed.deduction.into())
    }

    /// Stock movements recorded against a booking.
    pub fn list_booking_transactions(
        &self,
        booking_id: String,
    ) -> Result<Vec<FfiStockTransaction>, ClinicStockError> {
        let db = self.db.lock()?;
        let records = db.list_transactions_for_booking(&booking_id)?;
        Ok(records.into_iter().map(|t| t.into()).collect())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe equipment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEquipment {
    pub equipment_id: String,
    pub name: String,
    pub kind: String,
    pub description: Option<String>,
    pub active: bool,
}

impl From<Equipment> for FfiEquipment {
    fn from(equipment: Equipment) -> Self {
        Self {
            equipment_id: equipment.equipment_id,
            name: equipment.name,
            kind: equipment.kind.as_str().to_string(),
            description: equipment.description,
            active: equipment.active,
        }
    }
}

/// FFI-safe stock row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInventoryStock {
    pub health_center_id: String,
    pub equipment_id: String,
    pub available_quantity: i64,
    pub reserved_quantity: i64,
    pub free_quantity: i64,
    pub minimum_threshold: i64,
}

impl From<InventoryStock> for FfiInventoryStock {
    fn from(stock: InventoryStock) -> Self {
        Self {
            free_quantity: stock.free_quantity(),
            health_center_id: stock.health_center_id,
            equipment_id: stock.equipment_id,
            available_quantity: stock.available_quantity,
            reserved_quantity: stock.reserved_quantity,
            minimum_threshold: stock.minimum_threshold,
        }
    }
}

/// FFI-safe item quantity.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiItemQuantity {
    pub equipment_id: String,
    pub quantity: i64,
}

impl From<ItemQuantity> for FfiItemQuantity {
    fn from(item: ItemQuantity) -> Self {
        Self {
            equipment_id: item.equipment_id,
            quantity: item.quantity,
        }
    }
}

/// FFI-safe reservation result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReservation {
    pub reserved_items: Vec<FfiItemQuantity>,
    pub message: String,
}

impl From<ReservationOutcome> for FfiReservation {
    fn from(outcome: ReservationOutcome) -> Self {
        Self {
            reserved_items: outcome.reserved_items.into_iter().map(|i| i.into()).collect(),
            message: outcome.message,
        }
    }
}

/// FFI-safe deduction result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDeduction {
    pub deducted_items: Vec<FfiItemQuantity>,
}

impl From<DeductionOutcome> for FfiDeduction {
    fn from(outcome: DeductionOutcome) -> Self {
        Self {
            deducted_items: outcome.deducted_items.into_iter().map(|i| i.into()).collect(),
        }
    }
}

/// FFI-safe booking with its reservation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBooking {
    pub booking_id: String,
    pub health_center_id: String,
    pub test_type_id: String,
    pub status: String,
    pub reservation: FfiReservation,
}

/// FFI-safe stock transaction.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStockTransaction {
    pub transaction_id: String,
    pub health_center_id: String,
    pub equipment_id: String,
    pub quantity: i64,
    pub transaction_type: String,
    pub reference_booking_id: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
}

impl From<StockTransaction> for FfiStockTransaction {
    fn from(record: StockTransaction) -> Self {
        Self {
            transaction_id: record.transaction_id,
            health_center_id: record.health_center_id,
            equipment_id: record.equipment_id,
            quantity: record.quantity,
            transaction_type: record.transaction_type.as_str().to_string(),
            reference_booking_id: record.reference_booking_id,
            created_by: record.created_by,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffi_reservation_flow() {
        let core = open_database_in_memory().unwrap();

        let strip = core
            .create_equipment("Glucose Strip".into(), "consumable".into(), None)
            .unwrap();
        core.set_requirement("glucose".into(), strip.equipment_id.clone(), 1)
            .unwrap();
        core.restock("center-x".into(), strip.equipment_id.clone(), 2, None)
            .unwrap();

        let booking = core
            .create_booking("center-x".into(), "glucose".into(), Some("clerk-1".into()))
            .unwrap();
        assert_eq!(booking.status, "pending");
        assert_eq!(booking.reservation.reserved_items.len(), 1);

        let deduction = core
            .complete_booking(booking.booking_id.clone(), None)
            .unwrap();
        assert_eq!(deduction.deducted_items[0].quantity, 1);

        let stock = core
            .get_stock("center-x".into(), strip.equipment_id.clone())
            .unwrap()
            .unwrap();
        assert_eq!(stock.available_quantity, 1);
        assert_eq!(stock.free_quantity, 1);

        let log = core.list_booking_transactions(booking.booking_id).unwrap();
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_ffi_error_mapping() {
        let core = open_database_in_memory().unwrap();

        let err = core
            .create_equipment("Swab".into(), "disposable".into(), None)
            .unwrap_err();
        assert!(matches!(err, ClinicStockError::InvalidInput(_)));

        let swab = core
            .create_equipment("Swab".into(), "CONSUMABLE".into(), None)
            .unwrap();
        core.set_requirement("malaria-rdt".into(), swab.equipment_id.clone(), 1)
            .unwrap();

        let err = core
            .reserve("malaria-rdt".into(), "center-x".into(), None, None)
            .unwrap_err();
        assert!(matches!(err, ClinicStockError::StockNotConfigured(_)));

        core.seed_stock("center-x".into(), swab.equipment_id.clone(), 0)
            .unwrap();
        let err = core
            .reserve("malaria-rdt".into(), "center-x".into(), None, None)
            .unwrap_err();
        assert!(matches!(err, ClinicStockError::InsufficientStock(_)));

        let err = core
            .restock("center-x".into(), swab.equipment_id, -3, None)
            .unwrap_err();
        assert!(matches!(err, ClinicStockError::InvalidInput(_)));

        let report = core.export_stock_report_json("center-x".into()).unwrap();
        assert!(report.contains("\"available_quantity\":0"));
    }
}
