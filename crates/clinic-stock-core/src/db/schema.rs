//! SQLite schema definition.

/// Complete database schema for the clinic stock engine.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Equipment Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS equipment (
    equipment_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL CHECK (kind IN ('CONSUMABLE', 'REUSABLE')),
    description TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Equipment is soft-deactivated, never deleted
CREATE TRIGGER IF NOT EXISTS equipment_no_delete BEFORE DELETE ON equipment
BEGIN
    SELECT RAISE(ABORT, 'Equipment cannot be deleted, deactivate it instead');
END;

-- ============================================================================
-- Test Equipment Requirements
-- ============================================================================

CREATE TABLE IF NOT EXISTS test_equipment_requirements (
    requirement_id TEXT PRIMARY KEY,
    test_type_id TEXT NOT NULL,
    equipment_id TEXT NOT NULL REFERENCES equipment(equipment_id),
    quantity_per_test INTEGER NOT NULL CHECK (quantity_per_test >= 1),
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- At most one active requirement per (test type, equipment)
CREATE UNIQUE INDEX IF NOT EXISTS idx_requirements_active_pair
    ON test_equipment_requirements(test_type_id, equipment_id)
    WHERE active = 1;
CREATE INDEX IF NOT EXISTS idx_requirements_test_type ON test_equipment_requirements(test_type_id);

-- ============================================================================
-- Inventory Stock Ledger (Mutable - engines only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS inventory_stock (
    health_center_id TEXT NOT NULL,
    equipment_id TEXT NOT NULL REFERENCES equipment(equipment_id),
    available_quantity INTEGER NOT NULL DEFAULT 0 CHECK (available_quantity >= 0),
    reserved_quantity INTEGER NOT NULL DEFAULT 0 CHECK (reserved_quantity >= 0),
    minimum_threshold INTEGER NOT NULL DEFAULT 0 CHECK (minimum_threshold >= 0),
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (health_center_id, equipment_id),
    -- Reserved units are a subset of available units
    CHECK (reserved_quantity <= available_quantity)
);

CREATE INDEX IF NOT EXISTS idx_stock_equipment ON inventory_stock(equipment_id);

CREATE TRIGGER IF NOT EXISTS inventory_stock_no_delete BEFORE DELETE ON inventory_stock
BEGIN
    SELECT RAISE(ABORT, 'Stock rows are never deleted');
END;

-- ============================================================================
-- Stock Transactions (Append-Only - Immutable after creation)
-- ============================================================================

CREATE TABLE IF NOT EXISTS stock_transactions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    transaction_id TEXT NOT NULL UNIQUE,
    health_center_id TEXT NOT NULL,
    equipment_id TEXT NOT NULL REFERENCES equipment(equipment_id),
    quantity INTEGER NOT NULL CHECK (quantity >= 1),
    transaction_type TEXT NOT NULL CHECK (transaction_type IN ('RESERVE', 'DEDUCT', 'RESTOCK')),
    reference_booking_id TEXT,                   -- audit linkage only, no foreign key
    created_by TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_stock ON stock_transactions(health_center_id, equipment_id);
CREATE INDEX IF NOT EXISTS idx_transactions_booking ON stock_transactions(reference_booking_id);

CREATE TRIGGER IF NOT EXISTS stock_transactions_no_update BEFORE UPDATE ON stock_transactions
BEGIN
    SELECT RAISE(ABORT, 'Stock transactions are immutable');
END;

CREATE TRIGGER IF NOT EXISTS stock_transactions_no_delete BEFORE DELETE ON stock_transactions
BEGIN
    SELECT RAISE(ABORT, 'Stock transactions are immutable');
END;

-- ============================================================================
-- Bookings (minimal view used by the reservation/deduction flows)
-- ============================================================================

CREATE TABLE IF NOT EXISTS bookings (
    booking_id TEXT PRIMARY KEY,
    health_center_id TEXT NOT NULL,
    test_type_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'completed')),
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bookings_center ON bookings(health_center_id);
"#;
