//! Inventory stock ledger database operations.
//!
//! Counter changes go through the engines; this module only offers the row-level
//! primitives they compose inside a write transaction, plus read and threshold
//! administration.

use rusqlite::{params, Connection, OptionalExtension};

use super::{equipment_exists, map_constraint, Database, DbError, DbResult};
use crate::models::{now_timestamp, InventoryStock};

const STOCK_COLUMNS: &str = "health_center_id, equipment_id, available_quantity, \
     reserved_quantity, minimum_threshold, version, created_at, updated_at";

fn stock_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InventoryStock> {
    Ok(InventoryStock {
        health_center_id: row.get(0)?,
        equipment_id: row.get(1)?,
        available_quantity: row.get(2)?,
        reserved_quantity: row.get(3)?,
        minimum_threshold: row.get(4)?,
        version: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Load the stock row for a (health center, equipment) pair.
pub(crate) fn find_stock(
    conn: &Connection,
    health_center_id: &str,
    equipment_id: &str,
) -> DbResult<Option<InventoryStock>> {
    let sql = format!(
        "SELECT {STOCK_COLUMNS} FROM inventory_stock WHERE health_center_id = ? AND equipment_id = ?"
    );
    conn.query_row(&sql, [health_center_id, equipment_id], stock_from_row)
        .optional()
        .map_err(Into::into)
}

/// Insert a new stock row.
pub(crate) fn insert_stock(conn: &Connection, stock: &InventoryStock) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO inventory_stock (
            health_center_id, equipment_id, available_quantity, reserved_quantity,
            minimum_threshold, version, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            stock.health_center_id,
            stock.equipment_id,
            stock.available_quantity,
            stock.reserved_quantity,
            stock.minimum_threshold,
            stock.version,
            stock.created_at,
            stock.updated_at,
        ],
    )
    .map_err(map_constraint)?;
    Ok(())
}

/// Persist new counters if the row still has the version it was read at.
///
/// Returns `false` when another writer got there first; `stock` is then left as is.
/// On success the in-memory version and timestamp follow the stored row.
pub(crate) fn update_stock_counters(conn: &Connection, stock: &mut InventoryStock) -> DbResult<bool> {
    let updated_at = now_timestamp();
    let rows_affected = conn
        .execute(
            r#"
            UPDATE inventory_stock
            SET available_quantity = ?3,
                reserved_quantity = ?4,
                version = version + 1,
                updated_at = ?5
            WHERE health_center_id = ?1 AND equipment_id = ?2 AND version = ?6
            "#,
            params![
                stock.health_center_id,
                stock.equipment_id,
                stock.available_quantity,
                stock.reserved_quantity,
                updated_at,
                stock.version,
            ],
        )
        .map_err(map_constraint)?;

    if rows_affected == 0 {
        return Ok(false);
    }
    stock.version += 1;
    stock.updated_at = updated_at;
    Ok(true)
}

impl Database {
    /// Get the stock row for a (health center, equipment) pair.
    pub fn get_stock(
        &self,
        health_center_id: &str,
        equipment_id: &str,
    ) -> DbResult<Option<InventoryStock>> {
        find_stock(&self.conn, health_center_id, equipment_id)
    }

    /// Provision an empty stock row so the equipment can be offered at a center.
    ///
    /// Units arrive through restock. Fails if the row already exists.
    pub fn seed_stock(
        &self,
        health_center_id: &str,
        equipment_id: &str,
        minimum_threshold: i64,
    ) -> DbResult<InventoryStock> {
        if !equipment_exists(&self.conn, equipment_id)? {
            return Err(DbError::NotFound(format!("equipment {equipment_id}")));
        }
        let mut stock = InventoryStock::new(health_center_id.to_string(), equipment_id.to_string());
        stock.minimum_threshold = minimum_threshold;
        insert_stock(&self.conn, &stock)?;
        Ok(stock)
    }

    /// Change the low-stock threshold of an existing row.
    pub fn set_minimum_threshold(
        &self,
        health_center_id: &str,
        equipment_id: &str,
        minimum_threshold: i64,
    ) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE inventory_stock
                SET minimum_threshold = ?3, updated_at = ?4
                WHERE health_center_id = ?1 AND equipment_id = ?2
                "#,
                params![health_center_id, equipment_id, minimum_threshold, now_timestamp()],
            )
            .map_err(map_constraint)?;
        Ok(rows_affected > 0)
    }

    /// All stock rows of a health center.
    pub fn list_stock_for_center(&self, health_center_id: &str) -> DbResult<Vec<InventoryStock>> {
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM inventory_stock WHERE health_center_id = ? ORDER BY equipment_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([health_center_id], stock_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Rows whose free quantity has fallen to or below their minimum threshold.
    pub fn list_low_stock(&self, health_center_id: &str) -> DbResult<Vec<InventoryStock>> {
        let sql = format!(
            r#"
            SELECT {STOCK_COLUMNS} FROM inventory_stock
            WHERE health_center_id = ?
              AND available_quantity - reserved_quantity <= minimum_threshold
            ORDER BY available_quantity - reserved_quantity, equipment_id
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([health_center_id], stock_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Equipment, EquipmentKind};

    fn setup_db() -> (Database, Equipment) {
        let db = Database::open_in_memory().unwrap();
        let strip = Equipment::new("Glucose Strip".into(), EquipmentKind::Consumable);
        db.insert_equipment(&strip).unwrap();
        (db, strip)
    }

    #[test]
    fn test_seed_and_get() {
        let (db, strip) = setup_db();

        let seeded = db.seed_stock("center-x", &strip.equipment_id, 10).unwrap();
        assert_eq!(seeded.available_quantity, 0);
        assert_eq!(seeded.reserved_quantity, 0);

        let stored = db.get_stock("center-x", &strip.equipment_id).unwrap().unwrap();
        assert_eq!(stored, seeded);
        assert!(db.get_stock("center-y", &strip.equipment_id).unwrap().is_none());
    }

    #[test]
    fn test_seed_twice_fails() {
        let (db, strip) = setup_db();

        db.seed_stock("center-x", &strip.equipment_id, 0).unwrap();
        let err = db.seed_stock("center-x", &strip.equipment_id, 0).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));

        let err = db.seed_stock("center-x", "missing", 0).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_update_checks_version() {
        let (db, strip) = setup_db();
        db.seed_stock("center-x", &strip.equipment_id, 0).unwrap();

        let mut first = find_stock(db.conn(), "center-x", &strip.equipment_id)
            .unwrap()
            .unwrap();
        let mut stale = first.clone();

        first.available_quantity = 10;
        assert!(update_stock_counters(db.conn(), &mut first).unwrap());
        assert_eq!(first.version, 1);

        stale.available_quantity = 99;
        assert!(!update_stock_counters(db.conn(), &mut stale).unwrap());
        assert_eq!(stale.version, 0);

        let stored = db.get_stock("center-x", &strip.equipment_id).unwrap().unwrap();
        assert_eq!(stored.available_quantity, 10);
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn test_update_rejects_over_reservation() {
        let (db, strip) = setup_db();
        db.seed_stock("center-x", &strip.equipment_id, 0).unwrap();

        let mut stock = find_stock(db.conn(), "center-x", &strip.equipment_id)
            .unwrap()
            .unwrap();
        stock.reserved_quantity = 1;
        let err = update_stock_counters(db.conn(), &mut stock).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn test_low_stock() {
        let (db, strip) = setup_db();
        let lancet = Equipment::new("Lancet".into(), EquipmentKind::Consumable);
        db.insert_equipment(&lancet).unwrap();

        db.seed_stock("center-x", &strip.equipment_id, 5).unwrap();
        db.seed_stock("center-x", &lancet.equipment_id, 0).unwrap();

        let mut lancets = find_stock(db.conn(), "center-x", &lancet.equipment_id)
            .unwrap()
            .unwrap();
        lancets.available_quantity = 20;
        update_stock_counters(db.conn(), &mut lancets).unwrap();

        let low = db.list_low_stock("center-x").unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].equipment_id, strip.equipment_id);

        assert!(db.set_minimum_threshold("center-x", &lancet.equipment_id, 25).unwrap());
        assert_eq!(db.list_low_stock("center-x").unwrap().len(), 2);
        assert_eq!(db.list_stock_for_center("center-x").unwrap().len(), 2);
        assert!(db.list_low_stock("center-y").unwrap().is_empty());

        let err = db
            .set_minimum_threshold("center-x", &lancet.equipment_id, -1)
            .unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }
}
