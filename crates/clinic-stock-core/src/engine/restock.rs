//! Administrative stock replenishment.

use rusqlite::Connection;

use super::{log_failure, persist_counters, StockError, StockResult};
use crate::db::{self, Database};
use crate::models::{InventoryStock, StockTransaction, StockTransactionType};

/// Adds physical stock at a health center, creating the row on first delivery.
pub struct RestockEngine<'a> {
    db: &'a mut Database,
}

impl<'a> RestockEngine<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Add `quantity` units and return the updated row.
    pub fn restock(
        &mut self,
        health_center_id: &str,
        equipment_id: &str,
        quantity: i64,
        actor_id: Option<&str>,
    ) -> StockResult<InventoryStock> {
        let result = self
            .db
            .transaction()
            .map_err(StockError::from)
            .and_then(|tx| {
                let stock = restock_within(&tx, health_center_id, equipment_id, quantity, actor_id)?;
                tx.commit()?;
                Ok(stock)
            });

        match &result {
            Ok(stock) => tracing::info!(
                health_center_id,
                equipment_id,
                quantity,
                available = stock.available_quantity,
                reserved = stock.reserved_quantity,
                "equipment restocked"
            ),
            Err(err) => log_failure("restock", err),
        }
        result
    }
}

/// Restock steps on an already open write transaction.
pub fn restock_within(
    conn: &Connection,
    health_center_id: &str,
    equipment_id: &str,
    quantity: i64,
    actor_id: Option<&str>,
) -> StockResult<InventoryStock> {
    if quantity <= 0 {
        return Err(StockError::InvalidQuantity(quantity));
    }
    if !db::equipment_exists(conn, equipment_id)? {
        return Err(StockError::EquipmentNotFound(equipment_id.to_string()));
    }

    let stock = match db::find_stock(conn, health_center_id, equipment_id)? {
        Some(mut stock) => {
            stock
                .restock(quantity)
                .map_err(|_| StockError::QuantityOverflow {
                    health_center_id: health_center_id.to_string(),
                    equipment_id: equipment_id.to_string(),
                })?;
            persist_counters(conn, &mut stock)?;
            stock
        }
        None => {
            let mut stock =
                InventoryStock::new(health_center_id.to_string(), equipment_id.to_string());
            stock.available_quantity = quantity;
            db::insert_stock(conn, &stock)?;
            stock
        }
    };

    let record = StockTransaction::new(
        StockTransactionType::Restock,
        health_center_id,
        equipment_id,
        quantity,
    )
    .by(actor_id);
    db::append_transaction(conn, &record)?;

    Ok(stock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReservationEngine;
    use crate::models::{Equipment, EquipmentKind};

    fn setup() -> (Database, Equipment) {
        let db = Database::open_in_memory().unwrap();
        let strip = Equipment::new("Glucose Strip".into(), EquipmentKind::Consumable);
        db.insert_equipment(&strip).unwrap();
        (db, strip)
    }

    #[test]
    fn test_restock_creates_row() {
        let (mut db, strip) = setup();

        let stock = RestockEngine::new(&mut db)
            .restock("center-x", &strip.equipment_id, 40, Some("admin-1"))
            .unwrap();
        assert_eq!(stock.available_quantity, 40);
        assert_eq!(stock.reserved_quantity, 0);

        let stored = db.get_stock("center-x", &strip.equipment_id).unwrap().unwrap();
        assert_eq!(stored, stock);

        let history = db
            .list_stock_transactions("center-x", &strip.equipment_id, None)
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transaction_type, StockTransactionType::Restock);
        assert_eq!(history[0].quantity, 40);
        assert_eq!(history[0].created_by.as_deref(), Some("admin-1"));
        assert!(history[0].reference_booking_id.is_none());
    }

    #[test]
    fn test_restock_keeps_reservations() {
        let (mut db, strip) = setup();
        db.set_requirement("glucose", &strip.equipment_id, 2).unwrap();

        RestockEngine::new(&mut db)
            .restock("center-x", &strip.equipment_id, 4, None)
            .unwrap();
        ReservationEngine::new(&mut db)
            .reserve("glucose", "center-x", Some("booking-1"), None)
            .unwrap();

        let stock = RestockEngine::new(&mut db)
            .restock("center-x", &strip.equipment_id, 6, None)
            .unwrap();
        assert_eq!(stock.available_quantity, 10);
        assert_eq!(stock.reserved_quantity, 2);
        assert_eq!(stock.version, 2);

        let stored = db.get_stock("center-x", &strip.equipment_id).unwrap().unwrap();
        assert_eq!(stored, stock);
    }

    #[test]
    fn test_restock_seeded_row() {
        let (mut db, strip) = setup();
        db.seed_stock("center-x", &strip.equipment_id, 15).unwrap();

        let stock = RestockEngine::new(&mut db)
            .restock("center-x", &strip.equipment_id, 10, None)
            .unwrap();
        assert_eq!(stock.available_quantity, 10);
        assert_eq!(stock.minimum_threshold, 15);
        assert_eq!(db.list_low_stock("center-x").unwrap().len(), 1);
    }

    #[test]
    fn test_restock_rejects_bad_input() {
        let (mut db, strip) = setup();

        let err = RestockEngine::new(&mut db)
            .restock("center-x", &strip.equipment_id, 0, None)
            .unwrap_err();
        assert!(matches!(err, StockError::InvalidQuantity(0)));

        let err = RestockEngine::new(&mut db)
            .restock("center-x", "missing", 5, None)
            .unwrap_err();
        assert!(matches!(err, StockError::EquipmentNotFound(_)));

        assert!(db.get_stock("center-x", &strip.equipment_id).unwrap().is_none());
        assert_eq!(db.count_transactions().unwrap(), 0);
    }
}
