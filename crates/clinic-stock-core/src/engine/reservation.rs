//! Booking-time equipment reservation.

use rusqlite::Connection;

use super::{
    configured_stock, log_failure, persist_counters, ItemQuantity, ReservationOutcome, StockError,
    StockResult,
};
use crate::db::{self, Database};
use crate::models::{StockTransaction, StockTransactionType};

/// Reserves the equipment a test needs when it is booked.
pub struct ReservationEngine<'a> {
    db: &'a mut Database,
}

impl<'a> ReservationEngine<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Reserve every piece of equipment `test_type_id` needs at `health_center_id`.
    ///
    /// All requirements are reserved or none are: on any failure the transaction
    /// rolls back and neither stock rows nor the transaction log change.
    pub fn reserve(
        &mut self,
        test_type_id: &str,
        health_center_id: &str,
        booking_id: Option<&str>,
        actor_id: Option<&str>,
    ) -> StockResult<ReservationOutcome> {
        let result = self
            .db
            .transaction()
            .map_err(StockError::from)
            .and_then(|tx| {
                let outcome =
                    reserve_within(&tx, test_type_id, health_center_id, booking_id, actor_id)?;
                tx.commit()?;
                Ok(outcome)
            });

        match &result {
            Ok(outcome) => tracing::info!(
                test_type_id,
                health_center_id,
                booking_id,
                items = outcome.reserved_items.len(),
                "{}",
                outcome.message
            ),
            Err(err) => log_failure("reserve", err),
        }
        result
    }
}

/// Reservation steps on an already open write transaction.
///
/// Leaves partial changes behind on error; the caller must roll back.
pub fn reserve_within(
    conn: &Connection,
    test_type_id: &str,
    health_center_id: &str,
    booking_id: Option<&str>,
    actor_id: Option<&str>,
) -> StockResult<ReservationOutcome> {
    let requirements = db::active_requirements(conn, test_type_id)?;
    if requirements.is_empty() {
        return Ok(ReservationOutcome::nothing_required());
    }
    if let Some(retired) = requirements.iter().find(|r| !r.equipment_active) {
        return Err(StockError::EquipmentInactive(retired.equipment_id.clone()));
    }

    let mut reserved = Vec::with_capacity(requirements.len());
    for required in &requirements {
        let mut stock = configured_stock(conn, health_center_id, &required.equipment_id)?;

        stock
            .reserve(required.quantity_per_test)
            .map_err(|e| StockError::from_counter(e, health_center_id, required))?;
        persist_counters(conn, &mut stock)?;

        let record = StockTransaction::new(
            StockTransactionType::Reserve,
            health_center_id,
            &required.equipment_id,
            required.quantity_per_test,
        )
        .for_booking(booking_id)
        .by(actor_id);
        db::append_transaction(conn, &record)?;

        reserved.push(ItemQuantity {
            equipment_id: required.equipment_id.clone(),
            quantity: required.quantity_per_test,
        });
    }

    Ok(ReservationOutcome::reserved(reserved))
}
