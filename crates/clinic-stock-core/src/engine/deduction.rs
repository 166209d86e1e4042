//! Completion-time conversion of reserved equipment into consumed stock.

use rusqlite::Connection;

use super::{
    configured_stock, log_failure, persist_counters, BookingDirectory, DeductionOutcome,
    ItemQuantity, StockError, StockResult,
};
use crate::db::{self, Database};
use crate::models::{BookingContext, StockTransaction, StockTransactionType};

/// Retires reserved equipment once the test it was reserved for has been performed.
pub struct DeductionEngine<'a> {
    db: &'a mut Database,
}

impl<'a> DeductionEngine<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Deduct the equipment used by a completed booking.
    ///
    /// The booking is resolved to its health center and test type through
    /// `bookings`; an unknown booking fails with `BookingNotFound`.
    pub fn deduct_after_completion<D>(
        &mut self,
        booking_id: &str,
        actor_id: Option<&str>,
        bookings: &D,
    ) -> StockResult<DeductionOutcome>
    where
        D: BookingDirectory + ?Sized,
    {
        let context = match bookings.booking_context(booking_id) {
            Ok(Some(context)) => context,
            Ok(None) => {
                let err = StockError::BookingNotFound(booking_id.to_string());
                log_failure("deduct", &err);
                return Err(err);
            }
            Err(err) => {
                log_failure("deduct", &err);
                return Err(err);
            }
        };
        self.deduct(&context, actor_id)
    }

    /// Deduct the equipment used by an already resolved booking.
    pub fn deduct(
        &mut self,
        context: &BookingContext,
        actor_id: Option<&str>,
    ) -> StockResult<DeductionOutcome> {
        let result = self
            .db
            .transaction()
            .map_err(StockError::from)
            .and_then(|tx| {
                let outcome = deduct_within(&tx, context, actor_id)?;
                tx.commit()?;
                Ok(outcome)
            });

        match &result {
            Ok(outcome) => tracing::info!(
                booking_id = %context.booking_id,
                health_center_id = %context.health_center_id,
                test_type_id = %context.test_type_id,
                items = outcome.deducted_items.len(),
                "equipment deducted"
            ),
            Err(err) => log_failure("deduct", err),
        }
        result
    }
}

/// Deduction steps on an already open write transaction.
///
/// A booking recorded in this database must still be pending and is marked
/// completed here. Leaves partial changes behind on error; the caller must roll back.
pub fn deduct_within(
    conn: &Connection,
    context: &BookingContext,
    actor_id: Option<&str>,
) -> StockResult<DeductionOutcome> {
    settle_recorded_booking(conn, &context.booking_id)?;

    let health_center_id = context.health_center_id.as_str();
    let requirements = db::active_requirements(conn, &context.test_type_id)?;

    let mut deducted = Vec::with_capacity(requirements.len());
    for required in &requirements {
        let mut stock = configured_stock(conn, health_center_id, &required.equipment_id)?;

        stock
            .deduct(required.quantity_per_test)
            .map_err(|e| StockError::from_counter(e, health_center_id, required))?;
        persist_counters(conn, &mut stock)?;

        let record = StockTransaction::new(
            StockTransactionType::Deduct,
            health_center_id,
            &required.equipment_id,
            required.quantity_per_test,
        )
        .for_booking(Some(&context.booking_id))
        .by(actor_id);
        db::append_transaction(conn, &record)?;

        deducted.push(ItemQuantity {
            equipment_id: required.equipment_id.clone(),
            quantity: required.quantity_per_test,
        });
    }

    Ok(DeductionOutcome {
        deducted_items: deducted,
    })
}

/// Complete a booking kept in the `bookings` table; unknown ids belong to a collaborator.
fn settle_recorded_booking(conn: &Connection, booking_id: &str) -> StockResult<()> {
    let Some(booking) = db::find_booking(conn, booking_id)? else {
        return Ok(());
    };
    if !booking.is_pending() || !db::mark_booking_completed(conn, booking_id)? {
        return Err(StockError::BookingNotPending(booking_id.to_string()));
    }
    Ok(())
}
