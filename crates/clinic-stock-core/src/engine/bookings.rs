//! Booking-side contracts of the stock engine.
//!
//! A booking must never exist without its equipment reserved, and a completed
//! booking must have its equipment deducted. `BookingStore` keeps both pairs in a
//! single transaction for bookings recorded in this database. Services that keep
//! bookings elsewhere resolve them through `BookingDirectory` instead.
//!
//! Any deduction naming a recorded booking completes it, whichever entry point
//! ran it, so a booking's reservation is consumed at most once.

use std::collections::HashMap;
use std::hash::BuildHasher;

use serde::{Deserialize, Serialize};

use super::{
    deduct_within, log_failure, reserve_within, DeductionOutcome, ReservationOutcome, StockError,
    StockResult,
};
use crate::db::{self, Database};
use crate::models::{Booking, BookingContext};

/// Resolves a booking ID to where and what the booked test is.
pub trait BookingDirectory {
    fn booking_context(&self, booking_id: &str) -> StockResult<Option<BookingContext>>;
}

impl<S: BuildHasher> BookingDirectory for HashMap<String, BookingContext, S> {
    fn booking_context(&self, booking_id: &str) -> StockResult<Option<BookingContext>> {
        Ok(self.get(booking_id).cloned())
    }
}

/// A booking together with the equipment reserved for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookedTest {
    pub booking: Booking,
    pub reservation: ReservationOutcome,
}

/// A completed booking together with the equipment deducted for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTest {
    pub booking: Booking,
    pub deduction: DeductionOutcome,
}

/// Bookings recorded alongside the stock ledger.
pub struct BookingStore<'a> {
    db: &'a mut Database,
}

impl<'a> BookingStore<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Record a booking and reserve its equipment in one transaction.
    ///
    /// If the reservation fails no booking is recorded.
    pub fn create_booking_with_reservation(
        &mut self,
        health_center_id: &str,
        test_type_id: &str,
        actor_id: Option<&str>,
    ) -> StockResult<BookedTest> {
        let mut booking = Booking::new(health_center_id.to_string(), test_type_id.to_string());
        booking.created_by = actor_id.map(str::to_string);

        let result = self
            .db
            .transaction()
            .map_err(StockError::from)
            .and_then(|tx| {
                db::insert_booking(&tx, &booking)?;
                let reservation = reserve_within(
                    &tx,
                    test_type_id,
                    health_center_id,
                    Some(&booking.booking_id),
                    actor_id,
                )?;
                tx.commit()?;
                Ok(reservation)
            });

        match result {
            Ok(reservation) => {
                tracing::info!(
                    booking_id = %booking.booking_id,
                    health_center_id,
                    test_type_id,
                    items = reservation.reserved_items.len(),
                    "booking created"
                );
                Ok(BookedTest {
                    booking,
                    reservation,
                })
            }
            Err(err) => {
                log_failure("create_booking", &err);
                Err(err)
            }
        }
    }

    /// Deduct a pending booking's equipment and mark it completed in one transaction.
    pub fn complete_booking(
        &mut self,
        booking_id: &str,
        actor_id: Option<&str>,
    ) -> StockResult<CompletedTest> {
        let result = self
            .db
            .transaction()
            .map_err(StockError::from)
            .and_then(|tx| {
                let booking = db::find_booking(&tx, booking_id)?
                    .ok_or_else(|| StockError::BookingNotFound(booking_id.to_string()))?;
                if !booking.is_pending() {
                    return Err(StockError::BookingNotPending(booking_id.to_string()));
                }

                let deduction = deduct_within(&tx, &booking.context(), actor_id)?;
                let booking = db::find_booking(&tx, booking_id)?
                    .ok_or_else(|| StockError::BookingNotFound(booking_id.to_string()))?;
                tx.commit()?;
                Ok(CompletedTest { booking, deduction })
            });

        match &result {
            Ok(completed) => tracing::info!(
                booking_id,
                items = completed.deduction.deducted_items.len(),
                "booking completed"
            ),
            Err(err) => log_failure("complete_booking", err),
        }
        result
    }
}
