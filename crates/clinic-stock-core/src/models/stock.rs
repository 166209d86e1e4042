//! Inventory stock ledger models.
//!
//! `available_quantity` is the total physical stock on the shelf and
//! `reserved_quantity` is the part of it earmarked for pending bookings.
//! Reserved units are a subset of available units, never additional to them.

use serde::{Deserialize, Serialize};

use super::now_timestamp;

/// Why a counter update was refused. The row is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterError {
    /// Free quantity is smaller than what a reservation needs
    InsufficientFree { needed: i64, free: i64 },
    /// A deduction would consume more than was reserved
    ReservedTooLow { needed: i64, reserved: i64 },
    /// A deduction would consume more than is physically on hand
    AvailableTooLow { needed: i64, available: i64 },
    /// Restock would overflow the counter
    Overflow,
}

/// Stock counters for one equipment at one health center.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryStock {
    pub health_center_id: String,
    pub equipment_id: String,
    pub available_quantity: i64,
    pub reserved_quantity: i64,
    /// Free quantity at or below this level is reported as low stock
    pub minimum_threshold: i64,
    /// Bumped on every counter update, used as an optimistic concurrency token
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl InventoryStock {
    /// Create an empty row.
    pub fn new(health_center_id: String, equipment_id: String) -> Self {
        let now = now_timestamp();
        Self {
            health_center_id,
            equipment_id,
            available_quantity: 0,
            reserved_quantity: 0,
            minimum_threshold: 0,
            version: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Units that can still be reserved.
    pub fn free_quantity(&self) -> i64 {
        self.available_quantity - self.reserved_quantity
    }

    pub fn is_low(&self) -> bool {
        self.free_quantity() <= self.minimum_threshold
    }

    /// `0 <= reserved <= available`
    pub fn is_consistent(&self) -> bool {
        0 <= self.reserved_quantity && self.reserved_quantity <= self.available_quantity
    }

    /// Earmark `quantity` units for a booking.
    pub fn reserve(&mut self, quantity: i64) -> Result<(), CounterError> {
        let free = self.free_quantity();
        if free < quantity {
            return Err(CounterError::InsufficientFree {
                needed: quantity,
                free: free.max(0),
            });
        }
        self.reserved_quantity += quantity;
        Ok(())
    }

    /// Retire `quantity` reserved units from both counters.
    pub fn deduct(&mut self, quantity: i64) -> Result<(), CounterError> {
        if self.reserved_quantity < quantity {
            return Err(CounterError::ReservedTooLow {
                needed: quantity,
                reserved: self.reserved_quantity,
            });
        }
        if self.available_quantity < quantity {
            return Err(CounterError::AvailableTooLow {
                needed: quantity,
                available: self.available_quantity,
            });
        }
        self.available_quantity -= quantity;
        self.reserved_quantity -= quantity;
        Ok(())
    }

    /// Add `quantity` units of physical stock. Reservations are not touched.
    pub fn restock(&mut self, quantity: i64) -> Result<(), CounterError> {
        self.available_quantity = self
            .available_quantity
            .checked_add(quantity)
            .ok_or(CounterError::Overflow)?;
        Ok(())
    }
}
