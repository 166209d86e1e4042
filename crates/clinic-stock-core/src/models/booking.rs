//! Booking records as seen by the stock engine.
//!
//! Only what the reservation and deduction flows need: where the test runs and which
//! test type it is. Queueing and priority live with the booking service.

use serde::{Deserialize, Serialize};

use super::now_timestamp;

/// Booking lifecycle as far as stock is concerned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingStatus {
    /// Equipment reserved, test not yet performed
    Pending,
    /// Test performed, reserved equipment deducted
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

/// The two facts the deduction engine needs about a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingContext {
    pub booking_id: String,
    pub health_center_id: String,
    pub test_type_id: String,
}

/// A booking row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub booking_id: String,
    pub health_center_id: String,
    pub test_type_id: String,
    pub status: BookingStatus,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Booking {
    pub fn new(health_center_id: String, test_type_id: String) -> Self {
        let now = now_timestamp();
        Self {
            booking_id: uuid::Uuid::new_v4().to_string(),
            health_center_id,
            test_type_id,
            status: BookingStatus::Pending,
            created_by: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn context(&self) -> BookingContext {
        BookingContext {
            booking_id: self.booking_id.clone(),
            health_center_id: self.health_center_id.clone(),
            test_type_id: self.test_type_id.clone(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == BookingStatus::Pending
    }
}
