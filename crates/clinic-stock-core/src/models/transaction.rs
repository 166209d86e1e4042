//! Stock transaction audit records.

use serde::{Deserialize, Serialize};

use super::now_timestamp;

/// Kind of stock movement recorded in the audit trail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockTransactionType {
    Reserve,
    Deduct,
    Restock,
}

impl StockTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockTransactionType::Reserve => "RESERVE",
            StockTransactionType::Deduct => "DEDUCT",
            StockTransactionType::Restock => "RESTOCK",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RESERVE" => Some(StockTransactionType::Reserve),
            "DEDUCT" => Some(StockTransactionType::Deduct),
            "RESTOCK" => Some(StockTransactionType::Restock),
            _ => None,
        }
    }
}

/// An immutable record of one stock movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockTransaction {
    pub transaction_id: String,
    pub health_center_id: String,
    pub equipment_id: String,
    /// Always at least 1
    pub quantity: i64,
    pub transaction_type: StockTransactionType,
    /// Booking this movement belongs to (reserve/deduct)
    pub reference_booking_id: Option<String>,
    /// Actor that triggered the movement
    pub created_by: Option<String>,
    pub created_at: String,
}

impl StockTransaction {
    pub fn new(
        transaction_type: StockTransactionType,
        health_center_id: &str,
        equipment_id: &str,
        quantity: i64,
    ) -> Self {
        Self {
            transaction_id: uuid::Uuid::new_v4().to_string(),
            health_center_id: health_center_id.to_string(),
            equipment_id: equipment_id.to_string(),
            quantity,
            transaction_type,
            reference_booking_id: None,
            created_by: None,
            created_at: now_timestamp(),
        }
    }

    pub fn for_booking(mut self, booking_id: Option<&str>) -> Self {
        self.reference_booking_id = booking_id.map(str::to_string);
        self
    }

    pub fn by(mut self, actor_id: Option<&str>) -> Self {
        self.created_by = actor_id.map(str::to_string);
        self
    }
}
