//! Domain models for the clinic stock engine.

mod booking;
mod equipment;
mod requirement;
mod stock;
mod transaction;

pub use booking::*;
pub use equipment::*;
pub use requirement::*;
pub use stock::*;
pub use transaction::*;

use chrono::SecondsFormat;

/// Fixed-width RFC 3339 timestamp, so stored values sort lexically.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
