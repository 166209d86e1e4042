//! Booking database operations.

use rusqlite::{params, Connection, OptionalExtension};

use super::{map_constraint, Database, DbError, DbResult};
use crate::models::{now_timestamp, Booking, BookingStatus};

/// Insert a new booking.
pub(crate) fn insert_booking(conn: &Connection, booking: &Booking) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO bookings (
            booking_id, health_center_id, test_type_id, status,
            created_by, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            booking.booking_id,
            booking.health_center_id,
            booking.test_type_id,
            booking.status.as_str(),
            booking.created_by,
            booking.created_at,
            booking.updated_at,
        ],
    )
    .map_err(map_constraint)?;
    Ok(())
}

/// Get a booking by ID.
pub(crate) fn find_booking(conn: &Connection, booking_id: &str) -> DbResult<Option<Booking>> {
    let row = conn
        .query_row(
            r#"
            SELECT booking_id, health_center_id, test_type_id, status,
                   created_by, created_at, updated_at
            FROM bookings
            WHERE booking_id = ?
            "#,
            [booking_id],
            |row| {
                Ok(BookingRow {
                    booking_id: row.get(0)?,
                    health_center_id: row.get(1)?,
                    test_type_id: row.get(2)?,
                    status: row.get(3)?,
                    created_by: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        )
        .optional()?;

    row.map(|row| row.try_into()).transpose()
}

/// Move a pending booking to completed. Returns `false` if it was not pending.
pub(crate) fn mark_booking_completed(conn: &Connection, booking_id: &str) -> DbResult<bool> {
    let rows_affected = conn.execute(
        r#"
        UPDATE bookings
        SET status = ?2, updated_at = ?3
        WHERE booking_id = ?1 AND status = ?4
        "#,
        params![
            booking_id,
            BookingStatus::Completed.as_str(),
            now_timestamp(),
            BookingStatus::Pending.as_str(),
        ],
    )?;
    Ok(rows_affected > 0)
}

impl Database {
    /// Get a booking by ID.
    pub fn get_booking(&self, booking_id: &str) -> DbResult<Option<Booking>> {
        find_booking(&self.conn, booking_id)
    }

    /// Number of bookings recorded for a health center.
    pub fn count_bookings(&self, health_center_id: &str) -> DbResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE health_center_id = ?",
            [health_center_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Intermediate row struct for database mapping.
struct BookingRow {
    booking_id: String,
    health_center_id: String,
    test_type_id: String,
    status: String,
    created_by: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&row.status)
            .ok_or_else(|| DbError::InvalidValue(format!("booking status {:?}", row.status)))?;
        Ok(Booking {
            booking_id: row.booking_id,
            health_center_id: row.health_center_id,
            test_type_id: row.test_type_id,
            status,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
