//! Stock transaction log database operations (append-only).

use rusqlite::{params, Connection};

use super::{map_constraint, Database, DbError, DbResult};
use crate::models::{StockTransaction, StockTransactionType};

const TRANSACTION_COLUMNS: &str = "transaction_id, health_center_id, equipment_id, quantity, \
     transaction_type, reference_booking_id, created_by, created_at";

/// Append a record to the stock transaction log.
pub(crate) fn append_transaction(conn: &Connection, record: &StockTransaction) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO stock_transactions (
            transaction_id, health_center_id, equipment_id, quantity,
            transaction_type, reference_booking_id, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            record.transaction_id,
            record.health_center_id,
            record.equipment_id,
            record.quantity,
            record.transaction_type.as_str(),
            record.reference_booking_id,
            record.created_by,
            record.created_at,
        ],
    )
    .map_err(map_constraint)?;
    Ok(())
}

impl Database {
    /// Every movement recorded against a booking, oldest first.
    pub fn list_transactions_for_booking(&self, booking_id: &str) -> DbResult<Vec<StockTransaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM stock_transactions WHERE reference_booking_id = ? ORDER BY seq"
        );
        self.query_transactions(&sql, params![booking_id])
    }

    /// History of one stock row, newest first.
    pub fn list_stock_transactions(
        &self,
        health_center_id: &str,
        equipment_id: &str,
        limit: Option<usize>,
    ) -> DbResult<Vec<StockTransaction>> {
        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM stock_transactions
            WHERE health_center_id = ? AND equipment_id = ?
            ORDER BY seq DESC
            LIMIT ?
            "#
        );
        self.query_transactions(&sql, params![health_center_id, equipment_id, limit])
    }

    /// Total number of recorded movements.
    pub fn count_transactions(&self) -> DbResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM stock_transactions", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn query_transactions(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> DbResult<Vec<StockTransaction>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(TransactionRow {
                transaction_id: row.get(0)?,
                health_center_id: row.get(1)?,
                equipment_id: row.get(2)?,
                quantity: row.get(3)?,
                transaction_type: row.get(4)?,
                reference_booking_id: row.get(5)?,
                created_by: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }
}

/// Intermediate row struct for database mapping.
struct TransactionRow {
    transaction_id: String,
    health_center_id: String,
    equipment_id: String,
    quantity: i64,
    transaction_type: String,
    reference_booking_id: Option<String>,
    created_by: Option<String>,
    created_at: String,
}

impl TryFrom<TransactionRow> for StockTransaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let transaction_type = StockTransactionType::parse(&row.transaction_type).ok_or_else(|| {
            DbError::InvalidValue(format!("transaction type {:?}", row.transaction_type))
        })?;
        Ok(StockTransaction {
            transaction_id: row.transaction_id,
            health_center_id: row.health_center_id,
            equipment_id: row.equipment_id,
            quantity: row.quantity,
            transaction_type,
            reference_booking_id: row.reference_booking_id,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}
