//! Equipment catalog database operations.

use rusqlite::{params, Connection, OptionalExtension};

use super::{map_constraint, Database, DbError, DbResult};
use crate::models::{now_timestamp, Equipment, EquipmentKind};

const EQUIPMENT_COLUMNS: &str =
    "equipment_id, name, kind, description, active, created_at, updated_at";

impl Database {
    /// Insert a new equipment definition. Names are unique.
    pub fn insert_equipment(&self, equipment: &Equipment) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO equipment (
                    equipment_id, name, kind, description, active, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    equipment.equipment_id,
                    equipment.name,
                    equipment.kind.as_str(),
                    equipment.description,
                    equipment.active,
                    equipment.created_at,
                    equipment.updated_at,
                ],
            )
            .map_err(map_constraint)?;
        Ok(())
    }

    /// Get equipment by ID.
    pub fn get_equipment(&self, equipment_id: &str) -> DbResult<Option<Equipment>> {
        let sql = format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE equipment_id = ?");
        let row = self
            .conn
            .query_row(&sql, [equipment_id], EquipmentRow::from_row)
            .optional()?;
        row.map(TryInto::try_into).transpose()
    }

    /// Get equipment by its unique name.
    pub fn get_equipment_by_name(&self, name: &str) -> DbResult<Option<Equipment>> {
        let sql = format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE name = ?");
        let row = self
            .conn
            .query_row(&sql, [name], EquipmentRow::from_row)
            .optional()?;
        row.map(TryInto::try_into).transpose()
    }

    /// List equipment ordered by name.
    pub fn list_equipment(&self, active_only: bool) -> DbResult<Vec<Equipment>> {
        let sql = if active_only {
            format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE active = 1 ORDER BY name")
        } else {
            format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment ORDER BY name")
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], EquipmentRow::from_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?.try_into()?);
        }
        Ok(items)
    }

    /// Mark equipment as inactive (soft delete).
    pub fn deactivate_equipment(&self, equipment_id: &str) -> DbResult<bool> {
        self.set_equipment_active(equipment_id, false)
    }

    /// Bring deactivated equipment back into use.
    pub fn reactivate_equipment(&self, equipment_id: &str) -> DbResult<bool> {
        self.set_equipment_active(equipment_id, true)
    }

    fn set_equipment_active(&self, equipment_id: &str, active: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE equipment SET active = ?2, updated_at = ?3 WHERE equipment_id = ?1",
            params![equipment_id, active, now_timestamp()],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Whether an equipment row exists, active or not.
pub(crate) fn equipment_exists(conn: &Connection, equipment_id: &str) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM equipment WHERE equipment_id = ?",
        [equipment_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Intermediate row struct for database mapping.
struct EquipmentRow {
    equipment_id: String,
    name: String,
    kind: String,
    description: Option<String>,
    active: bool,
    created_at: String,
    updated_at: String,
}

impl EquipmentRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            equipment_id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            description: row.get(3)?,
            active: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl TryFrom<EquipmentRow> for Equipment {
    type Error = DbError;

    fn try_from(row: EquipmentRow) -> Result<Self, Self::Error> {
        let kind = EquipmentKind::parse(&row.kind)
            .ok_or_else(|| DbError::InvalidValue(format!("equipment kind {:?}", row.kind)))?;
        Ok(Equipment {
            equipment_id: row.equipment_id,
            name: row.name,
            kind,
            description: row.description,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
