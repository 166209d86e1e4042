//! Test equipment requirement database operations.

use rusqlite::{params, Connection, OptionalExtension};

use super::{equipment_exists, map_constraint, Database, DbError, DbResult};
use crate::models::{now_timestamp, EquipmentKind, RequiredEquipment, TestEquipmentRequirement};

impl Database {
    /// Set the per-test quantity for a (test type, equipment) pair.
    ///
    /// Updates the active requirement if there is one, otherwise creates it.
    pub fn set_requirement(
        &self,
        test_type_id: &str,
        equipment_id: &str,
        quantity_per_test: i64,
    ) -> DbResult<TestEquipmentRequirement> {
        if quantity_per_test < 1 {
            return Err(DbError::Constraint(format!(
                "quantity_per_test must be at least 1, got {quantity_per_test}"
            )));
        }
        if !equipment_exists(&self.conn, equipment_id)? {
            return Err(DbError::NotFound(format!("equipment {equipment_id}")));
        }

        let requirement = TestEquipmentRequirement::new(
            test_type_id.to_string(),
            equipment_id.to_string(),
            quantity_per_test,
        );

        self.conn
            .execute(
                r#"
                INSERT INTO test_equipment_requirements (
                    requirement_id, test_type_id, equipment_id, quantity_per_test,
                    active, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)
                ON CONFLICT(test_type_id, equipment_id) WHERE active = 1 DO UPDATE SET
                    quantity_per_test = excluded.quantity_per_test,
                    updated_at = excluded.updated_at
                "#,
                params![
                    requirement.requirement_id,
                    requirement.test_type_id,
                    requirement.equipment_id,
                    requirement.quantity_per_test,
                    requirement.created_at,
                    requirement.updated_at,
                ],
            )
            .map_err(map_constraint)?;

        self.get_active_requirement(test_type_id, equipment_id)?
            .ok_or_else(|| DbError::NotFound(format!("requirement {test_type_id}/{equipment_id}")))
    }

    /// Get the active requirement for a pair, if any.
    pub fn get_active_requirement(
        &self,
        test_type_id: &str,
        equipment_id: &str,
    ) -> DbResult<Option<TestEquipmentRequirement>> {
        self.conn
            .query_row(
                r#"
                SELECT requirement_id, test_type_id, equipment_id, quantity_per_test,
                       active, created_at, updated_at
                FROM test_equipment_requirements
                WHERE test_type_id = ? AND equipment_id = ? AND active = 1
                "#,
                [test_type_id, equipment_id],
                |row| {
                    Ok(TestEquipmentRequirement {
                        requirement_id: row.get(0)?,
                        test_type_id: row.get(1)?,
                        equipment_id: row.get(2)?,
                        quantity_per_test: row.get(3)?,
                        active: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Retire the active requirement for a pair. The row stays as history.
    pub fn deactivate_requirement(&self, test_type_id: &str, equipment_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE test_equipment_requirements
            SET active = 0, updated_at = ?3
            WHERE test_type_id = ?1 AND equipment_id = ?2 AND active = 1
            "#,
            params![test_type_id, equipment_id, now_timestamp()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Equipment a test type consumes per run.
    pub fn list_requirements(&self, test_type_id: &str) -> DbResult<Vec<RequiredEquipment>> {
        active_requirements(&self.conn, test_type_id)
    }
}

/// Active requirements for a test type, whatever the state of their equipment.
pub(crate) fn active_requirements(
    conn: &Connection,
    test_type_id: &str,
) -> DbResult<Vec<RequiredEquipment>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT r.equipment_id, e.name, e.kind, r.quantity_per_test, e.active
        FROM test_equipment_requirements r
        JOIN equipment e ON e.equipment_id = r.equipment_id
        WHERE r.test_type_id = ? AND r.active = 1
        ORDER BY e.name
        "#,
    )?;

    let rows = stmt.query_map([test_type_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, bool>(4)?,
        ))
    })?;

    let mut requirements = Vec::new();
    for row in rows {
        let (equipment_id, equipment_name, kind, quantity_per_test, equipment_active) = row?;
        let kind = EquipmentKind::parse(&kind)
            .ok_or_else(|| DbError::InvalidValue(format!("equipment kind {kind:?}")))?;
        requirements.push(RequiredEquipment {
            equipment_id,
            equipment_name,
            kind,
            quantity_per_test,
            equipment_active,
        });
    }
    Ok(requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Equipment;

    fn setup_db() -> (Database, Equipment, Equipment) {
        let db = Database::open_in_memory().unwrap();
        let strip = Equipment::new("Glucose Strip".into(), EquipmentKind::Consumable);
        let lancet = Equipment::new("Lancet".into(), EquipmentKind::Consumable);
        db.insert_equipment(&strip).unwrap();
        db.insert_equipment(&lancet).unwrap();
        (db, strip, lancet)
    }

    #[test]
    fn test_set_and_list() {
        let (db, strip, lancet) = setup_db();

        db.set_requirement("glucose", &strip.equipment_id, 1).unwrap();
        db.set_requirement("glucose", &lancet.equipment_id, 2).unwrap();
        db.set_requirement("malaria-rdt", &lancet.equipment_id, 1).unwrap();

        let required = db.list_requirements("glucose").unwrap();
        assert_eq!(required.len(), 2);
        assert_eq!(required[0].equipment_name, "Glucose Strip");
        assert_eq!(required[0].quantity_per_test, 1);
        assert_eq!(required[1].equipment_name, "Lancet");
        assert_eq!(required[1].quantity_per_test, 2);

        assert!(db.list_requirements("unknown-test").unwrap().is_empty());
    }

    #[test]
    fn test_set_updates_active_requirement() {
        let (db, strip, _) = setup_db();

        let first = db.set_requirement("glucose", &strip.equipment_id, 1).unwrap();
        let second = db.set_requirement("glucose", &strip.equipment_id, 3).unwrap();

        assert_eq!(first.requirement_id, second.requirement_id);
        assert_eq!(second.quantity_per_test, 3);
        assert_eq!(db.list_requirements("glucose").unwrap().len(), 1);
    }

    #[test]
    fn test_deactivate_then_set_creates_new_row() {
        let (db, strip, _) = setup_db();

        let first = db.set_requirement("glucose", &strip.equipment_id, 1).unwrap();
        assert!(db.deactivate_requirement("glucose", &strip.equipment_id).unwrap());
        assert!(db.list_requirements("glucose").unwrap().is_empty());
        assert!(!db.deactivate_requirement("glucose", &strip.equipment_id).unwrap());

        let second = db.set_requirement("glucose", &strip.equipment_id, 2).unwrap();
        assert_ne!(first.requirement_id, second.requirement_id);
        assert_eq!(db.list_requirements("glucose").unwrap()[0].quantity_per_test, 2);
    }

    #[test]
    fn test_invalid_requirements() {
        let (db, strip, _) = setup_db();

        let err = db.set_requirement("glucose", &strip.equipment_id, 0).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));

        let err = db.set_requirement("glucose", "missing", 1).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_inactive_equipment_stays_required() {
        let (db, strip, lancet) = setup_db();

        db.set_requirement("glucose", &strip.equipment_id, 1).unwrap();
        db.set_requirement("glucose", &lancet.equipment_id, 1).unwrap();
        db.deactivate_equipment(&lancet.equipment_id).unwrap();

        let required = db.list_requirements("glucose").unwrap();
        assert_eq!(required.len(), 2);
        assert!(required[0].equipment_active);
        assert_eq!(required[1].equipment_id, lancet.equipment_id);
        assert!(!required[1].equipment_active);
    }
}
