//! Test equipment requirement models.

use serde::{Deserialize, Serialize};

use super::{now_timestamp, EquipmentKind};

/// How many units of one equipment a single run of a test type consumes.
///
/// Requirements are global to the test type, not per health center.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestEquipmentRequirement {
    pub requirement_id: String,
    pub test_type_id: String,
    pub equipment_id: String,
    /// Always at least 1
    pub quantity_per_test: i64,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TestEquipmentRequirement {
    pub fn new(test_type_id: String, equipment_id: String, quantity_per_test: i64) -> Self {
        let now = now_timestamp();
        Self {
            requirement_id: uuid::Uuid::new_v4().to_string(),
            test_type_id,
            equipment_id,
            quantity_per_test,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// An active requirement joined with the equipment it names, as the engines read it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequiredEquipment {
    pub equipment_id: String,
    pub equipment_name: String,
    pub kind: EquipmentKind,
    pub quantity_per_test: i64,
    /// Deactivated equipment still settles existing reservations but takes no new ones
    pub equipment_active: bool,
}
