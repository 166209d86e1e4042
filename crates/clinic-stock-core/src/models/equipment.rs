//! Equipment catalog models.

use serde::{Deserialize, Serialize};

use super::now_timestamp;

/// Whether a unit is used up by a test or returned to the shelf afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentKind {
    /// Used up by a single test (strips, swabs, reagents)
    Consumable,
    /// Survives the test but is held for its duration (centrifuge slots, analyzers)
    Reusable,
}

impl EquipmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentKind::Consumable => "CONSUMABLE",
            EquipmentKind::Reusable => "REUSABLE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CONSUMABLE" => Some(EquipmentKind::Consumable),
            "REUSABLE" => Some(EquipmentKind::Reusable),
            _ => None,
        }
    }
}

/// A trackable item in the equipment catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Equipment {
    /// Unique identifier
    pub equipment_id: String,
    /// Unique display name (e.g., "Glucose Strip")
    pub name: String,
    pub kind: EquipmentKind,
    pub description: Option<String>,
    /// Inactive equipment is never physically removed
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Equipment {
    /// Create a new active equipment definition.
    pub fn new(name: String, kind: EquipmentKind) -> Self {
        let now = now_timestamp();
        Self {
            equipment_id: uuid::Uuid::new_v4().to_string(),
            name,
            kind,
            description: None,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_consumable(&self) -> bool {
        self.kind == EquipmentKind::Consumable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_equipment() {
        let equipment = Equipment::new("Glucose Strip".into(), EquipmentKind::Consumable);
        assert_eq!(equipment.name, "Glucose Strip");
        assert!(equipment.active);
        assert!(equipment.is_consumable());
        assert_eq!(equipment.equipment_id.len(), 36);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(EquipmentKind::parse("consumable"), Some(EquipmentKind::Consumable));
        assert_eq!(EquipmentKind::parse(" REUSABLE "), Some(EquipmentKind::Reusable));
        assert_eq!(EquipmentKind::parse("disposable"), None);
        assert_eq!(
            EquipmentKind::parse(EquipmentKind::Reusable.as_str()),
            Some(EquipmentKind::Reusable)
        );
    }

    #[test]
    fn test_kind_serializes_upper_case() {
        let json = serde_json::to_string(&EquipmentKind::Consumable).unwrap();
        assert_eq!(json, "\"CONSUMABLE\"");
    }
}
