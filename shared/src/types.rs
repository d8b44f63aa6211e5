//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Unit of measure for product quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[default]
    Piece,
    Gram,
    Kilogram,
    Milliliter,
    Liter,
    Pack,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Piece => "piece",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Pack => "pack",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "piece" => Some(Unit::Piece),
            "g" => Some(Unit::Gram),
            "kg" => Some(Unit::Kilogram),
            "ml" => Some(Unit::Milliliter),
            "l" => Some(Unit::Liter),
            "pack" => Some(Unit::Pack),
            _ => None,
        }
    }

    /// French label, used in notification emails
    pub fn label_fr(&self) -> &'static str {
        match self {
            Unit::Piece => "pièce",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Pack => "paquet",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
