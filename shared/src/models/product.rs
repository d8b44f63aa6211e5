//! Product catalog models and restock evaluation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Unit;

/// Fixed product categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Food,
    Drink,
    Spices,
    Household,
    Hygiene,
    Other,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Food => "food",
            CategoryKind::Drink => "drink",
            CategoryKind::Spices => "spices",
            CategoryKind::Household => "household",
            CategoryKind::Hygiene => "hygiene",
            CategoryKind::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "food" => Some(CategoryKind::Food),
            "drink" => Some(CategoryKind::Drink),
            "spices" => Some(CategoryKind::Spices),
            "household" => Some(CategoryKind::Household),
            "hygiene" => Some(CategoryKind::Hygiene),
            "other" => Some(CategoryKind::Other),
            _ => None,
        }
    }
}

/// A product category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: CategoryKind,
    /// Emoji or icon class for the clients
    pub icon: Option<String>,
    /// Hex color code
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Fixed storage place kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Fridge,
    Freezer,
    Cupboard,
    Cellar,
    Garage,
    Other,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Fridge => "fridge",
            LocationKind::Freezer => "freezer",
            LocationKind::Cupboard => "cupboard",
            LocationKind::Cellar => "cellar",
            LocationKind::Garage => "garage",
            LocationKind::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fridge" => Some(LocationKind::Fridge),
            "freezer" => Some(LocationKind::Freezer),
            "cupboard" => Some(LocationKind::Cupboard),
            "cellar" => Some(LocationKind::Cellar),
            "garage" => Some(LocationKind::Garage),
            "other" => Some(LocationKind::Other),
            _ => None,
        }
    }
}

/// A storage location owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: LocationKind,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A catalog product.
///
/// Stock totals are never stored on the product; they are derived from its
/// batches at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub unit: Unit,
    pub default_location_id: Option<Uuid>,
    /// Minimum desired quantity before the product is considered low
    pub threshold: Decimal,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub notes: Option<String>,
    /// Whether generation may add this product to shopping lists
    pub auto_add_to_list: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived stock state of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockState {
    pub product_id: Uuid,
    pub total_stock: Decimal,
    pub is_below_threshold: bool,
    pub needs_restock: bool,
}

impl RestockState {
    /// Evaluate the restock state of a product from its aggregated stock.
    ///
    /// The threshold comparison is strict, and zero stock always needs a
    /// restock, even with a zero threshold.
    pub fn evaluate(product_id: Uuid, total_stock: Decimal, threshold: Decimal) -> Self {
        let is_below_threshold = total_stock < threshold;
        Self {
            product_id,
            total_stock,
            is_below_threshold,
            needs_restock: total_stock == Decimal::ZERO || is_below_threshold,
        }
    }
}
