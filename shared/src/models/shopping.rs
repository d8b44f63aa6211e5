//! Shopping list models and generation logic

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fraction of the threshold under which a below-threshold suggestion is
/// flagged high priority instead of normal.
pub fn priority_high_band() -> Decimal {
    Decimal::new(3, 1)
}

/// Shopping list lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    #[default]
    Draft,
    Active,
    Completed,
    Archived,
}

impl ListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListStatus::Draft => "draft",
            ListStatus::Active => "active",
            ListStatus::Completed => "completed",
            ListStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ListStatus::Draft),
            "active" => Some(ListStatus::Active),
            "completed" => Some(ListStatus::Completed),
            "archived" => Some(ListStatus::Archived),
            _ => None,
        }
    }

    /// Allowed transitions: draft → active → completed → archived, plus
    /// active → archived. Archived is terminal.
    pub fn can_transition(&self, to: ListStatus) -> bool {
        matches!(
            (self, to),
            (ListStatus::Draft, ListStatus::Active)
                | (ListStatus::Active, ListStatus::Completed)
                | (ListStatus::Active, ListStatus::Archived)
                | (ListStatus::Completed, ListStatus::Archived)
        )
    }
}

/// Item priorities, ordered by urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl ItemPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemPriority::Low => "low",
            ItemPriority::Normal => "normal",
            ItemPriority::High => "high",
            ItemPriority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(ItemPriority::Low),
            "normal" => Some(ItemPriority::Normal),
            "high" => Some(ItemPriority::High),
            "urgent" => Some(ItemPriority::Urgent),
            _ => None,
        }
    }

    /// Sort rank, most urgent highest
    pub fn rank(&self) -> u8 {
        match self {
            ItemPriority::Low => 0,
            ItemPriority::Normal => 1,
            ItemPriority::High => 2,
            ItemPriority::Urgent => 3,
        }
    }
}

/// Why an item is on a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemReason {
    BelowThreshold,
    OutOfStock,
    ExpiringSoon,
    #[default]
    Manual,
}

impl ItemReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemReason::BelowThreshold => "below_threshold",
            ItemReason::OutOfStock => "out_of_stock",
            ItemReason::ExpiringSoon => "expiring_soon",
            ItemReason::Manual => "manual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "below_threshold" => Some(ItemReason::BelowThreshold),
            "out_of_stock" => Some(ItemReason::OutOfStock),
            "expiring_soon" => Some(ItemReason::ExpiringSoon),
            "manual" => Some(ItemReason::Manual),
            _ => None,
        }
    }
}

/// A shopping list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub status: ListStatus,
    pub is_auto_generated: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An item on a shopping list; one per product per list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: Uuid,
    pub shopping_list_id: Uuid,
    pub product_id: Uuid,
    pub suggested_quantity: Decimal,
    pub actual_quantity: Option<Decimal>,
    pub priority: ItemPriority,
    pub reason: ItemReason,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub is_checked: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShoppingListItem {
    /// Quantity fed back into stock at completion: what was actually bought
    /// if recorded, otherwise the suggestion.
    pub fn quantity_to_add(&self) -> Decimal {
        self.actual_quantity.unwrap_or(self.suggested_quantity)
    }
}

/// A suggestion produced by the generator for one product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestockSuggestion {
    pub quantity: Decimal,
    pub priority: ItemPriority,
    pub reason: ItemReason,
}

/// Decide whether a product needs a shopping list item and with what
/// quantity and priority.
///
/// Out of stock suggests the full threshold at urgent priority; below
/// threshold suggests the deficit, high priority when the remaining stock is
/// under 30% of the threshold. Products at or above threshold yield nothing.
pub fn suggest_restock_item(total_stock: Decimal, threshold: Decimal) -> Option<RestockSuggestion> {
    if total_stock == Decimal::ZERO {
        return Some(RestockSuggestion {
            quantity: threshold,
            priority: ItemPriority::Urgent,
            reason: ItemReason::OutOfStock,
        });
    }
    if total_stock < threshold {
        let priority = if total_stock < threshold * priority_high_band() {
            ItemPriority::High
        } else {
            ItemPriority::Normal
        };
        return Some(RestockSuggestion {
            quantity: threshold - total_stock,
            priority,
            reason: ItemReason::BelowThreshold,
        });
    }
    None
}

/// Completion percentage of a list from its item counts
pub fn completion_percentage(total_items: i64, checked_items: i64) -> i32 {
    if total_items <= 0 {
        return 0;
    }
    ((checked_items as f64 / total_items as f64) * 100.0) as i32
}
