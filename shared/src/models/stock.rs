//! Stock ledger models: batches, movements, expiry alerts
//!
//! Batch quantities only ever change through movements; the consumption
//! ordering and allocation walk are pure functions here so the allocator can
//! be tested without a database.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Stock movement types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    Adjust,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjust => "ADJUST",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "IN" => Some(MovementType::In),
            "OUT" => Some(MovementType::Out),
            "ADJUST" => Some(MovementType::Adjust),
            _ => None,
        }
    }

    /// Apply this movement's effect to a batch quantity.
    ///
    /// IN adds, OUT subtracts. ADJUST sets the absolute quantity: it is a
    /// correction, not a delta. Movement quantities are validated positive,
    /// so an adjustment can never leave a batch negative.
    pub fn apply(&self, current: Decimal, quantity: Decimal) -> Decimal {
        match self {
            MovementType::In => current + quantity,
            MovementType::Out => current - quantity,
            MovementType::Adjust => quantity,
        }
    }
}

/// A physical lot of a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBatch {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub location_id: Option<Uuid>,
    /// A batch without an expiry date never expires
    pub expiry_date: Option<NaiveDate>,
    pub purchase_date: NaiveDate,
    pub purchase_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockBatch {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry < today,
            None => false,
        }
    }

    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|expiry| (expiry - today).num_days())
    }

    pub fn is_expiring_soon(&self, today: NaiveDate, days: i64) -> bool {
        match self.days_until_expiry(today) {
            Some(left) => left > 0 && left <= days,
            None => false,
        }
    }
}

/// An append-only ledger entry.
///
/// Movements are never edited or deleted; their only side effect is the
/// one-time batch quantity update at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub date: DateTime<Utc>,
    pub note: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Expiry alert types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryAlertType {
    ExpiringSoon,
    Expired,
}

impl ExpiryAlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryAlertType::ExpiringSoon => "EXPIRING_SOON",
            ExpiryAlertType::Expired => "EXPIRED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "EXPIRING_SOON" => Some(ExpiryAlertType::ExpiringSoon),
            "EXPIRED" => Some(ExpiryAlertType::Expired),
            _ => None,
        }
    }

    /// Classify a batch expiry date against the warning window.
    ///
    /// Returns `None` for batches that never expire, expire today, or expire
    /// beyond `today + warn_days`.
    pub fn classify(
        expiry_date: Option<NaiveDate>,
        today: NaiveDate,
        warn_days: i64,
    ) -> Option<Self> {
        let expiry = expiry_date?;
        if expiry < today {
            Some(ExpiryAlertType::Expired)
        } else if expiry > today && expiry <= today + chrono::Duration::days(warn_days) {
            Some(ExpiryAlertType::ExpiringSoon)
        } else {
            None
        }
    }
}

/// An expiry alert for a batch.
///
/// At most one alert exists per (batch, type, calendar day).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryAlert {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub alert_type: ExpiryAlertType,
    pub alert_date: DateTime<Utc>,
    pub is_read: bool,
    pub email_sent: bool,
}

// ============================================================================
// Consumption allocation
// ============================================================================

/// Consumption order for candidate batches: batches with an expiry date
/// first, nearest expiry first, then oldest purchase; batches that never
/// expire come last, oldest purchase first. Ties break on id so the order is
/// total.
pub fn consume_order(a: &StockBatch, b: &StockBatch) -> Ordering {
    match (a.expiry_date, b.expiry_date) {
        (Some(ea), Some(eb)) => ea
            .cmp(&eb)
            .then(a.purchase_date.cmp(&b.purchase_date))
            .then(a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .purchase_date
            .cmp(&b.purchase_date)
            .then(a.id.cmp(&b.id)),
    }
}

/// One step of a consumption plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub batch_id: Uuid,
    pub quantity: Decimal,
}

/// Walk batches already sorted by [`consume_order`] and allocate `requested`
/// across them, taking `min(batch.quantity, remaining)` from each.
///
/// Callers must have verified that `requested` does not exceed the total
/// available quantity; any shortfall left at the end of the walk is ignored.
pub fn plan_allocation(batches: &[StockBatch], requested: Decimal) -> Vec<Allocation> {
    let mut remaining = requested;
    let mut plan = Vec::new();
    for batch in batches {
        if remaining <= Decimal::ZERO {
            break;
        }
        if batch.quantity <= Decimal::ZERO {
            continue;
        }
        let take = batch.quantity.min(remaining);
        plan.push(Allocation {
            batch_id: batch.id,
            quantity: take,
        });
        remaining -= take;
    }
    plan
}
