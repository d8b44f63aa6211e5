//! User account model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A household user account.
///
/// The notification settings are passed explicitly into the expiry scan and
/// shopping-list generation operations; nothing reads them ambiently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    /// Whether the user wants email notifications
    pub notification_email: bool,
    /// Days before expiry at which a batch is flagged as expiring soon
    pub notification_expiry_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
