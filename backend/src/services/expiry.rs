//! Expiry alerting service
//!
//! The daily scan flags batches that are expiring soon or already expired.
//! At most one alert is created per (batch, type, calendar day), so running
//! the scan twice on the same day produces no duplicates.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{ExpiryAlert, ExpiryAlertType};

/// Expiry alerting service
#[derive(Clone)]
pub struct ExpiryService {
    db: PgPool,
}

/// Filters for listing alerts
#[derive(Debug, Default, Deserialize)]
pub struct AlertFilter {
    pub alert_type: Option<ExpiryAlertType>,
    pub is_read: Option<bool>,
}

/// Per-user result of the daily scan sweep
#[derive(Debug, Serialize)]
pub struct ScannedForUser {
    pub user_id: Uuid,
    /// Whether the user opted into email notifications
    pub notify: bool,
    pub alerts: Vec<ExpiryAlert>,
}

/// An alert with its batch and product context
#[derive(Debug, Serialize)]
pub struct AlertDetail {
    #[serde(flatten)]
    pub alert: ExpiryAlert,
    pub product_name: String,
    pub batch_quantity: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub days_until_expiry: Option<i64>,
}

/// Alert row shape
type AlertRow = (Uuid, Uuid, String, DateTime<Utc>, bool, bool);

fn map_alert(row: AlertRow) -> AppResult<ExpiryAlert> {
    let alert_type = ExpiryAlertType::from_str(&row.2)
        .ok_or_else(|| AppError::Internal(format!("Unknown alert type: {}", row.2)))?;
    Ok(ExpiryAlert {
        id: row.0,
        batch_id: row.1,
        alert_type,
        alert_date: row.3,
        is_read: row.4,
        email_sent: row.5,
    })
}

impl ExpiryService {
    /// Create a new ExpiryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Scan a user's batches and create the missing alerts for today.
    ///
    /// `warn_days` is the user's notification window, passed in explicitly.
    /// Returns only the alerts created by this run.
    pub async fn scan_expiry(
        &self,
        user_id: Uuid,
        today: NaiveDate,
        warn_days: i64,
    ) -> AppResult<Vec<ExpiryAlert>> {
        let candidates = sqlx::query_as::<_, (Uuid, Option<NaiveDate>)>(
            r#"
            SELECT b.id, b.expiry_date
            FROM stock_batches b
            JOIN products p ON p.id = b.product_id
            WHERE p.user_id = $1 AND b.quantity > 0 AND b.expiry_date IS NOT NULL
            ORDER BY b.expiry_date
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut created = Vec::new();

        for (batch_id, expiry_date) in candidates {
            let Some(alert_type) = ExpiryAlertType::classify(expiry_date, today, warn_days) else {
                continue;
            };

            // The NOT EXISTS guard is the per-day dedup: a batch already
            // alerted with this type today is skipped.
            let row = sqlx::query_as::<_, AlertRow>(
                r#"
                INSERT INTO expiry_alerts (batch_id, alert_type)
                SELECT $1, $2
                WHERE NOT EXISTS (
                    SELECT 1 FROM expiry_alerts
                    WHERE batch_id = $1 AND alert_type = $2 AND alert_date::date = $3
                )
                RETURNING id, batch_id, alert_type, alert_date, is_read, email_sent
                "#,
            )
            .bind(batch_id)
            .bind(alert_type.as_str())
            .bind(today)
            .fetch_optional(&self.db)
            .await?;

            if let Some(row) = row {
                created.push(map_alert(row)?);
            }
        }

        Ok(created)
    }

    /// Run the scan for every active user with their own warning window;
    /// used by the daily task
    pub async fn scan_all(&self, today: NaiveDate) -> AppResult<Vec<ScannedForUser>> {
        let users = sqlx::query_as::<_, (Uuid, bool, i32)>(
            "SELECT id, notification_email, notification_expiry_days \
             FROM users WHERE is_active = true",
        )
        .fetch_all(&self.db)
        .await?;

        let mut results = Vec::with_capacity(users.len());
        for (user_id, notify, warn_days) in users {
            let alerts = self.scan_expiry(user_id, today, warn_days as i64).await?;
            results.push(ScannedForUser {
                user_id,
                notify,
                alerts,
            });
        }

        Ok(results)
    }

    /// List alerts of a user, newest first
    pub async fn list_alerts(
        &self,
        user_id: Uuid,
        today: NaiveDate,
        filter: AlertFilter,
    ) -> AppResult<Vec<AlertDetail>> {
        let rows = sqlx::query_as::<
            _,
            (
                Uuid,
                Uuid,
                String,
                DateTime<Utc>,
                bool,
                bool,
                String,
                Decimal,
                Option<NaiveDate>,
            ),
        >(
            r#"
            SELECT a.id, a.batch_id, a.alert_type, a.alert_date, a.is_read, a.email_sent,
                   p.name, b.quantity, b.expiry_date
            FROM expiry_alerts a
            JOIN stock_batches b ON b.id = a.batch_id
            JOIN products p ON p.id = b.product_id
            WHERE p.user_id = $1
              AND ($2::varchar IS NULL OR a.alert_type = $2)
              AND ($3::boolean IS NULL OR a.is_read = $3)
            ORDER BY a.alert_date DESC
            "#,
        )
        .bind(user_id)
        .bind(filter.alert_type.map(|t| t.as_str()))
        .bind(filter.is_read)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|r| {
                let alert = map_alert((r.0, r.1, r.2, r.3, r.4, r.5))?;
                Ok(AlertDetail {
                    alert,
                    product_name: r.6,
                    batch_quantity: r.7,
                    expiry_date: r.8,
                    days_until_expiry: r.8.map(|expiry| (expiry - today).num_days()),
                })
            })
            .collect()
    }

    /// Unread alerts of a user
    pub async fn unread_alerts(&self, user_id: Uuid, today: NaiveDate) -> AppResult<Vec<AlertDetail>> {
        self.list_alerts(
            user_id,
            today,
            AlertFilter {
                alert_type: None,
                is_read: Some(false),
            },
        )
        .await
    }

    /// Mark one alert as read
    pub async fn mark_read(&self, user_id: Uuid, alert_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE expiry_alerts a
            SET is_read = true
            FROM stock_batches b
            JOIN products p ON p.id = b.product_id
            WHERE a.id = $1 AND b.id = a.batch_id AND p.user_id = $2
            "#,
        )
        .bind(alert_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Alert".to_string()));
        }
        Ok(())
    }

    /// Mark all unread alerts of a user as read, returning the count
    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE expiry_alerts a
            SET is_read = true
            FROM stock_batches b
            JOIN products p ON p.id = b.product_id
            WHERE b.id = a.batch_id AND p.user_id = $1 AND a.is_read = false
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete read alerts older than 30 days, across all users
    pub async fn cleanup_old_alerts(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let threshold = now - Duration::days(30);
        let result =
            sqlx::query("DELETE FROM expiry_alerts WHERE is_read = true AND alert_date < $1")
                .bind(threshold)
                .execute(&self.db)
                .await?;

        Ok(result.rows_affected())
    }
}
