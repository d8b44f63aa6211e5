//! Notification service for expiry and shopping list emails
//!
//! The engine only decides when to notify; composition and delivery live
//! here, behind an HTTP mail API. Delivery failures are reported to the
//! caller, which logs them without failing the operation that triggered the
//! notification.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::models::{ExpiryAlertType, ItemPriority};
use shared::types::Unit;

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    mail: Option<MailClient>,
}

/// HTTP mail delivery client
#[derive(Clone)]
pub struct MailClient {
    api_endpoint: String,
    api_token: String,
    from_address: String,
    http_client: reqwest::Client,
}

impl MailClient {
    /// Send one plain-text email
    async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let response = self
            .http_client
            .post(&self.api_endpoint)
            .bearer_auth(&self.api_token)
            .json(&json!({
                "from": self.from_address,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Mail delivery failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Mail delivery failed with status {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Recipient row: email address and opt-in flag
type RecipientRow = (String, String, bool);

impl NotificationService {
    /// Create a new NotificationService instance.
    ///
    /// With no mail endpoint configured the service degrades to no-op
    /// delivery; alerts stay in-app only.
    pub fn new(db: PgPool, config: &Config) -> Self {
        let mail = if config.mail.api_endpoint.is_empty() {
            None
        } else {
            Some(MailClient {
                api_endpoint: config.mail.api_endpoint.clone(),
                api_token: config.mail.api_token.clone(),
                from_address: config.mail.from_address.clone(),
                http_client: reqwest::Client::new(),
            })
        };
        Self { db, mail }
    }

    async fn recipient(&self, user_id: Uuid) -> AppResult<RecipientRow> {
        sqlx::query_as::<_, RecipientRow>(
            "SELECT username, email, notification_email FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// Email a digest of freshly created expiry alerts.
    ///
    /// Returns whether an email was actually sent; alerts that went out get
    /// their `email_sent` flag set.
    pub async fn notify_expiry_alerts(
        &self,
        user_id: Uuid,
        alert_ids: &[Uuid],
        today: NaiveDate,
    ) -> AppResult<bool> {
        if alert_ids.is_empty() {
            return Ok(false);
        }

        let (username, email, opted_in) = self.recipient(user_id).await?;
        if !opted_in {
            return Ok(false);
        }

        let Some(mail) = &self.mail else {
            tracing::debug!("Mail client not configured, skipping expiry notification");
            return Ok(false);
        };

        let rows = sqlx::query_as::<_, (String, String, Option<NaiveDate>)>(
            r#"
            SELECT a.alert_type, p.name, b.expiry_date
            FROM expiry_alerts a
            JOIN stock_batches b ON b.id = a.batch_id
            JOIN products p ON p.id = b.product_id
            WHERE a.id = ANY($1)
            ORDER BY b.expiry_date
            "#,
        )
        .bind(alert_ids)
        .fetch_all(&self.db)
        .await?;

        let expired: Vec<_> = rows
            .iter()
            .filter(|r| ExpiryAlertType::from_str(&r.0) == Some(ExpiryAlertType::Expired))
            .collect();
        let expiring: Vec<_> = rows
            .iter()
            .filter(|r| ExpiryAlertType::from_str(&r.0) == Some(ExpiryAlertType::ExpiringSoon))
            .collect();

        let subject = format!(
            "HomeStock - {} alerte(s) de péremption",
            expired.len() + expiring.len()
        );

        let mut body = format!("Bonjour {},\n\n", username);

        if !expired.is_empty() {
            body.push_str(&format!("{} produit(s) sont périmés :\n", expired.len()));
            for (_, name, expiry) in &expired {
                match expiry {
                    Some(date) => body.push_str(&format!("  - {} (périmé le {})\n", name, date)),
                    None => body.push_str(&format!("  - {}\n", name)),
                }
            }
            body.push('\n');
        }

        if !expiring.is_empty() {
            body.push_str(&format!(
                "{} produit(s) vont bientôt expirer :\n",
                expiring.len()
            ));
            for (_, name, expiry) in &expiring {
                match expiry {
                    Some(date) => {
                        let days_left = (*date - today).num_days();
                        body.push_str(&format!(
                            "  - {} (expire dans {} jour(s))\n",
                            name, days_left
                        ));
                    }
                    None => body.push_str(&format!("  - {}\n", name)),
                }
            }
            body.push('\n');
        }

        body.push_str("Connectez-vous à HomeStock pour gérer vos stocks.\n\nBonne journée !");

        mail.send(&email, &subject, &body).await?;

        sqlx::query("UPDATE expiry_alerts SET email_sent = true WHERE id = ANY($1)")
            .bind(alert_ids)
            .execute(&self.db)
            .await?;

        Ok(true)
    }

    /// Email a summary of a freshly generated shopping list
    pub async fn notify_shopping_list(&self, user_id: Uuid, list_id: Uuid) -> AppResult<bool> {
        let (username, email, opted_in) = self.recipient(user_id).await?;
        if !opted_in {
            return Ok(false);
        }

        let Some(mail) = &self.mail else {
            tracing::debug!("Mail client not configured, skipping shopping list notification");
            return Ok(false);
        };

        let title = sqlx::query_scalar::<_, String>(
            "SELECT title FROM shopping_lists WHERE id = $1 AND user_id = $2",
        )
        .bind(list_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Shopping list".to_string()))?;

        let items = sqlx::query_as::<_, (String, String, Decimal, String)>(
            r#"
            SELECT i.priority, p.name, i.suggested_quantity, p.unit
            FROM shopping_list_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.shopping_list_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(list_id)
        .fetch_all(&self.db)
        .await?;

        let by_priority = |wanted: ItemPriority| {
            items
                .iter()
                .filter(move |i| ItemPriority::from_str(&i.0) == Some(wanted))
                .collect::<Vec<_>>()
        };
        let urgent = by_priority(ItemPriority::Urgent);
        let high = by_priority(ItemPriority::High);
        let normal = by_priority(ItemPriority::Normal);

        let line = |name: &str, quantity: &Decimal, unit: &str| {
            let unit_label = Unit::from_str(unit).unwrap_or_default().label_fr();
            format!("  - {} ({} {})\n", name, quantity, unit_label)
        };

        let subject = format!("HomeStock - Nouvelle liste de courses : {}", title);

        let mut body = format!("Bonjour {},\n\n", username);
        body.push_str(&format!(
            "Une nouvelle liste de courses a été générée automatiquement : {}\n\n",
            title
        ));
        body.push_str(&format!("Elle contient {} article(s) :\n\n", items.len()));

        if !urgent.is_empty() {
            body.push_str("URGENT :\n");
            for (_, name, quantity, unit) in &urgent {
                body.push_str(&line(name, quantity, unit));
            }
            body.push('\n');
        }

        if !high.is_empty() {
            body.push_str("PRIORITAIRE :\n");
            for (_, name, quantity, unit) in high.iter().take(5) {
                body.push_str(&line(name, quantity, unit));
            }
            if high.len() > 5 {
                body.push_str(&format!(
                    "  ... et {} autres produits prioritaires\n",
                    high.len() - 5
                ));
            }
            body.push('\n');
        }

        if !normal.is_empty() {
            body.push_str(&format!("{} autre(s) produit(s) à acheter\n\n", normal.len()));
        }

        body.push_str("Connectez-vous à HomeStock pour consulter et gérer votre liste.\n\nBonnes courses !");

        mail.send(&email, &subject, &body).await?;

        Ok(true)
    }
}
