//! HTTP handlers for the periodic task triggers
//!
//! The scheduler itself lives outside this service (cron, systemd timers);
//! it only needs to hit these endpoints. Every trigger is idempotent for the
//! day it runs in, and notifier failures never fail the sweep.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::error::AppResult;
use crate::services::expiry::ExpiryService;
use crate::services::notification::NotificationService;
use crate::services::shopping::ShoppingService;
use crate::AppState;

/// Result of the daily expiry sweep
#[derive(Debug, Serialize)]
pub struct ExpirySweepResponse {
    pub users_scanned: usize,
    pub alerts_created: usize,
    pub emails_sent: usize,
}

/// Result of the periodic list generation sweep
#[derive(Debug, Serialize)]
pub struct GenerationSweepResponse {
    pub users_processed: usize,
    pub lists_created: usize,
    pub emails_sent: usize,
}

/// Result of the cleanup sweep
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub alerts_deleted: u64,
    pub lists_archived: u64,
}

/// Run the daily expiry scan for every active user
pub async fn check_expiry(State(state): State<AppState>) -> AppResult<Json<ExpirySweepResponse>> {
    let today = Utc::now().date_naive();
    let expiry = ExpiryService::new(state.db.clone());
    let notifier = NotificationService::new(state.db, &state.config);

    let results = expiry.scan_all(today).await?;

    let mut alerts_created = 0;
    let mut emails_sent = 0;
    let users_scanned = results.len();

    for scanned in results {
        alerts_created += scanned.alerts.len();

        if scanned.notify && !scanned.alerts.is_empty() {
            let alert_ids: Vec<_> = scanned.alerts.iter().map(|a| a.id).collect();
            match notifier
                .notify_expiry_alerts(scanned.user_id, &alert_ids, today)
                .await
            {
                Ok(true) => emails_sent += 1,
                Ok(false) => {}
                // A failed email must not fail the scan
                Err(e) => tracing::warn!(
                    user_id = %scanned.user_id,
                    "Expiry notification failed: {}",
                    e
                ),
            }
        }
    }

    Ok(Json(ExpirySweepResponse {
        users_scanned,
        alerts_created,
        emails_sent,
    }))
}

/// Run shopping list generation for every active user
pub async fn generate_lists(
    State(state): State<AppState>,
) -> AppResult<Json<GenerationSweepResponse>> {
    let today = Utc::now().date_naive();
    let shopping = ShoppingService::new(state.db.clone());
    let notifier = NotificationService::new(state.db, &state.config);

    let results = shopping.generate_for_all(today).await?;

    let mut lists_created = 0;
    let mut emails_sent = 0;
    let users_processed = results.len();

    for generated in results {
        let Some(list) = &generated.outcome.list else {
            continue;
        };
        lists_created += 1;

        if generated.notify {
            match notifier
                .notify_shopping_list(generated.user_id, list.summary.list.id)
                .await
            {
                Ok(true) => emails_sent += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    user_id = %generated.user_id,
                    "Shopping list notification failed: {}",
                    e
                ),
            }
        }
    }

    Ok(Json(GenerationSweepResponse {
        users_processed,
        lists_created,
        emails_sent,
    }))
}

/// Purge old read alerts and archive old completed lists
pub async fn cleanup(State(state): State<AppState>) -> AppResult<Json<CleanupResponse>> {
    let now = Utc::now();
    let expiry = ExpiryService::new(state.db.clone());
    let shopping = ShoppingService::new(state.db);

    let alerts_deleted = expiry.cleanup_old_alerts(now).await?;
    let lists_archived = shopping.cleanup_old_lists(now).await?;

    Ok(Json(CleanupResponse {
        alerts_deleted,
        lists_archived,
    }))
}
