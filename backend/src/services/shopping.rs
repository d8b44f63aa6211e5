//! Shopping list service: lists, items, auto-generation, and completion
//!
//! Generation turns restock signals into suggested purchases; completion
//! feeds checked items back into the stock ledger as new batches. List
//! status follows draft → active → completed → archived, with archived
//! terminal.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::stock::create_batch_in_tx;
use shared::models::{
    suggest_restock_item, ItemPriority, ItemReason, ListStatus, ShoppingList, ShoppingListItem,
};
use shared::models::completion_percentage;
use shared::types::Unit;
use shared::validation::{de_quantity, de_quantity_opt};

/// Shopping list service
#[derive(Clone)]
pub struct ShoppingService {
    db: PgPool,
}

/// Input for creating a list
#[derive(Debug, Deserialize)]
pub struct CreateListInput {
    pub title: Option<String>,
    pub notes: Option<String>,
}

/// Input for adding an item manually
#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: Uuid,
    #[serde(deserialize_with = "de_quantity")]
    pub suggested_quantity: Decimal,
    pub priority: Option<ItemPriority>,
    #[serde(default, deserialize_with = "de_quantity_opt")]
    pub estimated_cost: Option<Decimal>,
    pub notes: Option<String>,
}

/// Input for recording what was actually bought
#[derive(Debug, Deserialize)]
pub struct SetActualInput {
    #[serde(default, deserialize_with = "de_quantity_opt")]
    pub actual_quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "de_quantity_opt")]
    pub actual_cost: Option<Decimal>,
}

/// Input for completing a list
#[derive(Debug, Deserialize)]
pub struct CompleteInput {
    #[serde(default)]
    pub auto_update_stock: bool,
}

/// A list with its derived completion figures
#[derive(Debug, Serialize)]
pub struct ShoppingListSummary {
    #[serde(flatten)]
    pub list: ShoppingList,
    pub total_items: i64,
    pub checked_items: i64,
    pub completion_percentage: i32,
    pub estimated_total_cost: Decimal,
}

/// An item with its product context
#[derive(Debug, Serialize)]
pub struct ItemWithProduct {
    #[serde(flatten)]
    pub item: ShoppingListItem,
    pub product_name: String,
    pub product_unit: Unit,
}

/// A list with its items
#[derive(Debug, Serialize)]
pub struct ShoppingListDetail {
    #[serde(flatten)]
    pub summary: ShoppingListSummary,
    pub items: Vec<ItemWithProduct>,
}

/// Result of an auto-generation run
#[derive(Debug, Serialize)]
pub struct GenerateOutcome {
    pub message: String,
    pub list_created: bool,
    pub item_count: usize,
    pub list: Option<ShoppingListDetail>,
}

/// Per-user result of the periodic generation sweep
#[derive(Debug, Serialize)]
pub struct GeneratedForUser {
    pub user_id: Uuid,
    /// Whether the user opted into email notifications
    pub notify: bool,
    pub outcome: GenerateOutcome,
}

/// Result of completing a list
#[derive(Debug, Serialize)]
pub struct CompleteOutcome {
    pub status: ListStatus,
    pub stock_updated: bool,
    pub batches_created: i64,
}

/// List row with aggregated item figures
#[derive(Debug, sqlx::FromRow)]
struct ListRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    status: String,
    is_auto_generated: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    total_items: i64,
    checked_items: i64,
    estimated_total_cost: Decimal,
}

const LIST_SELECT: &str = r#"
    SELECT l.id, l.user_id, l.title, l.status, l.is_auto_generated, l.notes,
           l.created_at, l.updated_at, l.completed_at,
           COUNT(i.id) AS total_items,
           COUNT(i.id) FILTER (WHERE i.is_checked) AS checked_items,
           COALESCE(SUM(i.estimated_cost), 0) AS estimated_total_cost
    FROM shopping_lists l
    LEFT JOIN shopping_list_items i ON i.shopping_list_id = l.id
"#;

fn map_list(row: ListRow) -> AppResult<ShoppingListSummary> {
    let status = ListStatus::from_str(&row.status)
        .ok_or_else(|| AppError::Internal(format!("Unknown list status: {}", row.status)))?;
    Ok(ShoppingListSummary {
        list: ShoppingList {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            status,
            is_auto_generated: row.is_auto_generated,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        },
        total_items: row.total_items,
        checked_items: row.checked_items,
        completion_percentage: completion_percentage(row.total_items, row.checked_items),
        estimated_total_cost: row.estimated_total_cost,
    })
}

/// Item row with product context and default location
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    shopping_list_id: Uuid,
    product_id: Uuid,
    suggested_quantity: Decimal,
    actual_quantity: Option<Decimal>,
    priority: String,
    reason: String,
    estimated_cost: Option<Decimal>,
    actual_cost: Option<Decimal>,
    is_checked: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    product_name: String,
    product_unit: String,
    default_location_id: Option<Uuid>,
}

const ITEM_SELECT: &str = r#"
    SELECT i.id, i.shopping_list_id, i.product_id, i.suggested_quantity, i.actual_quantity,
           i.priority, i.reason, i.estimated_cost, i.actual_cost, i.is_checked, i.notes,
           i.created_at, i.updated_at,
           p.name AS product_name, p.unit AS product_unit, p.default_location_id
    FROM shopping_list_items i
    JOIN products p ON p.id = i.product_id
"#;

fn map_item(row: ItemRow) -> AppResult<(ItemWithProduct, Option<Uuid>)> {
    let priority = ItemPriority::from_str(&row.priority)
        .ok_or_else(|| AppError::Internal(format!("Unknown item priority: {}", row.priority)))?;
    let reason = ItemReason::from_str(&row.reason)
        .ok_or_else(|| AppError::Internal(format!("Unknown item reason: {}", row.reason)))?;
    let item = ShoppingListItem {
        id: row.id,
        shopping_list_id: row.shopping_list_id,
        product_id: row.product_id,
        suggested_quantity: row.suggested_quantity,
        actual_quantity: row.actual_quantity,
        priority,
        reason,
        estimated_cost: row.estimated_cost,
        actual_cost: row.actual_cost,
        is_checked: row.is_checked,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    };
    Ok((
        ItemWithProduct {
            item,
            product_name: row.product_name,
            product_unit: Unit::from_str(&row.product_unit).unwrap_or_default(),
        },
        row.default_location_id,
    ))
}

impl ShoppingService {
    /// Create a new ShoppingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Lists
    // ========================================================================

    /// List the shopping lists of a user, newest first
    pub async fn list_lists(
        &self,
        user_id: Uuid,
        status: Option<ListStatus>,
    ) -> AppResult<Vec<ShoppingListSummary>> {
        let rows = sqlx::query_as::<_, ListRow>(&format!(
            "{} WHERE l.user_id = $1 AND ($2::varchar IS NULL OR l.status = $2) \
             GROUP BY l.id ORDER BY l.created_at DESC",
            LIST_SELECT
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_list).collect()
    }

    /// Create an empty draft list
    pub async fn create_list(
        &self,
        user_id: Uuid,
        input: CreateListInput,
    ) -> AppResult<ShoppingListSummary> {
        let title = input
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Shopping list".to_string());

        let list_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO shopping_lists (user_id, title, status, is_auto_generated, notes)
            VALUES ($1, $2, 'draft', false, $3)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&title)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        self.get_summary(user_id, list_id).await
    }

    /// Get a list with its completion figures
    pub async fn get_summary(&self, user_id: Uuid, list_id: Uuid) -> AppResult<ShoppingListSummary> {
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "{} WHERE l.id = $1 AND l.user_id = $2 GROUP BY l.id",
            LIST_SELECT
        ))
        .bind(list_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Shopping list".to_string()))?;

        map_list(row)
    }

    /// Get a list with its items, most urgent first
    pub async fn get_list(&self, user_id: Uuid, list_id: Uuid) -> AppResult<ShoppingListDetail> {
        let summary = self.get_summary(user_id, list_id).await?;

        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "{} WHERE i.shopping_list_id = $1",
            ITEM_SELECT
        ))
        .bind(list_id)
        .fetch_all(&self.db)
        .await?;

        let mut items = rows
            .into_iter()
            .map(|r| map_item(r).map(|(item, _)| item))
            .collect::<AppResult<Vec<_>>>()?;

        items.sort_by(|a, b| {
            b.item
                .priority
                .rank()
                .cmp(&a.item.priority.rank())
                .then_with(|| a.product_name.cmp(&b.product_name))
        });

        Ok(ShoppingListDetail { summary, items })
    }

    /// Delete a list; only drafts can be deleted
    pub async fn delete_list(&self, user_id: Uuid, list_id: Uuid) -> AppResult<()> {
        let summary = self.get_summary(user_id, list_id).await?;
        if summary.list.status != ListStatus::Draft {
            return Err(AppError::InvalidStateTransition(format!(
                "Only draft lists can be deleted, this list is {}",
                summary.list.status.as_str()
            )));
        }

        sqlx::query("DELETE FROM shopping_lists WHERE id = $1 AND user_id = $2")
            .bind(list_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Move a list to a new status, enforcing the state machine
    async fn transition(
        &self,
        user_id: Uuid,
        list_id: Uuid,
        to: ListStatus,
    ) -> AppResult<ShoppingListSummary> {
        let summary = self.get_summary(user_id, list_id).await?;
        let from = summary.list.status;

        if !from.can_transition(to) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot move a {} list to {}",
                from.as_str(),
                to.as_str()
            )));
        }

        sqlx::query(
            "UPDATE shopping_lists SET status = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(to.as_str())
        .bind(list_id)
        .execute(&self.db)
        .await?;

        self.get_summary(user_id, list_id).await
    }

    /// Activate a draft list
    pub async fn activate(&self, user_id: Uuid, list_id: Uuid) -> AppResult<ShoppingListSummary> {
        self.transition(user_id, list_id, ListStatus::Active).await
    }

    /// Archive an active or completed list
    pub async fn archive(&self, user_id: Uuid, list_id: Uuid) -> AppResult<ShoppingListSummary> {
        self.transition(user_id, list_id, ListStatus::Archived).await
    }

    // ========================================================================
    // Auto-generation
    // ========================================================================

    /// Generate a shopping list from the user's restock state.
    ///
    /// Every auto-add product at zero stock or below threshold gets one item;
    /// a run that produces no items discards the list again and reports that
    /// no restock is needed.
    pub async fn generate(&self, user_id: Uuid, today: NaiveDate) -> AppResult<GenerateOutcome> {
        let mut tx = self.db.begin().await?;

        let list_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO shopping_lists (user_id, title, status, is_auto_generated)
            VALUES ($1, $2, 'active', true)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(format!("Automatic list - {}", today.format("%d/%m/%Y")))
        .fetch_one(&mut *tx)
        .await?;

        let states = sqlx::query_as::<_, (Uuid, Decimal, Decimal)>(
            r#"
            SELECT p.id, p.threshold, COALESCE(SUM(b.quantity), 0)
            FROM products p
            LEFT JOIN stock_batches b ON b.product_id = p.id
            WHERE p.user_id = $1 AND p.auto_add_to_list = true
            GROUP BY p.id, p.threshold
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut item_count = 0usize;
        for (product_id, threshold, total_stock) in states {
            let Some(suggestion) = suggest_restock_item(total_stock, threshold) else {
                continue;
            };

            sqlx::query(
                r#"
                INSERT INTO shopping_list_items
                    (shopping_list_id, product_id, suggested_quantity, priority, reason)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(list_id)
            .bind(product_id)
            .bind(suggestion.quantity)
            .bind(suggestion.priority.as_str())
            .bind(suggestion.reason.as_str())
            .execute(&mut *tx)
            .await?;

            item_count += 1;
        }

        if item_count == 0 {
            sqlx::query("DELETE FROM shopping_lists WHERE id = $1")
                .bind(list_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            return Ok(GenerateOutcome {
                message: "No restock needed".to_string(),
                list_created: false,
                item_count: 0,
                list: None,
            });
        }

        tx.commit().await?;

        let list = self.get_list(user_id, list_id).await?;
        Ok(GenerateOutcome {
            message: format!("List generated with {} items", item_count),
            list_created: true,
            item_count,
            list: Some(list),
        })
    }

    /// Run generation for every active user; used by the periodic task
    pub async fn generate_for_all(&self, today: NaiveDate) -> AppResult<Vec<GeneratedForUser>> {
        let users = sqlx::query_as::<_, (Uuid, bool)>(
            "SELECT id, notification_email FROM users WHERE is_active = true",
        )
        .fetch_all(&self.db)
        .await?;

        let mut results = Vec::with_capacity(users.len());
        for (user_id, notify) in users {
            let outcome = self.generate(user_id, today).await?;
            results.push(GeneratedForUser {
                user_id,
                notify,
                outcome,
            });
        }

        Ok(results)
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Add an item to a list manually.
    ///
    /// A product can appear only once per list; a duplicate is a conflict.
    pub async fn add_item(
        &self,
        user_id: Uuid,
        list_id: Uuid,
        input: AddItemInput,
    ) -> AppResult<ItemWithProduct> {
        if input.suggested_quantity <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "suggested_quantity".to_string(),
                message: "Quantity must be positive".to_string(),
                message_fr: "La quantité doit être positive".to_string(),
            });
        }

        // List must exist and belong to the user
        self.get_summary(user_id, list_id).await?;

        let product_owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND user_id = $2)",
        )
        .bind(input.product_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        if !product_owned {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM shopping_list_items \
             WHERE shopping_list_id = $1 AND product_id = $2)",
        )
        .bind(list_id)
        .bind(input.product_id)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::Conflict {
                resource: "shopping_list_item".to_string(),
                message: "This product is already in the list".to_string(),
                message_fr: "Ce produit est déjà dans la liste".to_string(),
            });
        }

        let item_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO shopping_list_items
                (shopping_list_id, product_id, suggested_quantity, priority, reason,
                 estimated_cost, notes)
            VALUES ($1, $2, $3, $4, 'manual', $5, $6)
            RETURNING id
            "#,
        )
        .bind(list_id)
        .bind(input.product_id)
        .bind(input.suggested_quantity)
        .bind(input.priority.unwrap_or_default().as_str())
        .bind(input.estimated_cost)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        self.get_item(user_id, item_id).await
    }

    /// Get one item
    pub async fn get_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<ItemWithProduct> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "{} JOIN shopping_lists l ON l.id = i.shopping_list_id \
             WHERE i.id = $1 AND l.user_id = $2",
            ITEM_SELECT
        ))
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Shopping list item".to_string()))?;

        map_item(row).map(|(item, _)| item)
    }

    /// Check or uncheck an item
    pub async fn toggle_check(&self, user_id: Uuid, item_id: Uuid) -> AppResult<ItemWithProduct> {
        let result = sqlx::query(
            r#"
            UPDATE shopping_list_items i
            SET is_checked = NOT i.is_checked, updated_at = NOW()
            FROM shopping_lists l
            WHERE i.id = $1 AND l.id = i.shopping_list_id AND l.user_id = $2
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Shopping list item".to_string()));
        }

        self.get_item(user_id, item_id).await
    }

    /// Record what was actually bought; setting a quantity checks the item
    pub async fn set_actual(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        input: SetActualInput,
    ) -> AppResult<ItemWithProduct> {
        let current = self.get_item(user_id, item_id).await?;

        let actual_quantity = input.actual_quantity.or(current.item.actual_quantity);
        let actual_cost = input.actual_cost.or(current.item.actual_cost);
        let is_checked = current.item.is_checked || input.actual_quantity.is_some();

        sqlx::query(
            r#"
            UPDATE shopping_list_items
            SET actual_quantity = $1, actual_cost = $2, is_checked = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(actual_quantity)
        .bind(actual_cost)
        .bind(is_checked)
        .bind(item_id)
        .execute(&self.db)
        .await?;

        self.get_item(user_id, item_id).await
    }

    /// Remove an item from a list
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM shopping_list_items i
            USING shopping_lists l
            WHERE i.id = $1 AND l.id = i.shopping_list_id AND l.user_id = $2
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Shopping list item".to_string()));
        }

        Ok(())
    }

    // ========================================================================
    // Completion
    // ========================================================================

    /// Complete a list, optionally feeding checked items back into stock.
    ///
    /// Each checked item opens a new batch at the product's default location
    /// with a paired IN movement; the whole completion is one transaction.
    pub async fn complete(
        &self,
        user_id: Uuid,
        list_id: Uuid,
        input: CompleteInput,
        now: DateTime<Utc>,
    ) -> AppResult<CompleteOutcome> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT status, title FROM shopping_lists WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(list_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Shopping list".to_string()))?;

        let (status_raw, title) = row;
        let status = ListStatus::from_str(&status_raw)
            .ok_or_else(|| AppError::Internal(format!("Unknown list status: {}", status_raw)))?;

        if !status.can_transition(ListStatus::Completed) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot complete a {} list",
                status.as_str()
            )));
        }

        sqlx::query(
            "UPDATE shopping_lists SET status = 'completed', completed_at = $1, updated_at = NOW() \
             WHERE id = $2",
        )
        .bind(now)
        .bind(list_id)
        .execute(&mut *tx)
        .await?;

        let mut batches_created = 0i64;

        if input.auto_update_stock {
            let rows = sqlx::query_as::<_, ItemRow>(&format!(
                "{} WHERE i.shopping_list_id = $1 AND i.is_checked = true",
                ITEM_SELECT
            ))
            .bind(list_id)
            .fetch_all(&mut *tx)
            .await?;

            let movement_note = format!("Purchase - list: {}", title);

            for row in rows {
                let (item, default_location_id) = map_item(row)?;
                create_batch_in_tx(
                    &mut tx,
                    user_id,
                    item.item.product_id,
                    item.item.quantity_to_add(),
                    default_location_id,
                    None,
                    now.date_naive(),
                    item.item.actual_cost,
                    None,
                    None,
                    &movement_note,
                    now,
                )
                .await?;
                batches_created += 1;
            }
        }

        tx.commit().await?;

        Ok(CompleteOutcome {
            status: ListStatus::Completed,
            stock_updated: input.auto_update_stock,
            batches_created,
        })
    }

    /// Archive completed lists older than 90 days, across all users
    pub async fn cleanup_old_lists(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let threshold = now - Duration::days(90);
        let result = sqlx::query(
            "UPDATE shopping_lists SET status = 'archived', updated_at = NOW() \
             WHERE status = 'completed' AND completed_at < $1",
        )
        .bind(threshold)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
