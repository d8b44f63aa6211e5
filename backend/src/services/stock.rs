//! Stock ledger service: batches, movements, and consumption allocation
//!
//! Batch quantities are never written directly. Every change goes through a
//! movement, and the quantity update and the movement insert happen in one
//! transaction with the batch row locked; concurrent operations on the same
//! batch serialize on that lock.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{
    consume_order, plan_allocation, MovementType, RestockState, StockBatch, StockMovement,
};
use shared::validation::{de_quantity, de_quantity_opt};

/// Stock ledger service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Input for creating a stock batch
#[derive(Debug, Deserialize)]
pub struct CreateBatchInput {
    pub product_id: Uuid,
    #[serde(deserialize_with = "de_quantity")]
    pub quantity: Decimal,
    pub location_id: Option<Uuid>,
    pub expiry_date: Option<NaiveDate>,
    pub purchase_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_quantity_opt")]
    pub purchase_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

/// Input for recording a movement
#[derive(Debug, Deserialize)]
pub struct RecordMovementInput {
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    #[serde(deserialize_with = "de_quantity")]
    pub quantity: Decimal,
    pub note: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Input for consuming stock
#[derive(Debug, Deserialize)]
pub struct ConsumeInput {
    #[serde(deserialize_with = "de_quantity")]
    pub quantity: Decimal,
    pub note: Option<String>,
}

/// Result of a multi-batch consumption
#[derive(Debug, Serialize)]
pub struct ConsumeOutcome {
    pub consumed: Decimal,
    pub movements: Vec<StockMovement>,
}

/// Result of a single-batch consumption
#[derive(Debug, Serialize)]
pub struct ConsumeBatchOutcome {
    pub remaining: Decimal,
    pub movement: StockMovement,
}

/// Filters for listing movements
#[derive(Debug, Default, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
}

/// Filters for listing batches
#[derive(Debug, Default, Deserialize)]
pub struct BatchFilter {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

/// Global stock overview for the dashboard
#[derive(Debug, Serialize)]
pub struct StockSummary {
    pub total_products: i64,
    pub total_batches: i64,
    pub products_below_threshold: i64,
    pub products_out_of_stock: i64,
    pub batches_expiring_soon: i64,
    pub batches_expired: i64,
    pub total_value: Decimal,
}

/// Consumption aggregate for one product
#[derive(Debug, Serialize)]
pub struct ConsumptionStat {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_consumed: Decimal,
    pub movement_count: i64,
}

/// Batch row shape shared by the queries below
type BatchRow = (
    Uuid,
    Uuid,
    Decimal,
    Option<Uuid>,
    Option<NaiveDate>,
    NaiveDate,
    Option<Decimal>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

const BATCH_COLUMNS: &str = "b.id, b.product_id, b.quantity, b.location_id, b.expiry_date, \
     b.purchase_date, b.purchase_price, b.supplier, b.notes, b.created_at, b.updated_at";

fn map_batch(row: BatchRow) -> StockBatch {
    StockBatch {
        id: row.0,
        product_id: row.1,
        quantity: row.2,
        location_id: row.3,
        expiry_date: row.4,
        purchase_date: row.5,
        purchase_price: row.6,
        supplier: row.7,
        notes: row.8,
        created_at: row.9,
        updated_at: row.10,
    }
}

/// Movement row shape shared by the queries below
type MovementRow = (
    Uuid,
    Uuid,
    Option<Uuid>,
    String,
    Decimal,
    DateTime<Utc>,
    Option<String>,
    Uuid,
    DateTime<Utc>,
);

const MOVEMENT_COLUMNS: &str =
    "m.id, m.product_id, m.batch_id, m.type, m.quantity, m.date, m.note, m.user_id, m.created_at";

fn map_movement(row: MovementRow) -> AppResult<StockMovement> {
    let movement_type = MovementType::from_str(&row.3)
        .ok_or_else(|| AppError::Internal(format!("Unknown movement type: {}", row.3)))?;
    Ok(StockMovement {
        id: row.0,
        product_id: row.1,
        batch_id: row.2,
        movement_type,
        quantity: row.4,
        date: row.5,
        note: row.6,
        user_id: row.7,
        created_at: row.8,
    })
}

fn positive_quantity(quantity: Decimal) -> AppResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(AppError::Validation {
            field: "quantity".to_string(),
            message: "Quantity must be positive".to_string(),
            message_fr: "La quantité doit être positive".to_string(),
        });
    }
    Ok(())
}

/// Insert one movement row inside an open transaction
async fn insert_movement_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    batch_id: Option<Uuid>,
    movement_type: MovementType,
    quantity: Decimal,
    date: DateTime<Utc>,
    note: Option<&str>,
    user_id: Uuid,
) -> AppResult<StockMovement> {
    let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        r#"
        INSERT INTO stock_movements (product_id, batch_id, type, quantity, date, note, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, created_at
        "#,
    )
    .bind(product_id)
    .bind(batch_id)
    .bind(movement_type.as_str())
    .bind(quantity)
    .bind(date)
    .bind(note)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(StockMovement {
        id: row.0,
        product_id,
        batch_id,
        movement_type,
        quantity,
        date,
        note: note.map(|n| n.to_string()),
        user_id,
        created_at: row.1,
    })
}

/// Create a batch at quantity zero and bring it to its initial quantity with
/// a paired IN movement, inside the caller's transaction.
///
/// Shopping-list completion reuses this so purchased items open traceable
/// lots with the same audit trail as directly created batches.
pub(crate) async fn create_batch_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    location_id: Option<Uuid>,
    expiry_date: Option<NaiveDate>,
    purchase_date: NaiveDate,
    purchase_price: Option<Decimal>,
    supplier: Option<&str>,
    notes: Option<&str>,
    movement_note: &str,
    now: DateTime<Utc>,
) -> AppResult<(StockBatch, StockMovement)> {
    let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>, DateTime<Utc>)>(
        r#"
        INSERT INTO stock_batches (product_id, quantity, location_id, expiry_date,
                                   purchase_date, purchase_price, supplier, notes)
        VALUES ($1, 0, $2, $3, $4, $5, $6, $7)
        RETURNING id, created_at, updated_at
        "#,
    )
    .bind(product_id)
    .bind(location_id)
    .bind(expiry_date)
    .bind(purchase_date)
    .bind(purchase_price)
    .bind(supplier)
    .bind(notes)
    .fetch_one(&mut **tx)
    .await?;

    let batch_id = row.0;

    let movement = insert_movement_tx(
        tx,
        product_id,
        Some(batch_id),
        MovementType::In,
        quantity,
        now,
        Some(movement_note),
        user_id,
    )
    .await?;

    sqlx::query("UPDATE stock_batches SET quantity = $1, updated_at = NOW() WHERE id = $2")
        .bind(quantity)
        .bind(batch_id)
        .execute(&mut **tx)
        .await?;

    Ok((
        StockBatch {
            id: batch_id,
            product_id,
            quantity,
            location_id,
            expiry_date,
            purchase_date,
            purchase_price,
            supplier: supplier.map(|s| s.to_string()),
            notes: notes.map(|s| s.to_string()),
            created_at: row.1,
            updated_at: row.2,
        },
        movement,
    ))
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Check that a product belongs to the user
    async fn assert_product_owned(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND user_id = $2)",
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Ledger writes
    // ========================================================================

    /// Create a new stock batch.
    ///
    /// The batch starts at quantity zero and receives one IN movement of the
    /// initial quantity; this is the only sanctioned way to introduce stock.
    pub async fn create_batch(
        &self,
        user_id: Uuid,
        input: CreateBatchInput,
        now: DateTime<Utc>,
    ) -> AppResult<StockBatch> {
        positive_quantity(input.quantity)?;
        self.assert_product_owned(user_id, input.product_id).await?;

        if let Some(location_id) = input.location_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM locations WHERE id = $1 AND user_id = $2)",
            )
            .bind(location_id)
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Location".to_string()));
            }
        }

        let purchase_date = input.purchase_date.unwrap_or_else(|| now.date_naive());

        let mut tx = self.db.begin().await?;
        let (batch, _movement) = create_batch_in_tx(
            &mut tx,
            user_id,
            input.product_id,
            input.quantity,
            input.location_id,
            input.expiry_date,
            purchase_date,
            input.purchase_price,
            input.supplier.as_deref(),
            input.notes.as_deref(),
            "Batch created",
            now,
        )
        .await?;
        tx.commit().await?;

        Ok(batch)
    }

    /// Record a stock movement.
    ///
    /// When a batch is given, the batch quantity update and the movement
    /// insert succeed or fail together. OUT movements cannot drive a batch
    /// below zero; ADJUST sets the absolute quantity.
    pub async fn record_movement(
        &self,
        user_id: Uuid,
        input: RecordMovementInput,
        now: DateTime<Utc>,
    ) -> AppResult<StockMovement> {
        positive_quantity(input.quantity)?;
        self.assert_product_owned(user_id, input.product_id).await?;

        let date = input.date.unwrap_or(now);

        let Some(batch_id) = input.batch_id else {
            // Movement without a batch: a plain ledger entry, no side effect
            let mut tx = self.db.begin().await?;
            let movement = insert_movement_tx(
                &mut tx,
                input.product_id,
                None,
                input.movement_type,
                input.quantity,
                date,
                input.note.as_deref(),
                user_id,
            )
            .await?;
            tx.commit().await?;
            return Ok(movement);
        };

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_scalar::<_, Decimal>(
            "SELECT quantity FROM stock_batches WHERE id = $1 AND product_id = $2 FOR UPDATE",
        )
        .bind(batch_id)
        .bind(input.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        let new_quantity = input.movement_type.apply(current, input.quantity);
        if new_quantity < Decimal::ZERO {
            return Err(AppError::InsufficientStock {
                requested: input.quantity,
                available: current,
            });
        }

        sqlx::query("UPDATE stock_batches SET quantity = $1, updated_at = NOW() WHERE id = $2")
            .bind(new_quantity)
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        let movement = insert_movement_tx(
            &mut tx,
            input.product_id,
            Some(batch_id),
            input.movement_type,
            input.quantity,
            date,
            input.note.as_deref(),
            user_id,
        )
        .await?;

        tx.commit().await?;
        Ok(movement)
    }

    // ========================================================================
    // Consumption
    // ========================================================================

    /// Consume a quantity of a product across its batches.
    ///
    /// Batches are drained nearest-expiry first, falling back to oldest
    /// purchase for non-perishables; one OUT movement is recorded per batch
    /// touched. The whole allocation is one transaction: a failure rolls back
    /// every movement of this call.
    pub async fn consume(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: ConsumeInput,
        now: DateTime<Utc>,
    ) -> AppResult<ConsumeOutcome> {
        positive_quantity(input.quantity)?;
        self.assert_product_owned(user_id, product_id).await?;

        let mut tx = self.db.begin().await?;

        // Lock candidates in id order so concurrent consumers acquire locks
        // deterministically; the consumption order is applied in memory.
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM stock_batches b WHERE b.product_id = $1 AND b.quantity > 0 \
             ORDER BY b.id FOR UPDATE",
            BATCH_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut batches: Vec<StockBatch> = rows.into_iter().map(map_batch).collect();
        let available: Decimal = batches.iter().map(|b| b.quantity).sum();

        if input.quantity > available {
            return Err(AppError::InsufficientStock {
                requested: input.quantity,
                available,
            });
        }

        batches.sort_by(consume_order);
        let plan = plan_allocation(&batches, input.quantity);

        let note = input.note.as_deref().unwrap_or("Consumption");
        let mut movements = Vec::with_capacity(plan.len());

        for step in &plan {
            sqlx::query(
                "UPDATE stock_batches SET quantity = quantity - $1, updated_at = NOW() WHERE id = $2",
            )
            .bind(step.quantity)
            .bind(step.batch_id)
            .execute(&mut *tx)
            .await?;

            let movement = insert_movement_tx(
                &mut tx,
                product_id,
                Some(step.batch_id),
                MovementType::Out,
                step.quantity,
                now,
                Some(note),
                user_id,
            )
            .await?;
            movements.push(movement);
        }

        tx.commit().await?;

        Ok(ConsumeOutcome {
            consumed: input.quantity,
            movements,
        })
    }

    /// Consume a quantity from one specific batch
    pub async fn consume_batch(
        &self,
        user_id: Uuid,
        batch_id: Uuid,
        input: ConsumeInput,
        now: DateTime<Utc>,
    ) -> AppResult<ConsumeBatchOutcome> {
        positive_quantity(input.quantity)?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT b.product_id, b.quantity
            FROM stock_batches b
            JOIN products p ON p.id = b.product_id
            WHERE b.id = $1 AND p.user_id = $2
            FOR UPDATE OF b
            "#,
        )
        .bind(batch_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        let (product_id, current) = row;

        if input.quantity > current {
            return Err(AppError::InsufficientStock {
                requested: input.quantity,
                available: current,
            });
        }

        sqlx::query(
            "UPDATE stock_batches SET quantity = quantity - $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(input.quantity)
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;

        let movement = insert_movement_tx(
            &mut tx,
            product_id,
            Some(batch_id),
            MovementType::Out,
            input.quantity,
            now,
            Some(input.note.as_deref().unwrap_or("Consumption")),
            user_id,
        )
        .await?;

        tx.commit().await?;

        Ok(ConsumeBatchOutcome {
            remaining: current - input.quantity,
            movement,
        })
    }

    // ========================================================================
    // Batch queries
    // ========================================================================

    /// Get one batch
    pub async fn get_batch(&self, user_id: Uuid, batch_id: Uuid) -> AppResult<StockBatch> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM stock_batches b JOIN products p ON p.id = b.product_id \
             WHERE b.id = $1 AND p.user_id = $2",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        Ok(map_batch(row))
    }

    /// List batches, optionally filtered by product or location
    pub async fn list_batches(
        &self,
        user_id: Uuid,
        filter: BatchFilter,
    ) -> AppResult<Vec<StockBatch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM stock_batches b JOIN products p ON p.id = b.product_id \
             WHERE p.user_id = $1 \
               AND ($2::uuid IS NULL OR b.product_id = $2) \
               AND ($3::uuid IS NULL OR b.location_id = $3) \
             ORDER BY b.expiry_date ASC NULLS LAST, b.created_at DESC",
            BATCH_COLUMNS
        ))
        .bind(user_id)
        .bind(filter.product_id)
        .bind(filter.location_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(map_batch).collect())
    }

    /// Batches expiring within the warning window
    pub async fn expiring_soon(
        &self,
        user_id: Uuid,
        today: NaiveDate,
        days: i64,
    ) -> AppResult<Vec<StockBatch>> {
        let limit_date = today + Duration::days(days);
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM stock_batches b JOIN products p ON p.id = b.product_id \
             WHERE p.user_id = $1 AND b.quantity > 0 \
               AND b.expiry_date IS NOT NULL AND b.expiry_date > $2 AND b.expiry_date <= $3 \
             ORDER BY b.expiry_date",
            BATCH_COLUMNS
        ))
        .bind(user_id)
        .bind(today)
        .bind(limit_date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(map_batch).collect())
    }

    /// Batches already past their expiry date
    pub async fn expired(&self, user_id: Uuid, today: NaiveDate) -> AppResult<Vec<StockBatch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM stock_batches b JOIN products p ON p.id = b.product_id \
             WHERE p.user_id = $1 AND b.quantity > 0 \
               AND b.expiry_date IS NOT NULL AND b.expiry_date < $2 \
             ORDER BY b.expiry_date",
            BATCH_COLUMNS
        ))
        .bind(user_id)
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(map_batch).collect())
    }

    /// Perishable batches to consume first, nearest expiry first
    pub async fn to_consume_first(&self, user_id: Uuid) -> AppResult<Vec<StockBatch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM stock_batches b JOIN products p ON p.id = b.product_id \
             WHERE p.user_id = $1 AND b.quantity > 0 AND b.expiry_date IS NOT NULL \
             ORDER BY b.expiry_date LIMIT 20",
            BATCH_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(map_batch).collect())
    }

    // ========================================================================
    // Movement queries
    // ========================================================================

    /// List movements, newest first
    pub async fn list_movements(
        &self,
        user_id: Uuid,
        filter: MovementFilter,
    ) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {} FROM stock_movements m JOIN products p ON p.id = m.product_id \
             WHERE p.user_id = $1 \
               AND ($2::uuid IS NULL OR m.product_id = $2) \
               AND ($3::uuid IS NULL OR m.batch_id = $3) \
               AND ($4::varchar IS NULL OR m.type = $4) \
             ORDER BY m.date DESC",
            MOVEMENT_COLUMNS
        ))
        .bind(user_id)
        .bind(filter.product_id)
        .bind(filter.batch_id)
        .bind(filter.movement_type.map(|t| t.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_movement).collect()
    }

    /// Movements of the last `days` days
    pub async fn recent_movements(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        days: i64,
    ) -> AppResult<Vec<StockMovement>> {
        let since = now - Duration::days(days);
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {} FROM stock_movements m JOIN products p ON p.id = m.product_id \
             WHERE p.user_id = $1 AND m.date >= $2 ORDER BY m.date DESC",
            MOVEMENT_COLUMNS
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_movement).collect()
    }

    // ========================================================================
    // Dashboard
    // ========================================================================

    /// Global stock overview
    pub async fn summary(
        &self,
        user_id: Uuid,
        today: NaiveDate,
        warn_days: i64,
    ) -> AppResult<StockSummary> {
        let total_products =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;

        let total_batches = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_batches b JOIN products p ON p.id = b.product_id \
             WHERE p.user_id = $1 AND b.quantity > 0",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let states = sqlx::query_as::<_, (Uuid, Decimal, Decimal)>(
            r#"
            SELECT p.id, p.threshold, COALESCE(SUM(b.quantity), 0)
            FROM products p
            LEFT JOIN stock_batches b ON b.product_id = p.id
            WHERE p.user_id = $1
            GROUP BY p.id, p.threshold
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut products_below_threshold = 0;
        let mut products_out_of_stock = 0;
        for (id, threshold, total) in states {
            let state = RestockState::evaluate(id, total, threshold);
            if state.is_below_threshold {
                products_below_threshold += 1;
            }
            if state.total_stock == Decimal::ZERO {
                products_out_of_stock += 1;
            }
        }

        let limit_date = today + Duration::days(warn_days);
        let (batches_expiring_soon, batches_expired) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*) FILTER (WHERE b.expiry_date > $2 AND b.expiry_date <= $3),
                   COUNT(*) FILTER (WHERE b.expiry_date < $2)
            FROM stock_batches b
            JOIN products p ON p.id = b.product_id
            WHERE p.user_id = $1 AND b.quantity > 0 AND b.expiry_date IS NOT NULL
            "#,
        )
        .bind(user_id)
        .bind(today)
        .bind(limit_date)
        .fetch_one(&self.db)
        .await?;

        let total_value = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(b.purchase_price), 0) FROM stock_batches b \
             JOIN products p ON p.id = b.product_id WHERE p.user_id = $1 AND b.quantity > 0",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(StockSummary {
            total_products,
            total_batches,
            products_below_threshold,
            products_out_of_stock,
            batches_expiring_soon,
            batches_expired,
            total_value,
        })
    }

    /// Most consumed products over the last `days` days
    pub async fn consumption_stats(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        days: i64,
    ) -> AppResult<Vec<ConsumptionStat>> {
        let since = now - Duration::days(days);
        let rows = sqlx::query_as::<_, (Uuid, String, Decimal, i64)>(
            r#"
            SELECT m.product_id, p.name, SUM(m.quantity) AS total_consumed, COUNT(*) AS movement_count
            FROM stock_movements m
            JOIN products p ON p.id = m.product_id
            WHERE p.user_id = $1 AND m.type = 'OUT' AND m.date >= $2
            GROUP BY m.product_id, p.name
            ORDER BY total_consumed DESC
            LIMIT 10
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ConsumptionStat {
                product_id: r.0,
                product_name: r.1,
                total_consumed: r.2,
                movement_count: r.3,
            })
            .collect())
    }
}
