//! Product catalog service and restock evaluation
//!
//! The catalog is read-only to the ledger: stock totals are derived from
//! batches at evaluation time and never written back onto products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{Category, CategoryKind, Location, LocationKind, Product, RestockState};
use shared::types::Unit;
use shared::validation::{de_quantity_opt, validate_threshold};

/// Product service for catalog management and restock evaluation
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub unit: Unit,
    pub default_location_id: Option<Uuid>,
    #[serde(default, deserialize_with = "de_quantity_opt")]
    pub threshold: Option<Decimal>,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub notes: Option<String>,
    pub auto_add_to_list: Option<bool>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub unit: Option<Unit>,
    pub default_location_id: Option<Uuid>,
    #[serde(default, deserialize_with = "de_quantity_opt")]
    pub threshold: Option<Decimal>,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub notes: Option<String>,
    pub auto_add_to_list: Option<bool>,
}

/// Input for creating a storage location
#[derive(Debug, Deserialize)]
pub struct CreateLocationInput {
    pub name: LocationKind,
    pub description: Option<String>,
}

/// A product with its derived stock state
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithStock {
    #[serde(flatten)]
    pub product: Product,
    pub total_stock: Decimal,
    pub is_below_threshold: bool,
    pub needs_restock: bool,
}

/// Product row including the aggregated batch total
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    category_id: Uuid,
    unit: String,
    default_location_id: Option<Uuid>,
    threshold: Decimal,
    barcode: Option<String>,
    brand: Option<String>,
    notes: Option<String>,
    auto_add_to_list: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    total_stock: Decimal,
}

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.name, p.category_id, p.unit, p.default_location_id,
           p.threshold, p.barcode, p.brand, p.notes, p.auto_add_to_list,
           p.created_at, p.updated_at,
           COALESCE((SELECT SUM(b.quantity) FROM stock_batches b WHERE b.product_id = p.id), 0) AS total_stock
    FROM products p
"#;

fn map_product(row: ProductRow) -> ProductWithStock {
    let product = Product {
        id: row.id,
        user_id: row.user_id,
        name: row.name,
        category_id: row.category_id,
        unit: Unit::from_str(&row.unit).unwrap_or_default(),
        default_location_id: row.default_location_id,
        threshold: row.threshold,
        barcode: row.barcode,
        brand: row.brand,
        notes: row.notes,
        auto_add_to_list: row.auto_add_to_list,
        created_at: row.created_at,
        updated_at: row.updated_at,
    };
    let state = RestockState::evaluate(product.id, row.total_stock, product.threshold);
    ProductWithStock {
        product,
        total_stock: state.total_stock,
        is_below_threshold: state.is_below_threshold,
        needs_restock: state.needs_restock,
    }
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Categories
    // ========================================================================

    /// List the fixed product categories
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, (Uuid, String, Option<String>, String, DateTime<Utc>)>(
            "SELECT id, name, icon, color, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| {
                CategoryKind::from_str(&r.1).map(|kind| Category {
                    id: r.0,
                    name: kind,
                    icon: r.2,
                    color: r.3,
                    created_at: r.4,
                })
            })
            .collect())
    }

    // ========================================================================
    // Locations
    // ========================================================================

    /// List the storage locations of a user
    pub async fn list_locations(&self, user_id: Uuid) -> AppResult<Vec<Location>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, Option<String>, DateTime<Utc>)>(
            "SELECT id, user_id, name, description, created_at FROM locations WHERE user_id = $1 ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| {
                LocationKind::from_str(&r.2).map(|kind| Location {
                    id: r.0,
                    user_id: r.1,
                    name: kind,
                    description: r.3,
                    created_at: r.4,
                })
            })
            .collect())
    }

    /// Create a storage location
    pub async fn create_location(
        &self,
        user_id: Uuid,
        input: CreateLocationInput,
    ) -> AppResult<Location> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM locations WHERE user_id = $1 AND name = $2",
        )
        .bind(user_id)
        .bind(input.name.as_str())
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("location".to_string()));
        }

        let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO locations (user_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, created_at
            "#,
        )
        .bind(user_id)
        .bind(input.name.as_str())
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;

        Ok(Location {
            id: row.0,
            user_id,
            name: input.name,
            description: input.description,
            created_at: row.1,
        })
    }

    /// Delete a storage location
    pub async fn delete_location(&self, user_id: Uuid, location_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1 AND user_id = $2")
            .bind(location_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Location".to_string()));
        }

        Ok(())
    }

    // ========================================================================
    // Products
    // ========================================================================

    /// Create a product
    pub async fn create_product(
        &self,
        user_id: Uuid,
        input: CreateProductInput,
    ) -> AppResult<ProductWithStock> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Product name cannot be empty".to_string(),
                message_fr: "Le nom du produit ne peut pas être vide".to_string(),
            });
        }

        let threshold = input.threshold.unwrap_or(Decimal::ONE);
        if let Err(msg) = validate_threshold(threshold) {
            return Err(AppError::Validation {
                field: "threshold".to_string(),
                message: msg.to_string(),
                message_fr: "Le seuil ne peut pas être négatif".to_string(),
            });
        }

        // Name is unique per user
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE user_id = $1 AND name = $2",
        )
        .bind(user_id)
        .bind(&input.name)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("product name".to_string()));
        }

        let product_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO products (user_id, name, category_id, unit, default_location_id,
                                  threshold, barcode, brand, notes, auto_add_to_list)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&input.name)
        .bind(input.category_id)
        .bind(input.unit.as_str())
        .bind(input.default_location_id)
        .bind(threshold)
        .bind(&input.barcode)
        .bind(&input.brand)
        .bind(&input.notes)
        .bind(input.auto_add_to_list.unwrap_or(true))
        .fetch_one(&self.db)
        .await?;

        self.get_product(user_id, product_id).await
    }

    /// Get a product with its stock state
    pub async fn get_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<ProductWithStock> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "{} WHERE p.id = $1 AND p.user_id = $2",
            PRODUCT_SELECT
        ))
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(map_product(row))
    }

    /// List all products of a user with their stock state
    pub async fn list_products(&self, user_id: Uuid) -> AppResult<Vec<ProductWithStock>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{} WHERE p.user_id = $1 ORDER BY p.name",
            PRODUCT_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(map_product).collect())
    }

    /// Update a product
    pub async fn update_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<ProductWithStock> {
        let current = self.get_product(user_id, product_id).await?.product;

        let name = input.name.unwrap_or(current.name);
        let category_id = input.category_id.unwrap_or(current.category_id);
        let unit = input.unit.unwrap_or(current.unit);
        let default_location_id = input.default_location_id.or(current.default_location_id);
        let threshold = input.threshold.unwrap_or(current.threshold);
        let barcode = input.barcode.or(current.barcode);
        let brand = input.brand.or(current.brand);
        let notes = input.notes.or(current.notes);
        let auto_add_to_list = input.auto_add_to_list.unwrap_or(current.auto_add_to_list);

        if let Err(msg) = validate_threshold(threshold) {
            return Err(AppError::Validation {
                field: "threshold".to_string(),
                message: msg.to_string(),
                message_fr: "Le seuil ne peut pas être négatif".to_string(),
            });
        }

        sqlx::query(
            r#"
            UPDATE products
            SET name = $1, category_id = $2, unit = $3, default_location_id = $4,
                threshold = $5, barcode = $6, brand = $7, notes = $8,
                auto_add_to_list = $9, updated_at = NOW()
            WHERE id = $10 AND user_id = $11
            "#,
        )
        .bind(&name)
        .bind(category_id)
        .bind(unit.as_str())
        .bind(default_location_id)
        .bind(threshold)
        .bind(&barcode)
        .bind(&brand)
        .bind(&notes)
        .bind(auto_add_to_list)
        .bind(product_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        self.get_product(user_id, product_id).await
    }

    /// Delete a product
    pub async fn delete_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND user_id = $2")
            .bind(product_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        Ok(())
    }

    // ========================================================================
    // Restock evaluation
    // ========================================================================

    /// Evaluate the restock state of every product of a user
    pub async fn evaluate_restock(&self, user_id: Uuid) -> AppResult<Vec<RestockState>> {
        let rows = sqlx::query_as::<_, (Uuid, Decimal, Decimal)>(
            r#"
            SELECT p.id, p.threshold,
                   COALESCE(SUM(b.quantity), 0) AS total_stock
            FROM products p
            LEFT JOIN stock_batches b ON b.product_id = p.id
            WHERE p.user_id = $1
            GROUP BY p.id, p.threshold
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, threshold, total)| RestockState::evaluate(id, total, threshold))
            .collect())
    }

    /// Products that need restocking (auto-add products only)
    pub async fn to_restock(&self, user_id: Uuid) -> AppResult<Vec<ProductWithStock>> {
        let products = self.list_products(user_id).await?;
        Ok(products
            .into_iter()
            .filter(|p| p.product.auto_add_to_list && p.needs_restock)
            .collect())
    }

    /// Products below threshold but not at zero
    pub async fn low_stock(&self, user_id: Uuid) -> AppResult<Vec<ProductWithStock>> {
        let products = self.list_products(user_id).await?;
        Ok(products
            .into_iter()
            .filter(|p| p.is_below_threshold && p.total_stock > Decimal::ZERO)
            .collect())
    }

    /// Products with no stock at all
    pub async fn out_of_stock(&self, user_id: Uuid) -> AppResult<Vec<ProductWithStock>> {
        let products = self.list_products(user_id).await?;
        Ok(products
            .into_iter()
            .filter(|p| p.total_stock == Decimal::ZERO)
            .collect())
    }
}
