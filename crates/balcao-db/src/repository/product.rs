//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - Exact-barcode lookup (the scan pipeline's resolution path)
//! - CRUD for seeding and stock maintenance
//!
//! ## Barcode Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Scanner emits: "7891234567890"                                     │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  get_by_barcode(account, "7891234567890")                           │
//! │       │                                                             │
//! │       ▼  exact match on idx_products_account_barcode, active only   │
//! │  Some(Product) → snapshot → cart                                    │
//! │  None          → "not found" cue at the terminal                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use balcao_core::Product;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

/// Fields for creating a catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub account_id: String,
    pub barcode: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Looks up an active product by exact barcode match.
    ///
    /// This is the scan pipeline's resolution path: keyed by the exact
    /// barcode string, scoped to the account. Inactive (soft-deleted)
    /// products resolve to `None`, which the terminal treats the same as
    /// an unknown barcode.
    pub async fn get_by_barcode(
        &self,
        account_id: &str,
        barcode: &str,
    ) -> DbResult<Option<Product>> {
        debug!(account_id = %account_id, barcode = %barcode, "Looking up product by barcode");

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, account_id, barcode, name, description,
                   price_cents, stock_quantity, is_active,
                   created_at, updated_at
            FROM products
            WHERE account_id = ?1 AND barcode = ?2 AND is_active = 1
            "#,
        )
        .bind(account_id)
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, account_id, barcode, name, description,
                   price_cents, stock_quantity, is_active,
                   created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// Duplicate barcodes within the account surface as
    /// [`DbError::UniqueViolation`].
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, barcode = %new.barcode, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, account_id, barcode, name, description,
                price_cents, stock_quantity, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)
            "#,
        )
        .bind(&id)
        .bind(&new.account_id)
        .bind(&new.barcode)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price_cents)
        .bind(new.stock_quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &id))
    }

    /// Adjusts the stock of a product by a signed delta.
    ///
    /// Used by the sale repository (negative delta inside the recording
    /// transaction) and by inventory corrections (either sign).
    pub async fn adjust_stock(&self, product_id: &str, delta: i64) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Deactivates a product (soft delete).
    pub async fn deactivate(&self, product_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }

    /// Lists active products for an account.
    pub async fn list_active(&self, account_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, account_id, barcode, name, description,
                   price_cents, stock_quantity, is_active,
                   created_at, updated_at
            FROM products
            WHERE account_id = ?1 AND is_active = 1
            ORDER BY name
            LIMIT ?2
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
