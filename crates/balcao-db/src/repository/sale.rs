//! # Sale Repository
//!
//! Server-side sale recording. The terminal submits barcodes and quantities
//! only; everything money-related is re-derived here.
//!
//! ## Recording Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Sale Recording                                │
//! │                                                                     │
//! │  SalePayload { items: [{barcode, qty}], total, method, customer }   │
//! │       │                                                             │
//! │       ▼  (single transaction)                                       │
//! │  1. Resolve each barcode against the catalog                        │
//! │     └── unknown/inactive barcode → rejected, nothing persisted      │
//! │  2. Re-derive unit prices and subtotal from the catalog             │
//! │     └── client total > catalog subtotal → rejected (tampering)      │
//! │  3. Decrement stock with a guarded UPDATE                           │
//! │     └── oversell → rejected, transaction rolls back                 │
//! │  4. Stamp the account's open register session, if any               │
//! │  5. INSERT sale + frozen-snapshot items                             │
//! │                                                                     │
//! │  The whole flow commits or nothing does: a failed sale leaves       │
//! │  stock, ledger and history exactly as they were.                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use balcao_core::{Product, Sale, SaleItem, SalePayload};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale from a checkout payload.
    ///
    /// ## Atomicity
    /// Catalog lookups, stock decrements, session stamping and the inserts
    /// all run in one transaction. Any rejection rolls the whole sale back;
    /// there is no partially recorded state for the terminal to retry over.
    pub async fn record_sale(
        &self,
        account_id: &str,
        operator_id: &str,
        payload: &SalePayload,
    ) -> DbResult<Sale> {
        if payload.items.is_empty() {
            return Err(DbError::invalid_state("sale has no items"));
        }

        debug!(
            account_id = %account_id,
            items = payload.items.len(),
            total_cents = payload.total_cents,
            "Recording sale"
        );

        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        // Resolve every barcode first; prices come from the catalog, not
        // from the client.
        let mut resolved: Vec<(Product, i64)> = Vec::with_capacity(payload.items.len());
        let mut subtotal_cents: i64 = 0;

        for item in &payload.items {
            if item.quantity <= 0 {
                return Err(DbError::invalid_state(format!(
                    "quantity for {} must be positive",
                    item.barcode
                )));
            }

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
            .bind(&item.barcode)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &item.barcode))?;

            subtotal_cents += product.price_cents * item.quantity;
            resolved.push((product, item.quantity));
        }

        // The client total is the catalog subtotal minus its discount; a
        // total above the subtotal (or negative) means a tampered payload.
        if payload.total_cents < 0 || payload.total_cents > subtotal_cents {
            return Err(DbError::invalid_state(format!(
                "sale total {} outside catalog-derived range 0..={}",
                payload.total_cents, subtotal_cents
            )));
        }
        let discount_cents = subtotal_cents - payload.total_cents;

        // Guarded decrement: the WHERE clause keeps stock non-negative even
        // under concurrent sales of the same product.
        for (product, quantity) in &resolved {
            let updated = sqlx::query(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - ?2, updated_at = ?3
                WHERE id = ?1 AND stock_quantity >= ?2
                "#,
            )
            .bind(&product.id)
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(DbError::invalid_state(format!(
                    "insufficient stock for {}: requested {}, available {}",
                    product.barcode, quantity, product.stock_quantity
                )));
            }
        }

        // Stamp the account's open session so the register's totalSales
        // aggregate picks this sale up on its next read.
        let session_id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM register_sessions WHERE account_id = ?1 AND status = 'open'",
        )
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, account_id, session_id, subtotal_cents, discount_cents,
                total_cents, payment_method, customer_id, operator_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale_id)
        .bind(account_id)
        .bind(&session_id)
        .bind(subtotal_cents)
        .bind(discount_cents)
        .bind(payload.total_cents)
        .bind(payload.payment_method)
        .bind(&payload.customer_id)
        .bind(operator_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (product, quantity) in &resolved {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, barcode_snapshot, name_snapshot,
                    unit_price_cents, quantity, line_total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&sale_id)
            .bind(&product.id)
            .bind(&product.barcode)
            .bind(&product.name)
            .bind(product.price_cents)
            .bind(quantity)
            .bind(product.price_cents * quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            total_cents = payload.total_cents,
            session_id = ?session_id,
            "Sale recorded"
        );

        self.get_by_id(&sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", &sale_id))
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, account_id, session_id, subtotal_cents, discount_cents,
                   total_cents, payment_method, customer_id, operator_id, created_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all items for a sale, in recording order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, barcode_snapshot, name_snapshot,
                   unit_price_cents, quantity, line_total_cents, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists the sales stamped with a register session, most recent first.
    ///
    /// Used by session reporting; the SUM the register repository computes
    /// over these rows is what feeds the balance.
    pub async fn list_by_session(&self, session_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, account_id, session_id, subtotal_cents, discount_cents,
                   total_cents, payment_method, customer_id, operator_id, created_at
            FROM sales
            WHERE session_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
