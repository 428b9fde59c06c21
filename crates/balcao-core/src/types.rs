//! # Domain Types
//!
//! Core domain types used throughout Balcão PDV.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐        │
//! │  │    Product     │  │  CashSession   │  │    Movement    │        │
//! │  │  ────────────  │  │  ────────────  │  │  ────────────  │        │
//! │  │  id (UUID)     │  │  id (UUID)     │  │  id (UUID)     │        │
//! │  │  barcode       │  │  status        │  │  session_id    │        │
//! │  │  price_cents   │  │  opening_cents │  │  kind          │        │
//! │  │  stock_qty     │  │  totals (agg)  │  │  value_cents   │        │
//! │  └────────────────┘  └────────────────┘  └────────────────┘        │
//! │                                                                     │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐        │
//! │  │ PaymentMethod  │  │ RegisterStatus │  │  MovementKind  │        │
//! │  │  ────────────  │  │  ────────────  │  │  ────────────  │        │
//! │  │  Cash          │  │  Open          │  │  Supplement    │        │
//! │  │  CreditCard    │  │  Closed        │  │  Withdrawal    │        │
//! │  │  DebitCard     │  └────────────────┘  └────────────────┘        │
//! │  │  Pix           │                                                │
//! │  └────────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business key: (barcode for products) - human-readable, scanner-facing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Identity Context
// =============================================================================

/// The identity context attached to every service call.
///
/// Issued by the external auth collaborator; this core never creates or
/// validates it, only threads it through explicitly. There is no hidden
/// "current user" global anywhere in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Operator's user ID.
    pub user_id: String,

    /// Role marker supplied by the auth collaborator ("owner", "employee").
    pub user_type: String,

    /// Account (store) the operator is acting for.
    pub account_id: String,
}

impl Identity {
    /// Creates an identity context.
    pub fn new(
        user_id: impl Into<String>,
        user_type: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Identity {
            user_id: user_id.into(),
            user_type: user_type.into(),
            account_id: account_id.into(),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Account this product belongs to.
    pub account_id: String,

    /// Barcode (EAN-13, EAN-8, UPC-A, etc.) - the scanner-facing key.
    pub barcode: String,

    /// Display name shown on the PDV and on receipts.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Units currently in stock.
    pub stock_quantity: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Freezes the fields the cart needs at scan time.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_id: self.id.clone(),
            barcode: self.barcode.clone(),
            name: self.name.clone(),
            unit_price_cents: self.price_cents,
            stock_available: self.stock_quantity.max(0),
        }
    }
}

// =============================================================================
// Product Snapshot
// =============================================================================

/// The slice of product data the scan pipeline hands the cart.
///
/// ## Snapshot Pattern
/// Captured at scan time; if the catalog price or stock changes afterwards,
/// the cart keeps displaying the values the operator saw. The server
/// re-derives prices at sale-recording time, so a stale snapshot can never
/// tamper with the persisted totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Product ID (UUID).
    pub product_id: String,

    /// Barcode - the cart's line key.
    pub barcode: String,

    /// Product name at scan time (frozen).
    pub name: String,

    /// Price in cents at scan time (frozen).
    pub unit_price_cents: i64,

    /// Stock level at scan time; the cart clamps quantities against this.
    pub stock_available: i64,
}

// =============================================================================
// Payment Method
// =============================================================================

/// Accepted payment methods, as a closed set.
///
/// Totals and checkout gating match exhaustively on this enum; there are no
/// string comparisons for payment branching anywhere in the workspace.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; the only method where tendered amount and change apply.
    #[default]
    Cash,
    /// Credit card on an external terminal.
    CreditCard,
    /// Debit card on an external terminal.
    DebitCard,
    /// Pix instant transfer.
    Pix,
}

impl PaymentMethod {
    /// Whether this method settles in physical cash.
    ///
    /// Cash is the only method that participates in tendered/change math and
    /// in the register's drawer balance.
    #[inline]
    pub const fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

// =============================================================================
// Sale Payload (terminal → sales service)
// =============================================================================

/// One line of a sale submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalePayloadItem {
    /// Barcode of the product sold.
    pub barcode: String,

    /// Quantity sold.
    pub quantity: i64,
}

/// The checkout submission payload.
///
/// Unit prices and product names are deliberately absent: the sales service
/// re-derives them from the catalog so a tampered client cannot change what
/// gets charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalePayload {
    /// Lines sold, keyed by barcode.
    pub items: Vec<SalePayloadItem>,

    /// Client-computed total after discount, in cents. The server verifies it
    /// against the catalog-derived subtotal.
    pub total_cents: i64,

    /// How the customer paid.
    pub payment_method: PaymentMethod,

    /// Customer, when one was selected for a discount tier.
    pub customer_id: Option<String>,
}

/// What the sales service returns for a recorded sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleResult {
    /// ID of the persisted sale.
    pub sale_id: String,

    /// Server-derived total in cents.
    pub total_cents: i64,

    /// Register session the sale was stamped onto, when one was open.
    pub session_id: Option<String>,
}

// =============================================================================
// Sale (persisted)
// =============================================================================

/// A recorded sale, as the sales service persists it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub account_id: String,
    /// Open register session at recording time, if any.
    pub session_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub customer_id: Option<String>,
    pub operator_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line item of a recorded sale.
///
/// Uses the snapshot pattern: barcode, name and unit price are frozen at
/// recording time so sale history survives later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Barcode at time of sale (frozen).
    pub barcode_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of sale (frozen, catalog-derived).
    pub unit_price_cents: i64,
    /// Quantity sold.
    pub quantity: i64,
    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Cash Register Session (Caixa)
// =============================================================================

/// Lifecycle status of a cash-register session.
///
/// `Closed` is terminal for a given session id; opening again creates a new
/// session.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegisterStatus {
    /// Session is accepting sales and movements.
    Open,
    /// Session has been reconciled and closed; immutable except archival.
    Closed,
}

/// A cash-register (caixa) session.
///
/// ## Invariants
/// - At most one session per account has `status = Open` at any time
///   (enforced by the database, not by this type).
/// - The aggregate totals are server-computed from the ledger and the sales
///   table; [`CashSession::current_balance_cents`] recomputes the balance
///   from them on every call - there is no separately stored balance that
///   could drift.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashSession {
    pub id: String,
    pub account_id: String,
    pub operator_id: String,
    pub operator_name: String,
    pub status: RegisterStatus,

    /// Cash in the drawer when the session opened.
    pub opening_cents: i64,

    /// Counted cash reported by the operator at close; None while open.
    pub closing_cents: Option<i64>,

    pub opening_notes: Option<String>,
    pub closing_notes: Option<String>,

    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,

    /// Hidden from default history listings once closed.
    pub archived: bool,

    /// Aggregate of sales stamped with this session (server-computed).
    pub total_sales_cents: i64,

    /// Aggregate of supplement movements (server-computed).
    pub total_supplements_cents: i64,

    /// Aggregate of withdrawal movements (server-computed).
    pub total_withdrawals_cents: i64,
}

impl CashSession {
    /// The running balance, recomputed from source fields on every read.
    ///
    /// ```text
    /// balance = opening + total_sales + total_supplements − total_withdrawals
    /// ```
    ///
    /// Never cached: any caller that needs the balance calls this against a
    /// freshly fetched session, so the figure can never drift from the
    /// ledger the aggregates were summed from.
    #[inline]
    pub fn current_balance_cents(&self) -> i64 {
        self.opening_cents + self.total_sales_cents + self.total_supplements_cents
            - self.total_withdrawals_cents
    }

    /// Balance as Money, for display and logs.
    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents())
    }

    /// Whether the session is still open.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == RegisterStatus::Open
    }
}

// =============================================================================
// Movement (ledger entry)
// =============================================================================

/// Direction of a cash movement.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Cash added to the drawer (suprimento).
    Supplement,
    /// Cash removed from the drawer (sangria).
    Withdrawal,
}

/// An entry in the cash-movement ledger.
///
/// Append-only: kind and value are fixed at creation and never edited. A
/// movement always references the session that was open when it was
/// recorded.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Movement {
    pub id: String,
    pub session_id: String,
    pub kind: MovementKind,
    /// Strictly positive; the kind carries the sign.
    pub value_cents: i64,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// The signed effect of this movement on the drawer balance.
    #[inline]
    pub fn signed_cents(&self) -> i64 {
        match self.kind {
            MovementKind::Supplement => self.value_cents,
            MovementKind::Withdrawal => -self.value_cents,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
