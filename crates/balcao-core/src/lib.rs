//! # balcao-core: Pure Business Logic for Balcão PDV
//!
//! This crate is the **heart** of the PDV. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Balcão PDV Architecture                         │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                    Web PDV Frontend                         │   │
//! │  │    Scan Input ──► Cart UI ──► Checkout ──► Caixa View       │   │
//! │  └───────────────────────────┬─────────────────────────────────┘   │
//! │                              │                                     │
//! │  ┌───────────────────────────▼─────────────────────────────────┐   │
//! │  │                 balcao-terminal (runtime)                   │   │
//! │  │    scan pipeline, checkout flow, register view, polling     │   │
//! │  └───────────────────────────┬─────────────────────────────────┘   │
//! │                              │                                     │
//! │  ┌───────────────────────────▼─────────────────────────────────┐   │
//! │  │               ★ balcao-core (THIS CRATE) ★                  │   │
//! │  │                                                             │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌────────────┐     │   │
//! │  │  │  types   │ │  money   │ │   cart   │ │ validation │     │   │
//! │  │  │ Session  │ │  Money   │ │   Cart   │ │   rules    │     │   │
//! │  │  │ Movement │ │ Discount │ │ CartLine │ │   checks   │     │   │
//! │  │  └──────────┘ └──────────┘ └──────────┘ └────────────┘     │   │
//! │  │                                                             │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │   │
//! │  └───────────────────────────┬─────────────────────────────────┘   │
//! │                              │                                     │
//! │  ┌───────────────────────────▼─────────────────────────────────┐   │
//! │  │                 balcao-db (Database Layer)                  │   │
//! │  │          SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, CashSession, Movement, Identity, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - The cart engine: lines, totals, checkout gating
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use balcao_core::money::{DiscountRate, Money};
//!
//! // Create money from cents (never from floats!)
//! let subtotal = Money::from_cents(10_000); // R$ 100.00
//!
//! // Apply the customer's discount tier
//! let discount = subtotal.discount_amount(DiscountRate::from_percent(10.0));
//!
//! // 10% of R$ 100.00 = R$ 10.00
//! assert_eq!(discount.cents(), 1_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use balcao_core::Money` instead of
// `use balcao_core::money::Money`

pub use cart::{Cart, CartLine, CartTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{DiscountRate, Money};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default account ID for single-store deployments.
///
/// The database schema carries `account_id` on every entity for
/// multi-tenancy; single-store installs use this constant until account
/// resolution is wired to the auth collaborator.
pub const DEFAULT_ACCOUNT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum number of distinct lines allowed in a single cart.
///
/// Prevents runaway carts and keeps a single checkout payload bounded.
pub const MAX_CART_LINES: usize = 100;

/// Minimum buffered characters before a scan auto-resolves.
///
/// EAN-8 is the shortest barcode the scanners emit; anything shorter must be
/// submitted explicitly with Enter.
pub const MIN_SCAN_LEN: usize = 8;

/// Hard floor for the scan debounce window, in milliseconds.
///
/// Any resolution attempt within this window of the previous one is dropped.
/// This is a global time window, not keyed by barcode.
pub const SCAN_DEBOUNCE_MS: u64 = 100;
