//! # Error Types
//!
//! Domain-specific error types for balcao-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  balcao-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  balcao-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  balcao-terminal errors                                             │
//! │  ├── ServiceError     - Port-level failures from injected services  │
//! │  └── TerminalError    - What the UI host sees (serialized)          │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → ServiceError → TerminalError   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (amounts, indices, ids)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message
//!
//! ## Intentional Silences
//! Two conditions are deliberately NOT errors:
//! - a cart quantity hitting the stock ceiling is clamped, not rejected;
//! - a scan resolution inside the debounce window is dropped, not reported.
//!
//! Everything else in the taxonomy below is surfaced.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are caught as close
/// to the user action as possible and translated to user-facing messages by
/// the terminal layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Checkout attempted with zero cart lines.
    ///
    /// Recovered locally: the checkout action is disabled on an empty cart,
    /// and this error never reaches the network.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cash tendered is less than the cart total.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (cash, tendered R$ 50.00)
    ///      │
    ///      ▼
    /// total = R$ 90.00 > tendered
    ///      │
    ///      ▼
    /// InsufficientTender { tendered: 5000, total: 9000 }
    ///      │
    ///      ▼
    /// PDV shows: "Valor recebido insuficiente" - cart unchanged
    /// ```
    #[error("Insufficient payment: tendered {tendered_cents} of {total_cents}")]
    InsufficientTender {
        tendered_cents: i64,
        total_cents: i64,
    },

    /// A cart line index does not exist.
    #[error("No cart line at index {index}")]
    LineNotFound { index: usize },

    /// A movement or close was attempted with no open register session.
    ///
    /// Guarded client-side (actions disabled when no session); the database
    /// rejects it again if a stale client bypasses the guard.
    #[error("No open cash-register session")]
    NoOpenSession,

    /// An invalid register transition: opening while a session is already
    /// open, or closing a session that is not open.
    #[error("Invalid register transition: {reason}")]
    RegisterTransition { reason: String },

    /// A ledger movement with a zero or negative value.
    #[error("Movement value must be positive, got {value_cents}")]
    NonPositiveMovement { value_cents: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a RegisterTransition error.
    pub fn transition(reason: impl Into<String>) -> Self {
        CoreError::RegisterTransition {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when user input doesn't meet requirements, before business
/// logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, non-digit barcode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
