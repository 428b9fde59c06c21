//! # Service Ports
//!
//! The external capabilities the terminal consumes, as injectable trait
//! objects. The terminal never talks to a database or a network directly;
//! it talks to these ports.
//!
//! ## Ports
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Consumed Services                              │
//! │                                                                     │
//! │  ProductLookup        lookup_by_barcode(identity, barcode)          │
//! │                                                                     │
//! │  SalesService         submit_sale(identity, payload)                │
//! │                                                                     │
//! │  CashRegisterService  open_register / close_register                │
//! │                       record_movement / get_open_register           │
//! │                       list_register_history / list_movements        │
//! │                                                                     │
//! │  Every call carries an explicit Identity - there is no hidden       │
//! │  "current user" anywhere in the terminal.                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`crate::local::LocalServices`] implements all three ports over
//! balcao-db; a remote HTTP implementation would implement the same traits
//! without the terminal noticing.

use async_trait::async_trait;
use thiserror::Error;

use balcao_core::{
    CashSession, Identity, Movement, MovementKind, ProductSnapshot, SalePayload, SaleResult,
};

// =============================================================================
// Service Error
// =============================================================================

/// Failures surfaced by the service ports.
///
/// The terminal maps these onto user-facing [`crate::TerminalError`]s;
/// none of them mutate terminal state (a failed submission leaves the cart
/// editable, a failed register action leaves the session as it was).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service rejected the request as invalid (tampered totals,
    /// oversell, bad input that slipped past client-side validation).
    #[error("Request rejected: {message}")]
    Rejected { message: String },

    /// The request conflicts with current server-side state: opening an
    /// already-open register, closing a closed one, a movement against a
    /// closed session.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Transport or infrastructure failure; retry is a user action.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    /// Creates a Rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        ServiceError::Rejected {
            message: message.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict {
            message: message.into(),
        }
    }
}

// =============================================================================
// Ports
// =============================================================================

/// Product catalog lookup, keyed by exact barcode string match.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// Resolves a barcode to a product snapshot, or `None` when no active
    /// product carries it.
    async fn lookup_by_barcode(
        &self,
        identity: &Identity,
        barcode: &str,
    ) -> Result<Option<ProductSnapshot>, ServiceError>;
}

/// Sale recording.
#[async_trait]
pub trait SalesService: Send + Sync {
    /// Records a sale from a checkout payload, exactly once.
    ///
    /// The implementation re-derives prices from the catalog and either
    /// persists the whole sale or nothing.
    async fn submit_sale(
        &self,
        identity: &Identity,
        payload: &SalePayload,
    ) -> Result<SaleResult, ServiceError>;
}

/// Cash-register session management.
#[async_trait]
pub trait CashRegisterService: Send + Sync {
    /// Opens a session; fails with [`ServiceError::Conflict`] when one is
    /// already open for the account.
    async fn open_register(
        &self,
        identity: &Identity,
        opening_cents: i64,
        notes: Option<String>,
    ) -> Result<CashSession, ServiceError>;

    /// Closes an open session, recording the operator's counted balance.
    async fn close_register(
        &self,
        identity: &Identity,
        session_id: &str,
        closing_cents: i64,
        notes: Option<String>,
    ) -> Result<CashSession, ServiceError>;

    /// Appends a supplement/withdrawal movement to an open session.
    async fn record_movement(
        &self,
        identity: &Identity,
        session_id: &str,
        kind: MovementKind,
        value_cents: i64,
        description: Option<String>,
    ) -> Result<Movement, ServiceError>;

    /// The account's open session, if any.
    async fn get_open_register(
        &self,
        identity: &Identity,
    ) -> Result<Option<CashSession>, ServiceError>;

    /// Closed-session history, most recently opened first.
    async fn list_register_history(
        &self,
        identity: &Identity,
        include_archived: bool,
    ) -> Result<Vec<CashSession>, ServiceError>;

    /// A session's movements, most recent first.
    async fn list_movements(
        &self,
        identity: &Identity,
        session_id: &str,
    ) -> Result<Vec<Movement>, ServiceError>;
}
