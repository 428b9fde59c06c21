//! # Terminal Error Type
//!
//! Unified error type for the UI host.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Balcão PDV                         │
//! │                                                                     │
//! │  Frontend                     Rust Runtime                          │
//! │  ────────                     ────────────                          │
//! │                                                                     │
//! │  checkout.submit()                                                  │
//! │         │                                                           │
//! │         ▼                                                           │
//! │  ┌──────────────────────────────────────────────────────────────┐   │
//! │  │  Result<T, TerminalError>                                    │   │
//! │  │         │                                                    │   │
//! │  │  CoreError (gating)  ──► TerminalError { code, message } ───►│   │
//! │  │  ServiceError (I/O)  ──► TerminalError { code, message } ───►│   │
//! │  └──────────────────────────────────────────────────────────────┘   │
//! │                                                                     │
//! │  catch (e) {                                                        │
//! │    // e.message = "Insufficient payment: tendered 5000 of 9000"     │
//! │    // e.code = "INSUFFICIENT_PAYMENT"                               │
//! │  }                                                                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation failures are mapped as close to the user action as possible;
//! none of them leave partial state behind.

use serde::Serialize;
use tracing::error;

use crate::services::ServiceError;
use balcao_core::CoreError;

/// Error returned from terminal operations to the UI host.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NO_OPEN_SESSION",
///   "message": "No open cash-register session"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for terminal responses.
///
/// One code per recoverable condition the frontend branches on; everything
/// infrastructural collapses into `ServiceUnavailable`/`Internal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Checkout attempted with an empty cart
    EmptyCart,

    /// Cash tendered below the cart total
    InsufficientPayment,

    /// Scanned barcode resolved to no product
    ProductNotFound,

    /// Movement or close attempted with no open session
    NoOpenSession,

    /// Invalid register transition (open-while-open, close-not-open)
    RegisterTransition,

    /// Sales service rejected or failed the submission; cart preserved
    SaleSubmission,

    /// A second checkout while one is in flight
    CheckoutInFlight,

    /// Input validation failed
    ValidationError,

    /// Referenced entity does not exist
    NotFound,

    /// Cart operation failed (bad line index)
    CartError,

    /// Service transport/infrastructure failure
    ServiceUnavailable,

    /// Anything unexpected
    Internal,
}

impl TerminalError {
    /// Creates a new terminal error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        TerminalError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::ValidationError, message)
    }

    /// Creates the single-flight rejection.
    pub fn checkout_in_flight() -> Self {
        TerminalError::new(
            ErrorCode::CheckoutInFlight,
            "A sale submission is already in progress",
        )
    }

    /// Creates the missing-session guard error.
    pub fn no_open_session() -> Self {
        TerminalError::new(ErrorCode::NoOpenSession, "No open cash-register session")
    }
}

/// Converts core business errors to terminal errors.
impl From<CoreError> for TerminalError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::EmptyCart => ErrorCode::EmptyCart,
            CoreError::InsufficientTender { .. } => ErrorCode::InsufficientPayment,
            CoreError::LineNotFound { .. } => ErrorCode::CartError,
            CoreError::NoOpenSession => ErrorCode::NoOpenSession,
            CoreError::RegisterTransition { .. } => ErrorCode::RegisterTransition,
            CoreError::NonPositiveMovement { .. } | CoreError::Validation(_) => {
                ErrorCode::ValidationError
            }
        };
        TerminalError::new(code, err.to_string())
    }
}

/// Converts service port errors to terminal errors.
impl From<ServiceError> for TerminalError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Rejected { message } => {
                TerminalError::new(ErrorCode::SaleSubmission, message)
            }
            ServiceError::Conflict { message } => {
                TerminalError::new(ErrorCode::RegisterTransition, message)
            }
            ServiceError::NotFound { entity, id } => TerminalError::new(
                ErrorCode::NotFound,
                format!("{} not found: {}", entity, id),
            ),
            ServiceError::Unavailable(message) => {
                // Log the transport detail, show a generic message
                error!("Service unavailable: {}", message);
                TerminalError::new(
                    ErrorCode::ServiceUnavailable,
                    "Service unavailable, try again",
                )
            }
        }
    }
}

impl std::fmt::Display for TerminalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for TerminalError {}

// =============================================================================
// Unit Tests
// =============================================================================
