//! # Validation Module
//!
//! Input validation utilities for Balcão PDV.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Frontend (TypeScript)                                     │
//! │  ├── Basic format checks (empty, length)                            │
//! │  └── Immediate user feedback, buttons disabled                      │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: Terminal runtime (Rust)                                   │
//! │  └── THIS MODULE: business rule validation before service calls     │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                         │
//! │  ├── CHECK constraints (positive movement values)                   │
//! │  ├── UNIQUE partial index (one open session per account)            │
//! │  └── Foreign key constraints                                        │
//! │                                                                     │
//! │  Defense in depth: each layer catches what the one above missed     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a barcode before lookup.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 32 characters (longest symbology we accept is Code 128)
/// - Digits only - the PDV scanners emit numeric symbologies
///
/// ## Example
/// ```rust
/// use balcao_core::validation::validate_barcode;
///
/// assert!(validate_barcode("7891234567890").is_ok());
/// assert!(validate_barcode("").is_err());
/// assert!(validate_barcode("abc-123").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 32,
        });
    }

    if !barcode.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a session/movement note.
///
/// Notes are optional; when present they are capped to keep rows bounded.
pub fn validate_notes(notes: &str) -> ValidationResult<()> {
    if notes.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: 500,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an opening or closing drawer balance.
///
/// ## Rules
/// - Must be non-negative (an empty drawer is 0, never negative)
///
/// Rejected client-side before the open/close request is ever submitted.
pub fn validate_balance_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a ledger movement value.
///
/// ## Rules
/// - Must be strictly positive; the movement kind carries the sign
pub fn validate_movement_value(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "movement value".to_string(),
        });
    }
    Ok(())
}

/// Validates a tendered cash amount.
///
/// ## Rules
/// - Must be non-negative; sufficiency against the total is checked by the
///   cart's checkout gate, not here
pub fn validate_tendered_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "tendered amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a discount percentage from the UI.
///
/// ## Rules
/// - Must be within 0..=100
pub fn validate_discount_percent(pct: f64) -> ValidationResult<()> {
    if !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: "discount percent".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use balcao_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
