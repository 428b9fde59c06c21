//! # balcao-db: Database Layer for Balcão PDV
//!
//! SQLite persistence for the catalog, sales and cash-register sessions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  balcao-terminal ──► service ports ──► balcao-db (THIS CRATE)       │
//! │                                             │                       │
//! │                                             ▼                       │
//! │                                     SQLite (WAL mode)               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Single-Writer Invariants
//! The terminal's client-side guards are best-effort; this crate is where
//! the cash-register invariants actually hold:
//! - at most one open session per account (partial unique index)
//! - movements only against an open session, with strictly positive values
//! - sale totals re-derived from the catalog, stock decremented atomically
//!
//! ## Modules
//! - [`pool`] - Connection pool and the [`Database`] handle
//! - [`migrations`] - Embedded schema migrations
//! - [`repository`] - Product, sale and register repositories
//! - [`error`] - [`DbError`]

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
