//! # Repository Module
//!
//! Data access repositories for Balcão PDV.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Repository Architecture                          │
//! │                                                                     │
//! │  Database (handle)                                                  │
//! │     │                                                               │
//! │     ├── products()  ──► ProductRepository   (catalog, stock)        │
//! │     ├── sales()     ──► SaleRepository      (recording, items)      │
//! │     └── registers() ──► RegisterRepository  (caixa sessions,        │
//! │                                              movement ledger)       │
//! │                                                                     │
//! │  Each repository owns the SQL for its aggregate and maps            │
//! │  constraint failures to typed DbError variants.                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod product;
pub mod register;
pub mod sale;

pub use product::ProductRepository;
pub use register::RegisterRepository;
pub use sale::SaleRepository;
