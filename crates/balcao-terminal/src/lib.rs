//! # balcao-terminal: PDV Terminal Runtime
//!
//! The terminal-side runtime for Balcão PDV: everything between the webview
//! frontend and the injected services.
//!
//! ## Module Organization
//! ```text
//! balcao_terminal/
//! ├── lib.rs          ◄─── You are here (exports)
//! ├── state.rs        ◄─── Shared cart state + terminal configuration
//! ├── services.rs     ◄─── Service ports (ProductLookup, SalesService,
//! │                        CashRegisterService) and ServiceError
//! ├── local.rs        ◄─── In-process implementation of the ports over
//! │                        balcao-db
//! ├── scan.rs         ◄─── Barcode scan pipeline (debounce, resolution)
//! ├── feedback.rs     ◄─── Scan feedback port (audio cues)
//! ├── checkout.rs     ◄─── Single-flight sale submission
//! ├── register.rs     ◄─── Cash-register view + polling refresh
//! └── error.rs        ◄─── TerminalError for the UI host
//! ```
//!
//! ## Concurrency Model
//! One logical terminal: cart math is synchronous and never awaits
//! mid-computation; product lookup, sale submission and the register
//! refresh are the only asynchronous boundaries. The cart is shared behind
//! a mutex exactly long enough to read a consistent snapshot or apply one
//! mutation. There are no worker pools and no cancellation tokens - tearing
//! down the register view just aborts its poll task, and an in-flight
//! request finishing afterwards is discarded harmlessly.

pub mod checkout;
pub mod error;
pub mod feedback;
pub mod local;
pub mod register;
pub mod scan;
pub mod services;
pub mod state;

pub use checkout::CheckoutFlow;
pub use error::{ErrorCode, TerminalError};
pub use feedback::{CueSpec, ScanFeedback, SilentFeedback, ACCEPTED_CUE, REJECTED_CUE};
pub use local::LocalServices;
pub use register::{RegisterView, MOVEMENT_DISPLAY_LIMIT, REGISTER_POLL_INTERVAL};
pub use scan::{ScanOutcome, ScanPipeline, ScanState};
pub use services::{CashRegisterService, ProductLookup, SalesService, ServiceError};
pub use state::{CartState, TerminalConfig};
