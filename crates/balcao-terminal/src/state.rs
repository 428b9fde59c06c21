//! # Terminal State
//!
//! Shared cart state and terminal configuration.
//!
//! ## Thread Safety
//! The cart is wrapped in `Arc<Mutex<T>>` because:
//! 1. The scan pipeline, the quantity controls and the checkout flow all
//!    touch the same cart
//! 2. Only one of them should modify it at a time
//! 3. Totals must be computed from a consistent snapshot - one lock
//!    acquisition, no awaits while held
//!
//! ## Cart State Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Cart State Operations                            │
//! │                                                                     │
//! │  Scan resolves ──────────► with_cart_mut(add_or_increment)          │
//! │                                                                     │
//! │  Quantity +/- ───────────► with_cart_mut(set_quantity)              │
//! │                                                                     │
//! │  Checkout gate ──────────► with_cart(validate + payload)            │
//! │                                                                     │
//! │  Checkout success ───────► with_cart_mut(clear)                     │
//! │                                                                     │
//! │  NOTE: the closures run synchronously under the lock; no await      │
//! │        point ever happens while the cart is held.                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use balcao_core::Cart;

// =============================================================================
// Cart State
// =============================================================================

/// Shared, mutex-protected cart.
///
/// ## Why Not RwLock?
/// Cart operations are quick and most of them mutate. A RwLock would add
/// complexity with minimal benefit.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    /// Creates a new empty cart state.
    pub fn new() -> Self {
        CartState {
            cart: Arc::new(Mutex::new(Cart::new())),
        }
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = cart_state.with_cart(|cart| cart.totals());
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().expect("Cart mutex poisoned");
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// cart_state.with_cart_mut(|cart| cart.add_or_increment(&snapshot));
    /// ```
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().expect("Cart mutex poisoned");
        f(&mut cart)
    }
}

// =============================================================================
// Terminal Configuration
// =============================================================================

/// Terminal configuration, read-only after startup.
///
/// ## Configuration Sources (Priority Order)
/// 1. Environment variables (`BALCAO_*`)
/// 2. Defaults (this file)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalConfig {
    /// Store name (displayed on the PDV header and receipts)
    pub store_name: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// How often the register view re-fetches the open session.
    /// See [`crate::register::REGISTER_POLL_INTERVAL`] for the default and
    /// the rationale.
    #[serde(with = "duration_secs")]
    pub register_poll_interval: Duration,

    /// How many ledger entries the movement list displays; the full
    /// history stays server-side.
    pub movement_display_limit: usize,

    /// Enable the scan audio cues
    pub sound_enabled: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            store_name: "Balcão PDV".to_string(),
            currency_symbol: "R$".to_string(),
            register_poll_interval: crate::register::REGISTER_POLL_INTERVAL,
            movement_display_limit: crate::register::MOVEMENT_DISPLAY_LIMIT,
            sound_enabled: true,
        }
    }
}

impl TerminalConfig {
    /// Creates a TerminalConfig from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `BALCAO_STORE_NAME`: Override store name
    /// - `BALCAO_POLL_SECS`: Override register poll interval (seconds)
    /// - `BALCAO_SOUND`: "0" disables the scan cues
    pub fn from_env() -> Self {
        let mut config = TerminalConfig::default();

        if let Ok(store_name) = std::env::var("BALCAO_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Ok(secs) = std::env::var("BALCAO_POLL_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.register_poll_interval = Duration::from_secs(secs.max(1));
            }
        }

        if let Ok(sound) = std::env::var("BALCAO_SOUND") {
            config.sound_enabled = sound != "0";
        }

        config
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = TerminalConfig::default();
    /// assert_eq!(config.format_currency(1234), "R$12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let whole = (cents / 100).abs();
        let frac = (cents % 100).abs();

        format!(
            "{}{}{}.{:02}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            whole,
            frac
        )
    }
}

/// Serde helper: poll interval as integer seconds in JSON.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
