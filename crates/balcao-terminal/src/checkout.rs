//! # Checkout Flow
//!
//! Single-flight sale submission: validate locally, submit exactly once,
//! clear the cart only after the sale is persisted.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Checkout Flow                                 │
//! │                                                                     │
//! │  submit()                                                           │
//! │     │                                                               │
//! │     ├── another submission in flight? ──► CHECKOUT_IN_FLIGHT        │
//! │     │                                     (rejected, not queued)    │
//! │     ▼                                                               │
//! │  validate under one cart lock                                       │
//! │     ├── empty cart            ──► EMPTY_CART (no network call)      │
//! │     ├── cash, tendered < total ─► INSUFFICIENT_PAYMENT (no call)    │
//! │     ▼                                                               │
//! │  SalesService::submit_sale(payload)      ← the only network call    │
//! │     │                                                               │
//! │     ├── Err ──► surface to caller, CART PRESERVED for retry         │
//! │     ▼                                                               │
//! │  completion callback(result)                                        │
//! │     │                                                               │
//! │     ▼                                                               │
//! │  cart.clear()  ← only after the service confirmed persistence       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## At-Most-Once Commit
//! The payload is submitted once per user action. On failure nothing is
//! retried automatically and the cart stays editable; the operator decides
//! whether to try again. A concurrent second submission is rejected, never
//! queued, so a double-tap on the finish button cannot double-charge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::TerminalError;
use crate::services::SalesService;
use crate::state::CartState;
use balcao_core::{Identity, SaleResult};

/// The checkout flow of one PDV terminal.
pub struct CheckoutFlow {
    sales: Arc<dyn SalesService>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag on every exit path, early returns included.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CheckoutFlow {
    /// Creates a checkout flow over the injected sales service.
    pub fn new(sales: Arc<dyn SalesService>) -> Self {
        CheckoutFlow {
            sales,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a submission is currently in flight (drives the disabled
    /// state of the finish button).
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validates, submits and - on success only - clears the cart.
    ///
    /// `on_complete` runs after the service confirms the sale and before
    /// the cart is cleared, receiving the persisted result (receipt
    /// printing, register refresh triggers).
    ///
    /// ## Errors
    /// - [`crate::ErrorCode::CheckoutInFlight`] - submission already running
    /// - [`crate::ErrorCode::EmptyCart`] / `InsufficientPayment` - local
    ///   gating, no network call made
    /// - [`crate::ErrorCode::SaleSubmission`] and friends - service failure,
    ///   cart untouched
    pub async fn submit<F>(
        &self,
        identity: &Identity,
        cart: &CartState,
        on_complete: F,
    ) -> Result<SaleResult, TerminalError>
    where
        F: FnOnce(&SaleResult),
    {
        // Single-flight: claim the slot atomically or bail.
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Checkout rejected: submission already in flight");
            return Err(TerminalError::checkout_in_flight());
        }
        let _guard = FlightGuard(&self.in_flight);

        // Gate and snapshot under one lock: the payload is built from the
        // exact state that passed validation.
        let payload = cart.with_cart(|c| {
            c.validate_checkout()?;
            Ok::<_, TerminalError>(c.to_payload())
        })?;

        debug!(
            items = payload.items.len(),
            total_cents = payload.total_cents,
            method = ?payload.payment_method,
            "Submitting sale"
        );

        // The one network call. On failure the cart is left exactly as the
        // operator sees it, ready for a manual retry.
        let result = self.sales.submit_sale(identity, &payload).await?;

        on_complete(&result);

        // Atomic reset: the next sale starts from a clean cart.
        cart.with_cart_mut(|c| c.clear());

        info!(
            sale_id = %result.sale_id,
            total_cents = result.total_cents,
            "Sale completed, cart cleared"
        );

        Ok(result)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    use crate::error::ErrorCode;
    use crate::services::ServiceError;
    use balcao_core::{PaymentMethod, ProductSnapshot, SalePayload};

    /// Mock sales service: counts calls, optionally fails, optionally
    /// parks until released (for the single-flight test).
    #[derive(Default)]
    struct MockSales {
        calls: AtomicUsize,
        fail: bool,
        hold: Option<Arc<Notify>>,
        last_payload: Mutex<Option<SalePayload>>,
    }

    #[async_trait]
    impl SalesService for MockSales {
        async fn submit_sale(
            &self,
            _identity: &Identity,
            payload: &SalePayload,
        ) -> Result<SaleResult, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_payload.lock().unwrap() = Some(payload.clone());

            if let Some(hold) = &self.hold {
                hold.notified().await;
            }

            if self.fail {
                return Err(ServiceError::Unavailable("connection refused".to_string()));
            }

            Ok(SaleResult {
                sale_id: "sale-1".to_string(),
                total_cents: payload.total_cents,
                session_id: None,
            })
        }
    }

    fn identity() -> Identity {
        Identity::new("op-1", "employee", "acct-1")
    }

    fn snapshot(barcode: &str, price_cents: i64, stock: i64) -> ProductSnapshot {
        ProductSnapshot {
            product_id: format!("id-{}", barcode),
            barcode: barcode.to_string(),
            name: format!("Produto {}", barcode),
            unit_price_cents: price_cents,
            stock_available: stock,
        }
    }

    fn cart_with_item(price_cents: i64) -> CartState {
        let cart = CartState::new();
        cart.with_cart_mut(|c| {
            c.add_or_increment(&snapshot("7891234567890", price_cents, 50));
        });
        cart
    }

    #[tokio::test]
    async fn test_successful_checkout_clears_cart_and_calls_back() {
        let sales = Arc::new(MockSales::default());
        let flow = CheckoutFlow::new(sales.clone());
        let cart = cart_with_item(2550);
        cart.with_cart_mut(|c| c.set_tendered(3000));

        let callback_ran = AtomicUsize::new(0);
        let result = flow
            .submit(&identity(), &cart, |r| {
                assert_eq!(r.sale_id, "sale-1");
                callback_ran.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(result.total_cents, 2550);
        assert_eq!(callback_ran.load(Ordering::SeqCst), 1);
        assert_eq!(sales.calls.load(Ordering::SeqCst), 1);
        assert!(cart.with_cart(|c| c.is_empty()));
        assert!(!flow.is_in_flight());
    }

    #[tokio::test]
    async fn test_empty_cart_makes_no_network_call() {
        let sales = Arc::new(MockSales::default());
        let flow = CheckoutFlow::new(sales.clone());
        let cart = CartState::new();

        let err = flow.submit(&identity(), &cart, |_| {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyCart);
        assert_eq!(sales.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_insufficient_tender_makes_no_network_call() {
        // Spec scenario: cash, tendered 50.00, total 90.00 → rejected
        let sales = Arc::new(MockSales::default());
        let flow = CheckoutFlow::new(sales.clone());
        let cart = cart_with_item(9_000);
        cart.with_cart_mut(|c| {
            c.set_payment_method(PaymentMethod::Cash);
            c.set_tendered(5_000);
        });

        let err = flow.submit(&identity(), &cart, |_| {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientPayment);
        assert_eq!(sales.calls.load(Ordering::SeqCst), 0);

        // Cart unchanged, ready to fix the tendered amount
        assert_eq!(cart.with_cart(|c| c.line_count()), 1);
        assert_eq!(cart.with_cart(|c| c.tendered_cents), Some(5_000));
    }

    #[tokio::test]
    async fn test_non_cash_checkout_not_gated_by_tender() {
        let sales = Arc::new(MockSales::default());
        let flow = CheckoutFlow::new(sales.clone());
        let cart = cart_with_item(9_000);
        cart.with_cart_mut(|c| c.set_payment_method(PaymentMethod::Pix));

        assert!(flow.submit(&identity(), &cart, |_| {}).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_submission_preserves_cart() {
        let sales = Arc::new(MockSales {
            fail: true,
            ..Default::default()
        });
        let flow = CheckoutFlow::new(sales.clone());
        let cart = cart_with_item(2550);
        cart.with_cart_mut(|c| c.set_tendered(3000));

        let err = flow.submit(&identity(), &cart, |_| {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ServiceUnavailable);

        // Cart preserved for manual retry, flag released
        assert_eq!(cart.with_cart(|c| c.line_count()), 1);
        assert!(!flow.is_in_flight());

        // Manual retry works once the service is back
        assert_eq!(sales.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_submission_rejected_while_first_in_flight() {
        let hold = Arc::new(Notify::new());
        let sales = Arc::new(MockSales {
            hold: Some(hold.clone()),
            ..Default::default()
        });
        let flow = Arc::new(CheckoutFlow::new(sales.clone()));
        let cart = cart_with_item(2550);
        cart.with_cart_mut(|c| c.set_tendered(3000));

        let first = tokio::spawn({
            let flow = flow.clone();
            let cart = cart.clone();
            async move { flow.submit(&identity(), &cart, |_| {}).await }
        });

        // Wait until the first submission is parked inside the service
        while sales.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(flow.is_in_flight());

        // Second attempt: rejected, not queued
        let err = flow.submit(&identity(), &cart, |_| {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CheckoutInFlight);

        // Release the first; it completes normally
        hold.notify_one();
        let result = first.await.unwrap().unwrap();
        assert_eq!(result.sale_id, "sale-1");

        // Exactly one submission reached the service
        assert_eq!(sales.calls.load(Ordering::SeqCst), 1);
        assert!(cart.with_cart(|c| c.is_empty()));
    }

    #[tokio::test]
    async fn test_payload_carries_barcodes_not_prices() {
        let sales = Arc::new(MockSales::default());
        let flow = CheckoutFlow::new(sales.clone());
        let cart = cart_with_item(2550);
        cart.with_cart_mut(|c| c.set_tendered(3000));

        flow.submit(&identity(), &cart, |_| {}).await.unwrap();

        let payload = sales.last_payload.lock().unwrap().clone().unwrap();
        assert_eq!(payload.items[0].barcode, "7891234567890");
        assert_eq!(payload.items[0].quantity, 1);
        assert_eq!(payload.total_cents, 2550);
    }
}
