//! # Cart Engine
//!
//! The in-memory, per-terminal cart: lines keyed by barcode, discount and
//! payment state, and the pure totals math the checkout gate runs on.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Cart Engine Operations                           │
//! │                                                                     │
//! │  Scan resolves ──────────► add_or_increment() ──► clamp at stock    │
//! │                                                                     │
//! │  Operator +/- ───────────► set_quantity() ──────► clamp [1, stock]  │
//! │                                                                     │
//! │  Operator remove ────────► remove_line()                            │
//! │                                                                     │
//! │  Checkout success/cancel ► clear() ─────────────► defaults          │
//! │                                                                     │
//! │  Any time ───────────────► totals() ────────────► pure, no effects  │
//! │                                                                     │
//! │  All external I/O (stock lookup) happens BEFORE these mutations,    │
//! │  never inside them. Totals never await mid-computation.             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Clamping Policy
//! Quantities are silently capped at the stock snapshot rather than
//! rejected. This is the documented edge-case policy of the product, not a
//! failure: the operator sees the quantity stop increasing. The server
//! re-checks stock at sale-recording time, which remains the authoritative
//! rejection point.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{DiscountRate, Money};
use crate::types::{PaymentMethod, ProductSnapshot, SalePayload, SalePayloadItem};
use crate::MAX_CART_LINES;

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart, keyed by barcode.
///
/// ## Design Notes
/// - `barcode` is the unique key within the cart; scanning the same barcode
///   again increments the existing line.
/// - price and stock are frozen from the [`ProductSnapshot`] at first scan.
/// - the line subtotal is always computed from `unit_price × quantity`,
///   never stored where it could go stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product ID (UUID), for the sale payload and receipt lookups.
    pub product_id: String,

    /// Barcode - the cart's line key.
    pub barcode: String,

    /// Product name at scan time (frozen).
    pub name: String,

    /// Price in cents at scan time (frozen).
    pub unit_price_cents: i64,

    /// Quantity in cart; invariant `1 ≤ quantity ≤ stock_available`.
    pub quantity: i64,

    /// Stock level at scan time; quantity is clamped against this.
    pub stock_available: i64,
}

impl CartLine {
    /// Creates a line from a scan-time product snapshot.
    fn from_snapshot(snapshot: &ProductSnapshot) -> Self {
        CartLine {
            product_id: snapshot.product_id.clone(),
            barcode: snapshot.barcode.clone(),
            name: snapshot.name.clone(),
            unit_price_cents: snapshot.unit_price_cents,
            quantity: 1,
            stock_available: snapshot.stock_available,
        }
    }

    /// The line subtotal (unit price × quantity), recomputed on every call.
    #[inline]
    pub fn line_subtotal_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    /// The line subtotal as Money.
    #[inline]
    pub fn line_subtotal(&self) -> Money {
        Money::from_cents(self.line_subtotal_cents())
    }
}

// =============================================================================
// Add Outcome
// =============================================================================

/// What `add_or_increment` did.
///
/// Not an error type: the clamping policy means every outcome leaves the
/// cart in a valid state. Callers (the scan pipeline) use this to pick the
/// feedback cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// New line appended with quantity 1.
    Added,
    /// Existing line's quantity increased by one.
    Incremented,
    /// Existing line already at the stock ceiling; quantity unchanged.
    AtStockCeiling,
    /// Snapshot had zero stock; nothing was added.
    OutOfStock,
    /// Cart is at its line cap; nothing was added.
    CartFull,
}

impl AddOutcome {
    /// Whether the cart was mutated by the add.
    #[inline]
    pub fn mutated(&self) -> bool {
        matches!(self, AddOutcome::Added | AddOutcome::Incremented)
    }

    /// Whether the scanned product ended up represented in the cart
    /// (mutated, or already present at its ceiling).
    #[inline]
    pub fn in_cart(&self) -> bool {
        !matches!(self, AddOutcome::OutOfStock | AddOutcome::CartFull)
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Totals summary, derived from the cart in one pure pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Σ line subtotals.
    pub subtotal_cents: i64,

    /// `subtotal × discount rate`, integer-rounded.
    pub discount_cents: i64,

    /// `subtotal − discount`.
    pub total_cents: i64,

    /// `tendered − total`; present only for cash with a tendered amount.
    /// Negative while the tendered amount is still short of the total.
    pub change_cents: Option<i64>,
}

impl CartTotals {
    /// Totals of an empty cart.
    pub const fn empty() -> Self {
        CartTotals {
            subtotal_cents: 0,
            discount_cents: 0,
            total_cents: 0,
            change_cents: None,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The PDV cart.
///
/// ## Invariants
/// - Lines are unique by `barcode` (re-scanning increments quantity)
/// - `1 ≤ quantity ≤ stock_available` on every line, after every mutation
/// - Cart is empty, or `total ≥ 0` (discount is capped at 100%)
/// - Maximum distinct lines: [`MAX_CART_LINES`]
///
/// ## Lifecycle
/// Created empty per PDV session; reset atomically by [`Cart::clear`] after
/// a successful checkout or an explicit cancel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Lines in the cart, barcode-unique.
    pub lines: Vec<CartLine>,

    /// Discount from the selected customer's tier or a manual override.
    pub discount: DiscountRate,

    /// How the customer will pay.
    pub payment_method: PaymentMethod,

    /// Cash handed over by the customer; meaningful for cash only.
    pub tendered_cents: Option<i64>,

    /// Customer selected for this sale, if any.
    pub customer_id: Option<String>,
}

impl Cart {
    /// Creates a new empty cart with default payment state.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds a product to the cart or increments its line if already present.
    ///
    /// ## Behavior
    /// - line exists for `snapshot.barcode`: `quantity = min(quantity + 1,
    ///   stock_available)` - silently capped, never an error
    /// - no line yet and stock ≥ 1: new line with `quantity = 1`
    /// - no line yet and stock = 0: no-op (a zero-quantity line would break
    ///   the clamp invariant)
    pub fn add_or_increment(&mut self, snapshot: &ProductSnapshot) -> AddOutcome {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.barcode == snapshot.barcode)
        {
            if line.quantity >= line.stock_available {
                return AddOutcome::AtStockCeiling;
            }
            line.quantity += 1;
            return AddOutcome::Incremented;
        }

        if snapshot.stock_available < 1 {
            return AddOutcome::OutOfStock;
        }

        if self.lines.len() >= MAX_CART_LINES {
            return AddOutcome::CartFull;
        }

        self.lines.push(CartLine::from_snapshot(snapshot));
        AddOutcome::Added
    }

    /// Sets a line's quantity, clamped to `[1, stock_available]`.
    ///
    /// The operator's +/- buttons and the quantity field go through here;
    /// out-of-range requests are clamped, an unknown index is an error.
    pub fn set_quantity(&mut self, index: usize, requested: i64) -> CoreResult<()> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(CoreError::LineNotFound { index })?;

        line.quantity = requested.clamp(1, line.stock_available.max(1));
        Ok(())
    }

    /// Removes a line unconditionally.
    pub fn remove_line(&mut self, index: usize) -> CoreResult<()> {
        if index >= self.lines.len() {
            return Err(CoreError::LineNotFound { index });
        }
        self.lines.remove(index);
        Ok(())
    }

    /// Empties the cart and resets discount, payment method, tendered amount
    /// and customer to defaults.
    ///
    /// Idempotent: clearing an already-empty cart is a no-op.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount = DiscountRate::zero();
        self.payment_method = PaymentMethod::default();
        self.tendered_cents = None;
        self.customer_id = None;
    }

    /// Sets the discount rate.
    pub fn set_discount(&mut self, discount: DiscountRate) {
        self.discount = discount;
    }

    /// Sets the payment method; switching away from cash drops the tendered
    /// amount, which is meaningless for other methods.
    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
        if !method.is_cash() {
            self.tendered_cents = None;
        }
    }

    /// Records the cash amount handed over by the customer.
    pub fn set_tendered(&mut self, cents: i64) {
        self.tendered_cents = Some(cents);
    }

    /// Selects a customer (whose tier usually drives the discount).
    pub fn set_customer(&mut self, customer_id: Option<String>) {
        self.customer_id = customer_id;
    }

    /// Whether the cart has no lines.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Computes all totals in one pure pass.
    ///
    /// Side-effect free and callable at any cart state; totals are always
    /// derived from the lines as they are at this instant, never cached.
    /// Change appears only for cash with a tendered amount, matching the
    /// exhaustive [`PaymentMethod`] branch.
    pub fn totals(&self) -> CartTotals {
        let subtotal = Money::from_cents(
            self.lines.iter().map(|l| l.line_subtotal_cents()).sum(),
        );
        let discount = subtotal.discount_amount(self.discount);
        let total = subtotal - discount;

        let change_cents = match self.payment_method {
            PaymentMethod::Cash => self.tendered_cents.map(|t| t - total.cents()),
            PaymentMethod::CreditCard | PaymentMethod::DebitCard | PaymentMethod::Pix => None,
        };

        CartTotals {
            subtotal_cents: subtotal.cents(),
            discount_cents: discount.cents(),
            total_cents: total.cents(),
            change_cents,
        }
    }

    /// Validates the checkout preconditions, before any network call.
    ///
    /// 1. cart non-empty, else [`CoreError::EmptyCart`]
    /// 2. for cash: `tendered ≥ total`, else [`CoreError::InsufficientTender`]
    ///
    /// Non-cash methods settle externally, so the tendered amount never
    /// gates them.
    pub fn validate_checkout(&self) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let totals = self.totals();
        match self.payment_method {
            PaymentMethod::Cash => {
                let tendered = self.tendered_cents.unwrap_or(0);
                if tendered < totals.total_cents {
                    return Err(CoreError::InsufficientTender {
                        tendered_cents: tendered,
                        total_cents: totals.total_cents,
                    });
                }
            }
            PaymentMethod::CreditCard | PaymentMethod::DebitCard | PaymentMethod::Pix => {}
        }

        Ok(())
    }

    /// Builds the sale submission payload.
    ///
    /// Unit prices and names are deliberately left out; the sales service
    /// re-derives them from the catalog so client state can never tamper
    /// with what gets charged.
    pub fn to_payload(&self) -> SalePayload {
        SalePayload {
            items: self
                .lines
                .iter()
                .map(|l| SalePayloadItem {
                    barcode: l.barcode.clone(),
                    quantity: l.quantity,
                })
                .collect(),
            total_cents: self.totals().total_cents,
            payment_method: self.payment_method,
            customer_id: self.customer_id.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(barcode: &str, price_cents: i64, stock: i64) -> ProductSnapshot {
        ProductSnapshot {
            product_id: format!("id-{}", barcode),
            barcode: barcode.to_string(),
            name: format!("Produto {}", barcode),
            unit_price_cents: price_cents,
            stock_available: stock,
        }
    }

    /// Invariant check used by several tests: every line quantity must stay
    /// inside (0, stock_available].
    fn assert_clamp_invariant(cart: &Cart) {
        for line in &cart.lines {
            assert!(line.quantity > 0, "quantity must be positive");
            assert!(
                line.quantity <= line.stock_available,
                "quantity {} exceeds stock {}",
                line.quantity,
                line.stock_available
            );
        }
    }

    #[test]
    fn test_scan_twice_increments_single_line() {
        // Spec scenario: barcode 7891234567890, price 25.50, stock 50,
        // scanned twice → one line, quantity 2, subtotal 51.00
        let mut cart = Cart::new();
        let snap = snapshot("7891234567890", 2550, 50);

        assert_eq!(cart.add_or_increment(&snap), AddOutcome::Added);
        assert_eq!(cart.add_or_increment(&snap), AddOutcome::Incremented);

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.lines[0].line_subtotal_cents(), 5100);
        assert_clamp_invariant(&cart);
    }

    #[test]
    fn test_add_clamps_at_stock_ceiling() {
        let mut cart = Cart::new();
        let snap = snapshot("123456789", 100, 2);

        cart.add_or_increment(&snap);
        cart.add_or_increment(&snap);
        // Third scan: already at stock, silently capped
        assert_eq!(cart.add_or_increment(&snap), AddOutcome::AtStockCeiling);

        assert_eq!(cart.lines[0].quantity, 2);
        assert_clamp_invariant(&cart);
    }

    #[test]
    fn test_add_zero_stock_is_noop() {
        let mut cart = Cart::new();
        let snap = snapshot("123456789", 100, 0);

        assert_eq!(cart.add_or_increment(&snap), AddOutcome::OutOfStock);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_clamps_to_stock_range() {
        let mut cart = Cart::new();
        cart.add_or_increment(&snapshot("123456789", 100, 10));

        cart.set_quantity(0, 25).unwrap();
        assert_eq!(cart.lines[0].quantity, 10); // clamped high

        cart.set_quantity(0, 0).unwrap();
        assert_eq!(cart.lines[0].quantity, 1); // clamped low

        cart.set_quantity(0, -5).unwrap();
        assert_eq!(cart.lines[0].quantity, 1);

        cart.set_quantity(0, 7).unwrap();
        assert_eq!(cart.lines[0].quantity, 7);

        assert_clamp_invariant(&cart);
    }

    #[test]
    fn test_set_quantity_unknown_index() {
        let mut cart = Cart::new();
        let err = cart.set_quantity(3, 1).unwrap_err();
        assert!(matches!(err, CoreError::LineNotFound { index: 3 }));
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new();
        cart.add_or_increment(&snapshot("111111111", 100, 5));
        cart.add_or_increment(&snapshot("222222222", 200, 5));

        cart.remove_line(0).unwrap();
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines[0].barcode, "222222222");

        assert!(cart.remove_line(5).is_err());
    }

    #[test]
    fn test_totals_with_discount() {
        // Spec scenario: subtotal 100.00, 10% discount → 10.00 off, total 90.00
        let mut cart = Cart::new();
        cart.add_or_increment(&snapshot("123456789", 10_000, 5));
        cart.set_discount(DiscountRate::from_percent(10.0));

        let totals = cart.totals();
        assert_eq!(totals.subtotal_cents, 10_000);
        assert_eq!(totals.discount_cents, 1_000);
        assert_eq!(totals.total_cents, 9_000);
    }

    #[test]
    fn test_change_for_cash_payment() {
        let mut cart = Cart::new();
        cart.add_or_increment(&snapshot("123456789", 9_000, 5));
        cart.set_payment_method(PaymentMethod::Cash);
        cart.set_tendered(10_000);

        let totals = cart.totals();
        assert_eq!(totals.change_cents, Some(1_000));
    }

    #[test]
    fn test_change_absent_for_non_cash() {
        let mut cart = Cart::new();
        cart.add_or_increment(&snapshot("123456789", 9_000, 5));
        cart.set_payment_method(PaymentMethod::Cash);
        cart.set_tendered(10_000);

        // Switching to card drops the tendered amount and the change figure
        cart.set_payment_method(PaymentMethod::CreditCard);
        assert_eq!(cart.tendered_cents, None);
        assert_eq!(cart.totals().change_cents, None);

        // And never gates checkout
        assert!(cart.validate_checkout().is_ok());
    }

    #[test]
    fn test_checkout_rejected_on_empty_cart() {
        let cart = Cart::new();
        assert!(matches!(
            cart.validate_checkout().unwrap_err(),
            CoreError::EmptyCart
        ));
    }

    #[test]
    fn test_checkout_rejected_on_insufficient_tender() {
        // Spec scenario: cash, tendered 50.00, total 90.00 → rejected,
        // cart unchanged
        let mut cart = Cart::new();
        cart.add_or_increment(&snapshot("123456789", 9_000, 5));
        cart.set_payment_method(PaymentMethod::Cash);
        cart.set_tendered(5_000);

        let err = cart.validate_checkout().unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientTender {
                tendered_cents: 5_000,
                total_cents: 9_000,
            }
        ));

        // Rejection must not mutate the cart
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.tendered_cents, Some(5_000));
    }

    #[test]
    fn test_checkout_accepts_exact_tender() {
        let mut cart = Cart::new();
        cart.add_or_increment(&snapshot("123456789", 9_000, 5));
        cart.set_tendered(9_000);

        assert!(cart.validate_checkout().is_ok());
        assert_eq!(cart.totals().change_cents, Some(0));
    }

    #[test]
    fn test_clear_resets_everything_idempotently() {
        let mut cart = Cart::new();
        cart.add_or_increment(&snapshot("123456789", 10_000, 5));
        cart.set_discount(DiscountRate::from_percent(15.0));
        cart.set_payment_method(PaymentMethod::Pix);
        cart.set_customer(Some("c1".to_string()));

        cart.clear();

        let totals = cart.totals();
        assert_eq!(totals, CartTotals::empty());
        assert!(cart.discount.is_zero());
        assert_eq!(cart.payment_method, PaymentMethod::Cash);
        assert_eq!(cart.customer_id, None);

        // Clearing again changes nothing
        cart.clear();
        assert_eq!(cart.totals(), CartTotals::empty());
    }

    #[test]
    fn test_payload_omits_prices_and_names() {
        let mut cart = Cart::new();
        cart.add_or_increment(&snapshot("7891234567890", 2550, 50));
        cart.add_or_increment(&snapshot("7891234567890", 2550, 50));
        cart.set_customer(Some("c9".to_string()));

        let payload = cart.to_payload();
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].barcode, "7891234567890");
        assert_eq!(payload.items[0].quantity, 2);
        assert_eq!(payload.total_cents, 5100);
        assert_eq!(payload.customer_id.as_deref(), Some("c9"));
    }

    #[test]
    fn test_cart_line_cap() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_LINES {
            let outcome = cart.add_or_increment(&snapshot(&format!("{:013}", i), 100, 5));
            assert_eq!(outcome, AddOutcome::Added);
        }

        let outcome = cart.add_or_increment(&snapshot("9999999999999", 100, 5));
        assert_eq!(outcome, AddOutcome::CartFull);
        assert_eq!(cart.line_count(), MAX_CART_LINES);
    }

    #[test]
    fn test_total_never_negative_with_full_discount() {
        let mut cart = Cart::new();
        cart.add_or_increment(&snapshot("123456789", 2550, 5));
        cart.set_discount(DiscountRate::from_bps(10_000));

        let totals = cart.totals();
        assert_eq!(totals.total_cents, 0);
        assert!(totals.total_cents >= 0);
    }
}
