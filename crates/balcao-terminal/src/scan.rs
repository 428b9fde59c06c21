//! # Barcode Scan Pipeline
//!
//! From raw scanner keystrokes to a cart mutation and a feedback cue.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Scan Pipeline States                            │
//! │                                                                     │
//! │            push_str                buffer ≥ 8 chars, or Enter       │
//! │   Idle ───────────────► Scanning ──────────────────────► Resolving  │
//! │    ▲                                                        │       │
//! │    │          lookup: Some(product) → add to cart, ♪ accept │       │
//! │    │          lookup: None / Err    → ♪ reject              │       │
//! │    │          within 100 ms of last → dropped               │       │
//! │    └────────────────────────────────────────────────────────┘       │
//! │                   (buffer cleared on every exit)                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Debounce Contract
//! Any resolution attempt within [`SCAN_DEBOUNCE_MS`] of the previous
//! *successful* attempt start is dropped - a hard floor protecting against
//! scanner double-fires. The window is global by time, not keyed by
//! barcode: two distinct barcodes scanned faster than 100 ms apart lose the
//! second scan. That is the product's documented behavior, kept as-is; the
//! caller still sees [`ScanOutcome::Debounced`] and may count drops.
//!
//! ## Failure Handling
//! A lookup error is indistinguishable from an unknown barcode at the
//! operator's level: reject cue, buffer cleared, pipeline back to idle.
//! The pipeline never propagates lookup failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::feedback::ScanFeedback;
use crate::services::ProductLookup;
use crate::state::CartState;
use balcao_core::cart::AddOutcome;
use balcao_core::validation::validate_barcode;
use balcao_core::{Identity, MIN_SCAN_LEN, SCAN_DEBOUNCE_MS};

/// Where the pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Empty buffer, waiting for input.
    Idle,
    /// Accumulating scanner keystrokes.
    Scanning,
    /// Awaiting the product lookup.
    Resolving,
}

/// What a pipeline step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Input accumulated, no resolution triggered yet.
    Buffering,

    /// A resolution attempt inside the debounce window was dropped.
    /// Intentionally silent at the operator level.
    Debounced,

    /// The barcode resolved to a product; the [`AddOutcome`] says what the
    /// cart did with it (added, incremented, clamped, or nothing).
    Resolved(AddOutcome),

    /// The barcode resolved to no sellable product (unknown, inactive, or
    /// the lookup failed).
    NotFound,
}

/// The scan pipeline of one PDV terminal.
///
/// Scans are processed strictly in call order: the pipeline borrows itself
/// mutably per step, so two resolutions can never interleave on the same
/// terminal.
pub struct ScanPipeline {
    cart: CartState,
    lookup: Arc<dyn ProductLookup>,
    feedback: Arc<dyn ScanFeedback>,
    identity: Identity,
    buffer: String,
    state: ScanState,
    /// Start instant of the last attempt that passed the debounce gate.
    last_attempt: Option<Instant>,
}

impl ScanPipeline {
    /// Creates a pipeline over the shared cart and injected ports.
    pub fn new(
        cart: CartState,
        lookup: Arc<dyn ProductLookup>,
        feedback: Arc<dyn ScanFeedback>,
        identity: Identity,
    ) -> Self {
        ScanPipeline {
            cart,
            lookup,
            feedback,
            identity,
            buffer: String::new(),
            state: ScanState::Idle,
            last_attempt: None,
        }
    }

    /// Current pipeline state.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Current buffer content (for echoing in the input field).
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Feeds one input event into the buffer.
    ///
    /// USB scanners deliver the whole code as a single burst, so a 13-digit
    /// EAN arrives here in one call and resolves complete. After the
    /// event's text is appended, a buffer of [`MIN_SCAN_LEN`] or more
    /// characters triggers resolution of the *current* buffer content;
    /// shorter codes wait for [`Self::submit`] (the scanner's trailing
    /// Enter).
    pub async fn push_str(&mut self, text: &str) -> ScanOutcome {
        self.buffer.push_str(text);
        self.state = ScanState::Scanning;

        if self.buffer.len() >= MIN_SCAN_LEN {
            return self.resolve_at(Instant::now()).await;
        }

        ScanOutcome::Buffering
    }

    /// Single-keystroke variant of [`Self::push_str`], for manual typing.
    pub async fn push_char(&mut self, c: char) -> ScanOutcome {
        let mut buf = [0u8; 4];
        self.push_str(c.encode_utf8(&mut buf)).await
    }

    /// Explicit Enter: resolves whatever is buffered.
    pub async fn submit(&mut self) -> ScanOutcome {
        self.resolve_at(Instant::now()).await
    }

    /// Resolution with an injected clock instant.
    ///
    /// [`Self::push_char`] and [`Self::submit`] delegate here with
    /// `Instant::now()`; tests drive the debounce window deterministically.
    pub async fn resolve_at(&mut self, now: Instant) -> ScanOutcome {
        // Nothing buffered: Enter on an empty field is a no-op.
        if self.buffer.is_empty() {
            self.state = ScanState::Idle;
            return ScanOutcome::Buffering;
        }

        // The buffer is consumed on every exit path below, dropped scans
        // included - stale scanner input must never bleed into the next scan.
        let barcode = std::mem::take(&mut self.buffer);

        if let Some(last) = self.last_attempt {
            if now.duration_since(last) < Duration::from_millis(SCAN_DEBOUNCE_MS) {
                debug!(barcode = %barcode, "Scan dropped by debounce window");
                self.state = ScanState::Idle;
                return ScanOutcome::Debounced;
            }
        }
        self.last_attempt = Some(now);

        // Scanner noise (non-digit garbage, oversized reads) never reaches
        // the service; it resolves to not-found like any unknown code.
        if validate_barcode(&barcode).is_err() {
            debug!(barcode = %barcode, "Buffer is not a valid barcode");
            self.state = ScanState::Idle;
            self.feedback.rejected();
            return ScanOutcome::NotFound;
        }

        self.state = ScanState::Resolving;
        debug!(barcode = %barcode, "Resolving scan");

        let resolved = match self.lookup.lookup_by_barcode(&self.identity, &barcode).await {
            Ok(found) => found,
            Err(e) => {
                // A lookup failure must never crash the pipeline; the
                // operator just re-scans once the service is back.
                warn!(barcode = %barcode, error = %e, "Product lookup failed");
                None
            }
        };

        self.state = ScanState::Idle;

        match resolved {
            Some(snapshot) => {
                let outcome = self.cart.with_cart_mut(|c| c.add_or_increment(&snapshot));
                debug!(barcode = %barcode, ?outcome, "Scan resolved");

                // Fire-and-forget cue; a found-but-unaddable product (no
                // stock, cart full) plays the reject cue so the operator
                // knows nothing entered the cart.
                if outcome.in_cart() {
                    self.feedback.accepted();
                } else {
                    self.feedback.rejected();
                }

                ScanOutcome::Resolved(outcome)
            }
            None => {
                debug!(barcode = %barcode, "Barcode not found");
                self.feedback.rejected();
                ScanOutcome::NotFound
            }
        }
    }

    /// Clears the buffer without resolving (operator hit Escape).
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ScanState::Idle;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::services::ServiceError;
    use balcao_core::ProductSnapshot;

    struct MapLookup(HashMap<String, ProductSnapshot>);

    #[async_trait]
    impl ProductLookup for MapLookup {
        async fn lookup_by_barcode(
            &self,
            _identity: &Identity,
            barcode: &str,
        ) -> Result<Option<ProductSnapshot>, ServiceError> {
            Ok(self.0.get(barcode).cloned())
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl ProductLookup for FailingLookup {
        async fn lookup_by_barcode(
            &self,
            _identity: &Identity,
            _barcode: &str,
        ) -> Result<Option<ProductSnapshot>, ServiceError> {
            Err(ServiceError::Unavailable("boom".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingFeedback {
        accepted: AtomicUsize,
        rejected: AtomicUsize,
    }

    impl ScanFeedback for CountingFeedback {
        fn accepted(&self) {
            self.accepted.fetch_add(1, Ordering::SeqCst);
        }
        fn rejected(&self) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
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

    fn pipeline_with(
        products: Vec<ProductSnapshot>,
    ) -> (ScanPipeline, CartState, Arc<CountingFeedback>) {
        let cart = CartState::new();
        let feedback = Arc::new(CountingFeedback::default());
        let lookup = Arc::new(MapLookup(
            products.into_iter().map(|p| (p.barcode.clone(), p)).collect(),
        ));
        let pipeline = ScanPipeline::new(cart.clone(), lookup, feedback.clone(), identity());
        (pipeline, cart, feedback)
    }

    async fn feed(pipeline: &mut ScanPipeline, barcode: &str) -> ScanOutcome {
        let mut last = ScanOutcome::Buffering;
        for c in barcode.chars() {
            last = pipeline.push_char(c).await;
        }
        last
    }

    #[tokio::test]
    async fn test_buffer_auto_resolves_at_min_length() {
        let (mut pipeline, cart, feedback) =
            pipeline_with(vec![snapshot("78912345", 2550, 50)]);

        // 7 chars: still buffering
        for c in "7891234".chars() {
            assert_eq!(pipeline.push_char(c).await, ScanOutcome::Buffering);
        }
        assert_eq!(pipeline.state(), ScanState::Scanning);

        // 8th char triggers resolution
        let outcome = pipeline.push_char('5').await;
        assert_eq!(outcome, ScanOutcome::Resolved(AddOutcome::Added));
        assert_eq!(pipeline.state(), ScanState::Idle);
        assert_eq!(pipeline.buffer(), "");

        assert_eq!(cart.with_cart(|c| c.line_count()), 1);
        assert_eq!(feedback.accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scanner_burst_resolves_full_ean13() {
        // A USB scanner delivers the whole code as one input event; the
        // full 13 digits resolve, not the 8-character prefix.
        let (mut pipeline, cart, feedback) =
            pipeline_with(vec![snapshot("7891234567890", 2550, 50)]);

        let outcome = pipeline.push_str("7891234567890").await;
        assert_eq!(outcome, ScanOutcome::Resolved(AddOutcome::Added));

        cart.with_cart(|c| {
            assert_eq!(c.lines[0].barcode, "7891234567890");
            assert_eq!(c.lines[0].unit_price_cents, 2550);
        });
        assert_eq!(feedback.accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enter_resolves_short_code() {
        let (mut pipeline, cart, _) = pipeline_with(vec![snapshot("12345", 100, 5)]);

        for c in "12345".chars() {
            assert_eq!(pipeline.push_char(c).await, ScanOutcome::Buffering);
        }
        let outcome = pipeline.submit().await;
        assert_eq!(outcome, ScanOutcome::Resolved(AddOutcome::Added));
        assert_eq!(cart.with_cart(|c| c.line_count()), 1);
    }

    #[tokio::test]
    async fn test_submit_on_empty_buffer_is_noop() {
        let (mut pipeline, cart, feedback) = pipeline_with(vec![]);

        assert_eq!(pipeline.submit().await, ScanOutcome::Buffering);
        assert!(cart.with_cart(|c| c.is_empty()));
        assert_eq!(feedback.rejected.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_debounce_drops_second_attempt_within_window() {
        // Spec property: two resolution attempts for identical input within
        // 100 ms produce exactly one cart mutation
        let (mut pipeline, cart, feedback) =
            pipeline_with(vec![snapshot("7891234567890", 2550, 50)]);

        let t0 = Instant::now();

        for c in "7891234567890".chars() {
            pipeline.buffer.push(c);
        }
        assert_eq!(
            pipeline.resolve_at(t0).await,
            ScanOutcome::Resolved(AddOutcome::Added)
        );

        // Double-fire 50 ms later: dropped, buffer cleared
        for c in "7891234567890".chars() {
            pipeline.buffer.push(c);
        }
        assert_eq!(
            pipeline.resolve_at(t0 + Duration::from_millis(50)).await,
            ScanOutcome::Debounced
        );
        assert_eq!(pipeline.buffer(), "");

        assert_eq!(cart.with_cart(|c| c.lines[0].quantity), 1);
        assert_eq!(feedback.accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rescan_past_window_increments() {
        // Spec scenario: same barcode twice, > 100 ms apart → one line, qty 2
        let (mut pipeline, cart, _) = pipeline_with(vec![snapshot("7891234567890", 2550, 50)]);

        let t0 = Instant::now();

        for c in "7891234567890".chars() {
            pipeline.buffer.push(c);
        }
        pipeline.resolve_at(t0).await;

        for c in "7891234567890".chars() {
            pipeline.buffer.push(c);
        }
        let outcome = pipeline.resolve_at(t0 + Duration::from_millis(150)).await;
        assert_eq!(outcome, ScanOutcome::Resolved(AddOutcome::Incremented));

        cart.with_cart(|c| {
            assert_eq!(c.line_count(), 1);
            assert_eq!(c.lines[0].quantity, 2);
            assert_eq!(c.lines[0].line_subtotal_cents(), 5100);
        });
    }

    #[tokio::test]
    async fn test_distinct_barcodes_inside_window_also_dropped() {
        // Documented limitation: the debounce is global by time, not keyed
        // by barcode. The second (distinct) scan is lost.
        let (mut pipeline, cart, _) = pipeline_with(vec![
            snapshot("1111111111111", 100, 5),
            snapshot("2222222222222", 200, 5),
        ]);

        let t0 = Instant::now();

        for c in "1111111111111".chars() {
            pipeline.buffer.push(c);
        }
        pipeline.resolve_at(t0).await;

        for c in "2222222222222".chars() {
            pipeline.buffer.push(c);
        }
        assert_eq!(
            pipeline.resolve_at(t0 + Duration::from_millis(50)).await,
            ScanOutcome::Debounced
        );

        assert_eq!(cart.with_cart(|c| c.line_count()), 1);
    }

    #[tokio::test]
    async fn test_unknown_barcode_rejected_and_cleared() {
        let (mut pipeline, cart, feedback) = pipeline_with(vec![]);

        let outcome = feed(&mut pipeline, "99999999").await;
        assert_eq!(outcome, ScanOutcome::NotFound);
        assert_eq!(pipeline.buffer(), "");
        assert_eq!(pipeline.state(), ScanState::Idle);

        assert!(cart.with_cart(|c| c.is_empty()));
        assert_eq!(feedback.rejected.load(Ordering::SeqCst), 1);
        assert_eq!(feedback.accepted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_treated_as_not_found() {
        let cart = CartState::new();
        let feedback = Arc::new(CountingFeedback::default());
        let mut pipeline = ScanPipeline::new(
            cart.clone(),
            Arc::new(FailingLookup),
            feedback.clone(),
            identity(),
        );

        let outcome = feed(&mut pipeline, "78912345").await;
        assert_eq!(outcome, ScanOutcome::NotFound);
        assert!(cart.with_cart(|c| c.is_empty()));
        assert_eq!(feedback.rejected.load(Ordering::SeqCst), 1);

        // The pipeline survives and keeps scanning
        assert_eq!(pipeline.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn test_out_of_stock_scan_plays_reject_cue() {
        let (mut pipeline, cart, feedback) = pipeline_with(vec![snapshot("78912345", 100, 0)]);

        let outcome = feed(&mut pipeline, "78912345").await;
        assert_eq!(outcome, ScanOutcome::Resolved(AddOutcome::OutOfStock));
        assert!(cart.with_cart(|c| c.is_empty()));
        assert_eq!(feedback.rejected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_digit_buffer_never_reaches_lookup() {
        // FailingLookup would error if called; garbage input short-circuits
        let cart = CartState::new();
        let feedback = Arc::new(CountingFeedback::default());
        let mut pipeline = ScanPipeline::new(
            cart.clone(),
            Arc::new(FailingLookup),
            feedback.clone(),
            identity(),
        );

        let outcome = pipeline.push_str("abc!@#12").await;
        assert_eq!(outcome, ScanOutcome::NotFound);
        assert_eq!(feedback.rejected.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.buffer(), "");
    }

    #[tokio::test]
    async fn test_reset_discards_buffer() {
        let (mut pipeline, _, _) = pipeline_with(vec![]);

        pipeline.push_char('1').await;
        pipeline.push_char('2').await;
        pipeline.reset();

        assert_eq!(pipeline.buffer(), "");
        assert_eq!(pipeline.state(), ScanState::Idle);
        assert_eq!(pipeline.submit().await, ScanOutcome::Buffering);
    }
}
