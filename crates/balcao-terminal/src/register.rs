//! # Cash-Register View
//!
//! The terminal's window onto the caixa: a locally cached snapshot of the
//! open session and its ledger, client-side transition guards, and the
//! polling refresh that keeps the displayed balance converging on the
//! server's.
//!
//! ## State Machine (client side)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  Register View Transitions                          │
//! │                                                                     │
//! │   NoSession ──── open(opening, notes) ────► Open                    │
//! │       ▲          guard: no session held,      │                     │
//! │       │          opening ≥ 0                  │                     │
//! │       │                                       │                     │
//! │       │          record_movement(kind, v)  ◄──┤  guard: open,       │
//! │       │                                       │  v > 0              │
//! │       │                                       │                     │
//! │       └──── close(closing, notes) ────────────┘  guard: open,       │
//! │             (session id becomes history)         closing ≥ 0        │
//! │                                                                     │
//! │  Server-side, the same transitions are enforced transactionally;    │
//! │  these guards exist so disabled buttons and instant error messages  │
//! │  do not cost a round trip.                                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read-Refresh Policy
//! Sales recorded through the checkout flow update the session's
//! `totalSales` server-side, asynchronously relative to this view. The view
//! therefore re-fetches on a fixed interval ([`REGISTER_POLL_INTERVAL`]),
//! and eagerly after every local mutation; the checkout completion callback
//! is the natural place to call [`RegisterView::refresh`] for
//! sale-completed freshness. Between refreshes the displayed balance is
//! eventually consistent by design.
//!
//! Stopping the poller (view unmount) aborts future ticks; an in-flight
//! fetch may still complete and its result is discarded harmlessly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::TerminalError;
use crate::services::CashRegisterService;
use balcao_core::validation::{validate_balance_cents, validate_movement_value};
use balcao_core::{CashSession, CoreError, Identity, Movement, MovementKind};

/// How often the register view re-fetches the open session and its ledger.
///
/// Short enough that a completed sale shows up within a breath, long
/// enough not to hammer the service from an idle caixa screen.
pub const REGISTER_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How many ledger entries the movement list displays. The full history is
/// retained server-side regardless.
pub const MOVEMENT_DISPLAY_LIMIT: usize = 50;

/// Locally cached register state.
#[derive(Debug, Default)]
struct ViewState {
    session: Option<CashSession>,
    movements: Vec<Movement>,
}

/// The cash-register view of one terminal.
///
/// Cloneable: the PDV screen and the caixa management screen share the same
/// view (and therefore the same snapshot) through clones.
#[derive(Clone)]
pub struct RegisterView {
    service: Arc<dyn CashRegisterService>,
    identity: Identity,
    state: Arc<Mutex<ViewState>>,
    movement_display_limit: usize,
}

impl RegisterView {
    /// Creates a view over the injected register service.
    pub fn new(service: Arc<dyn CashRegisterService>, identity: Identity) -> Self {
        RegisterView {
            service,
            identity,
            state: Arc::new(Mutex::new(ViewState::default())),
            movement_display_limit: MOVEMENT_DISPLAY_LIMIT,
        }
    }

    /// Overrides the movement display cap (from [`crate::TerminalConfig`]).
    pub fn with_movement_display_limit(mut self, limit: usize) -> Self {
        self.movement_display_limit = limit;
        self
    }

    // -------------------------------------------------------------------------
    // Snapshot accessors (synchronous, lock held briefly)
    // -------------------------------------------------------------------------

    /// The cached open session, if any.
    pub fn session(&self) -> Option<CashSession> {
        self.state.lock().expect("Register state poisoned").session.clone()
    }

    /// The cached running balance, recomputed from the session's source
    /// fields - never stored separately.
    pub fn current_balance_cents(&self) -> Option<i64> {
        self.session().map(|s| s.current_balance_cents())
    }

    /// The cached ledger, most recent first, capped for display.
    pub fn movements(&self) -> Vec<Movement> {
        let state = self.state.lock().expect("Register state poisoned");
        state
            .movements
            .iter()
            .take(self.movement_display_limit)
            .cloned()
            .collect()
    }

    /// Whether the account currently holds an open session (drives which
    /// caixa buttons are enabled).
    pub fn has_open_session(&self) -> bool {
        self.session().is_some()
    }

    // -------------------------------------------------------------------------
    // Refresh
    // -------------------------------------------------------------------------

    /// Re-fetches the open session and its movements.
    ///
    /// This is the only way the cached snapshot changes besides the
    /// mutation methods below; the poller and the checkout completion
    /// callback both land here.
    pub async fn refresh(&self) -> Result<(), TerminalError> {
        let session = self.service.get_open_register(&self.identity).await?;

        let movements = match &session {
            Some(s) => self.service.list_movements(&self.identity, &s.id).await?,
            None => Vec::new(),
        };

        let mut state = self.state.lock().expect("Register state poisoned");
        state.session = session;
        state.movements = movements;

        debug!(
            open = state.session.is_some(),
            movements = state.movements.len(),
            "Register view refreshed"
        );

        Ok(())
    }

    /// Spawns the polling refresh loop.
    ///
    /// A refresh failure is logged and the loop keeps ticking - a flaky
    /// service must not kill the caixa screen. Abort the returned handle to
    /// stop polling; an in-flight refresh finishing after the abort is
    /// simply dropped with the task.
    pub fn spawn_poller(&self, interval: Duration) -> JoinHandle<()> {
        let view = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick primes the view on mount.
            loop {
                ticker.tick().await;
                if let Err(e) = view.refresh().await {
                    warn!(error = %e, "Register poll failed; will retry next tick");
                }
            }
        })
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Opens a session for the account.
    ///
    /// ## Guards (client-side, before any network call)
    /// - no session cached as open (the open button should be disabled)
    /// - `opening_cents ≥ 0`
    ///
    /// The service enforces the same transition atomically; passing the
    /// local guard and failing remotely (another terminal opened first)
    /// surfaces as a transition error and leaves the winner's session
    /// intact.
    pub async fn open(
        &self,
        opening_cents: i64,
        notes: Option<String>,
    ) -> Result<CashSession, TerminalError> {
        validate_balance_cents("opening balance", opening_cents)
            .map_err(CoreError::Validation)?;

        if self.has_open_session() {
            return Err(CoreError::transition(
                "a register session is already open",
            )
            .into());
        }

        let session = self
            .service
            .open_register(&self.identity, opening_cents, notes)
            .await?;

        info!(session_id = %session.id, opening_cents, "Register opened");

        self.set_session(Some(session.clone()), Vec::new());
        Ok(session)
    }

    /// Closes the open session with the operator's counted balance.
    ///
    /// ## Guards
    /// - a session must be cached as open ([`CoreError::NoOpenSession`])
    /// - `closing_cents ≥ 0`
    pub async fn close(
        &self,
        closing_cents: i64,
        notes: Option<String>,
    ) -> Result<CashSession, TerminalError> {
        validate_balance_cents("closing balance", closing_cents)
            .map_err(CoreError::Validation)?;

        let open = self.session().ok_or(CoreError::NoOpenSession)?;

        let closed = self
            .service
            .close_register(&self.identity, &open.id, closing_cents, notes)
            .await?;

        info!(
            session_id = %closed.id,
            closing_cents,
            expected_cents = closed.current_balance_cents(),
            "Register closed"
        );

        self.set_session(None, Vec::new());
        Ok(closed)
    }

    /// Records a supplement or withdrawal against the open session.
    ///
    /// ## Guards
    /// - a session must be cached as open ([`CoreError::NoOpenSession`])
    /// - `value_cents > 0` ([`CoreError::NonPositiveMovement`])
    pub async fn record_movement(
        &self,
        kind: MovementKind,
        value_cents: i64,
        description: Option<String>,
    ) -> Result<Movement, TerminalError> {
        if validate_movement_value(value_cents).is_err() {
            return Err(CoreError::NonPositiveMovement { value_cents }.into());
        }

        let open = self.session().ok_or(CoreError::NoOpenSession)?;

        let movement = self
            .service
            .record_movement(&self.identity, &open.id, kind, value_cents, description)
            .await?;

        info!(
            movement_id = %movement.id,
            ?kind,
            value_cents,
            "Movement recorded"
        );

        // Pull fresh aggregates so the displayed balance includes the
        // movement immediately instead of waiting for the next poll.
        self.refresh().await?;

        Ok(movement)
    }

    /// Closed-session history for the reporting screen.
    pub async fn history(
        &self,
        include_archived: bool,
    ) -> Result<Vec<CashSession>, TerminalError> {
        Ok(self
            .service
            .list_register_history(&self.identity, include_archived)
            .await?)
    }

    fn set_session(&self, session: Option<CashSession>, movements: Vec<Movement>) {
        let mut state = self.state.lock().expect("Register state poisoned");
        state.session = session;
        state.movements = movements;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::ErrorCode;
    use crate::services::ServiceError;
    use balcao_core::RegisterStatus;

    /// In-memory register service mimicking the server-side guards.
    #[derive(Default)]
    struct MockRegister {
        session: Mutex<Option<CashSession>>,
        movements: Mutex<Vec<Movement>>,
        refreshes: AtomicUsize,
    }

    fn session(id: &str, opening_cents: i64) -> CashSession {
        CashSession {
            id: id.to_string(),
            account_id: "acct-1".to_string(),
            operator_id: "op-1".to_string(),
            operator_name: "Maria".to_string(),
            status: RegisterStatus::Open,
            opening_cents,
            closing_cents: None,
            opening_notes: None,
            closing_notes: None,
            opened_at: Utc::now(),
            closed_at: None,
            archived: false,
            total_sales_cents: 0,
            total_supplements_cents: 0,
            total_withdrawals_cents: 0,
        }
    }

    #[async_trait]
    impl CashRegisterService for MockRegister {
        async fn open_register(
            &self,
            _identity: &Identity,
            opening_cents: i64,
            _notes: Option<String>,
        ) -> Result<CashSession, ServiceError> {
            let mut current = self.session.lock().unwrap();
            if current.is_some() {
                return Err(ServiceError::conflict("already open"));
            }
            let s = session("s1", opening_cents);
            *current = Some(s.clone());
            Ok(s)
        }

        async fn close_register(
            &self,
            _identity: &Identity,
            session_id: &str,
            closing_cents: i64,
            _notes: Option<String>,
        ) -> Result<CashSession, ServiceError> {
            let mut current = self.session.lock().unwrap();
            match current.take() {
                Some(mut s) if s.id == session_id => {
                    s.status = RegisterStatus::Closed;
                    s.closing_cents = Some(closing_cents);
                    s.closed_at = Some(Utc::now());
                    Ok(s)
                }
                other => {
                    *current = other;
                    Err(ServiceError::conflict("not open"))
                }
            }
        }

        async fn record_movement(
            &self,
            _identity: &Identity,
            session_id: &str,
            kind: MovementKind,
            value_cents: i64,
            description: Option<String>,
        ) -> Result<Movement, ServiceError> {
            let mut current = self.session.lock().unwrap();
            let s = current
                .as_mut()
                .filter(|s| s.id == session_id)
                .ok_or_else(|| ServiceError::conflict("not open"))?;

            match kind {
                MovementKind::Supplement => s.total_supplements_cents += value_cents,
                MovementKind::Withdrawal => s.total_withdrawals_cents += value_cents,
            }

            let movement = Movement {
                id: format!("m{}", self.movements.lock().unwrap().len() + 1),
                session_id: session_id.to_string(),
                kind,
                value_cents,
                description,
                created_at: Utc::now(),
            };
            // Most recent first, as the real service lists them
            self.movements.lock().unwrap().insert(0, movement.clone());
            Ok(movement)
        }

        async fn get_open_register(
            &self,
            _identity: &Identity,
        ) -> Result<Option<CashSession>, ServiceError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(self.session.lock().unwrap().clone())
        }

        async fn list_register_history(
            &self,
            _identity: &Identity,
            _include_archived: bool,
        ) -> Result<Vec<CashSession>, ServiceError> {
            Ok(Vec::new())
        }

        async fn list_movements(
            &self,
            _identity: &Identity,
            _session_id: &str,
        ) -> Result<Vec<Movement>, ServiceError> {
            Ok(self.movements.lock().unwrap().clone())
        }
    }

    fn identity() -> Identity {
        Identity::new("op-1", "employee", "acct-1")
    }

    fn view() -> (RegisterView, Arc<MockRegister>) {
        let service = Arc::new(MockRegister::default());
        (RegisterView::new(service.clone(), identity()), service)
    }

    #[tokio::test]
    async fn test_open_then_snapshot() {
        let (view, _) = view();

        assert!(!view.has_open_session());
        let session = view.open(10_000, Some("troco inicial".into())).await.unwrap();
        assert_eq!(session.opening_cents, 10_000);

        assert!(view.has_open_session());
        assert_eq!(view.current_balance_cents(), Some(10_000));
    }

    #[tokio::test]
    async fn test_open_guarded_when_already_open() {
        let (view, service) = view();
        view.open(10_000, None).await.unwrap();

        // Local guard fires before any service call
        let calls_before = service.refreshes.load(Ordering::SeqCst);
        let err = view.open(5_000, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RegisterTransition);
        assert_eq!(service.refreshes.load(Ordering::SeqCst), calls_before);

        // The held session is untouched
        assert_eq!(view.session().unwrap().opening_cents, 10_000);
    }

    #[tokio::test]
    async fn test_open_conflict_from_another_terminal() {
        // Two views over the same service: the second one's cache says
        // NoSession, so the server-side guard is what rejects it.
        let service = Arc::new(MockRegister::default());
        let view_a = RegisterView::new(service.clone(), identity());
        let view_b = RegisterView::new(service.clone(), identity());

        view_a.open(10_000, None).await.unwrap();

        let err = view_b.open(5_000, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RegisterTransition);

        // The winner's session survives; b converges by refreshing
        view_b.refresh().await.unwrap();
        assert_eq!(view_b.session().unwrap().opening_cents, 10_000);
    }

    #[tokio::test]
    async fn test_negative_opening_rejected_locally() {
        let (view, _) = view();
        let err = view.open(-100, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(!view.has_open_session());
    }

    #[tokio::test]
    async fn test_close_without_session_guarded() {
        let (view, _) = view();
        let err = view.close(0, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NoOpenSession);
    }

    #[tokio::test]
    async fn test_close_records_balance() {
        let (view, _) = view();
        view.open(10_000, None).await.unwrap();

        let closed = view.close(9_900, Some("falta".into())).await.unwrap();
        assert_eq!(closed.status, RegisterStatus::Closed);
        assert_eq!(closed.closing_cents, Some(9_900));

        // View is back to NoSession
        assert!(!view.has_open_session());
        assert_eq!(view.current_balance_cents(), None);
    }

    #[tokio::test]
    async fn test_movement_without_session_guarded() {
        let (view, _) = view();
        let err = view
            .record_movement(MovementKind::Supplement, 500, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NoOpenSession);
    }

    #[tokio::test]
    async fn test_movement_value_guarded() {
        let (view, service) = view();
        view.open(10_000, None).await.unwrap();

        let err = view
            .record_movement(MovementKind::Supplement, 0, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(service.movements.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_movements_update_balance() {
        // Spec scenario: open 100, +50 supplement, −20 withdrawal → 130
        // (plus 30 of sales once the sales service stamps one)
        let (view, service) = view();
        view.open(10_000, None).await.unwrap();

        view.record_movement(MovementKind::Supplement, 5_000, Some("troco".into()))
            .await
            .unwrap();
        view.record_movement(MovementKind::Withdrawal, 2_000, Some("sangria".into()))
            .await
            .unwrap();

        assert_eq!(view.current_balance_cents(), Some(13_000));

        // A sale recorded externally shows up after the next refresh
        service
            .session
            .lock()
            .unwrap()
            .as_mut()
            .unwrap()
            .total_sales_cents = 3_000;
        view.refresh().await.unwrap();
        assert_eq!(view.current_balance_cents(), Some(16_000));
    }

    #[tokio::test]
    async fn test_movement_display_cap() {
        let (view, _) = view();
        let view = view.with_movement_display_limit(3);
        view.open(10_000, None).await.unwrap();

        for i in 1..=5 {
            view.record_movement(MovementKind::Supplement, i * 100, None)
                .await
                .unwrap();
        }

        let shown = view.movements();
        assert_eq!(shown.len(), 3);
        // Most recent first
        assert_eq!(shown[0].value_cents, 500);
        assert_eq!(shown[2].value_cents, 300);
    }

    #[tokio::test]
    async fn test_poller_refreshes_and_stops_on_abort() {
        let (view, service) = view();

        let handle = view.spawn_poller(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let polled = service.refreshes.load(Ordering::SeqCst);
        assert!(polled >= 2, "expected at least 2 polls, got {}", polled);

        handle.abort();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let after_abort = service.refreshes.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(service.refreshes.load(Ordering::SeqCst), after_abort);
    }
}
