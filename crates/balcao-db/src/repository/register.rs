//! # Cash-Register Repository
//!
//! Database operations for caixa sessions and the movement ledger.
//! This is where the register invariants actually hold; the terminal's
//! client-side guards are a convenience on top.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Session Lifecycle                               │
//! │                                                                     │
//! │  1. OPEN                                                            │
//! │     └── open() → INSERT status='open'                               │
//! │         idx_register_sessions_one_open rejects a second open        │
//! │         for the account inside the INSERT itself                    │
//! │                                                                     │
//! │  2. OPERATE                                                         │
//! │     ├── record_movement() → append to ledger (open session only)    │
//! │     └── sales stamped with session_id by the sale repository        │
//! │                                                                     │
//! │  3. CLOSE                                                           │
//! │     └── close() → UPDATE ... WHERE status='open'                    │
//! │         rows_affected = 0 means the session was not open            │
//! │                                                                     │
//! │  4. (OPTIONAL) ARCHIVE                                              │
//! │     └── set_archived() → closed sessions only                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Balance
//! Aggregate totals are summed by SQL on every read; the balance is never
//! stored. `current_balance = opening + Σsales + Σsupplements − Σwithdrawals`
//! therefore always reconciles against the ledger rows it was derived from.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use balcao_core::{CashSession, Movement, MovementKind};

/// Shared SELECT for sessions: the aggregate columns are computed inline so
/// every fetch carries consistent totals.
const SESSION_SELECT: &str = r#"
    SELECT s.id, s.account_id, s.operator_id, s.operator_name, s.status,
           s.opening_cents, s.closing_cents, s.opening_notes, s.closing_notes,
           s.opened_at, s.closed_at, s.archived,
           COALESCE((SELECT SUM(v.total_cents) FROM sales v
                     WHERE v.session_id = s.id), 0) AS total_sales_cents,
           COALESCE((SELECT SUM(m.value_cents) FROM movements m
                     WHERE m.session_id = s.id AND m.kind = 'supplement'), 0)
               AS total_supplements_cents,
           COALESCE((SELECT SUM(m.value_cents) FROM movements m
                     WHERE m.session_id = s.id AND m.kind = 'withdrawal'), 0)
               AS total_withdrawals_cents
    FROM register_sessions s
"#;

/// Repository for cash-register database operations.
#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    /// Creates a new RegisterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    /// Opens a new session for the account.
    ///
    /// ## Guard
    /// The partial unique index on `register_sessions(account_id) WHERE
    /// status='open'` makes the "at most one open session" check and the
    /// insert a single atomic step - there is no read-then-write window in
    /// which two terminals could both open. A violation surfaces as
    /// [`DbError::InvalidState`] and the existing session is untouched.
    pub async fn open(
        &self,
        account_id: &str,
        operator_id: &str,
        operator_name: &str,
        opening_cents: i64,
        opening_notes: Option<&str>,
    ) -> DbResult<CashSession> {
        if opening_cents < 0 {
            return Err(DbError::invalid_state(
                "opening balance cannot be negative",
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(account_id = %account_id, opening_cents, "Opening register session");

        let result = sqlx::query(
            r#"
            INSERT INTO register_sessions (
                id, account_id, operator_id, operator_name, status,
                opening_cents, opening_notes, opened_at, archived
            ) VALUES (?1, ?2, ?3, ?4, 'open', ?5, ?6, ?7, 0)
            "#,
        )
        .bind(&id)
        .bind(account_id)
        .bind(operator_id)
        .bind(operator_name)
        .bind(opening_cents)
        .bind(opening_notes)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(e) => {
                let db_err: DbError = e.into();
                // The partial unique index firing means a session is open
                return Err(match db_err {
                    DbError::UniqueViolation { .. } => DbError::invalid_state(
                        "a register session is already open for this account",
                    ),
                    other => other,
                });
            }
        }

        info!(session_id = %id, account_id = %account_id, "Register session opened");

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Session", &id))
    }

    /// Closes an open session, recording the operator's counted balance.
    ///
    /// The `WHERE status='open'` predicate makes closing idempotent-safe:
    /// closing a session that is not open affects zero rows and is reported
    /// as [`DbError::InvalidState`] (or NotFound when the id is unknown)
    /// without mutating anything.
    pub async fn close(
        &self,
        session_id: &str,
        closing_cents: i64,
        closing_notes: Option<&str>,
    ) -> DbResult<CashSession> {
        if closing_cents < 0 {
            return Err(DbError::invalid_state(
                "closing balance cannot be negative",
            ));
        }

        let now = Utc::now();

        debug!(session_id = %session_id, closing_cents, "Closing register session");

        let result = sqlx::query(
            r#"
            UPDATE register_sessions
            SET status = 'closed', closing_cents = ?2, closing_notes = ?3,
                closed_at = ?4
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(session_id)
        .bind(closing_cents)
        .bind(closing_notes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(session_id).await? {
                Some(_) => Err(DbError::invalid_state("session is not open")),
                None => Err(DbError::not_found("Session", session_id)),
            };
        }

        info!(session_id = %session_id, "Register session closed");

        self.get_by_id(session_id)
            .await?
            .ok_or_else(|| DbError::not_found("Session", session_id))
    }

    /// Appends a movement to an open session's ledger.
    ///
    /// ## Guards
    /// - `value_cents > 0` (also a CHECK constraint on the table)
    /// - the session must currently be open; checked inside a transaction so
    ///   a concurrent close cannot slip a movement into a closed session
    pub async fn record_movement(
        &self,
        session_id: &str,
        kind: MovementKind,
        value_cents: i64,
        description: Option<&str>,
    ) -> DbResult<Movement> {
        if value_cents <= 0 {
            return Err(DbError::invalid_state("movement value must be positive"));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(session_id = %session_id, ?kind, value_cents, "Recording movement");

        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM register_sessions WHERE id = ?1")
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await?;

        match status.as_deref() {
            Some("open") => {}
            Some(_) => return Err(DbError::invalid_state("session is not open")),
            None => return Err(DbError::not_found("Session", session_id)),
        }

        sqlx::query(
            r#"
            INSERT INTO movements (id, session_id, kind, value_cents, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(session_id)
        .bind(kind)
        .bind(value_cents)
        .bind(description)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(movement_id = %id, session_id = %session_id, ?kind, value_cents, "Movement recorded");

        let movement = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, session_id, kind, value_cents, description, created_at
            FROM movements
            WHERE id = ?1
            "#,
        )
        .bind(&id)
        .fetch_one(&self.pool)
        .await?;

        Ok(movement)
    }

    /// Gets a session by ID, with aggregates.
    pub async fn get_by_id(&self, session_id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!("{} WHERE s.id = ?1", SESSION_SELECT);

        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Gets the account's open session, if any.
    ///
    /// This is the read behind the terminal's polling refresh; the
    /// aggregates are summed inside this query, so every poll carries a
    /// balance consistent with the ledger at query time.
    pub async fn get_open(&self, account_id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "{} WHERE s.account_id = ?1 AND s.status = 'open'",
            SESSION_SELECT
        );

        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Lists the account's sessions, most recently opened first.
    ///
    /// Archived sessions are hidden unless `include_archived` is set.
    pub async fn list_history(
        &self,
        account_id: &str,
        include_archived: bool,
    ) -> DbResult<Vec<CashSession>> {
        let sql = format!(
            "{} WHERE s.account_id = ?1 AND (?2 OR s.archived = 0) \
             ORDER BY s.opened_at DESC",
            SESSION_SELECT
        );

        let sessions = sqlx::query_as::<_, CashSession>(&sql)
            .bind(account_id)
            .bind(include_archived)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    /// Lists a session's movements, most recent first.
    ///
    /// The full history is always returned; display capping is a terminal
    /// concern.
    pub async fn list_movements(&self, session_id: &str) -> DbResult<Vec<Movement>> {
        let movements = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, session_id, kind, value_cents, description, created_at
            FROM movements
            WHERE session_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Flags or unflags a closed session as archived.
    ///
    /// The archival flag is the only mutation a closed session accepts.
    pub async fn set_archived(&self, session_id: &str, archived: bool) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE register_sessions
            SET archived = ?2
            WHERE id = ?1 AND status = 'closed'
            "#,
        )
        .bind(session_id)
        .bind(archived)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(session_id).await? {
                Some(_) => Err(DbError::invalid_state(
                    "only closed sessions can be archived",
                )),
                None => Err(DbError::not_found("Session", session_id)),
            };
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
