//! # Local Services
//!
//! In-process implementation of the service ports over [`balcao_db`].
//!
//! Single-store deployments run the terminal and the services in one
//! process against SQLite; multi-store deployments swap these for an HTTP
//! client implementing the same traits. The terminal code cannot tell the
//! difference - every invariant it relies on (one open session, atomic sale
//! recording) is enforced underneath the port either way.

use async_trait::async_trait;
use std::sync::Arc;

use crate::services::{CashRegisterService, ProductLookup, SalesService, ServiceError};
use balcao_db::{Database, DbError};
use balcao_core::{
    CashSession, Identity, Movement, MovementKind, ProductSnapshot, SalePayload, SaleResult,
};

/// The three ports, backed by one [`Database`].
#[derive(Clone)]
pub struct LocalServices {
    db: Database,
}

impl LocalServices {
    /// Wraps a database handle.
    pub fn new(db: Database) -> Self {
        LocalServices { db }
    }

    /// Convenience: the same instance behind each port's Arc.
    pub fn into_ports(
        self,
    ) -> (
        Arc<dyn ProductLookup>,
        Arc<dyn SalesService>,
        Arc<dyn CashRegisterService>,
    ) {
        let shared = Arc::new(self);
        (shared.clone(), shared.clone(), shared)
    }
}

/// Maps repository failures onto the port taxonomy.
fn map_db_err(err: DbError) -> ServiceError {
    match err {
        DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
        DbError::InvalidState { message } => ServiceError::Conflict { message },
        DbError::UniqueViolation { field, .. } => ServiceError::Conflict {
            message: format!("duplicate {}", field),
        },
        DbError::ForeignKeyViolation { message } => ServiceError::Rejected { message },
        other => ServiceError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl ProductLookup for LocalServices {
    async fn lookup_by_barcode(
        &self,
        identity: &Identity,
        barcode: &str,
    ) -> Result<Option<ProductSnapshot>, ServiceError> {
        let product = self
            .db
            .products()
            .get_by_barcode(&identity.account_id, barcode)
            .await
            .map_err(map_db_err)?;

        Ok(product.map(|p| p.snapshot()))
    }
}

#[async_trait]
impl SalesService for LocalServices {
    async fn submit_sale(
        &self,
        identity: &Identity,
        payload: &SalePayload,
    ) -> Result<SaleResult, ServiceError> {
        let sale = self
            .db
            .sales()
            .record_sale(&identity.account_id, &identity.user_id, payload)
            .await
            .map_err(|e| match e {
                // A rejected sale is a submission failure, not a register
                // conflict, from the terminal's point of view
                DbError::InvalidState { message } => ServiceError::Rejected { message },
                other => map_db_err(other),
            })?;

        Ok(SaleResult {
            sale_id: sale.id,
            total_cents: sale.total_cents,
            session_id: sale.session_id,
        })
    }
}

#[async_trait]
impl CashRegisterService for LocalServices {
    async fn open_register(
        &self,
        identity: &Identity,
        opening_cents: i64,
        notes: Option<String>,
    ) -> Result<CashSession, ServiceError> {
        self.db
            .registers()
            .open(
                &identity.account_id,
                &identity.user_id,
                // Display-name resolution belongs to the auth collaborator;
                // until it supplies one, the operator id is what history shows.
                &identity.user_id,
                opening_cents,
                notes.as_deref(),
            )
            .await
            .map_err(map_db_err)
    }

    async fn close_register(
        &self,
        _identity: &Identity,
        session_id: &str,
        closing_cents: i64,
        notes: Option<String>,
    ) -> Result<CashSession, ServiceError> {
        self.db
            .registers()
            .close(session_id, closing_cents, notes.as_deref())
            .await
            .map_err(map_db_err)
    }

    async fn record_movement(
        &self,
        _identity: &Identity,
        session_id: &str,
        kind: MovementKind,
        value_cents: i64,
        description: Option<String>,
    ) -> Result<Movement, ServiceError> {
        self.db
            .registers()
            .record_movement(session_id, kind, value_cents, description.as_deref())
            .await
            .map_err(map_db_err)
    }

    async fn get_open_register(
        &self,
        identity: &Identity,
    ) -> Result<Option<CashSession>, ServiceError> {
        self.db
            .registers()
            .get_open(&identity.account_id)
            .await
            .map_err(map_db_err)
    }

    async fn list_register_history(
        &self,
        identity: &Identity,
        include_archived: bool,
    ) -> Result<Vec<CashSession>, ServiceError> {
        self.db
            .registers()
            .list_history(&identity.account_id, include_archived)
            .await
            .map_err(map_db_err)
    }

    async fn list_movements(
        &self,
        _identity: &Identity,
        session_id: &str,
    ) -> Result<Vec<Movement>, ServiceError> {
        self.db
            .registers()
            .list_movements(session_id)
            .await
            .map_err(map_db_err)
    }
}

// =============================================================================
// Integration Tests
// =============================================================================
// The full terminal flow against the real local services and an in-memory
// database: scan → cart → checkout → register aggregates.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::CheckoutFlow;
    use crate::feedback::SilentFeedback;
    use crate::register::RegisterView;
    use crate::scan::{ScanOutcome, ScanPipeline};
    use crate::state::CartState;
    use balcao_core::cart::AddOutcome;
    use balcao_db::DbConfig;
    use balcao_db::repository::product::NewProduct;

    const ACCT: &str = "acct-1";

    fn identity() -> Identity {
        Identity::new("op-1", "employee", ACCT)
    }

    async fn services_with_catalog() -> (LocalServices, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .insert(&NewProduct {
                account_id: ACCT.to_string(),
                barcode: "7891234567890".to_string(),
                name: "Café 500g".to_string(),
                description: None,
                price_cents: 2550,
                stock_quantity: 50,
            })
            .await
            .unwrap();
        (LocalServices::new(db.clone()), db)
    }

    #[tokio::test]
    async fn test_scan_to_checkout_to_register_flow() {
        let (services, db) = services_with_catalog().await;
        let (lookup, sales, registers) = services.into_ports();

        let identity = identity();
        let cart = CartState::new();
        let register = RegisterView::new(registers, identity.clone());

        // Open the caixa with R$ 100.00
        register.open(10_000, None).await.unwrap();

        // Scan the product twice, past the debounce window
        let mut pipeline = ScanPipeline::new(
            cart.clone(),
            lookup.clone(),
            Arc::new(SilentFeedback),
            identity.clone(),
        );
        assert_eq!(
            pipeline.push_str("7891234567890").await,
            ScanOutcome::Resolved(AddOutcome::Added)
        );
        tokio::time::sleep(std::time::Duration::from_millis(120)).await;
        assert_eq!(
            pipeline.push_str("7891234567890").await,
            ScanOutcome::Resolved(AddOutcome::Incremented)
        );
        assert_eq!(cart.with_cart(|c| c.totals().total_cents), 5100);

        // Checkout in cash with R$ 60.00 tendered
        cart.with_cart_mut(|c| c.set_tendered(6_000));
        assert_eq!(cart.with_cart(|c| c.totals().change_cents), Some(900));

        let flow = CheckoutFlow::new(sales);
        let result = flow.submit(&identity, &cart, |_r| {}).await.unwrap();

        assert_eq!(result.total_cents, 5100);
        assert!(result.session_id.is_some());
        assert!(cart.with_cart(|c| c.is_empty()));

        // The register converges on refresh: 100.00 opening + 51.00 sales
        register.refresh().await.unwrap();
        assert_eq!(register.current_balance_cents(), Some(15_100));

        // Stock was decremented server-side; the next scan sees 48
        let snap = LocalServices::new(db)
            .lookup_by_barcode(&identity, "7891234567890")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.stock_available, 48);
    }

    #[tokio::test]
    async fn test_unknown_barcode_against_local_catalog() {
        let (services, _db) = services_with_catalog().await;
        let (lookup, _, _) = services.into_ports();

        let cart = CartState::new();
        let mut pipeline =
            ScanPipeline::new(cart.clone(), lookup, Arc::new(SilentFeedback), identity());

        let outcome = pipeline.push_str("0000000000000").await;
        assert_eq!(outcome, ScanOutcome::NotFound);
        assert!(cart.with_cart(|c| c.is_empty()));
    }

    #[tokio::test]
    async fn test_register_lifecycle_against_local_services() {
        let (services, _db) = services_with_catalog().await;
        let (_, _, registers) = services.into_ports();
        let register = RegisterView::new(registers, identity());

        register.open(10_000, None).await.unwrap();
        register
            .record_movement(MovementKind::Supplement, 5_000, Some("troco".into()))
            .await
            .unwrap();
        register
            .record_movement(MovementKind::Withdrawal, 2_000, Some("sangria".into()))
            .await
            .unwrap();

        assert_eq!(register.current_balance_cents(), Some(13_000));
        assert_eq!(register.movements().len(), 2);

        let closed = register.close(13_000, None).await.unwrap();
        assert_eq!(closed.closing_cents, Some(13_000));

        let history = register.history(false).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total_supplements_cents, 5_000);
    }

    #[tokio::test]
    async fn test_sale_rejection_surfaces_and_preserves_cart() {
        let (services, db) = services_with_catalog().await;
        let (lookup, sales, _) = services.into_ports();

        let identity = identity();
        let cart = CartState::new();
        let mut pipeline = ScanPipeline::new(
            cart.clone(),
            lookup,
            Arc::new(SilentFeedback),
            identity.clone(),
        );

        pipeline.push_str("7891234567890").await;
        assert_eq!(cart.with_cart(|c| c.line_count()), 1);

        // The product sells out between scan and checkout
        let product_id = db
            .products()
            .get_by_barcode(ACCT, "7891234567890")
            .await
            .unwrap()
            .unwrap()
            .id;
        db.products().adjust_stock(&product_id, -50).await.unwrap();

        cart.with_cart_mut(|c| c.set_tendered(10_000));
        let flow = CheckoutFlow::new(sales);
        let err = flow.submit(&identity, &cart, |_| {}).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::SaleSubmission);

        // Cart intact for the operator to amend and retry
        assert_eq!(cart.with_cart(|c| c.line_count()), 1);
    }
}
