use std::sync::Arc;

use crate::application::{
    CheckoutService, FulfillmentService, OrderService, ReconciliationCoordinator,
};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{Catalog, OrderStore};
use crate::gateway::{HttpPaymentGateway, PaymentGateway, SignatureVerifier};
use crate::infrastructure::{DieselCatalog, DieselOrderStore};

/// Settings the HTTP layer needs beyond the services.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub frontend_base_url: String,
    /// Lowercase name of the webhook signature header.
    pub signature_header: String,
}

/// Shared application state handed to every handler via `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub checkout: CheckoutService,
    pub reconciliation: ReconciliationCoordinator,
    pub fulfillment: FulfillmentService,
    pub orders: OrderService,
    pub settings: HttpSettings,
}

impl AppState {
    pub fn new(
        store: Arc<dyn OrderStore>,
        catalog: Arc<dyn Catalog>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: SignatureVerifier,
        currency: &str,
        settings: HttpSettings,
    ) -> Self {
        Self {
            checkout: CheckoutService::new(Arc::clone(&store), catalog, gateway, currency),
            reconciliation: ReconciliationCoordinator::new(Arc::clone(&store), verifier),
            fulfillment: FulfillmentService::new(Arc::clone(&store)),
            orders: OrderService::new(store),
            settings,
        }
    }

    /// Wires the Postgres adapters and the HTTP gateway client.
    pub fn postgres(pool: DbPool, config: &AppConfig) -> Result<Self, DomainError> {
        let gateway_config = &config.gateway;
        let gateway = HttpPaymentGateway::new(
            &gateway_config.base_url,
            &gateway_config.key_id,
            &gateway_config.key_secret,
            gateway_config.timeout,
        )?;
        let verifier =
            SignatureVerifier::new(&gateway_config.key_secret, &gateway_config.webhook_secret)
                .map_err(|e| DomainError::Internal(format!("signature keys: {e}")))?;

        Ok(Self::new(
            Arc::new(DieselOrderStore::new(pool.clone())),
            Arc::new(DieselCatalog::new(pool)),
            Arc::new(gateway),
            verifier,
            &config.currency,
            HttpSettings {
                frontend_base_url: config.frontend_base_url.clone(),
                signature_header: gateway_config.signature_header.clone(),
            },
        ))
    }
}
