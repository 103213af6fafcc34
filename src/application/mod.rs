pub mod checkout;
pub mod fulfillment;
pub mod order_service;
pub mod reconciliation;

pub use checkout::{CheckoutLine, CheckoutReceipt, CheckoutRequest, CheckoutService};
pub use fulfillment::FulfillmentService;
pub use order_service::OrderService;
pub use reconciliation::{
    CheckoutConfirmation, ConfirmationOutcome, ReconciliationCoordinator, ReconciliationResult,
    RedirectParams, RedirectStatus, RedirectTarget, WebhookOutcome,
};

use crate::domain::errors::DomainError;

/// Runs blocking store or catalog work off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
}
