//! Payment reconciliation across the three confirmation channels: the
//! checkout modal callback, the browser redirect and the gateway webhook.
//!
//! All three funnel into [`OrderStore::mark_paid`], whose compare-and-set makes
//! the `pending -> paid` transition happen at most once per order however the
//! channels interleave.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderStatus, PaymentCapture};
use crate::domain::ports::{OrderStore, PaymentTransition};
use crate::domain::status::plan_payment_failure;
use crate::gateway::{GatewayEvent, SignatureVerifier};

/// Fields the gateway hands the browser after checkout.
#[derive(Debug, Clone)]
pub struct CheckoutConfirmation {
    pub gateway_order_ref: String,
    pub gateway_payment_ref: String,
    pub signature: String,
    pub local_order_id: Option<Uuid>,
}

impl CheckoutConfirmation {
    pub fn new(
        gateway_order_ref: Option<String>,
        gateway_payment_ref: Option<String>,
        signature: Option<String>,
        local_order_id: Option<Uuid>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            gateway_order_ref: required("gateway_order_ref", gateway_order_ref)?,
            gateway_payment_ref: required("gateway_payment_ref", gateway_payment_ref)?,
            signature: required("signature", signature)?,
            local_order_id,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, DomainError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::InvalidInput(format!("missing '{field}'")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// This confirmation recorded the payment.
    Paid,
    /// Payment had already been recorded by another channel.
    AlreadyPaid,
    SignatureRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub order_id: Uuid,
    pub outcome: ConfirmationOutcome,
}

impl ReconciliationResult {
    pub fn is_success(&self) -> bool {
        self.outcome != ConfirmationOutcome::SignatureRejected
    }
}

/// Query parameters of the browser redirect, all optional on the wire.
#[derive(Debug, Clone, Default)]
pub struct RedirectParams {
    pub order_id: Option<Uuid>,
    pub gateway_order_ref: Option<String>,
    pub gateway_payment_ref: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectStatus {
    Success,
    Failed,
    Error,
}

impl RedirectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RedirectStatus::Success => "success",
            RedirectStatus::Failed => "failed",
            RedirectStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub order_id: Option<Uuid>,
    pub status: RedirectStatus,
    pub reason: Option<&'static str>,
}

impl RedirectTarget {
    /// Frontend URL the browser is sent to.
    pub fn location(&self, frontend_base_url: &str) -> String {
        let base = frontend_base_url.trim_end_matches('/');
        let mut url = match self.order_id {
            Some(id) => format!("{base}/orders/{id}?status={}", self.status.as_str()),
            None => format!("{base}/orders?status={}", self.status.as_str()),
        };
        if let Some(reason) = self.reason {
            url.push_str("&reason=");
            url.push_str(reason);
        }
        url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Settled(Uuid),
    Duplicate(Uuid),
    UnknownOrder,
    /// An event that does not confirm a payment.
    Ignored,
}

#[derive(Clone)]
pub struct ReconciliationCoordinator {
    store: Arc<dyn OrderStore>,
    verifier: SignatureVerifier,
}

impl ReconciliationCoordinator {
    pub fn new(store: Arc<dyn OrderStore>, verifier: SignatureVerifier) -> Self {
        Self { store, verifier }
    }

    /// Handles the checkout modal callback.
    pub async fn confirm(
        &self,
        confirmation: CheckoutConfirmation,
    ) -> Result<ReconciliationResult, DomainError> {
        let order = self.locate(&confirmation).await?;

        if !self.verifier.verify_checkout(
            &confirmation.gateway_order_ref,
            &confirmation.gateway_payment_ref,
            &confirmation.signature,
        ) {
            log::warn!(
                "Checkout signature mismatch for order {} (gateway ref {})",
                order.id,
                confirmation.gateway_order_ref
            );
            self.reject(order.id).await?;
            return Ok(ReconciliationResult {
                order_id: order.id,
                outcome: ConfirmationOutcome::SignatureRejected,
            });
        }

        let capture = PaymentCapture {
            gateway_payment_ref: confirmation.gateway_payment_ref.clone(),
            transaction_id: confirmation.gateway_payment_ref,
            signature: Some(confirmation.signature),
        };
        let outcome = match self.settle(order.id, capture).await? {
            PaymentTransition::Applied { .. } => ConfirmationOutcome::Paid,
            PaymentTransition::AlreadyPaid(_) => ConfirmationOutcome::AlreadyPaid,
        };
        Ok(ReconciliationResult {
            order_id: order.id,
            outcome,
        })
    }

    /// Handles the browser redirect. Never fails: every outcome becomes a
    /// redirect status.
    pub async fn handle_redirect(&self, params: RedirectParams) -> RedirectTarget {
        let confirmation = match CheckoutConfirmation::new(
            params.gateway_order_ref,
            params.gateway_payment_ref,
            params.signature,
            params.order_id,
        ) {
            Ok(c) => c,
            Err(_) => {
                return RedirectTarget {
                    order_id: params.order_id,
                    status: RedirectStatus::Failed,
                    reason: Some("missing_params"),
                }
            }
        };

        match self.confirm(confirmation).await {
            Ok(result) => RedirectTarget {
                order_id: Some(result.order_id),
                status: if result.is_success() {
                    RedirectStatus::Success
                } else {
                    RedirectStatus::Failed
                },
                reason: None,
            },
            Err(e) => {
                log::error!("Payment redirect could not be reconciled: {}", e);
                RedirectTarget {
                    order_id: params.order_id,
                    status: RedirectStatus::Error,
                    reason: None,
                }
            }
        }
    }

    /// Handles a gateway webhook delivery. `raw_body` must be the bytes as
    /// received; the signature covers them exactly.
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, DomainError> {
        let signature = signature.ok_or(DomainError::InvalidSignature)?;
        if !self.verifier.verify_webhook(raw_body, signature) {
            log::warn!("Rejected webhook with invalid signature");
            return Err(DomainError::InvalidSignature);
        }

        let event =
            GatewayEvent::decode(raw_body).map_err(|e| DomainError::InvalidInput(e.to_string()))?;
        let Some(payment) = event.payment() else {
            log::info!("Ignoring webhook event '{}'", event.name());
            return Ok(WebhookOutcome::Ignored);
        };

        let store = Arc::clone(&self.store);
        let gateway_ref = payment.order_id.clone();
        let Some(order) = blocking(move || store.find_by_gateway_ref(&gateway_ref)).await? else {
            log::warn!(
                "Webhook '{}' for unknown gateway order {}",
                event.name(),
                payment.order_id
            );
            return Ok(WebhookOutcome::UnknownOrder);
        };

        let capture = PaymentCapture {
            gateway_payment_ref: payment.id.clone(),
            transaction_id: payment.id.clone(),
            signature: None,
        };
        Ok(match self.settle(order.id, capture).await? {
            PaymentTransition::Applied { .. } => WebhookOutcome::Settled(order.id),
            PaymentTransition::AlreadyPaid(_) => WebhookOutcome::Duplicate(order.id),
        })
    }

    /// Finds the order a confirmation refers to. The local id wins unless the
    /// order it names carries a different gateway reference.
    async fn locate(&self, confirmation: &CheckoutConfirmation) -> Result<Order, DomainError> {
        let store = Arc::clone(&self.store);
        let gateway_ref = confirmation.gateway_order_ref.clone();
        let local_id = confirmation.local_order_id;

        blocking(move || {
            if let Some(id) = local_id {
                match store.find_by_id(id)? {
                    Some(order) if order.gateway_order_ref.as_deref() == Some(gateway_ref.as_str()) => {
                        return Ok(order)
                    }
                    Some(_) => log::warn!(
                        "Order {} does not match gateway ref {}, looking it up by ref",
                        id,
                        gateway_ref
                    ),
                    None => {}
                }
            }
            store
                .find_by_gateway_ref(&gateway_ref)?
                .ok_or(DomainError::NotFound("Order"))
        })
        .await
    }

    async fn settle(
        &self,
        order_id: Uuid,
        capture: PaymentCapture,
    ) -> Result<PaymentTransition, DomainError> {
        let store = Arc::clone(&self.store);
        let transition = blocking(move || store.mark_paid(order_id, &capture, Utc::now())).await?;

        match &transition {
            PaymentTransition::Applied {
                order,
                previous_status,
            } if order.order_status != OrderStatus::Placed => log::warn!(
                "Payment captured for order {} in status {}; status left unchanged",
                order_id,
                previous_status
            ),
            PaymentTransition::Applied {
                previous_status: OrderStatus::Cancelled,
                ..
            } => log::warn!(
                "Payment captured for order {} after it was cancelled; order placed again",
                order_id
            ),
            PaymentTransition::Applied { .. } => {
                log::info!("Payment recorded for order {}", order_id)
            }
            PaymentTransition::AlreadyPaid(_) => {
                log::info!("Duplicate payment confirmation for order {}", order_id)
            }
        }
        Ok(transition)
    }

    async fn reject(&self, order_id: Uuid) -> Result<Order, DomainError> {
        let store = Arc::clone(&self.store);
        blocking(move || {
            let now = Utc::now();
            store.apply(order_id, now, &move |order| Ok(plan_payment_failure(order, now)))
        })
        .await
    }
}
