//! Payment gateway adapter: remote intent creation, HMAC verification of
//! checkout callbacks and webhooks, and typed decoding of webhook events.

mod events;
mod http;
mod signature;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use thiserror::Error;

pub use events::{GatewayEvent, PaymentEntity};
pub use http::HttpPaymentGateway;
pub use signature::SignatureVerifier;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Payment gateway rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Malformed gateway payload: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Whether the client should simply try again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

/// A provisional payment transaction opened with the gateway.
#[derive(Debug, Clone)]
pub struct RemoteIntent {
    pub gateway_order_ref: String,
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_remote_intent(
        &self,
        amount: &BigDecimal,
        currency: &str,
        idempotency_key: &str,
    ) -> Result<RemoteIntent, GatewayError>;
}

/// Converts a major-unit amount into the gateway's integer minor units.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, GatewayError> {
    if *amount <= BigDecimal::zero() {
        return Err(GatewayError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    (amount * BigDecimal::from(100))
        .round(0)
        .to_i64()
        .ok_or_else(|| GatewayError::InvalidAmount(format!("amount {amount} is out of range")))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn minor_units_scale_by_hundred() {
        let amount = BigDecimal::from_str("1300.50").unwrap();
        assert_eq!(to_minor_units(&amount).unwrap(), 130050);
    }

    #[test]
    fn zero_and_negative_amounts_are_invalid() {
        for raw in ["0", "-5.00"] {
            let amount = BigDecimal::from_str(raw).unwrap();
            assert!(matches!(
                to_minor_units(&amount),
                Err(GatewayError::InvalidAmount(_))
            ));
        }
    }

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(GatewayError::Unavailable("timeout".into()).is_retryable());
        assert!(!GatewayError::Rejected {
            status: 401,
            body: "bad key".into()
        }
        .is_retryable());
    }
}
