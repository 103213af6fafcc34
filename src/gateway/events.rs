use serde::Deserialize;

use super::GatewayError;

/// The payment object carried by payment webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentEntity {
    /// Gateway payment id.
    pub id: String,
    /// Gateway order (intent) the payment belongs to.
    pub order_id: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    PaymentCaptured(PaymentEntity),
    PaymentAuthorized(PaymentEntity),
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Deserialize)]
struct PaymentPayload {
    payment: EntityWrapper,
}

#[derive(Deserialize)]
struct EntityWrapper {
    entity: PaymentEntity,
}

impl GatewayEvent {
    /// Decodes a webhook body. Only the payment events are inspected further.
    pub fn decode(raw_body: &[u8]) -> Result<Self, GatewayError> {
        let envelope: Envelope = serde_json::from_slice(raw_body)
            .map_err(|e| GatewayError::Malformed(format!("webhook body: {e}")))?;

        match envelope.event.as_str() {
            "payment.captured" => Ok(GatewayEvent::PaymentCaptured(payment_entity(
                envelope.payload,
            )?)),
            "payment.authorized" => Ok(GatewayEvent::PaymentAuthorized(payment_entity(
                envelope.payload,
            )?)),
            _ => Ok(GatewayEvent::Unknown(envelope.event)),
        }
    }

    /// The payment, for events that confirm one.
    pub fn payment(&self) -> Option<&PaymentEntity> {
        match self {
            GatewayEvent::PaymentCaptured(p) | GatewayEvent::PaymentAuthorized(p) => Some(p),
            GatewayEvent::Unknown(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            GatewayEvent::PaymentCaptured(_) => "payment.captured",
            GatewayEvent::PaymentAuthorized(_) => "payment.authorized",
            GatewayEvent::Unknown(name) => name,
        }
    }
}

fn payment_entity(payload: serde_json::Value) -> Result<PaymentEntity, GatewayError> {
    serde_json::from_value::<PaymentPayload>(payload)
        .map(|p| p.payment.entity)
        .map_err(|e| GatewayError::Malformed(format!("payment entity: {e}")))
}
