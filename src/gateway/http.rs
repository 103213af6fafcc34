use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Serialize;

use super::{to_minor_units, GatewayError, PaymentGateway, RemoteIntent};

/// Gateway client speaking the Orders REST API (`POST /v1/orders`) with
/// basic auth.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Serialize)]
struct IntentRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

impl HttpPaymentGateway {
    pub fn new(
        base_url: &str,
        key_id: &str,
        key_secret: &str,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        })
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Unavailable(format!("request timed out: {e}"))
    } else if e.is_decode() {
        GatewayError::Malformed(e.to_string())
    } else {
        GatewayError::Unavailable(e.to_string())
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_remote_intent(
        &self,
        amount: &BigDecimal,
        currency: &str,
        idempotency_key: &str,
    ) -> Result<RemoteIntent, GatewayError> {
        let amount = to_minor_units(amount)?;

        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&IntentRequest {
                amount,
                currency,
                receipt: idempotency_key,
                payment_capture: 1,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::Unavailable(format!(
                "gateway responded with {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let raw: serde_json::Value = response.json().await.map_err(transport_error)?;
        let gateway_order_ref = raw["id"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| GatewayError::Malformed(format!("intent response missing id: {raw}")))?;

        log::info!(
            "Opened gateway intent {} for receipt {} ({} minor units)",
            gateway_order_ref,
            idempotency_key,
            amount
        );

        Ok(RemoteIntent {
            gateway_order_ref,
            raw,
        })
    }
}
