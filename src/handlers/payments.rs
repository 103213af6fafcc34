use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::{
    CheckoutConfirmation, ConfirmationOutcome, RedirectParams, WebhookOutcome,
};
use crate::errors::AppError;
use crate::state::AppState;

/// Fields posted by the checkout modal. The gateway's own field names are
/// accepted as aliases.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id")]
    pub gateway_order_ref: Option<String>,
    #[serde(alias = "razorpay_payment_id")]
    pub gateway_payment_ref: Option<String>,
    #[serde(alias = "razorpay_signature")]
    pub signature: Option<String>,
    #[serde(alias = "orderId")]
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub order_id: Uuid,
    /// Payment had already been recorded through another channel.
    pub already_paid: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PaymentReturnQuery {
    #[serde(alias = "orderId")]
    pub order_id: Option<String>,
    #[serde(alias = "razorpay_order_id")]
    pub gateway_order_ref: Option<String>,
    #[serde(alias = "razorpay_payment_id")]
    pub gateway_payment_ref: Option<String>,
    #[serde(alias = "razorpay_signature")]
    pub signature: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    /// `settled`, `duplicate`, `unknown_order` or `ignored`
    pub status: String,
}

/// POST /payments/verify
#[utoipa::path(
    post,
    path = "/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Verification outcome; `success` is false on a signature mismatch", body = VerifyPaymentResponse),
        (status = 400, description = "Missing fields"),
        (status = 404, description = "Order not found"),
    ),
    tag = "payments"
)]
pub async fn verify_payment(
    state: web::Data<AppState>,
    body: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let confirmation = CheckoutConfirmation::new(
        body.gateway_order_ref,
        body.gateway_payment_ref,
        body.signature,
        body.order_id,
    )?;

    let result = state.reconciliation.confirm(confirmation).await?;
    let response = VerifyPaymentResponse {
        success: result.is_success(),
        order_id: result.order_id,
        already_paid: result.outcome == ConfirmationOutcome::AlreadyPaid,
    };
    Ok(HttpResponse::Ok().json(response))
}

/// GET /payments/return
///
/// Browser redirect target after checkout. Always answers with a redirect to
/// the frontend order page carrying `status=success|failed|error`.
#[utoipa::path(
    get,
    path = "/payments/return",
    params(PaymentReturnQuery),
    responses(
        (status = 302, description = "Redirect to the frontend order page"),
    ),
    tag = "payments"
)]
pub async fn payment_return(
    state: web::Data<AppState>,
    query: web::Query<PaymentReturnQuery>,
) -> HttpResponse {
    let query = query.into_inner();
    let target = state
        .reconciliation
        .handle_redirect(RedirectParams {
            order_id: query
                .order_id
                .as_deref()
                .and_then(|id| Uuid::parse_str(id).ok()),
            gateway_order_ref: query.gateway_order_ref,
            gateway_payment_ref: query.gateway_payment_ref,
            signature: query.signature,
        })
        .await;

    HttpResponse::Found()
        .insert_header((
            header::LOCATION,
            target.location(&state.settings.frontend_base_url),
        ))
        .finish()
}

/// POST /payments/webhook
///
/// The signature is checked against the raw body bytes, so the body is taken
/// unparsed.
#[utoipa::path(
    post,
    path = "/payments/webhook",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event accepted", body = WebhookResponse),
        (status = 400, description = "Missing or invalid signature, or malformed body"),
        (status = 500, description = "Storage failure; the gateway will retry"),
    ),
    tag = "payments"
)]
pub async fn payment_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(state.settings.signature_header.as_str())
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .reconciliation
        .handle_webhook(&body, signature)
        .await?;

    let status = match outcome {
        WebhookOutcome::Settled(_) => "settled",
        WebhookOutcome::Duplicate(_) => "duplicate",
        WebhookOutcome::UnknownOrder => "unknown_order",
        WebhookOutcome::Ignored => "ignored",
    };
    Ok(HttpResponse::Ok().json(WebhookResponse {
        status: status.to_string(),
    }))
}
