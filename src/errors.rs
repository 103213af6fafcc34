use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(_) => AppError::NotFound(e.to_string()),
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            DomainError::InvalidSignature => AppError::BadRequest(e.to_string()),
            DomainError::Forbidden(_) => AppError::Forbidden(e.to_string()),
            DomainError::IllegalTransition { .. } | DomainError::PaymentPending => {
                AppError::Conflict(e.to_string())
            }
            DomainError::Gateway(GatewayError::Unavailable(_)) => {
                AppError::ServiceUnavailable(e.to_string())
            }
            DomainError::Gateway(GatewayError::InvalidAmount(msg)) => AppError::BadRequest(msg),
            DomainError::Gateway(_) => AppError::BadGateway(e.to_string()),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                log::error!("Request failed: {}", detail);
                "Internal server error, please try again".to_string()
            }
            AppError::ServiceUnavailable(_) => {
                "Payment gateway unavailable, please try again".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound("Order not found".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("connection refused".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_display() {
        assert_eq!(
            AppError::Internal("msg".to_string()).to_string(),
            "Internal error: msg"
        );
    }

    #[test]
    fn domain_not_found_maps_to_app_not_found() {
        let app_err: AppError = DomainError::NotFound("Order").into();
        assert!(matches!(app_err, AppError::NotFound(ref m) if m == "Order not found"));
    }

    #[test]
    fn domain_invalid_input_maps_to_bad_request() {
        let app_err: AppError = DomainError::InvalidInput("bad value".to_string()).into();
        assert_eq!(app_err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn bad_signature_maps_to_bad_request() {
        let app_err: AppError = DomainError::InvalidSignature.into();
        assert_eq!(app_err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn illegal_transition_and_payment_pending_conflict() {
        let illegal: AppError = DomainError::illegal("delivered", "cancelled").into();
        let pending: AppError = DomainError::PaymentPending.into();
        assert_eq!(illegal.status_code(), StatusCode::CONFLICT);
        assert_eq!(pending.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn forbidden_maps_to_403() {
        let app_err: AppError = DomainError::Forbidden("no".to_string()).into();
        assert_eq!(app_err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn gateway_errors_split_by_retryability() {
        let down: AppError = DomainError::from(GatewayError::Unavailable("timeout".into())).into();
        let rejected: AppError = DomainError::from(GatewayError::Rejected {
            status: 401,
            body: "bad key".into(),
        })
        .into();
        assert_eq!(down.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(rejected.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn domain_internal_maps_to_app_internal() {
        let app_err: AppError = DomainError::Internal("oops".to_string()).into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }
}
