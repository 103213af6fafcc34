use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },
    #[error("Order payment has not been settled yet")]
    PaymentPending,
    #[error("Invalid payment signature")]
    InvalidSignature,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn illegal(from: impl ToString, to: impl ToString) -> Self {
        DomainError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
