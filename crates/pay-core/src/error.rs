//! # Payment Error Types
//!
//! Typed errors for merchant services providers.
//!
//! Declines and gateway errors during authorize, sale and capture are not
//! errors: they are reported in the returned result. `PaymentError` covers
//! local precondition failures and stored-card operations that did not
//! complete.

use crate::result::{CommunicationResult, DeclineReason, ErrorCode};
use thiserror::Error;

/// Core error type for all provider operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider does not implement this operation
    #[error("Unsupported operation [{provider}]: {operation}")]
    UnsupportedOperation { provider: String, operation: String },

    /// Amount cannot be expressed in the currency's smallest unit
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Metadata key or value outside the provider's limits
    #[error("Invalid metadata: {0}")]
    Metadata(String),

    /// A stored-card operation reached the provider but did not succeed
    #[error("{operation} not successful [{provider}]: {message}")]
    OperationFailed {
        provider: String,
        operation: &'static str,
        communication_result: CommunicationResult,
        error_code: Option<ErrorCode>,
        provider_error_code: Option<String>,
        decline_reason: Option<DeclineReason>,
        message: String,
    },

    /// The provider returned the same stored card twice
    #[error("Duplicate provider unique id: {0}")]
    DuplicateProviderUniqueId(String),

    /// Provider not registered
    #[error("Provider not found: {provider_id}")]
    ProviderNotFound { provider_id: String },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns true if repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::OperationFailed {
                communication_result,
                error_code,
                ..
            } => {
                *communication_result == CommunicationResult::IoError
                    || matches!(
                        error_code,
                        Some(ErrorCode::ErrorTryAgain)
                            | Some(ErrorCode::ErrorTryAgain5Minutes)
                            | Some(ErrorCode::RateLimit)
                    )
            }
            _ => false,
        }
    }

    /// Generic error code, when the failure maps to one
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            PaymentError::OperationFailed { error_code, .. } => *error_code,
            PaymentError::InvalidAmount { .. } => Some(ErrorCode::InvalidAmount),
            PaymentError::Configuration(_) => Some(ErrorCode::ProviderConfigurationError),
            PaymentError::DuplicateProviderUniqueId(_) => Some(ErrorCode::Duplicate),
            _ => None,
        }
    }
}

/// Result type alias for provider operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(communication_result: CommunicationResult, error_code: Option<ErrorCode>) -> PaymentError {
        PaymentError::OperationFailed {
            provider: "stripe".into(),
            operation: "store_credit_card",
            communication_result,
            error_code,
            provider_error_code: None,
            decline_reason: None,
            message: "boom".into(),
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(failed(CommunicationResult::IoError, Some(ErrorCode::ErrorTryAgain)).is_retryable());
        assert!(failed(CommunicationResult::GatewayError, Some(ErrorCode::RateLimit)).is_retryable());
        assert!(!failed(
            CommunicationResult::GatewayError,
            Some(ErrorCode::InvalidCardNumber)
        )
        .is_retryable());
        assert!(!PaymentError::InvalidRequest("bad data".into()).is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PaymentError::InvalidAmount {
                message: "x".into()
            }
            .error_code(),
            Some(ErrorCode::InvalidAmount)
        );
        assert_eq!(PaymentError::Internal("x".into()).error_code(), None);
    }

    #[test]
    fn test_display() {
        let err = failed(CommunicationResult::GatewayError, None);
        assert_eq!(err.to_string(), "store_credit_card not successful [stripe]: boom");
    }
}
