//! # Stripe API Errors
//!
//! Failures reported by the Stripe API, classified the way Stripe's own
//! client libraries classify them: by HTTP status, then by error type.

use crate::model::PaymentMethod;
use serde::Deserialize;
use thiserror::Error;

/// Class of a Stripe API failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeErrorKind {
    /// Could not reach Stripe or read its response
    ApiConnection,
    /// Stripe failed or returned something unexpected
    Api,
    Authentication,
    /// The card was declined or could not be charged
    Card,
    Idempotency,
    InvalidRequest,
    OAuth,
    Permission,
    RateLimit,
}

impl StripeErrorKind {
    /// Classify an error response by status and error type
    pub fn classify(status: u16, error_type: Option<&str>) -> Self {
        match status {
            400 | 404 if error_type == Some("idempotency_error") => StripeErrorKind::Idempotency,
            400 | 404 => StripeErrorKind::InvalidRequest,
            401 => StripeErrorKind::Authentication,
            402 => StripeErrorKind::Card,
            403 => StripeErrorKind::Permission,
            429 => StripeErrorKind::RateLimit,
            _ => StripeErrorKind::Api,
        }
    }
}

/// The `error` object of a Stripe error response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeErrorObject {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub decline_code: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub doc_url: Option<String>,
    #[serde(default)]
    pub charge: Option<String>,
    /// Present for errors on requests involving a payment method
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// Error body returned by the OAuth endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorObject {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Api { error: StripeErrorObject },
    OAuth(OAuthErrorObject),
}

/// A failed Stripe API call
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StripeApiError {
    pub kind: StripeErrorKind,
    /// HTTP status, absent when no response was received
    pub status: Option<u16>,
    pub request_id: Option<String>,
    pub error: Option<StripeErrorObject>,
    pub oauth_error: Option<OAuthErrorObject>,
    pub message: String,
}

impl StripeApiError {
    /// Build from a non-2xx response
    pub fn from_response(status: u16, request_id: Option<String>, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody::Api { error }) => {
                let kind = StripeErrorKind::classify(status, error.error_type.as_deref());
                let message = error
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Stripe API error (HTTP {})", status));
                Self {
                    kind,
                    status: Some(status),
                    request_id,
                    error: Some(error),
                    oauth_error: None,
                    message,
                }
            }
            Ok(ErrorBody::OAuth(oauth)) => Self {
                kind: StripeErrorKind::OAuth,
                status: Some(status),
                request_id,
                message: oauth
                    .error_description
                    .clone()
                    .unwrap_or_else(|| oauth.error.clone()),
                error: None,
                oauth_error: Some(oauth),
            },
            Err(_) => Self::invalid_response(status, request_id, body),
        }
    }

    /// A response body that could not be understood
    pub fn invalid_response(status: u16, request_id: Option<String>, body: &str) -> Self {
        Self {
            kind: StripeErrorKind::Api,
            status: Some(status),
            request_id,
            error: None,
            oauth_error: None,
            message: format!(
                "Invalid response object from API: {} (HTTP response code was {})",
                body, status
            ),
        }
    }

    /// The request never produced a response
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: StripeErrorKind::ApiConnection,
            status: None,
            request_id: None,
            error: None,
            oauth_error: None,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.code.as_deref())
    }

    pub fn decline_code(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.decline_code.as_deref())
    }

    pub fn param(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.param.as_deref())
    }

    pub fn doc_url(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.doc_url.as_deref())
    }

    /// Charge created by the failed request, if any
    pub fn charge(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.charge.as_deref())
    }

    /// Card attached to the payment method the error refers to
    pub fn payment_method_card(&self) -> Option<&crate::model::PaymentMethodCard> {
        self.error
            .as_ref()
            .and_then(|e| e.payment_method.as_ref())
            .and_then(|pm| pm.card.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_status() {
        assert_eq!(StripeErrorKind::classify(400, None), StripeErrorKind::InvalidRequest);
        assert_eq!(StripeErrorKind::classify(404, Some("invalid_request_error")), StripeErrorKind::InvalidRequest);
        assert_eq!(StripeErrorKind::classify(400, Some("idempotency_error")), StripeErrorKind::Idempotency);
        assert_eq!(StripeErrorKind::classify(401, None), StripeErrorKind::Authentication);
        assert_eq!(StripeErrorKind::classify(402, Some("card_error")), StripeErrorKind::Card);
        assert_eq!(StripeErrorKind::classify(403, None), StripeErrorKind::Permission);
        assert_eq!(StripeErrorKind::classify(429, None), StripeErrorKind::RateLimit);
        assert_eq!(StripeErrorKind::classify(500, None), StripeErrorKind::Api);
    }

    #[test]
    fn test_card_error_body() {
        let body = r#"{
            "error": {
                "type": "card_error",
                "code": "card_declined",
                "decline_code": "insufficient_funds",
                "message": "Your card has insufficient funds.",
                "charge": "ch_9",
                "doc_url": "https://stripe.com/docs/error-codes/card-declined",
                "payment_method": {
                    "id": "pm_1",
                    "card": { "brand": "visa", "last4": "9995", "exp_month": 4, "exp_year": 2029 }
                }
            }
        }"#;
        let err = StripeApiError::from_response(402, Some("req_123".into()), body);
        assert_eq!(err.kind, StripeErrorKind::Card);
        assert_eq!(err.code(), Some("card_declined"));
        assert_eq!(err.decline_code(), Some("insufficient_funds"));
        assert_eq!(err.request_id.as_deref(), Some("req_123"));
        assert_eq!(err.charge(), Some("ch_9"));
        assert_eq!(err.doc_url(), Some("https://stripe.com/docs/error-codes/card-declined"));
        assert_eq!(err.payment_method_card().unwrap().last4.as_deref(), Some("9995"));
        assert_eq!(err.to_string(), "Your card has insufficient funds.");
    }

    #[test]
    fn test_oauth_error_body() {
        let body = r#"{ "error": "invalid_grant", "error_description": "Authorization code expired" }"#;
        let err = StripeApiError::from_response(400, None, body);
        assert_eq!(err.kind, StripeErrorKind::OAuth);
        assert_eq!(err.oauth_error.as_ref().unwrap().error, "invalid_grant");
        assert_eq!(err.message, "Authorization code expired");
    }

    #[test]
    fn test_unparseable_body() {
        let err = StripeApiError::from_response(502, None, "<html>Bad Gateway</html>");
        assert_eq!(err.kind, StripeErrorKind::Api);
        assert!(err.message.contains("HTTP response code was 502"));
    }
}
