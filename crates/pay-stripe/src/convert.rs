//! # Error Conversion
//!
//! Translates Stripe failures into the generic error taxonomy.
//!
//! See <https://stripe.com/docs/error-codes> and
//! <https://stripe.com/docs/declines/codes>.

use crate::error::{StripeApiError, StripeErrorKind};
use crate::replacement::Replacement;
use pay_core::{CommunicationResult, DeclineReason, ErrorCode, PaymentError};

/// A Stripe `code` or `decline_code` is either an error or a decline, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Error(ErrorCode),
    Declined(DeclineReason),
}

/// A Stripe failure in generic terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedError {
    pub communication_result: CommunicationResult,
    pub provider_error_code: String,
    pub error_code: Option<ErrorCode>,
    pub provider_error_message: String,
    pub decline_reason: Option<DeclineReason>,
    /// Card details Stripe attached to the error, if any
    pub replacement: Option<Replacement>,
}

impl ConvertedError {
    pub fn is_declined(&self) -> bool {
        self.decline_reason.is_some()
    }

    /// Failure of a stored-card operation
    pub fn into_payment_error(self, provider: &str, operation: &'static str) -> PaymentError {
        PaymentError::OperationFailed {
            provider: provider.to_string(),
            operation,
            communication_result: self.communication_result,
            error_code: self.error_code,
            provider_error_code: Some(self.provider_error_code),
            decline_reason: self.decline_reason,
            message: self.provider_error_message,
        }
    }
}

/// Outcome of an `error.code` on a card or invalid-request error
pub fn code_outcome(code: Option<&str>, decline_code: Option<&str>) -> Outcome {
    use ErrorCode as E;
    use Outcome::{Declined, Error};

    match code.unwrap_or_default() {
        "amount_too_large" => Error(E::AmountTooHigh),
        "amount_too_small" => Error(E::InvalidAmount),
        "api_key_expired" => Error(E::GatewaySecurityGuidelinesNotMet),
        "balance_insufficient" => Declined(DeclineReason::InsufficientFunds),
        "card_declined" => decline_code_outcome(decline_code),
        "charge_already_captured" | "charge_already_refunded" | "charge_disputed" => {
            Error(E::Duplicate)
        }
        "charge_exceeds_source_limit" => Declined(DeclineReason::VolumeExceeded1Day),
        "country_unsupported" => Error(E::InvalidCardCountryCode),
        "email_invalid" => Error(E::InvalidCardEmail),
        "expired_card" => Error(E::CardExpired),
        "incorrect_address" => Error(E::InvalidCardAddress),
        "incorrect_cvc" | "invalid_cvc" => Error(E::InvalidCardCode),
        "incorrect_number" | "invalid_number" => Error(E::InvalidCardNumber),
        "incorrect_zip" | "postal_code_invalid" => Error(E::InvalidCardPostalCode),
        "invalid_card_type" | "payment_method_unactivated" => Error(E::CardTypeNotSupported),
        "invalid_charge_amount" => Error(E::InvalidAmount),
        "invalid_expiry_month" | "invalid_expiry_year" => Error(E::InvalidExpirationDate),
        "livemode_mismatch" | "missing" | "testmode_charges_only" => {
            Error(E::ProviderConfigurationError)
        }
        "parameter_invalid_empty"
        | "parameter_invalid_integer"
        | "parameter_invalid_string_blank"
        | "parameter_invalid_string_empty"
        | "parameter_missing"
        | "parameter_unknown"
        | "parameters_exclusive" => Error(E::ProviderConfigurationError),
        "platform_api_key_expired" | "secret_key_required" | "tls_version_unsupported" => {
            Error(E::GatewaySecurityGuidelinesNotMet)
        }
        "processing_error" => Error(E::ErrorTryAgain),
        "rate_limit" => Error(E::RateLimit),
        "shipping_calculation_failed" => Error(E::InvalidShippingAmount),
        "state_unsupported" => Error(E::InvalidCardState),
        "tax_id_invalid" => Error(E::InvalidCustomerTaxId),
        "taxes_calculation_failed" => Error(E::InvalidTaxAmount),
        "token_already_used" | "token_in_use" => Error(E::Duplicate),
        _ => Error(E::Unknown),
    }
}

/// Outcome of a `decline_code` on a `card_declined` error
pub fn decline_code_outcome(decline_code: Option<&str>) -> Outcome {
    use DeclineReason as D;
    use ErrorCode as E;
    use Outcome::{Declined, Error};

    match decline_code.unwrap_or_default() {
        "approve_with_id" | "issuer_not_available" | "try_again_later" => {
            Error(E::ErrorTryAgain5Minutes)
        }
        "card_not_supported" => Error(E::CardTypeNotSupported),
        "card_velocity_exceeded" | "insufficient_funds" | "withdrawal_count_limit_exceeded" => {
            Declined(D::InsufficientFunds)
        }
        "currency_not_supported" => Error(E::CurrencyNotSupported),
        "duplicate_transaction" => Error(E::Duplicate),
        "expired_card" => Declined(D::ExpiredCard),
        "fraudulent" => Declined(D::FraudDetected),
        "incorrect_number" | "invalid_number" => Error(E::InvalidCardNumber),
        "incorrect_cvc" | "invalid_cvc" => Declined(D::Cvv2Mismatch),
        "incorrect_zip" => Declined(D::AvsFailure),
        "invalid_amount" => Error(E::InvalidAmount),
        "invalid_expiry_year" => Error(E::InvalidExpirationDate),
        "invalid_pin" => Error(E::Unknown),
        "lost_card" | "stolen_card" => Declined(D::StolenOrLostCard),
        "pickup_card" => Declined(D::PickUpCard),
        "processing_error" | "reenter_transaction" => Error(E::ErrorTryAgain),
        "security_violation" => Error(E::GatewaySecurityGuidelinesNotMet),
        "testmode_decline" => Error(E::ProviderConfigurationError),
        // call_issuer, do_not_honor, generic_decline, incorrect_pin,
        // pin_try_exceeded, restricted_card, ... and anything new
        _ => Declined(D::Unknown),
    }
}

fn or_empty(value: Option<&str>) -> &str {
    value.unwrap_or_default()
}

fn status_string(err: &StripeApiError) -> String {
    err.status.map(|s| s.to_string()).unwrap_or_default()
}

/// Convert a Stripe failure.
///
/// `masked_card_number` and the expiration describe the card the request
/// was made with, to detect a replacement card attached to the error.
pub fn convert_error(
    provider_id: &str,
    masked_card_number: Option<&str>,
    expiration_month: Option<u8>,
    expiration_year: Option<u16>,
    err: &StripeApiError,
) -> ConvertedError {
    let code = err.code();
    let message = err
        .error
        .as_ref()
        .and_then(|e| e.message.clone())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if err.message.trim().is_empty() {
                format!("{:?}", err.kind)
            } else {
                err.message.clone()
            }
        });

    let replacement = err.payment_method_card().map(|card| {
        Replacement::detect(
            provider_id,
            card,
            masked_card_number,
            expiration_month,
            expiration_year,
        )
    });

    let status = status_string(err);
    let short_code = format!("{},{}", status, or_empty(code));

    let (communication_result, provider_error_code, error_code, decline_reason, message) =
        match err.kind {
            StripeErrorKind::RateLimit => (
                CommunicationResult::GatewayError,
                short_code,
                Some(ErrorCode::RateLimit),
                None,
                message,
            ),
            StripeErrorKind::Card | StripeErrorKind::InvalidRequest => {
                let provider_error_code = format!(
                    "{},{},{},{}",
                    status,
                    or_empty(code),
                    or_empty(err.param()),
                    or_empty(err.decline_code())
                );
                match code_outcome(code, err.decline_code()) {
                    Outcome::Error(error_code) => (
                        CommunicationResult::GatewayError,
                        provider_error_code,
                        Some(error_code),
                        None,
                        message,
                    ),
                    Outcome::Declined(reason) => (
                        CommunicationResult::Success,
                        provider_error_code,
                        None,
                        Some(reason),
                        message,
                    ),
                }
            }
            StripeErrorKind::Authentication | StripeErrorKind::Permission => (
                CommunicationResult::GatewayError,
                short_code,
                Some(ErrorCode::ProviderConfigurationError),
                None,
                message,
            ),
            StripeErrorKind::OAuth => {
                let oauth = err.oauth_error.as_ref();
                let provider_error_code = format!(
                    "{},{},{}",
                    status,
                    or_empty(code),
                    oauth.map(|o| o.error.as_str()).unwrap_or_default()
                );
                let message = oauth
                    .and_then(|o| o.error_description.clone())
                    .unwrap_or(message);
                (
                    CommunicationResult::GatewayError,
                    provider_error_code,
                    Some(ErrorCode::ProviderConfigurationError),
                    None,
                    message,
                )
            }
            StripeErrorKind::Idempotency => (
                CommunicationResult::GatewayError,
                short_code,
                Some(ErrorCode::Duplicate),
                None,
                message,
            ),
            StripeErrorKind::ApiConnection | StripeErrorKind::Api => (
                CommunicationResult::IoError,
                short_code,
                Some(ErrorCode::ErrorTryAgain),
                None,
                message,
            ),
        };

    ConvertedError {
        communication_result,
        provider_error_code,
        error_code,
        provider_error_message: message,
        decline_reason,
        replacement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_error(code: &str, decline_code: Option<&str>) -> StripeApiError {
        let body = serde_json::json!({
            "error": {
                "type": "card_error",
                "code": code,
                "decline_code": decline_code,
                "param": "number",
                "message": "Your card was declined."
            }
        });
        StripeApiError::from_response(402, None, &body.to_string())
    }

    #[test]
    fn test_decline() {
        let err = card_error("card_declined", Some("insufficient_funds"));
        let converted = convert_error("stripe", None, None, None, &err);
        assert_eq!(converted.communication_result, CommunicationResult::Success);
        assert_eq!(converted.decline_reason, Some(DeclineReason::InsufficientFunds));
        assert_eq!(converted.error_code, None);
        assert_eq!(converted.provider_error_code, "402,card_declined,number,insufficient_funds");
        assert_eq!(converted.provider_error_message, "Your card was declined.");
        assert!(converted.replacement.is_none());
    }

    #[test]
    fn test_card_error_not_a_decline() {
        let err = card_error("incorrect_cvc", None);
        let converted = convert_error("stripe", None, None, None, &err);
        assert_eq!(converted.communication_result, CommunicationResult::GatewayError);
        assert_eq!(converted.error_code, Some(ErrorCode::InvalidCardCode));
        assert_eq!(converted.decline_reason, None);
        assert_eq!(converted.provider_error_code, "402,incorrect_cvc,number,");
    }

    #[test]
    fn test_decline_code_table() {
        assert_eq!(
            decline_code_outcome(Some("approve_with_id")),
            Outcome::Error(ErrorCode::ErrorTryAgain5Minutes)
        );
        assert_eq!(decline_code_outcome(Some("lost_card")), Outcome::Declined(DeclineReason::StolenOrLostCard));
        assert_eq!(decline_code_outcome(Some("incorrect_cvc")), Outcome::Declined(DeclineReason::Cvv2Mismatch));
        assert_eq!(decline_code_outcome(Some("incorrect_zip")), Outcome::Declined(DeclineReason::AvsFailure));
        assert_eq!(decline_code_outcome(Some("pickup_card")), Outcome::Declined(DeclineReason::PickUpCard));
        assert_eq!(decline_code_outcome(Some("testmode_decline")), Outcome::Error(ErrorCode::ProviderConfigurationError));
        assert_eq!(decline_code_outcome(Some("do_not_honor")), Outcome::Declined(DeclineReason::Unknown));
        assert_eq!(decline_code_outcome(None), Outcome::Declined(DeclineReason::Unknown));
    }

    #[test]
    fn test_code_table() {
        assert_eq!(code_outcome(Some("amount_too_large"), None), Outcome::Error(ErrorCode::AmountTooHigh));
        assert_eq!(
            code_outcome(Some("charge_exceeds_source_limit"), None),
            Outcome::Declined(DeclineReason::VolumeExceeded1Day)
        );
        assert_eq!(code_outcome(Some("balance_insufficient"), None), Outcome::Declined(DeclineReason::InsufficientFunds));
        assert_eq!(code_outcome(Some("token_in_use"), None), Outcome::Error(ErrorCode::Duplicate));
        assert_eq!(code_outcome(Some("resource_missing"), None), Outcome::Error(ErrorCode::Unknown));
        assert_eq!(code_outcome(None, None), Outcome::Error(ErrorCode::Unknown));
    }

    #[test]
    fn test_rate_limit() {
        let err = StripeApiError::from_response(
            429,
            None,
            r#"{"error":{"type":"invalid_request_error","code":"rate_limit","message":"Too many requests"}}"#,
        );
        let converted = convert_error("stripe", None, None, None, &err);
        assert_eq!(converted.communication_result, CommunicationResult::GatewayError);
        assert_eq!(converted.error_code, Some(ErrorCode::RateLimit));
        assert_eq!(converted.provider_error_code, "429,rate_limit");
    }

    #[test]
    fn test_authentication_and_idempotency() {
        let auth = StripeApiError::from_response(
            401,
            None,
            r#"{"error":{"type":"invalid_request_error","message":"Invalid API Key provided"}}"#,
        );
        let converted = convert_error("stripe", None, None, None, &auth);
        assert_eq!(converted.error_code, Some(ErrorCode::ProviderConfigurationError));
        assert_eq!(converted.provider_error_code, "401,");

        let idem = StripeApiError::from_response(
            400,
            None,
            r#"{"error":{"type":"idempotency_error","message":"Keys for idempotent requests can only be used with the same parameters"}}"#,
        );
        let converted = convert_error("stripe", None, None, None, &idem);
        assert_eq!(converted.error_code, Some(ErrorCode::Duplicate));
        assert_eq!(converted.communication_result, CommunicationResult::GatewayError);
    }

    #[test]
    fn test_oauth() {
        let err = StripeApiError::from_response(
            400,
            None,
            r#"{"error":"invalid_client","error_description":"No such application"}"#,
        );
        let converted = convert_error("stripe", None, None, None, &err);
        assert_eq!(converted.provider_error_code, "400,,invalid_client");
        assert_eq!(converted.provider_error_message, "No such application");
        assert_eq!(converted.error_code, Some(ErrorCode::ProviderConfigurationError));
    }

    #[test]
    fn test_connection_error() {
        let err = StripeApiError::connection("connection refused");
        let converted = convert_error("stripe", None, None, None, &err);
        assert_eq!(converted.communication_result, CommunicationResult::IoError);
        assert_eq!(converted.error_code, Some(ErrorCode::ErrorTryAgain));
        assert_eq!(converted.provider_error_code, ",");
        assert_eq!(converted.provider_error_message, "connection refused");
    }

    #[test]
    fn test_replacement_card_on_error() {
        let body = r#"{
            "error": {
                "type": "card_error",
                "code": "expired_card",
                "message": "Your card has expired.",
                "payment_method": {
                    "id": "pm_1",
                    "card": { "brand": "visa", "last4": "1881", "exp_month": 3, "exp_year": 2031 }
                }
            }
        }"#;
        let err = StripeApiError::from_response(402, None, body);
        let converted = convert_error("stripe", Some("424242XXXXXX4242"), Some(3), Some(2024), &err);
        let replacement = converted.replacement.unwrap();
        assert_eq!(replacement.masked_card_number.as_deref(), Some("4XXXXXXXXXXX1881"));
        assert_eq!(replacement.provider_masked_card_number.as_deref(), Some("visa,1881"));
        assert_eq!(replacement.expiration_year, Some(2031));
        assert_eq!(converted.error_code, Some(ErrorCode::CardExpired));
    }

    #[test]
    fn test_into_payment_error() {
        let err = card_error("card_declined", Some("stolen_card"));
        let converted = convert_error("stripe", None, None, None, &err);
        match converted.into_payment_error("stripe", "store_credit_card") {
            PaymentError::OperationFailed {
                decline_reason,
                provider_error_code,
                ..
            } => {
                assert_eq!(decline_reason, Some(DeclineReason::StolenOrLostCard));
                assert_eq!(provider_error_code.as_deref(), Some("402,card_declined,number,stolen_card"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
