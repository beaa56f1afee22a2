//! # Transaction Results
//!
//! Provider-agnostic outcome types. Gateway failures and declines are
//! reported through these values; only local precondition failures are
//! returned as [`PaymentError`](crate::PaymentError).

use serde::{Deserialize, Serialize};

/// How far a request got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommunicationResult {
    /// Failed before anything was sent
    LocalError,
    /// Failed communicating with the gateway, outcome unknown
    IoError,
    /// The gateway processed the request and returned an error
    GatewayError,
    /// The gateway processed the request; see the approval result
    Success,
}

/// Generic error taxonomy shared by all providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AmountTooHigh,
    ApprovedButSettlementFailed,
    CardExpired,
    CardTypeNotSupported,
    CurrencyNotSupported,
    Duplicate,
    ErrorTryAgain,
    ErrorTryAgain5Minutes,
    GatewaySecurityGuidelinesNotMet,
    InvalidAmount,
    InvalidCardAddress,
    InvalidCardCode,
    InvalidCardCountryCode,
    InvalidCardEmail,
    InvalidCardNumber,
    InvalidCardPostalCode,
    InvalidCardState,
    InvalidCustomerTaxId,
    InvalidExpirationDate,
    InvalidShippingAmount,
    InvalidTaxAmount,
    ProviderConfigurationError,
    RateLimit,
    Unknown,
}

/// Outcome of an authorization that reached the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalResult {
    Approved,
    /// Neither approved nor declined yet (e.g. customer action required)
    Hold,
    Declined,
}

/// Why the issuer declined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeclineReason {
    AvsFailure,
    Cvv2Mismatch,
    ExpiredCard,
    FraudDetected,
    InsufficientFunds,
    PickUpCard,
    StolenOrLostCard,
    VolumeExceeded1Day,
    Unknown,
}

/// Card security code verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CvvResult {
    Match,
    NoMatch,
    NotProcessed,
    NotSupportedByIssuer,
    Cvv2NotProvidedByMerchant,
    Unknown,
}

/// Address verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvsResult {
    /// Street address and 5-digit postal code match
    AddressYZip5,
    /// Street address matches, postal code does not
    AddressYZipN,
    /// Postal code matches, street address does not
    AddressNZip5,
    /// Neither matches
    AddressNZipN,
    Unavailable,
    ServiceNotSupported,
    AddressNotProvided,
    Unknown,
}

/// Card details as currently known by the provider.
///
/// The replacement fields are only set when they differ from what the
/// application has persisted, which happens when the card network re-issues
/// a card behind the merchant's back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedCreditCard {
    pub provider_unique_id: String,
    /// Raw provider values, `"{brand},{last4}"`
    pub provider_replacement_masked_card_number: Option<String>,
    pub replacement_masked_card_number: Option<String>,
    /// Raw provider values, `"{exp_month},{exp_year}"`
    pub provider_replacement_expiration: Option<String>,
    pub replacement_expiration_month: Option<u8>,
    pub replacement_expiration_year: Option<u16>,
}

impl TokenizedCreditCard {
    /// Returns true if the provider reported a different card number or expiration
    pub fn has_replacement(&self) -> bool {
        self.replacement_masked_card_number.is_some()
            || self.replacement_expiration_month.is_some()
            || self.replacement_expiration_year.is_some()
    }
}

/// Result of an authorization (or the authorization half of a sale)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub provider_id: String,
    pub communication_result: CommunicationResult,
    pub provider_error_code: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub provider_error_message: Option<String>,
    /// Provider transaction id, used for capture
    pub provider_unique_id: Option<String>,
    pub tokenized_credit_card: Option<TokenizedCreditCard>,
    pub provider_approval_result: Option<String>,
    pub approval_result: Option<ApprovalResult>,
    pub provider_decline_reason: Option<String>,
    pub decline_reason: Option<DeclineReason>,
    pub provider_cvv_result: Option<String>,
    pub cvv_result: Option<CvvResult>,
    pub provider_avs_result: Option<String>,
    pub avs_result: Option<AvsResult>,
    pub approval_code: Option<String>,
}

impl AuthorizationResult {
    /// A result with only the communication fields set
    pub fn new(provider_id: impl Into<String>, communication_result: CommunicationResult) -> Self {
        Self {
            provider_id: provider_id.into(),
            communication_result,
            provider_error_code: None,
            error_code: None,
            provider_error_message: None,
            provider_unique_id: None,
            tokenized_credit_card: None,
            provider_approval_result: None,
            approval_result: None,
            provider_decline_reason: None,
            decline_reason: None,
            provider_cvv_result: None,
            cvv_result: None,
            provider_avs_result: None,
            avs_result: None,
            approval_code: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.communication_result == CommunicationResult::Success
            && self.approval_result == Some(ApprovalResult::Approved)
    }
}

/// Result of capturing a previous authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub provider_id: String,
    pub communication_result: CommunicationResult,
    pub provider_error_code: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub provider_error_message: Option<String>,
    pub provider_unique_id: Option<String>,
}

/// Result of a combined authorize and capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleResult {
    pub authorization: AuthorizationResult,
    pub capture: CaptureResult,
}

impl SaleResult {
    /// Derive the capture half from the authorization of a sale
    pub fn from_authorization(authorization: AuthorizationResult) -> Self {
        let capture = CaptureResult {
            provider_id: authorization.provider_id.clone(),
            communication_result: authorization.communication_result,
            provider_error_code: authorization.provider_error_code.clone(),
            error_code: authorization.error_code,
            provider_error_message: authorization.provider_error_message.clone(),
            provider_unique_id: authorization.provider_unique_id.clone(),
        };
        Self {
            authorization,
            capture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_result_mirrors_authorization() {
        let mut auth = AuthorizationResult::new("stripe", CommunicationResult::GatewayError);
        auth.provider_error_code = Some("402,card_declined,,".to_string());
        auth.error_code = Some(ErrorCode::Unknown);
        auth.provider_unique_id = Some("pi_123".to_string());

        let sale = SaleResult::from_authorization(auth);
        assert_eq!(sale.capture.provider_id, "stripe");
        assert_eq!(sale.capture.communication_result, CommunicationResult::GatewayError);
        assert_eq!(sale.capture.error_code, Some(ErrorCode::Unknown));
        assert_eq!(sale.capture.provider_unique_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn test_is_approved() {
        let mut auth = AuthorizationResult::new("stripe", CommunicationResult::Success);
        assert!(!auth.is_approved());
        auth.approval_result = Some(ApprovalResult::Approved);
        assert!(auth.is_approved());
        auth.approval_result = Some(ApprovalResult::Hold);
        assert!(!auth.is_approved());
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::ErrorTryAgain5Minutes).unwrap(),
            "\"ERROR_TRY_AGAIN5_MINUTES\""
        );
        assert_eq!(
            serde_json::to_string(&AvsResult::AddressYZip5).unwrap(),
            "\"ADDRESS_Y_ZIP5\""
        );
    }

    #[test]
    fn test_has_replacement() {
        let card = TokenizedCreditCard {
            provider_unique_id: "cus_1".to_string(),
            provider_replacement_masked_card_number: Some("visa,4242".to_string()),
            replacement_masked_card_number: None,
            provider_replacement_expiration: Some("12,2030".to_string()),
            replacement_expiration_month: None,
            replacement_expiration_year: None,
        };
        assert!(!card.has_replacement());
    }
}
