//! # pay-core
//!
//! Provider-agnostic payment model for card-bridge-rs.
//!
//! This crate provides:
//! - `MerchantServicesProvider` trait implemented by gateway adapters
//! - `CreditCard` and `TransactionRequest` describing what to charge
//! - `AuthorizationResult`, `CaptureResult`, `SaleResult` and
//!   `TokenizedCreditCard` describing what happened
//! - `ProviderRegistry` for routing stored cards to their provider
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{CreditCard, Currency, MerchantServicesProvider, TransactionRequest};
//! use rust_decimal::Decimal;
//!
//! let request = TransactionRequest::new(Currency::USD, Decimal::new(2999, 2))
//!     .with_order_number("1042");
//! let card = CreditCard::new("4242424242424242", 12, 2030).with_card_code("123");
//!
//! let result = provider.authorize(&request, &card).await?;
//! if result.is_approved() {
//!     let capture = provider.capture(&result).await?;
//! }
//! ```

pub mod card;
pub mod currency;
pub mod error;
pub mod provider;
pub mod result;
pub mod transaction;

// Re-exports for convenience
pub use card::{
    full_name, mask_card_number, numbers_only, numbers_only_allow_unknown, CreditCard,
    EXPIRATION_DISPLAY_SEPARATOR, MASK_CHARACTER, UNKNOWN_DIGIT, UNKNOWN_MIDDLE,
};
pub use currency::Currency;
pub use error::{PaymentError, PaymentResult};
pub use provider::{BoxedMerchantServicesProvider, MerchantServicesProvider, ProviderRegistry};
pub use result::{
    ApprovalResult, AuthorizationResult, AvsResult, CaptureResult, CommunicationResult,
    CvvResult, DeclineReason, ErrorCode, SaleResult, TokenizedCreditCard,
};
pub use transaction::TransactionRequest;
