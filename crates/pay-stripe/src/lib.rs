//! # pay-stripe
//!
//! Stripe merchant services provider for card-bridge-rs.
//!
//! [`StripeProvider`] implements `MerchantServicesProvider` on top of the
//! Stripe REST API:
//!
//! - **Transactions** - sale, authorize and capture with PaymentIntents
//! - **Stored cards** - a Customer per card with a default PaymentMethod,
//!   including customers still on legacy card sources
//! - **Synchronization** - reports cards the networks replaced behind the
//!   merchant's back, by masked number and expiration
//!
//! Stripe errors are converted into the generic communication results,
//! error codes and decline reasons.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_core::{CreditCard, Currency, MerchantServicesProvider, TransactionRequest};
//! use pay_stripe::StripeProvider;
//!
//! let provider = StripeProvider::from_env()?;
//!
//! let customer_id = provider.store_credit_card(&card).await?;
//! let stored = CreditCard::stored("stripe", customer_id, card.masked_card_number().unwrap_or_default());
//!
//! let sale = provider.sale(&request, &stored).await?;
//! ```

pub mod checks;
pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod params;
pub mod provider;
pub mod replacement;

// Re-exports
pub use client::StripeClient;
pub use config::StripeConfig;
pub use convert::{convert_error, ConvertedError};
pub use error::{StripeApiError, StripeErrorKind};
pub use provider::StripeProvider;
pub use replacement::Replacement;
