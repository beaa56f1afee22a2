//! # Merchant Services Provider Trait
//!
//! The provider-agnostic interface every payment gateway adapter implements.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              MerchantServicesProvider (trait)               │
//! │  ├── authorize() / sale() / capture()                       │
//! │  ├── store / update / delete stored cards                   │
//! │  └── get_tokenized_credit_cards()                           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!                   ┌────────┴────────┐
//!                   │ StripeProvider  │
//!                   └─────────────────┘
//! ```

use crate::card::CreditCard;
use crate::error::{PaymentError, PaymentResult};
use crate::result::{AuthorizationResult, CaptureResult, SaleResult, TokenizedCreditCard};
use crate::transaction::TransactionRequest;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Core trait for payment gateway adapters.
///
/// Authorize, sale and capture report gateway failures inside their results.
/// Stored-card operations return `Err` when the gateway does not complete
/// them.
#[async_trait]
pub trait MerchantServicesProvider: Send + Sync {
    /// Identifier of this configured provider instance
    fn provider_id(&self) -> &str;

    /// Authorize and capture in one step.
    async fn sale(
        &self,
        request: &TransactionRequest,
        card: &CreditCard,
    ) -> PaymentResult<SaleResult>;

    /// Place a hold on the card for later capture.
    async fn authorize(
        &self,
        request: &TransactionRequest,
        card: &CreditCard,
    ) -> PaymentResult<AuthorizationResult>;

    /// Capture a previous successful authorization.
    async fn capture(&self, authorization: &AuthorizationResult) -> PaymentResult<CaptureResult>;

    /// Void an uncaptured transaction.
    async fn void_transaction(&self, provider_unique_id: &str) -> PaymentResult<()> {
        let _ = provider_unique_id;
        Err(PaymentError::UnsupportedOperation {
            provider: self.provider_id().to_string(),
            operation: "void_transaction".to_string(),
        })
    }

    /// Refund to a card.
    async fn credit(
        &self,
        request: &TransactionRequest,
        card: &CreditCard,
    ) -> PaymentResult<()> {
        let _ = (request, card);
        Err(PaymentError::UnsupportedOperation {
            provider: self.provider_id().to_string(),
            operation: "credit".to_string(),
        })
    }

    /// Whether cards may be stored at this provider
    fn can_store_credit_cards(&self) -> bool {
        false
    }

    /// Store a card, returning the provider unique id.
    async fn store_credit_card(&self, card: &CreditCard) -> PaymentResult<String>;

    /// Update everything except card number and expiration.
    async fn update_credit_card(&self, card: &CreditCard) -> PaymentResult<()>;

    /// Replace the card number and expiration of a stored card.
    async fn update_credit_card_number_and_expiration(
        &self,
        card: &CreditCard,
        card_number: &str,
        expiration_month: u8,
        expiration_year: u16,
        card_code: Option<&str>,
    ) -> PaymentResult<()>;

    /// Update only the expiration of a stored card.
    async fn update_credit_card_expiration(
        &self,
        card: &CreditCard,
        expiration_month: u8,
        expiration_year: u16,
    ) -> PaymentResult<()>;

    /// Remove a stored card.
    async fn delete_credit_card(&self, card: &CreditCard) -> PaymentResult<()>;

    /// Whether [`get_tokenized_credit_cards`](Self::get_tokenized_credit_cards) is available
    fn can_get_tokenized_credit_cards(&self) -> bool {
        false
    }

    /// List every card stored at the provider, comparing against the
    /// application's persisted cards (keyed by provider unique id) to
    /// detect replacement numbers and expirations.
    async fn get_tokenized_credit_cards(
        &self,
        persisted_cards: &HashMap<String, CreditCard>,
    ) -> PaymentResult<IndexMap<String, TokenizedCreditCard>>;
}

/// Type alias for a shared provider (dynamic dispatch)
pub type BoxedMerchantServicesProvider = Arc<dyn MerchantServicesProvider>;

/// Registry of configured providers, keyed by provider id
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, BoxedMerchantServicesProvider>,
    default_provider: String,
}

impl ProviderRegistry {
    /// Create a new registry with a default provider id
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider under its own id
    pub fn register(&mut self, provider: BoxedMerchantServicesProvider) {
        let id = provider.provider_id().to_string();
        self.providers.insert(id, provider);
    }

    /// Register with builder pattern
    pub fn with_provider(mut self, provider: BoxedMerchantServicesProvider) -> Self {
        self.register(provider);
        self
    }

    /// Get the default provider
    pub fn default_provider(&self) -> Option<&BoxedMerchantServicesProvider> {
        self.providers.get(&self.default_provider)
    }

    /// Get a provider by id
    pub fn get(&self, provider_id: &str) -> Option<&BoxedMerchantServicesProvider> {
        self.providers.get(provider_id)
    }

    /// Get the provider that stores a card, or the default for new cards
    pub fn for_card(&self, card: &CreditCard) -> PaymentResult<&BoxedMerchantServicesProvider> {
        match card.provider_id.as_deref() {
            Some(id) => self.get(id).ok_or_else(|| PaymentError::ProviderNotFound {
                provider_id: id.to_string(),
            }),
            None => self
                .default_provider()
                .ok_or_else(|| PaymentError::ProviderNotFound {
                    provider_id: self.default_provider.clone(),
                }),
        }
    }

    /// List all registered provider ids
    pub fn providers(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a provider is registered
    pub fn has_provider(&self, provider_id: &str) -> bool {
        self.providers.contains_key(provider_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use crate::result::CommunicationResult;
    use rust_decimal::Decimal;

    struct NullProvider;

    #[async_trait]
    impl MerchantServicesProvider for NullProvider {
        fn provider_id(&self) -> &str {
            "null"
        }

        async fn sale(
            &self,
            request: &TransactionRequest,
            card: &CreditCard,
        ) -> PaymentResult<SaleResult> {
            Ok(SaleResult::from_authorization(self.authorize(request, card).await?))
        }

        async fn authorize(
            &self,
            _request: &TransactionRequest,
            _card: &CreditCard,
        ) -> PaymentResult<AuthorizationResult> {
            Ok(AuthorizationResult::new("null", CommunicationResult::LocalError))
        }

        async fn capture(&self, _authorization: &AuthorizationResult) -> PaymentResult<CaptureResult> {
            Err(PaymentError::Internal("no capture".into()))
        }

        async fn store_credit_card(&self, _card: &CreditCard) -> PaymentResult<String> {
            Ok("null_1".into())
        }

        async fn update_credit_card(&self, _card: &CreditCard) -> PaymentResult<()> {
            Ok(())
        }

        async fn update_credit_card_number_and_expiration(
            &self,
            _card: &CreditCard,
            _card_number: &str,
            _expiration_month: u8,
            _expiration_year: u16,
            _card_code: Option<&str>,
        ) -> PaymentResult<()> {
            Ok(())
        }

        async fn update_credit_card_expiration(
            &self,
            _card: &CreditCard,
            _expiration_month: u8,
            _expiration_year: u16,
        ) -> PaymentResult<()> {
            Ok(())
        }

        async fn delete_credit_card(&self, _card: &CreditCard) -> PaymentResult<()> {
            Ok(())
        }

        async fn get_tokenized_credit_cards(
            &self,
            _persisted_cards: &HashMap<String, CreditCard>,
        ) -> PaymentResult<IndexMap<String, TokenizedCreditCard>> {
            Ok(IndexMap::new())
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ProviderRegistry::new("null").with_provider(Arc::new(NullProvider));

        assert!(registry.has_provider("null"));
        assert!(registry.default_provider().is_some());

        let new_card = CreditCard::new("4242424242424242", 1, 2031);
        assert_eq!(registry.for_card(&new_card).unwrap().provider_id(), "null");

        let stored = CreditCard::stored("other", "x_1", "4242");
        assert!(matches!(
            registry.for_card(&stored),
            Err(PaymentError::ProviderNotFound { .. })
        ));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new("stripe");
        assert_eq!(registry.providers().len(), 0);
        assert!(registry.default_provider().is_none());
    }

    #[tokio::test]
    async fn test_default_unsupported_operations() {
        let provider = NullProvider;
        let request = TransactionRequest::new(Currency::USD, Decimal::ONE);
        let card = CreditCard::default();

        assert!(matches!(
            provider.void_transaction("pi_1").await,
            Err(PaymentError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            provider.credit(&request, &card).await,
            Err(PaymentError::UnsupportedOperation { .. })
        ));
        assert!(!provider.can_store_credit_cards());
    }
}
