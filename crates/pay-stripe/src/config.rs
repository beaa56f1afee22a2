//! # Stripe Configuration
//!
//! Configuration management for the Stripe adapter.
//! Secrets are loaded from environment variables.

use pay_core::PaymentError;
use std::env;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Pinned so that object shapes (`latest_charge`, automatic payment methods)
/// do not drift with the account default.
const DEFAULT_API_VERSION: &str = "2023-10-16";

const DEFAULT_PROVIDER_ID: &str = "stripe";

/// Prepended to purely numeric order numbers to form a statement descriptor
const DEFAULT_STATEMENT_DESCRIPTOR_PREFIX: &str = "AO#";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Stripe API configuration
#[derive(Clone)]
pub struct StripeConfig {
    /// Identifier of this provider instance
    pub provider_id: String,

    /// Secret or restricted API key (sk_test_..., sk_live_..., rk_...)
    pub secret_key: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Statement descriptor prefix for order numbers without letters
    pub statement_descriptor_prefix: String,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_KEY`
    ///
    /// Optional:
    /// - `STRIPE_PROVIDER_ID`, `STRIPE_API_BASE_URL`, `STRIPE_API_VERSION`,
    ///   `STRIPE_TIMEOUT_SECS`, `STRIPE_STATEMENT_DESCRIPTOR_PREFIX`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let secret_key = env::var("STRIPE_SECRET_KEY").map_err(|_| {
            PaymentError::Configuration("STRIPE_SECRET_KEY not set".to_string())
        })?;
        validate_secret_key(&secret_key)?;

        let timeout = match env::var("STRIPE_TIMEOUT_SECS") {
            Ok(secs) => secs.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                PaymentError::Configuration(format!("STRIPE_TIMEOUT_SECS is not a number: {}", secs))
            })?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            provider_id: env::var("STRIPE_PROVIDER_ID")
                .unwrap_or_else(|_| DEFAULT_PROVIDER_ID.to_string()),
            secret_key,
            api_base_url: env::var("STRIPE_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            api_version: env::var("STRIPE_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            timeout,
            statement_descriptor_prefix: env::var("STRIPE_STATEMENT_DESCRIPTOR_PREFIX")
                .unwrap_or_else(|_| DEFAULT_STATEMENT_DESCRIPTOR_PREFIX.to_string()),
        })
    }

    /// Create config with explicit values
    pub fn new(provider_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            secret_key: secret_key.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            statement_descriptor_prefix: DEFAULT_STATEMENT_DESCRIPTOR_PREFIX.to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_") || self.secret_key.starts_with("rk_test_")
    }

    /// Check if using live keys
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("sk_live_") || self.secret_key.starts_with("rk_live_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set the provider id
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    /// Builder: set the API version
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Builder: set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: set the statement descriptor prefix
    pub fn with_statement_descriptor_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.statement_descriptor_prefix = prefix.into();
        self
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("provider_id", &self.provider_id)
            .field("secret_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .field("statement_descriptor_prefix", &self.statement_descriptor_prefix)
            .finish()
    }
}

fn validate_secret_key(secret_key: &str) -> Result<(), PaymentError> {
    const PREFIXES: &[&str] = &["sk_test_", "sk_live_", "rk_test_", "rk_live_"];
    if PREFIXES.iter().any(|p| secret_key.starts_with(p)) {
        Ok(())
    } else {
        Err(PaymentError::Configuration(
            "STRIPE_SECRET_KEY must start with sk_test_, sk_live_, rk_test_ or rk_live_"
                .to_string(),
        ))
    }
}
