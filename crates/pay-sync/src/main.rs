//! # card-sync
//!
//! Compares the cards stored at Stripe against the application's persisted
//! cards and reports replaced numbers and expirations.
//!
//! ## Usage
//!
//! ```bash
//! export STRIPE_SECRET_KEY=sk_test_...
//!
//! # Persisted cards from the first argument, PERSISTED_CARDS_PATH,
//! # or config/persisted-cards.toml
//! card-sync config/persisted-cards.toml > tokenized-cards.json
//!
//! # JSON logs
//! LOG_FORMAT=json card-sync
//! ```

mod cards;

use anyhow::Context;
use cards::PersistedCards;
use pay_core::{BoxedMerchantServicesProvider, ProviderRegistry};
use pay_stripe::StripeProvider;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PERSISTED_CARDS_PATH").ok())
        .unwrap_or_else(|| cards::DEFAULT_PATH.to_string());
    let persisted = PersistedCards::load(&path)?;
    info!("Loaded {} persisted cards from {}", persisted.cards.len(), path);

    let stripe = StripeProvider::from_env().context("Failed to initialize Stripe")?;
    let default_provider = stripe.config().provider_id.clone();
    let registry = ProviderRegistry::new(default_provider.as_str())
        .with_provider(Arc::new(stripe) as BoxedMerchantServicesProvider);

    let provider = registry
        .default_provider()
        .context("No default provider registered")?;
    if !provider.can_get_tokenized_credit_cards() {
        anyhow::bail!("{} cannot list tokenized cards", provider.provider_id());
    }

    let persisted = persisted.for_provider(provider.provider_id(), &default_provider);
    let tokenized = provider.get_tokenized_credit_cards(&persisted).await?;

    let mut replaced = 0;
    for card in tokenized.values().filter(|card| card.has_replacement()) {
        replaced += 1;
        info!(
            provider_unique_id = %card.provider_unique_id,
            masked_card_number = ?card.replacement_masked_card_number,
            expiration_month = ?card.replacement_expiration_month,
            expiration_year = ?card.replacement_expiration_year,
            "Card replaced"
        );
    }
    let missing = persisted
        .keys()
        .filter(|id| !tokenized.contains_key(id.as_str()))
        .count();
    info!(
        "Synchronized {} cards: {} replaced, {} persisted cards not found at {}",
        tokenized.len(),
        replaced,
        missing,
        provider.provider_id()
    );

    println!("{}", serde_json::to_string_pretty(&tokenized)?);
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    // Logs go to stderr, the report to stdout
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}
