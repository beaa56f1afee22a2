//! Persisted cards file

use anyhow::Context;
use pay_core::CreditCard;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Default location of the persisted cards file
pub const DEFAULT_PATH: &str = "config/persisted-cards.toml";

/// Cards the application has stored, keyed by provider unique id
#[derive(Debug, Default, Deserialize)]
pub struct PersistedCards {
    #[serde(default)]
    pub cards: HashMap<String, CreditCard>,
}

impl PersistedCards {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut persisted: PersistedCards = toml::from_str(content)?;
        for (id, card) in persisted.cards.iter_mut() {
            card.provider_unique_id.get_or_insert_with(|| id.clone());
        }
        Ok(persisted)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Cards stored at `provider_id`; cards without a provider belong to
    /// `default_provider`
    pub fn for_provider(&self, provider_id: &str, default_provider: &str) -> HashMap<String, CreditCard> {
        self.cards
            .iter()
            .filter(|(_, card)| card.provider_id.as_deref().unwrap_or(default_provider) == provider_id)
            .map(|(id, card)| (id.clone(), card.clone()))
            .collect()
    }
}
