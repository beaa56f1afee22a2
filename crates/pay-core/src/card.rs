//! # Credit Card
//!
//! Provider-agnostic credit card record, as persisted by the application and
//! handed to a merchant services provider.

use serde::{Deserialize, Serialize};

/// Character used to hide digits of a card number
pub const MASK_CHARACTER: char = 'X';

/// Placeholder for a single digit that is not known
pub const UNKNOWN_DIGIT: char = '?';

/// Placeholder for a run of digits of unknown length
pub const UNKNOWN_MIDDLE: &str = "???";

/// Separator between month and year when displaying an expiration date
pub const EXPIRATION_DISPLAY_SEPARATOR: char = '/';

/// A credit card, either new (full number present) or stored at a provider
/// (provider unique id present).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditCard {
    /// Unique id in the local persistence layer
    pub persistence_unique_id: Option<String>,

    /// Principal that stored the card
    pub principal_name: Option<String>,

    /// Group the card belongs to
    pub group_name: Option<String>,

    /// Provider that stores this card
    pub provider_id: Option<String>,

    /// Provider-side id of the stored card
    pub provider_unique_id: Option<String>,

    /// Full card number; only present for new cards
    #[serde(skip_serializing)]
    pub card_number: Option<String>,

    /// Masked card number safe for display and persistence
    pub masked_card_number: Option<String>,

    pub expiration_month: Option<u8>,
    pub expiration_year: Option<u16>,

    /// Card security code; never persisted
    #[serde(skip_serializing)]
    pub card_code: Option<String>,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub customer_id: Option<String>,
    pub customer_tax_id: Option<String>,
    pub street_address1: Option<String>,
    pub street_address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
    pub comments: Option<String>,
}

impl CreditCard {
    /// Create a new card from its full number and expiration
    pub fn new(card_number: impl Into<String>, expiration_month: u8, expiration_year: u16) -> Self {
        let card_number = card_number.into();
        Self {
            masked_card_number: Some(mask_card_number(&card_number)),
            card_number: Some(card_number),
            expiration_month: Some(expiration_month),
            expiration_year: Some(expiration_year),
            ..Default::default()
        }
    }

    /// Reference a card already stored at a provider
    pub fn stored(
        provider_id: impl Into<String>,
        provider_unique_id: impl Into<String>,
        masked_card_number: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: Some(provider_id.into()),
            provider_unique_id: Some(provider_unique_id.into()),
            masked_card_number: Some(masked_card_number.into()),
            ..Default::default()
        }
    }

    /// Masked card number, derived from the full number when not set
    pub fn masked_card_number(&self) -> Option<String> {
        self.masked_card_number
            .clone()
            .or_else(|| self.card_number.as_deref().map(mask_card_number))
    }

    /// Cardholder full name
    pub fn full_name(&self) -> Option<String> {
        full_name(self.first_name.as_deref(), self.last_name.as_deref())
    }

    /// Builder: set cardholder name
    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }

    /// Builder: set card security code
    pub fn with_card_code(mut self, card_code: impl Into<String>) -> Self {
        self.card_code = Some(card_code.into());
        self
    }

    /// Builder: set email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Joins first and last names, ignoring blank parts
pub fn full_name(first_name: Option<&str>, last_name: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Keeps only the ASCII digits
pub fn numbers_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Keeps ASCII digits and [`UNKNOWN_DIGIT`] placeholders
pub fn numbers_only_allow_unknown(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == UNKNOWN_DIGIT)
        .collect()
}

/// Masks a card number for display.
///
/// Numbers of 13 or more digits keep their first six (issuer identification)
/// and last four digits. Shorter numbers keep only the last four.
pub fn mask_card_number(card_number: &str) -> String {
    let digits = numbers_only(card_number);
    let len = digits.len();

    let (keep_start, keep_end) = if len >= 13 {
        (6, 4)
    } else if len > 4 {
        (0, 4)
    } else {
        (0, len)
    };

    digits
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if i < keep_start || i >= len - keep_end {
                c
            } else {
                MASK_CHARACTER
            }
        })
        .collect()
}
