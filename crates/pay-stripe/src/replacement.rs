//! # Replacement Card Details
//!
//! Card networks re-issue cards behind the merchant's back, so the card
//! Stripe holds for a customer may have a new number or expiration. Stripe
//! only reveals the brand and last four digits; this module turns those
//! into the best masked number the brand allows.

use crate::model::CardDetails;
use pay_core::{
    numbers_only, numbers_only_allow_unknown, TokenizedCreditCard, MASK_CHARACTER, UNKNOWN_DIGIT,
    UNKNOWN_MIDDLE,
};
use tracing::warn;

/// `"{first},{second}"` with absent values left empty
pub fn provider_combined<A: ToString, B: ToString>(first: Option<A>, second: Option<B>) -> String {
    format!(
        "{},{}",
        first.map(|v| v.to_string()).unwrap_or_default(),
        second.map(|v| v.to_string()).unwrap_or_default()
    )
}

fn mask(count: usize) -> String {
    std::iter::repeat(MASK_CHARACTER).take(count).collect()
}

/// Masked number for a card Stripe reports by brand and last four digits.
///
/// Returns `None` when unchanged from `old_masked` or when no unambiguous
/// mapping exists.
pub fn replacement_masked_card_number(
    provider_id: &str,
    old_masked: Option<&str>,
    brand: Option<&str>,
    last4: Option<&str>,
) -> Option<String> {
    let (brand, last4) = (brand?, last4?);

    if numbers_only(last4) != last4 {
        warn!(provider_id, "last4 is not all digits, ignoring: {}", last4);
        return None;
    }
    if last4.len() != 4 {
        warn!(provider_id, "last4 is not length 4, ignoring: {}", last4);
        return None;
    }

    if let Some(old_masked) = old_masked {
        // Same last four digits: assume the card was not replaced
        if numbers_only_allow_unknown(old_masked).ends_with(last4) {
            return None;
        }
    }

    // PaymentMethod spelling first, then the legacy card spelling
    match brand {
        // 34 or 37, 15 digits
        "amex" | "American Express" => Some(format!("3{}{}{}", UNKNOWN_DIGIT, mask(9), last4)),
        "diners" | "Diners Club" | "jcb" | "JCB" => Some(format!("{}{}", UNKNOWN_MIDDLE, last4)),
        "discover" | "Discover" => Some(format!("6011{}{}", mask(8), last4)),
        "mastercard" | "MasterCard" => Some(format!("5{}{}{}", UNKNOWN_DIGIT, mask(10), last4)),
        // 62, 16 to 19 digits
        "unionpay" | "UnionPay" => Some(format!("62{}{}", UNKNOWN_MIDDLE, last4)),
        "visa" | "Visa" => Some(format!("4{}{}", mask(11), last4)),
        other => {
            if !other.eq_ignore_ascii_case("unknown") {
                warn!(provider_id, "Unexpected brand: {}", other);
            }
            None
        }
    }
}

/// Stripe's 64-bit expiration month, when it fits
pub fn safe_cast_month(exp_month: Option<i64>) -> Option<u8> {
    exp_month.and_then(|m| u8::try_from(m).ok())
}

/// Stripe's 64-bit expiration year, when it fits
pub fn safe_cast_year(exp_year: Option<i64>) -> Option<u16> {
    exp_year.and_then(|y| u16::try_from(y).ok())
}

/// Replacement details of one card compared against what is persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacement {
    pub provider_masked_card_number: Option<String>,
    pub masked_card_number: Option<String>,
    pub provider_expiration: Option<String>,
    pub expiration_month: Option<u8>,
    pub expiration_year: Option<u16>,
}

impl Replacement {
    /// Compare the card Stripe reports against the persisted card.
    ///
    /// The expiration is only reported when the persisted one is unknown
    /// or differs.
    pub fn detect(
        provider_id: &str,
        reported: &impl CardDetails,
        old_masked: Option<&str>,
        old_month: Option<u8>,
        old_year: Option<u16>,
    ) -> Self {
        Self::from_parts(
            provider_id,
            reported.brand(),
            reported.last4(),
            reported.exp_month(),
            reported.exp_year(),
            old_masked,
            old_month,
            old_year,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        provider_id: &str,
        brand: Option<&str>,
        last4: Option<&str>,
        exp_month: Option<i64>,
        exp_year: Option<i64>,
        old_masked: Option<&str>,
        old_month: Option<u8>,
        old_year: Option<u16>,
    ) -> Self {
        let month = safe_cast_month(exp_month);
        let year = safe_cast_year(exp_year);
        let unchanged = old_month.is_some() && old_month == month && old_year.is_some() && old_year == year;

        Self {
            provider_masked_card_number: Some(provider_combined(brand, last4)),
            masked_card_number: replacement_masked_card_number(provider_id, old_masked, brand, last4),
            provider_expiration: Some(provider_combined(exp_month, exp_year)),
            expiration_month: if unchanged { None } else { month },
            expiration_year: if unchanged { None } else { year },
        }
    }

    pub fn into_tokenized(self, provider_unique_id: impl Into<String>) -> TokenizedCreditCard {
        TokenizedCreditCard {
            provider_unique_id: provider_unique_id.into(),
            provider_replacement_masked_card_number: self.provider_masked_card_number,
            replacement_masked_card_number: self.masked_card_number,
            provider_replacement_expiration: self.provider_expiration,
            replacement_expiration_month: self.expiration_month,
            replacement_expiration_year: self.expiration_year,
        }
    }
}
