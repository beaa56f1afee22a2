//! # Stripe API Objects
//!
//! The subset of Stripe's object model the adapter reads. Every field that
//! Stripe may omit is optional so that deleted or partially expanded
//! objects still deserialize.

use serde::Deserialize;

/// An object with a Stripe id
pub trait StripeObject {
    fn id(&self) -> &str;
}

/// A field that is either an id or, when requested with `expand[]`, the
/// full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Object(Box<T>),
    Id(String),
}

impl<T: StripeObject> Expandable<T> {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Object(object) => object.id(),
            Expandable::Id(id) => id,
        }
    }

    pub fn as_object(&self) -> Option<&T> {
        match self {
            Expandable::Object(object) => Some(object),
            Expandable::Id(_) => None,
        }
    }
}

/// A page of a list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Brand, last four digits and expiration reported for a card
pub trait CardDetails {
    fn brand(&self) -> Option<&str>;
    fn last4(&self) -> Option<&str>;
    fn exp_month(&self) -> Option<i64>;
    fn exp_year(&self) -> Option<i64>;
}

macro_rules! impl_card_details {
    ($($ty:ty),+) => {
        $(
            impl CardDetails for $ty {
                fn brand(&self) -> Option<&str> {
                    self.brand.as_deref()
                }
                fn last4(&self) -> Option<&str> {
                    self.last4.as_deref()
                }
                fn exp_month(&self) -> Option<i64> {
                    self.exp_month
                }
                fn exp_year(&self) -> Option<i64> {
                    self.exp_year
                }
            }
        )+
    };
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub default_source: Option<String>,
    #[serde(default)]
    pub invoice_settings: Option<InvoiceSettings>,
    /// Only present when requested with `expand[]=sources`
    #[serde(default)]
    pub sources: Option<List<Card>>,
}

impl Customer {
    /// Invoice default payment method id
    pub fn default_payment_method(&self) -> Option<&str> {
        self.invoice_settings
            .as_ref()
            .and_then(|settings| settings.default_payment_method.as_deref())
    }

    /// Find a legacy card source among the expanded sources
    pub fn source(&self, source_id: &str) -> Option<&Card> {
        self.sources
            .as_ref()
            .and_then(|sources| sources.data.iter().find(|card| card.id == source_id))
    }
}

impl StripeObject for Customer {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSettings {
    #[serde(default)]
    pub default_payment_method: Option<String>,
}

/// Legacy card source attached to a customer
#[derive(Debug, Clone, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub exp_month: Option<i64>,
    #[serde(default)]
    pub exp_year: Option<i64>,
}

impl StripeObject for Card {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Response of a delete endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Deleted {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

// =============================================================================
// Payment methods
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub card: Option<PaymentMethodCard>,
}

impl StripeObject for PaymentMethod {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodCard {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub exp_month: Option<i64>,
    #[serde(default)]
    pub exp_year: Option<i64>,
}

// =============================================================================
// Payment intents and charges
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub latest_charge: Option<Expandable<Charge>>,
    #[serde(default)]
    pub next_action: Option<NextAction>,
}

impl PaymentIntent {
    pub fn latest_charge(&self) -> Option<&Charge> {
        self.latest_charge.as_ref().and_then(Expandable::as_object)
    }
}

impl StripeObject for PaymentIntent {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextAction {
    #[serde(rename = "type")]
    pub action_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    pub id: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_method_details: Option<PaymentMethodDetails>,
}

impl StripeObject for Charge {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodDetails {
    #[serde(default)]
    pub card: Option<ChargeCard>,
}

/// Card details as seen by a charge, including verification checks
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeCard {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub exp_month: Option<i64>,
    #[serde(default)]
    pub exp_year: Option<i64>,
    #[serde(default)]
    pub checks: Option<CardChecks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardChecks {
    #[serde(default)]
    pub address_line1_check: Option<String>,
    #[serde(default)]
    pub address_postal_code_check: Option<String>,
    #[serde(default)]
    pub cvc_check: Option<String>,
}

impl_card_details!(Card, PaymentMethodCard, ChargeCard);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expandable_latest_charge() {
        let intent: PaymentIntent = serde_json::from_value(json!({
            "id": "pi_1",
            "status": "requires_capture",
            "latest_charge": {
                "id": "ch_1",
                "payment_method": "pm_1",
                "payment_method_details": {
                    "card": {
                        "brand": "visa",
                        "last4": "4242",
                        "exp_month": 12,
                        "exp_year": 2030,
                        "checks": { "cvc_check": "pass" }
                    }
                }
            }
        }))
        .unwrap();

        let charge = intent.latest_charge().unwrap();
        assert_eq!(charge.id, "ch_1");
        assert_eq!(intent.latest_charge.as_ref().unwrap().id(), "ch_1");

        let unexpanded: PaymentIntent = serde_json::from_value(json!({
            "id": "pi_2",
            "status": "succeeded",
            "latest_charge": "ch_2"
        }))
        .unwrap();
        assert!(unexpanded.latest_charge().is_none());
        assert_eq!(unexpanded.latest_charge.unwrap().id(), "ch_2");
    }

    #[test]
    fn test_deleted_customer() {
        let customer: Customer =
            serde_json::from_value(json!({ "id": "cus_1", "object": "customer", "deleted": true }))
                .unwrap();
        assert!(customer.deleted);
        assert!(customer.default_payment_method().is_none());
    }

    #[test]
    fn test_customer_source_lookup() {
        let customer: Customer = serde_json::from_value(json!({
            "id": "cus_1",
            "default_source": "card_1",
            "invoice_settings": { "default_payment_method": null },
            "sources": {
                "object": "list",
                "data": [{ "id": "card_1", "object": "card", "brand": "Visa", "last4": "1111" }],
                "has_more": false
            }
        }))
        .unwrap();
        assert_eq!(customer.source("card_1").unwrap().last4(), Some("1111"));
        assert!(customer.source("card_2").is_none());
    }
}
