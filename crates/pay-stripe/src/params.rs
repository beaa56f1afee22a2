//! # Request Parameters
//!
//! Builders for the form-encoded parameters of Stripe requests.
//!
//! Values are trimmed before sending. When creating an object, blank values
//! are left out. When updating, blank values are sent empty, which Stripe
//! treats as an explicit unset.

use indexmap::IndexMap;
use pay_core::{full_name, numbers_only, CreditCard, PaymentError, PaymentResult, TransactionRequest};
use std::fmt::Display;

/// Maximum metadata keys per object
pub const MAX_METADATA_KEYS: usize = 50;

pub const MAX_METADATA_KEY_LENGTH: usize = 40;

pub const MAX_METADATA_VALUE_LENGTH: usize = 500;

/// Longest statement descriptor Stripe accepts
pub const MAX_STATEMENT_DESCRIPTOR_LEN: usize = 22;

/// Ordered `name=value` pairs of a form body or query string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a raw value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pairs.push((name.into(), value.into()));
        self
    }

    /// Send an empty value, unsetting the field
    pub fn unset(&mut self, name: impl Into<String>) -> &mut Self {
        self.set(name, String::new())
    }

    /// Add a trimmed value.
    ///
    /// Returns true when the parameter was sent, including as an unset.
    pub fn add(&mut self, update: bool, name: &str, value: Option<&str>) -> bool {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => {
                self.set(name, value);
                true
            }
            None if update => {
                self.unset(name);
                true
            }
            None => false,
        }
    }

    /// Add `expand[]=field`
    pub fn expand(&mut self, field: &str) -> &mut Self {
        self.set("expand[]", field)
    }

    /// Add every pair of `nested` under `prefix`.
    ///
    /// Returns false, adding nothing, when `nested` is empty.
    pub fn add_nested(&mut self, prefix: &str, nested: FormParams) -> bool {
        if nested.is_empty() {
            return false;
        }
        for (name, value) in nested.pairs {
            let key = match name.find('[') {
                Some(idx) => format!("{}[{}]{}", prefix, &name[..idx], &name[idx..]),
                None => format!("{}[{}]", prefix, name),
            };
            self.pairs.push((key, value));
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(n, _)| n == name)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Length as Stripe measures it, in UTF-16 code units
pub fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count()
}

/// Longest prefix of `value` within `max` UTF-16 code units, never splitting
/// a surrogate pair
fn truncate_utf16(value: &str, max: usize) -> String {
    let mut units = 0;
    value
        .chars()
        .take_while(|c| {
            units += c.len_utf16();
            units <= max
        })
        .collect()
}

/// Object metadata, `None` values being unsets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: IndexMap<String, Option<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trimmed value.
    ///
    /// A value longer than [`MAX_METADATA_VALUE_LENGTH`] is truncated when
    /// `allow_truncate`, otherwise rejected.
    pub fn add(
        &mut self,
        update: bool,
        key: &str,
        value: Option<&str>,
        allow_truncate: bool,
    ) -> PaymentResult<()> {
        if utf16_len(key) > MAX_METADATA_KEY_LENGTH {
            return Err(PaymentError::Metadata(format!("Meta data key too long: {}", key)));
        }
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => {
                let value = if utf16_len(value) > MAX_METADATA_VALUE_LENGTH {
                    if !allow_truncate {
                        return Err(PaymentError::Metadata(format!(
                            "Meta data value too long: {}",
                            key
                        )));
                    }
                    truncate_utf16(value, MAX_METADATA_VALUE_LENGTH)
                } else {
                    value.to_string()
                };
                if !self.entries.contains_key(key) && self.entries.len() >= MAX_METADATA_KEYS {
                    return Err(PaymentError::Metadata("Too many meta data keys".to_string()));
                }
                self.entries.insert(key.to_string(), Some(value));
            }
            None if update => {
                self.entries.insert(key.to_string(), None);
            }
            None => {}
        }
        Ok(())
    }

    /// Add a value through its `Display` form
    pub fn add_display<V: Display>(
        &mut self,
        update: bool,
        key: &str,
        value: Option<V>,
        allow_truncate: bool,
    ) -> PaymentResult<()> {
        let value = value.map(|v| v.to_string());
        self.add(update, key, value.as_deref(), allow_truncate)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|v| v.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write as `metadata[key]` pairs.
    ///
    /// Empty metadata is skipped on create and unset as a whole on update.
    pub fn write_to(&self, params: &mut FormParams, update: bool) -> bool {
        if self.entries.is_empty() {
            if update {
                params.unset("metadata");
            }
            return update;
        }
        for (key, value) in &self.entries {
            let name = format!("metadata[{}]", key);
            match value {
                Some(value) => params.set(name, value.as_str()),
                None => params.unset(name),
            };
        }
        true
    }
}

/// Metadata stored on a customer
pub fn customer_metadata(card: &CreditCard, update: bool) -> PaymentResult<Metadata> {
    let mut metadata = Metadata::new();
    metadata.add(update, "company_name", card.company_name.as_deref(), true)?;
    // Phone moved to the customer itself
    metadata.add(update, "phone", None, true)?;
    metadata.add(update, "fax", card.fax.as_deref(), true)?;
    metadata.add(update, "customer_id", card.customer_id.as_deref(), true)?;
    metadata.add(update, "customer_tax_id", card.customer_tax_id.as_deref(), true)?;
    metadata.add(update, "group_name", card.group_name.as_deref(), true)?;
    metadata.add(update, "principal_name", card.principal_name.as_deref(), true)?;
    Ok(metadata)
}

/// Metadata stored on a payment intent: the customer metadata plus
/// transaction details
pub fn payment_intent_metadata(
    request: &TransactionRequest,
    card: &CreditCard,
    update: bool,
) -> PaymentResult<Metadata> {
    let mut metadata = customer_metadata(card, update)?;
    metadata.add(update, "customer_description", card.comments.as_deref(), true)?;
    metadata.add(update, "customer_email", card.email.as_deref(), false)?;
    metadata.add(update, "customer_ip", request.customer_ip.as_deref(), false)?;
    metadata.add(update, "order_number", request.order_number.as_deref(), false)?;
    metadata.add_display(update, "amount", Some(request.amount), false)?;
    metadata.add_display(update, "tax_amount", request.tax_amount, false)?;
    metadata.add_display(update, "tax_exempt", Some(request.tax_exempt), false)?;
    metadata.add_display(update, "shipping_amount", request.shipping_amount, false)?;
    metadata.add_display(update, "duty_amount", request.duty_amount, false)?;
    metadata.add(
        update,
        "shipping_company_name",
        request.shipping_company_name.as_deref(),
        true,
    )?;
    metadata.add(update, "invoice_number", request.invoice_number.as_deref(), false)?;
    metadata.add(
        update,
        "purchase_order_number",
        request.purchase_order_number.as_deref(),
        false,
    )?;
    Ok(metadata)
}

/// Parameters to create or update a customer
pub fn customer_params(card: &CreditCard, update: bool) -> PaymentResult<FormParams> {
    let mut params = FormParams::new();
    params.add(update, "description", card.comments.as_deref());
    params.add(update, "email", card.email.as_deref());
    customer_metadata(card, update)?.write_to(&mut params, update);
    let name = full_name(card.first_name.as_deref(), card.last_name.as_deref());
    params.add(update, "name", name.as_deref());
    params.add(update, "phone", card.phone.as_deref());
    Ok(params)
}

/// Parameters to update a legacy card source
pub fn card_params(card: &CreditCard, update: bool) -> FormParams {
    let mut params = FormParams::new();
    let name = full_name(card.first_name.as_deref(), card.last_name.as_deref());
    params.add(update, "name", name.as_deref());
    params.add(update, "address_line1", card.street_address1.as_deref());
    params.add(update, "address_line2", card.street_address2.as_deref());
    params.add(update, "address_city", card.city.as_deref());
    params.add(update, "address_state", card.state.as_deref());
    params.add(update, "address_zip", card.postal_code.as_deref());
    params.add(update, "address_country", card.country_code.as_deref());
    params
}

/// Billing details of a payment method, empty when nothing is known
pub fn billing_details(card: &CreditCard) -> FormParams {
    let mut address = FormParams::new();
    address.add(false, "city", card.city.as_deref());
    address.add(false, "country", card.country_code.as_deref());
    address.add(false, "line1", card.street_address1.as_deref());
    address.add(false, "line2", card.street_address2.as_deref());
    address.add(false, "postal_code", card.postal_code.as_deref());
    address.add(false, "state", card.state.as_deref());

    let mut details = FormParams::new();
    details.add_nested("address", address);
    details.add(false, "email", card.email.as_deref());
    let name = full_name(card.first_name.as_deref(), card.last_name.as_deref());
    details.add(false, "name", name.as_deref());
    details.add(false, "phone", card.phone.as_deref());
    details
}

/// Parameters to create a card payment method
pub fn payment_method_params(
    card: &CreditCard,
    card_number: Option<&str>,
    expiration_month: Option<u8>,
    expiration_year: Option<u16>,
    card_code: Option<&str>,
) -> FormParams {
    let mut card_details = FormParams::new();
    if let Some(month) = expiration_month {
        card_details.set("exp_month", month.to_string());
    }
    if let Some(year) = expiration_year {
        card_details.set("exp_year", year.to_string());
    }
    let number = card_number.map(numbers_only);
    card_details.add(false, "number", number.as_deref());
    card_details.add(false, "cvc", card_code);

    let mut params = FormParams::new();
    params.set("type", "card");
    params.add_nested("card", card_details);
    params.add_nested("billing_details", billing_details(card));
    params
}

/// Parameters to create a payment method from the card's own number
pub fn payment_method_params_for(card: &CreditCard) -> FormParams {
    payment_method_params(
        card,
        card.card_number.as_deref(),
        card.expiration_month,
        card.expiration_year,
        card.card_code.as_deref(),
    )
}

/// Parameters to update the billing details of a payment method
pub fn payment_method_update_params(card: &CreditCard) -> FormParams {
    let mut params = FormParams::new();
    params.add_nested("billing_details", billing_details(card));
    params
}

/// Shipping of a payment intent, empty when neither an address nor a name
/// is known
pub fn shipping_params(request: &TransactionRequest, card: &CreditCard) -> FormParams {
    let mut address = FormParams::new();
    address.add(false, "line1", request.shipping_street_address1.as_deref());
    address.add(false, "city", request.shipping_city.as_deref());
    address.add(false, "country", request.shipping_country_code.as_deref());
    address.add(false, "line2", request.shipping_street_address2.as_deref());
    address.add(false, "postal_code", request.shipping_postal_code.as_deref());
    address.add(false, "state", request.shipping_state.as_deref());

    let name = full_name(
        request.shipping_first_name.as_deref(),
        request.shipping_last_name.as_deref(),
    );

    let mut shipping = FormParams::new();
    if address.is_empty() && name.is_none() {
        return shipping;
    }
    shipping.add_nested("address", address);
    shipping.add(false, "name", name.as_deref());
    shipping.add(false, "phone", card.phone.as_deref());
    shipping
}

/// Statement descriptor for an order number.
///
/// Stripe requires at least one letter, so numbers without one get `prefix`.
/// Descriptors that would be too long are not sent.
pub fn statement_descriptor(order_number: Option<&str>, prefix: &str) -> Option<String> {
    let order_number = order_number.map(str::trim).filter(|o| !o.is_empty())?;
    let descriptor = if order_number.chars().any(char::is_alphabetic) {
        order_number.to_string()
    } else {
        format!("{}{}", prefix, order_number)
    };
    (utf16_len(&descriptor) <= MAX_STATEMENT_DESCRIPTOR_LEN).then_some(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pay_core::Currency;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn card() -> CreditCard {
        let mut card = CreditCard::new("4242 4242 4242 4242", 12, 2030);
        card.first_name = Some("  Ada ".into());
        card.last_name = Some("Lovelace".into());
        card.email = Some("ada@example.com".into());
        card.company_name = Some("Analytical Engines".into());
        card.city = Some("London".into());
        card.country_code = Some("GB".into());
        card.card_code = Some("123".into());
        card
    }

    #[test]
    fn test_add_create_and_update() {
        let mut params = FormParams::new();
        assert!(params.add(false, "email", Some("  a@b.c  ")));
        assert!(!params.add(false, "phone", Some("   ")));
        assert!(!params.add(false, "fax", None));
        assert!(params.add(true, "name", None));
        assert_eq!(params.get("email"), Some("a@b.c"));
        assert_eq!(params.get("name"), Some(""));
        assert!(!params.contains("phone"));
    }

    #[test]
    fn test_add_nested() {
        let mut inner = FormParams::new();
        inner.set("city", "Paris");
        inner.set("address[line1]", "1 Rue");
        let mut outer = FormParams::new();
        assert!(outer.add_nested("billing_details", inner));
        assert_eq!(outer.get("billing_details[city]"), Some("Paris"));
        assert_eq!(outer.get("billing_details[address][line1]"), Some("1 Rue"));
        assert!(!outer.add_nested("shipping", FormParams::new()));
    }

    #[test]
    fn test_metadata_limits() {
        let mut metadata = Metadata::new();
        let long = "x".repeat(MAX_METADATA_VALUE_LENGTH + 10);
        metadata.add(false, "company_name", Some(&long), true).unwrap();
        assert_eq!(
            metadata.get("company_name").unwrap().len(),
            MAX_METADATA_VALUE_LENGTH
        );
        assert!(matches!(
            metadata.add(false, "customer_email", Some(&long), false),
            Err(PaymentError::Metadata(_))
        ));
        assert!(metadata
            .add(false, &"k".repeat(MAX_METADATA_KEY_LENGTH + 1), Some("v"), true)
            .is_err());

        let mut full = Metadata::new();
        for i in 0..MAX_METADATA_KEYS {
            full.add(false, &format!("key{}", i), Some("v"), false).unwrap();
        }
        assert!(full.add(false, "key0", Some("w"), false).is_ok());
        assert!(matches!(
            full.add(false, "one_more", Some("v"), false),
            Err(PaymentError::Metadata(_))
        ));
    }

    #[test]
    fn test_customer_params_create() {
        let params = customer_params(&card(), false).unwrap();
        assert_eq!(params.get("name"), Some("Ada Lovelace"));
        assert_eq!(params.get("email"), Some("ada@example.com"));
        assert_eq!(params.get("metadata[company_name]"), Some("Analytical Engines"));
        assert!(!params.contains("metadata[phone]"));
        assert!(!params.contains("phone"));
        assert!(!params.contains("description"));
    }

    #[test]
    fn test_customer_params_update_unsets() {
        let params = customer_params(&card(), true).unwrap();
        assert_eq!(params.get("phone"), Some(""));
        assert_eq!(params.get("description"), Some(""));
        assert_eq!(params.get("metadata[phone]"), Some(""));
        assert_eq!(params.get("metadata[fax]"), Some(""));
        assert_eq!(params.get("metadata[company_name]"), Some("Analytical Engines"));
    }

    #[test]
    fn test_payment_intent_metadata() {
        let mut request = TransactionRequest::new(Currency::USD, Decimal::from_str("10.50").unwrap());
        request.order_number = Some("1001".into());
        request.tax_amount = Some(Decimal::from_str("0.84").unwrap());
        let metadata = payment_intent_metadata(&request, &card(), false).unwrap();
        assert_eq!(metadata.get("amount"), Some("10.50"));
        assert_eq!(metadata.get("tax_amount"), Some("0.84"));
        assert_eq!(metadata.get("tax_exempt"), Some("false"));
        assert_eq!(metadata.get("order_number"), Some("1001"));
        assert_eq!(metadata.get("customer_email"), Some("ada@example.com"));
        assert!(!metadata.contains_key("shipping_amount"));
    }

    #[test]
    fn test_payment_method_params() {
        let params = payment_method_params_for(&card());
        assert_eq!(params.get("type"), Some("card"));
        assert_eq!(params.get("card[number]"), Some("4242424242424242"));
        assert_eq!(params.get("card[exp_month]"), Some("12"));
        assert_eq!(params.get("card[exp_year]"), Some("2030"));
        assert_eq!(params.get("card[cvc]"), Some("123"));
        assert_eq!(params.get("billing_details[address][city]"), Some("London"));
        assert_eq!(params.get("billing_details[name]"), Some("Ada Lovelace"));
        assert!(!params.contains("billing_details[address][line1]"));
    }

    #[test]
    fn test_billing_details_empty() {
        let card = CreditCard::new("4242424242424242", 1, 2031);
        let params = payment_method_update_params(&card);
        assert!(params.is_empty());
    }

    #[test]
    fn test_shipping_params() {
        let mut request = TransactionRequest::new(Currency::USD, Decimal::ONE);
        assert!(shipping_params(&request, &card()).is_empty());

        request.shipping_first_name = Some("Ada".into());
        request.shipping_city = Some("London".into());
        let shipping = shipping_params(&request, &card());
        assert_eq!(shipping.get("name"), Some("Ada"));
        assert_eq!(shipping.get("address[city]"), Some("London"));
    }

    #[test]
    fn test_lengths_count_utf16_units() {
        // U+1F4B3 is two UTF-16 code units
        let card = "\u{1F4B3}";
        assert_eq!(utf16_len(card), 2);
        assert_eq!(utf16_len("café"), 4);

        let mut metadata = Metadata::new();
        let value = format!("{}{}", "a".repeat(MAX_METADATA_VALUE_LENGTH - 1), card);
        metadata.add(false, "note", Some(&value), true).unwrap();
        assert_eq!(metadata.get("note"), Some("a".repeat(MAX_METADATA_VALUE_LENGTH - 1).as_str()));
        assert!(metadata.add(false, "strict", Some(&value), false).is_err());

        let key = format!("{}{}", "k".repeat(MAX_METADATA_KEY_LENGTH - 1), card);
        assert!(Metadata::new().add(false, &key, Some("v"), true).is_err());

        let descriptor = format!("{}{}", "A".repeat(MAX_STATEMENT_DESCRIPTOR_LEN - 1), card);
        assert_eq!(statement_descriptor(Some(&descriptor), "AO#"), None);
    }

    #[test]
    fn test_statement_descriptor() {
        assert_eq!(statement_descriptor(Some(" 12345 "), "AO#").as_deref(), Some("AO#12345"));
        assert_eq!(statement_descriptor(Some("INV-77"), "AO#").as_deref(), Some("INV-77"));
        assert_eq!(statement_descriptor(Some("   "), "AO#"), None);
        assert_eq!(statement_descriptor(None, "AO#"), None);
        assert_eq!(statement_descriptor(Some("1234567890123456789012"), "AO#"), None);
        assert_eq!(
            statement_descriptor(Some("ABCDEFGHIJKLMNOPQRSTUV"), "AO#").as_deref(),
            Some("ABCDEFGHIJKLMNOPQRSTUV")
        );
    }
}
