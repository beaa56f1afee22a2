//! # Transaction Request
//!
//! The provider-agnostic description of a charge: amounts, order details and
//! shipping information.

use crate::currency::Currency;
use crate::error::{PaymentError, PaymentResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A request to authorize or sell against a card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionRequest {
    /// Request a test transaction
    pub test_mode: bool,

    pub customer_ip: Option<String>,

    /// Merchant order number, also used for the statement descriptor
    pub order_number: Option<String>,

    pub currency: Currency,

    /// Amount before tax, shipping and duty
    pub amount: Decimal,
    pub tax_amount: Option<Decimal>,
    pub tax_exempt: bool,
    pub shipping_amount: Option<Decimal>,
    pub duty_amount: Option<Decimal>,

    pub shipping_first_name: Option<String>,
    pub shipping_last_name: Option<String>,
    pub shipping_company_name: Option<String>,
    pub shipping_street_address1: Option<String>,
    pub shipping_street_address2: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_postal_code: Option<String>,
    pub shipping_country_code: Option<String>,

    /// Ask the provider to email a receipt to the cardholder
    pub email_customer: bool,

    pub invoice_number: Option<String>,
    pub purchase_order_number: Option<String>,
    pub description: Option<String>,
}

impl TransactionRequest {
    /// Create a request for an amount in a currency
    pub fn new(currency: Currency, amount: Decimal) -> Self {
        Self {
            currency,
            amount,
            ..Default::default()
        }
    }

    /// Builder: set order number
    pub fn with_order_number(mut self, order_number: impl Into<String>) -> Self {
        self.order_number = Some(order_number.into());
        self
    }

    /// Builder: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Amount plus tax, shipping and duty
    pub fn total_amount(&self) -> PaymentResult<Decimal> {
        [self.tax_amount, self.shipping_amount, self.duty_amount]
            .into_iter()
            .flatten()
            .try_fold(self.amount, |total, part| total.checked_add(part))
            .ok_or_else(|| PaymentError::InvalidAmount {
                message: format!("total of {} with tax, shipping and duty overflows", self.amount),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_amount() {
        let mut request = TransactionRequest::new(Currency::USD, Decimal::new(1000, 2));
        assert_eq!(request.total_amount().unwrap(), Decimal::new(1000, 2));

        request.tax_amount = Some(Decimal::new(80, 2));
        request.shipping_amount = Some(Decimal::new(500, 2));
        request.duty_amount = Some(Decimal::new(20, 2));
        assert_eq!(request.total_amount().unwrap(), Decimal::new(1600, 2));
    }

    #[test]
    fn test_total_amount_overflow() {
        let mut request = TransactionRequest::new(Currency::USD, Decimal::MAX);
        request.tax_amount = Some(Decimal::ONE);
        assert!(matches!(
            request.total_amount(),
            Err(PaymentError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_builders() {
        let request = TransactionRequest::new(Currency::EUR, Decimal::ONE)
            .with_order_number("1042")
            .with_description("Hosting");
        assert_eq!(request.order_number.as_deref(), Some("1042"));
        assert_eq!(request.description.as_deref(), Some("Hosting"));
        assert!(!request.test_mode);
    }
}
