//! # Currency
//!
//! ISO 4217 currencies and conversion of decimal amounts into the smallest
//! currency unit expected by card gateways.

use crate::error::{PaymentError, PaymentResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    AUD,
    BHD,
    BRL,
    CAD,
    CHF,
    CLP,
    CNY,
    DKK,
    EUR,
    GBP,
    HKD,
    INR,
    JOD,
    JPY,
    KRW,
    KWD,
    MXN,
    NOK,
    NZD,
    OMR,
    PLN,
    SEK,
    SGD,
    TND,
    #[default]
    USD,
    VND,
    ZAR,
}

impl Currency {
    /// Returns the lowercase ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::AUD => "aud",
            Currency::BHD => "bhd",
            Currency::BRL => "brl",
            Currency::CAD => "cad",
            Currency::CHF => "chf",
            Currency::CLP => "clp",
            Currency::CNY => "cny",
            Currency::DKK => "dkk",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::HKD => "hkd",
            Currency::INR => "inr",
            Currency::JOD => "jod",
            Currency::JPY => "jpy",
            Currency::KRW => "krw",
            Currency::KWD => "kwd",
            Currency::MXN => "mxn",
            Currency::NOK => "nok",
            Currency::NZD => "nzd",
            Currency::OMR => "omr",
            Currency::PLN => "pln",
            Currency::SEK => "sek",
            Currency::SGD => "sgd",
            Currency::TND => "tnd",
            Currency::USD => "usd",
            Currency::VND => "vnd",
            Currency::ZAR => "zar",
        }
    }

    /// Number of digits after the decimal point in the minor unit
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::CLP | Currency::JPY | Currency::KRW | Currency::VND => 0,
            Currency::BHD | Currency::JOD | Currency::KWD | Currency::OMR | Currency::TND => 3,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit.
    ///
    /// The conversion must be exact: amounts with more precision than the
    /// currency allows, negative amounts, and amounts beyond `i64::MAX` minor
    /// units are rejected.
    pub fn to_minor_units(&self, amount: Decimal) -> PaymentResult<i64> {
        let scale = Decimal::from(10_i64.pow(self.decimal_places()));
        let scaled = amount.checked_mul(scale).ok_or_else(|| PaymentError::InvalidAmount {
            message: format!("{} overflows when scaled to {}", amount, self),
        })?;

        if scaled.is_sign_negative() && !scaled.is_zero() {
            return Err(PaymentError::InvalidAmount {
                message: format!("value < 0: {}", amount),
            });
        }
        if !scaled.fract().is_zero() {
            return Err(PaymentError::InvalidAmount {
                message: format!(
                    "{} has more than {} fraction digits for {}",
                    amount,
                    self.decimal_places(),
                    self
                ),
            });
        }

        scaled.to_i64().ok_or_else(|| PaymentError::InvalidAmount {
            message: format!("value > i64::MAX: {}", scaled),
        })
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}
