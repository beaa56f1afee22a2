//! Card verification checks reported on a charge.

use pay_core::{AvsResult, CvvResult};

/// Map Stripe's `cvc_check`
pub fn cvv_result(cvc_check: Option<&str>) -> CvvResult {
    match cvc_check {
        None => CvvResult::Cvv2NotProvidedByMerchant,
        Some("pass") => CvvResult::Match,
        Some("fail") => CvvResult::NoMatch,
        Some("unavailable") => CvvResult::NotProcessed,
        Some("unchecked") => CvvResult::NotSupportedByIssuer,
        Some(_) => CvvResult::Unknown,
    }
}

/// Map Stripe's `address_line1_check` and `address_postal_code_check`,
/// returning the combined provider value with the generic result
pub fn avs_result(address: Option<&str>, zip: Option<&str>) -> (String, AvsResult) {
    let provider = format!("{},{}", address.unwrap_or_default(), zip.unwrap_or_default());
    let result = match (address, zip) {
        (Some(address), Some(zip)) => match (address, zip) {
            ("pass", "pass") => AvsResult::AddressYZip5,
            ("pass", _) => AvsResult::AddressYZipN,
            (_, "pass") => AvsResult::AddressNZip5,
            ("fail", "fail") => AvsResult::AddressNZipN,
            ("unavailable", "unavailable") => AvsResult::Unavailable,
            ("unchecked", "unchecked") => AvsResult::Unavailable,
            _ => AvsResult::Unknown,
        },
        (Some(address), None) => match address {
            "pass" => AvsResult::AddressYZipN,
            "fail" => AvsResult::AddressNZipN,
            "unavailable" => AvsResult::Unavailable,
            "unchecked" => AvsResult::ServiceNotSupported,
            _ => AvsResult::Unknown,
        },
        (None, Some(zip)) => match zip {
            "pass" => AvsResult::AddressNZip5,
            "fail" => AvsResult::AddressNZipN,
            "unavailable" => AvsResult::Unavailable,
            "unchecked" => AvsResult::ServiceNotSupported,
            _ => AvsResult::Unknown,
        },
        (None, None) => AvsResult::AddressNotProvided,
    };
    (provider, result)
}
