//! # Stripe HTTP Client
//!
//! Thin typed client over the Stripe REST API: form-encoded requests,
//! pinned API version and classified errors.

use crate::config::StripeConfig;
use crate::error::StripeApiError;
use crate::params::FormParams;
use pay_core::{PaymentError, PaymentResult};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// Authenticated client for one Stripe account
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    base_url: Url,
    auth_header: String,
    api_version: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> PaymentResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            PaymentError::Configuration(format!(
                "Invalid Stripe API base URL {}: {}",
                config.api_base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PaymentError::Configuration(format!(
                "Invalid Stripe API base URL: {}",
                config.api_base_url
            )));
        }

        Ok(Self {
            http,
            base_url,
            auth_header: config.auth_header(),
            api_version: config.api_version.clone(),
        })
    }

    /// GET `/v1/{segments...}` with query parameters
    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &FormParams,
    ) -> Result<T, StripeApiError> {
        let request = self.request(Method::GET, segments).query(query.pairs());
        self.send(request).await
    }

    /// POST `/v1/{segments...}` with a form body
    pub async fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &FormParams,
    ) -> Result<T, StripeApiError> {
        let request = self
            .request(Method::POST, segments)
            .header("Idempotency-Key", uuid::Uuid::new_v4().to_string())
            .form(params.pairs());
        self.send(request).await
    }

    /// DELETE `/v1/{segments...}`
    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, StripeApiError> {
        let request = self.request(Method::DELETE, segments);
        self.send(request).await
    }

    /// Build the URL with each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("v1").extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.http
            .request(method, self.url(segments))
            .header("Authorization", &self.auth_header)
            .header("Stripe-Version", &self.api_version)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StripeApiError> {
        let response = request.send().await.map_err(|e| {
            error!("Stripe API connection error: {}", e);
            StripeApiError::connection(format!(
                "IOException during API request to Stripe: {}",
                e
            ))
        })?;

        let status = response.status();
        let request_id = response
            .headers()
            .get("request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let url = response.url().path().to_string();

        let body = response.text().await.map_err(|e| {
            StripeApiError::connection(format!("Failed to read Stripe response: {}", e))
        })?;

        debug!(
            "Stripe API response: path={}, status={}, request_id={:?}",
            url,
            status.as_u16(),
            request_id
        );

        if !status.is_success() {
            let err = StripeApiError::from_response(status.as_u16(), request_id, &body);
            error!(
                "Stripe API error: status={}, kind={:?}, code={:?}, charge={:?}, doc_url={:?}, message={}",
                status.as_u16(),
                err.kind,
                err.code(),
                err.charge(),
                err.doc_url(),
                err.message
            );
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse Stripe response from {}: {}", url, e);
            StripeApiError::invalid_response(status.as_u16(), request_id, &body)
        })
    }
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> StripeClient {
        let config = StripeConfig::new("stripe", "sk_test_abc").with_api_base_url(base);
        StripeClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_building() {
        let client = client("https://api.stripe.com");
        assert_eq!(
            client.url(&["customers", "cus_123", "sources", "card_1"]).as_str(),
            "https://api.stripe.com/v1/customers/cus_123/sources/card_1"
        );
    }

    #[test]
    fn test_url_segments_are_encoded() {
        let client = client("http://127.0.0.1:8080/");
        assert_eq!(
            client.url(&["customers", "../admin"]).as_str(),
            "http://127.0.0.1:8080/v1/customers/..%2Fadmin"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = StripeConfig::new("stripe", "sk_test_abc").with_api_base_url("not a url");
        assert!(matches!(
            StripeClient::new(&config),
            Err(PaymentError::Configuration(_))
        ));
    }
}
