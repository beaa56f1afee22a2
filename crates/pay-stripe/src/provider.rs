//! # Stripe Merchant Services Provider
//!
//! Implements [`MerchantServicesProvider`] with PaymentIntents for
//! transactions and Customers holding a default PaymentMethod for stored
//! cards. Customers created through the legacy card API (a default card
//! source instead of a PaymentMethod) are still supported, and converted to
//! PaymentMethods when their number changes.

use crate::checks::{avs_result, cvv_result};
use crate::client::StripeClient;
use crate::config::StripeConfig;
use crate::convert::convert_error;
use crate::error::StripeApiError;
use crate::model::{Card, CardDetails, Customer, Deleted, List, PaymentIntent, PaymentMethod};
use crate::params::{
    card_params, customer_params, payment_intent_metadata, payment_method_params,
    payment_method_params_for, payment_method_update_params, shipping_params,
    statement_descriptor, FormParams,
};
use crate::replacement::Replacement;
use async_trait::async_trait;
use indexmap::IndexMap;
use pay_core::{
    mask_card_number, numbers_only, ApprovalResult, AuthorizationResult, CaptureResult,
    CommunicationResult, CreditCard, ErrorCode, MerchantServicesProvider, PaymentError,
    PaymentResult, SaleResult, TokenizedCreditCard, TransactionRequest,
    EXPIRATION_DISPLAY_SEPARATOR,
};
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

/// Stripe provider
pub struct StripeProvider {
    config: StripeConfig,
    client: StripeClient,
}

/// The card a request was made with, used to detect replacements in errors
#[derive(Debug, Default)]
struct CardContext {
    masked_card_number: Option<String>,
    expiration_month: Option<u8>,
    expiration_year: Option<u16>,
}

impl CardContext {
    fn of(card: &CreditCard) -> Self {
        Self {
            masked_card_number: card.masked_card_number(),
            expiration_month: card.expiration_month,
            expiration_year: card.expiration_year,
        }
    }
}

/// Failure part way through a multi-step operation
#[derive(Debug)]
enum StepError {
    Stripe(StripeApiError),
    Local(PaymentError),
}

impl From<StripeApiError> for StepError {
    fn from(err: StripeApiError) -> Self {
        StepError::Stripe(err)
    }
}

impl From<PaymentError> for StepError {
    fn from(err: PaymentError) -> Self {
        StepError::Local(err)
    }
}

/// Card details reported for a customer's default payment method or source
#[derive(Debug, Default)]
struct ReportedCard {
    brand: Option<String>,
    last4: Option<String>,
    exp_month: Option<i64>,
    exp_year: Option<i64>,
}

impl ReportedCard {
    fn from_details(details: &impl CardDetails) -> Self {
        Self {
            brand: details.brand().map(String::from),
            last4: details.last4().map(String::from),
            exp_month: details.exp_month(),
            exp_year: details.exp_year(),
        }
    }
}

impl CardDetails for ReportedCard {
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

fn zero_pad(month: u8) -> String {
    format!("{:02}", month)
}

fn provider_unique_id(card: &CreditCard) -> PaymentResult<&str> {
    card.provider_unique_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| PaymentError::InvalidRequest("Credit card has no provider unique id".to_string()))
}

fn no_default_card(customer_id: &str) -> PaymentError {
    PaymentError::InvalidRequest(format!(
        "Customer does not have any default payment method or source: {}",
        customer_id
    ))
}

impl StripeProvider {
    /// Create a provider for one Stripe account
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let client = StripeClient::new(&config)?;
        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Turn the outcome of a stored-card operation into the public result
    fn finish<T>(
        &self,
        operation: &'static str,
        context: &CardContext,
        result: Result<T, StepError>,
    ) -> PaymentResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(StepError::Local(err)) => Err(err),
            Err(StepError::Stripe(err)) => {
                let converted = convert_error(
                    &self.config.provider_id,
                    context.masked_card_number.as_deref(),
                    context.expiration_month,
                    context.expiration_year,
                    &err,
                );
                error!(
                    "{} not successful: request_id={:?}, provider_error_code={}, message={}",
                    operation,
                    err.request_id,
                    converted.provider_error_code,
                    converted.provider_error_message
                );
                Err(converted.into_payment_error(&self.config.provider_id, operation))
            }
        }
    }

    // =========================================================================
    // Customers and payment methods
    // =========================================================================

    async fn retrieve_customer(&self, customer_id: &str) -> Result<Customer, StripeApiError> {
        let mut query = FormParams::new();
        query.expand("sources");
        self.client.get(&["customers", customer_id], &query).await
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<Customer, StripeApiError> {
        let mut params = FormParams::new();
        params
            .set("invoice_settings[default_payment_method]", payment_method_id)
            .expand("sources");
        self.client.post(&["customers", customer_id], &params).await
    }

    async fn create_payment_method(&self, params: &FormParams) -> Result<PaymentMethod, StripeApiError> {
        let payment_method: PaymentMethod = self.client.post(&["payment_methods"], params).await?;
        debug!("Created Stripe payment method: id={}", payment_method.id);
        Ok(payment_method)
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<PaymentMethod, StripeApiError> {
        let mut params = FormParams::new();
        params.set("customer", customer_id);
        self.client
            .post(&["payment_methods", payment_method_id, "attach"], &params)
            .await
    }

    /// Default PaymentMethod of a customer.
    ///
    /// The invoice default is ignored when it is the legacy default source.
    /// Without one, the first attached card PaymentMethod becomes the
    /// default, recovering from a failure between attaching a new
    /// PaymentMethod and making it the default.
    async fn default_payment_method_id(
        &self,
        customer: Customer,
    ) -> Result<(Customer, Option<String>), StripeApiError> {
        let default_source = customer.default_source.clone();
        let current = customer
            .default_payment_method()
            .filter(|id| Some(*id) != default_source.as_deref())
            .map(String::from);
        if current.is_some() {
            return Ok((customer, current));
        }

        // Not paginated: more than 100 card payment methods on one customer is not expected
        let mut query = FormParams::new();
        query
            .set("customer", customer.id.as_str())
            .set("type", "card")
            .set("limit", "100");
        let attached: List<PaymentMethod> = self.client.get(&["payment_methods"], &query).await?;

        match attached
            .data
            .into_iter()
            .find(|pm| Some(pm.id.as_str()) != default_source.as_deref())
        {
            Some(payment_method) => {
                info!(
                    "Setting default payment method: customer={}, payment_method={}",
                    customer.id, payment_method.id
                );
                let customer = self
                    .set_default_payment_method(&customer.id, &payment_method.id)
                    .await?;
                Ok((customer, Some(payment_method.id)))
            }
            None => Ok((customer, None)),
        }
    }

    /// A legacy card source, from the expanded sources when present
    async fn retrieve_source(&self, customer: &Customer, source_id: &str) -> Result<Card, StripeApiError> {
        if let Some(card) = customer.source(source_id) {
            return Ok(card.clone());
        }
        self.client
            .get(&["customers", &customer.id, "sources", source_id], &FormParams::new())
            .await
    }

    async fn delete_source(&self, customer_id: &str, source_id: &str) -> Result<(), StripeApiError> {
        let _: Deleted = self
            .client
            .delete(&["customers", customer_id, "sources", source_id])
            .await?;
        info!(
            "Deleted legacy card source: customer={}, source={}",
            customer_id, source_id
        );
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Resolve the payment method and create a confirmed PaymentIntent
    async fn confirm_payment_intent(
        &self,
        card: &CreditCard,
        customer_id: Option<&str>,
        mut params: FormParams,
    ) -> Result<(PaymentIntent, Option<String>), StripeApiError> {
        let payment_method_id = match customer_id {
            Some(customer_id) => {
                let customer = self.retrieve_customer(customer_id).await?;
                let (customer, payment_method_id) = self.default_payment_method_id(customer).await?;
                // Legacy card API customers charge their default source
                payment_method_id.or(customer.default_source)
            }
            None => Some(self.create_payment_method(&payment_method_params_for(card)).await?.id),
        };
        if let Some(id) = &payment_method_id {
            params.set("payment_method", id.as_str());
        }
        params.expand("latest_charge");

        let intent: PaymentIntent = self.client.post(&["payment_intents"], &params).await?;
        Ok((intent, payment_method_id))
    }

    fn payment_intent_params(
        &self,
        request: &TransactionRequest,
        card: &CreditCard,
        capture: bool,
    ) -> PaymentResult<FormParams> {
        let amount = request.currency.to_minor_units(request.total_amount()?)?;

        let mut params = FormParams::new();
        params
            .set("amount", amount.to_string())
            .set("automatic_payment_methods[enabled]", "true")
            .set("automatic_payment_methods[allow_redirects]", "never")
            .set("currency", request.currency.as_str())
            .set("capture_method", if capture { "automatic" } else { "manual" })
            .set("confirm", "true");
        if let Some(customer_id) = &card.provider_unique_id {
            params.set("customer", customer_id.as_str());
        }
        params.add(false, "description", request.description.as_deref());
        payment_intent_metadata(request, card, false)?.write_to(&mut params, false);
        if request.email_customer {
            params.add(false, "receipt_email", card.email.as_deref());
        }
        params.add_nested("shipping", shipping_params(request, card));
        if let Some(descriptor) = statement_descriptor(
            request.order_number.as_deref(),
            &self.config.statement_descriptor_prefix,
        ) {
            params.set("statement_descriptor", descriptor);
        }
        Ok(params)
    }

    async fn sale_or_authorize(
        &self,
        request: &TransactionRequest,
        card: &CreditCard,
        capture: bool,
    ) -> PaymentResult<AuthorizationResult> {
        if request.test_mode {
            return Err(PaymentError::UnsupportedOperation {
                provider: self.config.provider_id.clone(),
                operation: "test mode".to_string(),
            });
        }
        let params = self.payment_intent_params(request, card, capture)?;
        let customer_id = card.provider_unique_id.as_deref();

        match self.confirm_payment_intent(card, customer_id, params).await {
            Ok((intent, payment_method_id)) => Ok(self.intent_result(
                card,
                customer_id,
                &intent,
                payment_method_id.as_deref(),
                capture,
            )),
            Err(err) => Ok(self.failed_authorization(card, customer_id, &err)),
        }
    }

    fn intent_result(
        &self,
        card: &CreditCard,
        customer_id: Option<&str>,
        intent: &PaymentIntent,
        payment_method_id: Option<&str>,
        capture: bool,
    ) -> AuthorizationResult {
        let latest_charge = intent.latest_charge();
        let charge_card = latest_charge.and_then(|charge| {
            if charge.payment_method.as_deref() == payment_method_id {
                charge.payment_method_details.as_ref()?.card.as_ref()
            } else {
                warn!(
                    "payment method != latest charge payment method: {:?} != {:?}",
                    payment_method_id, charge.payment_method
                );
                None
            }
        });
        let checks = charge_card.and_then(|c| c.checks.clone()).unwrap_or_default();
        let (provider_avs_result, avs) = avs_result(
            checks.address_line1_check.as_deref(),
            checks.address_postal_code_check.as_deref(),
        );

        let replacement = charge_card.map(|reported| {
            Replacement::detect(
                &self.config.provider_id,
                reported,
                card.masked_card_number().as_deref(),
                card.expiration_month,
                card.expiration_year,
            )
        });

        let mut result = AuthorizationResult::new(&self.config.provider_id, CommunicationResult::Success);
        result.provider_unique_id = Some(intent.id.clone());
        result.tokenized_credit_card =
            customer_id.map(|id| replacement.unwrap_or_default().into_tokenized(id));
        result.provider_cvv_result = checks.cvc_check.clone();
        result.cvv_result = Some(cvv_result(checks.cvc_check.as_deref()));
        result.provider_avs_result = Some(provider_avs_result);
        result.avs_result = Some(avs);

        let expected = if capture { "succeeded" } else { "requires_capture" };
        if intent.status == expected {
            info!("PaymentIntent approved: id={}, status={}", intent.id, intent.status);
            result.provider_approval_result = Some(intent.status.clone());
            result.approval_result = Some(ApprovalResult::Approved);
            result.approval_code = latest_charge.map(|charge| charge.id.clone());
        } else {
            // requires_action, processing and anything unexpected
            info!("PaymentIntent on hold: id={}, status={}", intent.id, intent.status);
            result.provider_approval_result = Some(
                intent
                    .next_action
                    .as_ref()
                    .map(|action| action.action_type.clone())
                    .unwrap_or_else(|| intent.status.clone()),
            );
            result.approval_result = Some(ApprovalResult::Hold);
        }
        result
    }

    fn failed_authorization(
        &self,
        card: &CreditCard,
        customer_id: Option<&str>,
        err: &StripeApiError,
    ) -> AuthorizationResult {
        let converted = convert_error(
            &self.config.provider_id,
            card.masked_card_number().as_deref(),
            card.expiration_month,
            card.expiration_year,
            err,
        );

        let mut result = AuthorizationResult::new(&self.config.provider_id, converted.communication_result);
        result.provider_error_message = Some(converted.provider_error_message.clone());
        result.tokenized_credit_card = customer_id.map(|id| {
            converted
                .replacement
                .clone()
                .unwrap_or_default()
                .into_tokenized(id)
        });

        match converted.decline_reason {
            Some(reason) => {
                info!(
                    "PaymentIntent declined: provider_decline_reason={}, reason={:?}",
                    converted.provider_error_code, reason
                );
                result.approval_result = Some(ApprovalResult::Declined);
                result.provider_decline_reason = Some(converted.provider_error_code);
                result.decline_reason = Some(reason);
            }
            None => {
                error!(
                    "PaymentIntent failed: request_id={:?}, provider_error_code={}, message={}",
                    err.request_id, converted.provider_error_code, converted.provider_error_message
                );
                result.provider_error_code = Some(converted.provider_error_code);
                result.error_code = converted.error_code;
            }
        }
        result
    }

    // =========================================================================
    // Stored cards
    // =========================================================================

    async fn store(&self, card: &CreditCard, customer: &FormParams) -> Result<String, StepError> {
        let customer: Customer = self.client.post(&["customers"], customer).await?;
        let payment_method = self.create_payment_method(&payment_method_params_for(card)).await?;
        self.attach_payment_method(&payment_method.id, &customer.id).await?;
        let customer = self
            .set_default_payment_method(&customer.id, &payment_method.id)
            .await?;
        Ok(customer.id)
    }

    async fn update(
        &self,
        customer_id: &str,
        customer: &FormParams,
        payment_method: &FormParams,
        legacy_card: &FormParams,
    ) -> Result<(), StepError> {
        let customer: Customer = self.client.post(&["customers", customer_id], customer).await?;
        let (customer, payment_method_id) = self.default_payment_method_id(customer).await?;

        match payment_method_id {
            Some(payment_method_id) => {
                let _: PaymentMethod = self
                    .client
                    .post(&["payment_methods", &payment_method_id], payment_method)
                    .await?;
                // Incomplete conversion to PaymentMethod
                if let Some(source) = &customer.default_source {
                    self.delete_source(&customer.id, source).await?;
                }
            }
            None => {
                let source = customer
                    .default_source
                    .as_deref()
                    .ok_or_else(|| no_default_card(&customer.id))?;
                let _: Card = self
                    .client
                    .post(&["customers", &customer.id, "sources", source], legacy_card)
                    .await?;
            }
        }
        Ok(())
    }

    async fn replace_number(
        &self,
        customer_id: &str,
        new_payment_method: &FormParams,
    ) -> Result<(), StepError> {
        let customer = self.retrieve_customer(customer_id).await?;
        let (customer, old_payment_method_id) = self.default_payment_method_id(customer).await?;
        let default_source = customer.default_source.clone();

        let payment_method = self.create_payment_method(new_payment_method).await?;
        self.attach_payment_method(&payment_method.id, &customer.id).await?;
        let customer = self
            .set_default_payment_method(&customer.id, &payment_method.id)
            .await?;

        if let Some(old) = old_payment_method_id {
            let _: PaymentMethod = self
                .client
                .post(&["payment_methods", &old, "detach"], &FormParams::new())
                .await?;
            debug!("Detached payment method: id={}", old);
        }
        if let Some(source) = default_source {
            // Converted to PaymentMethod
            self.delete_source(&customer.id, &source).await?;
        }
        Ok(())
    }

    async fn update_expiration(
        &self,
        customer_id: &str,
        expiration_month: u8,
        expiration_year: u16,
    ) -> Result<(), StepError> {
        let customer = self.retrieve_customer(customer_id).await?;
        let (customer, payment_method_id) = self.default_payment_method_id(customer).await?;

        match payment_method_id {
            Some(payment_method_id) => {
                let mut params = FormParams::new();
                params
                    .set("card[exp_month]", expiration_month.to_string())
                    .set("card[exp_year]", expiration_year.to_string());
                let _: PaymentMethod = self
                    .client
                    .post(&["payment_methods", &payment_method_id], &params)
                    .await?;
                // Incomplete conversion to PaymentMethod
                if let Some(source) = &customer.default_source {
                    self.delete_source(&customer.id, source).await?;
                }
            }
            None => {
                let source = customer
                    .default_source
                    .as_deref()
                    .ok_or_else(|| no_default_card(&customer.id))?;
                let mut params = FormParams::new();
                params
                    .set("exp_month", zero_pad(expiration_month))
                    .set("exp_year", expiration_year.to_string());
                let _: Card = self
                    .client
                    .post(&["customers", &customer.id, "sources", source], &params)
                    .await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, customer_id: &str) -> Result<(), StepError> {
        let customer: Customer = self
            .client
            .get(&["customers", customer_id], &FormParams::new())
            .await?;
        if customer.deleted {
            debug!("Customer already deleted: {}", customer_id);
        } else {
            let _: Deleted = self.client.delete(&["customers", customer_id]).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Tokenized card synchronization
    // =========================================================================

    /// Card details of a customer's default payment method, falling back to
    /// the legacy default source
    async fn default_card(&self, customer_id: &str) -> Result<ReportedCard, StripeApiError> {
        let customer = self.retrieve_customer(customer_id).await?;
        let (customer, payment_method_id) = self.default_payment_method_id(customer).await?;

        if let Some(payment_method_id) = payment_method_id {
            let payment_method: PaymentMethod = self
                .client
                .get(&["payment_methods", &payment_method_id], &FormParams::new())
                .await?;
            return Ok(payment_method
                .card
                .as_ref()
                .map(ReportedCard::from_details)
                .unwrap_or_default());
        }

        match &customer.default_source {
            Some(source) => {
                let card = self.retrieve_source(&customer, source).await?;
                Ok(ReportedCard::from_details(&card))
            }
            None => {
                warn!(
                    provider_id = %self.config.provider_id,
                    "Customer does not have any default source: {}", customer_id
                );
                Ok(ReportedCard::default())
            }
        }
    }

    async fn sync(
        &self,
        persisted_cards: &HashMap<String, CreditCard>,
    ) -> Result<IndexMap<String, TokenizedCreditCard>, StepError> {
        let mut cards = IndexMap::with_capacity(persisted_cards.len());
        let mut starting_after: Option<String> = None;

        loop {
            let mut query = FormParams::new();
            query.set("limit", "100");
            if let Some(after) = &starting_after {
                query.set("starting_after", after.as_str());
            }
            query.expand("data.sources");

            let page: List<Customer> = self.client.get(&["customers"], &query).await?;
            if page.data.is_empty() {
                break;
            }
            debug!("customers.size() = {}", page.data.len());

            for listed in &page.data {
                let customer_id = listed.id.clone();
                starting_after = Some(customer_id.clone());

                let reported = self.default_card(&customer_id).await?;
                let persisted = persisted_cards.get(&customer_id);
                let replacement = Replacement::detect(
                    &self.config.provider_id,
                    &reported,
                    persisted.and_then(|c| c.masked_card_number()).as_deref(),
                    persisted.and_then(|c| c.expiration_month),
                    persisted.and_then(|c| c.expiration_year),
                );
                let card = replacement.into_tokenized(customer_id.as_str());

                debug!(
                    "provider_unique_id={}, provider_replacement_masked_card_number={:?}, \
                     replacement_masked_card_number={:?}, provider_replacement_expiration={:?}, \
                     replacement_expiration={:?}{}{:?}",
                    card.provider_unique_id,
                    card.provider_replacement_masked_card_number,
                    card.replacement_masked_card_number,
                    card.provider_replacement_expiration,
                    card.replacement_expiration_month,
                    EXPIRATION_DISPLAY_SEPARATOR,
                    card.replacement_expiration_year
                );

                if cards.insert(customer_id.clone(), card).is_some() {
                    return Err(PaymentError::DuplicateProviderUniqueId(customer_id).into());
                }
            }

            if !page.has_more {
                break;
            }
        }

        Ok(cards)
    }
}

#[async_trait]
impl MerchantServicesProvider for StripeProvider {
    fn provider_id(&self) -> &str {
        &self.config.provider_id
    }

    #[instrument(skip(self, request, card), fields(provider_id = %self.config.provider_id))]
    async fn sale(
        &self,
        request: &TransactionRequest,
        card: &CreditCard,
    ) -> PaymentResult<SaleResult> {
        let authorization = self.sale_or_authorize(request, card, true).await?;
        Ok(SaleResult::from_authorization(authorization))
    }

    #[instrument(skip(self, request, card), fields(provider_id = %self.config.provider_id))]
    async fn authorize(
        &self,
        request: &TransactionRequest,
        card: &CreditCard,
    ) -> PaymentResult<AuthorizationResult> {
        self.sale_or_authorize(request, card, false).await
    }

    #[instrument(skip(self, authorization), fields(provider_id = %self.config.provider_id))]
    async fn capture(&self, authorization: &AuthorizationResult) -> PaymentResult<CaptureResult> {
        let id = authorization
            .provider_unique_id
            .as_deref()
            .ok_or_else(|| {
                PaymentError::InvalidRequest("Authorization has no provider unique id".to_string())
            })?;

        let mut result = CaptureResult {
            provider_id: self.config.provider_id.clone(),
            communication_result: CommunicationResult::Success,
            provider_error_code: None,
            error_code: None,
            provider_error_message: None,
            provider_unique_id: Some(id.to_string()),
        };

        match self
            .client
            .post::<PaymentIntent>(&["payment_intents", id, "capture"], &FormParams::new())
            .await
        {
            Ok(intent) if intent.status == "succeeded" => {
                info!("Captured PaymentIntent: id={}", id);
            }
            Ok(intent) => {
                warn!("Capture returned unexpected status: id={}, status={}", id, intent.status);
                result.communication_result = CommunicationResult::GatewayError;
                result.provider_error_code = Some(intent.status);
                result.error_code = Some(ErrorCode::ApprovedButSettlementFailed);
            }
            Err(err) => {
                let converted = convert_error(&self.config.provider_id, None, None, None, &err);
                error!(
                    "Capture failed: id={}, request_id={:?}, provider_error_code={}, message={}",
                    id, err.request_id, converted.provider_error_code, converted.provider_error_message
                );
                if converted.is_declined() {
                    // Declines are expected at authorization, not here
                    result.communication_result = CommunicationResult::GatewayError;
                    result.error_code = Some(ErrorCode::ApprovedButSettlementFailed);
                } else {
                    result.communication_result = converted.communication_result;
                    result.error_code = converted.error_code;
                }
                result.provider_error_code = Some(converted.provider_error_code);
                result.provider_error_message = Some(converted.provider_error_message);
            }
        }
        Ok(result)
    }

    fn can_store_credit_cards(&self) -> bool {
        true
    }

    #[instrument(skip(self, card), fields(provider_id = %self.config.provider_id))]
    async fn store_credit_card(&self, card: &CreditCard) -> PaymentResult<String> {
        let customer = customer_params(card, false)?;
        let result = self.store(card, &customer).await;
        let customer_id = self.finish("store_credit_card", &CardContext::of(card), result)?;
        info!("Stored credit card: customer={}", customer_id);
        Ok(customer_id)
    }

    #[instrument(skip(self, card), fields(provider_id = %self.config.provider_id))]
    async fn update_credit_card(&self, card: &CreditCard) -> PaymentResult<()> {
        let customer_id = provider_unique_id(card)?;
        let mut customer = customer_params(card, true)?;
        customer.expand("sources");
        let payment_method = payment_method_update_params(card);
        let legacy_card = card_params(card, true);

        let result = self
            .update(customer_id, &customer, &payment_method, &legacy_card)
            .await;
        self.finish("update_credit_card", &CardContext::of(card), result)?;
        info!("Updated credit card: customer={}", customer_id);
        Ok(())
    }

    #[instrument(skip(self, card, card_number, card_code), fields(provider_id = %self.config.provider_id))]
    async fn update_credit_card_number_and_expiration(
        &self,
        card: &CreditCard,
        card_number: &str,
        expiration_month: u8,
        expiration_year: u16,
        card_code: Option<&str>,
    ) -> PaymentResult<()> {
        let customer_id = provider_unique_id(card)?;
        let card_code = card_code.map(numbers_only).or_else(|| card.card_code.clone());
        let new_payment_method = payment_method_params(
            card,
            Some(card_number),
            Some(expiration_month),
            Some(expiration_year),
            card_code.as_deref(),
        );
        let context = CardContext {
            masked_card_number: Some(mask_card_number(card_number)),
            expiration_month: Some(expiration_month),
            expiration_year: Some(expiration_year),
        };

        let result = self.replace_number(customer_id, &new_payment_method).await;
        self.finish("update_credit_card_number_and_expiration", &context, result)?;
        info!("Replaced card number: customer={}", customer_id);
        Ok(())
    }

    #[instrument(skip(self, card), fields(provider_id = %self.config.provider_id))]
    async fn update_credit_card_expiration(
        &self,
        card: &CreditCard,
        expiration_month: u8,
        expiration_year: u16,
    ) -> PaymentResult<()> {
        let customer_id = provider_unique_id(card)?;
        let context = CardContext {
            expiration_month: Some(expiration_month),
            expiration_year: Some(expiration_year),
            ..CardContext::of(card)
        };

        let result = self
            .update_expiration(customer_id, expiration_month, expiration_year)
            .await;
        self.finish("update_credit_card_expiration", &context, result)?;
        info!(
            "Updated card expiration: customer={}, expiration={}{}{}",
            customer_id, expiration_month, EXPIRATION_DISPLAY_SEPARATOR, expiration_year
        );
        Ok(())
    }

    #[instrument(skip(self, card), fields(provider_id = %self.config.provider_id))]
    async fn delete_credit_card(&self, card: &CreditCard) -> PaymentResult<()> {
        let customer_id = provider_unique_id(card)?;
        let result = self.delete(customer_id).await;
        self.finish("delete_credit_card", &CardContext::of(card), result)?;
        info!("Deleted credit card: customer={}", customer_id);
        Ok(())
    }

    fn can_get_tokenized_credit_cards(&self) -> bool {
        true
    }

    #[instrument(skip(self, persisted_cards), fields(provider_id = %self.config.provider_id, persisted = persisted_cards.len()))]
    async fn get_tokenized_credit_cards(
        &self,
        persisted_cards: &HashMap<String, CreditCard>,
    ) -> PaymentResult<IndexMap<String, TokenizedCreditCard>> {
        let result = self.sync(persisted_cards).await;
        let cards = self.finish("get_tokenized_credit_cards", &CardContext::default(), result)?;
        info!("Retrieved {} tokenized credit cards", cards.len());
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pay_core::Currency;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn provider() -> StripeProvider {
        StripeProvider::new(StripeConfig::new("stripe", "sk_test_abc")).unwrap()
    }

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad(3), "03");
        assert_eq!(zero_pad(11), "11");
    }

    #[test]
    fn test_provider_unique_id_required() {
        let card = CreditCard::new("4242424242424242", 1, 2031);
        assert!(matches!(
            provider_unique_id(&card),
            Err(PaymentError::InvalidRequest(_))
        ));
        let stored = CreditCard::stored("stripe", "cus_1", "XXXXXXXXXXXX4242");
        assert_eq!(provider_unique_id(&stored).unwrap(), "cus_1");
    }

    #[test]
    fn test_payment_intent_params() {
        let provider = provider();
        let mut request = TransactionRequest::new(Currency::USD, Decimal::from_str("19.99").unwrap())
            .with_order_number("1042")
            .with_description("Widgets");
        request.shipping_amount = Some(Decimal::from_str("5.01").unwrap());
        let card = CreditCard::new("4242424242424242", 12, 2030);

        let params = provider.payment_intent_params(&request, &card, false).unwrap();
        assert_eq!(params.get("amount"), Some("2500"));
        assert_eq!(params.get("currency"), Some("usd"));
        assert_eq!(params.get("capture_method"), Some("manual"));
        assert_eq!(params.get("confirm"), Some("true"));
        assert_eq!(params.get("statement_descriptor"), Some("AO#1042"));
        assert_eq!(params.get("description"), Some("Widgets"));
        assert_eq!(params.get("metadata[order_number]"), Some("1042"));
        assert!(!params.contains("customer"));
        assert!(!params.contains("receipt_email"));
    }

    #[test]
    fn test_payment_intent_params_zero_decimal_currency() {
        let provider = provider();
        let request = TransactionRequest::new(Currency::JPY, Decimal::from(1500));
        let card = CreditCard::stored("stripe", "cus_9", "XXXXXXXXXXXX4242");
        let params = provider.payment_intent_params(&request, &card, true).unwrap();
        assert_eq!(params.get("amount"), Some("1500"));
        assert_eq!(params.get("capture_method"), Some("automatic"));
        assert_eq!(params.get("customer"), Some("cus_9"));

        let fractional = TransactionRequest::new(Currency::JPY, Decimal::from_str("10.5").unwrap());
        assert!(matches!(
            provider.payment_intent_params(&fractional, &card, true),
            Err(PaymentError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_payment_intent_params_total_overflow() {
        let provider = provider();
        let mut request = TransactionRequest::new(Currency::USD, Decimal::MAX);
        request.tax_amount = Some(Decimal::ONE);
        let card = CreditCard::new("4242424242424242", 12, 2030);
        assert!(matches!(
            provider.payment_intent_params(&request, &card, true),
            Err(PaymentError::InvalidAmount { .. })
        ));
    }

    #[tokio::test]
    async fn test_test_mode_rejected() {
        let provider = provider();
        let mut request = TransactionRequest::new(Currency::USD, Decimal::ONE);
        request.test_mode = true;
        let card = CreditCard::new("4242424242424242", 12, 2030);
        assert!(matches!(
            provider.authorize(&request, &card).await,
            Err(PaymentError::UnsupportedOperation { .. })
        ));
    }

    #[tokio::test]
    async fn test_capture_requires_id() {
        let provider = provider();
        let authorization = AuthorizationResult::new("stripe", CommunicationResult::Success);
        assert!(matches!(
            provider.capture(&authorization).await,
            Err(PaymentError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_capabilities() {
        let provider = provider();
        assert!(provider.can_store_credit_cards());
        assert!(provider.can_get_tokenized_credit_cards());
        assert_eq!(provider.provider_id(), "stripe");
    }
}
