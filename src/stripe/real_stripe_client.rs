use std::future::Future;
use std::str::FromStr as _;
use std::time::Duration;

use ::stripe::{
    BillingPortalSession, CheckoutSession, CheckoutSessionBillingAddressCollection,
    CheckoutSessionMode, CreateBillingPortalSession, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionPaymentMethodTypes, CreateCustomer,
    Customer, CustomerId, Product, ProductId, StripeError, Subscription, SubscriptionId,
};
use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::configuration::StripeSettings;
use crate::stripe::{
    CancelSubscriptionParams, CreateCheckoutSessionParams, CreateCustomerParams,
    StripeBillingPortalSession, StripeCheckoutSession, StripeClient, StripeCustomer,
    StripeCustomerId, StripeProduct, StripeProductId, StripeSubscription, StripeSubscriptionId,
    UpdateSubscriptionParams, USER_ID_METADATA_KEY,
};

pub struct RealStripeClient {
    client: ::stripe::Client,
    timeout: Duration,
}

impl RealStripeClient {
    pub fn new(settings: &StripeSettings) -> Self {
        Self {
            client: ::stripe::Client::from_url(
                settings.api_base_url.as_str(),
                settings.secret_key.expose_secret().as_str(),
            ),
            timeout: settings.timeout(),
        }
    }

    async fn call<T>(&self, request: impl Future<Output = Result<T, StripeError>>) -> Result<T> {
        tokio::time::timeout(self.timeout, request)
            .await
            .context("Timed out waiting for Stripe.")?
            .map_err(|error| anyhow!(error))
    }
}

#[async_trait]
impl StripeClient for RealStripeClient {
    async fn get_customer(&self, customer_id: &StripeCustomerId) -> Result<StripeCustomer> {
        let customer_id = customer_id.try_into()?;

        let customer = self
            .call(Customer::retrieve(&self.client, &customer_id, &[]))
            .await?;

        from_wire(customer)
    }

    async fn create_customer(&self, params: CreateCustomerParams<'_>) -> Result<StripeCustomer> {
        let metadata = [(USER_ID_METADATA_KEY.to_string(), params.user_id.to_string())];
        let customer = self
            .call(Customer::create(
                &self.client,
                CreateCustomer {
                    email: params.email,
                    metadata: Some(metadata.into_iter().collect()),
                    ..Default::default()
                },
            ))
            .await?;

        from_wire(customer)
    }

    async fn delete_customer(&self, customer_id: &StripeCustomerId) -> Result<()> {
        let customer_id = customer_id.try_into()?;

        self.call(Customer::delete(&self.client, &customer_id)).await?;

        Ok(())
    }

    async fn get_subscription(
        &self,
        subscription_id: &StripeSubscriptionId,
    ) -> Result<StripeSubscription> {
        let subscription_id = subscription_id.try_into()?;

        let subscription = self
            .call(Subscription::retrieve(&self.client, &subscription_id, &[]))
            .await?;

        from_wire(subscription)
    }

    async fn update_subscription(
        &self,
        subscription_id: &StripeSubscriptionId,
        params: UpdateSubscriptionParams,
    ) -> Result<StripeSubscription> {
        let subscription_id = subscription_id.try_into()?;

        let subscription = self
            .call(Subscription::update(
                &self.client,
                &subscription_id,
                ::stripe::UpdateSubscription {
                    cancel_at_period_end: params.cancel_at_period_end,
                    ..Default::default()
                },
            ))
            .await?;

        from_wire(subscription)
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &StripeSubscriptionId,
        params: CancelSubscriptionParams,
    ) -> Result<()> {
        let subscription_id = subscription_id.try_into()?;

        self.call(Subscription::cancel(
            &self.client,
            &subscription_id,
            ::stripe::CancelSubscription {
                invoice_now: Some(params.invoice_now),
                prorate: Some(params.prorate),
                ..Default::default()
            },
        ))
        .await?;

        Ok(())
    }

    async fn get_product(&self, product_id: &StripeProductId) -> Result<StripeProduct> {
        let product_id = product_id.try_into()?;

        let product = self
            .call(Product::retrieve(&self.client, &product_id, &[]))
            .await?;

        from_wire(product)
    }

    async fn create_checkout_session(
        &self,
        params: CreateCheckoutSessionParams<'_>,
    ) -> Result<StripeCheckoutSession> {
        let params = params.try_into()?;

        let session = self
            .call(CheckoutSession::create(&self.client, params))
            .await?;

        from_wire(session)
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: &StripeCustomerId,
        return_url: &str,
    ) -> Result<StripeBillingPortalSession> {
        let mut params = CreateBillingPortalSession::new(customer_id.try_into()?);
        params.return_url = Some(return_url);

        let session = self
            .call(BillingPortalSession::create(&self.client, params))
            .await?;

        Ok(StripeBillingPortalSession { url: session.url })
    }
}

/// Objects returned by the API serialize back to the same shape webhook payloads carry.
fn from_wire<S: Serialize, T: DeserializeOwned>(object: S) -> Result<T> {
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .context("Failed to read a Stripe API object.")
}

/// Stripe ids are a resource prefix followed by alphanumerics.
fn ensure_plain_id(id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(anyhow!("{:?} is not a valid Stripe id.", id));
    }
    Ok(())
}

impl TryFrom<&StripeCustomerId> for CustomerId {
    type Error = anyhow::Error;

    fn try_from(value: &StripeCustomerId) -> Result<Self, Self::Error> {
        ensure_plain_id(value.as_ref())?;
        Self::from_str(value.as_ref()).context("failed to parse Stripe customer ID")
    }
}

impl TryFrom<&StripeSubscriptionId> for SubscriptionId {
    type Error = anyhow::Error;

    fn try_from(value: &StripeSubscriptionId) -> Result<Self, Self::Error> {
        ensure_plain_id(value.as_ref())?;
        Self::from_str(value.as_ref()).context("failed to parse Stripe subscription ID")
    }
}

impl TryFrom<&StripeProductId> for ProductId {
    type Error = anyhow::Error;

    fn try_from(value: &StripeProductId) -> Result<Self, Self::Error> {
        ensure_plain_id(value.as_ref())?;
        Self::from_str(value.as_ref()).context("failed to parse Stripe product ID")
    }
}

impl<'a> TryFrom<CreateCheckoutSessionParams<'a>> for CreateCheckoutSession<'a> {
    type Error = anyhow::Error;

    fn try_from(value: CreateCheckoutSessionParams<'a>) -> Result<Self, Self::Error> {
        Ok(Self {
            customer: Some(value.customer.try_into()?),
            client_reference_id: Some(value.client_reference_id),
            mode: Some(CheckoutSessionMode::Subscription),
            payment_method_types: Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]),
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price: Some(value.price.to_string()),
                quantity: Some(1),
                ..Default::default()
            }]),
            allow_promotion_codes: Some(true),
            billing_address_collection: Some(CheckoutSessionBillingAddressCollection::Auto),
            metadata: Some(
                value
                    .metadata
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            ),
            success_url: Some(value.success_url),
            cancel_url: Some(value.cancel_url),
            ..Default::default()
        })
    }
}
