use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::stripe::{
    CancelSubscriptionParams, CreateCheckoutSessionParams, CreateCustomerParams, Metadata,
    StripeBillingPortalSession, StripeCheckoutSession, StripeClient, StripeCustomer,
    StripeCustomerId, StripeProduct, StripeProductId, StripeSubscription, StripeSubscriptionId,
    UpdateSubscriptionParams, USER_ID_METADATA_KEY,
};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CreateCheckoutSessionCall {
    pub customer: StripeCustomerId,
    pub price: String,
    pub success_url: String,
    pub cancel_url: String,
    pub client_reference_id: String,
    pub metadata: Vec<(String, String)>,
}

/// In-memory stand-in for Stripe that records every mutating call.
#[derive(Default)]
pub struct FakeStripeClient {
    pub customers: Mutex<HashMap<StripeCustomerId, StripeCustomer>>,
    pub subscriptions: Mutex<HashMap<StripeSubscriptionId, StripeSubscription>>,
    pub products: Mutex<HashMap<StripeProductId, StripeProduct>>,
    pub deleted_customers: Mutex<Vec<StripeCustomerId>>,
    pub canceled_subscriptions: Mutex<Vec<StripeSubscriptionId>>,
    pub create_checkout_session_calls: Mutex<Vec<CreateCheckoutSessionCall>>,
    pub portal_session_customers: Mutex<Vec<StripeCustomerId>>,
}

impl FakeStripeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_customer(&self, customer: StripeCustomer) {
        self.customers
            .lock()
            .unwrap()
            .insert(customer.id.clone(), customer);
    }

    pub fn add_subscription(&self, subscription: StripeSubscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id.clone(), subscription);
    }

    pub fn add_product(&self, product: StripeProduct) {
        self.products
            .lock()
            .unwrap()
            .insert(product.id.clone(), product);
    }
}

#[async_trait]
impl StripeClient for FakeStripeClient {
    async fn get_customer(&self, customer_id: &StripeCustomerId) -> Result<StripeCustomer> {
        self.customers
            .lock()
            .unwrap()
            .get(customer_id)
            .cloned()
            .ok_or_else(|| anyhow!("no customer found for {customer_id:?}"))
    }

    async fn create_customer(&self, params: CreateCustomerParams<'_>) -> Result<StripeCustomer> {
        let mut metadata = Metadata::default();
        metadata
            .0
            .insert(USER_ID_METADATA_KEY.to_string(), params.user_id.to_string());
        let customer = StripeCustomer {
            id: StripeCustomerId(format!("cus_{}", Uuid::new_v4()).into()),
            email: params.email.map(|email| email.to_string()),
            metadata,
            deleted: false,
        };
        self.add_customer(customer.clone());
        Ok(customer)
    }

    async fn delete_customer(&self, customer_id: &StripeCustomerId) -> Result<()> {
        self.customers
            .lock()
            .unwrap()
            .remove(customer_id)
            .ok_or_else(|| anyhow!("no customer found for {customer_id:?}"))?;
        self.deleted_customers
            .lock()
            .unwrap()
            .push(customer_id.clone());
        Ok(())
    }

    async fn get_subscription(
        &self,
        subscription_id: &StripeSubscriptionId,
    ) -> Result<StripeSubscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| anyhow!("no subscription found for {subscription_id:?}"))
    }

    async fn update_subscription(
        &self,
        subscription_id: &StripeSubscriptionId,
        params: UpdateSubscriptionParams,
    ) -> Result<StripeSubscription> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| anyhow!("no subscription found for {subscription_id:?}"))?;
        if let Some(cancel_at_period_end) = params.cancel_at_period_end {
            subscription.cancel_at_period_end = cancel_at_period_end;
        }
        Ok(subscription.clone())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &StripeSubscriptionId,
        _params: CancelSubscriptionParams,
    ) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| anyhow!("no subscription found for {subscription_id:?}"))?;
        subscription.status = "canceled".into();
        self.canceled_subscriptions
            .lock()
            .unwrap()
            .push(subscription_id.clone());
        Ok(())
    }

    async fn get_product(&self, product_id: &StripeProductId) -> Result<StripeProduct> {
        self.products
            .lock()
            .unwrap()
            .get(product_id)
            .cloned()
            .ok_or_else(|| anyhow!("no product found for {product_id:?}"))
    }

    async fn create_checkout_session(
        &self,
        params: CreateCheckoutSessionParams<'_>,
    ) -> Result<StripeCheckoutSession> {
        self.create_checkout_session_calls
            .lock()
            .unwrap()
            .push(CreateCheckoutSessionCall {
                customer: params.customer.clone(),
                price: params.price.to_string(),
                success_url: params.success_url.to_string(),
                cancel_url: params.cancel_url.to_string(),
                client_reference_id: params.client_reference_id.to_string(),
                metadata: params
                    .metadata
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            });
        let id = format!("cs_test_{}", Uuid::new_v4());
        Ok(StripeCheckoutSession {
            url: Some(format!("https://checkout.stripe.com/c/pay/{}", id)),
            id,
            customer: Some(params.customer.clone()),
            subscription: None,
            metadata: Metadata::default(),
        })
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: &StripeCustomerId,
        return_url: &str,
    ) -> Result<StripeBillingPortalSession> {
        self.portal_session_customers
            .lock()
            .unwrap()
            .push(customer_id.clone());
        Ok(StripeBillingPortalSession {
            url: format!(
                "https://billing.stripe.com/p/session/{}?return_url={}",
                customer_id, return_url
            ),
        })
    }
}
