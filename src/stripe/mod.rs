#[cfg(any(test, feature = "test-support"))]
mod fake_stripe_client;
mod real_stripe_client;
mod webhook;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

#[cfg(any(test, feature = "test-support"))]
pub use fake_stripe_client::*;
pub use real_stripe_client::*;
pub use webhook::*;

macro_rules! stripe_id {
    ($name:ident) => {
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Deserialize, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(pub Arc<str>);

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id.into())
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.into())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

stripe_id!(StripeCustomerId);
stripe_id!(StripeSubscriptionId);
stripe_id!(StripePriceId);
stripe_id!(StripeProductId);

/// Key under which the user id is stored in Stripe metadata.
pub const USER_ID_METADATA_KEY: &str = "userId";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(pub HashMap<String, String>);

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID_METADATA_KEY)
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Option::<HashMap<String, String>>::deserialize(deserializer)?;
        Ok(Self(map.unwrap_or_default()))
    }
}

/// Stripe sends either the id or the expanded object for related resources.
#[derive(Deserialize)]
#[serde(untagged)]
enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    fn into_id(self) -> String {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object { id } => id,
        }
    }
}

fn expandable_id<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    Ok(T::from(Expandable::deserialize(deserializer)?.into_id()))
}

fn optional_expandable_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    Ok(Option::<Expandable>::deserialize(deserializer)?.map(|e| T::from(e.into_id())))
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
}

impl<T> Default for StripeList<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: StripeCustomerId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: StripeSubscriptionId,
    #[serde(deserialize_with = "expandable_id")]
    pub customer: StripeCustomerId,
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub items: StripeList<StripeSubscriptionItem>,
}

impl StripeSubscription {
    pub fn first_price(&self) -> Option<&StripePrice> {
        self.items.data.first().map(|item| &item.price)
    }

    /// Newer API versions report billing periods per item.
    pub fn period_start(&self) -> Option<i64> {
        self.current_period_start
            .or_else(|| self.items.data.first()?.current_period_start)
    }

    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.items.data.first()?.current_period_end)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: StripePrice,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: StripePriceId,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default, deserialize_with = "optional_expandable_id")]
    pub product: Option<StripeProductId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeProduct {
    pub id: StripeProductId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    #[serde(default, deserialize_with = "optional_expandable_id")]
    pub customer: Option<StripeCustomerId>,
    #[serde(default, deserialize_with = "optional_expandable_id")]
    pub subscription: Option<StripeSubscriptionId>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    #[serde(default, deserialize_with = "optional_expandable_id")]
    pub customer: Option<StripeCustomerId>,
    #[serde(default, deserialize_with = "optional_expandable_id")]
    pub subscription: Option<StripeSubscriptionId>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeBillingPortalSession {
    pub url: String,
}

#[derive(Debug)]
pub struct CreateCustomerParams<'a> {
    pub email: Option<&'a str>,
    pub user_id: &'a str,
}

#[derive(Debug)]
pub struct CreateCheckoutSessionParams<'a> {
    pub customer: &'a StripeCustomerId,
    pub price: &'a str,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
    pub client_reference_id: &'a str,
    pub metadata: Vec<(&'a str, &'a str)>,
}

#[derive(Debug, Default)]
pub struct UpdateSubscriptionParams {
    pub cancel_at_period_end: Option<bool>,
}

#[derive(Debug, Default)]
pub struct CancelSubscriptionParams {
    pub invoice_now: bool,
    pub prorate: bool,
}

#[async_trait]
pub trait StripeClient: Send + Sync {
    async fn get_customer(&self, customer_id: &StripeCustomerId) -> Result<StripeCustomer>;

    async fn create_customer(&self, params: CreateCustomerParams<'_>) -> Result<StripeCustomer>;

    async fn delete_customer(&self, customer_id: &StripeCustomerId) -> Result<()>;

    async fn get_subscription(
        &self,
        subscription_id: &StripeSubscriptionId,
    ) -> Result<StripeSubscription>;

    async fn update_subscription(
        &self,
        subscription_id: &StripeSubscriptionId,
        params: UpdateSubscriptionParams,
    ) -> Result<StripeSubscription>;

    async fn cancel_subscription(
        &self,
        subscription_id: &StripeSubscriptionId,
        params: CancelSubscriptionParams,
    ) -> Result<()>;

    async fn get_product(&self, product_id: &StripeProductId) -> Result<StripeProduct>;

    async fn create_checkout_session(
        &self,
        params: CreateCheckoutSessionParams<'_>,
    ) -> Result<StripeCheckoutSession>;

    async fn create_billing_portal_session(
        &self,
        customer_id: &StripeCustomerId,
        return_url: &str,
    ) -> Result<StripeBillingPortalSession>;
}
