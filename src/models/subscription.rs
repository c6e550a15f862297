use crate::schema::subscriptions;
use chrono::offset::Utc;
use chrono::DateTime;

#[derive(Queryable, serde::Serialize, Debug, Clone)]
pub struct Subscription {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub plan_id: Option<String>,
    pub plan_type: String,
    pub status: String,
    pub cancel_at_period_end: bool,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn references_subscription(&self, stripe_subscription_id: &str) -> bool {
        self.stripe_subscription_id.as_deref() == Some(stripe_subscription_id)
    }

    pub fn references_customer(&self, stripe_customer_id: &str) -> bool {
        self.stripe_customer_id.as_deref() == Some(stripe_customer_id)
    }
}

/// A complete subscription row, written with update-or-insert on `user_id`.
///
/// `None` is written as NULL so a replacement never inherits stale Stripe ids.
#[derive(Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = subscriptions, treat_none_as_null = true)]
pub struct SubscriptionRecord {
    pub user_id: uuid::Uuid,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub plan_id: Option<String>,
    pub plan_type: String,
    pub status: String,
    pub cancel_at_period_end: bool,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
