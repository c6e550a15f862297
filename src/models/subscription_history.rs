use crate::schema::subscription_history;
use chrono::{DateTime, Utc};

#[derive(Insertable)]
#[diesel(table_name = subscription_history)]
pub struct NewSubscriptionHistory<'a> {
    pub id: &'a uuid::Uuid,
    pub user_id: &'a uuid::Uuid,
    pub action: &'a str,
    pub from_plan: &'a str,
    pub to_plan: &'a str,
    pub created_at: &'a DateTime<Utc>,
}
