use crate::schema::usage;
use chrono::{DateTime, Utc};

#[derive(Queryable, serde::Serialize, Debug, Clone)]
pub struct Usage {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub monthly_generations: i32,
    pub count: i32,
    pub total_generations: i32,
    pub reset_date: Option<DateTime<Utc>>,
    pub last_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Usage {
    /// Another generation is allowed. A lapsed period counts as already reset.
    pub fn has_quota_left(&self, now: DateTime<Utc>) -> bool {
        self.period_has_ended(now) || self.count < self.monthly_generations
    }

    pub fn period_has_ended(&self, now: DateTime<Utc>) -> bool {
        self.reset_date.map(|reset| reset <= now).unwrap_or(false)
    }

    /// At least 80% of the monthly quota is used.
    pub fn is_approaching_limit(&self) -> bool {
        self.count as i64 * 5 >= self.monthly_generations as i64 * 4
    }
}

#[derive(Insertable)]
#[diesel(table_name = usage)]
pub struct NewUsage<'a> {
    pub id: &'a uuid::Uuid,
    pub user_id: &'a uuid::Uuid,
    pub monthly_generations: i32,
    pub count: i32,
    pub total_generations: i32,
    pub reset_date: Option<&'a DateTime<Utc>>,
    pub created_at: &'a DateTime<Utc>,
    pub updated_at: &'a DateTime<Utc>,
}
