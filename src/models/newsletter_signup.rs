use crate::schema::newsletter_signups;
use chrono::{DateTime, Utc};

#[derive(Insertable)]
#[diesel(table_name = newsletter_signups)]
pub struct NewNewsletterSignup<'a> {
    pub id: &'a uuid::Uuid,
    pub email: &'a str,
    pub created_at: &'a DateTime<Utc>,
}
