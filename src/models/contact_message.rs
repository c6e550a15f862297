use crate::schema::contact_messages;
use chrono::{DateTime, Utc};

#[derive(Insertable)]
#[diesel(table_name = contact_messages)]
pub struct NewContactMessage<'a> {
    pub id: &'a uuid::Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub message: &'a str,
    pub created_at: &'a DateTime<Utc>,
}
