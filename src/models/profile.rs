use crate::schema::profiles;
use chrono::{DateTime, Utc};

#[derive(Queryable, serde::Serialize, Debug)]
pub struct Profile {
    pub id: uuid::Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_profile_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile<'a> {
    pub id: &'a uuid::Uuid,
    pub email: Option<&'a str>,
    pub full_name: Option<&'a str>,
    pub display_name: &'a str,
    pub created_at: &'a DateTime<Utc>,
    pub updated_at: &'a DateTime<Utc>,
}

/// Fields left as `None` are not touched.
#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = profiles)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_profile_public: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}
