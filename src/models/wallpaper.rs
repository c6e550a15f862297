use crate::schema::wallpapers;
use chrono::{DateTime, Utc};

#[derive(Queryable, serde::Serialize, Debug)]
pub struct Wallpaper {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub prompt: String,
    pub style: Option<String>,
    pub aspect_ratio: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = wallpapers)]
pub struct NewWallpaper<'a> {
    pub id: &'a uuid::Uuid,
    pub user_id: &'a uuid::Uuid,
    pub prompt: &'a str,
    pub style: Option<&'a str>,
    pub aspect_ratio: &'a str,
    pub image_url: &'a str,
    pub thumbnail_url: Option<&'a str>,
    pub created_at: &'a DateTime<Utc>,
    pub updated_at: &'a DateTime<Utc>,
}
