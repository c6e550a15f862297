use crate::guards::AuthenticatedUser;
use crate::models::{NewWallpaper, Wallpaper};
use crate::routes::{required, ApiError, OrUnexpected};
use crate::schema::wallpapers;
use crate::startup::WallscapeDbConn;
use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use uuid::Uuid;

const DEFAULT_ASPECT_RATIO: &str = "1:1";
const WALLPAPER_NOT_FOUND: &str = "Wallpaper not found";

#[tracing::instrument(
    name = "List a user's wallpapers",
    skip(conn, user),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[get("/api/wallpapers")]
pub async fn list_wallpapers(
    conn: WallscapeDbConn,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Wallpaper>>, ApiError> {
    let user_id = user.user_id;
    let wallpapers = conn
        .run(move |c| {
            wallpapers::table
                .filter(wallpapers::user_id.eq(user_id))
                .order(wallpapers::created_at.desc())
                .load::<Wallpaper>(c)
        })
        .await
        .or_unexpected("Error fetching wallpapers")?;
    Ok(Json(wallpapers))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveWallpaperData {
    prompt: Option<String>,
    style: Option<String>,
    aspect_ratio: Option<String>,
    image_url: Option<String>,
    thumbnail_url: Option<String>,
}

#[tracing::instrument(
    name = "Save a generated wallpaper",
    skip(body, conn, user),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[post("/api/wallpapers", data = "<body>")]
pub async fn save_wallpaper(
    body: Json<SaveWallpaperData>,
    conn: WallscapeDbConn,
    user: AuthenticatedUser,
) -> Result<(Status, Json<Wallpaper>), ApiError> {
    let body = body.into_inner();
    let prompt = required(body.prompt, "Prompt is required")?;
    let image_url = required(body.image_url, "Image URL is required")?;
    let aspect_ratio = body
        .aspect_ratio
        .filter(|ratio| !ratio.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ASPECT_RATIO.to_string());
    let style = body.style.filter(|style| !style.trim().is_empty());
    let thumbnail_url = body.thumbnail_url.filter(|url| !url.trim().is_empty());
    let user_id = user.user_id;

    let wallpaper = conn
        .run(move |c| {
            let now = Utc::now();
            diesel::insert_into(wallpapers::table)
                .values(NewWallpaper {
                    id: &Uuid::new_v4(),
                    user_id: &user_id,
                    prompt: &prompt,
                    style: style.as_deref(),
                    aspect_ratio: &aspect_ratio,
                    image_url: &image_url,
                    thumbnail_url: thumbnail_url.as_deref(),
                    created_at: &now,
                    updated_at: &now,
                })
                .get_result::<Wallpaper>(c)
        })
        .await
        .or_unexpected("Error saving wallpaper")?;
    Ok((Status::Created, Json(wallpaper)))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallpaperVisibilityData {
    is_public: Option<bool>,
}

#[tracing::instrument(
    name = "Change a wallpaper's visibility",
    skip(body, conn, user),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id, is_public = ?body.is_public)
)]
#[patch("/api/wallpapers/<id>", data = "<body>")]
pub async fn update_wallpaper(
    id: &str,
    body: Json<WallpaperVisibilityData>,
    conn: WallscapeDbConn,
    user: AuthenticatedUser,
) -> Result<Json<Wallpaper>, ApiError> {
    let id = Uuid::parse_str(id).map_err(|_| ApiError::NotFound(WALLPAPER_NOT_FOUND))?;
    let is_public = body
        .is_public
        .ok_or_else(|| ApiError::ValidationError("isPublic is required".into()))?;
    let user_id = user.user_id;

    let wallpaper = conn
        .run(move |c| {
            diesel::update(
                wallpapers::table
                    .filter(wallpapers::id.eq(id))
                    .filter(wallpapers::user_id.eq(user_id)),
            )
            .set((
                wallpapers::is_public.eq(is_public),
                wallpapers::updated_at.eq(Utc::now()),
            ))
            .get_result::<Wallpaper>(c)
            .optional()
        })
        .await
        .or_unexpected("Error updating wallpaper")?;
    wallpaper
        .map(Json)
        .ok_or(ApiError::NotFound(WALLPAPER_NOT_FOUND))
}

#[tracing::instrument(
    name = "Delete a wallpaper",
    skip(conn, user),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[delete("/api/wallpapers/<id>")]
pub async fn delete_wallpaper(
    id: &str,
    conn: WallscapeDbConn,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let id = Uuid::parse_str(id).map_err(|_| ApiError::NotFound(WALLPAPER_NOT_FOUND))?;
    let user_id = user.user_id;

    let deleted = conn
        .run(move |c| {
            diesel::delete(
                wallpapers::table
                    .filter(wallpapers::id.eq(id))
                    .filter(wallpapers::user_id.eq(user_id)),
            )
            .execute(c)
        })
        .await
        .or_unexpected("Error deleting wallpaper")?;
    if deleted == 0 {
        return Err(ApiError::NotFound(WALLPAPER_NOT_FOUND));
    }
    Ok(Json(json!({ "success": true })))
}
