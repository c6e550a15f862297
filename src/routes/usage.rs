use crate::billing::record_generation;
use crate::guards::AuthenticatedUser;
use crate::routes::{required, ApiError, OrUnexpected};
use crate::startup::WallscapeDbConn;
use chrono::Utc;
use rocket::serde::json::{json, Json, Value};
use uuid::Uuid;

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackUsageData {
    user_id: Option<String>,
    action: Option<String>,
}

#[tracing::instrument(
    name = "Track a generation",
    skip(body, conn, user),
    fields(request_id = %Uuid::new_v4(), user_id = ?body.user_id, action = ?body.action)
)]
#[post("/api/track-usage", data = "<body>")]
pub async fn track_usage(
    body: Json<TrackUsageData>,
    conn: WallscapeDbConn,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let body = body.into_inner();
    let missing = "User ID and action are required";
    let user_id = required(body.user_id, missing)?;
    required(body.action, missing)?;
    if !user.owns(&user_id) {
        return Err(ApiError::Unauthorized);
    }

    let user_id = user.user_id;
    let usage = conn
        .run(move |c| record_generation(c, user_id, Utc::now()))
        .await
        .or_unexpected("Error tracking usage")?;

    Ok(Json(json!({
        "success": true,
        "isApproachingLimit": usage.is_approaching_limit(),
        "currentUsage": usage.count,
        "limit": usage.monthly_generations,
    })))
}
