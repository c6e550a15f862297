use crate::billing::{provision_user, Provisioning};
use crate::domain::{DisplayName, UserEmail};
use crate::guards::AuthenticatedUser;
use crate::models::{NewProfile, Profile, ProfileChanges};
use crate::routes::{ApiError, OrUnexpected};
use crate::schema::profiles;
use crate::startup::WallscapeDbConn;
use chrono::Utc;
use diesel::{OptionalExtension, QueryDsl, RunQueryDsl};
use rocket::serde::json::{json, Json, Value};
use uuid::Uuid;

const DEFAULT_DISPLAY_NAME: &str = "User";
const PROFILE_NOT_FOUND: &str = "Profile not found";

/// Everything needed to provision a user.
#[derive(Debug)]
pub struct NewUser {
    id: Uuid,
    email: Option<UserEmail>,
    full_name: Option<String>,
    display_name: DisplayName,
}

impl NewUser {
    /// Display name falls back to the email's local part, then to "User".
    fn new(
        id: Uuid,
        email: Option<UserEmail>,
        full_name: Option<String>,
        display_name: Option<DisplayName>,
    ) -> Result<NewUser, String> {
        let display_name = match display_name {
            Some(name) => name,
            None => {
                let fallback = email
                    .as_ref()
                    .map(|email| email.local_part().to_string())
                    .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
                DisplayName::parse(fallback)
                    .or_else(|_| DisplayName::parse(DEFAULT_DISPLAY_NAME.to_string()))?
            }
        };
        Ok(NewUser {
            id,
            email,
            full_name: full_name.filter(|name| !name.trim().is_empty()),
            display_name,
        })
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileData {
    user_id: Option<String>,
    display_name: Option<String>,
    email: Option<String>,
    full_name: Option<String>,
}

impl TryFrom<CreateProfileData> for NewUser {
    type Error = String;

    fn try_from(data: CreateProfileData) -> Result<Self, Self::Error> {
        let id = data
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| "User ID is required".to_string())?;
        let id = Uuid::parse_str(id.trim())
            .map_err(|_| format!("{} is not a valid user ID.", id.trim()))?;
        let email = data
            .email
            .filter(|email| !email.trim().is_empty())
            .map(UserEmail::parse)
            .transpose()?;
        let display_name = data
            .display_name
            .filter(|name| !name.trim().is_empty())
            .map(DisplayName::parse)
            .transpose()?;
        NewUser::new(id, email, data.full_name, display_name)
    }
}

#[tracing::instrument(
    name = "Create a user profile",
    skip(body, conn),
    fields(request_id = %Uuid::new_v4(), user_id = ?body.user_id)
)]
#[post("/api/auth/create-profile", data = "<body>")]
pub async fn create_profile(
    body: Json<CreateProfileData>,
    conn: WallscapeDbConn,
) -> Result<Json<Value>, ApiError> {
    let new_user: NewUser = body
        .into_inner()
        .try_into()
        .map_err(ApiError::ValidationError)?;
    provision(new_user, &conn).await
}

#[tracing::instrument(
    name = "Create the profile of the signed-in user",
    skip(conn, user),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[post("/api/auth/profile")]
pub async fn session_profile(
    conn: WallscapeDbConn,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let display_name = user
        .full_name
        .clone()
        .and_then(|name| DisplayName::parse(name).ok());
    let new_user = NewUser::new(user.user_id, user.email, user.full_name, display_name)
        .map_err(ApiError::ValidationError)?;
    provision(new_user, &conn).await
}

async fn provision(new_user: NewUser, conn: &WallscapeDbConn) -> Result<Json<Value>, ApiError> {
    let provisioning = conn
        .run(move |c| {
            let now = Utc::now();
            provision_user(
                c,
                NewProfile {
                    id: &new_user.id,
                    email: new_user.email.as_ref().map(|email| email.as_ref()),
                    full_name: new_user.full_name.as_deref(),
                    display_name: new_user.display_name.as_ref(),
                    created_at: &now,
                    updated_at: &now,
                },
            )
        })
        .await
        .or_unexpected("Failed to create profile")?;

    match provisioning {
        Provisioning::Created => Ok(Json(json!({ "success": true }))),
        Provisioning::AlreadyExists => Ok(Json(json!({
            "success": true,
            "message": "Profile already exists",
        }))),
    }
}

#[tracing::instrument(
    name = "Fetch the caller's profile",
    skip(conn, user),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[get("/api/profile")]
pub async fn get_profile(
    conn: WallscapeDbConn,
    user: AuthenticatedUser,
) -> Result<Json<Profile>, ApiError> {
    let user_id = user.user_id;
    conn.run(move |c| profiles::table.find(user_id).first::<Profile>(c).optional())
        .await
        .or_unexpected("Error fetching profile")?
        .map(Json)
        .ok_or(ApiError::NotFound(PROFILE_NOT_FOUND))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileData {
    display_name: Option<String>,
    full_name: Option<String>,
    avatar_url: Option<String>,
    is_profile_public: Option<bool>,
}

impl TryFrom<UpdateProfileData> for ProfileChanges {
    type Error = String;

    fn try_from(data: UpdateProfileData) -> Result<Self, Self::Error> {
        let display_name = data
            .display_name
            .map(DisplayName::parse)
            .transpose()?
            .map(|name| name.as_ref().to_string());
        Ok(ProfileChanges {
            display_name,
            full_name: data.full_name,
            avatar_url: data.avatar_url,
            is_profile_public: data.is_profile_public,
            updated_at: Some(Utc::now()),
        })
    }
}

#[tracing::instrument(
    name = "Edit the caller's profile",
    skip(body, conn, user),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id)
)]
#[patch("/api/profile", data = "<body>")]
pub async fn update_profile(
    body: Json<UpdateProfileData>,
    conn: WallscapeDbConn,
    user: AuthenticatedUser,
) -> Result<Json<Profile>, ApiError> {
    let changes: ProfileChanges = body
        .into_inner()
        .try_into()
        .map_err(ApiError::ValidationError)?;
    let user_id = user.user_id;
    conn.run(move |c| {
        diesel::update(profiles::table.find(user_id))
            .set(&changes)
            .get_result::<Profile>(c)
            .optional()
    })
    .await
    .or_unexpected("Error updating profile")?
    .map(Json)
    .ok_or(ApiError::NotFound(PROFILE_NOT_FOUND))
}
