use crate::auth_provider::{AuthProvider, VerificationError};
use crate::routes::{required, ApiError};
use rocket::http::{Cookie, CookieJar};
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use std::sync::Arc;
use uuid::Uuid;

/// Substrings that mark a cookie as part of the auth session.
const SESSION_COOKIE_MARKERS: [&str; 3] = ["supabase", "sb-", "auth"];

#[derive(serde::Deserialize)]
pub struct VerifyEmailData {
    token: Option<String>,
}

#[tracing::instrument(
    name = "Confirm an email change",
    skip(body, auth_provider),
    fields(request_id = %Uuid::new_v4())
)]
#[post("/api/auth/verify-email", data = "<body>")]
pub async fn verify_email(
    body: Json<VerifyEmailData>,
    auth_provider: &State<Arc<dyn AuthProvider>>,
) -> Result<Json<Value>, ApiError> {
    let token = required(body.into_inner().token, "Verification token is required")?;
    match auth_provider.verify_email_change(&token).await {
        Ok(()) => Ok(Json(json!({ "success": true }))),
        Err(VerificationError::Rejected(message)) => Err(ApiError::ValidationError(message)),
        Err(VerificationError::UnexpectedError(error)) => {
            Err(ApiError::UnexpectedError("Failed to verify email", error))
        }
    }
}

fn is_session_cookie(name: &str) -> bool {
    SESSION_COOKIE_MARKERS
        .iter()
        .any(|marker| name.contains(marker))
}

#[tracing::instrument(name = "Sign out", skip(cookies), fields(request_id = %Uuid::new_v4()))]
#[post("/api/auth/logout")]
pub fn logout(cookies: &CookieJar<'_>) -> Json<Value> {
    let names: Vec<String> = cookies
        .iter()
        .map(|cookie| cookie.name().to_string())
        .filter(|name| is_session_cookie(name))
        .collect();
    for name in names {
        tracing::debug!("Expiring cookie {}", name);
        cookies.remove(Cookie::build((name, "")).path("/"));
    }
    Json(json!({ "success": true }))
}
