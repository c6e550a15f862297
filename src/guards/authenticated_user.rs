use crate::configuration::AuthSettings;
use crate::domain::UserEmail;
use crate::guards::{into_outcome, OrStatus};
use anyhow::{anyhow, Context};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use secrecy::ExposeSecret;
use uuid::Uuid;

/// Cookie the web front end stores the session token in.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Verifies session tokens issued by the auth provider.
pub struct SessionKeys {
    decoding_key: DecodingKey,
    validation: Validation,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct SessionClaims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
}

impl SessionKeys {
    pub fn new(settings: &AuthSettings) -> SessionKeys {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[settings.jwt_audience.as_str()]);
        SessionKeys {
            decoding_key: DecodingKey::from_secret(settings.jwt_secret.expose_secret().as_bytes()),
            validation,
        }
    }

    pub fn decode(&self, token: &str) -> Result<SessionClaims, anyhow::Error> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .context("The session token is invalid or expired.")
    }
}

pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<UserEmail>,
    pub full_name: Option<String>,
    // prevents construction outside of this module
    _private: (),
}

impl AuthenticatedUser {
    /// Whether a `userId` sent in a request body names the caller.
    pub fn owns(&self, user_id: &str) -> bool {
        Uuid::parse_str(user_id.trim())
            .map(|id| id == self.user_id)
            .unwrap_or(false)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let keys = match request
            .rocket()
            .state::<SessionKeys>()
            .or_status(Status::InternalServerError, "Session keys are not managed.")
        {
            Ok(keys) => keys,
            Err(failure) => return Outcome::Error(failure),
        };
        into_outcome(from_request_result(request, keys).map_err(|e| (Status::Unauthorized, e)))
    }
}

fn from_request_result(
    request: &Request,
    keys: &SessionKeys,
) -> Result<AuthenticatedUser, anyhow::Error> {
    let token = match request.headers().get_one("Authorization") {
        Some(header_value) => header_value
            .strip_prefix("Bearer ")
            .context("The authorization scheme was not 'Bearer'.")?
            .trim()
            .to_string(),
        None => request
            .cookies()
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or_else(|| anyhow!("User has not been authenticated."))?,
    };

    let claims = keys.decode(&token)?;
    let email = match claims.email.filter(|email| !email.is_empty()) {
        Some(email) => Some(UserEmail::parse(email).map_err(anyhow::Error::msg)?),
        None => None,
    };

    Ok(AuthenticatedUser {
        user_id: claims.sub,
        email,
        full_name: claims
            .user_metadata
            .full_name
            .filter(|name| !name.trim().is_empty()),
        _private: (),
    })
}
