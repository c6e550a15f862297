mod auth;
mod checkout;
mod contact;
mod generate;
mod health_check;
mod newsletter;
mod profile;
mod subscriptions;
mod usage;
mod wallpapers;
mod webhook;

pub use auth::*;
pub use checkout::*;
pub use contact::*;
pub use generate::*;
pub use health_check::*;
pub use newsletter::*;
pub use profile::*;
pub use subscriptions::*;
pub use usage::*;
pub use wallpapers::*;
pub use webhook::*;

use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::{Request, Response};
use std::io::Cursor;

/// JSON shape of every error the API returns.
#[derive(serde::Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> ErrorBody {
        ErrorBody {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> ErrorBody {
        self.details = Some(details.into());
        self
    }
}

pub fn json_response(
    status: Status,
    body: &impl serde::Serialize,
) -> rocket::response::Result<'static> {
    let body = serde_json::to_string(body).map_err(|_| Status::InternalServerError)?;
    Response::build()
        .status(status)
        .header(ContentType::JSON)
        .sized_body(body.len(), Cursor::new(body))
        .ok()
}

#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    /// A collaborator this route needs is not configured.
    #[error("{0}")]
    ServiceUnavailable(&'static str, &'static str),
    #[error("{0}")]
    UnexpectedError(&'static str, #[source] anyhow::Error),
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _request: &'r Request<'_>) -> rocket::response::Result<'static> {
        let (status, body) = match &self {
            ApiError::ValidationError(message) => (Status::BadRequest, ErrorBody::new(message)),
            ApiError::Unauthorized => (Status::Unauthorized, ErrorBody::new("Unauthorized")),
            ApiError::Forbidden(message) => (Status::Forbidden, ErrorBody::new(*message)),
            ApiError::NotFound(message) => (Status::NotFound, ErrorBody::new(*message)),
            ApiError::ServiceUnavailable(message, details) => (
                Status::ServiceUnavailable,
                ErrorBody::new(*message).with_details(*details),
            ),
            ApiError::UnexpectedError(message, source) => {
                tracing::error!("ApiError: {:?}", self);
                (
                    Status::InternalServerError,
                    ErrorBody::new(*message).with_details(source.to_string()),
                )
            }
        };
        json_response(status, &body)
    }
}

/// Attach the public message of a 500 to any failure.
pub trait OrUnexpected<T> {
    fn or_unexpected(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T, E> OrUnexpected<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn or_unexpected(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::UnexpectedError(message, e.into()))
    }
}

pub fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::ValidationError(message.to_string()))
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
