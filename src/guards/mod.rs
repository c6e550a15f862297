mod authenticated_user;
mod stripe_signature;

use anyhow::anyhow;
pub use authenticated_user::*;
use rocket::http::Status;
use rocket::request::Outcome;
pub use stripe_signature::*;

trait OrStatus<T> {
    fn or_status(self, status: Status, context: &'static str)
        -> Result<T, (Status, anyhow::Error)>;
}

impl<T> OrStatus<T> for Option<T> {
    fn or_status(
        self,
        status: Status,
        context: &'static str,
    ) -> Result<T, (Status, anyhow::Error)> {
        self.ok_or_else(|| (status, anyhow!(context)))
    }
}

fn into_outcome<T>(result: Result<T, (Status, anyhow::Error)>) -> Outcome<T, anyhow::Error> {
    match result {
        Ok(value) => Outcome::Success(value),
        Err(failure) => Outcome::Error(failure),
    }
}
