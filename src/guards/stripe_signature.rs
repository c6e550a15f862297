use crate::guards::{into_outcome, OrStatus};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Raw value of the `Stripe-Signature` header. Checked against the body by the webhook route.
pub struct StripeSignature(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StripeSignature {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        into_outcome(
            request
                .headers()
                .get_one(STRIPE_SIGNATURE_HEADER)
                .filter(|value| !value.trim().is_empty())
                .map(|value| StripeSignature(value.to_string()))
                .or_status(Status::BadRequest, "No Stripe signature found."),
        )
    }
}
