use crate::domain::UserEmail;
use crate::email::{newsletter_signup_email, Email};
use crate::models::NewNewsletterSignup;
use crate::startup::{TeamEmail, WallscapeDbConn};
use chrono::Utc;
use diesel::RunQueryDsl;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use std::sync::Arc;
use uuid::Uuid;

#[derive(serde::Deserialize)]
pub struct NewsletterData {
    email: Option<String>,
}

/// Response for each combination of (stored, team notified).
fn outcome(saved: bool, notified: bool) -> (Status, Json<Value>) {
    let (status, success, message) = match (saved, notified) {
        (true, true) => (
            Status::Ok,
            true,
            "Thank you for subscribing to our newsletter! A confirmation email has been sent.",
        ),
        (true, false) => (
            Status::Ok,
            true,
            "Thank you for subscribing to our newsletter! (Confirmation email could not be sent)",
        ),
        (false, true) => (
            Status::Ok,
            true,
            "Your subscription request was received, but we couldn't save it to our database. \
            Our team has been notified.",
        ),
        (false, false) => (
            Status::InternalServerError,
            false,
            "We encountered an issue processing your subscription. Please try again later.",
        ),
    };
    (status, Json(json!({ "success": success, "message": message })))
}

#[tracing::instrument(
    name = "Sign up for the newsletter",
    skip(body, conn, email_client, team),
    fields(request_id = %Uuid::new_v4(), subscriber_email = ?body.email)
)]
#[post("/api/newsletter", data = "<body>")]
pub async fn newsletter_signup(
    body: Json<NewsletterData>,
    conn: WallscapeDbConn,
    email_client: &State<Arc<dyn Email>>,
    team: &State<TeamEmail>,
) -> (Status, Json<Value>) {
    let email = match body.into_inner().email.map(UserEmail::parse) {
        Some(Ok(email)) => email,
        _ => {
            return (
                Status::BadRequest,
                Json(json!({ "success": false, "message": "Invalid email format" })),
            )
        }
    };

    let saved = match insert_signup(&email, &conn).await {
        Ok(0) => {
            tracing::info!("Email already exists in the newsletter list");
            true
        }
        Ok(_) => true,
        Err(error) => {
            tracing::error!(error.cause_chain = ?error, "Failed to store the newsletter signup");
            false
        }
    };

    let rendered = newsletter_signup_email(&email, saved, Utc::now());
    let notified = match email_client
        .send_email(&team.0, rendered.message(None))
        .await
    {
        Ok(()) => true,
        Err(error) => {
            tracing::error!(error.cause_chain = ?error, "Failed to notify the team of a signup");
            false
        }
    };

    outcome(saved, notified)
}

#[tracing::instrument(name = "Saving a newsletter signup in the database", skip(email, conn))]
async fn insert_signup(email: &UserEmail, conn: &WallscapeDbConn) -> diesel::QueryResult<usize> {
    use crate::schema::newsletter_signups;
    let email = email.as_ref().to_lowercase();
    conn.run(move |c| {
        diesel::insert_into(newsletter_signups::table)
            .values(NewNewsletterSignup {
                id: &Uuid::new_v4(),
                email: &email,
                created_at: &Utc::now(),
            })
            .on_conflict(newsletter_signups::email)
            .do_nothing()
            .execute(c)
    })
    .await
}
