use crate::domain::UserEmail;
use crate::email::{contact_form_email, Email};
use crate::models::NewContactMessage;
use crate::routes::{ApiError, OrUnexpected};
use crate::startup::{TeamEmail, WallscapeDbConn};
use chrono::Utc;
use diesel::RunQueryDsl;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use std::sync::Arc;
use uuid::Uuid;

const ANONYMOUS: &str = "Anonymous";

#[derive(serde::Deserialize)]
pub struct ContactData {
    name: Option<String>,
    email: Option<String>,
    message: Option<String>,
}

#[derive(Debug)]
pub struct ContactMessage {
    name: Option<String>,
    email: UserEmail,
    message: String,
}

impl TryFrom<ContactData> for ContactMessage {
    type Error = String;

    fn try_from(data: ContactData) -> Result<Self, Self::Error> {
        let email = data.email.filter(|email| !email.trim().is_empty());
        let message = data.message.filter(|message| !message.trim().is_empty());
        let (email, message) = match (email, message) {
            (Some(email), Some(message)) => (email, message),
            _ => return Err("Email and message are required".into()),
        };
        Ok(ContactMessage {
            name: data.name.filter(|name| !name.trim().is_empty()),
            email: UserEmail::parse(email)?,
            message,
        })
    }
}

#[tracing::instrument(
    name = "Submit the contact form",
    skip(body, conn, email_client, team),
    fields(request_id = %Uuid::new_v4(), sender_email = ?body.email)
)]
#[post("/api/contact", data = "<body>")]
pub async fn submit_contact_form(
    body: Json<ContactData>,
    conn: WallscapeDbConn,
    email_client: &State<Arc<dyn Email>>,
    team: &State<TeamEmail>,
) -> Result<Json<Value>, ApiError> {
    let contact: ContactMessage = body
        .into_inner()
        .try_into()
        .map_err(ApiError::ValidationError)?;

    if let Err(error) = store_contact_message(&contact, &conn).await {
        tracing::error!(error.cause_chain = ?error, "Failed to store the contact message");
    }

    let rendered = contact_form_email(contact.name.as_deref(), &contact.email, &contact.message);
    email_client
        .send_email(&team.0, rendered.message(Some(&contact.email)))
        .await
        .or_unexpected("Failed to send email")?;
    Ok(Json(json!({ "success": true })))
}

#[tracing::instrument(name = "Saving a contact message in the database", skip(contact, conn))]
async fn store_contact_message(
    contact: &ContactMessage,
    conn: &WallscapeDbConn,
) -> diesel::QueryResult<usize> {
    use crate::schema::contact_messages;
    let name = contact
        .name
        .clone()
        .unwrap_or_else(|| ANONYMOUS.to_string());
    let email = contact.email.as_ref().to_string();
    let message = contact.message.clone();
    conn.run(move |c| {
        diesel::insert_into(contact_messages::table)
            .values(NewContactMessage {
                id: &Uuid::new_v4(),
                name: &name,
                email: &email,
                message: &message,
                created_at: &Utc::now(),
            })
            .execute(c)
    })
    .await
}
