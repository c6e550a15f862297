use crate::billing::{apply_reconciliation, reconcile};
use crate::guards::StripeSignature;
use crate::routes::ApiError;
use crate::startup::{StripeWebhookSecret, WallscapeDbConn};
use crate::stripe::{verify_signature, StripeClient, WebhookEvent};
use anyhow::Context;
use chrono::Utc;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use secrecy::ExposeSecret;
use std::sync::Arc;
use uuid::Uuid;

#[tracing::instrument(
    name = "Handle a Stripe webhook",
    skip(payload, signature, conn, stripe, secret),
    fields(
        request_id = %Uuid::new_v4(),
        event_id = tracing::field::Empty,
        event_type = tracing::field::Empty
    )
)]
#[post("/api/webhook", data = "<payload>")]
pub async fn stripe_webhook(
    payload: String,
    signature: StripeSignature,
    conn: WallscapeDbConn,
    stripe: &State<Arc<dyn StripeClient>>,
    secret: &State<StripeWebhookSecret>,
) -> Result<Json<Value>, ApiError> {
    match &secret.0 {
        Some(secret) => verify_signature(
            &payload,
            &signature.0,
            secret.expose_secret(),
            Utc::now().timestamp(),
        )
        .map_err(|e| ApiError::ValidationError(format!("Webhook Error: {}", e)))?,
        None => tracing::warn!("No webhook secret is configured, skipping signature verification"),
    }

    let event = WebhookEvent::parse(&payload)
        .map_err(|e| ApiError::ValidationError(format!("Webhook Error: {}", e)))?;
    let span = tracing::Span::current();
    span.record("event_id", &tracing::field::display(&event.id));
    span.record("event_type", &tracing::field::display(&event.kind));

    match handle_event(&conn, stripe.inner().as_ref(), &event).await {
        Ok(()) => Ok(Json(json!({ "received": true }))),
        Err(error) => {
            tracing::error!(error.cause_chain = ?error, "Failed to handle the webhook event");
            Ok(Json(json!({
                "received": true,
                "warning": format!("Error processing webhook: {}", error),
            })))
        }
    }
}

async fn handle_event(
    conn: &WallscapeDbConn,
    stripe: &dyn StripeClient,
    event: &WebhookEvent,
) -> Result<(), anyhow::Error> {
    let reconciliation = reconcile(stripe, event, Utc::now()).await?;
    conn.run(move |c| apply_reconciliation(c, &reconciliation))
        .await
        .context("Failed to store the reconciled subscription.")
}
