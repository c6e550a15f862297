use crate::billing::{find_subscription, one_month_after, upsert_subscription};
use crate::domain::PlanName;
use crate::guards::AuthenticatedUser;
use crate::models::SubscriptionRecord;
use crate::routes::{required, ApiError, OrUnexpected};
use crate::startup::{ApplicationBaseUrl, WallscapeDbConn};
use crate::stripe::{
    CreateCheckoutSessionParams, CreateCustomerParams, StripeClient, StripeCustomerId,
    StripeSubscriptionId, UpdateSubscriptionParams,
};
use chrono::Utc;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use std::sync::Arc;
use uuid::Uuid;

const CHECKOUT_FAILED: &str = "Error creating checkout session";

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutData {
    price_id: Option<String>,
    plan_name: Option<String>,
    user_id: Option<String>,
}

#[tracing::instrument(
    name = "Start a subscription checkout",
    skip(body, conn, stripe, base_url, user),
    fields(
        request_id = %Uuid::new_v4(),
        user_id = ?body.user_id,
        price_id = ?body.price_id,
        plan_name = ?body.plan_name
    )
)]
#[post("/api/checkout", data = "<body>")]
pub async fn create_checkout_session(
    body: Json<CheckoutData>,
    conn: WallscapeDbConn,
    stripe: &State<Arc<dyn StripeClient>>,
    base_url: &State<ApplicationBaseUrl>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let body = body.into_inner();
    let price_id = required(body.price_id, "Price ID is required")?;
    let user_id = required(body.user_id, "User ID is required")?;
    if !user.owns(&user_id) {
        return Err(ApiError::Unauthorized);
    }
    let email = user
        .email
        .as_ref()
        .ok_or_else(|| ApiError::ValidationError("User email not found".into()))?;
    let plan_name = body.plan_name.unwrap_or_default();
    let user_id = user.user_id;

    let existing = conn
        .run(move |c| find_subscription(c, user_id))
        .await
        .or_unexpected(CHECKOUT_FAILED)?;

    let customer_id = match existing
        .as_ref()
        .and_then(|subscription| subscription.stripe_customer_id.clone())
    {
        Some(customer_id) => {
            tracing::info!("Using existing Stripe customer {}", customer_id);
            StripeCustomerId::from(customer_id)
        }
        None => {
            stripe
                .create_customer(CreateCustomerParams {
                    email: Some(email.as_ref()),
                    user_id: &user_id.to_string(),
                })
                .await
                .or_unexpected(CHECKOUT_FAILED)?
                .id
        }
    };

    if let Some(subscription_id) = existing.and_then(|s| s.stripe_subscription_id) {
        let subscription_id = StripeSubscriptionId::from(subscription_id);
        let cancellation = stripe
            .update_subscription(
                &subscription_id,
                UpdateSubscriptionParams {
                    cancel_at_period_end: Some(true),
                },
            )
            .await;
        if let Err(error) = cancellation {
            tracing::warn!(
                error.cause_chain = ?error,
                "Failed to cancel the previous subscription {} at period end",
                subscription_id
            );
        }
    }

    let now = Utc::now();
    let pending = SubscriptionRecord {
        user_id,
        stripe_customer_id: Some(customer_id.to_string()),
        stripe_subscription_id: None,
        plan_id: None,
        plan_type: PlanName::pending().to_string(),
        status: "pending".into(),
        cancel_at_period_end: false,
        current_period_start: Some(now),
        current_period_end: Some(one_month_after(now)),
        updated_at: now,
    };
    if let Err(error) = conn.run(move |c| upsert_subscription(c, &pending)).await {
        tracing::error!(error.cause_chain = ?error, "Failed to record the pending subscription");
    }

    let user_id = user_id.to_string();
    let success_url = success_url(&base_url.0, &plan_name, &user_id)?;
    let cancel_url = format!("{}/cancel", base_url.0);
    let session = stripe
        .create_checkout_session(CreateCheckoutSessionParams {
            customer: &customer_id,
            price: &price_id,
            success_url: &success_url,
            cancel_url: &cancel_url,
            client_reference_id: &user_id,
            metadata: vec![
                ("userId", user_id.as_str()),
                ("planName", plan_name.as_str()),
                ("priceId", price_id.as_str()),
            ],
        })
        .await
        .or_unexpected(CHECKOUT_FAILED)?;

    tracing::info!("Created checkout session {}", session.id);
    Ok(Json(json!({ "url": session.url })))
}

/// Stripe substitutes `{CHECKOUT_SESSION_ID}` itself, so only the appended pairs are encoded.
fn success_url(base_url: &str, plan_name: &str, user_id: &str) -> Result<String, ApiError> {
    let url = reqwest::Url::parse_with_params(
        &format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", base_url),
        &[("plan", plan_name), ("user_id", user_id)],
    )
    .or_unexpected(CHECKOUT_FAILED)?;
    Ok(url.to_string())
}
