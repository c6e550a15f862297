use crate::billing::{
    apply_usage_limit, clear_cancel_at_period_end, delete_subscription, find_subscription,
    find_usage, one_month_after, record_plan_change, upsert_subscription,
};
use crate::domain::{PlanName, PlanType};
use crate::guards::AuthenticatedUser;
use crate::models::SubscriptionRecord;
use crate::routes::{required, ApiError, OrUnexpected};
use crate::startup::{ApplicationBaseUrl, WallscapeDbConn};
use crate::stripe::{
    CancelSubscriptionParams, StripeClient, StripeCustomerId, StripeSubscriptionId,
    UpdateSubscriptionParams,
};
use chrono::Utc;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use std::sync::Arc;
use uuid::Uuid;

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionData {
    user_id: Option<String>,
    customer_id: Option<String>,
    subscription_id: Option<String>,
    plan_type: Option<String>,
    price_id: Option<String>,
}

#[tracing::instrument(
    name = "Record a confirmed subscription",
    skip(body, conn, user),
    fields(request_id = %Uuid::new_v4(), user_id = ?body.user_id, plan_type = ?body.plan_type)
)]
#[post("/api/create-subscription", data = "<body>")]
pub async fn create_subscription(
    body: Json<CreateSubscriptionData>,
    conn: WallscapeDbConn,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let body = body.into_inner();
    let user_id = required(body.user_id, "User ID is required")?;
    if !user.owns(&user_id) {
        return Err(ApiError::Unauthorized);
    }
    let plan = body
        .plan_type
        .as_deref()
        .and_then(PlanName::from_label)
        .unwrap_or_else(PlanName::free);

    let now = Utc::now();
    let record = SubscriptionRecord {
        user_id: user.user_id,
        stripe_customer_id: body.customer_id.filter(|id| !id.is_empty()),
        stripe_subscription_id: body.subscription_id.filter(|id| !id.is_empty()),
        plan_id: body.price_id.filter(|id| !id.is_empty()),
        plan_type: plan.to_string(),
        status: "active".into(),
        cancel_at_period_end: false,
        current_period_start: Some(now),
        current_period_end: Some(one_month_after(now)),
        updated_at: now,
    };
    conn.run(move |c| {
        upsert_subscription(c, &record)?;
        if let Err(error) = apply_usage_limit(c, record.user_id, plan.plan_type()) {
            tracing::error!(error.cause_chain = ?error, "Failed to update the usage limit");
        }
        Ok::<_, diesel::result::Error>(())
    })
    .await
    .or_unexpected("Error creating subscription")?;

    Ok(Json(json!({ "success": true })))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DowngradeData {
    user_id: Option<String>,
    subscription_id: Option<String>,
}

#[tracing::instrument(
    name = "Downgrade to the free plan",
    skip(body, conn, stripe, user),
    fields(request_id = %Uuid::new_v4(), user_id = ?body.user_id)
)]
#[post("/api/downgrade-to-free", data = "<body>")]
pub async fn downgrade_to_free(
    body: Json<DowngradeData>,
    conn: WallscapeDbConn,
    stripe: &State<Arc<dyn StripeClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let body = body.into_inner();
    let user_id = required(body.user_id, "User ID is required")?;
    if !user.owns(&user_id) {
        return Err(ApiError::Unauthorized);
    }
    let user_id = user.user_id;

    let existing = conn
        .run(move |c| find_subscription(c, user_id))
        .await
        .or_unexpected("Error fetching subscription")?;

    if let Some(subscription_id) = body.subscription_id.filter(|id| !id.is_empty()) {
        let owned = existing
            .as_ref()
            .map_or(false, |s| s.references_subscription(&subscription_id));
        if !owned {
            tracing::warn!("Refusing to cancel subscription {}", subscription_id);
            return Err(ApiError::Unauthorized);
        }
        let subscription_id = StripeSubscriptionId::from(subscription_id);
        let cancellation = stripe
            .cancel_subscription(
                &subscription_id,
                CancelSubscriptionParams {
                    invoice_now: false,
                    prorate: true,
                },
            )
            .await;
        if let Err(error) = cancellation {
            tracing::error!(
                error.cause_chain = ?error,
                "Failed to cancel Stripe subscription {}",
                subscription_id
            );
        }
    }

    if let Some(customer_id) = existing
        .as_ref()
        .and_then(|subscription| subscription.stripe_customer_id.clone())
    {
        let customer_id = StripeCustomerId::from(customer_id);
        if let Err(error) = stripe.delete_customer(&customer_id).await {
            tracing::error!(
                error.cause_chain = ?error,
                "Failed to delete Stripe customer {}",
                customer_id
            );
        }
    }

    conn.run(move |c| delete_subscription(c, user_id))
        .await
        .or_unexpected("Failed to delete subscription record")?;

    let from_plan = existing
        .map(|subscription| subscription.plan_type)
        .unwrap_or_else(|| "paid".to_string());
    conn.run(move |c| {
        if let Err(error) = apply_usage_limit(c, user_id, PlanType::Free) {
            tracing::error!(error.cause_chain = ?error, "Failed to reset the usage limit");
        }
        let to_plan = PlanType::Free.as_str();
        if let Err(error) = record_plan_change(c, user_id, "downgrade", &from_plan, to_plan) {
            tracing::error!(error.cause_chain = ?error, "Failed to record subscription history");
        }
    })
    .await;

    tracing::info!("Downgraded user {} to the free plan", user_id);
    Ok(Json(json!({ "success": true })))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactivateData {
    subscription_id: Option<String>,
}

#[tracing::instrument(
    name = "Reactivate a cancelling subscription",
    skip(body, conn, stripe, user),
    fields(request_id = %Uuid::new_v4(), subscription_id = ?body.subscription_id)
)]
#[post("/api/reactivate-subscription", data = "<body>")]
pub async fn reactivate_subscription(
    body: Json<ReactivateData>,
    conn: WallscapeDbConn,
    stripe: &State<Arc<dyn StripeClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let subscription_id = required(
        body.into_inner().subscription_id,
        "Subscription ID is required",
    )?;
    let user_id = user.user_id;
    let existing = conn
        .run(move |c| find_subscription(c, user_id))
        .await
        .or_unexpected("Error reactivating subscription")?;
    if !existing.map_or(false, |s| s.references_subscription(&subscription_id)) {
        return Err(ApiError::Unauthorized);
    }

    let subscription_id = StripeSubscriptionId::from(subscription_id);
    stripe
        .update_subscription(
            &subscription_id,
            UpdateSubscriptionParams {
                cancel_at_period_end: Some(false),
            },
        )
        .await
        .or_unexpected("Error reactivating subscription")?;

    if let Err(error) = conn.run(move |c| clear_cancel_at_period_end(c, user_id)).await {
        tracing::error!(error.cause_chain = ?error, "Failed to update the subscription");
    }
    Ok(Json(json!({ "success": true })))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshData {
    user_id: Option<String>,
}

#[tracing::instrument(
    name = "Refresh subscription details",
    skip(body, conn, user),
    fields(request_id = %Uuid::new_v4(), user_id = ?body.user_id)
)]
#[post("/api/refresh-subscription", data = "<body>")]
pub async fn refresh_subscription(
    body: Json<RefreshData>,
    conn: WallscapeDbConn,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let user_id = required(body.into_inner().user_id, "User ID is required")?;
    if !user.owns(&user_id) {
        return Err(ApiError::Unauthorized);
    }
    let user_id = user.user_id;

    let subscription = conn
        .run(move |c| find_subscription(c, user_id))
        .await
        .or_unexpected("Error fetching subscription")?;
    let usage = conn
        .run(move |c| find_usage(c, user_id))
        .await
        .or_unexpected("Error fetching usage")?;

    Ok(Json(json!({
        "success": true,
        "subscription": subscription,
        "usage": usage,
    })))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSessionData {
    customer_id: Option<String>,
}

#[tracing::instrument(
    name = "Open the billing portal",
    skip(body, conn, stripe, base_url, user),
    fields(request_id = %Uuid::new_v4())
)]
#[post("/api/create-portal-session", data = "<body>")]
pub async fn create_portal_session(
    body: Json<PortalSessionData>,
    conn: WallscapeDbConn,
    stripe: &State<Arc<dyn StripeClient>>,
    base_url: &State<ApplicationBaseUrl>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let customer_id = required(body.into_inner().customer_id, "Customer ID is required")?;
    let user_id = user.user_id;
    let existing = conn
        .run(move |c| find_subscription(c, user_id))
        .await
        .or_unexpected("Error creating portal session")?;
    if !existing.map_or(false, |s| s.references_customer(&customer_id)) {
        return Err(ApiError::Unauthorized);
    }

    let customer_id = StripeCustomerId::from(customer_id);
    let return_url = format!("{}/dashboard/account", base_url.0);
    let session = stripe
        .create_billing_portal_session(&customer_id, &return_url)
        .await
        .or_unexpected("Error creating portal session")?;
    Ok(Json(json!({ "url": session.url })))
}
