use crate::helpers::{spawn_app, TestApp, TestUser};
use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
use wallscape::models::{Subscription, Usage};
use wallscape::schema::{subscriptions, usage};
use wallscape::stripe::StripeSubscription;

fn stored_subscription(app: &TestApp, user: &TestUser) -> Subscription {
    subscriptions::table
        .filter(subscriptions::user_id.eq(user.id))
        .first::<Subscription>(&mut *app.db())
        .expect("Failed to fetch the subscription.")
}

fn stored_usage(app: &TestApp, user: &TestUser) -> Usage {
    usage::table
        .filter(usage::user_id.eq(user.id))
        .first::<Usage>(&mut *app.db())
        .expect("Failed to fetch the usage.")
}

const FIRST_PERIOD_END: i64 = 1_702_592_000;
const SECOND_PERIOD_END: i64 = 1_705_270_400;

fn starter_subscription_json(status: &str, period_end: i64) -> serde_json::Value {
    serde_json::json!({
        "id": "sub_starter",
        "customer": "cus_1",
        "status": status,
        "current_period_start": period_end - 2_592_000,
        "current_period_end": period_end,
        "items": { "data": [{ "price": { "id": "price_starter", "nickname": "Starter Plan" } }] }
    })
}

fn starter_subscription() -> StripeSubscription {
    serde_json::from_value(starter_subscription_json("active", FIRST_PERIOD_END)).unwrap()
}

fn invoice_event(kind: &str, user: &TestUser) -> serde_json::Value {
    serde_json::json!({
        "id": format!("evt_{}", kind),
        "type": kind,
        "data": { "object": {
            "id": "in_1",
            "customer": "cus_1",
            "subscription": "sub_starter",
            "metadata": { "userId": user.id }
        }}
    })
}

fn checkout_completed(user: &TestUser) -> serde_json::Value {
    serde_json::json!({
        "id": "evt_checkout",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_1",
            "customer": "cus_1",
            "subscription": "sub_starter",
            "metadata": { "userId": user.id, "planName": "starter", "priceId": "price_starter" }
        }}
    })
}

#[tokio::test]
async fn a_webhook_without_a_signature_is_rejected() {
    // arrange
    let app = spawn_app().await;
    let event = serde_json::json!({ "id": "evt_1", "type": "ping", "data": { "object": {} } });

    // act
    let response = app
        .api_client
        .post(format!("{}/api/webhook", app.address))
        .body(event.to_string())
        .send()
        .await
        .expect("Failed to execute request.");

    // assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn a_webhook_with_a_forged_signature_is_rejected() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let timestamp = chrono::Utc::now().timestamp();

    // act
    let response = app
        .api_client
        .post(format!("{}/api/webhook", app.address))
        .header("Stripe-Signature", format!("t={},v1={}", timestamp, "00".repeat(32)))
        .body(checkout_completed(&user).to_string())
        .send()
        .await
        .expect("Failed to execute request.");

    // assert
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Webhook Error"));
    assert_eq!(stored_subscription(&app, &user).plan_type, "free");
}

#[tokio::test]
async fn completed_checkout_activates_the_paid_plan() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    app.stripe.add_subscription(starter_subscription());

    // act
    let response = app.post_webhook(&checkout_completed(&user)).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "received": true }));

    let saved = stored_subscription(&app, &user);
    assert_eq!(saved.plan_type, "starter");
    assert_eq!(saved.status, "active");
    assert_eq!(saved.plan_id.as_deref(), Some("price_starter"));
    assert_eq!(saved.stripe_customer_id.as_deref(), Some("cus_1"));
    assert_eq!(saved.stripe_subscription_id.as_deref(), Some("sub_starter"));
    assert_eq!(
        saved.current_period_end.map(|end| end.timestamp()),
        Some(FIRST_PERIOD_END)
    );
    assert_eq!(stored_usage(&app, &user).monthly_generations, 100);
}

#[tokio::test]
async fn a_paid_invoice_extends_the_billing_period() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    app.stripe.add_subscription(starter_subscription());
    app.post_webhook(&checkout_completed(&user)).await;
    let renewed = starter_subscription_json("active", SECOND_PERIOD_END);
    app.stripe
        .add_subscription(serde_json::from_value(renewed).unwrap());

    // act
    let response = app
        .post_webhook(&invoice_event("invoice.payment_succeeded", &user))
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let saved = stored_subscription(&app, &user);
    assert_eq!(saved.status, "active");
    assert_eq!(
        saved.current_period_end.map(|end| end.timestamp()),
        Some(SECOND_PERIOD_END)
    );
    assert_eq!(saved.plan_type, "starter");
}

#[tokio::test]
async fn a_failed_invoice_only_updates_the_status() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    app.stripe.add_subscription(starter_subscription());
    app.post_webhook(&checkout_completed(&user)).await;
    let past_due = starter_subscription_json("past_due", SECOND_PERIOD_END);
    app.stripe
        .add_subscription(serde_json::from_value(past_due).unwrap());

    // act
    let response = app
        .post_webhook(&invoice_event("invoice.payment_failed", &user))
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let saved = stored_subscription(&app, &user);
    assert_eq!(saved.status, "past_due");
    assert_eq!(
        saved.current_period_end.map(|end| end.timestamp()),
        Some(FIRST_PERIOD_END)
    );
    assert_eq!(stored_usage(&app, &user).monthly_generations, 100);
}

#[tokio::test]
async fn an_updated_subscription_mirrors_the_pending_cancellation() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let mut subscription = starter_subscription_json("active", SECOND_PERIOD_END);
    subscription["cancel_at_period_end"] = serde_json::json!(true);
    subscription["metadata"] = serde_json::json!({ "userId": user.id });
    let event = serde_json::json!({
        "id": "evt_updated",
        "type": "customer.subscription.updated",
        "data": { "object": subscription }
    });

    // act
    let response = app.post_webhook(&event).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let saved = stored_subscription(&app, &user);
    assert!(saved.cancel_at_period_end);
    assert_eq!(saved.status, "active");
    assert_eq!(saved.plan_type, "starter");
    assert_eq!(saved.stripe_subscription_id.as_deref(), Some("sub_starter"));
    assert_eq!(
        saved.current_period_end.map(|end| end.timestamp()),
        Some(SECOND_PERIOD_END)
    );
    assert_eq!(stored_usage(&app, &user).monthly_generations, 100);
}

#[tokio::test]
async fn a_deleted_subscription_reverts_to_the_free_plan() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    app.stripe.add_subscription(starter_subscription());
    app.post_webhook(&checkout_completed(&user)).await;
    let event = serde_json::json!({
        "id": "evt_deleted",
        "type": "customer.subscription.deleted",
        "data": { "object": {
            "id": "sub_starter",
            "customer": "cus_1",
            "status": "canceled",
            "metadata": { "userId": user.id }
        }}
    });

    // act
    let response = app.post_webhook(&event).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let saved = stored_subscription(&app, &user);
    assert_eq!(saved.plan_type, "free");
    assert_eq!(saved.status, "canceled");
    assert_eq!(saved.plan_id, None);
    assert_eq!(stored_usage(&app, &user).monthly_generations, 5);
}

#[tokio::test]
async fn unhandled_event_types_are_acknowledged() {
    // arrange
    let app = spawn_app().await;
    let event = serde_json::json!({
        "id": "evt_other",
        "type": "charge.refunded",
        "data": { "object": { "id": "ch_1" } }
    });

    // act
    let response = app.post_webhook(&event).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "received": true }));
}

#[tokio::test]
async fn a_malformed_event_object_is_acknowledged_with_a_warning() {
    // arrange
    let app = spawn_app().await;
    let event = serde_json::json!({
        "id": "evt_broken",
        "type": "customer.subscription.updated",
        "data": { "object": { "status": 42 } }
    });

    // act
    let response = app.post_webhook(&event).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["received"], true);
    assert!(body["warning"]
        .as_str()
        .unwrap()
        .starts_with("Error processing webhook"));
}

#[tokio::test]
async fn an_unparsable_payload_is_a_400() {
    // arrange
    let app = spawn_app().await;
    let payload = "not json";
    let timestamp = chrono::Utc::now().timestamp();
    let signature =
        wallscape::stripe::compute_signature(payload, timestamp, crate::helpers::WEBHOOK_SECRET);

    // act
    let response = app
        .api_client
        .post(format!("{}/api/webhook", app.address))
        .header("Stripe-Signature", format!("t={},v1={}", timestamp, signature))
        .body(payload)
        .send()
        .await
        .expect("Failed to execute request.");

    // assert
    assert_eq!(response.status().as_u16(), 400);
}
