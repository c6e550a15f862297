use crate::helpers::{spawn_app, TestUser};
use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
use uuid::Uuid;
use wallscape::models::{Profile, Subscription, Usage};
use wallscape::schema::{profiles, subscriptions, usage};

#[tokio::test]
async fn create_profile_provisions_a_free_account() {
    // arrange
    let app = spawn_app().await;
    let user_id = Uuid::new_v4();
    let body = serde_json::json!({
        "userId": user_id,
        "email": "ursula_le_guin@gmail.com",
        "fullName": "Ursula Le Guin",
    });

    // act
    let response = app.post_json("/api/auth/create-profile", &body, None).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let mut conn = app.db();
    let profile = profiles::table
        .find(user_id)
        .first::<Profile>(&mut *conn)
        .expect("Failed to fetch the profile.");
    assert_eq!(profile.display_name.as_deref(), Some("ursula_le_guin"));
    assert_eq!(profile.full_name.as_deref(), Some("Ursula Le Guin"));

    let subscription = subscriptions::table
        .filter(subscriptions::user_id.eq(user_id))
        .first::<Subscription>(&mut *conn)
        .expect("Failed to fetch the subscription.");
    assert_eq!(subscription.plan_type, "free");
    assert_eq!(subscription.plan_id.as_deref(), Some("free_plan"));
    assert_eq!(subscription.status, "active");

    let usage = usage::table
        .filter(usage::user_id.eq(user_id))
        .first::<Usage>(&mut *conn)
        .expect("Failed to fetch the usage.");
    assert_eq!(usage.monthly_generations, 5);
    assert_eq!(usage.count, 0);
}

#[tokio::test]
async fn create_profile_is_idempotent() {
    // arrange
    let app = spawn_app().await;
    let body = serde_json::json!({ "userId": Uuid::new_v4(), "displayName": "Ged" });
    app.post_json("/api/auth/create-profile", &body, None).await;

    // act
    let response = app.post_json("/api/auth/create-profile", &body, None).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Profile already exists");
    let count: i64 = profiles::table.count().get_result(&mut *app.db()).unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn create_profile_returns_a_400_for_invalid_data() {
    // arrange
    let app = spawn_app().await;
    let test_cases = vec![
        (serde_json::json!({}), "missing the user id"),
        (serde_json::json!({ "userId": "42" }), "a malformed user id"),
        (
            serde_json::json!({ "userId": Uuid::new_v4(), "email": "not-an-email" }),
            "an invalid email",
        ),
        (
            serde_json::json!({ "userId": Uuid::new_v4(), "displayName": "{evil}" }),
            "an invalid display name",
        ),
    ];

    for (body, description) in test_cases {
        // act
        let response = app.post_json("/api/auth/create-profile", &body, None).await;

        // assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not return a 400 Bad Request when the payload had {}.",
            description
        );
    }
}

#[tokio::test]
async fn session_profile_uses_the_full_name_from_the_token() {
    // arrange
    let app = spawn_app().await;
    let user = TestUser {
        full_name: Some("Tenar of Atuan".into()),
        ..TestUser::generate()
    };

    // act
    let response = app
        .post_json("/api/auth/profile", &serde_json::json!({}), Some(&user))
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let profile = profiles::table
        .find(user.id)
        .first::<Profile>(&mut *app.db())
        .expect("Failed to fetch the profile.");
    assert_eq!(profile.display_name.as_deref(), Some("Tenar of Atuan"));
    assert_eq!(profile.email.as_deref(), Some(user.email.as_str()));
}

#[tokio::test]
async fn session_profile_requires_a_session() {
    // arrange
    let app = spawn_app().await;

    // act
    let response = app
        .post_json("/api/auth/profile", &serde_json::json!({}), None)
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 401);
    assert!(response.headers().contains_key("www-authenticate"));
}

#[tokio::test]
async fn a_user_can_read_and_edit_their_profile() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;

    // act
    let response = app
        .patch_json(
            "/api/profile",
            &serde_json::json!({ "displayName": "Sparrowhawk", "isProfilePublic": true }),
            Some(&user),
        )
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let response = app.get("/api/profile", Some(&user)).await;
    assert_eq!(response.status().as_u16(), 200);
    let profile: serde_json::Value = response.json().await.unwrap();
    assert_eq!(profile["display_name"], "Sparrowhawk");
    assert_eq!(profile["is_profile_public"], true);
}

#[tokio::test]
async fn profile_edits_reject_invalid_display_names() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;

    // act
    let response = app
        .patch_json(
            "/api/profile",
            &serde_json::json!({ "displayName": "<b>bold</b>" }),
            Some(&user),
        )
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn reading_a_missing_profile_returns_a_404() {
    // arrange
    let app = spawn_app().await;
    let user = TestUser::generate();

    // act
    let response = app.get("/api/profile", Some(&user)).await;

    // assert
    assert_eq!(response.status().as_u16(), 404);
}
