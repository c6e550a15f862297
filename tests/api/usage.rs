use crate::helpers::spawn_app;
use chrono::{Duration, Utc};
use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
use wallscape::models::Usage;
use wallscape::schema::usage;

#[tokio::test]
async fn tracking_counts_a_generation() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let body = serde_json::json!({ "userId": user.id, "action": "generate" });

    // act
    let response = app.post_json("/api/track-usage", &body, Some(&user)).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["currentUsage"], 1);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["isApproachingLimit"], false);

    let saved = usage::table
        .filter(usage::user_id.eq(user.id))
        .first::<Usage>(&mut *app.db())
        .expect("Failed to fetch the usage.");
    assert_eq!(saved.count, 1);
    assert_eq!(saved.total_generations, 1);
    assert!(saved.last_generated_at.is_some());
}

#[tokio::test]
async fn the_fourth_free_generation_approaches_the_limit() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let body = serde_json::json!({ "userId": user.id, "action": "generate" });
    for _ in 0..3 {
        app.post_json("/api/track-usage", &body, Some(&user)).await;
    }

    // act
    let response = app.post_json("/api/track-usage", &body, Some(&user)).await;

    // assert
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["currentUsage"], 4);
    assert_eq!(body["isApproachingLimit"], true);
}

#[tokio::test]
async fn a_lapsed_period_starts_counting_again() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    diesel::update(usage::table.filter(usage::user_id.eq(user.id)))
        .set((
            usage::count.eq(5),
            usage::total_generations.eq(12),
            usage::reset_date.eq(Utc::now() - Duration::days(1)),
        ))
        .execute(&mut *app.db())
        .unwrap();
    let body = serde_json::json!({ "userId": user.id, "action": "generate" });

    // act
    let response = app.post_json("/api/track-usage", &body, Some(&user)).await;

    // assert
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["currentUsage"], 1);

    let saved = usage::table
        .filter(usage::user_id.eq(user.id))
        .first::<Usage>(&mut *app.db())
        .unwrap();
    assert_eq!(saved.total_generations, 13);
    assert!(saved.reset_date.unwrap() > Utc::now());
}

#[tokio::test]
async fn tracking_requires_the_user_and_action() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let test_cases = vec![
        serde_json::json!({ "userId": user.id }),
        serde_json::json!({ "action": "generate" }),
    ];

    for body in test_cases {
        // act
        let response = app.post_json("/api/track-usage", &body, Some(&user)).await;

        // assert
        assert_eq!(response.status().as_u16(), 400);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "User ID and action are required");
    }
}

#[tokio::test]
async fn tracking_for_another_user_is_rejected() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let other = app.create_user().await;
    let body = serde_json::json!({ "userId": other.id, "action": "generate" });

    // act
    let response = app.post_json("/api/track-usage", &body, Some(&user)).await;

    // assert
    assert_eq!(response.status().as_u16(), 401);
}
