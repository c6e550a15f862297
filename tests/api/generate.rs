use crate::helpers::{spawn_app, TestApp, TestUser};
use diesel::{ExpressionMethods, RunQueryDsl};
use std::sync::atomic::Ordering;
use wallscape::domain::Dimensions;
use wallscape::schema::usage;

const REFERENCE_IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

fn use_up_quota(app: &TestApp, user: &TestUser) {
    diesel::update(usage::table)
        .filter(usage::user_id.eq(user.id))
        .set(usage::count.eq(5))
        .execute(&mut *app.db())
        .expect("Failed to update the usage.");
}

#[tokio::test]
async fn generating_returns_four_images() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let body = serde_json::json!({
        "prompt": "a lighthouse at dusk",
        "style": "Cinematic",
        "aspectRatio": "16:9",
    });

    // act
    let response = app.post_json("/api/generate-image", &body, Some(&user)).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["images"].as_array().unwrap().len(), 4);

    let requests = app.image_generator.text_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "a lighthouse at dusk");
    assert_eq!(requests[0].dimensions, Dimensions::new(1344, 768));
    assert_eq!(requests[0].style.as_deref(), Some("cinematic"));
}

#[tokio::test]
async fn generating_without_a_prompt_is_a_400() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;

    // act
    let response = app
        .post_json(
            "/api/generate-image",
            &serde_json::json!({ "prompt": "  " }),
            Some(&user),
        )
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Prompt is required");
}

#[tokio::test]
async fn generating_requires_a_session() {
    // arrange
    let app = spawn_app().await;

    // act
    let response = app
        .post_json(
            "/api/generate-image",
            &serde_json::json!({ "prompt": "forest" }),
            None,
        )
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 401);
    assert!(app.image_generator.text_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn generating_past_the_monthly_limit_is_forbidden() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    use_up_quota(&app, &user);

    // act
    let response = app
        .post_json(
            "/api/generate-image",
            &serde_json::json!({ "prompt": "forest" }),
            Some(&user),
        )
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "You have reached your monthly generation limit");
    assert!(app.image_generator.text_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn an_unconfigured_engine_is_a_503() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    app.image_generator.configured.store(false, Ordering::SeqCst);

    // act
    let response = app
        .post_json(
            "/api/generate-image",
            &serde_json::json!({ "prompt": "forest" }),
            Some(&user),
        )
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "API configuration error");
}

#[tokio::test]
async fn an_unconfigured_engine_fails_image_variations_with_a_500() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    app.image_generator.configured.store(false, Ordering::SeqCst);

    // act
    let response = app
        .post_json(
            "/api/generate-from-image",
            &serde_json::json!({ "imageBase64": REFERENCE_IMAGE }),
            Some(&user),
        )
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "API key configuration error");
    assert!(app.image_generator.text_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn generating_from_an_image_returns_the_variation() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let body = serde_json::json!({ "imageBase64": REFERENCE_IMAGE, "prompt": "more neon" });

    // act
    let response = app
        .post_json("/api/generate-from-image", &body, Some(&user))
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["images"].as_array().unwrap().len(), 1);
    assert!(body.get("warning").is_none());

    let requests = app.image_generator.image_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].style, "enhance");
    assert_eq!(requests[0].prompt.as_deref(), Some("more neon"));
    assert!(!requests[0].init_image.is_empty());
}

#[tokio::test]
async fn a_failed_variation_falls_back_to_text_to_image() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    app.image_generator
        .image_to_image_fails
        .store(true, Ordering::SeqCst);
    let body = serde_json::json!({ "imageBase64": REFERENCE_IMAGE, "prompt": "more neon" });

    // act
    let response = app
        .post_json("/api/generate-from-image", &body, Some(&user))
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["images"].as_array().unwrap().len(), 4);
    assert!(body["warning"].as_str().unwrap().contains("Falling back"));

    let requests = app.image_generator.text_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "Create an image similar to: more neon");
    assert_eq!(requests[0].style.as_deref(), Some("photographic"));
}

#[tokio::test]
async fn generating_from_an_image_requires_the_image() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;

    // act
    let response = app
        .post_json(
            "/api/generate-from-image",
            &serde_json::json!({ "prompt": "more neon" }),
            Some(&user),
        )
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Image is required");
}
