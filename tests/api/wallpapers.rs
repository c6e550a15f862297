use crate::helpers::{spawn_app, TestApp, TestUser};

async fn save(app: &TestApp, user: &TestUser, prompt: &str) -> serde_json::Value {
    let body = serde_json::json!({
        "prompt": prompt,
        "style": "anime",
        "aspectRatio": "16:9",
        "imageUrl": "https://cdn.wallscape.io/w/1.png",
    });
    let response = app.post_json("/api/wallpapers", &body, Some(user)).await;
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn saving_a_wallpaper_returns_the_stored_row() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;

    // act
    let wallpaper = save(&app, &user, "misty fjord").await;

    // assert
    assert_eq!(wallpaper["prompt"], "misty fjord");
    assert_eq!(wallpaper["aspect_ratio"], "16:9");
    assert_eq!(wallpaper["is_public"], false);
    assert_eq!(wallpaper["user_id"], user.id.to_string());
}

#[tokio::test]
async fn aspect_ratio_defaults_to_square() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let body = serde_json::json!({
        "prompt": "dunes",
        "imageUrl": "https://cdn.wallscape.io/w/2.png",
    });

    // act
    let response = app.post_json("/api/wallpapers", &body, Some(&user)).await;

    // assert
    assert_eq!(response.status().as_u16(), 201);
    let wallpaper: serde_json::Value = response.json().await.unwrap();
    assert_eq!(wallpaper["aspect_ratio"], "1:1");
}

#[tokio::test]
async fn saving_requires_a_prompt_and_an_image() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let test_cases = vec![
        (
            serde_json::json!({ "imageUrl": "https://cdn.wallscape.io/w/3.png" }),
            "Prompt is required",
        ),
        (serde_json::json!({ "prompt": "dunes" }), "Image URL is required"),
    ];

    for (body, message) in test_cases {
        // act
        let response = app.post_json("/api/wallpapers", &body, Some(&user)).await;

        // assert
        assert_eq!(response.status().as_u16(), 400);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], message);
    }
}

#[tokio::test]
async fn listing_shows_only_the_callers_wallpapers_newest_first() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let other = app.create_user().await;
    save(&app, &user, "first").await;
    save(&app, &user, "second").await;
    save(&app, &other, "not mine").await;

    // act
    let response = app.get("/api/wallpapers", Some(&user)).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let wallpapers: Vec<serde_json::Value> = response.json().await.unwrap();
    let prompts: Vec<&str> = wallpapers
        .iter()
        .map(|w| w["prompt"].as_str().unwrap())
        .collect();
    assert_eq!(prompts, vec!["second", "first"]);
}

#[tokio::test]
async fn a_wallpaper_can_be_made_public() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let wallpaper = save(&app, &user, "aurora").await;
    let path = format!("/api/wallpapers/{}", wallpaper["id"].as_str().unwrap());

    // act
    let response = app
        .patch_json(&path, &serde_json::json!({ "isPublic": true }), Some(&user))
        .await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let updated: serde_json::Value = response.json().await.unwrap();
    assert_eq!(updated["is_public"], true);
}

#[tokio::test]
async fn other_users_wallpapers_are_not_found() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let other = app.create_user().await;
    let wallpaper = save(&app, &other, "not mine").await;
    let path = format!("/api/wallpapers/{}", wallpaper["id"].as_str().unwrap());

    // act
    let patched = app
        .patch_json(&path, &serde_json::json!({ "isPublic": true }), Some(&user))
        .await;
    let deleted = app.delete(&path, Some(&user)).await;

    // assert
    assert_eq!(patched.status().as_u16(), 404);
    assert_eq!(deleted.status().as_u16(), 404);
    let response = app.get("/api/wallpapers", Some(&other)).await;
    let wallpapers: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(wallpapers.len(), 1);
}

#[tokio::test]
async fn a_malformed_wallpaper_id_is_not_found() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;

    // act
    let response = app.delete("/api/wallpapers/42", Some(&user)).await;

    // assert
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Wallpaper not found");
}

#[tokio::test]
async fn deleting_a_wallpaper_removes_it() {
    // arrange
    let app = spawn_app().await;
    let user = app.create_user().await;
    let wallpaper = save(&app, &user, "aurora").await;
    let path = format!("/api/wallpapers/{}", wallpaper["id"].as_str().unwrap());

    // act
    let response = app.delete(&path, Some(&user)).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let response = app.get("/api/wallpapers", Some(&user)).await;
    let wallpapers: Vec<serde_json::Value> = response.json().await.unwrap();
    assert!(wallpapers.is_empty());
}
