use crate::helpers::spawn_app;
use diesel::{QueryDsl, RunQueryDsl};
use std::sync::atomic::Ordering;
use wallscape::schema::contact_messages;

#[tokio::test]
async fn a_contact_message_is_stored_and_sent_to_the_team() {
    // arrange
    let app = spawn_app().await;
    let body = serde_json::json!({
        "name": "Ged",
        "email": "ged@roke.edu",
        "message": "Could you add more seascapes?",
    });

    // act
    let response = app.post_json("/api/contact", &body, None).await;

    // assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "success": true }));

    let sent = app.email_client.sent_emails.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "team@wallscape.io");
    assert_eq!(sent[0].subject, "New Contact Form Submission from Ged");
    assert_eq!(sent[0].reply_to.as_deref(), Some("ged@roke.edu"));
    assert!(sent[0].text.contains("Could you add more seascapes?"));

    let (name, email): (String, String) = contact_messages::table
        .select((contact_messages::name, contact_messages::email))
        .first(&mut *app.db())
        .expect("Failed to fetch the contact message.");
    assert_eq!(name, "Ged");
    assert_eq!(email, "ged@roke.edu");
}

#[tokio::test]
async fn an_anonymous_message_is_stored_under_a_placeholder_name() {
    // arrange
    let app = spawn_app().await;
    let body = serde_json::json!({ "email": "ged@roke.edu", "message": "Hello" });

    // act
    app.post_json("/api/contact", &body, None).await;

    // assert
    let name: String = contact_messages::table
        .select(contact_messages::name)
        .first(&mut *app.db())
        .unwrap();
    assert_eq!(name, "Anonymous");
    let sent = app.email_client.sent_emails.lock().unwrap().clone();
    assert_eq!(sent[0].subject, "New Contact Form Submission from ged@roke.edu");
}

#[tokio::test]
async fn contact_returns_a_400_when_fields_are_missing() {
    // arrange
    let app = spawn_app().await;
    let test_cases = vec![
        (serde_json::json!({ "message": "Hello" }), "missing the email"),
        (serde_json::json!({ "email": "ged@roke.edu" }), "missing the message"),
    ];

    for (body, description) in test_cases {
        // act
        let response = app.post_json("/api/contact", &body, None).await;

        // assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not return a 400 Bad Request when the payload was {}.",
            description
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Email and message are required");
    }
    assert!(app.email_client.sent_emails.lock().unwrap().is_empty());
}

#[tokio::test]
async fn a_failed_delivery_is_a_500() {
    // arrange
    let app = spawn_app().await;
    app.email_client.fail.store(true, Ordering::SeqCst);
    let body = serde_json::json!({ "email": "ged@roke.edu", "message": "Hello" });

    // act
    let response = app.post_json("/api/contact", &body, None).await;

    // assert
    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to send email");
}
