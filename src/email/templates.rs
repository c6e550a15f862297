use crate::email::EmailMessage;
use crate::domain::UserEmail;
use chrono::{DateTime, Utc};

/// Subject and bodies of an email that still needs a recipient.
#[derive(Debug)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl RenderedEmail {
    pub fn message<'a>(&'a self, reply_to: Option<&'a UserEmail>) -> EmailMessage<'a> {
        EmailMessage {
            subject: &self.subject,
            html_content: &self.html,
            text_content: &self.text,
            reply_to,
        }
    }
}

pub fn contact_form_email(name: Option<&str>, email: &UserEmail, message: &str) -> RenderedEmail {
    let sender = name.unwrap_or_else(|| email.as_ref());
    let display_name = name.unwrap_or("Not provided");
    RenderedEmail {
        subject: format!("New Contact Form Submission from {}", sender),
        html: format!(
            "<h1>New Contact Form Submission</h1>\
            <p><strong>Name:</strong> {}</p>\
            <p><strong>Email:</strong> {}</p>\
            <p><strong>Message:</strong></p>\
            <div style=\"white-space: pre-wrap\">{}</div>\
            <p>Sent from WallScape.io contact form</p>",
            escape_html(display_name),
            escape_html(email.as_ref()),
            escape_html(message),
        ),
        text: format!(
            "New Contact Form Submission\n\nName: {}\nEmail: {}\n\n{}\n\n\
            Sent from WallScape.io contact form",
            display_name, email, message
        ),
    }
}

pub fn newsletter_signup_email(
    email: &UserEmail,
    saved: bool,
    received_at: DateTime<Utc>,
) -> RenderedEmail {
    let status = if saved { "Successful" } else { "Failed" };
    let time = received_at.format("%Y-%m-%d %H:%M:%S UTC");
    RenderedEmail {
        subject: "New Newsletter Subscription".into(),
        html: format!(
            "<h1>New Newsletter Subscription</h1>\
            <p>You have a new newsletter subscription from: <strong>{}</strong></p>\
            <p>Time: {}</p>\
            <p>Database save status: {}</p>",
            escape_html(email.as_ref()),
            time,
            status
        ),
        text: format!(
            "You have a new newsletter subscription from: {}\nTime: {}\nDatabase save status: {}",
            email, time, status
        ),
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
