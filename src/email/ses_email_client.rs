use crate::configuration::Settings;
use crate::domain::UserEmail;
use crate::email::{Email, EmailMessage};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_sesv2 as ses;
use aws_sdk_sesv2::model::{Body, Content, Destination, EmailContent, Message};
use std::time::Duration;

pub struct SesEmailClient {
    ses_client: ses::Client,
    sender: UserEmail,
    timeout: Duration,
}

impl SesEmailClient {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let sender = settings
            .email_client
            .sender()
            .map_err(anyhow::Error::msg)
            .context("Invalid sender email address.")?;
        let shared_config = aws_config::load_from_env().await;
        Ok(Self {
            ses_client: ses::Client::new(&shared_config),
            sender,
            timeout: settings.email_client.timeout(),
        })
    }
}

#[async_trait]
impl Email for SesEmailClient {
    #[tracing::instrument(
        name = "Send an email through SES",
        skip(self, message),
        fields(subject = %message.subject)
    )]
    async fn send_email(
        &self,
        recipient: &UserEmail,
        message: EmailMessage<'_>,
    ) -> anyhow::Result<()> {
        let html_content = Content::builder()
            .data(message.html_content)
            .charset("UTF-8")
            .build();
        let text_content = Content::builder()
            .data(message.text_content)
            .charset("UTF-8")
            .build();
        let body = Body::builder()
            .html(html_content)
            .text(text_content)
            .build();
        let subject = Content::builder()
            .data(message.subject)
            .charset("UTF-8")
            .build();
        let content = EmailContent::builder()
            .simple(Message::builder().subject(subject).body(body).build())
            .build();
        let destination = Destination::builder()
            .to_addresses(recipient.as_ref())
            .build();

        let mut request = self
            .ses_client
            .send_email()
            .from_email_address(self.sender.as_ref())
            .destination(destination)
            .content(content);
        if let Some(reply_to) = message.reply_to {
            request = request.reply_to_addresses(reply_to.as_ref());
        }
        tokio::time::timeout(self.timeout, request.send())
            .await
            .context("Timed out waiting for SES.")?
            .with_context(|| format!("SES refused to deliver an email to {}", recipient))?;
        Ok(())
    }
}
