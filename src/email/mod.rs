mod ses_email_client;
mod templates;

use crate::domain::UserEmail;
use async_trait::async_trait;
pub use ses_email_client::SesEmailClient;
pub use templates::*;

pub struct EmailMessage<'a> {
    pub subject: &'a str,
    pub html_content: &'a str,
    pub text_content: &'a str,
    pub reply_to: Option<&'a UserEmail>,
}

#[async_trait]
pub trait Email: Send + Sync {
    async fn send_email(
        &self,
        recipient: &UserEmail,
        message: EmailMessage<'_>,
    ) -> Result<(), anyhow::Error>;
}
