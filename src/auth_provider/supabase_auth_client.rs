use crate::auth_provider::{AuthProvider, VerificationError};
use crate::configuration::AuthSettings;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

pub struct SupabaseAuthClient {
    http_client: Client,
    base_url: String,
    anon_key: Secret<String>,
}

#[derive(serde::Deserialize, Default)]
#[serde(default)]
struct ProviderError {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl ProviderError {
    fn into_message(self) -> Option<String> {
        self.msg.or(self.error_description).or(self.message)
    }
}

impl SupabaseAuthClient {
    pub fn new(settings: &AuthSettings) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build the auth provider HTTP client.")?;
        Ok(Self {
            http_client,
            base_url: settings.provider_url.trim_end_matches('/').to_string(),
            anon_key: settings.provider_anon_key.clone(),
        })
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    #[tracing::instrument(name = "Verify an email change token", skip(self, token_hash))]
    async fn verify_email_change(&self, token_hash: &str) -> Result<(), VerificationError> {
        let response = self
            .http_client
            .post(format!("{}/auth/v1/verify", self.base_url))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(self.anon_key.expose_secret())
            .json(&serde_json::json!({
                "type": "email_change",
                "token_hash": token_hash,
            }))
            .send()
            .await
            .context("Failed to reach the auth provider.")?;

        let status = response.status();
        if status.is_client_error() {
            let message = response
                .json::<ProviderError>()
                .await
                .ok()
                .and_then(ProviderError::into_message)
                .unwrap_or_else(|| "Invalid or expired verification token.".to_string());
            return Err(VerificationError::Rejected(message));
        }
        response
            .error_for_status()
            .context("The auth provider failed to verify the token.")?;
        Ok(())
    }
}
