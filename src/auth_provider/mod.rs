mod supabase_auth_client;

use async_trait::async_trait;
pub use supabase_auth_client::SupabaseAuthClient;

#[derive(thiserror::Error, Debug)]
pub enum VerificationError {
    /// The provider looked at the token and refused it.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

/// The hosted identity service that owns user accounts and sessions.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn verify_email_change(&self, token_hash: &str) -> Result<(), VerificationError>;
}
