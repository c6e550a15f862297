mod stability_client;

use crate::domain::{ImageToImageRequest, TextToImageRequest};
use async_trait::async_trait;
pub use stability_client::StabilityClient;

#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("No image generation API key is configured.")]
    NotConfigured,
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// Produces wallpapers as `data:image/png;base64,...` URLs.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn text_to_image(
        &self,
        request: &TextToImageRequest,
    ) -> Result<Vec<String>, GenerationError>;

    async fn image_to_image(
        &self,
        request: &ImageToImageRequest,
    ) -> Result<Vec<String>, GenerationError>;
}

/// Generate with engine-compatible parameters, retrying once with the caller's
/// parameters untouched if the engine rejects them.
#[tracing::instrument(name = "Generate wallpapers from a prompt", skip(generator))]
pub async fn generate_with_fallback(
    generator: &dyn ImageGenerator,
    request: &TextToImageRequest,
) -> Result<Vec<String>, GenerationError> {
    match generator.text_to_image(&request.normalized()).await {
        Ok(images) => Ok(images),
        Err(GenerationError::NotConfigured) => Err(GenerationError::NotConfigured),
        Err(GenerationError::Upstream(error)) => {
            tracing::warn!(
                error.cause_chain = ?error,
                "Normalized generation request failed, retrying with the raw parameters."
            );
            generator.text_to_image(request).await
        }
    }
}
