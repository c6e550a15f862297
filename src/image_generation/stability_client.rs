use crate::configuration::ImageGenerationSettings;
use crate::domain::{ImageToImageRequest, TextToImageRequest};
use crate::image_generation::{GenerationError, ImageGenerator};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, Secret};

const DEFAULT_IMAGE_PROMPT: &str = "Enhance this image";
const IMAGE_STRENGTH: &str = "0.35";

pub struct StabilityClient {
    http_client: Client,
    base_url: String,
    engine_id: String,
    api_key: Option<Secret<String>>,
}

#[derive(serde::Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
    weight: f32,
}

#[derive(serde::Serialize)]
struct TextToImageBody<'a> {
    text_prompts: [TextPrompt<'a>; 1],
    cfg_scale: f32,
    width: u32,
    height: u32,
    steps: u32,
    samples: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    style_preset: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct GenerationResponse {
    artifacts: Vec<Artifact>,
}

#[derive(serde::Deserialize)]
struct Artifact {
    base64: String,
}

impl StabilityClient {
    pub fn new(settings: &ImageGenerationSettings) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build the image generation HTTP client.")?;
        Ok(Self {
            http_client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            engine_id: settings.engine_id.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn url(&self, operation: &str) -> String {
        format!(
            "{}/v1/generation/{}/{}",
            self.base_url, self.engine_id, operation
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<String>, GenerationError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(GenerationError::NotConfigured)?;
        let response = request
            .bearer_auth(api_key.expose_secret())
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to reach the image generation API.")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Stability API error: {} {}", status.as_u16(), body).into());
        }
        let response = response
            .json::<GenerationResponse>()
            .await
            .context("Failed to decode the image generation response.")?;
        tracing::info!("Generated {} images", response.artifacts.len());
        Ok(response
            .artifacts
            .into_iter()
            .map(|artifact| format!("data:image/png;base64,{}", artifact.base64))
            .collect())
    }
}

#[async_trait]
impl ImageGenerator for StabilityClient {
    #[tracing::instrument(name = "Text-to-image generation", skip(self))]
    async fn text_to_image(
        &self,
        request: &TextToImageRequest,
    ) -> Result<Vec<String>, GenerationError> {
        let body = TextToImageBody {
            text_prompts: [TextPrompt {
                text: &request.prompt,
                weight: 1.0,
            }],
            cfg_scale: request.cfg_scale,
            width: request.dimensions.width,
            height: request.dimensions.height,
            steps: request.steps,
            samples: request.samples,
            style_preset: request.style.as_deref(),
        };
        let request = self.http_client.post(self.url("text-to-image")).json(&body);
        self.send(request).await
    }

    #[tracing::instrument(name = "Image-to-image generation", skip(self))]
    async fn image_to_image(
        &self,
        request: &ImageToImageRequest,
    ) -> Result<Vec<String>, GenerationError> {
        let init_image = Part::bytes(request.init_image.clone())
            .file_name("init_image.png")
            .mime_str("image/png")
            .context("Failed to attach the reference image.")?;
        let form = Form::new()
            .part("init_image", init_image)
            .text("init_image_mode", "IMAGE_STRENGTH")
            .text("image_strength", IMAGE_STRENGTH)
            .text(
                "text_prompts[0][text]",
                request
                    .prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_IMAGE_PROMPT.to_string()),
            )
            .text("text_prompts[0][weight]", "1")
            .text("cfg_scale", "7")
            .text("steps", "30")
            .text("samples", request.samples.to_string())
            .text("style_preset", request.style.clone());
        let request = self
            .http_client
            .post(self.url("image-to-image"))
            .multipart(form);
        self.send(request).await
    }
}
