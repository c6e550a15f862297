use crate::billing::find_usage;
use crate::domain::{AspectRatio, ImageToImageRequest, StylePreset, TextToImageRequest};
use crate::guards::AuthenticatedUser;
use crate::image_generation::{generate_with_fallback, GenerationError, ImageGenerator};
use crate::routes::{required, ApiError, OrUnexpected};
use crate::startup::WallscapeDbConn;
use chrono::Utc;
use rocket::serde::json::{json, Json, Value};
use rocket::State;
use std::sync::Arc;
use uuid::Uuid;

const IMAGE_TO_IMAGE_STYLE: &str = "enhance";
const FALLBACK_PROMPT: &str = "Create a beautiful wallpaper with vibrant colors";
const FALLBACK_WARNING: &str =
    "Image-to-image generation failed. Falling back to text-to-image generation.";

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageData {
    prompt: Option<String>,
    style: Option<String>,
    aspect_ratio: Option<String>,
}

#[tracing::instrument(
    name = "Generate wallpapers from a prompt",
    skip(body, conn, generator, user),
    fields(
        request_id = %Uuid::new_v4(),
        user_id = %user.user_id,
        style = ?body.style,
        aspect_ratio = ?body.aspect_ratio
    )
)]
#[post("/api/generate-image", data = "<body>")]
pub async fn generate_image(
    body: Json<GenerateImageData>,
    conn: WallscapeDbConn,
    generator: &State<Arc<dyn ImageGenerator>>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let body = body.into_inner();
    let prompt = required(body.prompt, "Prompt is required")?;
    ensure_quota_left(&conn, user.user_id).await?;

    let dimensions = body
        .aspect_ratio
        .as_deref()
        .and_then(AspectRatio::parse)
        .map(|ratio| ratio.dimensions())
        .unwrap_or_default();
    let request = TextToImageRequest::new(prompt)
        .dimensions(dimensions)
        .style(body.style);
    let images = generate_with_fallback(generator.inner().as_ref(), &request)
        .await
        .map_err(|e| generation_failed(e, "Failed to generate image"))?;

    tracing::info!("Generated {} images", images.len());
    Ok(Json(json!({ "images": images })))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFromImageData {
    image_base64: Option<String>,
    prompt: Option<String>,
    style: Option<String>,
}

#[tracing::instrument(
    name = "Generate wallpapers from a reference image",
    skip(body, conn, generator, user),
    fields(request_id = %Uuid::new_v4(), user_id = %user.user_id, style = ?body.style)
)]
#[post("/api/generate-from-image", data = "<body>")]
pub async fn generate_from_image(
    body: Json<GenerateFromImageData>,
    conn: WallscapeDbConn,
    generator: &State<Arc<dyn ImageGenerator>>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let body = body.into_inner();
    let image = required(body.image_base64, "Image is required")?;
    ensure_quota_left(&conn, user.user_id).await?;

    let prompt = body.prompt.filter(|p| !p.trim().is_empty());
    let style = body.style.filter(|s| !s.trim().is_empty());
    let image_style = StylePreset::validated(style.as_deref().unwrap_or(IMAGE_TO_IMAGE_STYLE));

    let attempt = match ImageToImageRequest::from_base64(&image, prompt.clone(), image_style) {
        Ok(request) => generator.image_to_image(&request).await,
        Err(e) => Err(GenerationError::Upstream(anyhow::anyhow!(e))),
    };
    match attempt {
        Ok(images) => Ok(Json(json!({ "images": images }))),
        Err(GenerationError::NotConfigured) => Err(ApiError::UnexpectedError(
            "API key configuration error",
            GenerationError::NotConfigured.into(),
        )),
        Err(GenerationError::Upstream(error)) => {
            tracing::warn!(
                error.cause_chain = ?error,
                "Image-to-image generation failed, falling back to text-to-image"
            );
            let fallback_prompt = match prompt {
                Some(prompt) => format!("Create an image similar to: {}", prompt),
                None => FALLBACK_PROMPT.to_string(),
            };
            let request = TextToImageRequest::new(fallback_prompt)
                .samples(4)
                .style(Some(style.unwrap_or_else(|| StylePreset::FALLBACK.into())));
            let images = generator
                .text_to_image(&request)
                .await
                .map_err(|e| generation_failed(e, "Failed to generate image from reference"))?;
            Ok(Json(json!({ "images": images, "warning": FALLBACK_WARNING })))
        }
    }
}

async fn ensure_quota_left(conn: &WallscapeDbConn, user_id: Uuid) -> Result<(), ApiError> {
    let usage = conn
        .run(move |c| find_usage(c, user_id))
        .await
        .or_unexpected("Error checking usage")?;
    match usage {
        Some(usage) if !usage.has_quota_left(Utc::now()) => {
            tracing::info!(
                "User {} has used {} of {} generations",
                user_id,
                usage.count,
                usage.monthly_generations
            );
            Err(ApiError::Forbidden(
                "You have reached your monthly generation limit",
            ))
        }
        _ => Ok(()),
    }
}

fn generation_failed(error: GenerationError, message: &'static str) -> ApiError {
    match error {
        GenerationError::NotConfigured => ApiError::ServiceUnavailable(
            "API configuration error",
            "The image generation service is currently unavailable. \
            Please check your API key configuration.",
        ),
        GenerationError::Upstream(error) => ApiError::UnexpectedError(message, error),
    }
}
