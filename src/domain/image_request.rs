//! Parameters sent to the text-to-image and image-to-image engines.

const SDXL_DIMENSIONS: [Dimensions; 9] = [
    Dimensions::new(1024, 1024),
    Dimensions::new(1152, 896),
    Dimensions::new(896, 1152),
    Dimensions::new(1216, 832),
    Dimensions::new(832, 1216),
    Dimensions::new(1344, 768),
    Dimensions::new(768, 1344),
    Dimensions::new(1536, 640),
    Dimensions::new(640, 1536),
];

const VALID_STYLE_PRESETS: [&str; 17] = [
    "analog-film",
    "anime",
    "cinematic",
    "comic-book",
    "digital-art",
    "enhance",
    "fantasy-art",
    "isometric",
    "line-art",
    "low-poly",
    "modeling-compound",
    "neon-punk",
    "origami",
    "photographic",
    "pixel-art",
    "3d-model",
    "tile-texture",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Round to multiples of 8, then keep the size if the engine recommends it or
    /// switch to the recommended size with the closest aspect ratio.
    pub fn closest_sdxl(&self) -> Dimensions {
        let rounded = Dimensions::new(round_to_eight(self.width), round_to_eight(self.height));
        if rounded.height == 0 {
            return SDXL_DIMENSIONS[0];
        }
        if SDXL_DIMENSIONS.contains(&rounded) {
            return rounded;
        }

        let target = rounded.ratio();
        let mut closest = SDXL_DIMENSIONS[0];
        let mut closest_diff = (closest.ratio() - target).abs();
        for candidate in SDXL_DIMENSIONS.iter().skip(1) {
            let diff = (candidate.ratio() - target).abs();
            if diff < closest_diff {
                closest = *candidate;
                closest_diff = diff;
            }
        }
        closest
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        SDXL_DIMENSIONS[0]
    }
}

fn round_to_eight(value: u32) -> u32 {
    ((value as f64 / 8.0).round() as u32) * 8
}

/// Aspect ratios offered by the generate form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Widescreen,
    Ultrawide,
    Standard,
    Square,
    Portrait,
}

impl AspectRatio {
    pub fn parse(label: &str) -> Option<AspectRatio> {
        match label.trim() {
            "16:9" => Some(AspectRatio::Widescreen),
            "21:9" => Some(AspectRatio::Ultrawide),
            "4:3" => Some(AspectRatio::Standard),
            "1:1" => Some(AspectRatio::Square),
            "9:16" => Some(AspectRatio::Portrait),
            _ => None,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        match self {
            AspectRatio::Widescreen => Dimensions::new(1344, 768),
            AspectRatio::Ultrawide => Dimensions::new(1536, 640),
            AspectRatio::Standard => Dimensions::new(1024, 768),
            AspectRatio::Square => Dimensions::new(1024, 1024),
            AspectRatio::Portrait => Dimensions::new(768, 1344),
        }
    }
}

pub struct StylePreset;

impl StylePreset {
    pub const FALLBACK: &'static str = "photographic";

    pub fn is_valid(style: &str) -> bool {
        VALID_STYLE_PRESETS.contains(&style.to_lowercase().as_str())
    }

    /// Lower-cased preset, or [`StylePreset::FALLBACK`] when the engine would reject it.
    pub fn validated(style: &str) -> String {
        if Self::is_valid(style) {
            style.to_lowercase()
        } else {
            tracing::warn!(
                "Invalid style preset: {}. Using '{}' instead.",
                style,
                Self::FALLBACK
            );
            Self::FALLBACK.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextToImageRequest {
    pub prompt: String,
    pub dimensions: Dimensions,
    pub style: Option<String>,
    pub samples: u8,
    pub cfg_scale: f32,
    pub steps: u32,
}

impl TextToImageRequest {
    pub fn new(prompt: impl Into<String>) -> TextToImageRequest {
        TextToImageRequest {
            prompt: prompt.into(),
            dimensions: Dimensions::default(),
            style: None,
            samples: 4,
            cfg_scale: 7.0,
            steps: 30,
        }
    }

    pub fn dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn style(mut self, style: Option<String>) -> Self {
        self.style = style.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn samples(mut self, samples: u8) -> Self {
        self.samples = samples;
        self
    }

    /// The request with engine-compatible dimensions and style preset.
    pub fn normalized(&self) -> TextToImageRequest {
        TextToImageRequest {
            dimensions: self.dimensions.closest_sdxl(),
            style: self.style.as_deref().map(StylePreset::validated),
            ..self.clone()
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct ImageToImageRequest {
    pub init_image: Vec<u8>,
    pub prompt: Option<String>,
    pub style: String,
    pub samples: u8,
}

impl ImageToImageRequest {
    /// Accepts raw base64 or a `data:image/...;base64,` URL.
    pub fn from_base64(
        image: &str,
        prompt: Option<String>,
        style: String,
    ) -> Result<ImageToImageRequest, String> {
        let encoded = match image.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => image,
        };
        let init_image = base64::decode_config(encoded.trim(), base64::STANDARD)
            .map_err(|e| format!("The reference image is not valid base64: {}", e))?;
        if init_image.is_empty() {
            return Err("The reference image is empty.".into());
        }
        Ok(ImageToImageRequest {
            init_image,
            prompt: prompt.filter(|p| !p.trim().is_empty()),
            style,
            samples: 1,
        })
    }
}

impl std::fmt::Debug for ImageToImageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageToImageRequest")
            .field("init_image_bytes", &self.init_image.len())
            .field("prompt", &self.prompt)
            .field("style", &self.style)
            .field("samples", &self.samples)
            .finish()
    }
}
