mod display_name;
mod image_request;
mod plan;
mod user_email;

pub use display_name::DisplayName;
pub use image_request::{
    AspectRatio, Dimensions, ImageToImageRequest, StylePreset, TextToImageRequest,
};
pub use plan::{PlanName, PlanType};
pub use user_email::UserEmail;
