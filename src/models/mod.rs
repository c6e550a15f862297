mod contact_message;
mod newsletter_signup;
mod profile;
mod subscription;
mod subscription_history;
mod usage;
mod wallpaper;

pub use contact_message::*;
pub use newsletter_signup::*;
pub use profile::*;
pub use subscription::*;
pub use subscription_history::*;
pub use usage::*;
pub use wallpaper::*;
