pub mod admin;
pub mod giveaway;
pub mod health;

pub use admin::admin_config;
pub use giveaway::giveaway_config;
pub use health::health_config;
