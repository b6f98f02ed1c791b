pub mod discord;
pub mod entropy;

pub use discord::{DiscordNotifier, Notifier};
pub use entropy::EntropyClient;
