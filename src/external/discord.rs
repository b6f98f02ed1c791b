use crate::config::DiscordConfig;
use crate::error::{AppError, AppResult};
use crate::models::Giveaway;
use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

const EMBED_BLUE: u32 = 0x3498db;
const EMBED_RED: u32 = 0xe74c3c;
const ANNOUNCEMENT_IMAGE: &str = "https://i.imgur.com/qm7sTPg.png";
const WINNER_IMAGE: &str = "https://i.imgur.com/BRNcUVE.png";
const REROLL_IMAGE: &str = "https://i.imgur.com/iM8ByUz.png";

/// Notification surface for giveaway announcements and results.
///
/// All methods returning `AppResult` report delivery failures; callers on
/// the finalization path treat them as best-effort (logged, never retried,
/// never fatal to the scan pass). `audit` swallows its own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post the announcement embed with the entry buttons. Returns the
    /// message id for later cleanup.
    async fn post_announcement(&self, giveaway: &Giveaway) -> AppResult<String>;

    /// Post the result embed with the ended-view buttons. `rerolled_by`
    /// switches to the reroll presentation. Returns the message id.
    async fn post_winner(
        &self,
        giveaway: &Giveaway,
        winner_id: &str,
        audit_hash: &str,
        rerolled_by: Option<&str>,
    ) -> AppResult<String>;

    /// Post the bare winner mention that trails the result embed.
    async fn post_winner_mention(&self, channel_id: &str, winner_id: &str) -> AppResult<String>;

    async fn post_no_entrants(&self, channel_id: &str, title: &str) -> AppResult<()>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> AppResult<()>;

    /// Scan a small recent-history window for a trailing bare-mention
    /// message authored by the bot itself and return its id.
    async fn find_trailing_mention(&self, channel_id: &str) -> AppResult<Option<String>>;

    /// Emit a timestamped audit line to the external logging surface.
    /// Failures are swallowed.
    async fn audit(&self, text: &str);
}

#[derive(Clone)]
pub struct DiscordNotifier {
    client: Client,
    config: DiscordConfig,
    /// Own user id, fetched once from `/users/@me` when first needed.
    own_user_id: Arc<OnceCell<String>>,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig) -> Self {
        // A total request timeout keeps a stalled chat API call from
        // blocking the expiry scan.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to build the chat API client");
        Self {
            client,
            config,
            own_user_id: Arc::new(OnceCell::new()),
        }
    }

    async fn own_user_id(&self) -> AppResult<&str> {
        self.own_user_id
            .get_or_try_init(|| async {
                let url = format!("{}/users/@me", self.config.api_base);
                let response = self
                    .client
                    .get(&url)
                    .header("Authorization", format!("Bot {}", self.config.bot_token))
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(AppError::ExternalApiError(format!(
                        "Identity fetch failed with status {}",
                        response.status()
                    )));
                }

                let body: Value = response.json().await?;
                body["id"].as_str().map(str::to_string).ok_or_else(|| {
                    AppError::ExternalApiError("Identity response missing id".to_string())
                })
            })
            .await
            .map(String::as_str)
    }

    async fn create_message(&self, channel_id: &str, payload: Value) -> AppResult<String> {
        let url = format!(
            "{}/channels/{}/messages",
            self.config.api_base, channel_id
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.config.bot_token))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Message delivery failed with status {status}: {error_text}"
            )));
        }

        let body: Value = response.json().await?;
        body["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::ExternalApiError("Message response missing id".to_string()))
    }

    fn entry_buttons() -> Value {
        json!([{
            "type": 1,
            "components": [
                { "type": 2, "style": 2, "label": "View Entrants", "custom_id": "view_btn" },
                { "type": 2, "style": 3, "label": "Enter Giveaway", "custom_id": "enter_btn", "emoji": { "name": "🎉" } },
                { "type": 2, "style": 4, "label": "Leave Giveaway", "custom_id": "leave_btn" }
            ]
        }])
    }

    fn ended_buttons() -> Value {
        json!([{
            "type": 1,
            "components": [
                { "type": 2, "style": 2, "label": "View Entrants", "custom_id": "view_ended_btn" },
                { "type": 2, "style": 2, "label": "Debug", "custom_id": "debug_btn" },
                { "type": 2, "style": 4, "label": "Reroll", "custom_id": "reroll_btn", "emoji": { "name": "🎲" } }
            ]
        }])
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn post_announcement(&self, giveaway: &Giveaway) -> AppResult<String> {
        let payload = json!({
            "embeds": [{
                "title": format!("GIVEAWAY: 🎉 {} 🎉", giveaway.title),
                "description": format!(
                    "{}\n\n**Ends:** <t:{}:R>",
                    giveaway.description,
                    giveaway.end_time.timestamp()
                ),
                "color": EMBED_BLUE,
                "image": { "url": ANNOUNCEMENT_IMAGE },
                // Footer id is display-only; handlers always receive the
                // id through the request path.
                "footer": { "text": format!("Giveaway ID: {}", giveaway.id) },
            }],
            "components": Self::entry_buttons(),
        });
        self.create_message(&giveaway.channel_id, payload).await
    }

    async fn post_winner(
        &self,
        giveaway: &Giveaway,
        winner_id: &str,
        audit_hash: &str,
        rerolled_by: Option<&str>,
    ) -> AppResult<String> {
        let embed = match rerolled_by {
            Some(user_id) => json!({
                "title": "REROLLED RESULTS 🔄",
                "description": format!(
                    "**New Winner 🎉**: <@{winner_id}>\n**Rerolled By**: <@{user_id}>\n//////////////////////////////////////////////////"
                ),
                "color": EMBED_RED,
                "image": { "url": REROLL_IMAGE },
                "footer": { "text": format!("Hash: {} | Giveaway ID: {}", audit_hash, giveaway.id) },
            }),
            None => json!({
                "title": "GIVEAWAY ENDED 🎊",
                "description": format!(
                    "**Winner**: <@{winner_id}>\n**Giveaway Won**: **{}**\n//////////////////////////////////////////////////",
                    giveaway.title
                ),
                "color": EMBED_BLUE,
                "image": { "url": WINNER_IMAGE },
                "footer": { "text": format!("Giveaway ID: {}", giveaway.id) },
            }),
        };

        let payload = json!({ "embeds": [embed], "components": Self::ended_buttons() });
        self.create_message(&giveaway.channel_id, payload).await
    }

    async fn post_winner_mention(&self, channel_id: &str, winner_id: &str) -> AppResult<String> {
        self.create_message(channel_id, json!({ "content": format!("<@{winner_id}>") }))
            .await
    }

    async fn post_no_entrants(&self, channel_id: &str, title: &str) -> AppResult<()> {
        self.create_message(
            channel_id,
            json!({ "content": format!("Giveaway for **{title}** ended with no entries.") }),
        )
        .await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> AppResult<()> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.config.api_base, channel_id, message_id
        );
        let response = self
            .client
            .delete(&url)
            .header("Authorization", format!("Bot {}", self.config.bot_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Message deletion failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn find_trailing_mention(&self, channel_id: &str) -> AppResult<Option<String>> {
        let own_id = self.own_user_id().await?.to_string();
        let url = format!(
            "{}/channels/{}/messages?limit=3",
            self.config.api_base, channel_id
        );
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bot {}", self.config.bot_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "History fetch failed with status {}",
                response.status()
            )));
        }

        let messages: Vec<Value> = response.json().await?;
        Ok(trailing_mention_id(&messages, &own_id))
    }

    async fn audit(&self, text: &str) {
        log::info!("{text}");

        let Some(channel_id) = self.config.log_channel_id.clone() else {
            return;
        };
        let timestamp = Local::now().format("%d/%m/%Y %H:%M:%S%.3f");
        let line = format!("`[{timestamp}] || {text}`");
        if let Err(e) = self
            .create_message(&channel_id, json!({ "content": line }))
            .await
        {
            log::warn!("Audit line delivery failed: {e}");
        }
    }
}

/// First bare-mention message in the window that the bot itself authored.
/// Mentions from other users are never cleanup candidates.
fn trailing_mention_id(messages: &[Value], bot_user_id: &str) -> Option<String> {
    for message in messages {
        if message["author"]["id"].as_str() == Some(bot_user_id)
            && let Some(content) = message["content"].as_str()
            && content.starts_with("<@")
            && content.ends_with('>')
            && let Some(id) = message["id"].as_str()
        {
            return Some(id.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(api_base: &str, timeout_secs: u64) -> DiscordNotifier {
        DiscordNotifier::new(DiscordConfig {
            bot_token: "token".to_string(),
            api_base: api_base.to_string(),
            log_channel_id: None,
            dev_user_id: String::new(),
            request_timeout_secs: timeout_secs,
        })
    }

    #[tokio::test]
    async fn stalled_channel_calls_error_within_the_timeout() {
        // Blackhole address: the connection never completes, so only the
        // client-level timeout can bound the call.
        let notifier = notifier("http://10.255.255.1", 1);
        let started = std::time::Instant::now();
        let result = notifier.delete_message("100", "200").await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn trailing_mention_matches_only_bot_authored_messages() {
        let messages = vec![
            json!({ "id": "1", "content": "<@42>", "author": { "id": "999" } }),
            json!({ "id": "2", "content": "congrats!", "author": { "id": "300" } }),
            json!({ "id": "3", "content": "<@42>", "author": { "id": "300" } }),
        ];
        assert_eq!(trailing_mention_id(&messages, "300"), Some("3".to_string()));
        assert_eq!(trailing_mention_id(&messages, "555"), None);
        assert_eq!(trailing_mention_id(&[], "300"), None);
    }
}
