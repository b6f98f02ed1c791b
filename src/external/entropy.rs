use crate::config::EntropyConfig;
use crate::error::{AppError, AppResult};
use rand::Rng;
use rand::rngs::OsRng;
use reqwest::Client;
use std::time::Duration;

pub const DRAW_MIN: u32 = 1;
pub const DRAW_MAX: u32 = 100;

/// Draw value provider. Prefers the remote entropy service (a plain-text
/// integer endpoint in the random.org style); any failure, whether a
/// timeout, a network error or a malformed payload, falls back to a
/// locally seeded secure generator. The fallback is transparent to callers
/// except via logging.
#[derive(Clone)]
pub struct EntropyClient {
    client: Client,
    config: EntropyConfig,
}

impl EntropyClient {
    pub fn new(config: EntropyConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Produce a draw value in `[DRAW_MIN, DRAW_MAX]`. Never fails.
    pub async fn draw(&self) -> u32 {
        match self.fetch_remote().await {
            Ok(value) => {
                log::debug!("Entropy service returned {value}");
                value
            }
            Err(e) => {
                log::warn!("Entropy service unavailable ({e}), using local secure generator");
                Self::local_draw()
            }
        }
    }

    async fn fetch_remote(&self) -> AppResult<u32> {
        let response = self
            .client
            .get(&self.config.url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Entropy service returned status {}",
                response.status()
            )));
        }

        let text = response.text().await?;
        let value: u32 = text.trim().parse().map_err(|_| {
            AppError::ExternalApiError(format!("Unexpected entropy payload: {:?}", text.trim()))
        })?;

        if !(DRAW_MIN..=DRAW_MAX).contains(&value) {
            return Err(AppError::ExternalApiError(format!(
                "Entropy value {value} out of range"
            )));
        }

        Ok(value)
    }

    fn local_draw() -> u32 {
        OsRng.gen_range(DRAW_MIN..=DRAW_MAX)
    }
}
