use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub entropy: EntropyConfig,
    #[serde(default)]
    pub giveaway: GiveawayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Channel receiving the timestamped audit lines; audit delivery is
    /// skipped entirely when unset.
    #[serde(default)]
    pub log_channel_id: Option<String>,
    /// The only identity allowed to invoke the shutdown command.
    pub dev_user_id: String,
    /// Total timeout applied to every chat API request, so a stalled call
    /// cannot block the expiry scan.
    #[serde(default = "default_discord_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntropyConfig {
    #[serde(default = "default_entropy_url")]
    pub url: String,
    #[serde(default = "default_entropy_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiveawayConfig {
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Closed records are reclaimed by a TTL index this many days after
    /// their end time.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Role name -> entry multiplier. Entries are appended that many times
    /// at join; roles not in the map grant a single entry.
    #[serde(default = "default_entry_multipliers")]
    pub entry_multipliers: HashMap<String, u32>,
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_discord_timeout() -> u64 {
    10
}

fn default_entropy_url() -> String {
    "https://www.random.org/integers/?num=1&min=1&max=100&col=1&base=10&format=plain&rnd=new"
        .to_string()
}

fn default_entropy_timeout() -> u64 {
    5
}

fn default_scan_interval() -> u64 {
    30
}

fn default_retention_days() -> u64 {
    30
}

fn default_entry_multipliers() -> HashMap<String, u32> {
    HashMap::from([
        ("🏆 x2 Entries".to_string(), 2),
        ("🏆 x3 Entries".to_string(), 3),
    ])
}

impl Default for EntropyConfig {
    fn default() -> Self {
        EntropyConfig {
            url: default_entropy_url(),
            timeout_secs: default_entropy_timeout(),
        }
    }
}

impl Default for GiveawayConfig {
    fn default() -> Self {
        GiveawayConfig {
            scan_interval_secs: default_scan_interval(),
            retention_days: default_retention_days(),
            entry_multipliers: default_entry_multipliers(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str)
                    .map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No config file: build from environment variables and defaults.
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let mongo_uri = get_env("MONGO_URI")
                    .ok_or("Missing MONGO_URI environment variable and no config.toml found")?;
                let bot_token = get_env("DISCORD_BOT_TOKEN").ok_or(
                    "Missing DISCORD_BOT_TOKEN environment variable and no config.toml found",
                )?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        uri: mongo_uri,
                        database: get_env("MONGO_DATABASE")
                            .unwrap_or_else(|| "GiveawayBot".to_string()),
                    },
                    discord: DiscordConfig {
                        bot_token,
                        api_base: get_env("DISCORD_API_BASE").unwrap_or_else(default_api_base),
                        log_channel_id: get_env("LOG_CHANNEL_ID"),
                        dev_user_id: get_env("DEV_ID").unwrap_or_default(),
                        request_timeout_secs: get_env_parse("DISCORD_TIMEOUT_SECS", 10u64),
                    },
                    entropy: EntropyConfig {
                        url: get_env("ENTROPY_URL").unwrap_or_else(default_entropy_url),
                        timeout_secs: get_env_parse("ENTROPY_TIMEOUT_SECS", 5u64),
                    },
                    giveaway: GiveawayConfig {
                        scan_interval_secs: get_env_parse("SCAN_INTERVAL_SECS", 30u64),
                        retention_days: get_env_parse("RETENTION_DAYS", 30u64),
                        entry_multipliers: default_entry_multipliers(),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // Environment variables override file values when both are present.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("MONGO_URI") {
            config.database.uri = v;
        }
        if let Ok(v) = env::var("MONGO_DATABASE") {
            config.database.database = v;
        }
        if let Ok(v) = env::var("DISCORD_BOT_TOKEN") {
            config.discord.bot_token = v;
        }
        if let Ok(v) = env::var("DISCORD_API_BASE") {
            config.discord.api_base = v;
        }
        if let Ok(v) = env::var("LOG_CHANNEL_ID") {
            config.discord.log_channel_id = Some(v);
        }
        if let Ok(v) = env::var("DEV_ID") {
            config.discord.dev_user_id = v;
        }
        if let Ok(v) = env::var("DISCORD_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            config.discord.request_timeout_secs = n;
        }
        if let Ok(v) = env::var("ENTROPY_URL") {
            config.entropy.url = v;
        }
        if let Ok(v) = env::var("ENTROPY_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            config.entropy.timeout_secs = n;
        }
        if let Ok(v) = env::var("SCAN_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            config.giveaway.scan_interval_secs = n;
        }
        if let Ok(v) = env::var("RETENTION_DAYS")
            && let Ok(n) = v.parse()
        {
            config.giveaway.retention_days = n;
        }

        Ok(config)
    }
}
