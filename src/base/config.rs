//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use chrono::TimeDelta;
use serde::Deserialize;

use super::types::Res;

/// Default path of the trigger document.
fn default_triggers_path() -> String {
    "triggers.json".to_string()
}

/// Default SurrealDB namespace.
fn default_db_namespace() -> String {
    "trigger".to_string()
}

/// Default SurrealDB database.
fn default_db_database() -> String {
    "bot".to_string()
}

/// Default cooldown window, in hours.
fn default_cooldown_hours() -> u64 {
    24
}

/// Default lower bound of the pre-response delay.
fn default_response_delay_min_ms() -> u64 {
    1000
}

/// Default upper bound of the pre-response delay.
fn default_response_delay_max_ms() -> u64 {
    3000
}

/// Default interval between sweeps of expired cooldowns.
fn default_cooldown_prune_interval_secs() -> u64 {
    3600
}

/// Configuration for the trigger-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    /// The shared settings.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inner: Arc::new(ConfigInner::default()),
        }
    }
}

/// The settings themselves, each overridable by `TRIGGER_BOT_<NAME>`.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Slack app token (`SLACK_APP_TOKEN`).
    #[serde(default)]
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    #[serde(default)]
    pub slack_bot_token: String,
    /// Path of the JSON trigger document (`TRIGGERS_PATH`).
    #[serde(default = "default_triggers_path")]
    pub triggers_path: String,
    /// Database endpoint URL (`DB_ENDPOINT`).
    /// When set, triggers are stored in SurrealDB instead of the JSON document.
    #[serde(default)]
    pub db_endpoint: Option<String>,
    /// Database username (`DB_USERNAME`).
    #[serde(default)]
    pub db_username: Option<String>,
    /// Database password (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: Option<String>,
    /// Database namespace (`DB_NAMESPACE`).
    #[serde(default = "default_db_namespace")]
    pub db_namespace: String,
    /// Database name (`DB_DATABASE`).
    #[serde(default = "default_db_database")]
    pub db_database: String,
    /// Hours before the same user may set off the same trigger again (`COOLDOWN_HOURS`).
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: u64,
    /// Channel ids the bot never answers in (`IGNORED_CHANNELS`, comma-separated).
    #[serde(default)]
    pub ignored_channels: Vec<String>,
    /// Lower bound of the random delay before a response (`RESPONSE_DELAY_MIN_MS`).
    #[serde(default = "default_response_delay_min_ms")]
    pub response_delay_min_ms: u64,
    /// Upper bound of the random delay before a response (`RESPONSE_DELAY_MAX_MS`).
    #[serde(default = "default_response_delay_max_ms")]
    pub response_delay_max_ms: u64,
    /// Seconds between sweeps of expired cooldown records (`COOLDOWN_PRUNE_INTERVAL_SECS`).
    #[serde(default = "default_cooldown_prune_interval_secs")]
    pub cooldown_prune_interval_secs: u64,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            slack_app_token: String::new(),
            slack_bot_token: String::new(),
            triggers_path: default_triggers_path(),
            db_endpoint: None,
            db_username: None,
            db_password: None,
            db_namespace: default_db_namespace(),
            db_database: default_db_database(),
            cooldown_hours: default_cooldown_hours(),
            ignored_channels: Vec::new(),
            response_delay_min_ms: default_response_delay_min_ms(),
            response_delay_max_ms: default_response_delay_max_ms(),
            cooldown_prune_interval_secs: default_cooldown_prune_interval_secs(),
        }
    }
}

impl ConfigInner {
    /// The cooldown window as a duration.
    ///
    /// Hours too large for a [`TimeDelta`] are rejected by [`Config::validate`]; if one gets
    /// here anyway the window is the longest one representable, never a negative one.
    pub fn cooldown_window(&self) -> TimeDelta {
        self.checked_cooldown_window().unwrap_or(TimeDelta::MAX)
    }

    fn checked_cooldown_window(&self) -> Option<TimeDelta> {
        i64::try_from(self.cooldown_hours).ok().and_then(TimeDelta::try_hours)
    }

    /// Whether the bot should stay quiet in the given channel.
    pub fn is_ignored_channel(&self, channel_id: &str) -> bool {
        self.ignored_channels.iter().any(|c| c == channel_id)
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

impl Config {
    /// Load from the environment, layered with the explicit file or `.hidden/config.toml`.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        Self::load_with(environment(), explicit_path)
    }

    fn load_with(env: config::Environment, explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder();

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        // Later sources win, so the environment overrides the file.
        cfg = cfg.add_source(env);

        let result = Config::from(cfg.build()?.try_deserialize::<ConfigInner>()?);

        result.validate()?;

        Ok(result)
    }

    /// Check the cross-field constraints `config` cannot express.
    pub fn validate(&self) -> Res<()> {
        if self.cooldown_hours == 0 {
            return Err(anyhow::anyhow!("Cooldown hours must be greater than 0."));
        }

        if self.checked_cooldown_window().is_none() {
            return Err(anyhow::anyhow!("Cooldown hours `{}` is out of range.", self.cooldown_hours));
        }

        if self.response_delay_min_ms > self.response_delay_max_ms {
            return Err(anyhow::anyhow!("Response delay minimum must not exceed the maximum."));
        }

        if self.cooldown_prune_interval_secs == 0 {
            return Err(anyhow::anyhow!("Cooldown prune interval must be greater than 0."));
        }

        Ok(())
    }

    /// Check the settings only the Slack listener needs.
    pub fn validate_slack(&self) -> Res<()> {
        if self.slack_app_token.is_empty() || self.slack_bot_token.is_empty() {
            return Err(anyhow::anyhow!("Slack app and bot tokens are required to run the bot."));
        }

        Ok(())
    }
}

/// `TRIGGER_BOT_*` variables, with `IGNORED_CHANNELS` split on commas.
fn environment() -> config::Environment {
    config::Environment::default()
        .prefix("TRIGGER_BOT")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("ignored_channels")
}
