//! Bot configuration.
//!
//! The config lives in `config.json` at the working-directory root. Every
//! optional setting has a serde default so a minimal file only names the title
//! and the token.
use crate::catalog::FrameNaming;
use crate::paths::WorkingPaths;
use crate::social::RetryPolicy;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Current schema version for `config.json`.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
/// Environment variable that overrides `facebook.access_token`.
pub const ACCESS_TOKEN_ENV: &str = "FRAMEBOT_ACCESS_TOKEN";
/// Longest best-of cooldown; keeps `post_time + cooldown` within chrono's range.
const MAX_WAIT_HOURS: u64 = 100 * 365 * 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    pub schema_version: u32,
    pub bot: BotSettings,
    #[serde(default)]
    pub facebook: FacebookSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_of: Option<BestOfSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_frames: Option<AlternateFramesSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotSettings {
    /// Shown in every caption.
    pub title: String,
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Relative paths resolve against the working directory.
    #[serde(default = "default_frames_directory")]
    pub frames_directory: PathBuf,
    #[serde(default = "default_frames_ext")]
    pub frames_ext: String,
    /// File stem pattern; `$N$` marks the frame number.
    #[serde(default = "default_frames_naming")]
    pub frames_naming: String,
    #[serde(default = "default_upload_interval_secs")]
    pub upload_interval_secs: u64,
    #[serde(default)]
    pub delete_files: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FacebookSettings {
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    #[serde(default = "default_throttle_multiplier")]
    pub throttle_multiplier: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BestOfSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub album_id: String,
    /// A frame is promoted when its reactions exceed this value.
    #[serde(default = "default_reactions_threshold")]
    pub reactions_threshold: u64,
    #[serde(default = "default_wait_hours")]
    pub wait_hours: u64,
    #[serde(default = "default_true")]
    pub store_best_ofs: bool,
    #[serde(default = "default_poll_interval_minutes")]
    pub poll_interval_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlternateFramesSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub directory: PathBuf,
    /// Falls back to the frame caption when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_text: Option<String>,
    #[serde(default)]
    pub delete_files: bool,
}

fn default_bot_name() -> String {
    "Bot".to_string()
}

fn default_frames_directory() -> PathBuf {
    PathBuf::from("frames")
}

fn default_frames_ext() -> String {
    "jpg".to_string()
}

fn default_frames_naming() -> String {
    "$N$".to_string()
}

fn default_upload_interval_secs() -> u64 {
    150
}

fn default_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v16.0".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_backoff_secs() -> u64 {
    60
}

fn default_throttle_multiplier() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_reactions_threshold() -> u64 {
    50
}

fn default_wait_hours() -> u64 {
    24
}

fn default_poll_interval_minutes() -> u64 {
    60
}

impl Default for FacebookSettings {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: default_base_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
            throttle_multiplier: default_throttle_multiplier(),
        }
    }
}

impl BotSettings {
    pub fn upload_interval(&self) -> Duration {
        Duration::from_secs(self.upload_interval_secs)
    }

    pub fn frames_dir(&self, paths: &WorkingPaths) -> PathBuf {
        paths.resolve(&self.frames_directory)
    }
}

impl FacebookSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Duration::from_secs(self.retry_backoff_secs),
            throttle_multiplier: self.throttle_multiplier,
        }
    }
}

impl BestOfSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.wait_hours.saturating_mul(3600))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.saturating_mul(60))
    }
}

impl BotConfig {
    pub fn best_of_enabled(&self) -> Option<&BestOfSettings> {
        self.best_of.as_ref().filter(|settings| settings.enabled)
    }

    pub fn alternate_frames_enabled(&self) -> Option<&AlternateFramesSettings> {
        self.alternate_frames
            .as_ref()
            .filter(|settings| settings.enabled)
    }
}

/// Config written by `framebot init`.
pub fn default_config() -> BotConfig {
    BotConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        bot: BotSettings {
            title: "Untitled".to_string(),
            name: default_bot_name(),
            frames_directory: default_frames_directory(),
            frames_ext: default_frames_ext(),
            frames_naming: default_frames_naming(),
            upload_interval_secs: default_upload_interval_secs(),
            delete_files: false,
        },
        facebook: FacebookSettings::default(),
        best_of: Some(BestOfSettings {
            enabled: false,
            album_id: String::new(),
            reactions_threshold: default_reactions_threshold(),
            wait_hours: default_wait_hours(),
            store_best_ofs: true,
            poll_interval_minutes: default_poll_interval_minutes(),
        }),
        alternate_frames: None,
    }
}

pub fn load_config(paths: &WorkingPaths) -> Result<BotConfig> {
    let path = paths.config_path();
    let bytes = fs::read(&path).with_context(|| {
        format!(
            "read config {} (run `framebot init` to create one)",
            path.display()
        )
    })?;
    let config: BotConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(config)
}

pub fn write_config(paths: &WorkingPaths, config: &BotConfig) -> Result<()> {
    crate::persist::write_atomic_json(&paths.config_path(), config)
}

/// Fail fast on settings the bot cannot run with.
pub fn validate_config(config: &BotConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {} (expected {CONFIG_SCHEMA_VERSION})",
            config.schema_version
        ));
    }
    let bot = &config.bot;
    if bot.title.trim().is_empty() {
        return Err(anyhow!("bot.title must be non-empty"));
    }
    if bot.frames_ext.trim().is_empty() || bot.frames_ext.starts_with('.') {
        return Err(anyhow!(
            "bot.frames_ext must be a bare extension like \"jpg\" (got {:?})",
            bot.frames_ext
        ));
    }
    FrameNaming::new(&bot.frames_naming, &bot.frames_ext).context("bot.frames_naming")?;
    if config.facebook.timeout_secs == 0 {
        return Err(anyhow!("facebook.timeout_secs must be positive"));
    }
    if let Some(best_of) = config.best_of_enabled() {
        if best_of.album_id.trim().is_empty() {
            return Err(anyhow!("best_of.album_id is required when best_of is enabled"));
        }
        if best_of.wait_hours > MAX_WAIT_HOURS {
            return Err(anyhow!(
                "best_of.wait_hours must be at most {MAX_WAIT_HOURS} (got {})",
                best_of.wait_hours
            ));
        }
        if best_of.poll_interval_minutes == 0 {
            return Err(anyhow!("best_of.poll_interval_minutes must be positive"));
        }
        if best_of.poll_interval_minutes.checked_mul(60).is_none() {
            return Err(anyhow!(
                "best_of.poll_interval_minutes is out of range (got {})",
                best_of.poll_interval_minutes
            ));
        }
    }
    if let Some(alternate) = config.alternate_frames_enabled() {
        if alternate.directory.as_os_str().is_empty() {
            return Err(anyhow!("alternate_frames.directory must be non-empty"));
        }
    }
    Ok(())
}

/// Token from the environment, falling back to the config file.
pub fn resolve_access_token(config: &BotConfig) -> Result<String> {
    resolve_access_token_from(config, std::env::var(ACCESS_TOKEN_ENV).ok())
}

fn resolve_access_token_from(config: &BotConfig, env_value: Option<String>) -> Result<String> {
    env_value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            let token = config.facebook.access_token.trim();
            (!token.is_empty()).then(|| token.to_string())
        })
        .ok_or_else(|| {
            anyhow!("no access token: set facebook.access_token in config.json or {ACCESS_TOKEN_ENV}")
        })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
