use crate::application_port::{BlockPolicy, BlockingPolicy, GuardOptions};
use crate::infra_http::HttpGatewayConfig;
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log: Log,
    pub guard: Guard,
    pub http: Http,
    pub backend: Backend,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize)]
pub struct Guard {
    pub gateway: String,  // "http" or "local"
    pub blocking: String, // "enabled" or "disabled"
    #[serde(default = "default_true")]
    pub recheck_on_expiry: bool,
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Backend {
    pub address: String,
    pub max_attempts: u32,
    pub block_minutes: u64,
    #[serde(default = "default_attempt_window_minutes")]
    pub attempt_window_minutes: u64,
    pub single_session: bool,
    pub hasher: String, // "argon2" or "fake"
    pub token_ttl_secs: u64,
    pub signing_key: String,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
}

fn default_true() -> bool {
    true
}

fn default_tick_millis() -> u64 {
    1000
}

fn default_attempt_window_minutes() -> u64 {
    15
}

/// One week.
const MAX_WINDOW_MINUTES: u64 = 7 * 24 * 60;

impl Guard {
    pub fn options(&self) -> Result<GuardOptions> {
        if self.tick_millis == 0 {
            return Err(anyhow!("guard.tick_millis must be positive"));
        }
        Ok(GuardOptions {
            policy: self.blocking.parse::<BlockingPolicy>()?,
            recheck_on_expiry: self.recheck_on_expiry,
            tick: Duration::from_millis(self.tick_millis),
        })
    }
}

impl Http {
    pub fn gateway_config(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl Backend {
    pub fn policy(&self) -> Result<BlockPolicy> {
        if self.max_attempts == 0 {
            return Err(anyhow!("backend.max_attempts must be positive"));
        }
        for (key, minutes) in [
            ("block_minutes", self.block_minutes),
            ("attempt_window_minutes", self.attempt_window_minutes),
        ] {
            if !(1..=MAX_WINDOW_MINUTES).contains(&minutes) {
                return Err(anyhow!(
                    "backend.{} must be between 1 and {}",
                    key,
                    MAX_WINDOW_MINUTES
                ));
            }
        }
        Ok(BlockPolicy {
            max_attempts: self.max_attempts,
            block_duration: Duration::from_secs(self.block_minutes * 60),
            attempt_window: Duration::from_secs(self.attempt_window_minutes * 60),
            single_session: self.single_session,
        })
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "LOGIN_GUARD";

/// Loads the TOML file at `path` (or the build's default) and applies
/// `LOGIN_GUARD_SECTION__KEY` environment overrides on top.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
