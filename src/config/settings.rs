use std::collections::HashSet;
use std::fs;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};

use super::defaults;

/// Upper bound on fetch attempts per zone. Every backoff delay up to this
/// bound is an exact power of two.
pub const MAX_FETCH_ATTEMPTS: u32 = 10;

/// Upper bound on `window_lag_secs + window_span_secs` (30 days).
pub const MAX_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Top-level configuration for wafwatch.
/// Deserializes from a TOML configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub cloudflare: CloudflareConfig,

    #[serde(default = "defaults::default_abuseipdb_config")]
    pub abuseipdb: AbuseIpdbConfig,

    #[serde(default = "defaults::default_discord_config")]
    pub discord: DiscordConfig,

    pub filter: FilterConfig,

    #[serde(default = "defaults::default_schedule_config")]
    pub schedule: ScheduleConfig,

    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let settings = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace secrets with values from the process environment when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets: [(&str, &mut String); 4] = [
            ("CLOUDFLARE_EMAIL", &mut self.cloudflare.email),
            ("CLOUDFLARE_API_KEY", &mut self.cloudflare.api_key),
            ("ABUSEIPDB_API_KEY", &mut self.abuseipdb.api_key),
            ("DISCORD_WEBHOOK_URL", &mut self.discord.webhook_url),
        ];
        for (key, slot) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value.trim().to_string();
            }
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cloudflare.zone_ids.iter().all(|z| z.trim().is_empty()) {
            bail!("cloudflare.zone_ids must list at least one zone");
        }
        if self.cloudflare.email.is_empty() || self.cloudflare.api_key.is_empty() {
            bail!("cloudflare.email and cloudflare.api_key are required");
        }
        if self.cloudflare.max_attempts == 0 {
            bail!("cloudflare.max_attempts must be at least 1");
        }
        if self.cloudflare.max_attempts > MAX_FETCH_ATTEMPTS {
            bail!(
                "cloudflare.max_attempts must be at most {}, got {}",
                MAX_FETCH_ATTEMPTS,
                self.cloudflare.max_attempts
            );
        }
        if self.cloudflare.window_span_secs == 0 {
            bail!("cloudflare.window_span_secs must be at least 1");
        }
        let reach = self
            .cloudflare
            .window_lag_secs
            .checked_add(self.cloudflare.window_span_secs);
        if reach.map_or(true, |secs| secs > MAX_WINDOW_SECS) {
            bail!(
                "cloudflare.window_lag_secs + window_span_secs must be at most {} seconds",
                MAX_WINDOW_SECS
            );
        }
        if self.filter.action.trim().is_empty() {
            bail!("filter.action is required");
        }
        if self.abuseipdb.enabled && self.abuseipdb.api_key.is_empty() {
            bail!("abuseipdb.api_key is required while reporting is enabled");
        }
        Ok(())
    }
}

/// Cloudflare GraphQL analytics access.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareConfig {
    pub zone_ids: Vec<String>,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "defaults::default_graphql_endpoint")]
    pub endpoint: String,

    #[serde(default = "defaults::default_fetch_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "defaults::default_max_attempts")]
    pub max_attempts: u32,

    /// How far behind "now" the query window ends.
    #[serde(default = "defaults::default_window_lag_secs")]
    pub window_lag_secs: u64,

    #[serde(default = "defaults::default_window_span_secs")]
    pub window_span_secs: u64,
}

impl CloudflareConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// AbuseIPDB reporting.
#[derive(Debug, Clone, Deserialize)]
pub struct AbuseIpdbConfig {
    #[serde(default = "defaults::default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "defaults::default_report_endpoint")]
    pub endpoint: String,

    #[serde(default = "defaults::default_report_categories")]
    pub categories: String,

    /// Appended to every report comment.
    #[serde(default)]
    pub custom_message: String,

    #[serde(default = "defaults::default_report_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl AbuseIpdbConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Discord webhook notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default = "defaults::default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub webhook_url: String,

    #[serde(default = "defaults::default_webhook_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl DiscordConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Which events qualify for reporting.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Firewall action to match, e.g. "block".
    pub action: String,

    /// Comma-separated list of IPs that are never reported.
    #[serde(default, deserialize_with = "comma_separated")]
    pub whitelisted_ips: HashSet<String>,
}

/// Cycle cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "defaults::default_interval_secs")]
    pub interval_secs: u64,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    pub level: String,

    /// "text" or "json".
    #[serde(default = "defaults::default_log_format")]
    pub format: String,

    /// Optional log file in addition to stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn comma_separated<'de, D>(deserializer: D) -> Result<HashSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_ip_list(&raw))
}

pub fn parse_ip_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
