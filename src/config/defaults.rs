use super::settings::{AbuseIpdbConfig, DiscordConfig, LoggingConfig, ScheduleConfig};

// ---------------------------------------------------------------------------
// Section defaults
// ---------------------------------------------------------------------------

pub fn default_abuseipdb_config() -> AbuseIpdbConfig {
    AbuseIpdbConfig {
        enabled: default_true(),
        api_key: String::new(),
        endpoint: default_report_endpoint(),
        categories: default_report_categories(),
        custom_message: String::new(),
        request_timeout_secs: default_report_timeout_secs(),
    }
}

pub fn default_discord_config() -> DiscordConfig {
    DiscordConfig {
        enabled: default_true(),
        webhook_url: String::new(),
        request_timeout_secs: default_webhook_timeout_secs(),
    }
}

pub fn default_schedule_config() -> ScheduleConfig {
    ScheduleConfig {
        interval_secs: default_interval_secs(),
    }
}

pub fn default_logging_config() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        format: default_log_format(),
        file: None,
    }
}

pub fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// CloudflareConfig field defaults
// ---------------------------------------------------------------------------

pub fn default_graphql_endpoint() -> String {
    "https://api.cloudflare.com/client/v4/graphql/".to_string()
}

pub fn default_fetch_timeout_secs() -> u64 {
    30
}

pub fn default_max_attempts() -> u32 {
    3
}

pub fn default_window_lag_secs() -> u64 {
    8 * 60 * 60
}

pub fn default_window_span_secs() -> u64 {
    // 2.5 hours
    150 * 60
}

// ---------------------------------------------------------------------------
// AbuseIpdbConfig field defaults
// ---------------------------------------------------------------------------

pub fn default_report_endpoint() -> String {
    "https://api.abuseipdb.com/api/v2/report".to_string()
}

pub fn default_report_categories() -> String {
    // Brute-Force, Web App Attack
    "10,19".to_string()
}

pub fn default_report_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// DiscordConfig / ScheduleConfig / LoggingConfig field defaults
// ---------------------------------------------------------------------------

pub fn default_webhook_timeout_secs() -> u64 {
    10
}

pub fn default_interval_secs() -> u64 {
    3600
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "text".to_string()
}
