use std::collections::HashSet;

use super::state::RunState;
use crate::config::settings::FilterConfig;
use crate::models::event::FirewallEvent;

/// Static admission rules: the action to match and IPs never reported.
#[derive(Debug, Clone)]
pub struct FilterRules {
    pub action: String,
    pub whitelist: HashSet<String>,
}

impl FilterRules {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            action: config.action.trim().to_string(),
            whitelist: config.whitelisted_ips.clone(),
        }
    }

    pub fn is_whitelisted(&self, ip: &str) -> bool {
        self.whitelist.contains(ip)
    }
}

/// Whether `event` should be batched (and reported) this cycle.
pub fn accept(event: &FirewallEvent, state: &RunState, rules: &FilterRules) -> bool {
    event.action == rules.action
        && !state.is_reported(&event.client_ip)
        && !rules.is_whitelisted(&event.client_ip)
}
