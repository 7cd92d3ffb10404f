use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::filter::{accept, FilterRules};
use super::state::RunState;
use crate::config::settings::Settings;
use crate::firewall::fetcher::Fetcher;
use crate::firewall::query::EVENT_LIMIT;
use crate::firewall::FetchError;
use crate::models::event::FirewallEvent;
use crate::notify::discord::Notifier;
use crate::reporting::abuseipdb::Reporter;
use crate::transport::client::HttpTransport;
use crate::transport::sleeper::Sleeper;

/// Counters for one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub zones_processed: usize,
    pub zones_failed: usize,
    pub events_seen: usize,
    pub events_accepted: usize,
    pub reported_ips: usize,
    pub flushes: usize,
}

/// Drives fetch → filter → report → notify across all zones, once per
/// interval. Zones are processed one at a time in configured order, and the
/// dedup set and pending batch are shared across zones within a cycle.
pub struct CycleRunner {
    zone_ids: Vec<String>,
    rules: FilterRules,
    fetcher: Fetcher,
    reporter: Reporter,
    notifier: Notifier,
    sleeper: Arc<dyn Sleeper>,
    interval: Duration,
}

impl CycleRunner {
    pub fn new(
        settings: Arc<Settings>,
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            zone_ids: settings
                .cloudflare
                .zone_ids
                .iter()
                .map(|z| z.trim().to_string())
                .filter(|z| !z.is_empty())
                .collect(),
            rules: FilterRules::new(&settings.filter),
            fetcher: Fetcher::new(&settings.cloudflare, transport.clone(), sleeper.clone()),
            reporter: Reporter::new(&settings.abuseipdb, transport.clone()),
            notifier: Notifier::new(&settings.discord, transport),
            sleeper,
            interval: settings.schedule.interval(),
        }
    }

    /// Run cycles forever, sleeping `interval` after each one.
    pub async fn run(&self) {
        info!(
            zones = self.zone_ids.len(),
            action = %self.rules.action,
            whitelisted = self.rules.whitelist.len(),
            reporting = self.reporter.is_enabled(),
            notifications = self.notifier.is_active(),
            "Watcher running"
        );
        loop {
            self.run_cycle().await;
            info!(secs = self.interval.as_secs(), "Sleeping until next cycle");
            self.sleeper.sleep(self.interval).await;
        }
    }

    pub async fn run_cycle(&self) -> CycleSummary {
        let window = self.fetcher.current_window();
        info!("==================== Start ====================");
        info!(
            now = %Utc::now().format("%Y-%m-%d %H:%M:%S"),
            window_start = %window.start_param(),
            window_end = %window.end_param(),
            "Cycle started"
        );

        let mut state = RunState::new();
        let mut summary = CycleSummary::default();

        for zone_id in &self.zone_ids {
            info!(zone = %zone_id, "Processing zone");
            let events = match self.zone_events(zone_id).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(zone = %zone_id, error = %e, "Failed to get blocked IPs for zone");
                    summary.zones_failed += 1;
                    continue;
                }
            };
            summary.zones_processed += 1;
            summary.events_seen += events.len();
            info!(zone = %zone_id, total = events.len(), "Events found in zone");
            if events.len() >= EVENT_LIMIT as usize {
                warn!(zone = %zone_id, limit = EVENT_LIMIT, "Event limit reached; window may be truncated");
            }

            for event in events {
                if !accept(&event, &state, &self.rules) {
                    continue;
                }
                summary.events_accepted += 1;
                self.admit(event, &mut state).await;

                if state.batch.is_full() {
                    self.flush(&mut state, &mut summary).await;
                }
            }
        }

        if !state.batch.is_empty() {
            self.flush(&mut state, &mut summary).await;
        }

        summary.reported_ips = state.reported_ips.len();
        info!(
            reported = summary.reported_ips,
            zones_failed = summary.zones_failed,
            "Total unique IPs reported: {}",
            summary.reported_ips
        );
        info!("==================== End ====================");
        summary
    }

    async fn zone_events(&self, zone_id: &str) -> Result<Vec<FirewallEvent>, FetchError> {
        let response = self.fetcher.fetch(zone_id).await?;
        for message in response.error_messages() {
            warn!(zone = zone_id, error = message, "GraphQL error");
        }
        response.into_events()
    }

    /// Batch an accepted event, reporting it first when reporting is on.
    async fn admit(&self, event: FirewallEvent, state: &mut RunState) {
        info!(
            ip = %event.client_ip,
            location = %event.client_country,
            time = %event.datetime,
            "Accepted event"
        );

        if !self.reporter.is_enabled() {
            state.batch.push_unreported(event);
            return;
        }

        let result = self.reporter.report(&event).await;
        if result.is_some() {
            state.mark_reported(&event.client_ip);
        }
        state.batch.push_reported(event, result);
    }

    async fn flush(&self, state: &mut RunState, summary: &mut CycleSummary) {
        let size = state.batch.len();
        let (events, reports) = state.batch.take();
        let reports = self.reporter.is_enabled().then_some(reports.as_slice());
        self.notifier.notify(&events, reports).await;
        summary.flushes += 1;
        info!(events = size, "Batch flushed");
    }
}
