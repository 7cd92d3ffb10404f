use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::embed::{chunk_embeds, render_grouped, render_per_event, Embed, WebhookMessage};
use crate::config::settings::DiscordConfig;
use crate::models::event::FirewallEvent;
use crate::models::report::ReportResult;
use crate::transport::client::{HttpRequest, HttpTransport};

/// Delivers batches of events to a Discord webhook.
///
/// Rendering depends on whether reports accompany the batch: with reports,
/// one card per event; without, one card per IP. Cards are chunked under
/// Discord's per-message count and character limits. Each chunk is an
/// independent request and a failed chunk does not stop the rest.
pub struct Notifier {
    transport: Arc<dyn HttpTransport>,
    webhook_url: Option<String>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(config: &DiscordConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let webhook_url = if config.enabled && !config.webhook_url.is_empty() {
            Some(config.webhook_url.clone())
        } else {
            None
        };
        Self {
            transport,
            webhook_url,
            timeout: config.request_timeout(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Returns the number of chunks accepted by the webhook.
    pub async fn notify(
        &self,
        events: &[FirewallEvent],
        reports: Option<&[Option<ReportResult>]>,
    ) -> usize {
        let url = match &self.webhook_url {
            Some(u) => u,
            None => return 0,
        };
        if events.is_empty() {
            return 0;
        }

        let embeds = match reports {
            Some(reports) => render_per_event(events, reports),
            None => render_grouped(events),
        };

        let mut delivered = 0;
        for chunk in chunk_embeds(&embeds) {
            if self.send_chunk(url, chunk).await {
                delivered += 1;
            }
        }
        info!(
            events = events.len(),
            embeds = embeds.len(),
            delivered_chunks = delivered,
            "Discord notification sent"
        );
        delivered
    }

    async fn send_chunk(&self, url: &str, chunk: &[Embed]) -> bool {
        let body = match serde_json::to_value(WebhookMessage { embeds: chunk }) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Failed to encode Discord payload");
                return false;
            }
        };
        let request = HttpRequest::json(url, body);

        match tokio::time::timeout(self.timeout, self.transport.post(request)).await {
            Ok(Ok(resp)) if resp.status.is_success() => {
                debug!(status = resp.status.as_u16(), embeds = chunk.len(), "Webhook chunk delivered");
                true
            }
            Ok(Ok(resp)) => {
                warn!(
                    status = resp.status.as_u16(),
                    body = %String::from_utf8_lossy(&resp.body),
                    "Discord webhook rejected notification"
                );
                false
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to send Discord notification");
                false
            }
            Err(_) => {
                warn!("Discord webhook request timed out");
                false
            }
        }
    }
}
