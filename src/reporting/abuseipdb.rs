use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use tracing::{debug, info, warn};

use super::comment::build_comment;
use crate::config::settings::AbuseIpdbConfig;
use crate::models::event::FirewallEvent;
use crate::models::report::{ReportResponse, ReportResult};
use crate::transport::client::{HttpRequest, HttpTransport};

/// Submits offending IPs to AbuseIPDB.
///
/// Every failure degrades to `None` with a logged diagnostic; nothing is
/// retried here.
pub struct Reporter {
    transport: Arc<dyn HttpTransport>,
    enabled: bool,
    endpoint: String,
    api_key: String,
    categories: String,
    custom_message: String,
    timeout: Duration,
}

impl Reporter {
    pub fn new(config: &AbuseIpdbConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            enabled: config.enabled,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            categories: config.categories.clone(),
            custom_message: config.custom_message.clone(),
            timeout: config.request_timeout(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn report(&self, event: &FirewallEvent) -> Option<ReportResult> {
        if !self.enabled {
            info!(ip = %event.client_ip, "Skipping report (reporting disabled)");
            return None;
        }

        let request = HttpRequest::form(
            self.endpoint.as_str(),
            vec![
                ("ip".to_string(), event.client_ip.clone()),
                ("categories".to_string(), self.categories.clone()),
                ("comment".to_string(), build_comment(event, &self.custom_message)),
            ],
        )
        .header("Accept", "application/json")
        .header("Key", self.api_key.as_str());

        let response = match tokio::time::timeout(self.timeout, self.transport.post(request)).await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                warn!(ip = %event.client_ip, error = %e, "Error reporting IP");
                return None;
            }
            Err(_) => {
                warn!(ip = %event.client_ip, "Report request timed out");
                return None;
            }
        };

        if response.status != StatusCode::OK {
            warn!(
                ip = %event.client_ip,
                status = response.status.as_u16(),
                "Report rejected"
            );
            return None;
        }

        match serde_json::from_slice::<ReportResponse>(&response.body) {
            Ok(decoded) => {
                info!(
                    ip = %event.client_ip,
                    confidence = ?decoded.data.abuse_confidence_score,
                    "Reported"
                );
                debug!(body = %String::from_utf8_lossy(&response.body), "Report response");
                Some(decoded.data)
            }
            Err(e) => {
                warn!(ip = %event.client_ip, error = %e, "Undecodable report response");
                None
            }
        }
    }
}
