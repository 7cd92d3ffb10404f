use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use super::query::{build_query, GraphqlResponse, TimeWindow};
use super::FetchError;
use crate::config::settings::CloudflareConfig;
use crate::transport::client::{HttpRequest, HttpTransport};
use crate::transport::sleeper::{backoff_delay, Sleeper};

/// Pulls recent firewall events for one zone from the GraphQL analytics API,
/// retrying failed attempts with exponential backoff.
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    endpoint: String,
    email: String,
    api_key: String,
    timeout: Duration,
    max_attempts: u32,
    window_lag_secs: u64,
    window_span_secs: u64,
}

impl Fetcher {
    pub fn new(
        config: &CloudflareConfig,
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            sleeper,
            endpoint: config.endpoint.clone(),
            email: config.email.clone(),
            api_key: config.api_key.clone(),
            timeout: config.request_timeout(),
            max_attempts: config.max_attempts.max(1),
            window_lag_secs: config.window_lag_secs,
            window_span_secs: config.window_span_secs,
        }
    }

    /// The window a fetch started now would query.
    pub fn current_window(&self) -> TimeWindow {
        TimeWindow::ending_before(Utc::now(), self.window_lag_secs, self.window_span_secs)
    }

    /// Fetch the decoded response for `zone_id`.
    ///
    /// Attempt `i` (0-indexed) that fails is followed by a `2^i` second pause;
    /// the last failure is returned without pausing.
    pub async fn fetch(&self, zone_id: &str) -> Result<GraphqlResponse, FetchError> {
        let window = self.current_window();
        let body = build_query(zone_id, &window);
        debug!(
            zone = zone_id,
            start = %window.start_param(),
            end = %window.end_param(),
            "Querying firewall events"
        );

        let mut attempt = 0;
        loop {
            match self.attempt(&body).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        zone = zone_id,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Firewall event query failed"
                    );
                    if attempt + 1 >= self.max_attempts {
                        warn!(zone = zone_id, "Max retries reached, giving up");
                        return Err(FetchError::RetriesExhausted {
                            attempts: self.max_attempts,
                            last: Box::new(e),
                        });
                    }
                    self.sleeper.sleep(backoff_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, body: &serde_json::Value) -> Result<GraphqlResponse, FetchError> {
        let request = HttpRequest::json(self.endpoint.as_str(), body.clone())
            .header("X-Auth-Key", self.api_key.as_str())
            .header("X-Auth-Email", self.email.as_str());

        let response = tokio::time::timeout(self.timeout, self.transport.post(request))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout.as_secs()))??;

        if !response.status.is_success() {
            return Err(FetchError::Status(response.status));
        }

        Ok(serde_json::from_slice(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;
    use crate::transport::mock::{MockTransport, RecordingSleeper};
    use serde_json::json;

    const ENDPOINT: &str = "https://api.cloudflare.com/client/v4/graphql/";

    fn config() -> CloudflareConfig {
        let settings = Settings::from_toml(
            r#"
            [cloudflare]
            zone_ids = ["zone-a"]
            email = "ops@example.com"
            api_key = "cf-key"
            [filter]
            action = "block"
            "#,
        )
        .unwrap();
        settings.cloudflare
    }

    fn events_body() -> serde_json::Value {
        json!({"data": {"viewer": {"zones": [{"firewallEventsAdaptive": [
            {"action": "block", "clientIP": "203.0.113.9"}
        ]}]}}})
    }

    #[tokio::test]
    async fn test_fetch_sends_credentials_and_query() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(ENDPOINT, 200, events_body());
        let sleeper = Arc::new(RecordingSleeper::new());
        let fetcher = Fetcher::new(&config(), transport.clone(), sleeper.clone());

        let response = fetcher.fetch("zone-a").await.unwrap();
        assert_eq!(response.into_events().unwrap().len(), 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header_value("X-Auth-Key"), Some("cf-key"));
        assert_eq!(requests[0].header_value("X-Auth-Email"), Some("ops@example.com"));
        match &requests[0].body {
            crate::transport::client::RequestBody::Json(body) => {
                assert_eq!(body["variables"]["zoneTag"], "zone-a");
            }
            other => panic!("expected JSON body, got {:?}", other),
        }
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn test_two_failures_then_success_backs_off_one_then_two_seconds() {
        let transport = Arc::new(MockTransport::new());
        transport
            .fail(ENDPOINT)
            .respond(ENDPOINT, 502, json!({"error": "bad gateway"}))
            .respond(ENDPOINT, 200, events_body());
        let sleeper = Arc::new(RecordingSleeper::new());
        let fetcher = Fetcher::new(&config(), transport.clone(), sleeper.clone());

        let response = fetcher.fetch("zone-a").await.unwrap();
        assert_eq!(response.into_events().unwrap()[0].client_ip, "203.0.113.9");
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let transport = Arc::new(MockTransport::new());
        transport.always(ENDPOINT, 500, json!({}));
        let sleeper = Arc::new(RecordingSleeper::new());
        let fetcher = Fetcher::new(&config(), transport.clone(), sleeper.clone());

        let err = fetcher.fetch("zone-a").await.unwrap_err();
        match err {
            FetchError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Status(s) if s.as_u16() == 500));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_undecodable_body_is_retried() {
        let transport = Arc::new(MockTransport::new());
        transport
            .respond_raw(ENDPOINT, 200, "<html>maintenance</html>")
            .respond(ENDPOINT, 200, events_body());
        let sleeper = Arc::new(RecordingSleeper::new());
        let fetcher = Fetcher::new(&config(), transport.clone(), sleeper.clone());

        assert!(fetcher.fetch("zone-a").await.is_ok());
        assert_eq!(sleeper.slept(), vec![Duration::from_secs(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_request_times_out() {
        struct Hang;

        #[async_trait::async_trait]
        impl HttpTransport for Hang {
            async fn post(
                &self,
                _request: HttpRequest,
            ) -> Result<crate::transport::client::HttpResponse, crate::transport::client::TransportError>
            {
                std::future::pending().await
            }
        }

        let mut cfg = config();
        cfg.max_attempts = 1;
        let fetcher = Fetcher::new(&cfg, Arc::new(Hang), Arc::new(RecordingSleeper::new()));

        let err = fetcher.fetch("zone-a").await.unwrap_err();
        match err {
            FetchError::RetriesExhausted { last, .. } => {
                assert!(matches!(*last, FetchError::Timeout(30)));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
