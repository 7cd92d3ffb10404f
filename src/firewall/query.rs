//! Cloudflare GraphQL query document and response shape for
//! `firewallEventsAdaptive`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::json;

use super::FetchError;
use crate::models::event::FirewallEvent;

/// Maximum number of events requested per zone and window.
pub const EVENT_LIMIT: u32 = 1000;

const LIST_FIREWALL_EVENTS: &str = r#"query ListFirewallEvents($zoneTag: string, $filter: FirewallEventsAdaptiveFilter_InputObject) {
  viewer {
    zones(filter: { zoneTag: $zoneTag }) {
      firewallEventsAdaptive(
        filter: $filter
        limit: 1000
        orderBy: [datetime_DESC]
      ) {
        action
        clientASNDescription
        clientAsn
        clientCountryName
        clientIP
        clientRequestHTTPMethodName
        clientRequestHTTPProtocol
        clientRequestPath
        clientRequestQuery
        datetime
        rayName
        ruleId
        source
        userAgent
      }
    }
  }
}"#;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Slice of the event log to query. Analytics lag behind real time, so the
/// window ends `lag` before now and spans `span` back from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn ending_before(now: DateTime<Utc>, lag_secs: u64, span_secs: u64) -> Self {
        let end = now - ChronoDuration::seconds(lag_secs as i64);
        let start = end - ChronoDuration::seconds(span_secs as i64);
        Self { start, end }
    }

    pub fn start_param(&self) -> String {
        self.start.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Request body for one zone and window.
pub fn build_query(zone_id: &str, window: &TimeWindow) -> serde_json::Value {
    json!({
        "query": LIST_FIREWALL_EVENTS,
        "variables": {
            "zoneTag": zone_id,
            "filter": {
                "datetime_geq": window.start_param(),
                "datetime_leq": window.end_param(),
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<ResponseData>,

    #[serde(default)]
    pub errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub viewer: Option<Viewer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Viewer {
    #[serde(default)]
    pub zones: Vec<ZoneEvents>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneEvents {
    #[serde(rename = "firewallEventsAdaptive", default)]
    pub events: Option<Vec<FirewallEvent>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
}

impl GraphqlResponse {
    pub fn error_messages(&self) -> Vec<&str> {
        self.errors
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Walk `data.viewer.zones[0].firewallEventsAdaptive`.
    pub fn into_events(self) -> Result<Vec<FirewallEvent>, FetchError> {
        self.data
            .and_then(|d| d.viewer)
            .and_then(|v| v.zones.into_iter().next())
            .and_then(|z| z.events)
            .ok_or(FetchError::MissingEvents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_is_lagged_slice() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap();
        let window = TimeWindow::ending_before(now, 8 * 3600, 9000);
        assert_eq!(window.end_param(), "2024-05-01T12:00:00Z");
        assert_eq!(window.start_param(), "2024-05-01T09:30:00Z");
        assert_eq!((window.end - window.start).num_minutes(), 150);
    }

    #[test]
    fn test_query_carries_zone_and_window() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap();
        let window = TimeWindow::ending_before(now, 8 * 3600, 9000);
        let body = build_query("zone-123", &window);

        assert_eq!(body["variables"]["zoneTag"], "zone-123");
        assert_eq!(body["variables"]["filter"]["datetime_geq"], "2024-05-01T09:30:00Z");
        assert_eq!(body["variables"]["filter"]["datetime_leq"], "2024-05-01T12:00:00Z");
        let query = body["query"].as_str().unwrap();
        assert!(query.contains(&format!("limit: {}", EVENT_LIMIT)));
        assert!(query.contains("orderBy: [datetime_DESC]"));
    }

    #[test]
    fn test_into_events_happy_path() {
        let raw = r#"{"data":{"viewer":{"zones":[{"firewallEventsAdaptive":[
            {"action":"block","clientIP":"203.0.113.1"},
            {"action":"challenge","clientIP":"203.0.113.2"}
        ]}]}},"errors":null}"#;
        let response: GraphqlResponse = serde_json::from_str(raw).unwrap();
        assert!(response.error_messages().is_empty());
        let events = response.into_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].client_ip, "203.0.113.2");
    }

    #[test]
    fn test_missing_paths_are_reported() {
        for raw in [
            r#"{"data":null,"errors":[{"message":"zone not found"}]}"#,
            r#"{"data":{"viewer":null}}"#,
            r#"{"data":{"viewer":{"zones":[]}}}"#,
            r#"{"data":{"viewer":{"zones":[{}]}}}"#,
            r#"{}"#,
        ] {
            let response: GraphqlResponse = serde_json::from_str(raw).unwrap();
            assert!(
                matches!(response.into_events(), Err(FetchError::MissingEvents)),
                "expected missing events for {}",
                raw
            );
        }
    }
}
