pub mod fetcher;
pub mod query;

use http::StatusCode;

use crate::transport::client::TransportError;

/// Why a zone's events could not be obtained this cycle.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    #[error("undecodable response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response has no data.viewer.zones[0].firewallEventsAdaptive")]
    MissingEvents,

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}
