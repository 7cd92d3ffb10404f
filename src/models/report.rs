use serde::Deserialize;

/// Body of a successful AbuseIPDB `/report` call.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportResponse {
    pub data: ReportResult,
}

/// Outcome of one accepted abuse report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    #[serde(default)]
    pub ip_address: String,

    #[serde(default)]
    pub report_number: Option<u64>,

    #[serde(default)]
    pub abuse_confidence_score: Option<u32>,
}
