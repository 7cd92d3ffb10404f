//! Discord embed rendering for batches of firewall events.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::event::FirewallEvent;
use crate::models::report::ReportResult;
use crate::reporting::comment::truncate_chars;

/// Discord allows at most this many embeds per message.
pub const EMBEDS_PER_MESSAGE: usize = 10;

/// Discord caps embed field values at 1024 characters.
pub const FIELD_VALUE_LIMIT: usize = 1024;

/// Discord caps the combined text of all embeds in one message.
pub const MESSAGE_CHAR_LIMIT: usize = 6000;

/// Stand-in for values Discord would reject as blank.
const EMPTY_VALUE: &str = "-";

/// Per-event path budget inside the grouped detail listing.
pub const DETAIL_PATH_LIMIT: usize = 256;

const EMBED_COLOR: u32 = 0xFF0000;
const REGIONAL_INDICATOR_A: u32 = 0x1F1E6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Embed {
    /// Characters counted against [`MESSAGE_CHAR_LIMIT`].
    pub fn char_count(&self) -> usize {
        self.title.chars().count()
            + self
                .fields
                .iter()
                .map(|f| f.name.chars().count() + f.value.chars().count())
                .sum::<usize>()
    }
}

impl EmbedField {
    fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        let mut value = value.into();
        if value.trim().is_empty() {
            value = EMPTY_VALUE.to_string();
        }
        Self {
            name: name.to_string(),
            value,
            inline,
        }
    }
}

/// Split embeds into webhook messages that respect both the per-message
/// embed count and the combined character limit. An embed that alone
/// exceeds the character limit still gets a message of its own.
pub fn chunk_embeds(embeds: &[Embed]) -> Vec<&[Embed]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chars = 0;
    for (i, embed) in embeds.iter().enumerate() {
        let size = embed.char_count();
        let count = i - start;
        if count > 0 && (count == EMBEDS_PER_MESSAGE || chars + size > MESSAGE_CHAR_LIMIT) {
            chunks.push(&embeds[start..i]);
            start = i;
            chars = 0;
        }
        chars += size;
    }
    if start < embeds.len() {
        chunks.push(&embeds[start..]);
    }
    chunks
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookMessage<'a> {
    pub embeds: &'a [Embed],
}

/// Flag emoji for a two-letter country code, built by shifting each letter
/// into the regional-indicator block. Non-letters pass through unchanged.
pub fn country_flag(country_code: &str) -> String {
    country_code
        .chars()
        .map(|c| {
            let upper = c.to_ascii_uppercase();
            if upper.is_ascii_uppercase() {
                char::from_u32(REGIONAL_INDICATOR_A + (upper as u32 - 'A' as u32)).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

fn identity_fields(event: &FirewallEvent) -> Vec<EmbedField> {
    vec![
        EmbedField::new("IP Address", event.client_ip.as_str(), true),
        EmbedField::new(
            "Country",
            format!("{} {}", country_flag(&event.client_country), event.client_country),
            true,
        ),
        EmbedField::new(
            "ASN",
            format!("{} ({})", event.client_asn, event.client_asn_description),
            false,
        ),
    ]
}

/// One embed per distinct IP, in order of first appearance.
pub fn render_grouped(events: &[FirewallEvent]) -> Vec<Embed> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_ip: HashMap<&str, Vec<&FirewallEvent>> = HashMap::new();
    for event in events {
        let ip = event.client_ip.as_str();
        by_ip
            .entry(ip)
            .or_insert_with(|| {
                order.push(ip);
                Vec::new()
            })
            .push(event);
    }

    order
        .into_iter()
        .filter_map(|ip| by_ip.remove(ip))
        .map(|group| {
            let first = group[0];
            let mut fields = identity_fields(first);
            fields.push(EmbedField::new("Total Events", group.len().to_string(), true));
            fields.push(EmbedField::new("Event Details", event_details(&group), false));

            Embed {
                title: "WAF Events Detected".to_string(),
                color: EMBED_COLOR,
                fields,
                timestamp: first.datetime.clone(),
            }
        })
        .collect()
}

fn event_details(group: &[&FirewallEvent]) -> String {
    let mut lines = Vec::with_capacity(group.len() * 5);
    for (idx, event) in group.iter().enumerate() {
        lines.push(format!("Event {}:", idx + 1));
        lines.push(format!("Action: {}", event.action));
        lines.push(format!("Source: {}", event.source));
        lines.push(format!("Path: {}", truncate_chars(&event.path, DETAIL_PATH_LIMIT)));
        lines.push(format!("Time: {}\n", event.datetime));
    }
    truncate_chars(&lines.join("\n"), FIELD_VALUE_LIMIT)
}

/// One embed per event, with the paired report outcome when present.
pub fn render_per_event(events: &[FirewallEvent], reports: &[Option<ReportResult>]) -> Vec<Embed> {
    events
        .iter()
        .enumerate()
        .map(|(i, event)| {
            let mut fields = identity_fields(event);
            fields.push(EmbedField::new("Action", event.action.as_str(), true));
            fields.push(EmbedField::new("Source", event.source.as_str(), true));
            fields.push(EmbedField::new("Method", event.method.as_str(), true));
            fields.push(EmbedField::new(
                "Path",
                truncate_chars(&event.path, FIELD_VALUE_LIMIT),
                false,
            ));

            if let Some(Some(report)) = reports.get(i) {
                fields.push(EmbedField::new("AbuseIPDB Report", report_summary(report), false));
            }

            Embed {
                title: "WAF Event Reported to AbuseIPDB".to_string(),
                color: EMBED_COLOR,
                fields,
                timestamp: event.datetime.clone(),
            }
        })
        .collect()
}

fn report_summary(report: &ReportResult) -> String {
    let number = report
        .report_number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    let confidence = report
        .abuse_confidence_score
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("Report #{} - Confidence: {}%", number, confidence)
}
