use std::collections::HashSet;

use crate::models::event::FirewallEvent;
use crate::models::report::ReportResult;

/// Number of accepted events that triggers a notification flush.
pub const BATCH_CAPACITY: usize = 10;

/// Per-cycle state. Dropped at the end of every cycle.
#[derive(Debug, Default)]
pub struct RunState {
    /// IPs with a confirmed report this cycle.
    pub reported_ips: HashSet<String>,
    pub batch: PendingBatch,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_reported(&self, ip: &str) -> bool {
        self.reported_ips.contains(ip)
    }

    /// Returns false if the IP was already recorded.
    pub fn mark_reported(&mut self, ip: &str) -> bool {
        self.reported_ips.insert(ip.to_string())
    }
}

/// Accepted events awaiting notification, with report outcomes paired by
/// position when reporting is enabled.
///
/// A batch is filled either entirely through `push_unreported` or entirely
/// through `push_reported` within a cycle, so `reports` is empty or the same
/// length as `events`.
#[derive(Debug, Default)]
pub struct PendingBatch {
    events: Vec<FirewallEvent>,
    reports: Vec<Option<ReportResult>>,
}

impl PendingBatch {
    /// Queue an event when reporting is disabled.
    pub fn push_unreported(&mut self, event: FirewallEvent) {
        self.events.push(event);
    }

    /// Queue an event together with its report outcome. `None` records a
    /// report attempt that failed.
    pub fn push_reported(&mut self, event: FirewallEvent, report: Option<ReportResult>) {
        self.events.push(event);
        self.reports.push(report);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= BATCH_CAPACITY
    }

    /// Hand over the contents and leave the batch empty.
    pub fn take(&mut self) -> (Vec<FirewallEvent>, Vec<Option<ReportResult>>) {
        (
            std::mem::take(&mut self.events),
            std::mem::take(&mut self.reports),
        )
    }
}
