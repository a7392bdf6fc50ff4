//! Aggregate result of a trigger run

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Event;
use crate::services::DeliveryReport;
use crate::utils::helpers::generate_uuid;
use crate::utils::logging::log_job_summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failed,
    Skipped,
}

/// Result for one event within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventOutcome {
    pub event_id: i64,
    pub title: String,
    pub status: OutcomeStatus,
    /// Error kind for failed and skipped events
    pub reason: Option<String>,
    pub detail: Option<String>,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

impl EventOutcome {
    fn new(event: &Event, status: OutcomeStatus) -> Self {
        Self {
            event_id: event.id,
            title: event.title.clone(),
            status,
            reason: None,
            detail: None,
            notifications_sent: 0,
            notifications_failed: 0,
        }
    }

    pub fn success(event: &Event, notifications: DeliveryReport) -> Self {
        Self {
            notifications_sent: notifications.sent,
            notifications_failed: notifications.failed,
            ..Self::new(event, OutcomeStatus::Success)
        }
    }

    pub fn skipped(event: &Event, reason: &str, detail: String) -> Self {
        Self {
            reason: Some(reason.to_string()),
            detail: Some(detail),
            ..Self::new(event, OutcomeStatus::Skipped)
        }
    }

    pub fn failed(event: &Event, reason: &str, detail: String) -> Self {
        Self {
            reason: Some(reason.to_string()),
            detail: Some(detail),
            ..Self::new(event, OutcomeStatus::Failed)
        }
    }

    pub fn timed_out(event: &Event, limit: Duration) -> Self {
        Self::failed(event, "Timeout", format!("processing exceeded {}s", limit.as_secs()))
    }
}

/// Per-run report returned by both triggers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub run_id: String,
    pub job: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<EventOutcome>,
}

impl JobSummary {
    pub fn new(job: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: generate_uuid(),
            job: job.to_string(),
            started_at,
            duration_ms: 0,
            total: 0,
            success: 0,
            failed: 0,
            skipped: 0,
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: EventOutcome) {
        self.total += 1;
        match outcome.status {
            OutcomeStatus::Success => self.success += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
        }
        self.results.push(outcome);
    }

    /// Stamp the duration and log the totals
    pub fn finish(mut self, elapsed: Duration) -> Self {
        self.duration_ms = elapsed.as_millis() as u64;
        log_job_summary(&self.job, self.total, self.success, self.failed, self.skipped, self.duration_ms);
        self
    }

    pub fn outcome(&self, event_id: i64) -> Option<&EventOutcome> {
        self.results.iter().find(|r| r.event_id == event_id)
    }
}
