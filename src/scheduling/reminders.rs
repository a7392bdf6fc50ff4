//! Same-day reminder pass
//!
//! Invoked twice a day with an explicit run window. An event is due in the
//! window its start hour falls into; an unparseable time is always due.
//! `reminder2_sent` is set once every recipient was attempted, whatever the
//! individual outcomes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::SchedulingConfig;
use crate::database::EventStore;
use crate::jobs::summary::{EventOutcome, JobSummary};
use crate::models::Event;
use crate::scheduling::cascade::NotificationCascade;
use crate::scheduling::time_range::TimeRange;
use crate::services::{DeliveryReport, TemplateMessage};
use crate::utils::errors::{PoolMateError, ReminderError, Result, StoreError};
use crate::utils::helpers::{local_day_bounds, offset_from_minutes};

pub const JOB_NAME: &str = "send-reminders";

/// Half of the day a reminder run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunWindow {
    /// Events starting before noon
    Morning,
    /// Events starting at noon or later
    Evening,
}

impl RunWindow {
    /// Whether an event starting at `start_hour` is due in this window
    pub fn admits(&self, start_hour: Option<u32>) -> bool {
        match (self, start_hour) {
            (_, None) => true,
            (RunWindow::Morning, Some(hour)) => hour < 12,
            (RunWindow::Evening, Some(hour)) => hour >= 12,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunWindow::Morning => "morning",
            RunWindow::Evening => "evening",
        }
    }
}

impl fmt::Display for RunWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunWindow {
    type Err = PoolMateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(RunWindow::Morning),
            "evening" => Ok(RunWindow::Evening),
            other => Err(PoolMateError::InvalidInput(format!("unknown run window: {}", other))),
        }
    }
}

#[derive(Clone)]
pub struct ReminderScheduler {
    store: Arc<dyn EventStore>,
    cascade: NotificationCascade,
    offset: FixedOffset,
    per_event_timeout: Duration,
}

impl ReminderScheduler {
    pub fn new(store: Arc<dyn EventStore>, cascade: NotificationCascade, config: &SchedulingConfig) -> Self {
        Self {
            store,
            cascade,
            offset: offset_from_minutes(config.utc_offset_minutes),
            per_event_timeout: Duration::from_secs(config.per_event_timeout_secs),
        }
    }

    pub async fn send_due_reminders(&self, window: RunWindow) -> Result<JobSummary> {
        self.send_due_reminders_at(window, Utc::now()).await
    }

    /// Remind every assigned, not yet reminded event dated today relative to `now`
    pub async fn send_due_reminders_at(&self, window: RunWindow, now: DateTime<Utc>) -> Result<JobSummary> {
        let started = Instant::now();
        let mut summary = JobSummary::new(JOB_NAME, now);

        let (from, to) = local_day_bounds(now, self.offset, 0);
        let events = self.store.events_pending_reminder(from, to).await?;
        info!(job = JOB_NAME, window = %window, events = events.len(), "Events pending reminder");

        for event in events {
            let outcome = match tokio::time::timeout(self.per_event_timeout, self.remind(&event, window)).await {
                Ok(Ok(report)) => EventOutcome::success(&event, report),
                Ok(Err(e)) if e.is_skip() => EventOutcome::skipped(&event, e.kind(), e.to_string()),
                Ok(Err(e)) => {
                    if let ReminderError::NoMeetLink { event: snapshot } = &e {
                        error!(event_id = snapshot.id, "Assigned event has no meeting link");
                        self.cascade.escalate(snapshot, &e.to_string()).await;
                    }
                    EventOutcome::failed(&event, e.kind(), e.to_string())
                }
                Err(_) => EventOutcome::timed_out(&event, self.per_event_timeout),
            };
            summary.record(outcome);
        }

        Ok(summary.finish(started.elapsed()))
    }

    async fn remind(&self, event: &Event, window: RunWindow) -> std::result::Result<DeliveryReport, ReminderError> {
        let start_hour = TimeRange::parse(&event.event_time).map(|range| range.start_hour);
        if !window.admits(start_hour) {
            return Err(ReminderError::WrongWindow {
                event: event.snapshot(),
                window: window.to_string(),
            });
        }

        let details = self
            .store
            .load_event(event.id)
            .await?
            .ok_or(StoreError::EventNotFound { event_id: event.id })?;
        let Some(shared_link) = details.pool_with_meet_link().and_then(|p| p.pool.meet_link.as_deref()) else {
            return Err(ReminderError::NoMeetLink { event: event.snapshot() });
        };

        let mut report = DeliveryReport::default();
        for user in &details.registrants {
            let link = details.personal_link(user.id).unwrap_or(shared_link);
            let message = TemplateMessage::reminder_user(&user.name, &event.title, &event.event_time, link);
            self.cascade.deliver(event.id, user.phone_number.as_deref(), &message, &mut report).await;
        }
        for trainer in &details.trainers {
            let message = TemplateMessage::reminder_trainer(&trainer.name, &event.title, &event.event_time, shared_link);
            self.cascade.deliver(event.id, trainer.phone_number.as_deref(), &message, &mut report).await;
        }

        self.store.mark_reminder_sent(event.id).await?;
        info!(
            event_id = event.id,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Same-day reminders sent"
        );
        Ok(report)
    }
}
