//! Daily pool assignment trigger
//!
//! Runs the engine for every unassigned event dated tomorrow in the business
//! time zone. Each event is bounded by its own timeout and a failure never
//! stops the remaining events.

use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Utc};
use tracing::info;

use crate::jobs::summary::{EventOutcome, JobSummary};
use crate::scheduling::PoolAssignmentEngine;
use crate::utils::errors::Result;
use crate::utils::helpers::{local_day_bounds, offset_from_minutes};

pub const JOB_NAME: &str = "assign-pools";

pub struct AssignPoolsJob {
    engine: PoolAssignmentEngine,
    offset: FixedOffset,
    per_event_timeout: Duration,
}

impl AssignPoolsJob {
    pub fn new(engine: PoolAssignmentEngine) -> Self {
        let config = engine.config();
        let offset = offset_from_minutes(config.utc_offset_minutes);
        let per_event_timeout = Duration::from_secs(config.per_event_timeout_secs);
        Self {
            engine,
            offset,
            per_event_timeout,
        }
    }

    pub async fn run(&self) -> Result<JobSummary> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<JobSummary> {
        let started = Instant::now();
        let mut summary = JobSummary::new(JOB_NAME, now);

        let (from, to) = local_day_bounds(now, self.offset, 1);
        let events = self.engine.store().events_pending_assignment(from, to).await?;
        info!(job = JOB_NAME, events = events.len(), from = %from, to = %to, "Events pending assignment");

        for event in events {
            let run = self.engine.assign_pools_at(event.id, now);
            let outcome = match tokio::time::timeout(self.per_event_timeout, run).await {
                Ok(Ok(assigned)) => EventOutcome::success(&event, assigned.notifications),
                Ok(Err(e)) if e.is_skip() => EventOutcome::skipped(&event, e.kind(), e.to_string()),
                Ok(Err(e)) => EventOutcome::failed(&event, e.kind(), e.to_string()),
                Err(_) => EventOutcome::timed_out(&event, self.per_event_timeout),
            };
            summary.record(outcome);
        }

        Ok(summary.finish(started.elapsed()))
    }
}
