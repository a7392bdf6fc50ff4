//! Storage seam used by the scheduling core

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Event, EventDetails, NewAssignment, PoolAssignment, Trainer};
use crate::utils::errors::StoreResult;

/// Persistence operations the scheduling core depends on.
///
/// `commit_assignment` is the only writer of pools, pool attendees and the
/// `pools_assigned` flag. It is atomic: either every row is written and the
/// event moves to `Assigned`, or nothing is written.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Load an event with registrants, trainers and pools
    async fn load_event(&self, event_id: i64) -> StoreResult<Option<EventDetails>>;

    /// Unassigned events dated within `[from, to]`
    async fn events_pending_assignment(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Event>>;

    /// Assigned events dated within `[from, to]` whose same-day reminder is not sent
    async fn events_pending_reminder(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Event>>;

    /// Create the pool and its attendees and flip the event to assigned.
    ///
    /// Fails with `StoreError::AlreadyAssigned` when the event was assigned
    /// by a concurrent run.
    async fn commit_assignment(&self, assignment: &NewAssignment) -> StoreResult<PoolAssignment>;

    async fn mark_reminder_sent(&self, event_id: i64) -> StoreResult<()>;

    /// Link trainers to an event, returning only the ones not linked before
    async fn attach_trainers(&self, event_id: i64, trainer_ids: &[i64]) -> StoreResult<Vec<Trainer>>;

    /// Set the pool trainer unless one is already set
    async fn set_pool_trainer(&self, pool_id: i64, trainer_id: i64) -> StoreResult<()>;
}

/// Writes performed by an assignment commit, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    PoolInsert,
    AttendeeInsert,
    EventUpdate,
}

impl std::fmt::Display for CommitStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitStep::PoolInsert => write!(f, "pool insert"),
            CommitStep::AttendeeInsert => write!(f, "attendee insert"),
            CommitStep::EventUpdate => write!(f, "event update"),
        }
    }
}
