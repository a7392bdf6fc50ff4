//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::pool::{Pool, PoolAttendee};
use super::user::{Trainer, User};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub event_date: DateTime<Utc>,
    /// Free-text range such as "10:00 AM - 2:00 PM"
    pub event_time: String,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub max_capacity: Option<i32>,
    pub pool_capacity: Option<i32>,
    pub pools_assigned: bool,
    pub reminder2_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Current position in the `Unassigned -> Assigned` lifecycle
    pub fn assignment_state(&self) -> AssignmentState {
        if self.pools_assigned {
            AssignmentState::Assigned
        } else {
            AssignmentState::Unassigned
        }
    }

    /// True once the registration deadline is set and strictly before `now`
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.registration_deadline, Some(deadline) if deadline < now)
    }

    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            id: self.id,
            title: self.title.clone(),
            event_date: self.event_date,
            event_time: self.event_time.clone(),
        }
    }
}

/// Pool assignment lifecycle of an event. The only transition is
/// `Unassigned -> Assigned`, performed by the assignment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentState {
    Unassigned,
    Assigned,
}

/// The event fields needed to describe a failure to an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub id: i64,
    pub title: String,
    pub event_date: DateTime<Utc>,
    pub event_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventTrainer {
    pub id: i64,
    pub event_id: i64,
    pub trainer_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A pool together with its membership rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolWithAttendees {
    pub pool: Pool,
    pub attendees: Vec<PoolAttendee>,
}

/// An event with registrants, trainers and pools eagerly joined
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDetails {
    pub event: Event,
    /// Registered users in registration order
    pub registrants: Vec<User>,
    pub trainers: Vec<Trainer>,
    pub pools: Vec<PoolWithAttendees>,
}

impl EventDetails {
    /// Assignment state with leftover pools from a partial run counted as assigned
    pub fn assignment_state(&self) -> AssignmentState {
        if self.pools.is_empty() {
            self.event.assignment_state()
        } else {
            AssignmentState::Assigned
        }
    }

    /// First pool carrying a shared meeting link
    pub fn pool_with_meet_link(&self) -> Option<&PoolWithAttendees> {
        self.pools.iter().find(|p| p.pool.meet_link.is_some())
    }

    /// Personal join link for a user across all pools of the event
    pub fn personal_link(&self, user_id: i64) -> Option<&str> {
        self.pools
            .iter()
            .flat_map(|p| p.attendees.iter())
            .find(|a| a.user_id == user_id)
            .and_then(|a| a.meet_link.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub event_date: DateTime<Utc>,
    pub event_time: String,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub max_capacity: Option<i32>,
    pub pool_capacity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub event_id: i64,
    pub user_id: i64,
    pub payment_reference: Option<String>,
}
