//! Pool and pool membership models

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pool {
    pub id: i64,
    pub name: String,
    pub capacity: i32,
    pub is_active: bool,
    /// Shared meeting URL, absent when no meeting was created
    pub meet_link: Option<String>,
    pub event_id: i64,
    pub trainer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PoolAttendee {
    pub id: i64,
    pub pool_id: i64,
    pub user_id: i64,
    pub notified: bool,
    /// Individual join URL for this user
    pub meet_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything the assignment transaction writes for one event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssignment {
    pub event_id: i64,
    pub pool_name: String,
    pub capacity: i32,
    pub trainer_id: Option<i64>,
    pub meet_link: Option<String>,
    pub attendees: Vec<NewPoolAttendee>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPoolAttendee {
    pub user_id: i64,
    pub meet_link: Option<String>,
}

/// Result of a committed assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolAssignment {
    pub pool: Pool,
    pub attendees: Vec<PoolAttendee>,
}
