//! Error handling for PoolMate
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;
use crate::models::EventSnapshot;

/// Main error type for PoolMate application
#[derive(Error, Debug)]
pub enum PoolMateError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Meeting provider error: {0}")]
    Meeting(#[from] MeetingError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Storage layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Pools already assigned for event {event_id}")]
    AlreadyAssigned { event_id: i64 },

    #[error("Serialization conflict: {0}")]
    Conflict(String),

    #[error("Transaction timed out after {0}s")]
    Timeout(u64),

    #[error("Injected failure at {0}")]
    Injected(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Meeting provider errors
#[derive(Error, Debug)]
pub enum MeetingError {
    #[error("Meeting API request failed: {0}")]
    RequestFailed(String),

    #[error("Meeting API timeout")]
    Timeout,

    #[error("Meeting API authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid meeting response: {0}")]
    InvalidResponse(String),

    #[error("Meeting has no shared join URL")]
    MissingJoinUrl,
}

/// Messaging provider errors
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Messaging API request failed: {0}")]
    RequestFailed(String),

    #[error("Messaging API timeout")]
    Timeout,

    #[error("Messaging API rejected message: {0}")]
    Rejected(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

/// Outcome of a failed assignment run.
///
/// Every variant raised after the event was loaded carries a snapshot of it,
/// which is what the operator escalation message is built from.
#[derive(Error, Debug)]
pub enum AssignmentError {
    #[error("Event not found: {event_id}")]
    NotFound { event_id: i64 },

    #[error("Registration deadline has not passed for \"{}\"", .event.title)]
    DeadlineNotPassed { event: EventSnapshot },

    #[error("Pools already assigned for \"{}\"", .event.title)]
    AlreadyAssigned { event: EventSnapshot },

    #[error("No registrations for \"{}\"", .event.title)]
    NoRegistrants { event: EventSnapshot },

    #[error("Meeting creation failed for \"{}\": {reason}", .event.title)]
    MeetingCreationFailed { event: EventSnapshot, reason: String },

    #[error("Pool assignment transaction failed for \"{}\": {reason}", .event.title)]
    TransactionFailed { event: EventSnapshot, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl AssignmentError {
    /// Stable name of the failure kind, used in job summaries
    pub fn kind(&self) -> &'static str {
        match self {
            AssignmentError::NotFound { .. } => "NotFound",
            AssignmentError::DeadlineNotPassed { .. } => "DeadlineNotPassed",
            AssignmentError::AlreadyAssigned { .. } => "AlreadyAssigned",
            AssignmentError::NoRegistrants { .. } => "NoRegistrants",
            AssignmentError::MeetingCreationFailed { .. } => "MeetingCreationFailed",
            AssignmentError::TransactionFailed { .. } => "TransactionFailed",
            AssignmentError::Storage(_) => "Storage",
        }
    }

    /// Snapshot of the event the failure concerns, when it was loaded
    pub fn event(&self) -> Option<&EventSnapshot> {
        match self {
            AssignmentError::DeadlineNotPassed { event }
            | AssignmentError::AlreadyAssigned { event }
            | AssignmentError::NoRegistrants { event }
            | AssignmentError::MeetingCreationFailed { event, .. }
            | AssignmentError::TransactionFailed { event, .. } => Some(event),
            AssignmentError::NotFound { .. } | AssignmentError::Storage(_) => None,
        }
    }

    /// Precondition misses that leave nothing to fix are reported as skips
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            AssignmentError::DeadlineNotPassed { .. }
                | AssignmentError::AlreadyAssigned { .. }
                | AssignmentError::NoRegistrants { .. }
        )
    }
}

/// Outcome of a reminder pass for one event that did not complete
#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Event \"{}\" does not start in the {window} window", .event.title)]
    WrongWindow { event: EventSnapshot, window: String },

    #[error("Event \"{}\" is assigned but has no pool with a meeting link", .event.title)]
    NoMeetLink { event: EventSnapshot },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ReminderError {
    pub fn kind(&self) -> &'static str {
        match self {
            ReminderError::WrongWindow { .. } => "WrongWindow",
            ReminderError::NoMeetLink { .. } => "NoMeetLink",
            ReminderError::Storage(_) => "Storage",
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, ReminderError::WrongWindow { .. })
    }
}

/// Result type alias for PoolMate operations
pub type Result<T> = std::result::Result<T, PoolMateError>;

/// Result type alias for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for meeting provider operations
pub type MeetingResult<T> = std::result::Result<T, MeetingError>;

/// Result type alias for messaging operations
pub type NotificationResult<T> = std::result::Result<T, NotificationError>;
