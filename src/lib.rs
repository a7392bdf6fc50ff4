//! PoolMate
//!
//! Scheduling backend for fitness events. On the day before an event the
//! registered attendees are placed into a pool bound to a single video
//! meeting, everyone is notified, and on the day itself a same-day reminder
//! goes out in the morning or evening run.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod jobs;
pub mod models;
pub mod scheduling;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{PoolMateError, Result};

// Re-export main components for easy access
pub use database::{DatabaseService, EventStore, InMemoryEventStore};
pub use jobs::{AssignPoolsJob, JobSummary};
pub use scheduling::{NotificationCascade, PoolAssignmentEngine, ReminderScheduler, RunWindow};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
