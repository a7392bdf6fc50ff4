//! Scheduling core
//!
//! Pool assignment, the notification cascade that follows it, trainer
//! additions on assigned events and the same-day reminder pass.

pub mod cascade;
pub mod engine;
pub mod reminders;
pub mod time_range;
pub mod trainers;

pub use cascade::NotificationCascade;
pub use engine::{AssignmentOutcome, PoolAssignmentEngine};
pub use reminders::{ReminderScheduler, RunWindow};
pub use time_range::TimeRange;
pub use trainers::TrainerAddition;
