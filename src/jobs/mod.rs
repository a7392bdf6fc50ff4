//! Trigger entry points invoked by the external scheduler

pub mod assign_pools;
pub mod summary;

pub use assign_pools::AssignPoolsJob;
pub use summary::{EventOutcome, JobSummary, OutcomeStatus};
