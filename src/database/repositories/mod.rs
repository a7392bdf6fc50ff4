//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod user;
pub mod event;
pub mod pool;

// Re-export repositories
pub use user::{UserRepository, TrainerRepository};
pub use event::EventRepository;
pub use pool::{PoolRepository, TransactionLimits};
