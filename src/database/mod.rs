//! Database module
//!
//! This module handles database connections and operations

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{DatabasePool, create_pool, health_check, pool_options, run_migrations};
pub use memory::InMemoryEventStore;
pub use repositories::{UserRepository, TrainerRepository, EventRepository, PoolRepository, TransactionLimits};
pub use service::DatabaseService;
pub use store::{CommitStep, EventStore};
