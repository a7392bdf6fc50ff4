//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod user;
pub mod event;
pub mod pool;

// Re-export commonly used models
pub use user::{User, Trainer, CreateUserRequest, CreateTrainerRequest};
pub use event::{
    Event, EventDetails, EventSnapshot, EventTrainer, Registration, AssignmentState,
    PoolWithAttendees, CreateEventRequest, RegisterUserRequest,
};
pub use pool::{Pool, PoolAttendee, NewAssignment, NewPoolAttendee, PoolAssignment};
