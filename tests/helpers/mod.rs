//! Test helpers module
//!
//! Recording mocks for the external collaborators, an in-memory test
//! application and a PostgreSQL container helper.

#![allow(dead_code)]

pub mod database_helper;
pub mod mocks;
pub mod test_app;

pub use database_helper::*;
pub use mocks::*;
pub use test_app::*;
