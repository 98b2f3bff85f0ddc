//! # HandyHub Shared Library
//!
//! Marketplace core matching homeowners with workers: the entity store, caller
//! authorization and the domain managers that enforce the marketplace invariants.
//!
//! ## Module Organization
//!
//! - `db`: SQLite pool and embedded migrations
//! - `models`: database models and their queries
//! - `auth`: caller context and authorization checks
//! - `catalog`: service catalog and worker offerings
//! - `identity`: identity sync and worker profiles
//! - `bookings`: booking lifecycle state machine
//! - `reviews`: reviews of completed bookings
//! - `conversations`: chat threads and messages
//! - `error`: `CoreError`, shared by all managers

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod conversations;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod reviews;

pub use error::{ConstraintKind, CoreError, CoreResult};

/// Current version of the HandyHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
