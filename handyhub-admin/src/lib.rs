//! # HandyHub Admin Library
//!
//! Pieces of the `handyhub-admin` binary, exposed so they can be tested.
//!
//! ## Modules
//!
//! - `cli`: Command-line arguments
//! - `commands`: `migrate`, `seed` and `status`
//! - `config`: Configuration management

pub mod cli;
pub mod commands;
pub mod config;
