//! Bookstore Common - Shared utilities and types
//!
//! This crate provides functionality used by the catalog library and the
//! `bookstore` binary:
//! - Error types and handling
//! - Configuration management
//! - Store operation metrics
//! - Book record and report types

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
