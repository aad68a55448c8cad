//! # Songbridge Common Library
//!
//! Shared code for the songbridge migration tool:
//! - Error types
//! - Configuration loading
//! - Migration event types (observability sink)
//! - Query text utilities

pub mod config;
pub mod error;
pub mod events;
pub mod text;

pub use error::{Error, Result};
