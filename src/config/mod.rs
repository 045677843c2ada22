//! Configuration management for Folio.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables

mod settings;

pub use settings::Config;
