//! Command-line front end for the OCI policy analyzer
//!
//! The binary in `main.rs` only parses arguments and wires logging; the
//! pieces here are kept in a library so they can be tested without a
//! provider account.

pub mod config;
pub mod app;

pub use app::{execute, Cli, OutputFormat};
pub use config::AnalyzerSettings;
