//! Txgate Telemetry - Logging and tracing for the approval workflow.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats
//! - Integration with the tracing ecosystem
//!
//! # Example
//!
//! ```rust,no_run
//! use txgate_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), txgate_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("txgate_approval=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("approval workflow starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, setup_default_logging, setup_logging};
