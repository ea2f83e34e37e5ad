//! Txgate Test - Shared test utilities for the approval workflow.
//!
//! This crate provides mock collaborators and fixture builders used across
//! txgate crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! txgate-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use txgate_test::{MockSimulator, MockDispatcher, ok_report};
//!
//! let simulator = MockSimulator::new().with_report(Ok(ok_report()));
//! let dispatcher = MockDispatcher::new();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
