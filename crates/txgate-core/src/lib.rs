//! Txgate Core - Shared primitives for the transaction approval workflow.
//!
//! This crate defines the small vocabulary of types that every other txgate
//! crate speaks: request identifiers, account addresses, timestamps, and the
//! opaque [`SigningHandle`] capability that is forwarded (never inspected) to
//! the signing collaborator.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod signing;
pub mod types;

pub use signing::SigningHandle;
pub use types::{Address, AddressParseError, RequestId, Timestamp};
