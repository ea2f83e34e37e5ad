//! Common types used throughout txgate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a pending-transaction approval request.
///
/// The id is minted by the requesting application and treated as opaque
/// here; it only needs to be equality-comparable and hashable so the
/// at-most-once dispatch invariant can be enforced per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Create a request ID from an externally supplied string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txreq:{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Error returned when parsing an [`Address`] from a string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressParseError {
    /// The string did not start with the `0x` prefix.
    #[error("address missing 0x prefix: {0}")]
    MissingPrefix(String),
    /// The hex portion of the address could not be decoded.
    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
    /// The address was empty after the prefix.
    #[error("address has no hex digits")]
    Empty,
}

/// An account address, held as normalized lowercase `0x`-prefixed hex.
///
/// Deserialization goes through [`Address::parse`], so an `Address` never
/// exists un-normalized, no matter where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Address(String);

impl Address {
    /// Parse an address from a `0x`-prefixed hex string.
    ///
    /// # Errors
    ///
    /// Returns [`AddressParseError`] if the prefix is missing or the digits
    /// are not valid hex.
    pub fn parse(s: &str) -> Result<Self, AddressParseError> {
        let Some(digits) = s.strip_prefix("0x") else {
            return Err(AddressParseError::MissingPrefix(s.to_string()));
        };
        if digits.is_empty() {
            return Err(AddressParseError::Empty);
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError::InvalidHex(s.to_string()));
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// The normalized address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

/// Timestamp wrapper for consistent handling throughout txgate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Check if this timestamp is in the future.
    #[must_use]
    pub fn is_future(&self) -> bool {
        self.0 > Utc::now()
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new("r1");
        assert_eq!(id.to_string(), "txreq:r1");
        assert_eq!(id.as_str(), "r1");
    }

    #[test]
    fn test_address_parse_normalizes_case() {
        let addr = Address::parse("0xAbCd01").unwrap();
        assert_eq!(addr.as_str(), "0xabcd01");
    }

    #[test]
    fn test_address_parse_rejects_missing_prefix() {
        assert!(matches!(
            Address::parse("abcd"),
            Err(AddressParseError::MissingPrefix(_))
        ));
    }

    #[test]
    fn test_address_parse_rejects_bad_hex() {
        assert!(matches!(
            Address::parse("0xzz"),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_address_parse_rejects_empty() {
        assert_eq!(Address::parse("0x"), Err(AddressParseError::Empty));
    }

    #[test]
    fn test_address_from_str() {
        let addr: Address = "0xA1".parse().unwrap();
        assert_eq!(addr.as_str(), "0xa1");
    }

    #[test]
    fn test_timestamp_not_future() {
        let ts = Timestamp::now();
        assert!(!ts.is_future());
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = Address::parse("0xa1").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0xa1\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_address_deserialize_normalizes() {
        let addr: Address = serde_json::from_str("\"0xAbC\"").unwrap();
        assert_eq!(addr.as_str(), "0xabc");
        assert_eq!(addr, Address::parse("0xABC").unwrap());
    }

    #[test]
    fn test_address_deserialize_rejects_invalid() {
        assert!(serde_json::from_str::<Address>("\"garbage\"").is_err());
        assert!(serde_json::from_str::<Address>("\"0xzz\"").is_err());
        assert!(serde_json::from_str::<Address>("\"0x\"").is_err());
    }
}
