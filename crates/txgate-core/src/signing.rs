//! Opaque signing capability.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::Address;

/// An opaque capability representing authority to sign on behalf of an
/// account.
///
/// The approval workflow never inspects signing material; it borrows a
/// handle purely to route the final decision to the signing collaborator.
/// Two handles for the same account are distinct capabilities — equality is
/// on the capability token, not the account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SigningHandle {
    account: Address,
    token: Uuid,
}

impl SigningHandle {
    /// Mint a handle scoped to an account.
    #[must_use]
    pub fn for_account(account: Address) -> Self {
        Self {
            account,
            token: Uuid::new_v4(),
        }
    }

    /// The account this handle signs for.
    ///
    /// This is routing metadata, not signing material; it is the only field
    /// collaborators may rely on.
    #[must_use]
    pub fn account(&self) -> &Address {
        &self.account
    }
}

impl fmt::Display for SigningHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The token is a capability, keep it out of logs.
        write!(f, "signer:{}", self.account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::parse("0xa1").unwrap()
    }

    #[test]
    fn test_handles_for_same_account_are_distinct() {
        let a = SigningHandle::for_account(addr());
        let b = SigningHandle::for_account(addr());
        assert_eq!(a.account(), b.account());
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_redacts_token() {
        let handle = SigningHandle::for_account(addr());
        let shown = handle.to_string();
        assert_eq!(shown, "signer:0xa1");
    }
}
