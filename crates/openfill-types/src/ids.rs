//! Identifiers used throughout OpenFill.
//!
//! Both identifiers are raw 32-byte values. An [`Address`] that signs
//! orders or permits is an ed25519 verifying key; assets and contracts
//! use the same width as opaque ids.

use std::fmt;

use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Account, asset or contract identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The unset address. Used for "no receiver override" and friends.
    pub const ZERO: Self = Self([0u8; 32]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Low 80 bits (last 10 bytes), the value stored in the maker's
    /// allowed-sender slot.
    #[must_use]
    pub fn sender_key(&self) -> u128 {
        let mut buf = [0u8; 16];
        buf[6..].copy_from_slice(&self.0[22..]);
        u128::from_be_bytes(buf)
    }

    /// Address as a 256-bit big-endian word.
    #[must_use]
    pub fn to_word(&self) -> U256 {
        U256::from_be_bytes(self.0)
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// Random address for tests. **Never use in production.**
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random::<[u8; 32]>())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// OrderHash
// ---------------------------------------------------------------------------

/// Canonical structured-data hash of an order. Keys every invalidator entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderHash(pub [u8; 32]);

impl OrderHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for OrderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_is_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address([1u8; 32]).is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn sender_key_takes_last_ten_bytes() {
        let mut bytes = [0xffu8; 32];
        bytes[22] = 0x01;
        bytes[31] = 0x02;
        let key = Address(bytes).sender_key();
        assert_eq!(key >> 72, 0x01);
        assert_eq!(key & 0xff, 0x02);
        assert!(key < (1u128 << 80));
    }

    #[test]
    fn to_word_is_big_endian() {
        let mut bytes = [0u8; 32];
        bytes[31] = 7;
        assert_eq!(Address(bytes).to_word(), U256::from(7u64));
    }

    #[test]
    fn display_is_hex_prefixed() {
        let addr = Address([0xabu8; 32]);
        assert_eq!(format!("{addr}"), "0xabababababababab");
        let hash = OrderHash([0x01u8; 32]);
        assert!(format!("{hash}").starts_with("0x0101"));
        assert_eq!(hash.to_hex().len(), 64);
    }

    #[test]
    fn random_addresses_differ() {
        assert_ne!(Address::random(), Address::random());
    }

    #[test]
    fn serde_roundtrips() {
        let addr = Address::random();
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
