//! Compact two-component signature.
//!
//! `r` carries the signature's first 32 bytes (the ed25519 `R` point) and
//! `vs` the second (the scalar `s`). A canonical scalar is below 2^253, so
//! the high bit of `vs` is reserved and must be clear.

use serde::{Deserialize, Serialize};

/// Signature split into `{r, vs}` words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompactSignature {
    pub r: [u8; 32],
    pub vs: [u8; 32],
}

impl CompactSignature {
    #[must_use]
    pub fn new(r: [u8; 32], vs: [u8; 32]) -> Self {
        Self { r, vs }
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        let mut r = [0u8; 32];
        let mut vs = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        vs.copy_from_slice(&bytes[32..]);
        Self { r, vs }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.vs);
        out
    }

    /// Whether the reserved high bit of `vs` is set.
    #[must_use]
    pub fn has_reserved_bit(&self) -> bool {
        self.vs[31] & 0x80 != 0
    }
}
