//! Pre-approval (permit) payloads.
//!
//! A permit is a signed, single-use approval that grants a spender an
//! allowance without a separate approval step. Two flavours exist:
//! the classic in-token permit and the permit2 aggregator permit.

use serde::{Deserialize, Serialize};

use crate::{Address, CompactSignature};

/// Classic in-token permit: sets `allowance(owner, spender) = value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicPermit {
    pub owner: Address,
    pub spender: Address,
    pub value: u128,
    pub deadline: u64,
    pub signature: CompactSignature,
}

/// Aggregator permit: sets the permit2 allowance of `spender` over the
/// owner's tokens, bounded by `amount` until `expiration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit2Permit {
    pub owner: Address,
    pub spender: Address,
    pub amount: u128,
    pub expiration: u64,
    pub nonce: u64,
    pub sig_deadline: u64,
    pub signature: CompactSignature,
}

/// Either permit flavour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermitPayload {
    Classic(ClassicPermit),
    Permit2(Permit2Permit),
}

impl PermitPayload {
    #[must_use]
    pub fn owner(&self) -> &Address {
        match self {
            Self::Classic(p) => &p.owner,
            Self::Permit2(p) => &p.owner,
        }
    }

    #[must_use]
    pub fn spender(&self) -> &Address {
        match self {
            Self::Classic(p) => &p.spender,
            Self::Permit2(p) => &p.spender,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Classic(_) => "classic",
            Self::Permit2(_) => "permit2",
        }
    }
}

/// A permit bound to the token it approves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakerPermit {
    pub token: Address,
    pub payload: PermitPayload,
}

impl MakerPermit {
    #[must_use]
    pub fn classic(token: Address, permit: ClassicPermit) -> Self {
        Self {
            token,
            payload: PermitPayload::Classic(permit),
        }
    }

    #[must_use]
    pub fn permit2(token: Address, permit: Permit2Permit) -> Self {
        Self {
            token,
            payload: PermitPayload::Permit2(permit),
        }
    }
}
