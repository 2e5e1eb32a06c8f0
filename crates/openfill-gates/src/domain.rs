//! Structured-data hashing of orders.
//!
//! ```text
//! orderHash       = sha256(0x19 0x01 ‖ domainSeparator ‖ structHash)
//! domainSeparator = sha256(DOMAIN_TYPEHASH ‖ sha256(name) ‖ sha256(version)
//!                          ‖ chainId ‖ verifyingContract)
//! structHash      = sha256(ORDER_TYPEHASH ‖ salt ‖ maker ‖ receiver
//!                          ‖ makerAsset ‖ takerAsset ‖ makingAmount
//!                          ‖ takingAmount ‖ makerTraits)
//! ```
//!
//! Every field is a 32-byte big-endian word. The hash is deterministic:
//! same order and domain, same hash, on every node.

use openfill_types::constants::{DOMAIN_TYPE, ORDER_TYPE};
use openfill_types::{Address, Order, OrderHash, ProtocolConfig};
use ruint::aliases::U256;
use sha2::{Digest, Sha256};

/// Signing domain of one protocol deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Domain {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    #[must_use]
    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(
            config.domain_name.clone(),
            config.domain_version.clone(),
            config.chain_id,
            config.protocol_address,
        )
    }

    #[must_use]
    pub fn separator(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(Sha256::digest(DOMAIN_TYPE.as_bytes()));
        hasher.update(Sha256::digest(self.name.as_bytes()));
        hasher.update(Sha256::digest(self.version.as_bytes()));
        hasher.update(word(U256::from(self.chain_id)));
        hasher.update(self.verifying_contract.as_bytes());
        hasher.finalize().into()
    }

    /// Domain-free hash of the order's fields.
    #[must_use]
    pub fn struct_hash(order: &Order) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(Sha256::digest(ORDER_TYPE.as_bytes()));
        hasher.update(word(order.salt));
        hasher.update(order.maker.as_bytes());
        hasher.update(order.receiver.as_bytes());
        hasher.update(order.maker_asset.as_bytes());
        hasher.update(order.taker_asset.as_bytes());
        hasher.update(word(U256::from(order.making_amount)));
        hasher.update(word(U256::from(order.taking_amount)));
        hasher.update(word(order.maker_traits.encode()));
        hasher.finalize().into()
    }

    /// The order hash: the digest makers sign and the invalidator key.
    #[must_use]
    pub fn order_hash(&self, order: &Order) -> OrderHash {
        let mut hasher = Sha256::new();
        hasher.update([0x19, 0x01]);
        hasher.update(self.separator());
        hasher.update(Self::struct_hash(order));
        OrderHash(hasher.finalize().into())
    }
}

fn word(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}
