//! Deterministic snapshots of the invalidator store.
//!
//! The store is the protocol's only durable state. A snapshot lists every
//! entry in sorted order, so two stores with equal contents always produce
//! byte-identical serializations and equal digests.

use openfill_types::{Address, OrderHash};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::InvalidatorStore;

/// Domain prefix for snapshot digests.
const SNAPSHOT_DOMAIN: &[u8] = b"openfill:invalidator-snapshot:v1:";

/// Remaining making amount of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemainingEntry {
    pub maker: Address,
    pub order_hash: OrderHash,
    pub remaining: u128,
}

/// Current epoch of one `(maker, series)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpochEntry {
    pub maker: Address,
    pub series: u64,
    pub epoch: u64,
}

/// Sorted, serializable image of an [`InvalidatorStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidatorSnapshot {
    pub consumed: Vec<(Address, OrderHash)>,
    pub remaining: Vec<RemainingEntry>,
    pub epochs: Vec<EpochEntry>,
}

impl InvalidatorSnapshot {
    /// SHA-256 over every entry in order.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(SNAPSHOT_DOMAIN);
        hasher.update((self.consumed.len() as u64).to_be_bytes());
        for (maker, hash) in &self.consumed {
            hasher.update(maker.as_bytes());
            hasher.update(hash.as_bytes());
        }
        hasher.update((self.remaining.len() as u64).to_be_bytes());
        for entry in &self.remaining {
            hasher.update(entry.maker.as_bytes());
            hasher.update(entry.order_hash.as_bytes());
            hasher.update(entry.remaining.to_be_bytes());
        }
        hasher.update((self.epochs.len() as u64).to_be_bytes());
        for entry in &self.epochs {
            hasher.update(entry.maker.as_bytes());
            hasher.update(entry.series.to_be_bytes());
            hasher.update(entry.epoch.to_be_bytes());
        }
        hasher.finalize().into()
    }
}

impl InvalidatorStore {
    /// Capture the current state.
    #[must_use]
    pub fn snapshot(&self) -> InvalidatorSnapshot {
        let mut consumed: Vec<_> = self.consumed.iter().copied().collect();
        consumed.sort_unstable();

        let mut remaining: Vec<_> = self
            .remaining
            .iter()
            .map(|((maker, order_hash), remaining)| RemainingEntry {
                maker: *maker,
                order_hash: *order_hash,
                remaining: *remaining,
            })
            .collect();
        remaining.sort_unstable();

        let mut epochs: Vec<_> = self
            .epochs
            .iter()
            .map(|((maker, series), epoch)| EpochEntry {
                maker: *maker,
                series: *series,
                epoch: *epoch,
            })
            .collect();
        epochs.sort_unstable();

        InvalidatorSnapshot {
            consumed,
            remaining,
            epochs,
        }
    }

    /// Rebuild a store from a snapshot. Later duplicates overwrite earlier ones.
    #[must_use]
    pub fn restore(snapshot: &InvalidatorSnapshot) -> Self {
        Self {
            consumed: snapshot.consumed.iter().copied().collect(),
            remaining: snapshot
                .remaining
                .iter()
                .map(|e| ((e.maker, e.order_hash), e.remaining))
                .collect(),
            epochs: snapshot
                .epochs
                .iter()
                .map(|e| ((e.maker, e.series), e.epoch))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openfill_types::MakerTraits;

    fn populated() -> (InvalidatorStore, Address) {
        let mut store = InvalidatorStore::new();
        let maker = Address::random();
        let multi = MakerTraits {
            allow_multiple_fills: true,
            ..MakerTraits::default()
        };
        store
            .commit_fill(&maker, &OrderHash([1u8; 32]), 10, 1, &MakerTraits::default())
            .unwrap();
        store
            .commit_fill(&maker, &OrderHash([2u8; 32]), 10, 4, &multi)
            .unwrap();
        store
            .scope(&maker, &maker)
            .unwrap()
            .advance_epoch(7, 3)
            .unwrap();
        (store, maker)
    }

    #[test]
    fn restore_reproduces_views() {
        let (store, maker) = populated();
        let restored = InvalidatorStore::restore(&store.snapshot());
        assert!(restored.bit_invalidator_for_order(&maker, &OrderHash([1u8; 32])));
        assert_eq!(
            restored.remaining_invalidator_for_order(&maker, &OrderHash([2u8; 32])),
            crate::RemainingInvalidator::Remaining(6)
        );
        assert_eq!(restored.epoch_of(&maker, 7), 3);
        assert_eq!(restored.snapshot(), store.snapshot());
    }

    #[test]
    fn digest_is_content_addressed() {
        let (store, _) = populated();
        let a = store.snapshot();
        let b = InvalidatorStore::restore(&a).snapshot();
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), InvalidatorSnapshot::default().digest());
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let (store, _) = populated();
        let snapshot = store.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: InvalidatorSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
