//! The invalidator store: three keyed arenas, one owner.
//!
//! ## Schemes
//!
//! ```text
//!   allow_multiple_fills  should_check_epoch   arena(s) touched
//!   ────────────────────  ──────────────────   ─────────────────────────────
//!   false                 false                consumed bits
//!   true                  false                remaining amounts
//!   true                  true                 remaining amounts + epochs
//! ```
//!
//! ## Transitions
//!
//! ```text
//!   UNTOUCHED ──fill──▶ REMAINING(n) ──fill──▶ REMAINING(0)
//!       │                    │
//!       └──────cancel────────┴──────────────▶ REMAINING(0)   (terminal)
//! ```
//!
//! Remaining amounts never increase and epochs never decrease. Reads take
//! `&self`; every write goes through [`InvalidatorStore::commit_fill`] or a
//! [`MakerScope`] obtained for the calling maker.

use std::collections::{HashMap, HashSet};

use openfill_types::constants::{MAX_EPOCH, MAX_EPOCH_ADVANCE};
use openfill_types::{Address, MakerTraits, OpenfillError, OrderHash, Result};
use serde::{Deserialize, Serialize};

/// Which arena an order's fill state lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidatorKind {
    /// Single-use: the first fill consumes the order.
    Bit,
    /// Multi-fill: a remaining making amount is tracked.
    Remaining,
    /// Multi-fill with a series epoch check on top of remaining tracking.
    Epoch,
}

impl InvalidatorKind {
    /// Select the scheme for decoded traits.
    #[must_use]
    pub fn for_traits(traits: &MakerTraits) -> Self {
        match (traits.allow_multiple_fills, traits.should_check_epoch) {
            (false, _) => Self::Bit,
            (true, false) => Self::Remaining,
            (true, true) => Self::Epoch,
        }
    }
}

impl std::fmt::Display for InvalidatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bit => write!(f, "BIT"),
            Self::Remaining => write!(f, "REMAINING"),
            Self::Epoch => write!(f, "EPOCH"),
        }
    }
}

/// What the remaining-amount view reports for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemainingInvalidator {
    /// Never filled or cancelled: the full making amount is available.
    Untouched,
    /// Stored remaining making amount; zero is terminal.
    Remaining(u128),
}

impl RemainingInvalidator {
    /// Fillable amount given the order's full making amount.
    #[must_use]
    pub fn amount(self, making_amount: u128) -> u128 {
        match self {
            Self::Untouched => making_amount,
            Self::Remaining(n) => n,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Remaining(0)
    }
}

/// Persistent, maker-keyed invalidation state.
#[derive(Debug, Default, Clone)]
pub struct InvalidatorStore {
    pub(crate) consumed: HashSet<(Address, OrderHash)>,
    pub(crate) remaining: HashMap<(Address, OrderHash), u128>,
    pub(crate) epochs: HashMap<(Address, u64), u64>,
}

impl InvalidatorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fillable making amount for an order.
    ///
    /// # Errors
    /// [`OpenfillError::OrderIsNotFillable`] when the bit is consumed or
    /// the remaining amount is zero.
    pub fn remaining(
        &self,
        maker: &Address,
        order_hash: &OrderHash,
        making_amount: u128,
        traits: &MakerTraits,
    ) -> Result<u128> {
        let amount = match InvalidatorKind::for_traits(traits) {
            InvalidatorKind::Bit => {
                if self.consumed.contains(&(*maker, *order_hash)) {
                    0
                } else {
                    making_amount
                }
            }
            InvalidatorKind::Remaining | InvalidatorKind::Epoch => self
                .remaining
                .get(&(*maker, *order_hash))
                .copied()
                .unwrap_or(making_amount),
        };
        if amount == 0 {
            return Err(OpenfillError::OrderIsNotFillable);
        }
        Ok(amount)
    }

    /// Current epoch of `(maker, series)`; zero until first advanced.
    #[must_use]
    pub fn epoch_of(&self, maker: &Address, series: u64) -> u64 {
        self.epochs.get(&(*maker, series)).copied().unwrap_or(0)
    }

    /// Check an epoch-checked order against its series' current epoch.
    /// Orders without `should_check_epoch` always pass.
    pub fn check_epoch(&self, maker: &Address, traits: &MakerTraits) -> Result<()> {
        if traits.should_check_epoch && traits.nonce_or_epoch != self.epoch_of(maker, traits.series)
        {
            return Err(OpenfillError::WrongSeriesNonce);
        }
        Ok(())
    }

    /// Record a completed fill of `filled` making units.
    ///
    /// Validates before mutating, so a failed commit leaves the store
    /// untouched. Returns the making amount still fillable afterwards.
    pub fn commit_fill(
        &mut self,
        maker: &Address,
        order_hash: &OrderHash,
        making_amount: u128,
        filled: u128,
        traits: &MakerTraits,
    ) -> Result<u128> {
        let available = self.remaining(maker, order_hash, making_amount, traits)?;
        let left = available.checked_sub(filled).ok_or_else(|| {
            OpenfillError::Internal(format!(
                "fill of {filled} exceeds remaining {available} for {order_hash}"
            ))
        })?;
        match InvalidatorKind::for_traits(traits) {
            InvalidatorKind::Bit => {
                self.consumed.insert((*maker, *order_hash));
                Ok(0)
            }
            InvalidatorKind::Remaining | InvalidatorKind::Epoch => {
                self.remaining.insert((*maker, *order_hash), left);
                Ok(left)
            }
        }
    }

    /// Whether the single-use bit of an order is consumed.
    #[must_use]
    pub fn bit_invalidator_for_order(&self, maker: &Address, order_hash: &OrderHash) -> bool {
        self.consumed.contains(&(*maker, *order_hash))
    }

    /// Remaining-amount view. A consumed bit reads as `Remaining(0)`.
    #[must_use]
    pub fn remaining_invalidator_for_order(
        &self,
        maker: &Address,
        order_hash: &OrderHash,
    ) -> RemainingInvalidator {
        let key = (*maker, *order_hash);
        if self.consumed.contains(&key) {
            return RemainingInvalidator::Remaining(0);
        }
        self.remaining
            .get(&key)
            .map_or(RemainingInvalidator::Untouched, |n| {
                RemainingInvalidator::Remaining(*n)
            })
    }

    /// Borrow the store for mutations on behalf of `maker`.
    ///
    /// # Errors
    /// [`OpenfillError::Unauthorized`] if `caller` is not `maker`. No state
    /// is read before the check.
    pub fn scope(&mut self, caller: &Address, maker: &Address) -> Result<MakerScope<'_>> {
        if caller != maker {
            return Err(OpenfillError::Unauthorized);
        }
        Ok(MakerScope {
            store: self,
            maker: *maker,
        })
    }

    /// Number of orders with any recorded state.
    #[must_use]
    pub fn tracked_orders(&self) -> usize {
        self.consumed.len() + self.remaining.len()
    }
}

/// Write access to one maker's entries.
pub struct MakerScope<'a> {
    store: &'a mut InvalidatorStore,
    maker: Address,
}

impl MakerScope<'_> {
    #[must_use]
    pub fn maker(&self) -> &Address {
        &self.maker
    }

    /// Force an order into its terminal state.
    ///
    /// Returns `false` if it was already terminal (no-op).
    pub fn cancel(&mut self, order_hash: &OrderHash, traits: &MakerTraits) -> bool {
        let key = (self.maker, *order_hash);
        let changed = match InvalidatorKind::for_traits(traits) {
            InvalidatorKind::Bit => self.store.consumed.insert(key),
            InvalidatorKind::Remaining | InvalidatorKind::Epoch => {
                self.store.remaining.insert(key, 0) != Some(0)
            }
        };
        tracing::debug!(maker = %self.maker, order = %order_hash, changed, "cancel");
        changed
    }

    /// Advance the epoch of `series` by `delta`. Returns the new epoch.
    ///
    /// # Errors
    /// [`OpenfillError::AdvanceEpochFailed`] when `delta` is outside
    /// `1..=MAX_EPOCH_ADVANCE` or the epoch would exceed [`MAX_EPOCH`].
    pub fn advance_epoch(&mut self, series: u64, delta: u64) -> Result<u64> {
        if !(1..=MAX_EPOCH_ADVANCE).contains(&delta) {
            return Err(OpenfillError::AdvanceEpochFailed {
                reason: format!("delta {delta} outside 1..={MAX_EPOCH_ADVANCE}"),
            });
        }
        let current = self.store.epoch_of(&self.maker, series);
        let next = current
            .checked_add(delta)
            .filter(|next| *next <= MAX_EPOCH)
            .ok_or_else(|| OpenfillError::AdvanceEpochFailed {
                reason: format!("epoch {current} + {delta} exceeds {MAX_EPOCH}"),
            })?;
        self.store.epochs.insert((self.maker, series), next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(n: u8) -> OrderHash {
        OrderHash([n; 32])
    }

    fn single() -> MakerTraits {
        MakerTraits::default()
    }

    fn multi() -> MakerTraits {
        MakerTraits {
            allow_multiple_fills: true,
            ..MakerTraits::default()
        }
    }

    fn epoch_checked(series: u64, epoch: u64) -> MakerTraits {
        MakerTraits {
            allow_multiple_fills: true,
            should_check_epoch: true,
            series,
            nonce_or_epoch: epoch,
            ..MakerTraits::default()
        }
    }

    #[test]
    fn kind_selection() {
        assert_eq!(InvalidatorKind::for_traits(&single()), InvalidatorKind::Bit);
        assert_eq!(InvalidatorKind::for_traits(&multi()), InvalidatorKind::Remaining);
        assert_eq!(
            InvalidatorKind::for_traits(&epoch_checked(0, 0)),
            InvalidatorKind::Epoch
        );
    }

    #[test]
    fn untouched_order_reports_full_amount() {
        let store = InvalidatorStore::new();
        let maker = Address::random();
        assert_eq!(store.remaining(&maker, &hash(1), 100, &multi()).unwrap(), 100);
        assert_eq!(
            store.remaining_invalidator_for_order(&maker, &hash(1)),
            RemainingInvalidator::Untouched
        );
    }

    #[test]
    fn bit_order_consumed_by_partial_fill() {
        let mut store = InvalidatorStore::new();
        let maker = Address::random();
        assert_eq!(store.commit_fill(&maker, &hash(1), 10, 3, &single()).unwrap(), 0);
        assert!(store.bit_invalidator_for_order(&maker, &hash(1)));
        assert_eq!(
            store.remaining(&maker, &hash(1), 10, &single()),
            Err(OpenfillError::OrderIsNotFillable)
        );
        assert!(store.remaining_invalidator_for_order(&maker, &hash(1)).is_terminal());
    }

    #[test]
    fn remaining_decrements_to_zero() {
        let mut store = InvalidatorStore::new();
        let maker = Address::random();
        assert_eq!(store.commit_fill(&maker, &hash(2), 10, 4, &multi()).unwrap(), 6);
        assert_eq!(store.commit_fill(&maker, &hash(2), 10, 6, &multi()).unwrap(), 0);
        assert_eq!(
            store.remaining(&maker, &hash(2), 10, &multi()),
            Err(OpenfillError::OrderIsNotFillable)
        );
    }

    #[test]
    fn overfill_rejected_without_mutation() {
        let mut store = InvalidatorStore::new();
        let maker = Address::random();
        store.commit_fill(&maker, &hash(3), 10, 8, &multi()).unwrap();
        assert!(store.commit_fill(&maker, &hash(3), 10, 5, &multi()).is_err());
        assert_eq!(
            store.remaining_invalidator_for_order(&maker, &hash(3)),
            RemainingInvalidator::Remaining(2)
        );
    }

    #[test]
    fn makers_do_not_share_entries() {
        let mut store = InvalidatorStore::new();
        let alice = Address::random();
        let bob = Address::random();
        store.commit_fill(&alice, &hash(4), 1, 1, &single()).unwrap();
        assert!(store.remaining(&bob, &hash(4), 1, &single()).is_ok());
    }

    #[test]
    fn scope_rejects_other_callers() {
        let mut store = InvalidatorStore::new();
        let maker = Address::random();
        let intruder = Address::random();
        assert!(matches!(
            store.scope(&intruder, &maker),
            Err(OpenfillError::Unauthorized)
        ));
        assert!(store.scope(&maker, &maker).is_ok());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut store = InvalidatorStore::new();
        let maker = Address::random();
        {
            let mut scope = store.scope(&maker, &maker).unwrap();
            assert!(scope.cancel(&hash(5), &multi()));
            assert!(!scope.cancel(&hash(5), &multi()));
            assert!(scope.cancel(&hash(6), &single()));
            assert!(!scope.cancel(&hash(6), &single()));
        }
        assert!(store.remaining_invalidator_for_order(&maker, &hash(5)).is_terminal());
        assert!(store.bit_invalidator_for_order(&maker, &hash(6)));
    }

    #[test]
    fn cancel_after_partial_fill_is_terminal() {
        let mut store = InvalidatorStore::new();
        let maker = Address::random();
        store.commit_fill(&maker, &hash(7), 10, 3, &multi()).unwrap();
        assert!(store.scope(&maker, &maker).unwrap().cancel(&hash(7), &multi()));
        assert!(store.remaining(&maker, &hash(7), 10, &multi()).is_err());
    }

    #[test]
    fn epoch_advance_invalidates_series() {
        let mut store = InvalidatorStore::new();
        let maker = Address::random();
        assert!(store.check_epoch(&maker, &epoch_checked(3, 0)).is_ok());
        assert_eq!(store.scope(&maker, &maker).unwrap().advance_epoch(3, 1).unwrap(), 1);
        assert_eq!(
            store.check_epoch(&maker, &epoch_checked(3, 0)),
            Err(OpenfillError::WrongSeriesNonce)
        );
        assert!(store.check_epoch(&maker, &epoch_checked(3, 1)).is_ok());
        // Other series untouched.
        assert!(store.check_epoch(&maker, &epoch_checked(4, 0)).is_ok());
        // Non-epoch orders never checked.
        assert!(store.check_epoch(&maker, &multi()).is_ok());
    }

    #[test]
    fn advance_delta_bounds() {
        let mut store = InvalidatorStore::new();
        let maker = Address::random();
        let mut scope = store.scope(&maker, &maker).unwrap();
        assert!(matches!(
            scope.advance_epoch(0, 0),
            Err(OpenfillError::AdvanceEpochFailed { .. })
        ));
        assert!(matches!(
            scope.advance_epoch(0, 256),
            Err(OpenfillError::AdvanceEpochFailed { .. })
        ));
        assert_eq!(scope.advance_epoch(0, 255).unwrap(), 255);
    }

    #[test]
    fn advance_past_slot_width_fails() {
        let mut store = InvalidatorStore::new();
        let maker = Address::random();
        store.epochs.insert((maker, 0), MAX_EPOCH - 1);
        let mut scope = store.scope(&maker, &maker).unwrap();
        assert!(scope.advance_epoch(0, 2).is_err());
        assert_eq!(scope.advance_epoch(0, 1).unwrap(), MAX_EPOCH);
    }
}
