//! In-memory host with an undo journal.
//!
//! [`MemoryLedger`] models the token contracts, the permit2 aggregator,
//! the wrapped-native contract and a handful of view and hook contracts
//! in plain maps. While a checkpoint is open every write appends the
//! previous value to the journal; rollback replays the journal backwards.
//!
//! Supply invariant, checked by [`MemoryLedger::verify_supply`]:
//! ```text
//! ∀ asset: Σ balances(asset) == supply(asset)
//!          Σ native balances  == native supply
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use chrono::Utc;
use openfill_gates::{
    classic_permit_digest, permit2_digest, CallError, Ed25519Verifier, PermitError,
    PermitPrimitives, SignatureVerifier, StaticCaller,
};
use openfill_types::{
    Address, ClassicPermit, OpenfillError, OrderHash, Permit2Permit, Result, StaticCall, U256,
};

use crate::host::{
    AssetTransfer, Checkpoint, Host, InteractionCall, InteractionError, InteractionHandler,
    InteractionPhase, TransferError, Transactional,
};

/// A registered read-only contract. Receives the calldata.
pub type View = Box<dyn Fn(&[u8]) -> std::result::Result<Vec<u8>, String> + Send + Sync>;

/// Aggregator allowance of one `(owner, token, spender)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit2Allowance {
    pub amount: u128,
    /// Last unix second the allowance is usable.
    pub expiration: u64,
}

/// What a hook contract does when called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionBehavior {
    Accept,
    Reject(String),
    /// Pay `amount` of `asset` from the hook's own balance to `to`.
    Pay {
        asset: Address,
        to: Address,
        amount: u128,
    },
}

/// One executed hook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionRecord {
    pub phase: InteractionPhase,
    pub target: Address,
    pub order_hash: OrderHash,
    pub data: Vec<u8>,
}

type HolderAsset = (Address, Address);
type OwnerAssetSpender = (Address, Address, Address);

enum Undo {
    Balance(HolderAsset, Option<u128>),
    Allowance(OwnerAssetSpender, Option<u128>),
    Native(Address, Option<u128>),
    Supply(Address, Option<u128>),
    NativeSupply(u128),
    PermitNonce(HolderAsset, Option<u64>),
    Permit2Allowance(OwnerAssetSpender, Option<Permit2Allowance>),
    Permit2Nonce(OwnerAssetSpender, Option<u64>),
    InteractionLog(usize),
}

fn restore<K: Eq + Hash, V>(map: &mut HashMap<K, V>, key: K, prev: Option<V>) {
    match prev {
        Some(v) => {
            map.insert(key, v);
        }
        None => {
            map.remove(&key);
        }
    }
}

/// In-memory [`Host`].
pub struct MemoryLedger {
    balances: HashMap<HolderAsset, u128>,
    allowances: HashMap<OwnerAssetSpender, u128>,
    native: HashMap<Address, u128>,
    supply: HashMap<Address, u128>,
    native_supply: u128,
    permit_nonces: HashMap<HolderAsset, u64>,
    permit2_address: Option<Address>,
    permit2_allowances: HashMap<OwnerAssetSpender, Permit2Allowance>,
    permit2_nonces: HashMap<OwnerAssetSpender, u64>,
    views: HashMap<Address, View>,
    hooks: HashMap<Address, InteractionBehavior>,
    interaction_log: Vec<InteractionRecord>,
    now: u64,
    depth: usize,
    journal: Vec<Undo>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Empty ledger with the clock set to wall time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
            allowances: HashMap::new(),
            native: HashMap::new(),
            supply: HashMap::new(),
            native_supply: 0,
            permit_nonces: HashMap::new(),
            permit2_address: None,
            permit2_allowances: HashMap::new(),
            permit2_nonces: HashMap::new(),
            views: HashMap::new(),
            hooks: HashMap::new(),
            interaction_log: Vec::new(),
            now: u64::try_from(Utc::now().timestamp()).unwrap_or(0),
            depth: 0,
            journal: Vec::new(),
        }
    }

    // -- setup -------------------------------------------------------------

    /// Deploy the permit2 aggregator at `address`.
    pub fn set_permit2(&mut self, address: Address) {
        self.permit2_address = Some(address);
    }

    #[must_use]
    pub fn permit2_address(&self) -> Option<Address> {
        self.permit2_address
    }

    pub fn set_timestamp(&mut self, now: u64) {
        self.now = now;
    }

    pub fn advance_time(&mut self, seconds: u64) {
        self.now = self.now.saturating_add(seconds);
    }

    /// Create `amount` of `asset` for `holder`.
    pub fn mint(&mut self, holder: &Address, asset: &Address, amount: u128) {
        let balance = self.balance_of(holder, asset).saturating_add(amount);
        self.set_balance((*holder, *asset), balance);
        let supply = self.supply_of(asset).saturating_add(amount);
        self.set_supply(*asset, supply);
    }

    /// Set the token allowance of `spender` over `owner`'s `asset`.
    pub fn approve(&mut self, owner: &Address, asset: &Address, spender: &Address, amount: u128) {
        self.set_allowance((*owner, *asset, *spender), amount);
    }

    /// Register a read-only contract at `target`.
    pub fn register_view(&mut self, target: Address, view: View) {
        self.views.insert(target, view);
    }

    /// Register a view that always returns `value` as a 32-byte word.
    pub fn set_view_value(&mut self, target: Address, value: U256) {
        let word = value.to_be_bytes::<32>().to_vec();
        self.register_view(target, Box::new(move |_| Ok(word.clone())));
    }

    /// Configure the hook contract at `target`.
    pub fn set_interaction(&mut self, target: Address, behavior: InteractionBehavior) {
        self.hooks.insert(target, behavior);
    }

    // -- views -------------------------------------------------------------

    #[must_use]
    pub fn balance_of(&self, holder: &Address, asset: &Address) -> u128 {
        self.balances.get(&(*holder, *asset)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn allowance(&self, owner: &Address, asset: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(&(*owner, *asset, *spender))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn native_balance_of(&self, holder: &Address) -> u128 {
        self.native.get(holder).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn supply_of(&self, asset: &Address) -> u128 {
        self.supply.get(asset).copied().unwrap_or(0)
    }

    /// Next classic permit nonce of `owner` on `token`.
    #[must_use]
    pub fn permit_nonce(&self, owner: &Address, token: &Address) -> u64 {
        self.permit_nonces.get(&(*owner, *token)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn permit2_allowance(
        &self,
        owner: &Address,
        token: &Address,
        spender: &Address,
    ) -> Option<Permit2Allowance> {
        self.permit2_allowances
            .get(&(*owner, *token, *spender))
            .copied()
    }

    /// Next permit2 nonce of `(owner, token, spender)`.
    #[must_use]
    pub fn permit2_nonce(&self, owner: &Address, token: &Address, spender: &Address) -> u64 {
        self.permit2_nonces
            .get(&(*owner, *token, *spender))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn interaction_log(&self) -> &[InteractionRecord] {
        &self.interaction_log
    }

    /// Whether a checkpoint is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    /// Check the supply invariant for `asset` and for native balance.
    ///
    /// # Errors
    /// [`OpenfillError::Internal`] naming the side that drifted.
    pub fn verify_supply(&self, asset: &Address) -> Result<()> {
        let held = checked_total(
            self.balances
                .iter()
                .filter(|((_, a), _)| a == asset)
                .map(|(_, amount)| *amount),
        )
        .ok_or_else(|| {
            OpenfillError::Internal(format!("held balances of {asset} overflow u128"))
        })?;
        let expected = self.supply_of(asset);
        if held != expected {
            return Err(OpenfillError::Internal(format!(
                "supply of {asset} drifted: held {held}, issued {expected}"
            )));
        }
        let native = checked_total(self.native.values().copied()).ok_or_else(|| {
            OpenfillError::Internal("held native balances overflow u128".to_string())
        })?;
        if native != self.native_supply {
            return Err(OpenfillError::Internal(format!(
                "native supply drifted: held {native}, issued {}",
                self.native_supply
            )));
        }
        Ok(())
    }

    // -- journaled writes --------------------------------------------------

    fn record(&mut self, undo: Undo) {
        if self.depth > 0 {
            self.journal.push(undo);
        }
    }

    fn set_balance(&mut self, key: HolderAsset, value: u128) {
        let prev = self.balances.insert(key, value);
        self.record(Undo::Balance(key, prev));
    }

    fn set_allowance(&mut self, key: OwnerAssetSpender, value: u128) {
        let prev = self.allowances.insert(key, value);
        self.record(Undo::Allowance(key, prev));
    }

    fn set_native(&mut self, key: Address, value: u128) {
        let prev = self.native.insert(key, value);
        self.record(Undo::Native(key, prev));
    }

    fn set_supply(&mut self, key: Address, value: u128) {
        let prev = self.supply.insert(key, value);
        self.record(Undo::Supply(key, prev));
    }

    fn set_native_supply(&mut self, value: u128) {
        let prev = std::mem::replace(&mut self.native_supply, value);
        self.record(Undo::NativeSupply(prev));
    }

    fn set_permit_nonce(&mut self, key: HolderAsset, value: u64) {
        let prev = self.permit_nonces.insert(key, value);
        self.record(Undo::PermitNonce(key, prev));
    }

    fn set_permit2_allowance(&mut self, key: OwnerAssetSpender, value: Permit2Allowance) {
        let prev = self.permit2_allowances.insert(key, value);
        self.record(Undo::Permit2Allowance(key, prev));
    }

    fn set_permit2_nonce(&mut self, key: OwnerAssetSpender, value: u64) {
        let prev = self.permit2_nonces.insert(key, value);
        self.record(Undo::Permit2Nonce(key, prev));
    }

    fn push_interaction(&mut self, record: InteractionRecord) {
        let len = self.interaction_log.len();
        self.interaction_log.push(record);
        self.record(Undo::InteractionLog(len));
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::Balance(k, prev) => restore(&mut self.balances, k, prev),
            Undo::Allowance(k, prev) => restore(&mut self.allowances, k, prev),
            Undo::Native(k, prev) => restore(&mut self.native, k, prev),
            Undo::Supply(k, prev) => restore(&mut self.supply, k, prev),
            Undo::NativeSupply(prev) => self.native_supply = prev,
            Undo::PermitNonce(k, prev) => restore(&mut self.permit_nonces, k, prev),
            Undo::Permit2Allowance(k, prev) => restore(&mut self.permit2_allowances, k, prev),
            Undo::Permit2Nonce(k, prev) => restore(&mut self.permit2_nonces, k, prev),
            Undo::InteractionLog(len) => self.interaction_log.truncate(len),
        }
    }

    /// Move balance without any allowance check.
    fn move_balance(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> std::result::Result<(), TransferError> {
        let available = self.balance_of(from, asset);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                asset: *asset,
                needed: amount,
                available,
            });
        }
        self.set_balance((*from, *asset), available - amount);
        let credited = self.balance_of(to, asset).saturating_add(amount);
        self.set_balance((*to, *asset), credited);
        Ok(())
    }

    /// Spend `amount` of a token allowance. `u128::MAX` is unlimited.
    fn spend_allowance(
        &mut self,
        owner: &Address,
        asset: &Address,
        spender: &Address,
        amount: u128,
    ) -> std::result::Result<(), TransferError> {
        let available = self.allowance(owner, asset, spender);
        if available < amount {
            return Err(TransferError::InsufficientAllowance {
                asset: *asset,
                needed: amount,
                available,
            });
        }
        if available != u128::MAX {
            self.set_allowance((*owner, *asset, *spender), available - amount);
        }
        Ok(())
    }
}

fn checked_total(mut amounts: impl Iterator<Item = u128>) -> Option<u128> {
    amounts.try_fold(0u128, u128::checked_add)
}

impl AssetTransfer for MemoryLedger {
    fn transfer_from(
        &mut self,
        spender: &Address,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> std::result::Result<(), TransferError> {
        if spender != from {
            self.spend_allowance(from, asset, spender, amount)?;
        }
        self.move_balance(asset, from, to, amount)
    }

    fn permit2_transfer_from(
        &mut self,
        spender: &Address,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> std::result::Result<(), TransferError> {
        let Some(permit2) = self.permit2_address else {
            return Err(TransferError::Unsupported("permit2 not deployed".to_string()));
        };
        let key = (*from, *asset, *spender);
        let Some(allowance) = self.permit2_allowances.get(&key).copied() else {
            return Err(TransferError::InsufficientAllowance {
                asset: *asset,
                needed: amount,
                available: 0,
            });
        };
        if self.now > allowance.expiration {
            return Err(TransferError::Expired);
        }
        if allowance.amount < amount {
            return Err(TransferError::InsufficientAllowance {
                asset: *asset,
                needed: amount,
                available: allowance.amount,
            });
        }
        if allowance.amount != u128::MAX {
            self.set_permit2_allowance(
                key,
                Permit2Allowance {
                    amount: allowance.amount - amount,
                    ..allowance
                },
            );
        }
        // The aggregator itself pulls through the owner's token allowance.
        self.transfer_from(&permit2, asset, from, to, amount)
    }

    fn unwrap_native(
        &mut self,
        wrapped: &Address,
        holder: &Address,
        to: &Address,
        amount: u128,
    ) -> std::result::Result<(), TransferError> {
        let available = self.balance_of(holder, wrapped);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                asset: *wrapped,
                needed: amount,
                available,
            });
        }
        self.set_balance((*holder, *wrapped), available - amount);
        let supply = self.supply_of(wrapped).saturating_sub(amount);
        self.set_supply(*wrapped, supply);
        let credited = self.native_balance_of(to).saturating_add(amount);
        self.set_native(*to, credited);
        self.set_native_supply(self.native_supply.saturating_add(amount));
        Ok(())
    }
}

impl PermitPrimitives for MemoryLedger {
    fn permit(
        &mut self,
        token: &Address,
        permit: &ClassicPermit,
    ) -> std::result::Result<(), PermitError> {
        if self.now > permit.deadline {
            return Err(PermitError::Expired);
        }
        let nonce = self.permit_nonce(&permit.owner, token);
        let digest = classic_permit_digest(token, permit, nonce);
        if !Ed25519Verifier.verify(&permit.owner, &digest, &permit.signature) {
            return Err(PermitError::InvalidSignature);
        }
        self.set_allowance((permit.owner, *token, permit.spender), permit.value);
        self.set_permit_nonce((permit.owner, *token), nonce + 1);
        Ok(())
    }

    fn permit2(
        &mut self,
        token: &Address,
        permit: &Permit2Permit,
    ) -> std::result::Result<(), PermitError> {
        let Some(permit2) = self.permit2_address else {
            return Err(PermitError::Unsupported("permit2 not deployed".to_string()));
        };
        if self.now > permit.sig_deadline {
            return Err(PermitError::Expired);
        }
        let key = (permit.owner, *token, permit.spender);
        let expected = self.permit2_nonce(&permit.owner, token, &permit.spender);
        if permit.nonce != expected {
            return Err(PermitError::NonceMismatch {
                expected,
                got: permit.nonce,
            });
        }
        let digest = permit2_digest(&permit2, token, permit);
        if !Ed25519Verifier.verify(&permit.owner, &digest, &permit.signature) {
            return Err(PermitError::InvalidSignature);
        }
        self.set_permit2_allowance(
            key,
            Permit2Allowance {
                amount: permit.amount,
                expiration: permit.expiration,
            },
        );
        self.set_permit2_nonce(key, expected + 1);
        Ok(())
    }
}

impl StaticCaller for MemoryLedger {
    /// Registered views first; otherwise a call to a known asset with a
    /// 32-byte holder as calldata reads that holder's balance.
    fn static_call(&self, call: &StaticCall) -> std::result::Result<Vec<u8>, CallError> {
        if let Some(view) = self.views.get(&call.target) {
            return view(&call.calldata).map_err(CallError::Reverted);
        }
        if self.supply.contains_key(&call.target) {
            let holder: [u8; 32] = call
                .calldata
                .as_slice()
                .try_into()
                .map_err(|_| CallError::Reverted("balance query needs a holder".to_string()))?;
            let balance = self.balance_of(&Address(holder), &call.target);
            return Ok(U256::from(balance).to_be_bytes::<32>().to_vec());
        }
        Err(CallError::UnknownTarget)
    }
}

impl InteractionHandler for MemoryLedger {
    fn interact(
        &mut self,
        target: &Address,
        call: &InteractionCall<'_>,
    ) -> std::result::Result<(), InteractionError> {
        let behavior = self
            .hooks
            .get(target)
            .cloned()
            .ok_or_else(|| InteractionError::Rejected {
                target: *target,
                reason: "no hook deployed".to_string(),
            })?;
        match behavior {
            InteractionBehavior::Accept => {}
            InteractionBehavior::Reject(reason) => {
                return Err(InteractionError::Rejected {
                    target: *target,
                    reason,
                });
            }
            InteractionBehavior::Pay { asset, to, amount } => {
                self.move_balance(&asset, target, &to, amount)
                    .map_err(|e| InteractionError::Rejected {
                        target: *target,
                        reason: e.to_string(),
                    })?;
            }
        }
        self.push_interaction(InteractionRecord {
            phase: call.phase,
            target: *target,
            order_hash: *call.order_hash,
            data: call.data.to_vec(),
        });
        Ok(())
    }
}

impl Transactional for MemoryLedger {
    fn begin(&mut self) -> Checkpoint {
        self.depth += 1;
        Checkpoint(self.journal.len())
    }

    fn commit(&mut self, _checkpoint: Checkpoint) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.journal.clear();
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            if let Some(undo) = self.journal.pop() {
                self.undo(undo);
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }
}

impl Host for MemoryLedger {
    fn timestamp(&self) -> u64 {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openfill_gates::OrderSigner;
    use openfill_types::{CompactSignature, Order};

    fn addr(n: u8) -> Address {
        Address([n; 32])
    }

    const TOKEN: Address = Address([0xa0u8; 32]);
    const WETH: Address = Address([0xa1u8; 32]);
    const PROTOCOL: Address = Address([0xeeu8; 32]);
    const PERMIT2: Address = Address([0xe2u8; 32]);

    #[test]
    fn transfer_spends_allowance() {
        let mut ledger = MemoryLedger::new();
        ledger.mint(&addr(1), &TOKEN, 100);
        ledger.approve(&addr(1), &TOKEN, &PROTOCOL, 60);
        ledger
            .transfer_from(&PROTOCOL, &TOKEN, &addr(1), &addr(2), 40)
            .unwrap();
        assert_eq!(ledger.balance_of(&addr(1), &TOKEN), 60);
        assert_eq!(ledger.balance_of(&addr(2), &TOKEN), 40);
        assert_eq!(ledger.allowance(&addr(1), &TOKEN, &PROTOCOL), 20);
        let err = ledger
            .transfer_from(&PROTOCOL, &TOKEN, &addr(1), &addr(2), 30)
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientAllowance { .. }));
        ledger.verify_supply(&TOKEN).unwrap();
    }

    #[test]
    fn supply_overflow_is_reported_not_panicked() {
        let mut ledger = MemoryLedger::new();
        ledger.mint(&addr(1), &TOKEN, u128::MAX);
        ledger.mint(&addr(2), &TOKEN, u128::MAX);
        let err = ledger.verify_supply(&TOKEN).unwrap_err();
        assert!(matches!(err, OpenfillError::Internal(ref m) if m.contains("overflow")));
    }

    #[test]
    fn unlimited_allowance_is_not_spent() {
        let mut ledger = MemoryLedger::new();
        ledger.mint(&addr(1), &TOKEN, 10);
        ledger.approve(&addr(1), &TOKEN, &PROTOCOL, u128::MAX);
        ledger
            .transfer_from(&PROTOCOL, &TOKEN, &addr(1), &addr(2), 10)
            .unwrap();
        assert_eq!(ledger.allowance(&addr(1), &TOKEN, &PROTOCOL), u128::MAX);
    }

    #[test]
    fn rollback_restores_every_write() {
        let mut ledger = MemoryLedger::new();
        ledger.mint(&addr(1), &TOKEN, 100);
        ledger.approve(&addr(1), &TOKEN, &PROTOCOL, 100);
        let cp = ledger.begin();
        ledger
            .transfer_from(&PROTOCOL, &TOKEN, &addr(1), &addr(2), 70)
            .unwrap();
        ledger.mint(&addr(3), &WETH, 5);
        ledger.unwrap_native(&WETH, &addr(3), &addr(4), 5).unwrap();
        ledger.rollback(cp);
        assert!(!ledger.in_transaction());
        assert_eq!(ledger.balance_of(&addr(1), &TOKEN), 100);
        assert_eq!(ledger.balance_of(&addr(2), &TOKEN), 0);
        assert_eq!(ledger.allowance(&addr(1), &TOKEN, &PROTOCOL), 100);
        assert_eq!(ledger.native_balance_of(&addr(4)), 0);
        assert_eq!(ledger.supply_of(&WETH), 0);
        ledger.verify_supply(&TOKEN).unwrap();
    }

    #[test]
    fn nested_rollback_keeps_outer_writes() {
        let mut ledger = MemoryLedger::new();
        let outer = ledger.begin();
        ledger.mint(&addr(1), &TOKEN, 10);
        let inner = ledger.begin();
        ledger.mint(&addr(1), &TOKEN, 5);
        ledger.rollback(inner);
        assert_eq!(ledger.balance_of(&addr(1), &TOKEN), 10);
        ledger.commit(outer);
        assert_eq!(ledger.balance_of(&addr(1), &TOKEN), 10);
        assert!(!ledger.in_transaction());
    }

    #[test]
    fn unwrap_moves_supply_to_native() {
        let mut ledger = MemoryLedger::new();
        ledger.mint(&addr(1), &WETH, 8);
        ledger.unwrap_native(&WETH, &addr(1), &addr(2), 3).unwrap();
        assert_eq!(ledger.balance_of(&addr(1), &WETH), 5);
        assert_eq!(ledger.native_balance_of(&addr(2)), 3);
        ledger.verify_supply(&WETH).unwrap();
    }

    #[test]
    fn classic_permit_sets_allowance_once() {
        let mut ledger = MemoryLedger::new();
        ledger.set_timestamp(1_000);
        let owner = OrderSigner::from_bytes(&[7u8; 32]);
        let mut permit = ClassicPermit {
            owner: owner.address(),
            spender: PROTOCOL,
            value: 50,
            deadline: 2_000,
            signature: CompactSignature::new([0u8; 32], [0u8; 32]),
        };
        permit.signature = owner.sign_digest(&classic_permit_digest(&TOKEN, &permit, 0));
        ledger.permit(&TOKEN, &permit).unwrap();
        assert_eq!(ledger.allowance(&owner.address(), &TOKEN, &PROTOCOL), 50);
        assert_eq!(ledger.permit_nonce(&owner.address(), &TOKEN), 1);
        // Replay signs nonce 0 but the token is at nonce 1.
        assert_eq!(
            ledger.permit(&TOKEN, &permit),
            Err(PermitError::InvalidSignature)
        );
    }

    #[test]
    fn expired_permit_rejected() {
        let mut ledger = MemoryLedger::new();
        ledger.set_timestamp(3_000);
        let permit = ClassicPermit {
            owner: addr(1),
            spender: PROTOCOL,
            value: 1,
            deadline: 2_000,
            signature: CompactSignature::new([0u8; 32], [0u8; 32]),
        };
        assert_eq!(ledger.permit(&TOKEN, &permit), Err(PermitError::Expired));
    }

    #[test]
    fn permit2_flow() {
        let mut ledger = MemoryLedger::new();
        ledger.set_timestamp(100);
        ledger.set_permit2(PERMIT2);
        let owner = OrderSigner::from_bytes(&[9u8; 32]);
        ledger.mint(&owner.address(), &TOKEN, 10);
        ledger.approve(&owner.address(), &TOKEN, &PERMIT2, u128::MAX);
        let mut permit = Permit2Permit {
            owner: owner.address(),
            spender: PROTOCOL,
            amount: 6,
            expiration: 200,
            nonce: 0,
            sig_deadline: 150,
            signature: CompactSignature::new([0u8; 32], [0u8; 32]),
        };
        permit.signature = owner.sign_digest(&permit2_digest(&PERMIT2, &TOKEN, &permit));
        ledger.permit2(&TOKEN, &permit).unwrap();
        assert_eq!(
            ledger.permit2_nonce(&owner.address(), &TOKEN, &PROTOCOL),
            1
        );
        ledger
            .permit2_transfer_from(&PROTOCOL, &TOKEN, &owner.address(), &addr(2), 4)
            .unwrap();
        assert_eq!(ledger.balance_of(&addr(2), &TOKEN), 4);
        assert_eq!(
            ledger
                .permit2_allowance(&owner.address(), &TOKEN, &PROTOCOL)
                .map(|a| a.amount),
            Some(2)
        );
        ledger.set_timestamp(201);
        assert_eq!(
            ledger.permit2_transfer_from(&PROTOCOL, &TOKEN, &owner.address(), &addr(2), 1),
            Err(TransferError::Expired)
        );
    }

    #[test]
    fn permit2_requires_deployment() {
        let mut ledger = MemoryLedger::new();
        let err = ledger
            .permit2_transfer_from(&PROTOCOL, &TOKEN, &addr(1), &addr(2), 1)
            .unwrap_err();
        assert!(matches!(err, TransferError::Unsupported(_)));
    }

    #[test]
    fn static_call_reads_views_and_balances() {
        let mut ledger = MemoryLedger::new();
        ledger.set_view_value(addr(0x51), U256::from(42u64));
        ledger.mint(&addr(1), &TOKEN, 9);
        let word = ledger
            .static_call(&StaticCall::new(addr(0x51), Vec::new()))
            .unwrap();
        assert_eq!(U256::from_be_bytes::<32>(word.try_into().unwrap()), U256::from(42u64));
        let word = ledger
            .static_call(&StaticCall::new(TOKEN, addr(1).0.to_vec()))
            .unwrap();
        assert_eq!(word[31], 9);
        assert_eq!(
            ledger.static_call(&StaticCall::new(addr(0x52), Vec::new())),
            Err(CallError::UnknownTarget)
        );
    }

    #[test]
    fn hooks_log_and_pay() {
        let mut ledger = MemoryLedger::new();
        let hook = addr(0x70);
        ledger.mint(&hook, &TOKEN, 5);
        ledger.set_interaction(
            hook,
            InteractionBehavior::Pay {
                asset: TOKEN,
                to: addr(2),
                amount: 5,
            },
        );
        let order = Order::new(addr(1), TOKEN, WETH, 1, 1);
        let hash = OrderHash([3u8; 32]);
        let call = InteractionCall {
            phase: InteractionPhase::Taker,
            order_hash: &hash,
            order: &order,
            taker: &addr(2),
            making_amount: 1,
            taking_amount: 1,
            remaining: 1,
            data: &[0xab],
        };
        ledger.interact(&hook, &call).unwrap();
        assert_eq!(ledger.balance_of(&addr(2), &TOKEN), 5);
        assert_eq!(ledger.interaction_log().len(), 1);
        assert!(ledger.interact(&addr(0x71), &call).is_err());
    }
}
