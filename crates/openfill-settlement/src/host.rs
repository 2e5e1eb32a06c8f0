//! The host boundary: everything the fill engine needs from its
//! execution environment.
//!
//! A [`Host`] moves assets, executes permits, answers read-only calls,
//! runs interaction hooks and offers a transactional boundary. The engine
//! opens one checkpoint per fill and either commits it or rolls it back,
//! so a host must make every mutation made through these traits
//! reversible until commit.

use openfill_gates::{PermitPrimitives, StaticCaller};
use openfill_types::{Address, Order, OrderHash};
use thiserror::Error;

/// Why an asset transfer failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("insufficient balance of {asset}: need {needed}, have {available}")]
    InsufficientBalance {
        asset: Address,
        needed: u128,
        available: u128,
    },
    #[error("insufficient allowance of {asset}: need {needed}, have {available}")]
    InsufficientAllowance {
        asset: Address,
        needed: u128,
        available: u128,
    },
    #[error("allowance expired")]
    Expired,
    #[error("transfer unsupported: {0}")]
    Unsupported(String),
}

/// Allowance-based asset movement.
pub trait AssetTransfer {
    /// Move `amount` of `asset` from `from` to `to`, spending `spender`'s
    /// token allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TransferError>;

    /// Same, spending `spender`'s permit2 allowance instead.
    fn permit2_transfer_from(
        &mut self,
        spender: &Address,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TransferError>;

    /// Burn `amount` of wrapped-native held by `holder` and credit `to`
    /// with the same native balance.
    fn unwrap_native(
        &mut self,
        wrapped: &Address,
        holder: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TransferError>;
}

/// When an interaction hook runs relative to the two legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionPhase {
    /// Before the maker leg.
    Pre,
    /// Between the maker leg and the taker leg.
    Taker,
    /// After the taker leg.
    Post,
}

impl std::fmt::Display for InteractionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pre => write!(f, "PRE"),
            Self::Taker => write!(f, "TAKER"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// Everything a hook learns about the fill it is part of.
#[derive(Debug, Clone, Copy)]
pub struct InteractionCall<'a> {
    pub phase: InteractionPhase,
    pub order_hash: &'a OrderHash,
    pub order: &'a Order,
    pub taker: &'a Address,
    pub making_amount: u128,
    pub taking_amount: u128,
    /// Making amount fillable before this fill.
    pub remaining: u128,
    pub data: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("interaction at {target} rejected: {reason}")]
    Rejected { target: Address, reason: String },
}

/// Executes interaction hooks.
pub trait InteractionHandler {
    fn interact(
        &mut self,
        target: &Address,
        call: &InteractionCall<'_>,
    ) -> Result<(), InteractionError>;
}

/// Marker returned by [`Transactional::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Checkpoint(pub usize);

/// Nested transactional boundary over host state.
pub trait Transactional {
    fn begin(&mut self) -> Checkpoint;
    /// Keep every mutation made since `checkpoint`.
    fn commit(&mut self, checkpoint: Checkpoint);
    /// Undo every mutation made since `checkpoint`.
    fn rollback(&mut self, checkpoint: Checkpoint);
}

/// The complete execution environment of the fill engine.
pub trait Host:
    AssetTransfer + PermitPrimitives + StaticCaller + InteractionHandler + Transactional
{
    /// Current unix time in seconds.
    fn timestamp(&self) -> u64;
}
