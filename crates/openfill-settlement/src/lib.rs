//! # openfill-settlement
//!
//! The fill engine and its host boundary.
//!
//! - [`LimitOrderProtocol`]: ordered checks, amount resolution, atomic
//!   two-leg settlement, cancellation and epoch management
//! - [`FillRequest`] / [`FillOutcome`]: the taker's request and its result
//! - [`Host`]: what the engine needs from its environment
//! - [`MemoryLedger`]: an in-memory host with an undo journal

pub mod amounts;
pub mod engine;
pub mod host;
pub mod ledger;

pub use amounts::{mul_div, resolve, ResolvedAmounts};
pub use engine::{FillOutcome, FillRequest, LimitOrderProtocol};
pub use host::{
    AssetTransfer, Checkpoint, Host, InteractionCall, InteractionError, InteractionHandler,
    InteractionPhase, Transactional, TransferError,
};
pub use ledger::{InteractionBehavior, InteractionRecord, MemoryLedger, Permit2Allowance, View};
