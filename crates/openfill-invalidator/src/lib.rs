//! # openfill-invalidator
//!
//! Persistent replay and cancellation state for signed orders.
//!
//! Every order is invalidated through exactly one scheme, chosen from its
//! maker traits by [`InvalidatorKind::for_traits`]:
//!
//! - **Bit**: single-use orders. The first fill consumes the order.
//! - **Remaining**: multi-fill orders. A remaining making amount is
//!   tracked and only ever decreases.
//! - **Epoch**: multi-fill orders that also carry a series epoch. The maker
//!   can bump the epoch to kill every outstanding order of the series.
//!
//! Makers mutate only their own entries, through a [`MakerScope`].

pub mod snapshot;
pub mod store;

pub use snapshot::{EpochEntry, InvalidatorSnapshot, RemainingEntry};
pub use store::{InvalidatorKind, InvalidatorStore, MakerScope, RemainingInvalidator};
