//! # openfill-types
//!
//! Shared types, errors, and configuration for the **OpenFill** limit-order
//! settlement core.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`Address`], [`OrderHash`]
//! - **Trait codecs**: [`MakerTraits`], [`TakerTraits`] ⇄ 256-bit words
//! - **Order model**: [`Order`]
//! - **Extension model**: [`Extension`], [`Interaction`], [`MakerPermit`]
//! - **Predicates**: [`Predicate`], [`CompareOp`], [`StaticCall`]
//! - **Signatures**: [`CompactSignature`]
//! - **Events**: [`ProtocolEvent`]
//! - **Configuration**: [`ProtocolConfig`]
//! - **Errors**: [`OpenfillError`] with `OF_ERR_` prefix codes
//! - **Constants**: bit widths, limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod extension;
pub mod ids;
pub mod order;
pub mod permit;
pub mod predicate;
pub mod signature;
pub mod traits;

pub use config::*;
pub use error::*;
pub use events::*;
pub use extension::*;
pub use ids::*;
pub use order::*;
pub use permit::*;
pub use predicate::*;
pub use signature::*;
pub use traits::*;

pub use ruint::aliases::U256;

// Constants are accessed via `openfill_types::constants::FOO`
// (not re-exported to avoid name collisions).
