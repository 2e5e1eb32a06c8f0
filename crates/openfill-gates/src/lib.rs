//! # openfill-gates
//!
//! The checks a fill passes through before any asset moves:
//!
//! - [`Domain`]: structured-data order hashing.
//! - [`SignatureVerifier`] / [`Ed25519Verifier`]: is the order signed by its maker?
//! - [`PredicateEvaluator`]: does the order's predicate hold right now?
//! - [`PermitGate`]: execute the maker's pre-approval.
//!
//! Each gate reaches the outside world only through a small host trait
//! ([`StaticCaller`], [`PermitPrimitives`]).

pub mod domain;
pub mod permit;
pub mod predicate;
pub mod signature;

pub use domain::Domain;
pub use permit::{classic_permit_digest, permit2_digest, PermitError, PermitGate, PermitPrimitives};
pub use predicate::{CallError, PredicateEvaluator, StaticCaller};
pub use signature::{verify_order, Ed25519Verifier, OrderSigner, SignatureVerifier};
