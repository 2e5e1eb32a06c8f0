//! Predicate evaluation over read-only host calls.
//!
//! Leaves call out through a [`StaticCaller`] and read the result as a
//! big-endian 256-bit integer. A call that fails, or returns anything
//! other than exactly 32 bytes, makes its leaf false. It never aborts
//! evaluation with an error.

use openfill_types::{OpenfillError, Predicate, Result, StaticCall};
use ruint::aliases::U256;
use thiserror::Error;

/// Why a read-only call produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("call reverted: {0}")]
    Reverted(String),
    #[error("no view registered at target")]
    UnknownTarget,
}

/// Host hook for side-effect-free reads.
pub trait StaticCaller {
    fn static_call(&self, call: &StaticCall) -> std::result::Result<Vec<u8>, CallError>;
}

/// Recursive evaluator borrowing the host for the duration of a check.
pub struct PredicateEvaluator<'a, C: StaticCaller + ?Sized> {
    caller: &'a C,
}

impl<'a, C: StaticCaller + ?Sized> PredicateEvaluator<'a, C> {
    pub fn new(caller: &'a C) -> Self {
        Self { caller }
    }

    /// Evaluate with short-circuiting. An empty `And` is true and an
    /// empty `Or` is false.
    pub fn evaluate(&self, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Compare {
                op,
                threshold,
                call,
            } => match self.read(call) {
                Some(value) => {
                    let holds = op.holds(value, *threshold);
                    tracing::debug!(%op, %value, %threshold, holds, "predicate leaf");
                    holds
                }
                None => false,
            },
            Predicate::And(children) => children.iter().all(|c| self.evaluate(c)),
            Predicate::Or(children) => children.iter().any(|c| self.evaluate(c)),
        }
    }

    /// Evaluate and turn a false root into an error.
    ///
    /// # Errors
    /// [`OpenfillError::PredicateIsNotTrue`] if the root is false.
    pub fn check(&self, predicate: &Predicate) -> Result<()> {
        if self.evaluate(predicate) {
            Ok(())
        } else {
            Err(OpenfillError::PredicateIsNotTrue)
        }
    }

    fn read(&self, call: &StaticCall) -> Option<U256> {
        match self.caller.static_call(call) {
            Ok(bytes) => {
                let word: [u8; 32] = bytes.as_slice().try_into().ok()?;
                Some(U256::from_be_bytes(word))
            }
            Err(err) => {
                tracing::debug!(call_target = %call.target, error = %err, "predicate call failed");
                None
            }
        }
    }
}
