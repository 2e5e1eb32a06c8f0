//! Error types for the OpenFill settlement core.
//!
//! All errors use the `OF_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order / extension errors
//! - 2xx: Invalidator errors
//! - 3xx: Signature errors
//! - 4xx: Predicate errors
//! - 5xx: Permit errors
//! - 6xx: Amount errors
//! - 7xx: Settlement errors
//! - 9xx: General / internal errors

use thiserror::Error;

/// Central error enum for all OpenFill operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenfillError {
    // =================================================================
    // Order / Extension Errors (1xx)
    // =================================================================
    /// The order failed validation (bad values, unusable assets).
    #[error("OF_ERR_100: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The order's expiry has been reached.
    #[error("OF_ERR_101: Order expired")]
    OrderExpired,

    /// The caller is not the order's allowed sender.
    #[error("OF_ERR_102: Private order: caller is not the allowed sender")]
    PrivateOrder,

    /// Maker traits contradict each other.
    #[error("OF_ERR_103: Inconsistent maker traits: epoch check requires multiple fills")]
    InconsistentTraits,

    /// The order commits to an extension but none was supplied.
    #[error("OF_ERR_104: Missing order extension")]
    MissingOrderExtension,

    /// An extension was supplied for an order that commits to none.
    #[error("OF_ERR_105: Unexpected order extension")]
    UnexpectedOrderExtension,

    /// The supplied extension does not hash to the salt's low bits.
    #[error("OF_ERR_106: Extension hash does not match order salt")]
    InvalidExtensionHash,

    /// Extension or fill-args bytes could not be parsed.
    #[error("OF_ERR_107: Malformed extension: {reason}")]
    MalformedExtension { reason: String },

    // =================================================================
    // Invalidator Errors (2xx)
    // =================================================================
    /// The order's epoch differs from the maker's current epoch for its series.
    #[error("OF_ERR_200: Wrong series nonce")]
    WrongSeriesNonce,

    /// Bit consumed, remaining amount zero, or order cancelled.
    #[error("OF_ERR_201: Order is not fillable")]
    OrderIsNotFillable,

    /// A caller tried to mutate another maker's invalidator state.
    #[error("OF_ERR_202: Unauthorized: caller is not the maker")]
    Unauthorized,

    /// Epoch advance out of range or past the epoch slot width.
    #[error("OF_ERR_203: Advance epoch failed: {reason}")]
    AdvanceEpochFailed { reason: String },

    // =================================================================
    // Signature Errors (3xx)
    // =================================================================
    /// The signature was not produced by the order's maker.
    #[error("OF_ERR_300: Bad signature")]
    BadSignature,

    // =================================================================
    // Predicate Errors (4xx)
    // =================================================================
    /// The attached predicate evaluated to false.
    #[error("OF_ERR_400: Predicate is not true")]
    PredicateIsNotTrue,

    /// Predicate bytes could not be parsed.
    #[error("OF_ERR_401: Malformed predicate: {reason}")]
    MalformedPredicate { reason: String },

    // =================================================================
    // Permit Errors (5xx)
    // =================================================================
    /// A permit pre-approval reverted or was malformed.
    #[error("OF_ERR_500: Permit failure: {reason}")]
    PermitFailure { reason: String },

    // =================================================================
    // Amount Errors (6xx)
    // =================================================================
    /// Both resolved amounts are zero.
    #[error("OF_ERR_600: Zero amount")]
    ZeroAmount,

    /// A no-partial-fills order was not filled in full.
    #[error("OF_ERR_601: Partial fill not allowed")]
    PartialFillNotAllowed,

    /// Resolved taking amount exceeds the taker's threshold.
    #[error("OF_ERR_602: Taking amount too high: {taking} > threshold {threshold}")]
    TakingAmountTooHigh { taking: u128, threshold: u128 },

    /// Resolved making amount is below the taker's threshold.
    #[error("OF_ERR_603: Making amount too low: {making} < threshold {threshold}")]
    MakingAmountTooLow { making: u128, threshold: u128 },

    /// Proportional amount computation failed (zero total, overflow).
    #[error("OF_ERR_604: Amount computation failed: {reason}")]
    AmountComputation { reason: String },

    // =================================================================
    // Settlement Errors (7xx)
    // =================================================================
    /// One leg of the swap could not be transferred.
    #[error("OF_ERR_700: Transfer failure: {reason}")]
    TransferFailure { reason: String },

    /// A pre/post/taker interaction rejected the fill.
    #[error("OF_ERR_701: Interaction failure: {reason}")]
    InteractionFailure { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OF_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("OF_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("OF_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("OF_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpenfillError>;

impl From<std::io::Error> for OpenfillError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OpenfillError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let msg = format!("{}", OpenfillError::OrderIsNotFillable);
        assert!(msg.starts_with("OF_ERR_201"), "Got: {msg}");
    }

    #[test]
    fn threshold_errors_show_amounts() {
        let err = OpenfillError::TakingAmountTooHigh {
            taking: 11,
            threshold: 10,
        };
        let msg = format!("{err}");
        assert!(msg.contains("11"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: OpenfillError = io.into();
        assert!(matches!(err, OpenfillError::Io(_)));
        assert!(format!("{err}").starts_with("OF_ERR_903"));
    }

    #[test]
    fn all_codes_are_prefixed() {
        let errors = [
            OpenfillError::OrderExpired,
            OpenfillError::WrongSeriesNonce,
            OpenfillError::BadSignature,
            OpenfillError::PredicateIsNotTrue,
            OpenfillError::ZeroAmount,
            OpenfillError::PermitFailure {
                reason: "expired".into(),
            },
            OpenfillError::TransferFailure {
                reason: "balance".into(),
            },
        ];
        for err in errors {
            assert!(format!("{err}").starts_with("OF_ERR_"));
        }
    }
}
