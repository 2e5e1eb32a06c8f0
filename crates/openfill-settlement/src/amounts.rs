//! Fill amount resolution.
//!
//! The taker names one side of the fill; the other side follows from the
//! order's price, floor-rounded:
//!
//! ```text
//! taking = making × order.taking / order.making
//! making = taking × order.making / order.taking
//! ```
//!
//! Products are computed in 256 bits so no `u128` pair overflows.

use openfill_types::{OpenfillError, Order, Result, TakerTraits, U256};
use serde::Serialize;

/// `⌊a × b / denominator⌋`.
///
/// # Errors
/// [`OpenfillError::AmountComputation`] on a zero denominator or a
/// quotient wider than `u128`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(OpenfillError::AmountComputation {
            reason: "division by zero amount".to_string(),
        });
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(denominator);
    u128::try_from(quotient).map_err(|_| OpenfillError::AmountComputation {
        reason: format!("{a} × {b} / {denominator} overflows u128"),
    })
}

/// Taking amount owed for `making` units of the maker asset.
pub fn taking_for_making(order: &Order, making: u128) -> Result<u128> {
    mul_div(making, order.taking_amount, order.making_amount)
}

/// Making amount due for `taking` units of the taker asset.
pub fn making_for_taking(order: &Order, taking: u128) -> Result<u128> {
    mul_div(taking, order.making_amount, order.taking_amount)
}

/// The two legs of one fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedAmounts {
    pub making: u128,
    pub taking: u128,
}

/// Resolve the fill amounts for a taker request against `remaining`.
///
/// An `amount` above what remains is clamped, not rejected.
///
/// # Errors
/// - [`OpenfillError::ZeroAmount`] if both legs resolve to zero
/// - [`OpenfillError::PartialFillNotAllowed`] for a partial fill of a
///   no-partial-fills order
/// - [`OpenfillError::TakingAmountTooHigh`] / [`OpenfillError::MakingAmountTooLow`]
///   when the taker's threshold is violated
pub fn resolve(
    order: &Order,
    remaining: u128,
    amount: u128,
    taker: &TakerTraits,
) -> Result<ResolvedAmounts> {
    let (making, taking) = if taker.threshold_is_making_amount {
        let making = amount.min(remaining);
        (making, taking_for_making(order, making)?)
    } else {
        if order.taking_amount == 0 {
            return Err(OpenfillError::AmountComputation {
                reason: "division by zero amount".to_string(),
            });
        }
        // Compared wide: an oversized taking amount clamps, it never overflows.
        let making = U256::from(amount) * U256::from(order.making_amount)
            / U256::from(order.taking_amount);
        if making > U256::from(remaining) {
            (remaining, taking_for_making(order, remaining)?)
        } else {
            (making.wrapping_to::<u128>(), amount)
        }
    };

    if making == 0 && taking == 0 {
        return Err(OpenfillError::ZeroAmount);
    }
    if !order.maker_traits.allow_partial_fills() && making != order.making_amount {
        return Err(OpenfillError::PartialFillNotAllowed);
    }
    if taker.threshold != 0 {
        if taker.threshold_is_making_amount {
            if taking > taker.threshold {
                return Err(OpenfillError::TakingAmountTooHigh {
                    taking,
                    threshold: taker.threshold,
                });
            }
        } else if making < taker.threshold {
            return Err(OpenfillError::MakingAmountTooLow {
                making,
                threshold: taker.threshold,
            });
        }
    }
    Ok(ResolvedAmounts { making, taking })
}
