//! Maker and taker trait bitfields.
//!
//! Both trait sets travel as a single 256-bit word. This module is the
//! only place that knows the bit layout; everything else works with the
//! named fields.
//!
//! ## MakerTraits layout
//!
//! ```text
//!  255  no_partial_fills        250  should_check_epoch
//!  254  allow_multiple_fills    249  has_extension
//!  253  (unused)                248  use_permit2
//!  252  pre_interaction         247  unwrap_weth
//!  251  post_interaction
//!
//!  160..200  series   120..160  nonce_or_epoch
//!   80..120  expiry     0..80   allowed_sender
//! ```
//!
//! ## TakerTraits layout
//!
//! ```text
//!  255  threshold_is_making_amount   252  use_permit2
//!  254  unwrap_weth                  251  has_target
//!  253  skip_maker_permit
//!
//!  224..248  extension_length   200..224  interaction_length
//!    0..128  threshold
//! ```
//!
//! Decoding never fails: unused bits are ignored. Encoding truncates a
//! field that is wider than its slot.

use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::constants::{ALLOWED_SENDER_BITS, MAKER_U40_BITS, TAKER_LENGTH_BITS, THRESHOLD_BITS};

const NO_PARTIAL_FILLS_BIT: usize = 255;
const ALLOW_MULTIPLE_FILLS_BIT: usize = 254;
const PRE_INTERACTION_BIT: usize = 252;
const POST_INTERACTION_BIT: usize = 251;
const SHOULD_CHECK_EPOCH_BIT: usize = 250;
const HAS_EXTENSION_BIT: usize = 249;
const MAKER_USE_PERMIT2_BIT: usize = 248;
const MAKER_UNWRAP_WETH_BIT: usize = 247;

const ALLOWED_SENDER_OFFSET: usize = 0;
const EXPIRY_OFFSET: usize = 80;
const NONCE_OR_EPOCH_OFFSET: usize = 120;
const SERIES_OFFSET: usize = 160;

const THRESHOLD_IS_MAKING_BIT: usize = 255;
const TAKER_UNWRAP_WETH_BIT: usize = 254;
const SKIP_MAKER_PERMIT_BIT: usize = 253;
const TAKER_USE_PERMIT2_BIT: usize = 252;
const HAS_TARGET_BIT: usize = 251;

const EXTENSION_LENGTH_OFFSET: usize = 224;
const INTERACTION_LENGTH_OFFSET: usize = 200;
const THRESHOLD_OFFSET: usize = 0;

fn mask(bits: usize) -> U256 {
    (U256::from(1u8) << bits) - U256::from(1u8)
}

fn read_field(word: U256, offset: usize, bits: usize) -> U256 {
    (word >> offset) & mask(bits)
}

fn write_field(word: &mut U256, offset: usize, bits: usize, value: U256) {
    *word |= (value & mask(bits)) << offset;
}

// ---------------------------------------------------------------------------
// MakerTraits
// ---------------------------------------------------------------------------

/// Maker preferences signed into the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MakerTraits {
    /// The order must be filled for its full making amount in one go.
    pub no_partial_fills: bool,
    /// The order may be filled several times (remaining-amount invalidator).
    pub allow_multiple_fills: bool,
    /// Run the extension's pre-interaction before the maker leg.
    pub pre_interaction: bool,
    /// Run the extension's post-interaction after the taker leg.
    pub post_interaction: bool,
    /// Check `nonce_or_epoch` against the maker's epoch for `series`.
    pub should_check_epoch: bool,
    /// The salt's low bits commit to an extension.
    pub has_extension: bool,
    /// Pull the maker asset through the permit2 aggregator.
    pub use_permit2: bool,
    /// Deliver the wrapped-native taker asset to the maker as native balance.
    pub unwrap_weth: bool,
    /// Low 80 bits of the only address allowed to fill; zero means anyone.
    pub allowed_sender: u128,
    /// Unix timestamp after which the order is dead; zero means never.
    pub expiry: u64,
    /// Epoch the order was signed against (epoch-checked orders).
    pub nonce_or_epoch: u64,
    /// Invalidation group for epoch-checked orders.
    pub series: u64,
}

impl MakerTraits {
    /// Decode a traits word. Every bit pattern decodes.
    #[must_use]
    pub fn decode(word: U256) -> Self {
        Self {
            no_partial_fills: word.bit(NO_PARTIAL_FILLS_BIT),
            allow_multiple_fills: word.bit(ALLOW_MULTIPLE_FILLS_BIT),
            pre_interaction: word.bit(PRE_INTERACTION_BIT),
            post_interaction: word.bit(POST_INTERACTION_BIT),
            should_check_epoch: word.bit(SHOULD_CHECK_EPOCH_BIT),
            has_extension: word.bit(HAS_EXTENSION_BIT),
            use_permit2: word.bit(MAKER_USE_PERMIT2_BIT),
            unwrap_weth: word.bit(MAKER_UNWRAP_WETH_BIT),
            allowed_sender: read_field(word, ALLOWED_SENDER_OFFSET, ALLOWED_SENDER_BITS)
                .wrapping_to::<u128>(),
            expiry: read_field(word, EXPIRY_OFFSET, MAKER_U40_BITS).wrapping_to::<u64>(),
            nonce_or_epoch: read_field(word, NONCE_OR_EPOCH_OFFSET, MAKER_U40_BITS)
                .wrapping_to::<u64>(),
            series: read_field(word, SERIES_OFFSET, MAKER_U40_BITS).wrapping_to::<u64>(),
        }
    }

    /// Encode into a traits word. Exact inverse of [`MakerTraits::decode`]
    /// for values that fit their slots.
    #[must_use]
    pub fn encode(&self) -> U256 {
        let mut word = U256::ZERO;
        word.set_bit(NO_PARTIAL_FILLS_BIT, self.no_partial_fills);
        word.set_bit(ALLOW_MULTIPLE_FILLS_BIT, self.allow_multiple_fills);
        word.set_bit(PRE_INTERACTION_BIT, self.pre_interaction);
        word.set_bit(POST_INTERACTION_BIT, self.post_interaction);
        word.set_bit(SHOULD_CHECK_EPOCH_BIT, self.should_check_epoch);
        word.set_bit(HAS_EXTENSION_BIT, self.has_extension);
        word.set_bit(MAKER_USE_PERMIT2_BIT, self.use_permit2);
        word.set_bit(MAKER_UNWRAP_WETH_BIT, self.unwrap_weth);
        write_field(
            &mut word,
            ALLOWED_SENDER_OFFSET,
            ALLOWED_SENDER_BITS,
            U256::from(self.allowed_sender),
        );
        write_field(&mut word, EXPIRY_OFFSET, MAKER_U40_BITS, U256::from(self.expiry));
        write_field(
            &mut word,
            NONCE_OR_EPOCH_OFFSET,
            MAKER_U40_BITS,
            U256::from(self.nonce_or_epoch),
        );
        write_field(&mut word, SERIES_OFFSET, MAKER_U40_BITS, U256::from(self.series));
        word
    }

    /// Whether the order is consumed by its first fill.
    #[must_use]
    pub fn use_bit_invalidator(&self) -> bool {
        !self.allow_multiple_fills
    }

    #[must_use]
    pub fn allow_partial_fills(&self) -> bool {
        !self.no_partial_fills
    }

    /// Expired at `now`? `expiry == 0` never expires; `now == expiry` is expired.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry != 0 && now >= self.expiry
    }

    /// Whether `sender_key` (see [`crate::Address::sender_key`]) may fill.
    #[must_use]
    pub fn is_allowed_sender(&self, sender_key: u128) -> bool {
        self.allowed_sender == 0 || self.allowed_sender == sender_key
    }
}

// ---------------------------------------------------------------------------
// TakerTraits
// ---------------------------------------------------------------------------

/// Fill-time options chosen by the taker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TakerTraits {
    /// When set the fill `amount` is a making amount and `threshold`
    /// bounds the taking amount from above; otherwise `amount` is a taking
    /// amount and `threshold` bounds the making amount from below.
    pub threshold_is_making_amount: bool,
    /// Receive the wrapped-native maker asset as native balance.
    pub unwrap_weth: bool,
    /// Do not execute the extension's maker permit.
    pub skip_maker_permit: bool,
    /// Pay the taker asset through the permit2 aggregator.
    pub use_permit2: bool,
    /// The args region starts with a 32-byte target override.
    pub has_target: bool,
    /// Length of the extension bytes in the args region.
    pub extension_length: u32,
    /// Length of the taker-interaction bytes in the args region.
    pub interaction_length: u32,
    /// Amount bound; zero disables the check.
    pub threshold: u128,
}

impl TakerTraits {
    /// Decode a traits word. Every bit pattern decodes.
    #[must_use]
    pub fn decode(word: U256) -> Self {
        Self {
            threshold_is_making_amount: word.bit(THRESHOLD_IS_MAKING_BIT),
            unwrap_weth: word.bit(TAKER_UNWRAP_WETH_BIT),
            skip_maker_permit: word.bit(SKIP_MAKER_PERMIT_BIT),
            use_permit2: word.bit(TAKER_USE_PERMIT2_BIT),
            has_target: word.bit(HAS_TARGET_BIT),
            extension_length: read_field(word, EXTENSION_LENGTH_OFFSET, TAKER_LENGTH_BITS)
                .wrapping_to::<u32>(),
            interaction_length: read_field(word, INTERACTION_LENGTH_OFFSET, TAKER_LENGTH_BITS)
                .wrapping_to::<u32>(),
            threshold: read_field(word, THRESHOLD_OFFSET, THRESHOLD_BITS).wrapping_to::<u128>(),
        }
    }

    /// Encode into a traits word. Exact inverse of [`TakerTraits::decode`]
    /// for values that fit their slots.
    #[must_use]
    pub fn encode(&self) -> U256 {
        let mut word = U256::ZERO;
        word.set_bit(THRESHOLD_IS_MAKING_BIT, self.threshold_is_making_amount);
        word.set_bit(TAKER_UNWRAP_WETH_BIT, self.unwrap_weth);
        word.set_bit(SKIP_MAKER_PERMIT_BIT, self.skip_maker_permit);
        word.set_bit(TAKER_USE_PERMIT2_BIT, self.use_permit2);
        word.set_bit(HAS_TARGET_BIT, self.has_target);
        write_field(
            &mut word,
            EXTENSION_LENGTH_OFFSET,
            TAKER_LENGTH_BITS,
            U256::from(self.extension_length),
        );
        write_field(
            &mut word,
            INTERACTION_LENGTH_OFFSET,
            TAKER_LENGTH_BITS,
            U256::from(self.interaction_length),
        );
        write_field(&mut word, THRESHOLD_OFFSET, THRESHOLD_BITS, U256::from(self.threshold));
        word
    }

    /// `amount` is a making amount; `threshold` caps the taking amount.
    #[must_use]
    pub fn fill_with_making_amount(threshold: u128) -> Self {
        Self {
            threshold_is_making_amount: true,
            threshold,
            ..Self::default()
        }
    }

    /// `amount` is a taking amount; `threshold` floors the making amount.
    #[must_use]
    pub fn fill_with_taking_amount(threshold: u128) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Skip the extension's maker permit (the allowance already exists).
    #[must_use]
    pub fn skipping_maker_permit(mut self) -> Self {
        self.skip_maker_permit = true;
        self
    }
}
