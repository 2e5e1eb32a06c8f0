//! The signed limit order.
//!
//! An [`Order`] is immutable once signed. Fill attempts never touch it;
//! they only mutate invalidator state keyed by the order's hash.

use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::extension::salt_mask;
use crate::{Address, Extension, MakerTraits, OpenfillError, Result};

/// A maker's offer to exchange `making_amount` of `maker_asset` for
/// `taking_amount` of `taker_asset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Uniqueness salt. The low 160 bits commit to the extension when
    /// `maker_traits.has_extension` is set.
    pub salt: U256,
    /// Signer and source of the maker asset.
    pub maker: Address,
    /// Destination of the taker asset; zero means the maker.
    pub receiver: Address,
    pub maker_asset: Address,
    pub taker_asset: Address,
    pub making_amount: u128,
    pub taking_amount: u128,
    pub maker_traits: MakerTraits,
}

impl Order {
    /// Order with a zero salt, no receiver override and default traits.
    #[must_use]
    pub fn new(
        maker: Address,
        maker_asset: Address,
        taker_asset: Address,
        making_amount: u128,
        taking_amount: u128,
    ) -> Self {
        Self {
            salt: U256::ZERO,
            maker,
            receiver: Address::ZERO,
            maker_asset,
            taker_asset,
            making_amount,
            taking_amount,
            maker_traits: MakerTraits::default(),
        }
    }

    #[must_use]
    pub fn with_salt(mut self, salt: U256) -> Self {
        self.salt = salt;
        self
    }

    #[must_use]
    pub fn with_receiver(mut self, receiver: Address) -> Self {
        self.receiver = receiver;
        self
    }

    #[must_use]
    pub fn with_traits(mut self, traits: MakerTraits) -> Self {
        self.maker_traits = traits;
        self
    }

    /// Commit the salt to `extension` and flag `has_extension`.
    ///
    /// The salt's high 96 bits are preserved. Returns the encoded
    /// extension bytes the taker must later supply.
    pub fn bind_extension(&mut self, extension: &Extension) -> Result<Vec<u8>> {
        let encoded = extension.encode()?;
        self.salt = (self.salt & !salt_mask()) | Extension::salt_commitment(&encoded);
        self.maker_traits.has_extension = true;
        Ok(encoded)
    }

    /// Where the taker asset is delivered.
    #[must_use]
    pub fn receiver_or_maker(&self) -> Address {
        if self.receiver.is_zero() {
            self.maker
        } else {
            self.receiver
        }
    }

    /// Whether `encoded` is the extension this order's salt commits to.
    #[must_use]
    pub fn commits_to(&self, encoded: &[u8]) -> bool {
        self.salt & salt_mask() == Extension::salt_commitment(encoded)
    }

    /// Structural checks that do not depend on protocol state.
    pub fn validate(&self) -> Result<()> {
        if self.maker.is_zero() {
            return Err(OpenfillError::InvalidOrder {
                reason: "maker is the zero address".to_string(),
            });
        }
        if self.maker_asset.is_zero() || self.taker_asset.is_zero() {
            return Err(OpenfillError::InvalidOrder {
                reason: "asset is the zero address".to_string(),
            });
        }
        if self.maker_traits.should_check_epoch && !self.maker_traits.allow_multiple_fills {
            return Err(OpenfillError::InconsistentTraits);
        }
        Ok(())
    }
}
