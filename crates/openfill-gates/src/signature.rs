//! Signature gate: is this order authorized by its maker?
//!
//! The verifier is a trait so hosts can swap the primitive. The default
//! [`Ed25519Verifier`] treats the maker address as an ed25519 verifying
//! key and the compact signature as `R ‖ s`.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use openfill_types::{Address, CompactSignature, Order, OpenfillError, OrderHash, Result};

use crate::Domain;

/// Verifies that `signature` over `digest` was produced by `signer`.
pub trait SignatureVerifier {
    fn verify(&self, signer: &Address, digest: &[u8; 32], signature: &CompactSignature) -> bool;
}

/// Strict ed25519 verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, signer: &Address, digest: &[u8; 32], signature: &CompactSignature) -> bool {
        if signature.has_reserved_bit() {
            return false;
        }
        let Ok(key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
            return false;
        };
        let signature = Signature::from_bytes(&signature.to_bytes());
        key.verify_strict(digest, &signature).is_ok()
    }
}

/// Check an order hash against the maker's signature.
///
/// # Errors
/// [`OpenfillError::BadSignature`] if verification fails.
pub fn verify_order<V: SignatureVerifier + ?Sized>(
    verifier: &V,
    order: &Order,
    order_hash: &OrderHash,
    signature: &CompactSignature,
) -> Result<()> {
    if verifier.verify(&order.maker, order_hash.as_bytes(), signature) {
        tracing::debug!(order = %order_hash, maker = %order.maker, "signature accepted");
        Ok(())
    } else {
        Err(OpenfillError::BadSignature)
    }
}

/// Maker-side signing key.
pub struct OrderSigner {
    key: SigningKey,
}

impl OrderSigner {
    #[must_use]
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }

    /// The address orders signed by this key must name as maker.
    #[must_use]
    pub fn address(&self) -> Address {
        Address(self.key.verifying_key().to_bytes())
    }

    #[must_use]
    pub fn sign_digest(&self, digest: &[u8; 32]) -> CompactSignature {
        CompactSignature::from_bytes(&self.key.sign(digest).to_bytes())
    }

    #[must_use]
    pub fn sign_order(&self, domain: &Domain, order: &Order) -> CompactSignature {
        self.sign_digest(domain.order_hash(order).as_bytes())
    }
}

impl std::fmt::Debug for OrderSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
