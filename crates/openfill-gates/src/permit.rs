//! Permit gate: run a signed pre-approval before the swap.
//!
//! The gate only checks that the permit names the protocol as spender and
//! hands it to the host's [`PermitPrimitives`]. Signature, nonce and
//! deadline checks belong to the primitive, which is also where the
//! digests below are consumed.

use openfill_types::{
    Address, ClassicPermit, MakerPermit, OpenfillError, Permit2Permit, PermitPayload, Result,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

const CLASSIC_PERMIT_DOMAIN: &[u8] = b"openfill:permit:v1:";
const PERMIT2_DOMAIN: &[u8] = b"openfill:permit2:v1:";

/// Why a permit primitive refused a permit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermitError {
    #[error("invalid permit signature")]
    InvalidSignature,
    #[error("permit deadline passed")]
    Expired,
    #[error("permit nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch { expected: u64, got: u64 },
    #[error("permit unsupported: {0}")]
    Unsupported(String),
}

/// Host-side permit primitives (classic in-token and permit2 aggregator).
pub trait PermitPrimitives {
    /// Classic permit: set `allowance(owner, spender) = value` on `token`.
    fn permit(&mut self, token: &Address, permit: &ClassicPermit)
    -> std::result::Result<(), PermitError>;

    /// Aggregator permit: set the permit2 allowance of `spender` over
    /// `owner`'s `token`.
    fn permit2(
        &mut self,
        token: &Address,
        permit: &Permit2Permit,
    ) -> std::result::Result<(), PermitError>;
}

/// Digest the owner signs for a classic permit. `nonce` is the token's
/// current permit nonce for `owner`.
#[must_use]
pub fn classic_permit_digest(token: &Address, permit: &ClassicPermit, nonce: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(CLASSIC_PERMIT_DOMAIN);
    hasher.update(token.as_bytes());
    hasher.update(permit.owner.as_bytes());
    hasher.update(permit.spender.as_bytes());
    hasher.update(permit.value.to_be_bytes());
    hasher.update(nonce.to_be_bytes());
    hasher.update(permit.deadline.to_be_bytes());
    hasher.finalize().into()
}

/// Digest the owner signs for a permit2 permit issued by `permit2`.
#[must_use]
pub fn permit2_digest(permit2: &Address, token: &Address, permit: &Permit2Permit) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PERMIT2_DOMAIN);
    hasher.update(permit2.as_bytes());
    hasher.update(token.as_bytes());
    hasher.update(permit.owner.as_bytes());
    hasher.update(permit.spender.as_bytes());
    hasher.update(permit.amount.to_be_bytes());
    hasher.update(permit.expiration.to_be_bytes());
    hasher.update(permit.nonce.to_be_bytes());
    hasher.update(permit.sig_deadline.to_be_bytes());
    hasher.finalize().into()
}

/// Executes permits on behalf of one protocol deployment.
#[derive(Debug, Clone, Copy)]
pub struct PermitGate {
    protocol: Address,
}

impl PermitGate {
    #[must_use]
    pub fn new(protocol: Address) -> Self {
        Self { protocol }
    }

    /// Execute `permit` against the host.
    ///
    /// # Errors
    /// [`OpenfillError::PermitFailure`] when the spender is not the
    /// protocol or the primitive rejects the permit.
    pub fn apply<P: PermitPrimitives + ?Sized>(&self, host: &mut P, permit: &MakerPermit) -> Result<()> {
        let spender = permit.payload.spender();
        if *spender != self.protocol {
            return Err(OpenfillError::PermitFailure {
                reason: format!("spender {spender} is not the protocol {}", self.protocol),
            });
        }
        let outcome = match &permit.payload {
            PermitPayload::Classic(p) => host.permit(&permit.token, p),
            PermitPayload::Permit2(p) => host.permit2(&permit.token, p),
        };
        outcome.map_err(|e| OpenfillError::PermitFailure {
            reason: format!("{} permit on {}: {e}", permit.payload.kind(), permit.token),
        })?;
        tracing::debug!(
            kind = permit.payload.kind(),
            token = %permit.token,
            owner = %permit.payload.owner(),
            "permit applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openfill_types::CompactSignature;

    #[derive(Default)]
    struct Recorder {
        classic: Vec<Address>,
        permit2: Vec<Address>,
        reject: bool,
    }

    impl PermitPrimitives for Recorder {
        fn permit(
            &mut self,
            token: &Address,
            _permit: &ClassicPermit,
        ) -> std::result::Result<(), PermitError> {
            if self.reject {
                return Err(PermitError::Expired);
            }
            self.classic.push(*token);
            Ok(())
        }

        fn permit2(
            &mut self,
            token: &Address,
            _permit: &Permit2Permit,
        ) -> std::result::Result<(), PermitError> {
            self.permit2.push(*token);
            Ok(())
        }
    }

    const PROTOCOL: Address = Address([0xeeu8; 32]);
    const TOKEN: Address = Address([0x0au8; 32]);

    fn classic(spender: Address) -> MakerPermit {
        MakerPermit::classic(
            TOKEN,
            ClassicPermit {
                owner: Address([1u8; 32]),
                spender,
                value: 10,
                deadline: 100,
                signature: CompactSignature::new([0u8; 32], [0u8; 32]),
            },
        )
    }

    #[test]
    fn routes_by_kind() {
        let mut host = Recorder::default();
        let gate = PermitGate::new(PROTOCOL);
        gate.apply(&mut host, &classic(PROTOCOL)).unwrap();
        let p2 = MakerPermit::permit2(
            TOKEN,
            Permit2Permit {
                owner: Address([1u8; 32]),
                spender: PROTOCOL,
                amount: 1,
                expiration: 10,
                nonce: 0,
                sig_deadline: 10,
                signature: CompactSignature::new([0u8; 32], [0u8; 32]),
            },
        );
        gate.apply(&mut host, &p2).unwrap();
        assert_eq!(host.classic, vec![TOKEN]);
        assert_eq!(host.permit2, vec![TOKEN]);
    }

    #[test]
    fn wrong_spender_never_reaches_host() {
        let mut host = Recorder::default();
        let err = PermitGate::new(PROTOCOL)
            .apply(&mut host, &classic(Address([2u8; 32])))
            .unwrap_err();
        assert!(matches!(err, OpenfillError::PermitFailure { .. }));
        assert!(host.classic.is_empty());
    }

    #[test]
    fn primitive_failure_maps_to_permit_failure() {
        let mut host = Recorder {
            reject: true,
            ..Recorder::default()
        };
        let err = PermitGate::new(PROTOCOL)
            .apply(&mut host, &classic(PROTOCOL))
            .unwrap_err();
        assert!(format!("{err}").contains("deadline"));
    }

    #[test]
    fn digests_bind_every_field() {
        let MakerPermit {
            payload: PermitPayload::Classic(p),
            ..
        } = classic(PROTOCOL)
        else {
            unreachable!()
        };
        let base = classic_permit_digest(&TOKEN, &p, 0);
        assert_ne!(base, classic_permit_digest(&TOKEN, &p, 1));
        assert_ne!(base, classic_permit_digest(&Address([1u8; 32]), &p, 0));
        let mut q = p.clone();
        q.value = 11;
        assert_ne!(base, classic_permit_digest(&TOKEN, &q, 0));
    }
}
