//! Order extension: the auxiliary payload bound to an order through its salt.
//!
//! ## Wire format
//!
//! ```text
//! header := end(predicate) ‖ end(maker_permit) ‖ end(pre) ‖ end(post)   (4 × u32 BE)
//! body   := predicate ‖ maker_permit ‖ pre_interaction ‖ post_interaction
//! ```
//!
//! Offsets are cumulative and relative to the start of the body. An
//! extension with no fields encodes to zero bytes. The low 160 bits of
//! `sha256(encoded)` are what the order's salt commits to.

use ruint::aliases::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{EXTENSION_HASH_BITS, EXTENSION_HEADER_LEN};
use crate::{
    Address, ClassicPermit, CompactSignature, MakerPermit, OpenfillError, Permit2Permit,
    PermitPayload, Predicate, Result,
};

const PERMIT_KIND_CLASSIC: u8 = 0x01;
const PERMIT_KIND_PERMIT2: u8 = 0x02;

/// A call to a contract hook, as carried in an extension or fill args.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub target: Address,
    pub data: Vec<u8>,
}

impl Interaction {
    #[must_use]
    pub fn new(target: Address, data: impl Into<Vec<u8>>) -> Self {
        Self {
            target,
            data: data.into(),
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + self.data.len());
        out.extend_from_slice(self.target.as_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    /// Parse `target(32) ‖ data`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 32 {
            return Err(malformed(format!(
                "interaction needs a 32-byte target, got {} bytes",
                bytes.len()
            )));
        }
        let mut target = [0u8; 32];
        target.copy_from_slice(&bytes[..32]);
        Ok(Self {
            target: Address(target),
            data: bytes[32..].to_vec(),
        })
    }
}

/// Decoded extension payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub predicate: Option<Predicate>,
    pub maker_permit: Option<MakerPermit>,
    pub pre_interaction: Option<Interaction>,
    pub post_interaction: Option<Interaction>,
}

impl Extension {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicate.is_none()
            && self.maker_permit.is_none()
            && self.pre_interaction.is_none()
            && self.post_interaction.is_none()
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn with_maker_permit(mut self, permit: MakerPermit) -> Self {
        self.maker_permit = Some(permit);
        self
    }

    #[must_use]
    pub fn with_pre_interaction(mut self, interaction: Interaction) -> Self {
        self.pre_interaction = Some(interaction);
        self
    }

    #[must_use]
    pub fn with_post_interaction(mut self, interaction: Interaction) -> Self {
        self.post_interaction = Some(interaction);
        self
    }

    /// Serialize into the wire form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let fields = [
            self.predicate.as_ref().map(Predicate::encode).transpose()?,
            self.maker_permit.as_ref().map(encode_permit),
            self.pre_interaction.as_ref().map(Interaction::encode),
            self.post_interaction.as_ref().map(Interaction::encode),
        ];

        let mut header = Vec::with_capacity(EXTENSION_HEADER_LEN);
        let mut body = Vec::new();
        for field in fields {
            if let Some(bytes) = field {
                body.extend_from_slice(&bytes);
            }
            let end = u32::try_from(body.len())
                .map_err(|_| malformed("extension body longer than u32::MAX"))?;
            header.extend_from_slice(&end.to_be_bytes());
        }
        header.extend_from_slice(&body);
        Ok(header)
    }

    /// Parse the wire form. Empty input is the empty extension.
    ///
    /// # Errors
    /// [`OpenfillError::MalformedExtension`] for a bad layout or field, and
    /// [`OpenfillError::PermitFailure`] for a malformed maker-permit slot.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let [_, permit, _, _] = split_slots(bytes)?;
        Ok(Self {
            maker_permit: non_empty(permit).map(decode_permit).transpose()?,
            ..Self::decode_without_permit(bytes)?
        })
    }

    /// Parse every field except the maker permit, whose slot is only
    /// bounds-checked. Pair with [`Extension::decode_maker_permit`] to run
    /// the permit parse at the point it is needed.
    pub fn decode_without_permit(bytes: &[u8]) -> Result<Self> {
        let [predicate, _, pre, post] = split_slots(bytes)?;
        Ok(Self {
            predicate: non_empty(predicate).map(Predicate::decode).transpose()?,
            maker_permit: None,
            pre_interaction: non_empty(pre).map(Interaction::decode).transpose()?,
            post_interaction: non_empty(post).map(Interaction::decode).transpose()?,
        })
    }

    /// Parse only the maker-permit slot of an encoded extension.
    ///
    /// # Errors
    /// [`OpenfillError::PermitFailure`] when the slot holds a malformed
    /// permit; layout errors stay [`OpenfillError::MalformedExtension`].
    pub fn decode_maker_permit(bytes: &[u8]) -> Result<Option<MakerPermit>> {
        let [_, permit, _, _] = split_slots(bytes)?;
        non_empty(permit).map(decode_permit).transpose()
    }

    /// SHA-256 over the encoded extension bytes.
    #[must_use]
    pub fn hash_bytes(encoded: &[u8]) -> [u8; 32] {
        Sha256::digest(encoded).into()
    }

    /// The salt bits an order must carry to commit to `encoded`.
    #[must_use]
    pub fn salt_commitment(encoded: &[u8]) -> U256 {
        U256::from_be_bytes(Self::hash_bytes(encoded)) & salt_mask()
    }
}

/// Mask selecting the salt bits that carry the extension hash.
#[must_use]
pub fn salt_mask() -> U256 {
    (U256::from(1u8) << EXTENSION_HASH_BITS) - U256::from(1u8)
}

/// Split an encoded extension into its four field slots.
fn split_slots(bytes: &[u8]) -> Result<[&[u8]; 4]> {
    let mut slices: [&[u8]; 4] = [&[]; 4];
    if bytes.is_empty() {
        return Ok(slices);
    }
    if bytes.len() < EXTENSION_HEADER_LEN {
        return Err(malformed(format!(
            "header needs {EXTENSION_HEADER_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let body = &bytes[EXTENSION_HEADER_LEN..];
    let mut start = 0usize;
    for (i, slot) in slices.iter_mut().enumerate() {
        let mut end = [0u8; 4];
        end.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
        let end = u32::from_be_bytes(end) as usize;
        if end < start || end > body.len() {
            return Err(malformed(format!(
                "field {i} offset {end} outside body of {} bytes",
                body.len()
            )));
        }
        *slot = &body[start..end];
        start = end;
    }
    if start != body.len() {
        return Err(malformed(format!(
            "{} bytes after the last field",
            body.len() - start
        )));
    }
    Ok(slices)
}

fn non_empty(bytes: &[u8]) -> Option<&[u8]> {
    (!bytes.is_empty()).then_some(bytes)
}

fn malformed(reason: impl Into<String>) -> OpenfillError {
    OpenfillError::MalformedExtension {
        reason: reason.into(),
    }
}

fn malformed_permit(reason: impl Into<String>) -> OpenfillError {
    OpenfillError::PermitFailure {
        reason: format!("malformed maker permit: {}", reason.into()),
    }
}

fn encode_permit(permit: &MakerPermit) -> Vec<u8> {
    let mut out = Vec::with_capacity(200);
    out.extend_from_slice(permit.token.as_bytes());
    match &permit.payload {
        PermitPayload::Classic(p) => {
            out.push(PERMIT_KIND_CLASSIC);
            out.extend_from_slice(p.owner.as_bytes());
            out.extend_from_slice(p.spender.as_bytes());
            out.extend_from_slice(&p.value.to_be_bytes());
            out.extend_from_slice(&p.deadline.to_be_bytes());
            out.extend_from_slice(&p.signature.to_bytes());
        }
        PermitPayload::Permit2(p) => {
            out.push(PERMIT_KIND_PERMIT2);
            out.extend_from_slice(p.owner.as_bytes());
            out.extend_from_slice(p.spender.as_bytes());
            out.extend_from_slice(&p.amount.to_be_bytes());
            out.extend_from_slice(&p.expiration.to_be_bytes());
            out.extend_from_slice(&p.nonce.to_be_bytes());
            out.extend_from_slice(&p.sig_deadline.to_be_bytes());
            out.extend_from_slice(&p.signature.to_bytes());
        }
    }
    out
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let Some(slice) = self.bytes.get(self.pos..self.pos + N) else {
            return Err(malformed_permit(format!("truncated at byte {}", self.pos)));
        };
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        self.pos += N;
        Ok(buf)
    }

    fn address(&mut self) -> Result<Address> {
        Ok(Address(self.take::<32>()?))
    }

    fn u128(&mut self) -> Result<u128> {
        Ok(u128::from_be_bytes(self.take::<16>()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take::<8>()?))
    }

    fn signature(&mut self) -> Result<CompactSignature> {
        Ok(CompactSignature::from_bytes(&self.take::<64>()?))
    }

    fn finish(&self) -> Result<()> {
        if self.pos == self.bytes.len() {
            Ok(())
        } else {
            Err(malformed_permit(format!(
                "{} trailing bytes",
                self.bytes.len() - self.pos
            )))
        }
    }
}

fn decode_permit(bytes: &[u8]) -> Result<MakerPermit> {
    let mut cur = Cursor { bytes, pos: 0 };
    let token = cur.address()?;
    let [kind] = cur.take::<1>()?;
    let payload = match kind {
        PERMIT_KIND_CLASSIC => PermitPayload::Classic(ClassicPermit {
            owner: cur.address()?,
            spender: cur.address()?,
            value: cur.u128()?,
            deadline: cur.u64()?,
            signature: cur.signature()?,
        }),
        PERMIT_KIND_PERMIT2 => PermitPayload::Permit2(Permit2Permit {
            owner: cur.address()?,
            spender: cur.address()?,
            amount: cur.u128()?,
            expiration: cur.u64()?,
            nonce: cur.u64()?,
            sig_deadline: cur.u64()?,
            signature: cur.signature()?,
        }),
        other => return Err(malformed_permit(format!("unknown kind 0x{other:02x}"))),
    };
    cur.finish()?;
    Ok(MakerPermit { token, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticCall;

    fn sample_permit() -> MakerPermit {
        MakerPermit::classic(
            Address([3u8; 32]),
            ClassicPermit {
                owner: Address([4u8; 32]),
                spender: Address([5u8; 32]),
                value: 1,
                deadline: 99,
                signature: CompactSignature::new([6u8; 32], [7u8; 32]),
            },
        )
    }

    fn full_extension() -> Extension {
        Extension::default()
            .with_predicate(Predicate::lt(
                U256::from(10u64),
                StaticCall::new(Address([1u8; 32]), vec![0xaa]),
            ))
            .with_maker_permit(sample_permit())
            .with_pre_interaction(Interaction::new(Address([8u8; 32]), vec![1, 2]))
            .with_post_interaction(Interaction::new(Address([9u8; 32]), Vec::new()))
    }

    #[test]
    fn empty_extension_is_zero_bytes() {
        assert!(Extension::default().encode().unwrap().is_empty());
        assert_eq!(Extension::decode(&[]).unwrap(), Extension::default());
    }

    #[test]
    fn full_extension_decodes_back() {
        let ext = full_extension();
        let bytes = ext.encode().unwrap();
        assert_eq!(Extension::decode(&bytes).unwrap(), ext);
    }

    #[test]
    fn permit2_payload_decodes_back() {
        let ext = Extension::default().with_maker_permit(MakerPermit::permit2(
            Address([3u8; 32]),
            Permit2Permit {
                owner: Address([4u8; 32]),
                spender: Address([5u8; 32]),
                amount: 10,
                expiration: 20,
                nonce: 0,
                sig_deadline: 30,
                signature: CompactSignature::new([1u8; 32], [2u8; 32]),
            },
        ));
        let bytes = ext.encode().unwrap();
        assert_eq!(Extension::decode(&bytes).unwrap(), ext);
    }

    #[test]
    fn permit_only_extension_has_empty_predicate_slot() {
        let bytes = Extension::default()
            .with_maker_permit(sample_permit())
            .encode()
            .unwrap();
        assert_eq!(&bytes[..4], &0u32.to_be_bytes());
        let back = Extension::decode(&bytes).unwrap();
        assert!(back.predicate.is_none());
        assert!(back.maker_permit.is_some());
    }

    #[test]
    fn corrupt_permit_slot_is_a_permit_failure() {
        let ext = Extension::default()
            .with_predicate(Predicate::And(Vec::new()))
            .with_maker_permit(sample_permit());
        let mut bytes = ext.encode().unwrap();
        // header, 3-byte predicate, then the permit's 32-byte token.
        let kind = EXTENSION_HEADER_LEN + 3 + 32;
        assert_eq!(bytes[kind], PERMIT_KIND_CLASSIC);
        bytes[kind] = 0x09;

        assert!(matches!(
            Extension::decode(&bytes),
            Err(OpenfillError::PermitFailure { .. })
        ));
        assert!(matches!(
            Extension::decode_maker_permit(&bytes),
            Err(OpenfillError::PermitFailure { .. })
        ));
        let rest = Extension::decode_without_permit(&bytes).unwrap();
        assert_eq!(rest.predicate, ext.predicate);
        assert!(rest.maker_permit.is_none());
    }

    #[test]
    fn truncated_permit_slot_is_a_permit_failure() {
        let ext = Extension::default().with_maker_permit(sample_permit());
        let mut bytes = ext.encode().unwrap();
        bytes.pop();
        // Shrink the permit and later offsets to match the shorter body.
        let end = u32::try_from(bytes.len() - EXTENSION_HEADER_LEN).unwrap();
        for slot in 1..4 {
            bytes[slot * 4..slot * 4 + 4].copy_from_slice(&end.to_be_bytes());
        }
        assert!(matches!(
            Extension::decode(&bytes),
            Err(OpenfillError::PermitFailure { .. })
        ));
    }

    #[test]
    fn short_header_rejected() {
        let err = Extension::decode(&[0u8; 5]).unwrap_err();
        assert!(matches!(err, OpenfillError::MalformedExtension { .. }));
    }

    #[test]
    fn offset_past_body_rejected() {
        let mut bytes = full_extension().encode().unwrap();
        bytes[12..16].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(Extension::decode(&bytes).is_err());
    }

    #[test]
    fn decreasing_offsets_rejected() {
        let mut bytes = full_extension().encode().unwrap();
        bytes[4..8].copy_from_slice(&0u32.to_be_bytes());
        assert!(Extension::decode(&bytes).is_err());
    }

    #[test]
    fn salt_commitment_fits_low_bits() {
        let bytes = full_extension().encode().unwrap();
        let commitment = Extension::salt_commitment(&bytes);
        assert!(commitment <= salt_mask());
        assert_ne!(commitment, U256::ZERO);
        assert_ne!(commitment, Extension::salt_commitment(&[]));
    }
}
