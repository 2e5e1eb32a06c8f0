//! Predicate expression tree and its wire encoding.
//!
//! A predicate gates whether an order may be filled. Leaves compare the
//! integer returned by a read-only call against a literal threshold;
//! inner nodes combine child results.
//!
//! ```text
//! compare := 0x01 ‖ op(1) ‖ threshold(32) ‖ target(32) ‖ len(u32 BE) ‖ calldata
//! and     := 0x02 ‖ count(u16 BE) ‖ child*
//! or      := 0x03 ‖ count(u16 BE) ‖ child*
//! ```

use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_PREDICATE_DEPTH;
use crate::{Address, OpenfillError, Result};

const TAG_COMPARE: u8 = 0x01;
const TAG_AND: u8 = 0x02;
const TAG_OR: u8 = 0x03;

/// A read-only call whose 32-byte result is compared in a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCall {
    pub target: Address,
    pub calldata: Vec<u8>,
}

impl StaticCall {
    #[must_use]
    pub fn new(target: Address, calldata: impl Into<Vec<u8>>) -> Self {
        Self {
            target,
            calldata: calldata.into(),
        }
    }
}

/// Strict comparison operator of a predicate leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// Call result is strictly less than the threshold.
    Lt,
    /// Call result is strictly greater than the threshold.
    Gt,
}

impl CompareOp {
    #[must_use]
    pub fn holds(self, value: U256, threshold: U256) -> bool {
        match self {
            Self::Lt => value < threshold,
            Self::Gt => value > threshold,
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Lt => 0x00,
            Self::Gt => 0x01,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Lt),
            0x01 => Some(Self::Gt),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lt => write!(f, "lt"),
            Self::Gt => write!(f, "gt"),
        }
    }
}

/// Boolean expression over external read results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Compare {
        op: CompareOp,
        threshold: U256,
        call: StaticCall,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// `call() < threshold`.
    #[must_use]
    pub fn lt(threshold: U256, call: StaticCall) -> Self {
        Self::Compare {
            op: CompareOp::Lt,
            threshold,
            call,
        }
    }

    /// `call() > threshold`.
    #[must_use]
    pub fn gt(threshold: U256, call: StaticCall) -> Self {
        Self::Compare {
            op: CompareOp::Gt,
            threshold,
            call,
        }
    }

    #[must_use]
    pub fn and(children: impl IntoIterator<Item = Predicate>) -> Self {
        Self::And(children.into_iter().collect())
    }

    #[must_use]
    pub fn or(children: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    /// Nesting depth; a single leaf has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Compare { .. } => 1,
            Self::And(children) | Self::Or(children) => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }

    /// Serialize into the tagged wire form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }

    fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Compare {
                op,
                threshold,
                call,
            } => {
                let len = u32::try_from(call.calldata.len()).map_err(|_| {
                    OpenfillError::MalformedPredicate {
                        reason: "calldata longer than u32::MAX".to_string(),
                    }
                })?;
                out.push(TAG_COMPARE);
                out.push(op.code());
                out.extend_from_slice(&threshold.to_be_bytes::<32>());
                out.extend_from_slice(call.target.as_bytes());
                out.extend_from_slice(&len.to_be_bytes());
                out.extend_from_slice(&call.calldata);
            }
            Self::And(children) | Self::Or(children) => {
                let count = u16::try_from(children.len()).map_err(|_| {
                    OpenfillError::MalformedPredicate {
                        reason: format!("{} children exceed u16::MAX", children.len()),
                    }
                })?;
                out.push(if matches!(self, Self::And(_)) {
                    TAG_AND
                } else {
                    TAG_OR
                });
                out.extend_from_slice(&count.to_be_bytes());
                for child in children {
                    child.encode_into(out)?;
                }
            }
        }
        Ok(())
    }

    /// Parse the tagged wire form. Trailing bytes are rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { bytes, pos: 0 };
        let predicate = reader.predicate(1)?;
        if reader.pos != bytes.len() {
            return Err(OpenfillError::MalformedPredicate {
                reason: format!("{} trailing bytes", bytes.len() - reader.pos),
            });
        }
        Ok(predicate)
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        let Some(end) = end else {
            return Err(OpenfillError::MalformedPredicate {
                reason: format!("truncated at byte {}", self.pos),
            });
        };
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn word(&mut self) -> Result<[u8; 32]> {
        let mut buf = [0u8; 32];
        buf.copy_from_slice(self.take(32)?);
        Ok(buf)
    }

    fn predicate(&mut self, depth: usize) -> Result<Predicate> {
        if depth > MAX_PREDICATE_DEPTH {
            return Err(OpenfillError::MalformedPredicate {
                reason: format!("nesting deeper than {MAX_PREDICATE_DEPTH}"),
            });
        }
        match self.byte()? {
            TAG_COMPARE => {
                let code = self.byte()?;
                let op = CompareOp::from_code(code).ok_or_else(|| {
                    OpenfillError::MalformedPredicate {
                        reason: format!("unknown comparison op 0x{code:02x}"),
                    }
                })?;
                let threshold = U256::from_be_bytes(self.word()?);
                let target = Address(self.word()?);
                let mut len = [0u8; 4];
                len.copy_from_slice(self.take(4)?);
                let calldata = self.take(u32::from_be_bytes(len) as usize)?.to_vec();
                Ok(Predicate::Compare {
                    op,
                    threshold,
                    call: StaticCall { target, calldata },
                })
            }
            tag @ (TAG_AND | TAG_OR) => {
                let mut count = [0u8; 2];
                count.copy_from_slice(self.take(2)?);
                let count = u16::from_be_bytes(count);
                // Every child takes at least three bytes; reserve no more than fit.
                let room = (self.bytes.len() - self.pos) / 3;
                let mut children = Vec::with_capacity(usize::from(count).min(room));
                for _ in 0..count {
                    children.push(self.predicate(depth + 1)?);
                }
                Ok(if tag == TAG_AND {
                    Predicate::And(children)
                } else {
                    Predicate::Or(children)
                })
            }
            other => Err(OpenfillError::MalformedPredicate {
                reason: format!("unknown node tag 0x{other:02x}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> StaticCall {
        StaticCall::new(Address([9u8; 32]), vec![1, 2, 3])
    }

    #[test]
    fn compare_op_is_strict() {
        let five = U256::from(5u64);
        assert!(CompareOp::Lt.holds(U256::from(4u64), five));
        assert!(!CompareOp::Lt.holds(five, five));
        assert!(CompareOp::Gt.holds(U256::from(6u64), five));
        assert!(!CompareOp::Gt.holds(five, five));
    }

    #[test]
    fn nested_tree_survives_encoding() {
        let predicate = Predicate::or([
            Predicate::lt(U256::from(15u64), call()),
            Predicate::and([
                Predicate::gt(U256::from(5u64), call()),
                Predicate::lt(U256::from(10u64), call()),
            ]),
        ]);
        let bytes = predicate.encode().unwrap();
        assert_eq!(Predicate::decode(&bytes).unwrap(), predicate);
        assert_eq!(predicate.depth(), 3);
    }

    #[test]
    fn truncated_input_rejected() {
        let bytes = Predicate::lt(U256::from(10u64), call()).encode().unwrap();
        let err = Predicate::decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, OpenfillError::MalformedPredicate { .. }));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = Predicate::lt(U256::from(10u64), call()).encode().unwrap();
        bytes.push(0);
        assert!(Predicate::decode(&bytes).is_err());
    }

    #[test]
    fn unknown_tag_rejected() {
        let err = Predicate::decode(&[0x7f]).unwrap_err();
        assert!(format!("{err}").contains("0x7f"));
    }

    #[test]
    fn oversized_child_counts_fail_on_truncation() {
        // 31 nested nodes each claiming u16::MAX children, and no child bytes.
        let bytes: Vec<u8> = (0..MAX_PREDICATE_DEPTH - 1)
            .flat_map(|_| [TAG_AND, 0xff, 0xff])
            .collect();
        let err = Predicate::decode(&bytes).unwrap_err();
        assert!(matches!(err, OpenfillError::MalformedPredicate { .. }));
    }

    #[test]
    fn excessive_depth_rejected() {
        let mut predicate = Predicate::lt(U256::from(1u64), call());
        for _ in 0..MAX_PREDICATE_DEPTH {
            predicate = Predicate::and([predicate]);
        }
        let bytes = predicate.encode().unwrap();
        assert!(Predicate::decode(&bytes).is_err());
    }
}
