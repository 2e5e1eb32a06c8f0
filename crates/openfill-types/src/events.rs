//! Events emitted by successful protocol operations.
//!
//! Rejected fills emit nothing; the event log is an audit trail of state
//! changes only.

use serde::{Deserialize, Serialize};

use crate::{Address, OrderHash};

/// A state change made by the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// A fill was committed; `remaining` is the making amount still fillable.
    OrderFilled { order_hash: OrderHash, remaining: u128 },
    /// The maker cancelled an order.
    OrderCancelled { order_hash: OrderHash },
    /// The maker advanced a series epoch.
    EpochIncreased {
        maker: Address,
        series: u64,
        new_epoch: u64,
    },
}

impl ProtocolEvent {
    /// Order the event concerns, if any.
    #[must_use]
    pub fn order_hash(&self) -> Option<&OrderHash> {
        match self {
            Self::OrderFilled { order_hash, .. } | Self::OrderCancelled { order_hash } => {
                Some(order_hash)
            }
            Self::EpochIncreased { .. } => None,
        }
    }
}

impl std::fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderFilled { .. } => write!(f, "ORDER_FILLED"),
            Self::OrderCancelled { .. } => write!(f, "ORDER_CANCELLED"),
            Self::EpochIncreased { .. } => write!(f, "EPOCH_INCREASED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        let hash = OrderHash([1u8; 32]);
        let filled = ProtocolEvent::OrderFilled {
            order_hash: hash,
            remaining: 0,
        };
        assert_eq!(format!("{filled}"), "ORDER_FILLED");
        assert_eq!(filled.order_hash(), Some(&hash));
        let epoch = ProtocolEvent::EpochIncreased {
            maker: Address::ZERO,
            series: 0,
            new_epoch: 1,
        };
        assert_eq!(format!("{epoch}"), "EPOCH_INCREASED");
        assert!(epoch.order_hash().is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let event = ProtocolEvent::OrderCancelled {
            order_hash: OrderHash([7u8; 32]),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ProtocolEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
