//! System-wide constants for the OpenFill settlement core.

/// Default structured-data domain name.
pub const DEFAULT_DOMAIN_NAME: &str = "OpenFill Limit Order Protocol";

/// Default structured-data domain version.
pub const DEFAULT_DOMAIN_VERSION: &str = "4";

/// Domain type string hashed into `DOMAIN_TYPEHASH`.
pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Order type string hashed into `ORDER_TYPEHASH`.
pub const ORDER_TYPE: &str = "Order(uint256 salt,address maker,address receiver,address makerAsset,address takerAsset,uint256 makingAmount,uint256 takingAmount,uint256 makerTraits)";

/// Number of low salt bits that carry the extension hash.
pub const EXTENSION_HASH_BITS: usize = 160;

/// Width of the allowed-sender slot in `MakerTraits`.
pub const ALLOWED_SENDER_BITS: usize = 80;

/// Width of the expiry / nonce-or-epoch / series slots in `MakerTraits`.
pub const MAKER_U40_BITS: usize = 40;

/// Width of the extension / interaction length slots in `TakerTraits`.
pub const TAKER_LENGTH_BITS: usize = 24;

/// Width of the threshold slot in `TakerTraits`.
pub const THRESHOLD_BITS: usize = 128;

/// Largest single `advance_epoch` step.
pub const MAX_EPOCH_ADVANCE: u64 = 255;

/// Largest epoch value the 40-bit trait slot can carry.
pub const MAX_EPOCH: u64 = (1 << MAKER_U40_BITS) - 1;

/// Maximum nesting depth of a predicate tree.
pub const MAX_PREDICATE_DEPTH: usize = 32;

/// Size of the extension offsets header (four big-endian `u32`).
pub const EXTENSION_HEADER_LEN: usize = 16;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OpenFill";
