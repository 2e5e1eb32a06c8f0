//! Protocol deployment configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{constants, Address, OpenfillError, Result};

/// Parameters that pin down one protocol deployment.
///
/// The domain fields feed the order hash, so two deployments with
/// different configs never accept each other's signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Structured-data domain name.
    pub domain_name: String,
    /// Structured-data domain version.
    pub domain_version: String,
    /// Chain identifier hashed into the domain separator.
    pub chain_id: u64,
    /// The protocol's own address: the verifying contract and the spender
    /// every permit must name.
    pub protocol_address: Address,
    /// Wrapped-native asset eligible for unwrapping on delivery.
    #[serde(default)]
    pub wrapped_native: Option<Address>,
}

impl ProtocolConfig {
    /// Config with the default domain name and version.
    #[must_use]
    pub fn new(chain_id: u64, protocol_address: Address) -> Self {
        Self {
            domain_name: constants::DEFAULT_DOMAIN_NAME.to_string(),
            domain_version: constants::DEFAULT_DOMAIN_VERSION.to_string(),
            chain_id,
            protocol_address,
            wrapped_native: None,
        }
    }

    #[must_use]
    pub fn with_wrapped_native(mut self, asset: Address) -> Self {
        self.wrapped_native = Some(asset);
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| OpenfillError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.domain_name.is_empty() {
            return Err(OpenfillError::Configuration(
                "domain_name must not be empty".to_string(),
            ));
        }
        if self.domain_version.is_empty() {
            return Err(OpenfillError::Configuration(
                "domain_version must not be empty".to_string(),
            ));
        }
        if self.protocol_address.is_zero() {
            return Err(OpenfillError::Configuration(
                "protocol_address must not be zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let config = ProtocolConfig::new(1, Address([1u8; 32]));
        assert_eq!(config.domain_name, constants::DEFAULT_DOMAIN_NAME);
        assert_eq!(config.domain_version, constants::DEFAULT_DOMAIN_VERSION);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_roundtrip_validates() {
        let config =
            ProtocolConfig::new(31337, Address([5u8; 32])).with_wrapped_native(Address([6u8; 32]));
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ProtocolConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn zero_protocol_address_rejected() {
        let config = ProtocolConfig::new(1, Address::ZERO);
        let json = serde_json::to_string(&config).unwrap();
        let err = ProtocolConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, OpenfillError::Configuration(_)));
    }

    #[test]
    fn empty_domain_rejected() {
        let mut config = ProtocolConfig::new(1, Address([1u8; 32]));
        config.domain_version.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn garbage_json_is_configuration_error() {
        let err = ProtocolConfig::from_json("{ not json").unwrap_err();
        assert!(format!("{err}").starts_with("OF_ERR_902"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ProtocolConfig::load("/nonexistent/openfill.json").unwrap_err();
        assert!(matches!(err, OpenfillError::Io(_)));
    }
}
