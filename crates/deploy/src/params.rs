//! Constructor parameter derivation.

use std::fmt;

use alloy_core::primitives::{Address, U256};

use crate::{DeploymentError, SigningIdentity, StaticDeployConfig, units};

/// Upper bound of a royalty fee, in basis points.
pub const MAX_ROYALTY_BASIS_POINTS: i64 = 10_000;

/// A primitive constructor argument.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::From)]
pub enum ConstructorArg {
    String(String),
    Uint(U256),
    Address(Address),
    Bool(bool),
}

impl From<&str> for ConstructorArg {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<u64> for ConstructorArg {
    fn from(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => write!(f, "{value:?}"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::Address(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// Everything needed to deploy one contract, fixed before any network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSpec {
    contract_name: String,
    constructor_args: Vec<ConstructorArg>,
    deployer_address: Address,
}

impl DeploymentSpec {
    pub fn new(
        contract_name: impl Into<String>,
        constructor_args: Vec<ConstructorArg>,
        deployer_address: Address,
    ) -> Self {
        Self {
            contract_name: contract_name.into(),
            constructor_args,
            deployer_address,
        }
    }

    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    pub fn constructor_args(&self) -> &[ConstructorArg] {
        &self.constructor_args
    }

    pub fn deployer_address(&self) -> Address {
        self.deployer_address
    }
}

/// Turns a [`StaticDeployConfig`] into the constructor arguments of the token
/// contract: `(name, symbol, publicPrice, allowlistPrice, royaltyFee, royaltyRecipient)`.
#[derive(Debug, Clone, Copy)]
pub struct ParameterBuilder {
    decimals: u8,
}

impl Default for ParameterBuilder {
    fn default() -> Self {
        Self::new(units::NATIVE_DECIMALS)
    }
}

impl ParameterBuilder {
    /// Create a builder converting prices with the given decimal exponent.
    pub fn new(decimals: u8) -> Self {
        Self { decimals }
    }

    /// Build the deployment spec for `contract_name`, deployed by `identity`.
    pub fn build(
        &self,
        contract_name: &str,
        config: &StaticDeployConfig,
        identity: &SigningIdentity,
    ) -> Result<DeploymentSpec, DeploymentError> {
        self.build_for_address(contract_name, config, identity.address())
    }

    /// Same as [`Self::build`] from a bare deployer address, so specs can be checked
    /// without access to the key.
    pub fn build_for_address(
        &self,
        contract_name: &str,
        config: &StaticDeployConfig,
        deployer: Address,
    ) -> Result<DeploymentSpec, DeploymentError> {
        let public_price = units::parse_units(&config.public_price, self.decimals)?;
        let allowlist_price = units::parse_units(&config.allowlist_price, self.decimals)?;
        let royalty_fee = validate_royalty(config.royalty_fee)?;
        let royalty_recipient = config.royalty_recipient.unwrap_or(deployer);

        let constructor_args = vec![
            ConstructorArg::from(config.name.clone()),
            ConstructorArg::from(config.symbol.clone()),
            ConstructorArg::from(public_price),
            ConstructorArg::from(allowlist_price),
            ConstructorArg::from(royalty_fee),
            ConstructorArg::from(royalty_recipient),
        ];

        tracing::debug!(
            contract = contract_name,
            %public_price,
            %allowlist_price,
            royalty_fee,
            %royalty_recipient,
            "Constructor arguments derived"
        );

        Ok(DeploymentSpec::new(contract_name, constructor_args, deployer))
    }
}

fn validate_royalty(fee: i64) -> Result<u64, DeploymentError> {
    if !(0..=MAX_ROYALTY_BASIS_POINTS).contains(&fee) {
        return Err(DeploymentError::InvalidRoyalty(fee));
    }
    Ok(fee as u64)
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::address;

    use super::*;

    const DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    fn hello_abstract() -> StaticDeployConfig {
        StaticDeployConfig {
            name: "Hello Abstract".to_string(),
            symbol: "HAB".to_string(),
            public_price: "0.000001".to_string(),
            allowlist_price: "0.000001".to_string(),
            royalty_fee: 500,
            royalty_recipient: None,
        }
    }

    #[test]
    fn test_hello_abstract_arguments() {
        let spec = ParameterBuilder::default()
            .build_for_address("HelloAbstract", &hello_abstract(), DEPLOYER)
            .unwrap();

        assert_eq!(spec.contract_name(), "HelloAbstract");
        assert_eq!(spec.deployer_address(), DEPLOYER);
        assert_eq!(
            spec.constructor_args(),
            &[
                ConstructorArg::from("Hello Abstract"),
                ConstructorArg::from("HAB"),
                ConstructorArg::from(1_000_000_000_000u64),
                ConstructorArg::from(1_000_000_000_000u64),
                ConstructorArg::from(500u64),
                ConstructorArg::from(DEPLOYER),
            ]
        );
        assert_eq!(spec.constructor_args()[2].to_string(), "1000000000000");
    }

    #[test]
    fn test_royalty_bounds() {
        let builder = ParameterBuilder::default();
        for fee in [0, 1, 500, 10_000] {
            let config = StaticDeployConfig {
                royalty_fee: fee,
                ..hello_abstract()
            };
            assert!(builder.build_for_address("HelloAbstract", &config, DEPLOYER).is_ok());
        }

        for fee in [-1, 10_001] {
            let config = StaticDeployConfig {
                royalty_fee: fee,
                ..hello_abstract()
            };
            let err = builder
                .build_for_address("HelloAbstract", &config, DEPLOYER)
                .unwrap_err();
            assert!(matches!(err, DeploymentError::InvalidRoyalty(f) if f == fee));
        }
    }

    #[test]
    fn test_recipient_override() {
        let recipient = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
        let config = StaticDeployConfig {
            royalty_recipient: Some(recipient),
            ..hello_abstract()
        };

        let spec = ParameterBuilder::default()
            .build_for_address("HelloAbstract", &config, DEPLOYER)
            .unwrap();

        assert_eq!(spec.constructor_args()[5], ConstructorArg::Address(recipient));
        assert_eq!(spec.deployer_address(), DEPLOYER);
    }

    #[test]
    fn test_recipient_defaults_to_identity() {
        let identity = SigningIdentity::from_private_key(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();

        let spec = ParameterBuilder::default()
            .build("HelloAbstract", &hello_abstract(), &identity)
            .unwrap();

        assert_eq!(
            spec.constructor_args()[5],
            ConstructorArg::Address(identity.address())
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = ParameterBuilder::default();
        let first = builder
            .build_for_address("HelloAbstract", &hello_abstract(), DEPLOYER)
            .unwrap();
        let second = builder
            .build_for_address("HelloAbstract", &hello_abstract(), DEPLOYER)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_prices() {
        let config = StaticDeployConfig {
            allowlist_price: "-0.1".to_string(),
            ..hello_abstract()
        };
        let err = ParameterBuilder::default()
            .build_for_address("HelloAbstract", &config, DEPLOYER)
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidAmount");
    }

    #[test]
    fn test_custom_decimals() {
        let config = StaticDeployConfig {
            public_price: "2.5".to_string(),
            ..hello_abstract()
        };
        let spec = ParameterBuilder::new(6)
            .build_for_address("HelloAbstract", &config, DEPLOYER)
            .unwrap();
        assert_eq!(spec.constructor_args()[2], ConstructorArg::from(2_500_000u64));
    }
}
