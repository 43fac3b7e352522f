//! Deployment configuration.
//!
//! A configuration file holds one profile per environment. The `default` profile is
//! merged under the selected one, and `LAUNCHPAD_*` environment variables override
//! both (nested keys are separated by `__`, e.g. `LAUNCHPAD_NETWORK__RPC_URL`).
//!
//! ```toml
//! [default]
//! contract = "HelloAbstract"
//! credential = "env:DEPLOYER_PRIVATE_KEY"
//!
//! [default.token]
//! name = "Hello Abstract"
//! symbol = "HAB"
//! public_price = "0.000001"
//! allowlist_price = "0.000001"
//! royalty_fee = 500
//!
//! [mainnet.token]
//! public_price = "0.0001"
//! allowlist_price = "0.0001"
//! ```

use std::{path::Path, time::Duration};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::{DeployOptions, KnownNetwork, units::NATIVE_DECIMALS};

/// The default name for the launchpad configuration file.
pub const CONFIG_FILENAME: &str = "Launchpad.toml";

/// Prefix of the environment variables that override file values.
pub const ENV_PREFIX: &str = "LAUNCHPAD_";

/// Default time to wait for a deployment to be confirmed.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 180;

/// Default delay between two receipt polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default extra gas added on top of the node's estimate, in percent.
pub const DEFAULT_GAS_HEADROOM_PERCENT: u64 = 20;

/// Human-authored constructor inputs for the token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticDeployConfig {
    /// Token name.
    pub name: String,
    /// Token symbol.
    pub symbol: String,
    /// Public sale price, as a decimal amount of the native currency.
    pub public_price: String,
    /// Allowlist tier price, as a decimal amount of the native currency.
    pub allowlist_price: String,
    /// Royalty fee in basis points (10000 = 100%).
    ///
    /// Kept signed so that a negative value in the file is reported as an invalid
    /// royalty rather than a parse error.
    pub royalty_fee: i64,
    /// Royalty recipient. Defaults to the deployer's own address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub royalty_recipient: Option<Address>,
}

/// Network endpoint and confirmation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint. Falls back to the known network's public endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
    /// Expected chain ID. When set, deployment aborts if the endpoint reports another one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Decimal exponent of the native currency.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Maximum time to wait for confirmation, in seconds.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Delay between two receipt polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Number of blocks, including the inclusion block, required before success.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Extra gas added to the node's estimate, in percent.
    #[serde(default = "default_gas_headroom_percent")]
    pub gas_headroom_percent: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            chain_id: None,
            decimals: default_decimals(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            confirmations: default_confirmations(),
            gas_headroom_percent: default_gas_headroom_percent(),
        }
    }
}

fn default_decimals() -> u8 {
    NATIVE_DECIMALS
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_confirmations() -> u64 {
    1
}

fn default_gas_headroom_percent() -> u64 {
    DEFAULT_GAS_HEADROOM_PERCENT
}

fn default_artifacts() -> String {
    "artifacts".to_string()
}

/// A fully resolved profile of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchpadConfig {
    /// Name of the contract to deploy, as it appears in the compiler output.
    pub contract: String,
    /// Directory holding the compiler output.
    #[serde(default = "default_artifacts")]
    pub artifacts: String,
    /// Reference to the deployer credential, see [`crate::CredentialRef`].
    pub credential: String,
    /// Constructor inputs.
    pub token: StaticDeployConfig,
    /// Network settings.
    #[serde(default)]
    pub network: NetworkConfig,
}

impl LaunchpadConfig {
    /// Load the given profile from a TOML file, applying environment overrides.
    ///
    /// `path` may point at the file itself or at the directory containing
    /// [`CONFIG_FILENAME`].
    pub fn load(path: &Path, profile: &str) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Configuration file or directory not found: {}", path.display());
        }

        let config_path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let config: Self = Self::figment(&config_path)
            .select(profile)
            .extract()
            .with_context(|| {
                format!(
                    "Failed to load profile '{}' from {}",
                    profile,
                    config_path.display()
                )
            })?;

        tracing::info!(path = %config_path.display(), profile, "Configuration loaded");
        Ok(config)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(config_path).nested())
            .merge(Env::prefixed(ENV_PREFIX).split("__").global())
    }

    /// The RPC endpoint for this profile, falling back to the known network's one.
    pub fn rpc_url(&self, profile: &str) -> Result<Url> {
        if let Some(url) = &self.network.rpc_url {
            return Ok(url.clone());
        }

        let network: KnownNetwork = profile.parse().with_context(|| {
            format!("No rpc_url configured and '{}' is not a known network", profile)
        })?;
        network.rpc_url()
    }

    /// The chain ID to enforce, falling back to the known network's one.
    pub fn chain_id(&self, profile: &str) -> Option<u64> {
        self.network
            .chain_id
            .or_else(|| profile.parse::<KnownNetwork>().ok().map(|n| n.chain_id()))
    }

    /// Orchestrator settings derived from the network section.
    pub fn deploy_options(&self, profile: &str) -> DeployOptions {
        DeployOptions {
            chain_id: self.chain_id(profile),
            confirmation_timeout: Duration::from_secs(self.network.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(self.network.poll_interval_ms),
            confirmations: self.network.confirmations.max(1),
            gas_headroom_percent: self.network.gas_headroom_percent,
        }
    }

    /// Compute a SHA-256 fingerprint of everything that ends up in the deployment.
    ///
    /// The credential reference and the RPC endpoint are left out: switching node
    /// providers or key storage does not change what gets deployed.
    pub fn fingerprint(&self, profile: &str) -> String {
        let json = serde_json::json!({
            "contract": self.contract,
            "token": self.token,
            "chain_id": self.chain_id(profile),
            "decimals": self.network.decimals,
        });

        let mut hasher = Sha256::new();
        hasher.update(json.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use tempdir::TempDir;

    const CONFIG: &str = r#"
[default]
contract = "HelloAbstract"
credential = "env:DEPLOYER_PRIVATE_KEY"

[default.token]
name = "Hello Abstract"
symbol = "HAB"
public_price = "0.000001"
allowlist_price = "0.000001"
royalty_fee = 500

[abstract-mainnet.token]
name = "Hello Abstract"
symbol = "HAB"
public_price = "0.0001"
allowlist_price = "0.0001"
royalty_fee = 500
royalty_recipient = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"

[abstract-mainnet.network]
confirmation_timeout_secs = 600

[local]
artifacts = "out"

[local.network]
rpc_url = "http://localhost:8545"
chain_id = 31337
"#;

    fn write_config(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, CONFIG).unwrap();
        path
    }

    #[test]
    fn test_default_profile_values() {
        let dir = TempDir::new("launchpad-config").unwrap();
        let path = write_config(&dir);

        let config = LaunchpadConfig::load(&path, "abstract-testnet").unwrap();

        assert_eq!(config.contract, "HelloAbstract");
        assert_eq!(config.artifacts, "artifacts");
        assert_eq!(config.token.public_price, "0.000001");
        assert_eq!(config.token.royalty_recipient, None);
        assert_eq!(config.network, NetworkConfig::default());
        assert_eq!(config.chain_id("abstract-testnet"), Some(11124));
        assert_eq!(
            config.rpc_url("abstract-testnet").unwrap().as_str(),
            "https://api.testnet.abs.xyz/"
        );
    }

    #[test]
    fn test_profile_overrides_default() {
        let dir = TempDir::new("launchpad-config").unwrap();
        let path = write_config(&dir);

        let config = LaunchpadConfig::load(dir.path(), "abstract-mainnet").unwrap();

        assert_eq!(config.token.public_price, "0.0001");
        assert_eq!(
            config.token.royalty_recipient,
            Some(Address::from_str("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap())
        );
        assert_eq!(config.network.confirmation_timeout_secs, 600);
        assert_eq!(config.chain_id("abstract-mainnet"), Some(2741));

        let options = config.deploy_options("abstract-mainnet");
        assert_eq!(options.confirmation_timeout, Duration::from_secs(600));
        assert_eq!(options.poll_interval, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));

        // Same path handling for file and directory.
        let from_file = LaunchpadConfig::load(&path, "abstract-mainnet").unwrap();
        assert_eq!(config, from_file);
    }

    #[test]
    fn test_custom_network_profile() {
        let dir = TempDir::new("launchpad-config").unwrap();
        let path = write_config(&dir);

        let config = LaunchpadConfig::load(&path, "local").unwrap();

        assert_eq!(config.artifacts, "out");
        assert_eq!(config.chain_id("local"), Some(31337));
        assert_eq!(config.rpc_url("local").unwrap().as_str(), "http://localhost:8545/");
    }

    #[test]
    fn test_unknown_network_without_rpc_url() {
        let dir = TempDir::new("launchpad-config").unwrap();
        let path = write_config(&dir);

        let config = LaunchpadConfig::load(&path, "somewhere").unwrap();

        assert!(config.rpc_url("somewhere").is_err());
        assert_eq!(config.chain_id("somewhere"), None);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new("launchpad-config").unwrap();
        assert!(LaunchpadConfig::load(&dir.path().join("nope.toml"), "default").is_err());
    }

    #[test]
    fn test_fingerprint() {
        let dir = TempDir::new("launchpad-config").unwrap();
        let path = write_config(&dir);

        let testnet = LaunchpadConfig::load(&path, "abstract-testnet").unwrap();
        let mainnet = LaunchpadConfig::load(&path, "abstract-mainnet").unwrap();

        let testnet_hash = testnet.fingerprint("abstract-testnet");
        assert_eq!(testnet_hash, testnet.clone().fingerprint("abstract-testnet"));
        assert_eq!(testnet_hash.len(), 64);
        assert_ne!(testnet_hash, mainnet.fingerprint("abstract-mainnet"));

        let mut moved = testnet.clone();
        moved.network.rpc_url = Some(Url::parse("http://other:8545").unwrap());
        assert_eq!(testnet_hash, moved.fingerprint("abstract-testnet"));

        // Same file contents, different known network.
        assert_ne!(testnet_hash, testnet.fingerprint("abstract-mainnet"));
    }
}
