//! Networks with built-in endpoints.

use anyhow::Context;
use url::Url;

/// A network whose public endpoint and chain ID are known, so a profile named after
/// it needs no `[network]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum KnownNetwork {
    AbstractTestnet,
    AbstractMainnet,
}

impl KnownNetwork {
    pub fn chain_id(&self) -> u64 {
        match self {
            KnownNetwork::AbstractTestnet => 11124,
            KnownNetwork::AbstractMainnet => 2741,
        }
    }

    pub fn rpc_url(&self) -> anyhow::Result<Url> {
        let url = match self {
            KnownNetwork::AbstractTestnet => "https://api.testnet.abs.xyz",
            KnownNetwork::AbstractMainnet => "https://api.mainnet.abs.xyz",
        };
        Url::parse(url).context("Failed to parse built-in RPC URL")
    }

    /// Block explorer base URL, used to print links to the deployment.
    pub fn explorer_url(&self) -> &'static str {
        match self {
            KnownNetwork::AbstractTestnet => "https://sepolia.abscan.org",
            KnownNetwork::AbstractMainnet => "https://abscan.org",
        }
    }
}
