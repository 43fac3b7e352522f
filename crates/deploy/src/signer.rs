//! Signing identity resolution.
//!
//! Credentials are never stored in the configuration file itself. The file only
//! holds a [`CredentialRef`] naming where the secret lives.

use std::{fmt, str::FromStr};

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use anyhow::{Context, Result};

/// Where the deployer's secret is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialRef {
    /// `env:NAME`: a hex-encoded private key held in an environment variable.
    PrivateKeyEnv(String),
    /// `mnemonic:NAME[:INDEX]`: a BIP-39 phrase held in an environment variable,
    /// derived at `m/44'/60'/0'/0/INDEX`.
    MnemonicEnv { var: String, index: u32 },
}

impl FromStr for CredentialRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(var) = s.strip_prefix("env:") {
            if var.is_empty() {
                anyhow::bail!("Credential reference 'env:' is missing a variable name");
            }
            return Ok(Self::PrivateKeyEnv(var.to_string()));
        }

        if let Some(rest) = s.strip_prefix("mnemonic:") {
            let (var, index) = match rest.split_once(':') {
                Some((var, index)) => (
                    var,
                    index
                        .parse()
                        .with_context(|| format!("Invalid derivation index '{}'", index))?,
                ),
                None => (rest, 0),
            };
            if var.is_empty() {
                anyhow::bail!("Credential reference 'mnemonic:' is missing a variable name");
            }
            return Ok(Self::MnemonicEnv {
                var: var.to_string(),
                index,
            });
        }

        anyhow::bail!(
            "Unsupported credential reference '{}': expected 'env:<VAR>' or 'mnemonic:<VAR>[:<INDEX>]'",
            s
        )
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKeyEnv(var) => write!(f, "env:{var}"),
            Self::MnemonicEnv { var, index } => write!(f, "mnemonic:{var}:{index}"),
        }
    }
}

/// A signed transaction ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    /// EIP-2718 encoded transaction bytes.
    pub raw: Bytes,
    /// Hash the network will know the transaction by.
    pub hash: B256,
}

/// The deployer: an address and the key that can sign for it.
#[derive(Clone)]
pub struct SigningIdentity {
    signer: PrivateKeySigner,
}

impl SigningIdentity {
    /// Resolve a credential reference into a signing identity.
    pub fn from_credential(credential: &CredentialRef) -> Result<Self> {
        let identity = match credential {
            CredentialRef::PrivateKeyEnv(var) => {
                let key = std::env::var(var)
                    .with_context(|| format!("Environment variable {} not set", var))?;
                Self::from_private_key(&key)
                    .with_context(|| format!("Invalid private key in {}", var))?
            }
            CredentialRef::MnemonicEnv { var, index } => {
                let phrase = std::env::var(var)
                    .with_context(|| format!("Environment variable {} not set", var))?;
                Self::from_mnemonic(&phrase, *index)
                    .with_context(|| format!("Invalid mnemonic in {}", var))?
            }
        };

        tracing::debug!(credential = %credential, address = %identity.address(), "Signing identity resolved");
        Ok(identity)
    }

    /// Build an identity from a hex private key, with or without `0x` prefix.
    pub fn from_private_key(key: &str) -> Result<Self> {
        let signer = key
            .trim()
            .parse::<PrivateKeySigner>()
            .context("Failed to parse private key")?;
        Ok(Self { signer })
    }

    /// Build an identity from a BIP-39 phrase at the given account index.
    pub fn from_mnemonic(phrase: &str, index: u32) -> Result<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.trim())
            .index(index)
            .context("Invalid derivation index")?
            .build()
            .context("Failed to derive key from mnemonic")?;
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a legacy transaction and encode it for `eth_sendRawTransaction`.
    pub fn sign_transaction(&self, tx: TxLegacy) -> Result<SignedPayload> {
        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .context("Failed to sign transaction")?;

        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(SignedPayload {
            hash: *envelope.tx_hash(),
            raw: envelope.encoded_2718().into(),
        })
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
