//! Reporting of deployment outcomes.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, B256};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use serde::{Deserialize, Serialize};

use crate::{DeploymentError, DeploymentResult};

/// Format the outcome of a deployment as a single line.
pub fn format_outcome(outcome: &Result<DeploymentResult, DeploymentError>) -> String {
    match outcome {
        Ok(result) => format!(
            "{} was deployed to {}",
            result.contract_name, result.deployed_address
        ),
        Err(err) => format!("{}: {}", err.kind(), err),
    }
}

/// Emit the outcome of a deployment through the logger and return the emitted line.
pub fn report(outcome: &Result<DeploymentResult, DeploymentError>) -> String {
    let line = format_outcome(outcome);
    match outcome {
        Ok(result) => tracing::info!(
            contract = %result.contract_name,
            address = %result.deployed_address,
            tx_hash = %result.transaction_hash,
            "{line}"
        ),
        Err(err) => tracing::error!(
            kind = err.kind(),
            tx_hash = ?err.transaction_hash(),
            "{line}"
        ),
    }
    line
}

/// Render a successful deployment as a table, with explorer links when known.
pub fn summary_table(result: &DeploymentResult, explorer_url: Option<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Contract", result.contract_name.as_str()]);
    table.add_row(vec!["Address".to_string(), result.deployed_address.to_string()]);
    table.add_row(vec![
        "Transaction".to_string(),
        result.transaction_hash.to_string(),
    ]);
    table.add_row(vec!["Block".to_string(), result.block_number.to_string()]);
    table.add_row(vec!["Gas used".to_string(), result.gas_used.to_string()]);

    if let Some(explorer) = explorer_url {
        table.add_row(vec![
            "Explorer".to_string(),
            format!("{}/address/{}", explorer, result.deployed_address),
        ]);
    }

    table
}

/// A deployment persisted to disk once confirmed.
///
/// Saved to `{out}/{network}/{contract}.json` so later runs and scripts can find the
/// address without querying the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub contract_name: String,
    pub network: String,
    pub chain_id: Option<u64>,
    pub address: Address,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub deployer: Address,
    /// Fingerprint of the configuration the contract was deployed with.
    pub config_hash: String,
    pub deployed_at: DateTime<Utc>,
    /// Launchpad version that created this record.
    pub launchpad_version: String,
}

impl DeploymentRecord {
    pub fn new(
        result: &DeploymentResult,
        network: &str,
        chain_id: Option<u64>,
        deployer: Address,
        config_hash: String,
    ) -> Self {
        Self {
            contract_name: result.contract_name.clone(),
            network: network.to_string(),
            chain_id,
            address: result.deployed_address,
            transaction_hash: result.transaction_hash,
            block_number: result.block_number,
            deployer,
            config_hash,
            deployed_at: Utc::now(),
            launchpad_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Path of the record under `out_dir`.
    pub fn path(&self, out_dir: &Path) -> PathBuf {
        let file_name = self
            .contract_name
            .rsplit_once(':')
            .map_or(self.contract_name.as_str(), |(_, name)| name);
        out_dir
            .join(&self.network)
            .join(format!("{file_name}.json"))
    }

    /// Write the record as formatted JSON, returning the file path.
    pub fn save(&self, out_dir: &Path) -> Result<PathBuf> {
        let path = self.path(out_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment record")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write deployment record to {}", path.display()))?;

        tracing::info!(path = %path.display(), "Deployment record saved");
        Ok(path)
    }
}
