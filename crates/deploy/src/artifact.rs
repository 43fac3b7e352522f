//! Compiled contract artifacts.

use std::path::{Path, PathBuf};

use alloy_core::{
    json_abi::{Constructor, JsonAbi},
    primitives::Bytes,
};
use serde::Deserialize;

use crate::DeploymentError;

/// `_format` prefix of hardhat-zksync artifacts. Their EraVM bytecode cannot be
/// deployed with a plain EVM creation transaction.
const ZKSOLC_FORMAT_PREFIX: &str = "hh-zksolc-artifact";

/// Directories of the compiler output that never hold contract artifacts.
const SKIPPED_DIRS: &[&str] = &["build-info", "cache"];

/// Bytecode and interface of a compiled contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub contract_name: String,
    /// Creation bytecode.
    pub bytecode: Bytes,
    pub abi: JsonAbi,
    /// File the artifact was read from, if any.
    pub source_path: Option<PathBuf>,
}

impl Artifact {
    /// The constructor declared by the ABI, if the contract has one.
    pub fn constructor(&self) -> Option<&Constructor> {
        self.abi.constructor.as_ref()
    }

    /// Parse an artifact from the JSON emitted by Hardhat (`"bytecode": "0x.."`) or
    /// Foundry (`"bytecode": { "object": "0x.." }`).
    pub fn from_json(contract_name: &str, json: &str) -> Result<Self, DeploymentError> {
        let not_found = |reason: String| DeploymentError::ArtifactNotFound {
            name: contract_name.to_string(),
            reason,
        };

        let file: ArtifactFile =
            serde_json::from_str(json).map_err(|e| not_found(format!("malformed artifact: {e}")))?;

        if let Some(format) = file
            .format
            .as_deref()
            .filter(|f| f.starts_with(ZKSOLC_FORMAT_PREFIX))
        {
            return Err(not_found(format!(
                "'{format}' is zksolc output, compile with solc (hardhat `artifacts` or foundry `out`) to deploy with an EVM transaction"
            )));
        }

        let bytecode = match file.bytecode {
            BytecodeField::Hex(bytes) | BytecodeField::Object { object: bytes } => bytes,
        };
        if bytecode.is_empty() {
            return Err(not_found(
                "artifact has no bytecode (abstract contract or interface?)".to_string(),
            ));
        }

        Ok(Self {
            contract_name: file
                .contract_name
                .unwrap_or_else(|| contract_name.to_string()),
            bytecode,
            abi: file.abi,
            source_path: None,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactFile {
    #[serde(rename = "_format", default)]
    format: Option<String>,
    contract_name: Option<String>,
    abi: JsonAbi,
    bytecode: BytecodeField,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(Bytes),
    Object { object: Bytes },
}

/// Something that can produce the artifact of a contract by name.
pub trait ArtifactResolver {
    fn load(&self, contract_name: &str) -> Result<Artifact, DeploymentError>;
}

/// Resolves artifacts from a compiler output directory on disk.
///
/// Accepts either a bare contract name (`HelloAbstract`), searched for recursively,
/// or a fully qualified one (`contracts/HelloAbstract.sol:HelloAbstract`).
#[derive(Debug, Clone)]
pub struct FsArtifactResolver {
    root: PathBuf,
}

impl FsArtifactResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, contract_name: &str) -> Result<PathBuf, DeploymentError> {
        let not_found = |reason: String| DeploymentError::ArtifactNotFound {
            name: contract_name.to_string(),
            reason,
        };

        if !self.root.is_dir() {
            return Err(not_found(format!(
                "artifacts directory {} does not exist, was the contract compiled?",
                self.root.display()
            )));
        }

        if let Some((source, name)) = contract_name.rsplit_once(':') {
            let path = self.root.join(source).join(format!("{name}.json"));
            return if path.is_file() {
                Ok(path)
            } else {
                Err(not_found(format!("{} does not exist", path.display())))
            };
        }

        let file_name = format!("{contract_name}.json");
        let mut matches = Vec::new();
        collect_matches(&self.root, &file_name, &mut matches)
            .map_err(|e| not_found(format!("failed to scan {}: {e}", self.root.display())))?;
        matches.sort();

        match matches.len() {
            0 => Err(not_found(format!(
                "no {} under {}",
                file_name,
                self.root.display()
            ))),
            1 => Ok(matches.remove(0)),
            _ => Err(not_found(format!(
                "ambiguous name, use a fully qualified name (<source>:<contract>), candidates: {}",
                matches
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

impl ArtifactResolver for FsArtifactResolver {
    fn load(&self, contract_name: &str) -> Result<Artifact, DeploymentError> {
        let path = self.locate(contract_name)?;
        let name = contract_name
            .rsplit_once(':')
            .map_or(contract_name, |(_, name)| name);

        let content =
            std::fs::read_to_string(&path).map_err(|e| DeploymentError::ArtifactNotFound {
                name: name.to_string(),
                reason: format!("failed to read {}: {e}", path.display()),
            })?;

        let mut artifact = Artifact::from_json(name, &content)?;
        tracing::debug!(
            contract = %artifact.contract_name,
            path = %path.display(),
            bytecode_len = artifact.bytecode.len(),
            "Artifact loaded"
        );
        artifact.source_path = Some(path);
        Ok(artifact)
    }
}

fn collect_matches(dir: &Path, file_name: &str, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_dir() {
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| SKIPPED_DIRS.contains(&n));
            if !skipped {
                collect_matches(&path, file_name, out)?;
            }
        } else if path.file_name().and_then(|n| n.to_str()) == Some(file_name) {
            out.push(path);
        }
    }
    Ok(())
}
