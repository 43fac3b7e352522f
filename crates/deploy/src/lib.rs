//! launchpad-deploy - Single-shot contract deployment for EVM chains.
//!
//! This crate turns a static token configuration into constructor arguments, encodes
//! them against a compiled artifact, signs and broadcasts the creation transaction,
//! and waits for the receipt to report the deployed address.

mod artifact;
pub use artifact::{Artifact, ArtifactResolver, FsArtifactResolver};

mod chain;
pub use chain::{
    CallOutcome, CallRequest, ChainClient, ConfirmationOptions, JsonRpcClient,
    TransactionReceipt, await_confirmation,
};

mod config;
pub use config::{CONFIG_FILENAME, ENV_PREFIX, LaunchpadConfig, NetworkConfig, StaticDeployConfig};

mod deployer;
pub use deployer::{
    ContractDeployer, DeployOptions, DeploymentPayload, DeploymentResult, PendingDeployment,
    prepare,
};

mod error;
pub use error::DeploymentError;

mod network;
pub use network::KnownNetwork;

mod params;
pub use params::{ConstructorArg, DeploymentSpec, MAX_ROYALTY_BASIS_POINTS, ParameterBuilder};

mod report;
pub use report::{DeploymentRecord, format_outcome, report, summary_table};

pub mod rpc;

mod signer;
pub use signer::{CredentialRef, SignedPayload, SigningIdentity};

pub mod units;
