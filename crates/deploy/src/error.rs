//! Error taxonomy for a deployment run.

use std::time::Duration;

use alloy_core::primitives::B256;

/// Every way a deployment can fail.
///
/// Validation and integration errors are raised before anything is sent to the
/// network. Once a transaction has been broadcast, the errors carry its hash so the
/// caller can look it up later instead of submitting again.
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    /// A price string is not a valid non-negative decimal for the configured unit.
    #[error("invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    /// The royalty fee is outside of [0, 10000] basis points.
    #[error("invalid royalty fee {0}: expected 0..=10000 basis points")]
    InvalidRoyalty(i64),

    /// The contract artifact could not be resolved.
    #[error("artifact '{name}' not found: {reason}")]
    ArtifactNotFound { name: String, reason: String },

    /// Constructor arguments do not match the artifact's constructor.
    #[error("constructor argument mismatch: {0}")]
    ArgumentMismatch(String),

    /// The transaction could not be prepared, signed or broadcast.
    #[error("failed to submit deployment transaction: {0}")]
    Submission(String),

    /// The transaction was broadcast but not confirmed in time. It may still land.
    #[error(
        "transaction {transaction_hash} was not confirmed within {}s, query it before resubmitting",
        timeout.as_secs()
    )]
    ConfirmationTimeout {
        transaction_hash: B256,
        timeout: Duration,
    },

    /// The creation transaction was mined but reverted.
    #[error(
        "deployment transaction {transaction_hash} reverted: {}",
        reason.as_deref().unwrap_or("no reason given")
    )]
    DeploymentReverted {
        transaction_hash: B256,
        reason: Option<String>,
    },
}

impl DeploymentError {
    /// The taxonomy name of the error, as printed by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "InvalidAmount",
            Self::InvalidRoyalty(_) => "InvalidRoyalty",
            Self::ArtifactNotFound { .. } => "ArtifactNotFound",
            Self::ArgumentMismatch(_) => "ArgumentMismatch",
            Self::Submission(_) => "SubmissionError",
            Self::ConfirmationTimeout { .. } => "ConfirmationTimeout",
            Self::DeploymentReverted { .. } => "DeploymentReverted",
        }
    }

    /// The hash of the broadcast transaction, for errors raised after submission.
    pub fn transaction_hash(&self) -> Option<B256> {
        match self {
            Self::ConfirmationTimeout {
                transaction_hash, ..
            }
            | Self::DeploymentReverted {
                transaction_hash, ..
            } => Some(*transaction_hash),
            _ => None,
        }
    }

    pub(crate) fn submission(err: impl std::fmt::Display) -> Self {
        Self::Submission(err.to_string())
    }
}
