//! The deployment workflow: bind, encode, submit, confirm, extract.

use std::time::Duration;

use alloy_consensus::TxLegacy;
use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::Param,
    primitives::{Address, B256, Bytes, I256, TxKind, U256},
    sol_types::decode_revert_reason,
};
use serde::Serialize;

use crate::{
    Artifact, CallOutcome, CallRequest, ChainClient, ConfirmationOptions, ConstructorArg,
    DeploymentError, DeploymentSpec, SigningIdentity, await_confirmation,
    config::{
        DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_GAS_HEADROOM_PERCENT, DEFAULT_POLL_INTERVAL_MS,
    },
};

/// Orchestrator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOptions {
    /// Chain ID the endpoint must report. Unchecked when `None`.
    pub chain_id: Option<u64>,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    /// Blocks required, counting the inclusion block.
    pub confirmations: u64,
    /// Extra gas added to the node's estimate, in percent.
    pub gas_headroom_percent: u64,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            chain_id: None,
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            confirmations: 1,
            gas_headroom_percent: DEFAULT_GAS_HEADROOM_PERCENT,
        }
    }
}

/// Init code of a contract: creation bytecode followed by the encoded constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Deref)]
pub struct DeploymentPayload(Bytes);

impl DeploymentPayload {
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

/// A successfully confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentResult {
    pub contract_name: String,
    pub deployed_address: Address,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
}

/// A deployment transaction that has been broadcast and cannot be withdrawn.
///
/// It has no cancel operation. Continue with [`ContractDeployer::confirm`], or look up
/// [`Self::transaction_hash`] later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    pub contract_name: String,
    pub transaction_hash: B256,
    pub sender: Address,
    pub nonce: u64,
    /// Address derived from sender and nonce.
    pub expected_address: Address,
    payload: DeploymentPayload,
}

/// Check `spec` against `artifact` and build the init code, without any network access.
pub fn prepare(
    spec: &DeploymentSpec,
    artifact: &Artifact,
) -> Result<DeploymentPayload, DeploymentError> {
    let spec_name = spec
        .contract_name()
        .rsplit_once(':')
        .map_or(spec.contract_name(), |(_, name)| name);
    if spec_name != artifact.contract_name {
        return Err(DeploymentError::ArgumentMismatch(format!(
            "spec targets '{}' but the artifact is '{}'",
            spec.contract_name(),
            artifact.contract_name
        )));
    }

    let inputs = artifact
        .constructor()
        .map(|c| c.inputs.as_slice())
        .unwrap_or_default();
    let values = bind_arguments(inputs, spec.constructor_args())?;

    let encoded_args = match artifact.constructor() {
        Some(constructor) => constructor.abi_encode_input(&values).map_err(|e| {
            DeploymentError::ArgumentMismatch(format!("failed to encode constructor arguments: {e}"))
        })?,
        None => Vec::new(),
    };

    let mut init_code = Vec::with_capacity(artifact.bytecode.len() + encoded_args.len());
    init_code.extend_from_slice(&artifact.bytecode);
    init_code.extend_from_slice(&encoded_args);

    tracing::debug!(
        contract = %artifact.contract_name,
        bytecode_len = artifact.bytecode.len(),
        args_len = encoded_args.len(),
        "Deployment payload encoded"
    );

    Ok(DeploymentPayload(init_code.into()))
}

/// Match each argument with the constructor parameter at the same position.
fn bind_arguments(
    inputs: &[Param],
    args: &[ConstructorArg],
) -> Result<Vec<DynSolValue>, DeploymentError> {
    if inputs.len() != args.len() {
        let signature = inputs
            .iter()
            .map(|p| p.ty.as_str())
            .collect::<Vec<_>>()
            .join(",");
        return Err(DeploymentError::ArgumentMismatch(format!(
            "constructor({}) takes {} argument(s), got {}",
            signature,
            inputs.len(),
            args.len()
        )));
    }

    inputs
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (param, arg))| {
            let ty = param.resolve().map_err(|e| {
                DeploymentError::ArgumentMismatch(format!(
                    "cannot resolve type of constructor parameter {index} ({}): {e}",
                    param.ty
                ))
            })?;

            bind_value(&ty, arg).ok_or_else(|| {
                DeploymentError::ArgumentMismatch(format!(
                    "argument {index} ({} {}) cannot take {arg}",
                    param.ty, param.name
                ))
            })
        })
        .collect()
}

fn bind_value(ty: &DynSolType, arg: &ConstructorArg) -> Option<DynSolValue> {
    match (ty, arg) {
        (DynSolType::String, ConstructorArg::String(value)) => {
            Some(DynSolValue::String(value.clone()))
        }
        (DynSolType::Uint(bits), ConstructorArg::Uint(value)) if value.bit_len() <= *bits => {
            Some(DynSolValue::Uint(*value, *bits))
        }
        (DynSolType::Int(bits), ConstructorArg::Uint(value)) if value.bit_len() < *bits => {
            Some(DynSolValue::Int(I256::from_raw(*value), *bits))
        }
        (DynSolType::Address, ConstructorArg::Address(value)) => {
            Some(DynSolValue::Address(*value))
        }
        (DynSolType::Bool, ConstructorArg::Bool(value)) => Some(DynSolValue::Bool(*value)),
        (ty, ConstructorArg::String(value)) => ty.coerce_str(value).ok(),
        _ => None,
    }
}

/// Deploys contracts through a [`ChainClient`].
#[derive(Debug, Clone)]
pub struct ContractDeployer<C> {
    client: C,
    options: DeployOptions,
}

impl<C: ChainClient> ContractDeployer<C> {
    pub fn new(client: C, options: DeployOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn options(&self) -> &DeployOptions {
        &self.options
    }

    /// Run the whole workflow for one contract.
    ///
    /// Everything up to the broadcast fails without side effects. After it, errors
    /// carry the transaction hash and the transaction must not be sent again.
    pub async fn deploy(
        &self,
        spec: &DeploymentSpec,
        artifact: &Artifact,
        identity: &SigningIdentity,
    ) -> Result<DeploymentResult, DeploymentError> {
        let payload = prepare(spec, artifact)?;
        let pending = self.submit(spec, payload, identity).await?;
        self.confirm(pending).await
    }

    /// Sign and broadcast the creation transaction. Never retried.
    pub async fn submit(
        &self,
        spec: &DeploymentSpec,
        payload: DeploymentPayload,
        identity: &SigningIdentity,
    ) -> Result<PendingDeployment, DeploymentError> {
        let sender = identity.address();
        if spec.deployer_address() != sender {
            return Err(DeploymentError::ArgumentMismatch(format!(
                "spec was built for deployer {} but the signing identity is {}",
                spec.deployer_address(),
                sender
            )));
        }

        let chain_id = self
            .client
            .chain_id()
            .await
            .map_err(|e| DeploymentError::submission(format!("failed to read chain id: {e:#}")))?;
        if let Some(expected) = self.options.chain_id {
            if expected != chain_id {
                return Err(DeploymentError::submission(format!(
                    "endpoint is on chain {chain_id}, expected {expected}"
                )));
            }
        }

        let nonce = self
            .client
            .transaction_count(sender)
            .await
            .map_err(|e| DeploymentError::submission(format!("failed to read nonce: {e:#}")))?;
        let gas_price = self
            .client
            .gas_price()
            .await
            .map_err(|e| DeploymentError::submission(format!("failed to read gas price: {e:#}")))?;
        let estimate = self
            .client
            .estimate_gas(&CallRequest::create(sender, payload.0.clone()))
            .await
            .map_err(|e| DeploymentError::submission(format!("gas estimation failed: {e:#}")))?;
        let gas_limit = estimate.saturating_mul(100 + self.options.gas_headroom_percent) / 100;

        let balance = self
            .client
            .balance(sender)
            .await
            .map_err(|e| DeploymentError::submission(format!("failed to read balance: {e:#}")))?;
        let max_cost = U256::from(gas_limit) * U256::from(gas_price);
        if balance < max_cost {
            return Err(DeploymentError::submission(format!(
                "insufficient balance: {sender} holds {balance} wei, deployment may cost up to {max_cost} wei"
            )));
        }

        tracing::info!(
            contract = spec.contract_name(),
            %sender,
            chain_id,
            nonce,
            gas_limit,
            gas_price,
            "Signing deployment transaction..."
        );

        let tx = TxLegacy {
            chain_id: Some(chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Create,
            value: U256::ZERO,
            input: payload.0.clone(),
        };
        let signed = identity
            .sign_transaction(tx)
            .map_err(|e| DeploymentError::submission(format!("{e:#}")))?;

        let transaction_hash = self
            .client
            .send_raw_transaction(&signed.raw)
            .await
            .map_err(|e| DeploymentError::submission(format!("broadcast failed: {e:#}")))?;
        if transaction_hash != signed.hash {
            tracing::warn!(
                returned = %transaction_hash,
                computed = %signed.hash,
                "Endpoint returned an unexpected transaction hash"
            );
        }

        tracing::info!(
            tx_hash = %transaction_hash,
            "Deployment transaction broadcast, it can no longer be cancelled"
        );

        Ok(PendingDeployment {
            contract_name: spec.contract_name().to_string(),
            transaction_hash,
            sender,
            nonce,
            expected_address: sender.create(nonce),
            payload,
        })
    }

    /// Wait for a broadcast deployment and extract the contract address.
    pub async fn confirm(
        &self,
        pending: PendingDeployment,
    ) -> Result<DeploymentResult, DeploymentError> {
        let options = ConfirmationOptions {
            timeout: self.options.confirmation_timeout,
            poll_interval: self.options.poll_interval,
            confirmations: self.options.confirmations,
        };

        tracing::info!(
            tx_hash = %pending.transaction_hash,
            timeout = ?options.timeout,
            confirmations = options.confirmations,
            "Waiting for confirmation..."
        );

        let receipt = await_confirmation(&self.client, pending.transaction_hash, &options)
            .await
            .ok_or(DeploymentError::ConfirmationTimeout {
                transaction_hash: pending.transaction_hash,
                timeout: options.timeout,
            })?;

        if !receipt.succeeded() {
            let reason = self.revert_reason(&pending, receipt.block_number).await;
            return Err(DeploymentError::DeploymentReverted {
                transaction_hash: pending.transaction_hash,
                reason,
            });
        }

        let deployed_address = match receipt.contract_address {
            Some(address) => {
                if address != pending.expected_address {
                    tracing::warn!(
                        receipt = %address,
                        derived = %pending.expected_address,
                        "Receipt address differs from the sender/nonce derivation, using the receipt"
                    );
                }
                address
            }
            None => pending.expected_address,
        };

        Ok(DeploymentResult {
            contract_name: pending.contract_name,
            deployed_address,
            transaction_hash: pending.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }

    /// Replay the creation against the parent block to recover the revert reason.
    async fn revert_reason(&self, pending: &PendingDeployment, block: u64) -> Option<String> {
        let request = CallRequest::create(pending.sender, pending.payload.0.clone());

        match self.client.call(&request, block.saturating_sub(1)).await {
            Ok(CallOutcome::Reverted { message, data }) => Some(
                data.as_ref()
                    .and_then(|data| decode_revert_reason(data))
                    .unwrap_or(message),
            ),
            Ok(CallOutcome::Success(_)) => None,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to replay reverted deployment");
                None
            }
        }
    }
}
