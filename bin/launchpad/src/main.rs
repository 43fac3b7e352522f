//! launchpad is a CLI tool to deploy a token contract to an EVM chain in one shot.

mod cli;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};

use cli::{Cli, Command, DeployArgs};
use launchpad_deploy::{
    ArtifactResolver, ContractDeployer, CredentialRef, DeploymentError, DeploymentRecord,
    FsArtifactResolver, JsonRpcClient, KnownNetwork, LaunchpadConfig, ParameterBuilder,
    SigningIdentity, prepare, report, summary_table,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let result = match cli.command {
        Command::Deploy(args) => deploy(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<DeploymentError>() {
                Some(deployment_err) => eprintln!("{}: {}", deployment_err.kind(), deployment_err),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn deploy(args: DeployArgs) -> Result<()> {
    tracing::info!(
        network = %args.network,
        config = %args.config.display(),
        dry_run = args.dry_run,
        "Running deploy script"
    );

    let config = LaunchpadConfig::load(&args.config, &args.network)?;
    let artifact = FsArtifactResolver::new(&config.artifacts).load(&config.contract)?;
    let builder = ParameterBuilder::new(config.network.decimals);

    if args.dry_run {
        let deployer = match args.deployer {
            Some(address) => address,
            None => signing_identity(&config)?.address(),
        };
        let spec = builder.build_for_address(&config.contract, &config.token, deployer)?;
        let payload = prepare(&spec, &artifact)?;

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec!["#", "Parameter", "Value"]);
        let inputs = artifact
            .constructor()
            .map(|c| c.inputs.as_slice())
            .unwrap_or_default();
        for (index, (param, arg)) in inputs.iter().zip(spec.constructor_args()).enumerate() {
            table.add_row(vec![
                index.to_string(),
                format!("{} {}", param.ty, param.name),
                arg.to_string(),
            ]);
        }
        println!("{table}");

        tracing::info!(
            contract = spec.contract_name(),
            deployer = %spec.deployer_address(),
            payload_len = payload.len(),
            "Dry run complete, nothing was sent"
        );
        return Ok(());
    }

    let identity = signing_identity(&config)?;
    let spec = builder.build(&config.contract, &config.token, &identity)?;

    let client = JsonRpcClient::new(config.rpc_url(&args.network)?)?;
    tracing::info!(rpc_url = %client.url(), "Connecting to network");
    let deployer = ContractDeployer::new(client, config.deploy_options(&args.network));

    let outcome = deployer.deploy(&spec, &artifact, &identity).await;
    let line = report(&outcome);
    let result = outcome?;

    println!("{line}");
    let explorer = args
        .network
        .parse::<KnownNetwork>()
        .ok()
        .map(|network| network.explorer_url());
    println!("{}", summary_table(&result, explorer));

    let record = DeploymentRecord::new(
        &result,
        &args.network,
        deployer.options().chain_id,
        identity.address(),
        config.fingerprint(&args.network),
    );
    persist_record(&record, &args.out);

    Ok(())
}

/// Write the deployment record. The contract is already on-chain at this point, so a
/// failure is only logged and the run still succeeds.
fn persist_record(record: &DeploymentRecord, out: &Path) -> Option<PathBuf> {
    match record.save(out) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!(
                error = %format!("{e:#}"),
                contract = %record.contract_name,
                address = %record.address,
                tx_hash = %record.transaction_hash,
                "Contract deployed, but the deployment record could not be written. Do not redeploy."
            );
            None
        }
    }
}

fn signing_identity(config: &LaunchpadConfig) -> Result<SigningIdentity> {
    let credential: CredentialRef = config.credential.parse()?;
    SigningIdentity::from_credential(&credential)
        .with_context(|| format!("Failed to resolve credential '{}'", credential))
}
