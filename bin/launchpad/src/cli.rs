use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Args, Parser, Subcommand};
use launchpad_deploy::CONFIG_FILENAME;
use tracing::level_filters::LevelFilter;

/// Default directory for deployment records.
const DEFAULT_OUT_DIR: &str = "deployments";

#[derive(Parser)]
#[command(name = "launchpad")]
#[command(author, version, about = "Deploy a token contract to an EVM chain in one shot")]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "LAUNCHPAD_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy the configured contract.
    Deploy(DeployArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    /// Path to the configuration file, or to the directory containing it.
    #[arg(short, long, alias = "conf", env = "LAUNCHPAD_CONFIG", default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// The configuration profile to use.
    ///
    /// Profiles named after a known network (`abstract-testnet`, `abstract-mainnet`)
    /// need no RPC URL or chain ID.
    #[arg(short, long, env = "LAUNCHPAD_PROFILE", default_value = "abstract-testnet")]
    pub network: String,

    /// Build and encode the deployment without touching the network.
    #[arg(long, env = "LAUNCHPAD_DRY_RUN")]
    pub dry_run: bool,

    /// Deployer address to build a dry run for, instead of resolving the credential.
    #[arg(long, requires = "dry_run")]
    pub deployer: Option<Address>,

    /// Directory the deployment record is written to, as `<out>/<network>/<contract>.json`.
    #[arg(long, alias = "outdata", env = "LAUNCHPAD_OUT", default_value = DEFAULT_OUT_DIR)]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy() {
        let cli = Cli::try_parse_from([
            "launchpad",
            "deploy",
            "--network",
            "abstract-mainnet",
            "--out",
            "/tmp/records",
        ])
        .unwrap();

        let Command::Deploy(args) = cli.command;
        assert_eq!(args.network, "abstract-mainnet");
        assert_eq!(args.config, PathBuf::from(CONFIG_FILENAME));
        assert_eq!(args.out, PathBuf::from("/tmp/records"));
        assert!(!args.dry_run);
    }

    #[test]
    fn test_deployer_requires_dry_run() {
        let deployer = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
        assert!(Cli::try_parse_from(["launchpad", "deploy", "--deployer", deployer]).is_err());

        let cli =
            Cli::try_parse_from(["launchpad", "deploy", "--dry-run", "--deployer", deployer])
                .unwrap();
        let Command::Deploy(args) = cli.command;
        assert!(args.dry_run);
        assert!(args.deployer.is_some());
    }
}
