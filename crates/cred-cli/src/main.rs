//! # cred CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cred_cli::campaign::{run_campaign, CampaignArgs};
use cred_cli::tree::{run_tree, TreeArgs};

/// Merkle credential distribution toolchain.
///
/// Builds membership trees from address lists, extracts and verifies
/// proofs, and administers distribution campaigns.
#[derive(Parser, Debug)]
#[command(name = "cred", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Offline tree building, proof extraction and verification.
    Tree(TreeArgs),

    /// Campaign administration against a local state directory.
    Campaign(CampaignArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Tree(args) => run_tree(args),
        Commands::Campaign(args) => run_campaign(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
