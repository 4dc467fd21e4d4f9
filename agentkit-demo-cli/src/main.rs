//! Agentkit Demo CLI
//!
//! Command-line interface for exercising agent identifiers, account
//! descriptors, association hashing and validation requests.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod ui;

#[derive(Parser)]
#[command(name = "agentkit-demo")]
#[command(about = "Agentkit Demo CLI - ERC-8004 identifiers, associations and validation requests", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file (merged with AGENTKIT_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse any agent identifier and print its canonical form
    Resolve {
        /// did:8004, did:ethr or UAID string (percent-encoding allowed)
        input: String,
    },

    /// Canonicalize a UAID-bearing string
    Uaid {
        /// String containing a did:ethr core
        input: String,
    },

    /// Encode or decode EVM-V1 account descriptors
    Descriptor {
        #[command(subcommand)]
        action: DescriptorAction,
    },

    /// Inspect associated-account records
    Association {
        #[command(subcommand)]
        action: AssociationAction,
    },

    /// Prepare validation requests and follow their user operations
    Validation {
        #[command(subcommand)]
        action: ValidationAction,
    },
}

#[derive(Subcommand)]
enum DescriptorAction {
    /// Encode a chain id and address
    Encode {
        /// EIP-155 chain id
        #[arg(long)]
        chain_id: u64,

        /// 0x-prefixed 20-byte address
        #[arg(long)]
        address: String,
    },

    /// Decode a hex descriptor
    Decode {
        /// Descriptor bytes as hex
        hex: String,
    },
}

#[derive(Subcommand)]
enum AssociationAction {
    /// Print the EIP-712 hashes of a record
    Hash {
        /// JSON file holding an association record
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ValidationAction {
    /// Build a validation request plan and print it as JSON
    Prepare {
        /// did:8004 identifier of the agent
        did: String,

        /// Validator address
        #[arg(long)]
        validator: String,

        /// Off-chain request payload location
        #[arg(long)]
        request_uri: Option<String>,

        /// Request hash to commit to (derived when omitted)
        #[arg(long)]
        request_hash: Option<String>,

        /// Execution mode (aa or eoa)
        #[arg(long, default_value = "aa")]
        mode: String,
    },

    /// Wait for a user operation receipt
    Wait {
        /// User operation hash
        hash: String,

        /// Chain the operation was submitted to
        #[arg(long)]
        chain_id: u64,

        /// Give up after this many seconds
        #[arg(long, default_value = "120")]
        timeout: u64,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "agentkit_demo_cli=debug,agentkit_lib=debug"
    } else {
        "agentkit_demo_cli=info,agentkit_lib=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Resolve { input } => {
            commands::identity::resolve(&input, cli.verbose)?;
        }
        Commands::Uaid { input } => {
            commands::identity::uaid(&input, cli.verbose)?;
        }
        Commands::Descriptor { action } => match action {
            DescriptorAction::Encode { chain_id, address } => {
                commands::descriptor::encode(chain_id, &address, cli.verbose)?;
            }
            DescriptorAction::Decode { hex } => {
                commands::descriptor::decode(&hex, cli.verbose)?;
            }
        },
        Commands::Association { action } => match action {
            AssociationAction::Hash { file } => {
                commands::association::hash(&file, cli.verbose)?;
            }
        },
        Commands::Validation { action } => {
            let config = config::AgentkitConfig::load(cli.config.as_deref())?;
            match action {
                ValidationAction::Prepare {
                    did,
                    validator,
                    request_uri,
                    request_hash,
                    mode,
                } => {
                    commands::validation::prepare(
                        &config,
                        &did,
                        &validator,
                        request_uri,
                        request_hash,
                        &mode,
                        cli.verbose,
                    )
                    .await?;
                }
                ValidationAction::Wait {
                    hash,
                    chain_id,
                    timeout,
                } => {
                    commands::validation::wait(&config, &hash, chain_id, timeout, cli.verbose)
                        .await?;
                }
            }
        }
    }

    Ok(())
}
