//! pog CLI Application
//!
//! A command-line interface for minting player NFTs.

use clap::{ArgAction, Args, Parser, Subcommand};
use pog_client::cli::{self, CliResult, ConfigSource, MintOptions};
use pog_client::config::Network;
use pog_client::pog::{PlayerMint, ENCRYPTED_SCORE_LABELS, SCORE_COUNT};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pog")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Build, co-sign and submit POG player NFT mints", long_about = None)]
struct Cli {
    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network (mainnet, testnet, devnet, local, custom)
    #[arg(short, long, global = true)]
    network: Option<Network>,

    /// REST endpoint, overrides the network default
    #[arg(long, global = true)]
    rest_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new key pair
    Keygen,

    /// Show the address of a key held in an environment variable
    Address {
        /// Environment variable holding the private key
        #[arg(long)]
        key_env: String,
    },

    /// Show the pog module ABI
    Abi {
        /// Print the bundled ABI instead of fetching it
        #[arg(long)]
        offline: bool,
    },

    /// Mint a player NFT
    Mint(MintArgs),

    /// Add a signature to a pending transaction file
    Cosign {
        /// Pending transaction file
        #[arg(short, long)]
        pending: PathBuf,

        /// Environment variable holding the co-signer's private key
        #[arg(long)]
        key_env: String,
    },

    /// Submit a fully signed pending transaction file
    Submit {
        /// Pending transaction file
        #[arg(short, long)]
        pending: PathBuf,

        /// Wait until the transaction is committed
        #[arg(long)]
        wait: bool,
    },
}

#[derive(Args)]
struct MintArgs {
    /// JSON file with all mint arguments
    #[arg(long, conflicts_with_all = ["username", "content_id"])]
    player: Option<PathBuf>,

    /// Player username
    #[arg(short, long)]
    username: Option<String>,

    /// Content id of the player's metadata
    #[arg(long)]
    content_id: Option<String>,

    /// Boolean flag passed as the third argument
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    flag: bool,

    /// Five comma-separated scores
    #[arg(long, value_delimiter = ',', default_value = "0,0,0,0,0")]
    scores: Vec<u64>,

    /// Six comma-separated encrypted scores (poh, pop, posk, poc, pos, pog)
    #[arg(long, value_delimiter = ',')]
    encrypted_scores: Vec<String>,

    /// Sign but do not submit
    #[arg(long)]
    dry_run: bool,

    /// Use the bundled ABI and skip all node lookups
    #[arg(long)]
    offline: bool,

    /// Where to save the pending transaction if a signer has no local key
    #[arg(long)]
    pending_out: Option<PathBuf>,
}

impl MintArgs {
    fn player(&self) -> CliResult<PlayerMint> {
        if let Some(path) = &self.player {
            let data = fs::read_to_string(path)?;
            return Ok(serde_json::from_str(&data)?);
        }

        let username = self.username.as_deref().ok_or("--username is required")?;
        let content_id = self
            .content_id
            .as_deref()
            .ok_or("--content-id is required")?;

        let scores: [u64; SCORE_COUNT] = self.scores.clone().try_into().map_err(|v: Vec<u64>| {
            format!("Expected {} scores, got {}", SCORE_COUNT, v.len())
        })?;
        let encrypted_scores: [String; 6] =
            self.encrypted_scores
                .clone()
                .try_into()
                .map_err(|v: Vec<String>| {
                    format!(
                        "Expected {} encrypted scores ({}), got {}",
                        ENCRYPTED_SCORE_LABELS.len(),
                        ENCRYPTED_SCORE_LABELS.join(", "),
                        v.len()
                    )
                })?;

        Ok(PlayerMint::new(username, content_id)
            .with_flag(self.flag)
            .with_scores(scores)
            .with_encrypted_scores(encrypted_scores))
    }

    fn options(&self) -> MintOptions {
        MintOptions {
            dry_run: self.dry_run,
            offline: self.offline,
            pending_out: self.pending_out.clone(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let source = ConfigSource {
        path: cli.config.clone(),
        network: cli.network,
        rest_url: cli.rest_url.clone(),
    };

    // Commands that never touch config or the network
    match &cli.command {
        Commands::Keygen => return cli::cmd_keygen(),
        Commands::Address { key_env } => return cli::cmd_address(key_env),
        Commands::Cosign { pending, key_env } => return cli::cmd_cosign(pending, key_env),
        _ => {}
    }

    let config = source.load()?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        match cli.command {
            Commands::Abi { offline } => cli::cmd_abi(&config, offline).await,

            Commands::Mint(args) => {
                let player = args.player()?;
                cli::cmd_mint(&config, &player, &args.options()).await
            }

            Commands::Submit { pending, wait } => cli::cmd_submit(&config, &pending, wait).await,

            Commands::Keygen | Commands::Address { .. } | Commands::Cosign { .. } => {
                Ok::<(), Box<dyn std::error::Error>>(())
            }
        }
    })
}
