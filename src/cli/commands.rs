//! CLI commands for the pog client
//!
//! Implements all command handlers for the CLI interface.

use crate::account::Account;
use crate::client::{RestClient, Submitter};
use crate::config::{Config, ConfigError, EnvSecretStore, Network, SecretStore};
use crate::crypto::KeyPair;
use crate::pog::{self, ChainContext, MintOutcome, MintWorkflow, PlayerMint};
use crate::transaction::{PendingMultiAgentTx, PendingStatus};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// How long `--wait` polls for a committed transaction
const WAIT_TIMEOUT: Duration = Duration::from_secs(60);

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Where the config comes from, as given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    pub path: Option<PathBuf>,
    pub network: Option<Network>,
    pub rest_url: Option<String>,
}

impl ConfigSource {
    /// Load the config file if given, then apply command-line overrides
    pub fn load(&self) -> CliResult<Config> {
        let mut config = match &self.path {
            Some(path) => Config::load(path)?,
            None => Config::for_network(Network::default())?,
        };
        if let Some(network) = self.network {
            config.network = network;
            match network.rest_url() {
                Some(url) => config = config.with_rest_url(url)?,
                None if self.path.is_none() && self.rest_url.is_none() => {
                    return Err(ConfigError::MissingRestUrl.into())
                }
                None => {}
            }
        }
        if let Some(url) = &self.rest_url {
            config = config.with_rest_url(url)?;
        }
        Ok(config)
    }
}

/// Mint options from the command line
#[derive(Debug, Clone, Default)]
pub struct MintOptions {
    /// Sign but do not submit
    pub dry_run: bool,
    /// Build against the bundled ABI without contacting a node
    pub offline: bool,
    /// Where to write the pending record when a signature is missing
    pub pending_out: Option<PathBuf>,
}

/// Generate a new key pair
pub fn cmd_keygen() -> CliResult<()> {
    let key_pair = KeyPair::generate();
    let private_key = key_pair.private_key_hex();
    let account = Account::from_key_pair(key_pair);

    println!("🔐 New key pair generated!");
    println!("   📍 Address: {}", account.address());
    if let Some(public_key) = account.public_key_hex() {
        println!("   🔑 Public Key: {}", public_key);
    }
    println!("   🗝️  Private Key: 0x{}", private_key);
    println!("\n   ⚠️  IMPORTANT: Store the private key in a secret store, e.g.");
    println!("   export POG_ADMIN_PRIVATE_KEY=0x{}...", &private_key[..8]);

    Ok(())
}

/// Show the address derived from a key held in an environment variable
pub fn cmd_address(key_env: &str) -> CliResult<()> {
    let key = EnvSecretStore
        .secret(key_env)
        .ok_or_else(|| format!("Environment variable {} is not set", key_env))?;
    let account = Account::from_private_key_hex(&key)?;

    println!("📍 Address for {}: {}", key_env, account.address());
    if let Some(public_key) = account.public_key_hex() {
        println!("   🔑 Public Key: {}", public_key);
    }

    Ok(())
}

/// Print the `pog` module ABI, fetched from the node unless `offline`
pub async fn cmd_abi(config: &Config, offline: bool) -> CliResult<()> {
    let admin = config.admin_account(&EnvSecretStore)?;
    let module = pog::module_id(admin.address())?;

    let abi = if offline {
        pog::module_abi(admin.address())?
    } else {
        RestClient::from_config(config)?.module_abi(&module).await?
    };

    println!("📜 ABI of {}", abi.id);
    for function in &abi.functions {
        let params: Vec<String> = function.params.iter().map(|p| p.to_string()).collect();
        let marker = if function.is_entry { "entry " } else { "" };
        println!("   └─ {}fun {}({})", marker, function.name, params.join(", "));
    }

    Ok(())
}

/// Build, sign and submit a mint
pub async fn cmd_mint(config: &Config, player: &PlayerMint, options: &MintOptions) -> CliResult<()> {
    let workflow = MintWorkflow::from_config(config, &EnvSecretStore)?;

    println!("🪙 Minting player NFT for {}", player.username);
    println!("   ├─ Admin: {}", workflow.admin().address());
    println!("   └─ User: {}", workflow.user().address());

    let client = RestClient::from_config(config)?;
    let context: ChainContext = if options.offline {
        workflow.offline_context(config)?
    } else {
        workflow.fetch_context(&client).await?
    };

    match workflow
        .run(player, &context, &client, options.dry_run)
        .await?
    {
        MintOutcome::Submitted { pending, signed } => {
            println!("\n✅ Transaction submitted!");
            println!("   📝 Hash: {}", pending.hash);
            println!("   📦 Size: {} bytes", signed.to_bcs()?.len());
        }
        MintOutcome::DryRun(signed) => {
            println!("\n🧪 Dry run: transaction signed but not submitted");
            println!("   📝 Hash: {}", signed.hash()?);
            println!("   📦 BCS: 0x{}", hex::encode(signed.to_bcs()?));
        }
        MintOutcome::AwaitingSignatures(pending) => {
            let path = options
                .pending_out
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("pending-{}.json", pending.id)));
            pending.save(&path)?;
            print_pending(&pending);
            println!("\n💾 Saved to {:?}", path);
            println!("   Co-sign with: pog cosign --pending {:?} --key-env <VAR>", path);
        }
    }

    Ok(())
}

/// Add a signature to a pending record
pub fn cmd_cosign(pending_path: &Path, key_env: &str) -> CliResult<()> {
    let key = EnvSecretStore
        .secret(key_env)
        .ok_or_else(|| format!("Environment variable {} is not set", key_env))?;
    let account = Account::from_private_key_hex(&key)?;

    let mut pending = PendingMultiAgentTx::load(pending_path)?;
    let signer = pending.sign_with(&account)?;
    pending.save(pending_path)?;

    println!("✍️  Signed by {}", signer);
    print_pending(&pending);

    Ok(())
}

/// Submit a fully signed pending record
pub async fn cmd_submit(config: &Config, pending_path: &Path, wait: bool) -> CliResult<()> {
    let mut pending = PendingMultiAgentTx::load(pending_path)?;
    if pending.status == PendingStatus::Submitted {
        println!(
            "⚠️  Already submitted as {}",
            pending.submitted_hash.as_deref().unwrap_or("-")
        );
        return Ok(());
    }

    let signed = pending.finalize()?;
    let client = RestClient::from_config(config)?;
    let receipt = client.submit(&signed).await?;

    pending.mark_submitted(&receipt.hash);
    pending.save(pending_path)?;

    println!("✅ Transaction submitted!");
    println!("   📝 Hash: {}", receipt.hash);

    if wait {
        println!("   ⏳ Waiting for commit...");
        client
            .wait_for_transaction(&receipt.hash, WAIT_POLL_INTERVAL, WAIT_TIMEOUT)
            .await?;
        println!("   🎉 Committed");
    }

    Ok(())
}

fn print_pending(pending: &PendingMultiAgentTx) {
    let required = pending.transaction.required_signers();
    println!("\n📋 Pending transaction {}", pending.id);
    println!(
        "   ├─ Signatures: {}/{}",
        pending.signature_count(),
        required.len()
    );
    for signer in &required {
        let mark = if pending.missing_signers().contains(signer) {
            "⏳"
        } else {
            "✅"
        };
        println!("   ├─ {} {}", mark, signer);
    }
    println!("   └─ Status: {:?}", pending.status);
}
