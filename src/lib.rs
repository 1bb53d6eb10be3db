//! pog-client: multi-agent transactions for the POG player NFT contract
//!
//! This crate builds, co-signs and submits `<admin>::pog::mint_player_nft`
//! calls on a Move-based chain:
//! - Typed Move values checked against entry function ABIs
//! - ECDSA signatures (secp256k1) over BCS-encoded raw transactions
//! - Multi-agent signature collection, locally or across machines
//! - REST submission with typed failure classes
//! - YAML profiles with keys from environment variables
//!
//! # Example
//!
//! ```no_run
//! use pog_client::account::Account;
//! use pog_client::config::{Config, Network};
//! use pog_client::pog::{MintWorkflow, PlayerMint};
//!
//! let config = Config::for_network(Network::Testnet).unwrap();
//! let workflow = MintWorkflow::new(&config, Account::generate(), Account::generate());
//! let context = workflow.offline_context(&config).unwrap();
//!
//! let player = PlayerMint::new("player01", "QmRa9FiP3uruiT5Q6r4n6dL8oUcUwVh4NUzEmcwE2mWFqY")
//!     .with_scores([1, 2, 3, 4, 5]);
//! let pending = workflow.prepare(&player, &context).unwrap();
//! println!("Signed by {} of 2", pending.signature_count());
//! ```

pub mod abi;
pub mod account;
pub mod cli;
pub mod client;
pub mod config;
pub mod crypto;
pub mod pog;
pub mod transaction;
pub mod types;

// Re-export commonly used types
pub use abi::{AbiRegistry, EntryFunctionAbi, ModuleAbi};
pub use account::Account;
pub use client::{ClientError, PendingTransaction, RestClient, Submitter};
pub use config::{Config, EnvSecretStore, Network};
pub use crypto::KeyPair;
pub use pog::{MintOutcome, MintWorkflow, PlayerMint};
pub use transaction::{
    AccountAuthenticator, MultiAgentTransaction, PendingMultiAgentTx, SignedTransaction,
    TransactionBuilder,
};
pub use types::{AccountAddress, EntryFunctionId, MoveType, MoveValue};
