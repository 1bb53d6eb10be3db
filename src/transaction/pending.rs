//! Pending multi-agent transaction handling
//!
//! Collects authenticators from the sender and every secondary signer.
//! Signers may sign in any order and on different machines; the record is
//! saved as JSON between signing sessions.

use crate::account::Account;
use crate::transaction::authenticator::{AccountAuthenticator, SignedTransaction, SignerError};
use crate::transaction::raw::MultiAgentTransaction;
use crate::types::AccountAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Signature collection errors
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Signer not required by this transaction: {0}")]
    UnauthorizedSigner(AccountAddress),
    #[error("Already signed by {0}")]
    AlreadySigned(AccountAddress),
    #[error("Invalid signature from {0}")]
    InvalidSignature(AccountAddress),
    #[error("Insufficient signatures, still missing: {}", format_missing(.missing))]
    InsufficientSignatures { missing: Vec<AccountAddress> },
    #[error("Signer error: {0}")]
    SignerError(#[from] SignerError),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] crate::crypto::KeyError),
    #[error("Encoding error: {0}")]
    EncodingError(#[from] bcs::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

fn format_missing(missing: &[AccountAddress]) -> String {
    missing
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One collected authenticator
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectedSignature {
    /// Required signer this authenticator belongs to
    pub signer: AccountAddress,
    pub authenticator: AccountAuthenticator,
    /// When the signature was added
    pub signed_at: DateTime<Utc>,
}

/// Status of a pending transaction
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PendingStatus {
    /// Waiting for more signatures
    AwaitingSignatures,
    /// Every required signer has signed
    Ready,
    /// Sent to the network
    Submitted,
}

/// A multi-agent transaction awaiting its signatures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingMultiAgentTx {
    pub id: String,
    pub transaction: MultiAgentTransaction,
    pub signatures: Vec<CollectedSignature>,
    pub status: PendingStatus,
    /// Hash returned by the node once submitted
    pub submitted_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingMultiAgentTx {
    pub fn new(transaction: MultiAgentTransaction) -> Result<Self, CollectError> {
        let now = Utc::now();
        let id = transaction.id()?;

        Ok(Self {
            id,
            transaction,
            signatures: Vec::new(),
            status: PendingStatus::AwaitingSignatures,
            submitted_hash: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Add an authenticator from one of the required signers
    pub fn add_authenticator(
        &mut self,
        authenticator: AccountAuthenticator,
    ) -> Result<AccountAddress, CollectError> {
        let signer = authenticator.address()?;

        if !self.transaction.required_signers().contains(&signer) {
            return Err(CollectError::UnauthorizedSigner(signer));
        }

        if self.signatures.iter().any(|s| s.signer == signer) {
            return Err(CollectError::AlreadySigned(signer));
        }

        if !authenticator.verify(&self.transaction)? {
            return Err(CollectError::InvalidSignature(signer));
        }

        self.signatures.push(CollectedSignature {
            signer,
            authenticator,
            signed_at: Utc::now(),
        });
        self.updated_at = Utc::now();

        if self.missing_signers().is_empty() {
            self.status = PendingStatus::Ready;
        }

        log::info!(
            "Collected signature from {} ({}/{})",
            signer,
            self.signatures.len(),
            self.transaction.required_signers().len()
        );
        Ok(signer)
    }

    /// Sign with a local account and add the result
    pub fn sign_with(&mut self, account: &Account) -> Result<AccountAddress, CollectError> {
        let authenticator = account.sign_transaction(&self.transaction)?;
        self.add_authenticator(authenticator)
    }

    /// Required signers that have not signed yet, in signing order
    pub fn missing_signers(&self) -> Vec<AccountAddress> {
        self.transaction
            .required_signers()
            .into_iter()
            .filter(|addr| !self.signatures.iter().any(|s| s.signer == *addr))
            .collect()
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_ready(&self) -> bool {
        self.missing_signers().is_empty()
    }

    fn authenticator_for(&self, signer: &AccountAddress) -> Option<AccountAuthenticator> {
        self.signatures
            .iter()
            .find(|s| s.signer == *signer)
            .map(|s| s.authenticator.clone())
    }

    /// Combine the collected authenticators into a signed transaction
    pub fn finalize(&self) -> Result<SignedTransaction, CollectError> {
        let missing = self.missing_signers();
        if !missing.is_empty() {
            return Err(CollectError::InsufficientSignatures { missing });
        }

        let sender = self
            .authenticator_for(&self.transaction.sender())
            .ok_or(CollectError::InsufficientSignatures {
                missing: vec![self.transaction.sender()],
            })?;

        let secondary = self
            .transaction
            .secondary_signer_addresses()
            .iter()
            .map(|addr| {
                self.authenticator_for(addr)
                    .ok_or(CollectError::InsufficientSignatures {
                        missing: vec![*addr],
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SignedTransaction::multi_agent(
            &self.transaction,
            sender,
            secondary,
        )?)
    }

    /// Mark as submitted under the node's transaction hash
    pub fn mark_submitted(&mut self, hash: &str) {
        self.status = PendingStatus::Submitted;
        self.submitted_hash = Some(hash.to_string());
        self.updated_at = Utc::now();
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), CollectError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file, re-checking every stored signature
    pub fn load(path: &Path) -> Result<Self, CollectError> {
        let json = fs::read_to_string(path)?;
        let pending: Self = serde_json::from_str(&json)?;

        for collected in &pending.signatures {
            if collected.authenticator.address()? != collected.signer
                || !collected.authenticator.verify(&pending.transaction)?
            {
                return Err(CollectError::InvalidSignature(collected.signer));
            }
        }

        Ok(pending)
    }
}
