//! Signing identities
//!
//! An `Account` is an address with optional key material. Address-only
//! accounts can be named as signers of a transaction but cannot produce an
//! authenticator themselves.

use crate::crypto::{KeyError, KeyPair};
use crate::transaction::{AccountAuthenticator, MultiAgentTransaction, SignerError};
use crate::types::AccountAddress;

/// A signing identity
#[derive(Debug, Clone)]
pub struct Account {
    address: AccountAddress,
    key_pair: Option<KeyPair>,
    /// Optional label, e.g. "admin" or "user"
    pub label: Option<String>,
}

impl Account {
    /// Create an account with a fresh key pair
    pub fn generate() -> Self {
        Self::from_key_pair(KeyPair::generate())
    }

    /// Account whose address is derived from the key pair
    pub fn from_key_pair(key_pair: KeyPair) -> Self {
        Self {
            address: AccountAddress::new(key_pair.authentication_key()),
            key_pair: Some(key_pair),
            label: None,
        }
    }

    /// Import an account from a hex private key
    pub fn from_private_key_hex(private_key_hex: &str) -> Result<Self, KeyError> {
        Ok(Self::from_key_pair(KeyPair::from_private_key_hex(
            private_key_hex,
        )?))
    }

    /// An identity known only by address
    pub fn address_only(address: AccountAddress) -> Self {
        Self {
            address,
            key_pair: None,
            label: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn has_key(&self) -> bool {
        self.key_pair.is_some()
    }

    pub fn public_key_hex(&self) -> Option<String> {
        self.key_pair.as_ref().map(|kp| kp.public_key_hex())
    }

    /// Label if set, otherwise the address
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => format!("{} ({})", label, self.address),
            None => self.address.to_string(),
        }
    }

    /// Produce this account's authenticator for a transaction.
    ///
    /// The transaction is only read; signing the same transaction again
    /// yields another authenticator that verifies just the same.
    pub fn sign_transaction(
        &self,
        transaction: &MultiAgentTransaction,
    ) -> Result<AccountAuthenticator, SignerError> {
        let key_pair = self
            .key_pair
            .as_ref()
            .ok_or(SignerError::MissingKeyMaterial(self.address))?;

        let message = transaction.signing_message()?;
        let signature = key_pair.sign(&message)?;

        log::debug!("{} signed transaction", self.display_name());
        Ok(AccountAuthenticator::new(
            key_pair.public_key.serialize().to_vec(),
            signature,
        ))
    }
}
