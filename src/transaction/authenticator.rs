//! Authenticators and signed transactions
//!
//! An `AccountAuthenticator` binds one signer's public key and signature to
//! one `MultiAgentTransaction`. A `SignedTransaction` carries one for the
//! sender and one per secondary signer.

use crate::crypto::{authentication_key, verify_signature, KeyError};
use crate::crypto::{domain_prefix, sha256_hex};
use crate::transaction::raw::{MultiAgentTransaction, RawTransaction};
use crate::types::AccountAddress;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain tag for transaction hashes
pub const TRANSACTION_SALT: &str = "POG::Transaction";

/// Signing and signature-combination errors
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Account {0} holds no private key and cannot sign")]
    MissingKeyMaterial(AccountAddress),
    #[error("Signature from {0} does not verify")]
    InvalidSignature(AccountAddress),
    #[error("Authenticator for {got} given where {expected} must sign")]
    SignerMismatch {
        expected: AccountAddress,
        got: AccountAddress,
    },
    #[error("Expected {expected} secondary authenticators, got {got}")]
    SecondaryCount { expected: usize, got: usize },
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
    #[error("Encoding error: {0}")]
    EncodingError(#[from] bcs::Error),
}

/// Hex in JSON, raw bytes in BCS
mod hex_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
        } else {
            bytes.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let body = s.strip_prefix("0x").unwrap_or(&s);
            hex::decode(body).map_err(D::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer)
        }
    }
}

/// One signer's approval of one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAuthenticator {
    /// Compressed secp256k1 public key
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
    /// Compact ECDSA signature over the signing message
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

impl AccountAuthenticator {
    pub fn new(public_key: Vec<u8>, signature: Vec<u8>) -> Self {
        Self {
            public_key,
            signature,
        }
    }

    fn public_key(&self) -> Result<PublicKey, KeyError> {
        PublicKey::from_slice(&self.public_key).map_err(|_| KeyError::InvalidPublicKey)
    }

    /// Address of the account this authenticator speaks for
    pub fn address(&self) -> Result<AccountAddress, KeyError> {
        let public_key = self.public_key()?;
        Ok(AccountAddress::new(authentication_key(&public_key)))
    }

    /// Check the signature against a transaction's signing message
    pub fn verify(&self, transaction: &MultiAgentTransaction) -> Result<bool, SignerError> {
        let public_key = self.public_key()?;
        let message = transaction.signing_message()?;
        Ok(verify_signature(&public_key, &message, &self.signature)?)
    }

    /// Verify and require that the authenticator belongs to `expected`
    fn check_for(
        &self,
        expected: AccountAddress,
        transaction: &MultiAgentTransaction,
    ) -> Result<(), SignerError> {
        let got = self.address()?;
        if got != expected {
            return Err(SignerError::SignerMismatch { expected, got });
        }
        if !self.verify(transaction)? {
            return Err(SignerError::InvalidSignature(got));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAuthenticator {
    MultiAgent {
        sender: AccountAuthenticator,
        secondary_signer_addresses: Vec<AccountAddress>,
        secondary_signers: Vec<AccountAuthenticator>,
    },
}

/// A transaction carrying every required authenticator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    raw_txn: RawTransaction,
    authenticator: TransactionAuthenticator,
}

impl SignedTransaction {
    /// Combine the sender's and secondary signers' authenticators.
    ///
    /// `secondary` must be in the same order as the transaction's secondary
    /// signer addresses. Every authenticator is verified before combining.
    pub fn multi_agent(
        transaction: &MultiAgentTransaction,
        sender: AccountAuthenticator,
        secondary: Vec<AccountAuthenticator>,
    ) -> Result<Self, SignerError> {
        let addresses = transaction.secondary_signer_addresses();
        if secondary.len() != addresses.len() {
            return Err(SignerError::SecondaryCount {
                expected: addresses.len(),
                got: secondary.len(),
            });
        }

        sender.check_for(transaction.sender(), transaction)?;
        for (auth, address) in secondary.iter().zip(addresses) {
            auth.check_for(*address, transaction)?;
        }

        Ok(Self {
            raw_txn: transaction.raw_transaction().clone(),
            authenticator: TransactionAuthenticator::MultiAgent {
                sender,
                secondary_signer_addresses: addresses.to_vec(),
                secondary_signers: secondary,
            },
        })
    }

    pub fn raw_transaction(&self) -> &RawTransaction {
        &self.raw_txn
    }

    pub fn authenticator(&self) -> &TransactionAuthenticator {
        &self.authenticator
    }

    /// Wire encoding submitted to the node
    pub fn to_bcs(&self) -> Result<Vec<u8>, bcs::Error> {
        bcs::to_bytes(self)
    }

    /// Transaction hash, hex encoded with `0x`
    pub fn hash(&self) -> Result<String, bcs::Error> {
        let mut data = domain_prefix(TRANSACTION_SALT);
        data.extend(self.to_bcs()?);
        Ok(format!("0x{}", sha256_hex(&data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{AbiRegistry, EntryFunctionAbi, ModuleAbi};
    use crate::account::Account;
    use crate::transaction::TransactionBuilder;
    use crate::types::{ModuleId, MoveType, MoveValue};

    fn build(admin: &Account, user: &Account) -> MultiAgentTransaction {
        let module = ModuleId::new(admin.address(), "pog").unwrap();
        let abi = ModuleAbi::new(
            module.clone(),
            vec![EntryFunctionAbi::new(
                "mint",
                vec![MoveType::Signer, MoveType::Signer, MoveType::String],
            )],
        );
        let registry = AbiRegistry::new().with_module(abi);

        TransactionBuilder::new()
            .sender(admin.address())
            .secondary_signer(user.address())
            .function(format!("{}::mint", module).parse().unwrap())
            .argument(MoveValue::string("player"))
            .build(&registry)
            .unwrap()
    }

    #[test]
    fn test_combine_and_hash() {
        let admin = Account::generate();
        let user = Account::generate();
        let txn = build(&admin, &user);

        let admin_auth = admin.sign_transaction(&txn).unwrap();
        let user_auth = user.sign_transaction(&txn).unwrap();
        assert_ne!(admin_auth, user_auth);

        let signed = SignedTransaction::multi_agent(&txn, admin_auth, vec![user_auth]).unwrap();
        assert_eq!(signed.raw_transaction(), txn.raw_transaction());
        assert!(!signed.to_bcs().unwrap().is_empty());
        assert!(signed.hash().unwrap().starts_with("0x"));
        assert_eq!(signed.hash().unwrap().len(), 66);
    }

    #[test]
    fn test_swapped_authenticators_rejected() {
        let admin = Account::generate();
        let user = Account::generate();
        let txn = build(&admin, &user);

        let admin_auth = admin.sign_transaction(&txn).unwrap();
        let user_auth = user.sign_transaction(&txn).unwrap();

        let result = SignedTransaction::multi_agent(&txn, user_auth, vec![admin_auth]);
        assert!(matches!(result, Err(SignerError::SignerMismatch { .. })));
    }

    #[test]
    fn test_missing_secondary_rejected() {
        let admin = Account::generate();
        let user = Account::generate();
        let txn = build(&admin, &user);

        let admin_auth = admin.sign_transaction(&txn).unwrap();
        let result = SignedTransaction::multi_agent(&txn, admin_auth, vec![]);
        assert!(matches!(
            result,
            Err(SignerError::SecondaryCount {
                expected: 1,
                got: 0
            })
        ));
    }

    #[test]
    fn test_signature_over_other_transaction_rejected() {
        let admin = Account::generate();
        let user = Account::generate();
        let txn = build(&admin, &user);
        let other = build(&admin, &Account::generate());

        let forged = admin.sign_transaction(&other).unwrap();
        assert!(!forged.verify(&txn).unwrap());

        let user_auth = user.sign_transaction(&txn).unwrap();
        let result = SignedTransaction::multi_agent(&txn, forged, vec![user_auth]);
        assert!(matches!(result, Err(SignerError::InvalidSignature(_))));
    }

    #[test]
    fn test_authenticator_json_is_hex() {
        let auth = AccountAuthenticator::new(vec![0x02, 0xab], vec![0xcd]);
        let json = serde_json::to_value(&auth).unwrap();
        assert_eq!(json["public_key"], "0x02ab");
        assert_eq!(json["signature"], "0xcd");
        let back: AccountAuthenticator = serde_json::from_value(json).unwrap();
        assert_eq!(back, auth);
    }

    #[test]
    fn test_malformed_public_key() {
        let admin = Account::generate();
        let txn = build(&admin, &Account::generate());
        let auth = AccountAuthenticator::new(vec![0x05; 33], vec![0; 64]);

        assert!(matches!(auth.address(), Err(KeyError::InvalidPublicKey)));
        assert!(matches!(
            auth.verify(&txn),
            Err(SignerError::CryptoError(KeyError::InvalidPublicKey))
        ));
    }
}
