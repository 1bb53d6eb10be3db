//! Raw and multi-agent transactions
//!
//! A `MultiAgentTransaction` is the unsigned object every signer signs. It
//! is immutable once the builder hands it out.

use crate::crypto::{domain_prefix, sha256_hex};
use crate::types::{AccountAddress, ModuleId, TypeTag};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain tag for the bytes signers sign
pub const RAW_TRANSACTION_WITH_DATA_SALT: &str = "POG::RawTransactionWithData";

/// Chain identifier; transactions for one chain are rejected by another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u8);

impl ChainId {
    pub const MAINNET: ChainId = ChainId(1);
    pub const TESTNET: ChainId = ChainId(2);
    pub const LOCAL: ChainId = ChainId(4);

    pub fn id(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Call of a published entry function with BCS-encoded arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFunction {
    pub module: ModuleId,
    pub function: String,
    pub ty_args: Vec<TypeTag>,
    pub args: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPayload {
    EntryFunction(EntryFunction),
}

/// Transaction body shared by every signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: TransactionPayload,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub chain_id: ChainId,
}

/// What is actually signed: the raw transaction plus the data binding it
/// to its secondary signers
#[derive(Debug, Clone, Serialize)]
enum RawTransactionWithData<'a> {
    MultiAgent {
        raw_txn: &'a RawTransaction,
        secondary_signer_addresses: &'a [AccountAddress],
    },
}

/// An unsigned transaction requiring the sender and every secondary signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiAgentTransaction {
    raw_txn: RawTransaction,
    secondary_signer_addresses: Vec<AccountAddress>,
}

impl MultiAgentTransaction {
    /// Only the builder creates these, after validating the call
    pub(crate) fn new(raw_txn: RawTransaction, secondary_signer_addresses: Vec<AccountAddress>) -> Self {
        Self {
            raw_txn,
            secondary_signer_addresses,
        }
    }

    pub fn raw_transaction(&self) -> &RawTransaction {
        &self.raw_txn
    }

    pub fn sender(&self) -> AccountAddress {
        self.raw_txn.sender
    }

    pub fn secondary_signer_addresses(&self) -> &[AccountAddress] {
        &self.secondary_signer_addresses
    }

    /// Sender first, then secondary signers in declared order
    pub fn required_signers(&self) -> Vec<AccountAddress> {
        std::iter::once(self.raw_txn.sender)
            .chain(self.secondary_signer_addresses.iter().copied())
            .collect()
    }

    pub fn entry_function(&self) -> &EntryFunction {
        match &self.raw_txn.payload {
            TransactionPayload::EntryFunction(entry) => entry,
        }
    }

    /// Bytes each signer signs: salt hash followed by the BCS encoding of
    /// the transaction and its secondary signers
    pub fn signing_message(&self) -> Result<Vec<u8>, bcs::Error> {
        let data = RawTransactionWithData::MultiAgent {
            raw_txn: &self.raw_txn,
            secondary_signer_addresses: &self.secondary_signer_addresses,
        };
        let mut message = domain_prefix(RAW_TRANSACTION_WITH_DATA_SALT);
        message.extend(bcs::to_bytes(&data)?);
        Ok(message)
    }

    /// Stable identifier of this unsigned transaction
    pub fn id(&self) -> Result<String, bcs::Error> {
        let message = self.signing_message()?;
        Ok(sha256_hex(&message)[..32].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(secondaries: Vec<AccountAddress>) -> MultiAgentTransaction {
        let module = ModuleId::new(AccountAddress::ONE, "pog").unwrap();
        let raw = RawTransaction {
            sender: AccountAddress::from_hex("0xa").unwrap(),
            sequence_number: 3,
            payload: TransactionPayload::EntryFunction(EntryFunction {
                module,
                function: "mint_player_nft".to_string(),
                ty_args: vec![],
                args: vec![vec![1]],
            }),
            max_gas_amount: 1000,
            gas_unit_price: 100,
            expiration_timestamp_secs: 1_700_000_000,
            chain_id: ChainId::TESTNET,
        };
        MultiAgentTransaction::new(raw, secondaries)
    }

    #[test]
    fn test_required_signers_order() {
        let user = AccountAddress::from_hex("0xb").unwrap();
        let txn = sample(vec![user]);
        assert_eq!(txn.required_signers(), vec![txn.sender(), user]);
        assert_eq!(txn.entry_function().function, "mint_player_nft");
    }

    #[test]
    fn test_signing_message_binds_secondary_signers() {
        let a = sample(vec![AccountAddress::from_hex("0xb").unwrap()]);
        let b = sample(vec![AccountAddress::from_hex("0xc").unwrap()]);

        let msg_a = a.signing_message().unwrap();
        assert!(msg_a.starts_with(&domain_prefix(RAW_TRANSACTION_WITH_DATA_SALT)));
        assert_ne!(msg_a, b.signing_message().unwrap());
        assert_eq!(msg_a, a.clone().signing_message().unwrap());
        assert_ne!(a.id().unwrap(), b.id().unwrap());
    }

    #[test]
    fn test_json_round_trip_keeps_signing_message() {
        let txn = sample(vec![AccountAddress::from_hex("0xb").unwrap()]);
        let json = serde_json::to_string(&txn).unwrap();
        let back: MultiAgentTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.signing_message().unwrap(), txn.signing_message().unwrap());
    }
}
