//! Multi-agent transaction builder
//!
//! Checks a call against the target function's ABI and produces an
//! unsigned `MultiAgentTransaction`. A failed build yields no transaction;
//! there are no retries, a bad argument list is the caller's bug.

use crate::abi::{AbiError, AbiRegistry};
use crate::transaction::raw::{
    ChainId, EntryFunction, MultiAgentTransaction, RawTransaction, TransactionPayload,
};
use crate::types::{AccountAddress, EntryFunctionId, MoveType, MoveValue, TypeTag, ValueError};
use chrono::Utc;
use thiserror::Error;

/// Default gas limit
pub const DEFAULT_MAX_GAS_AMOUNT: u64 = 200_000;

/// Default price per gas unit
pub const DEFAULT_GAS_UNIT_PRICE: u64 = 100;

/// Default lifetime of a transaction before the chain rejects it
pub const DEFAULT_EXPIRATION_SECS: u64 = 600;

/// Build errors
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("No sender set")]
    MissingSender,
    #[error("No entry function set")]
    MissingFunction,
    #[error("ABI error: {0}")]
    AbiError(#[from] AbiError),
    #[error("Expected {expected} type arguments, got {got}")]
    TypeArgumentCount { expected: usize, got: usize },
    #[error("Expected {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },
    #[error("Type mismatch for argument {position}, expected '{expected}'")]
    TypeMismatch { position: usize, expected: String },
    #[error("Function takes {expected} signers, transaction has {got}")]
    SignerCount { expected: usize, got: usize },
    #[error("Signer {0} listed more than once")]
    DuplicateSigner(AccountAddress),
    #[error("Encoding error: {0}")]
    EncodingError(#[from] ValueError),
    #[error("Expiration {0}s from now is out of range")]
    InvalidExpiration(u64),
}

/// Builder for multi-agent entry function transactions
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    sender: Option<AccountAddress>,
    secondary_signers: Vec<AccountAddress>,
    function: Option<EntryFunctionId>,
    type_args: Vec<TypeTag>,
    args: Vec<MoveValue>,
    sequence_number: u64,
    max_gas_amount: u64,
    gas_unit_price: u64,
    expiration_timestamp_secs: Option<u64>,
    expiration_secs: u64,
    chain_id: ChainId,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            sender: None,
            secondary_signers: Vec::new(),
            function: None,
            type_args: Vec::new(),
            args: Vec::new(),
            sequence_number: 0,
            max_gas_amount: DEFAULT_MAX_GAS_AMOUNT,
            gas_unit_price: DEFAULT_GAS_UNIT_PRICE,
            expiration_timestamp_secs: None,
            expiration_secs: DEFAULT_EXPIRATION_SECS,
            chain_id: ChainId::TESTNET,
        }
    }

    pub fn sender(mut self, sender: AccountAddress) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Add a secondary signer; order is kept
    pub fn secondary_signer(mut self, signer: AccountAddress) -> Self {
        self.secondary_signers.push(signer);
        self
    }

    pub fn secondary_signers(mut self, signers: impl IntoIterator<Item = AccountAddress>) -> Self {
        self.secondary_signers.extend(signers);
        self
    }

    pub fn function(mut self, function: EntryFunctionId) -> Self {
        self.function = Some(function);
        self
    }

    pub fn type_arg(mut self, tag: TypeTag) -> Self {
        self.type_args.push(tag);
        self
    }

    /// Add the next positional argument
    pub fn argument(mut self, value: impl Into<MoveValue>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn arguments(mut self, values: impl IntoIterator<Item = MoveValue>) -> Self {
        self.args.extend(values);
        self
    }

    pub fn sequence_number(mut self, sequence_number: u64) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    pub fn max_gas_amount(mut self, max_gas_amount: u64) -> Self {
        self.max_gas_amount = max_gas_amount;
        self
    }

    pub fn gas_unit_price(mut self, gas_unit_price: u64) -> Self {
        self.gas_unit_price = gas_unit_price;
        self
    }

    /// Absolute expiry; overrides the relative one
    pub fn expiration_timestamp_secs(mut self, timestamp: u64) -> Self {
        self.expiration_timestamp_secs = Some(timestamp);
        self
    }

    /// Expiry relative to build time
    pub fn expires_in(mut self, secs: u64) -> Self {
        self.expiration_secs = secs;
        self
    }

    pub fn chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Validate the call against the function's ABI and build the
    /// unsigned transaction
    pub fn build(self, registry: &AbiRegistry) -> Result<MultiAgentTransaction, BuildError> {
        let sender = self.sender.ok_or(BuildError::MissingSender)?;
        let function = self.function.ok_or(BuildError::MissingFunction)?;
        let abi = registry.entry_function(&function)?;

        if self.type_args.len() != abi.generic_type_params {
            return Err(BuildError::TypeArgumentCount {
                expected: abi.generic_type_params,
                got: self.type_args.len(),
            });
        }

        let declared = abi.argument_types();
        if self.args.len() != declared.len() {
            return Err(BuildError::ArgumentCount {
                expected: declared.len(),
                got: self.args.len(),
            });
        }

        for (idx, (value, ty)) in self.args.iter().zip(declared).enumerate() {
            let ty = substitute(ty, &self.type_args);
            if !value.matches(&ty) {
                log::debug!(
                    "Argument {} of {} is {}, declared {}",
                    idx + 1,
                    function,
                    value.type_name(),
                    ty
                );
                return Err(BuildError::TypeMismatch {
                    position: idx + 1,
                    expected: ty.name(),
                });
            }
        }

        let mut seen = vec![sender];
        for signer in &self.secondary_signers {
            if seen.contains(signer) {
                return Err(BuildError::DuplicateSigner(*signer));
            }
            seen.push(*signer);
        }

        let signers = abi.signer_count();
        if signers > 0 && signers != seen.len() {
            return Err(BuildError::SignerCount {
                expected: signers,
                got: seen.len(),
            });
        }

        let args = self
            .args
            .iter()
            .map(MoveValue::to_bcs)
            .collect::<Result<Vec<_>, _>>()?;

        let expiration_timestamp_secs = match self.expiration_timestamp_secs {
            Some(timestamp) => timestamp,
            None => {
                let now = Utc::now().timestamp().max(0) as u64;
                now.checked_add(self.expiration_secs)
                    .ok_or(BuildError::InvalidExpiration(self.expiration_secs))?
            }
        };

        let raw_txn = RawTransaction {
            sender,
            sequence_number: self.sequence_number,
            payload: TransactionPayload::EntryFunction(EntryFunction {
                module: function.module.clone(),
                function: function.function.clone(),
                ty_args: self.type_args,
                args,
            }),
            max_gas_amount: self.max_gas_amount,
            gas_unit_price: self.gas_unit_price,
            expiration_timestamp_secs,
            chain_id: self.chain_id,
        };

        log::info!(
            "Built {} from {} with {} secondary signer(s)",
            function,
            sender,
            self.secondary_signers.len()
        );

        Ok(MultiAgentTransaction::new(raw_txn, self.secondary_signers))
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace generic parameters with the supplied type arguments
fn substitute(ty: &MoveType, type_args: &[TypeTag]) -> MoveType {
    match ty {
        MoveType::Generic(idx) => type_args
            .get(*idx as usize)
            .map(MoveType::from)
            .unwrap_or_else(|| ty.clone()),
        MoveType::Vector(inner) => MoveType::Vector(Box::new(substitute(inner, type_args))),
        MoveType::Option(inner) => MoveType::Option(Box::new(substitute(inner, type_args))),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{EntryFunctionAbi, ModuleAbi};
    use crate::types::ModuleId;

    fn admin() -> AccountAddress {
        AccountAddress::from_hex("0x7bb9").unwrap()
    }

    fn user() -> AccountAddress {
        AccountAddress::from_hex("0x2a0a").unwrap()
    }

    fn registry(params: Vec<MoveType>) -> AbiRegistry {
        let module = ModuleId::new(admin(), "game").unwrap();
        let mut generic = EntryFunctionAbi::new(
            "deposit",
            vec![MoveType::Signer, MoveType::Generic(0)],
        );
        generic.generic_type_params = 1;
        AbiRegistry::new().with_module(ModuleAbi::new(
            module,
            vec![EntryFunctionAbi::new("play", params), generic],
        ))
    }

    fn play() -> EntryFunctionId {
        format!("{}::game::play", admin()).parse().unwrap()
    }

    #[test]
    fn test_well_typed_call_builds() {
        let registry = registry(vec![
            MoveType::Signer,
            MoveType::Signer,
            MoveType::String,
            MoveType::Bool,
            MoveType::U64,
        ]);

        let txn = TransactionBuilder::new()
            .sender(admin())
            .secondary_signer(user())
            .function(play())
            .argument("name")
            .argument(true)
            .argument(7u64)
            .sequence_number(9)
            .chain_id(ChainId::LOCAL)
            .expiration_timestamp_secs(1_000)
            .build(&registry)
            .unwrap();

        assert_eq!(txn.sender(), admin());
        assert_eq!(txn.secondary_signer_addresses(), &[user()]);
        let raw = txn.raw_transaction();
        assert_eq!(raw.sequence_number, 9);
        assert_eq!(raw.chain_id, ChainId::LOCAL);
        assert_eq!(raw.expiration_timestamp_secs, 1_000);
        assert_eq!(raw.max_gas_amount, DEFAULT_MAX_GAS_AMOUNT);
        assert_eq!(txn.entry_function().args.len(), 3);
        assert_eq!(txn.entry_function().args[1], vec![1]);
    }

    #[test]
    fn test_type_mismatch_reports_position_and_type() {
        let registry = registry(vec![MoveType::String, MoveType::String, MoveType::String]);

        let err = TransactionBuilder::new()
            .sender(admin())
            .secondary_signer(user())
            .function(play())
            .argument("a")
            .argument("b")
            .argument(true)
            .build(&registry)
            .unwrap_err();

        match &err {
            BuildError::TypeMismatch { position, expected } => {
                assert_eq!(*position, 3);
                assert_eq!(expected, "string");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(err.to_string(), "Type mismatch for argument 3, expected 'string'");
    }

    #[test]
    fn test_first_mismatch_wins() {
        let registry = registry(vec![MoveType::U8, MoveType::Bool]);
        let err = TransactionBuilder::new()
            .sender(admin())
            .function(play())
            .argument(1u64)
            .argument(1u64)
            .build(&registry)
            .unwrap_err();
        assert!(matches!(err, BuildError::TypeMismatch { position: 1, .. }));
    }

    #[test]
    fn test_arity_checked() {
        let registry = registry(vec![MoveType::String, MoveType::Bool]);
        let err = TransactionBuilder::new()
            .sender(admin())
            .function(play())
            .argument("only one")
            .build(&registry)
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::ArgumentCount {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_missing_parts() {
        let registry = registry(vec![]);
        assert!(matches!(
            TransactionBuilder::new().function(play()).build(&registry),
            Err(BuildError::MissingSender)
        ));
        assert!(matches!(
            TransactionBuilder::new().sender(admin()).build(&registry),
            Err(BuildError::MissingFunction)
        ));
        let unknown = format!("{}::game::nope", admin()).parse().unwrap();
        assert!(matches!(
            TransactionBuilder::new()
                .sender(admin())
                .function(unknown)
                .build(&registry),
            Err(BuildError::AbiError(AbiError::FunctionNotFound(_)))
        ));
    }

    #[test]
    fn test_signer_checks() {
        let registry = registry(vec![MoveType::Signer, MoveType::Signer]);

        let duplicate = TransactionBuilder::new()
            .sender(admin())
            .secondary_signer(admin())
            .function(play())
            .build(&registry);
        assert!(matches!(duplicate, Err(BuildError::DuplicateSigner(_))));

        let too_few = TransactionBuilder::new()
            .sender(admin())
            .function(play())
            .build(&registry);
        assert!(matches!(
            too_few,
            Err(BuildError::SignerCount {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_generic_arguments_follow_type_args() {
        let registry = registry(vec![]);
        let deposit: EntryFunctionId = format!("{}::game::deposit", admin()).parse().unwrap();

        let missing_tag = TransactionBuilder::new()
            .sender(admin())
            .function(deposit.clone())
            .argument(5u64)
            .build(&registry);
        assert!(matches!(
            missing_tag,
            Err(BuildError::TypeArgumentCount {
                expected: 1,
                got: 0
            })
        ));

        let ok = TransactionBuilder::new()
            .sender(admin())
            .function(deposit.clone())
            .type_arg(TypeTag::U64)
            .argument(5u64)
            .build(&registry);
        assert!(ok.is_ok());

        let wrong = TransactionBuilder::new()
            .sender(admin())
            .function(deposit)
            .type_arg(TypeTag::Bool)
            .argument(5u64)
            .build(&registry);
        assert!(matches!(wrong, Err(BuildError::TypeMismatch { position: 1, .. })));
    }

    #[test]
    fn test_relative_expiry() {
        let registry = registry(vec![]);
        let now = Utc::now().timestamp() as u64;
        let txn = TransactionBuilder::new()
            .sender(admin())
            .function(play())
            .expires_in(60)
            .build(&registry)
            .unwrap();
        let expiry = txn.raw_transaction().expiration_timestamp_secs;
        assert!(expiry >= now + 60 && expiry <= now + 120);
    }

    #[test]
    fn test_expiry_overflow_is_rejected() {
        let registry = registry(vec![]);
        let result = TransactionBuilder::new()
            .sender(admin())
            .function(play())
            .expires_in(u64::MAX)
            .build(&registry);
        assert!(matches!(result, Err(BuildError::InvalidExpiration(u64::MAX))));
    }
}
