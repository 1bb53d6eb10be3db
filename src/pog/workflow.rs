//! Mint workflow
//!
//! resolve signers -> build -> sign with each local key -> combine -> submit.
//! Any failure aborts the run; nothing is retried.

use crate::abi::{AbiError, AbiRegistry};
use crate::account::Account;
use crate::client::{ClientError, PendingTransaction, RestClient, Submitter};
use crate::config::{Config, ConfigError, SecretStore};
use crate::pog::mint::{self, PlayerMint};
use crate::transaction::{
    BuildError, ChainId, CollectError, PendingMultiAgentTx, SignedTransaction, TransactionBuilder,
};
use crate::types::IdentifierError;
use thiserror::Error;

/// Workflow errors
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid function id: {0}")]
    Identifier(#[from] IdentifierError),
    #[error("Build failed: {0}")]
    Build(#[from] BuildError),
    #[error("Signing failed: {0}")]
    Collect(#[from] CollectError),
    #[error("Network error: {0}")]
    Client(#[from] ClientError),
    #[error("Chain id of the {0} network must be fetched from a node")]
    UnknownChainId(String),
}

/// Chain state a transaction is built against
#[derive(Debug, Clone)]
pub struct ChainContext {
    pub sequence_number: u64,
    pub chain_id: ChainId,
    pub registry: AbiRegistry,
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum MintOutcome {
    /// Accepted by the node
    Submitted {
        pending: PendingTransaction,
        signed: SignedTransaction,
    },
    /// Fully signed, not sent
    DryRun(SignedTransaction),
    /// Some signer has no local key; the record must be co-signed elsewhere
    AwaitingSignatures(PendingMultiAgentTx),
}

/// Mints one player NFT as the admin, co-signed by the user
#[derive(Debug, Clone)]
pub struct MintWorkflow {
    admin: Account,
    user: Account,
    max_gas_amount: u64,
    gas_unit_price: u64,
    expiration_secs: u64,
}

impl MintWorkflow {
    pub fn new(config: &Config, admin: Account, user: Account) -> Self {
        Self {
            admin,
            user,
            max_gas_amount: config.transaction.max_gas_amount,
            gas_unit_price: config.transaction.gas_unit_price,
            expiration_secs: config.transaction.expiration_secs,
        }
    }

    /// Resolve both identities from the config
    pub fn from_config(config: &Config, secrets: &impl SecretStore) -> Result<Self, WorkflowError> {
        let admin = config.admin_account(secrets)?.with_label("admin");
        let user = config.user_account(secrets)?.with_label("user");
        log::info!("Resolved signers {} and {}", admin.display_name(), user.display_name());
        Ok(Self::new(config, admin, user))
    }

    pub fn admin(&self) -> &Account {
        &self.admin
    }

    pub fn user(&self) -> &Account {
        &self.user
    }

    /// Context for building without a node: bundled ABI, sequence number 0
    pub fn offline_context(&self, config: &Config) -> Result<ChainContext, WorkflowError> {
        let chain_id = config
            .network
            .chain_id()
            .ok_or_else(|| WorkflowError::UnknownChainId(config.network.to_string()))?;
        Ok(ChainContext {
            sequence_number: 0,
            chain_id,
            registry: AbiRegistry::new().with_module(mint::module_abi(self.admin.address())?),
        })
    }

    /// Fetch chain id, the admin's sequence number and the deployed ABI.
    ///
    /// Falls back to the bundled ABI when the module is not published at
    /// the admin address.
    pub async fn fetch_context(&self, client: &RestClient) -> Result<ChainContext, WorkflowError> {
        let ledger = client.ledger_info().await?;
        let account = client.account(self.admin.address()).await?;
        log::info!(
            "Chain {} at version {}, admin sequence number {}",
            ledger.chain_id,
            ledger.ledger_version,
            account.sequence_number
        );

        let module = mint::module_id(self.admin.address())?;
        let abi = match client.module_abi(&module).await {
            Ok(abi) => abi,
            Err(ClientError::Abi(AbiError::ModuleNotFound(_))) => {
                log::warn!("{} is not published, using the bundled ABI", module);
                mint::module_abi(self.admin.address())?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ChainContext {
            sequence_number: account.sequence_number,
            chain_id: ChainId(ledger.chain_id),
            registry: AbiRegistry::new().with_module(abi),
        })
    }

    /// Build the transaction and sign it with every local key
    pub fn prepare(
        &self,
        player: &PlayerMint,
        context: &ChainContext,
    ) -> Result<PendingMultiAgentTx, WorkflowError> {
        log::info!("Building {} for {}", mint::MINT_FUNCTION, player.username);
        let transaction = TransactionBuilder::new()
            .sender(self.admin.address())
            .secondary_signer(self.user.address())
            .function(mint::mint_function(self.admin.address())?)
            .arguments(player.arguments())
            .sequence_number(context.sequence_number)
            .chain_id(context.chain_id)
            .max_gas_amount(self.max_gas_amount)
            .gas_unit_price(self.gas_unit_price)
            .expires_in(self.expiration_secs)
            .build(&context.registry)?;

        let mut pending = PendingMultiAgentTx::new(transaction)?;
        for account in [&self.admin, &self.user] {
            if account.has_key() {
                log::info!("Signing as {}", account.display_name());
                pending.sign_with(account)?;
            } else {
                log::warn!("{} has no local key, leaving it to co-sign", account.display_name());
            }
        }
        Ok(pending)
    }

    /// Prepare, then submit once every signature is present
    pub async fn run<S: Submitter>(
        &self,
        player: &PlayerMint,
        context: &ChainContext,
        submitter: &S,
        dry_run: bool,
    ) -> Result<MintOutcome, WorkflowError> {
        let pending = self.prepare(player, context)?;
        if !pending.is_ready() {
            log::info!(
                "Transaction {} still needs {} signature(s)",
                pending.id,
                pending.missing_signers().len()
            );
            return Ok(MintOutcome::AwaitingSignatures(pending));
        }

        let signed = pending.finalize()?;
        if dry_run {
            log::info!("Dry run, not submitting {}", pending.id);
            return Ok(MintOutcome::DryRun(signed));
        }

        let receipt = submitter.submit(&signed).await?;
        log::info!("Submitted {}", receipt.hash);
        Ok(MintOutcome::Submitted {
            pending: receipt,
            signed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{EntryFunctionAbi, ModuleAbi};
    use crate::config::Network;
    use crate::types::MoveType;
    use std::sync::Mutex;

    /// Records submissions instead of sending them
    #[derive(Default)]
    struct RecordingSubmitter {
        submitted: Mutex<Vec<SignedTransaction>>,
    }

    impl Submitter for RecordingSubmitter {
        async fn submit(
            &self,
            transaction: &SignedTransaction,
        ) -> Result<PendingTransaction, ClientError> {
            let hash = transaction.hash()?;
            if let Ok(mut submitted) = self.submitted.lock() {
                submitted.push(transaction.clone());
            }
            Ok(PendingTransaction { hash })
        }
    }

    fn player() -> PlayerMint {
        PlayerMint::new("playerUsername05", "QmRa9FiP3uruiT5Q6r4n6dL8oUcUwVh4NUzEmcwE2mWFqY")
            .with_scores([1, 2, 3, 4, 5])
            .with_encrypted_scores(mint::ENCRYPTED_SCORE_LABELS.map(|l| format!("enc_{}", l)))
    }

    fn workflow(admin: Account, user: Account) -> (MintWorkflow, ChainContext) {
        let config = Config::for_network(Network::Testnet).unwrap();
        let workflow = MintWorkflow::new(&config, admin, user);
        let context = workflow.offline_context(&config).unwrap();
        (workflow, context)
    }

    #[test]
    fn test_prepare_signs_with_both_keys() {
        let (workflow, context) = workflow(Account::generate(), Account::generate());
        let pending = workflow.prepare(&player(), &context).unwrap();

        assert!(pending.is_ready());
        assert_eq!(pending.signature_count(), 2);
        assert_ne!(
            pending.signatures[0].authenticator,
            pending.signatures[1].authenticator
        );
        assert_eq!(pending.transaction.raw_transaction().chain_id, ChainId::TESTNET);
    }

    #[test]
    fn test_argument_three_must_be_string() {
        let (workflow, mut context) = workflow(Account::generate(), Account::generate());

        // Deployed variant declaring a string where the call passes a bool
        let mut params = vec![MoveType::Signer, MoveType::Signer];
        params.extend(std::iter::repeat(MoveType::String).take(3));
        params.extend(std::iter::repeat(MoveType::U64).take(5));
        params.extend(std::iter::repeat(MoveType::String).take(6));
        context.registry = AbiRegistry::new().with_module(ModuleAbi::new(
            mint::module_id(workflow.admin().address()).unwrap(),
            vec![EntryFunctionAbi::new(mint::MINT_FUNCTION, params)],
        ));

        let err = workflow.prepare(&player(), &context).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Build(BuildError::TypeMismatch { position: 3, .. })
        ));
        assert_eq!(
            err.to_string(),
            "Build failed: Type mismatch for argument 3, expected 'string'"
        );
    }

    #[tokio::test]
    async fn test_run_submits_when_fully_signed() {
        let (workflow, context) = workflow(Account::generate(), Account::generate());
        let submitter = RecordingSubmitter::default();

        let outcome = workflow
            .run(&player(), &context, &submitter, false)
            .await
            .unwrap();

        match outcome {
            MintOutcome::Submitted { pending, signed } => {
                assert_eq!(pending.hash, signed.hash().unwrap());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(submitter.submitted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_submit() {
        let (workflow, context) = workflow(Account::generate(), Account::generate());
        let submitter = RecordingSubmitter::default();

        let outcome = workflow
            .run(&player(), &context, &submitter, true)
            .await
            .unwrap();

        assert!(matches!(outcome, MintOutcome::DryRun(_)));
        assert!(submitter.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_address_only_user_leaves_pending_record() {
        let user = Account::generate();
        let (workflow, context) =
            workflow(Account::generate(), Account::address_only(user.address()));
        let submitter = RecordingSubmitter::default();

        let outcome = workflow
            .run(&player(), &context, &submitter, false)
            .await
            .unwrap();

        let MintOutcome::AwaitingSignatures(mut pending) = outcome else {
            panic!("expected a pending record");
        };
        assert_eq!(pending.missing_signers(), vec![user.address()]);
        assert!(submitter.submitted.lock().unwrap().is_empty());

        pending.sign_with(&user).unwrap();
        assert!(pending.finalize().is_ok());
    }

    #[test]
    fn test_devnet_needs_fetched_chain_id() {
        let config = Config::for_network(Network::Devnet).unwrap();
        let workflow = MintWorkflow::new(&config, Account::generate(), Account::generate());
        assert!(matches!(
            workflow.offline_context(&config),
            Err(WorkflowError::UnknownChainId(_))
        ));
    }

    #[test]
    fn test_out_of_range_expiry_from_config() {
        let config =
            Config::from_yaml("transaction:\n  expiration_secs: 18446744073709551615\n").unwrap();
        let workflow = MintWorkflow::new(&config, Account::generate(), Account::generate());
        let context = workflow.offline_context(&config).unwrap();

        let err = workflow.prepare(&player(), &context).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Build(BuildError::InvalidExpiration(u64::MAX))
        ));
    }
}
