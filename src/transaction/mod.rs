//! Multi-agent transactions
//!
//! Build an unsigned transaction, have every required account sign it,
//! then combine the authenticators for submission.
//!
//! # Example
//!
//! ```ignore
//! use pog_client::transaction::{PendingMultiAgentTx, TransactionBuilder};
//!
//! let txn = TransactionBuilder::new()
//!     .sender(admin.address())
//!     .secondary_signer(user.address())
//!     .function(function_id)
//!     .arguments(args)
//!     .build(&registry)?;
//!
//! let mut pending = PendingMultiAgentTx::new(txn)?;
//! pending.sign_with(&admin)?;
//! pending.sign_with(&user)?;
//!
//! let signed = pending.finalize()?;
//! ```

pub mod authenticator;
pub mod builder;
pub mod pending;
pub mod raw;

pub use authenticator::{
    AccountAuthenticator, SignedTransaction, SignerError, TransactionAuthenticator,
};
pub use builder::{
    BuildError, TransactionBuilder, DEFAULT_EXPIRATION_SECS, DEFAULT_GAS_UNIT_PRICE,
    DEFAULT_MAX_GAS_AMOUNT,
};
pub use pending::{CollectError, CollectedSignature, PendingMultiAgentTx, PendingStatus};
pub use raw::{ChainId, EntryFunction, MultiAgentTransaction, RawTransaction, TransactionPayload};
