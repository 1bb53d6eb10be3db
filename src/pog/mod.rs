//! Player NFT minting
//!
//! Call data for `<admin>::pog::mint_player_nft` and the workflow that
//! builds, co-signs and submits it.

pub mod mint;
pub mod workflow;

pub use mint::{
    mint_function, module_abi, module_id, PlayerMint, ENCRYPTED_SCORE_LABELS, MINT_FUNCTION,
    POG_MODULE, SCORE_COUNT,
};
pub use workflow::{ChainContext, MintOutcome, MintWorkflow, WorkflowError};
