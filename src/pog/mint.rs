//! `pog::mint_player_nft` call data

use crate::abi::{EntryFunctionAbi, ModuleAbi};
use crate::types::{AccountAddress, EntryFunctionId, IdentifierError, ModuleId, MoveType, MoveValue};
use serde::{Deserialize, Serialize};

/// Module name of the player NFT contract
pub const POG_MODULE: &str = "pog";

/// Entry function minting one player NFT
pub const MINT_FUNCTION: &str = "mint_player_nft";

/// Number of plain score arguments
pub const SCORE_COUNT: usize = 5;

/// Labels of the encrypted score arguments, in call order
pub const ENCRYPTED_SCORE_LABELS: [&str; 6] = ["poh", "pop", "posk", "poc", "pos", "pog"];

/// Arguments of one `mint_player_nft` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMint {
    pub username: String,
    /// Content id of the player's metadata, usually an IPFS CID
    pub content_id: String,
    pub flag: bool,
    pub scores: [u64; SCORE_COUNT],
    pub encrypted_scores: [String; 6],
}

impl PlayerMint {
    pub fn new(username: &str, content_id: &str) -> Self {
        Self {
            username: username.to_string(),
            content_id: content_id.to_string(),
            flag: true,
            scores: [0; SCORE_COUNT],
            encrypted_scores: Default::default(),
        }
    }

    pub fn with_flag(mut self, flag: bool) -> Self {
        self.flag = flag;
        self
    }

    pub fn with_scores(mut self, scores: [u64; SCORE_COUNT]) -> Self {
        self.scores = scores;
        self
    }

    pub fn with_encrypted_scores(mut self, encrypted_scores: [String; 6]) -> Self {
        self.encrypted_scores = encrypted_scores;
        self
    }

    /// Positional arguments in declared order
    pub fn arguments(&self) -> Vec<MoveValue> {
        let mut args = vec![
            MoveValue::string(&self.username),
            MoveValue::string(&self.content_id),
            MoveValue::Bool(self.flag),
        ];
        args.extend(self.scores.iter().map(|s| MoveValue::U64(*s)));
        args.extend(self.encrypted_scores.iter().map(MoveValue::string));
        args
    }
}

/// `<admin>::pog`
pub fn module_id(admin: AccountAddress) -> Result<ModuleId, IdentifierError> {
    ModuleId::new(admin, POG_MODULE)
}

/// `<admin>::pog::mint_player_nft`
pub fn mint_function(admin: AccountAddress) -> Result<EntryFunctionId, IdentifierError> {
    EntryFunctionId::new(module_id(admin)?, MINT_FUNCTION)
}

/// ABI of the bundled `pog` module, used when the on-chain ABI is not fetched
pub fn module_abi(admin: AccountAddress) -> Result<ModuleAbi, IdentifierError> {
    let mut params = vec![
        MoveType::Signer,
        MoveType::Signer,
        MoveType::String,
        MoveType::String,
        MoveType::Bool,
    ];
    params.extend(std::iter::repeat(MoveType::U64).take(SCORE_COUNT));
    params.extend(std::iter::repeat(MoveType::String).take(ENCRYPTED_SCORE_LABELS.len()));

    Ok(ModuleAbi::new(
        module_id(admin)?,
        vec![EntryFunctionAbi::new(MINT_FUNCTION, params)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PlayerMint {
        PlayerMint::new("playerUsername05", "QmRa9FiP3uruiT5Q6r4n6dL8oUcUwVh4NUzEmcwE2mWFqY")
            .with_scores([1, 2, 3, 4, 5])
            .with_encrypted_scores(
                ENCRYPTED_SCORE_LABELS.map(|label| format!("encrypted_{}_score", label)),
            )
    }

    #[test]
    fn test_arguments_in_declared_order() {
        let args = sample().arguments();
        assert_eq!(args.len(), 14);
        assert_eq!(args[0], MoveValue::string("playerUsername05"));
        assert_eq!(args[2], MoveValue::Bool(true));
        assert_eq!(args[3], MoveValue::U64(1));
        assert_eq!(args[7], MoveValue::U64(5));
        assert_eq!(args[8], MoveValue::string("encrypted_poh_score"));
        assert_eq!(args[13], MoveValue::string("encrypted_pog_score"));
    }

    #[test]
    fn test_bundled_abi_matches_arguments() {
        let admin = AccountAddress::from_hex("0x7b").unwrap();
        let abi = module_abi(admin).unwrap();
        let function = abi.function(MINT_FUNCTION).unwrap();

        assert_eq!(function.signer_count(), 2);
        let declared = function.argument_types();
        let args = sample().arguments();
        assert_eq!(declared.len(), args.len());
        assert!(args.iter().zip(declared).all(|(v, t)| v.matches(t)));
    }

    #[test]
    fn test_mint_function_id() {
        let admin = AccountAddress::ONE;
        let id = mint_function(admin).unwrap();
        assert_eq!(id.function, "mint_player_nft");
        assert!(id.to_string().ends_with("::pog::mint_player_nft"));
    }
}
