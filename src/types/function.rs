//! Module and entry function identifiers

use crate::types::address::{AccountAddress, AddressError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Expected <address>::<module>::<function>, got '{0}'")]
    Malformed(String),
    #[error("Invalid identifier '{0}'")]
    InvalidName(String),
    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),
}

/// Move identifiers: ASCII letters, digits and underscores, not starting
/// with a digit
fn check_name(name: &str) -> Result<(), IdentifierError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(IdentifierError::InvalidName(name.to_string()))
    }
}

/// A published module, `address::name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId {
    pub address: AccountAddress,
    pub name: String,
}

impl ModuleId {
    pub fn new(address: AccountAddress, name: &str) -> Result<Self, IdentifierError> {
        check_name(name)?;
        Ok(Self {
            address,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.address, self.name)
    }
}

/// A fully qualified entry function, `address::module::function`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryFunctionId {
    pub module: ModuleId,
    pub function: String,
}

impl EntryFunctionId {
    pub fn new(module: ModuleId, function: &str) -> Result<Self, IdentifierError> {
        check_name(function)?;
        Ok(Self {
            module,
            function: function.to_string(),
        })
    }
}

impl FromStr for EntryFunctionId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split("::").collect();
        if parts.len() != 3 {
            return Err(IdentifierError::Malformed(s.to_string()));
        }
        let address = AccountAddress::from_hex(parts[0])?;
        let module = ModuleId::new(address, parts[1])?;
        Self::new(module, parts[2])
    }
}

impl fmt::Display for EntryFunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_function() {
        let id: EntryFunctionId = "0x7bb9::pog::mint_player_nft".parse().unwrap();
        assert_eq!(id.module.name, "pog");
        assert_eq!(id.function, "mint_player_nft");
        assert_eq!(id.module.address, AccountAddress::from_hex("0x7bb9").unwrap());
        assert!(id.to_string().ends_with("::pog::mint_player_nft"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            "pog::mint".parse::<EntryFunctionId>(),
            Err(IdentifierError::Malformed(_))
        ));
        assert!(matches!(
            "0x1::pog::9mint".parse::<EntryFunctionId>(),
            Err(IdentifierError::InvalidName(_))
        ));
        assert!(matches!(
            "0xzz::pog::mint".parse::<EntryFunctionId>(),
            Err(IdentifierError::Address(_))
        ));
    }
}
