//! Module ABIs
//!
//! Declared parameter types of a module's exposed functions, either written
//! by hand or read from the node's module endpoint.

use crate::types::{AccountAddress, ModuleId, MoveType, ValueError};
use serde::Deserialize;
use thiserror::Error;

/// ABI lookup and parsing errors
#[derive(Error, Debug)]
pub enum AbiError {
    #[error("Module not found: {0}")]
    ModuleNotFound(String),
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
    #[error("Function {0} is not an entry function")]
    NotEntryFunction(String),
    #[error("Invalid parameter type in {function}: {source}")]
    InvalidType {
        function: String,
        #[source]
        source: ValueError,
    },
    #[error("Module response has no ABI")]
    MissingAbi,
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Declared signature of one exposed function
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFunctionAbi {
    pub name: String,
    pub is_entry: bool,
    pub generic_type_params: usize,
    /// All declared parameters, signers included
    pub params: Vec<MoveType>,
}

impl EntryFunctionAbi {
    pub fn new(name: &str, params: Vec<MoveType>) -> Self {
        Self {
            name: name.to_string(),
            is_entry: true,
            generic_type_params: 0,
            params,
        }
    }

    /// Parameter types the caller must supply, i.e. everything after the
    /// leading signer parameters
    pub fn argument_types(&self) -> &[MoveType] {
        let signers = self.params.iter().take_while(|p| p.is_signer()).count();
        &self.params[signers..]
    }

    /// Number of signer parameters the function expects
    pub fn signer_count(&self) -> usize {
        self.params.iter().take_while(|p| p.is_signer()).count()
    }
}

/// ABI of one published module
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleAbi {
    pub id: ModuleId,
    pub functions: Vec<EntryFunctionAbi>,
}

impl ModuleAbi {
    pub fn new(id: ModuleId, functions: Vec<EntryFunctionAbi>) -> Self {
        Self { id, functions }
    }

    pub fn function(&self, name: &str) -> Option<&EntryFunctionAbi> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Parse the JSON returned by `GET /v1/accounts/{address}/module/{name}`
    pub fn from_json(body: &str) -> Result<Self, AbiError> {
        let response: ModuleResponse = serde_json::from_str(body)?;
        let abi = response.abi.ok_or(AbiError::MissingAbi)?;
        abi.try_into()
    }
}

#[derive(Deserialize)]
struct ModuleResponse {
    abi: Option<RawModuleAbi>,
}

#[derive(Deserialize)]
struct RawModuleAbi {
    address: AccountAddress,
    name: String,
    #[serde(default)]
    exposed_functions: Vec<RawFunctionAbi>,
}

#[derive(Deserialize)]
struct RawFunctionAbi {
    name: String,
    #[serde(default)]
    is_entry: bool,
    #[serde(default)]
    generic_type_params: Vec<serde_json::Value>,
    params: Vec<String>,
}

impl TryFrom<RawModuleAbi> for ModuleAbi {
    type Error = AbiError;

    fn try_from(raw: RawModuleAbi) -> Result<Self, Self::Error> {
        let id = ModuleId {
            address: raw.address,
            name: raw.name,
        };

        let functions = raw
            .exposed_functions
            .into_iter()
            .map(|f| {
                let params = f
                    .params
                    .iter()
                    .map(|p| MoveType::parse(p))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|source| AbiError::InvalidType {
                        function: f.name.clone(),
                        source,
                    })?;
                Ok(EntryFunctionAbi {
                    name: f.name,
                    is_entry: f.is_entry,
                    generic_type_params: f.generic_type_params.len(),
                    params,
                })
            })
            .collect::<Result<Vec<_>, AbiError>>()?;

        Ok(Self { id, functions })
    }
}
