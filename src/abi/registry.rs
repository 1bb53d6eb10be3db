//! Known module ABIs, keyed by module id

use crate::abi::function::{AbiError, EntryFunctionAbi, ModuleAbi};
use crate::types::{EntryFunctionId, ModuleId};
use std::collections::HashMap;

/// ABIs the builder checks calls against
#[derive(Debug, Clone, Default)]
pub struct AbiRegistry {
    modules: HashMap<ModuleId, ModuleAbi>,
}

impl AbiRegistry {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Add or replace a module's ABI
    pub fn insert(&mut self, module: ModuleAbi) {
        log::debug!("Registered ABI for {}", module.id);
        self.modules.insert(module.id.clone(), module);
    }

    pub fn with_module(mut self, module: ModuleAbi) -> Self {
        self.insert(module);
        self
    }

    /// Look up a callable entry function
    pub fn entry_function(&self, id: &EntryFunctionId) -> Result<&EntryFunctionAbi, AbiError> {
        let module = self
            .modules
            .get(&id.module)
            .ok_or_else(|| AbiError::ModuleNotFound(id.module.to_string()))?;

        let function = module
            .function(&id.function)
            .ok_or_else(|| AbiError::FunctionNotFound(id.to_string()))?;

        if !function.is_entry {
            return Err(AbiError::NotEntryFunction(id.to_string()));
        }

        Ok(function)
    }
}
