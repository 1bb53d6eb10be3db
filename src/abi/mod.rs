//! Entry function ABIs
//!
//! The builder refuses any call whose arguments do not line up with the
//! target function's declared parameters. ABIs come from a bundled
//! definition or from the node.

pub mod function;
pub mod registry;

pub use function::{AbiError, EntryFunctionAbi, ModuleAbi};
pub use registry::AbiRegistry;
