//! Core chain types
//!
//! Addresses, module and function identifiers, and the typed values passed
//! as entry function arguments.

pub mod address;
pub mod function;
pub mod tag;
pub mod value;

pub use address::{AccountAddress, AddressError};
pub use function::{EntryFunctionId, IdentifierError, ModuleId};
pub use tag::{StructTag, TypeTag};
pub use value::{MoveType, MoveValue, ValueError};
