//! Move types and typed argument values
//!
//! `MoveType` is what an entry function declares for each parameter,
//! `MoveValue` is what a caller supplies. The builder checks one against
//! the other position by position before anything is encoded.

use crate::types::address::AccountAddress;
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors when parsing types or encoding values
#[derive(Error, Debug)]
pub enum ValueError {
    #[error("Unknown type: {0}")]
    UnknownType(String),
    #[error("Encoding error: {0}")]
    Encoding(#[from] bcs::Error),
}

/// A parameter type as declared by a Move function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Address,
    Signer,
    /// `0x1::string::String`
    String,
    Vector(Box<MoveType>),
    /// `0x1::object::Object<T>`, passed as the object's address
    Object(String),
    /// `0x1::option::Option<T>`
    Option(Box<MoveType>),
    /// Generic type parameter `T{n}`
    Generic(u16),
    /// Any other struct; never a valid argument
    Struct(String),
}

impl MoveType {
    /// Short name used in error messages, e.g. `string` or `vector<u8>`
    pub fn name(&self) -> String {
        match self {
            MoveType::Bool => "bool".to_string(),
            MoveType::U8 => "u8".to_string(),
            MoveType::U16 => "u16".to_string(),
            MoveType::U32 => "u32".to_string(),
            MoveType::U64 => "u64".to_string(),
            MoveType::U128 => "u128".to_string(),
            MoveType::U256 => "u256".to_string(),
            MoveType::Address => "address".to_string(),
            MoveType::Signer => "signer".to_string(),
            MoveType::String => "string".to_string(),
            MoveType::Vector(inner) => format!("vector<{}>", inner.name()),
            MoveType::Object(_) => "object".to_string(),
            MoveType::Option(inner) => format!("option<{}>", inner.name()),
            MoveType::Generic(idx) => format!("T{}", idx),
            MoveType::Struct(tag) => tag.clone(),
        }
    }

    /// `signer` and `&signer` parameters are filled by the transaction's
    /// signers, not by arguments
    pub fn is_signer(&self) -> bool {
        matches!(self, MoveType::Signer)
    }

    /// Parse a type as written in a module ABI
    pub fn parse(input: &str) -> Result<Self, ValueError> {
        let s = input.trim();
        let s = s
            .strip_prefix("&mut ")
            .or_else(|| s.strip_prefix('&'))
            .unwrap_or(s)
            .trim();

        let ty = match s {
            "bool" => MoveType::Bool,
            "u8" => MoveType::U8,
            "u16" => MoveType::U16,
            "u32" => MoveType::U32,
            "u64" => MoveType::U64,
            "u128" => MoveType::U128,
            "u256" => MoveType::U256,
            "address" => MoveType::Address,
            "signer" => MoveType::Signer,
            _ => {
                if let Some(inner) = generic_body(s, "vector") {
                    MoveType::Vector(Box::new(MoveType::parse(inner)?))
                } else if let Some(idx) = s.strip_prefix('T').and_then(|n| n.parse().ok()) {
                    MoveType::Generic(idx)
                } else if s.contains("::") {
                    parse_struct(s)?
                } else {
                    return Err(ValueError::UnknownType(input.to_string()));
                }
            }
        };

        Ok(ty)
    }
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for MoveType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `name<body>` -> `body`
fn generic_body<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    s.strip_prefix(name)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
}

fn parse_struct(s: &str) -> Result<MoveType, ValueError> {
    let (base, type_arg) = match s.find('<') {
        Some(idx) => {
            let body = s[idx + 1..]
                .strip_suffix('>')
                .ok_or_else(|| ValueError::UnknownType(s.to_string()))?;
            (&s[..idx], Some(body))
        }
        None => (s, None),
    };

    let parts: Vec<&str> = base.split("::").collect();
    if parts.len() != 3 {
        return Err(ValueError::UnknownType(s.to_string()));
    }
    let address =
        AccountAddress::from_hex(parts[0]).map_err(|_| ValueError::UnknownType(s.to_string()))?;
    let framework = address == AccountAddress::ONE;

    let ty = match (framework, parts[1], parts[2], type_arg) {
        (true, "string", "String", None) => MoveType::String,
        (true, "object", "Object", Some(inner)) => MoveType::Object(inner.trim().to_string()),
        (true, "option", "Option", Some(inner)) => {
            MoveType::Option(Box::new(MoveType::parse(inner)?))
        }
        _ => MoveType::Struct(s.to_string()),
    };
    Ok(ty)
}

/// A typed argument value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    /// Little-endian bytes
    U256([u8; 32]),
    Address(AccountAddress),
    String(String),
    Vector(Vec<MoveValue>),
    Option(Option<Box<MoveValue>>),
}

impl MoveValue {
    pub fn string(value: impl Into<String>) -> Self {
        MoveValue::String(value.into())
    }

    /// Name of the value's own type, for diagnostics
    pub fn type_name(&self) -> String {
        match self {
            MoveValue::Bool(_) => "bool".to_string(),
            MoveValue::U8(_) => "u8".to_string(),
            MoveValue::U16(_) => "u16".to_string(),
            MoveValue::U32(_) => "u32".to_string(),
            MoveValue::U64(_) => "u64".to_string(),
            MoveValue::U128(_) => "u128".to_string(),
            MoveValue::U256(_) => "u256".to_string(),
            MoveValue::Address(_) => "address".to_string(),
            MoveValue::String(_) => "string".to_string(),
            MoveValue::Vector(items) => match items.first() {
                Some(first) => format!("vector<{}>", first.type_name()),
                None => "vector".to_string(),
            },
            MoveValue::Option(_) => "option".to_string(),
        }
    }

    /// Whether this value can be passed where `ty` is declared
    pub fn matches(&self, ty: &MoveType) -> bool {
        match (self, ty) {
            (MoveValue::Bool(_), MoveType::Bool)
            | (MoveValue::U8(_), MoveType::U8)
            | (MoveValue::U16(_), MoveType::U16)
            | (MoveValue::U32(_), MoveType::U32)
            | (MoveValue::U64(_), MoveType::U64)
            | (MoveValue::U128(_), MoveType::U128)
            | (MoveValue::U256(_), MoveType::U256)
            | (MoveValue::Address(_), MoveType::Address)
            | (MoveValue::Address(_), MoveType::Object(_))
            | (MoveValue::String(_), MoveType::String) => true,
            (MoveValue::Vector(items), MoveType::Vector(inner)) => {
                items.iter().all(|item| item.matches(inner))
            }
            (MoveValue::Option(None), MoveType::Option(_)) => true,
            (MoveValue::Option(Some(value)), MoveType::Option(inner)) => value.matches(inner),
            _ => false,
        }
    }

    /// BCS encoding of the bare value, as carried in an entry function payload
    pub fn to_bcs(&self) -> Result<Vec<u8>, ValueError> {
        Ok(bcs::to_bytes(self)?)
    }
}

impl Serialize for MoveValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MoveValue::Bool(v) => serializer.serialize_bool(*v),
            MoveValue::U8(v) => serializer.serialize_u8(*v),
            MoveValue::U16(v) => serializer.serialize_u16(*v),
            MoveValue::U32(v) => serializer.serialize_u32(*v),
            MoveValue::U64(v) => serializer.serialize_u64(*v),
            MoveValue::U128(v) => serializer.serialize_u128(*v),
            MoveValue::U256(bytes) => {
                if serializer.is_human_readable() {
                    let mut big_endian = *bytes;
                    big_endian.reverse();
                    serializer.serialize_str(&format!("0x{}", hex::encode(big_endian)))
                } else {
                    bytes.serialize(serializer)
                }
            }
            MoveValue::Address(addr) => addr.serialize(serializer),
            MoveValue::String(s) => serializer.serialize_str(s),
            MoveValue::Vector(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            // Move options are vectors of length 0 or 1
            MoveValue::Option(inner) => {
                let len = usize::from(inner.is_some());
                let mut seq = serializer.serialize_seq(Some(len))?;
                if let Some(value) = inner {
                    seq.serialize_element(value.as_ref())?;
                }
                seq.end()
            }
        }
    }
}

impl From<bool> for MoveValue {
    fn from(value: bool) -> Self {
        MoveValue::Bool(value)
    }
}

impl From<u64> for MoveValue {
    fn from(value: u64) -> Self {
        MoveValue::U64(value)
    }
}

impl From<&str> for MoveValue {
    fn from(value: &str) -> Self {
        MoveValue::String(value.to_string())
    }
}

impl From<String> for MoveValue {
    fn from(value: String) -> Self {
        MoveValue::String(value)
    }
}

impl From<AccountAddress> for MoveValue {
    fn from(value: AccountAddress) -> Self {
        MoveValue::Address(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_abi_types() {
        assert_eq!(MoveType::parse("&signer").unwrap(), MoveType::Signer);
        assert_eq!(MoveType::parse("u64").unwrap(), MoveType::U64);
        assert_eq!(
            MoveType::parse("0x1::string::String").unwrap(),
            MoveType::String
        );
        assert_eq!(
            MoveType::parse(&format!("0x{}::string::String", "0".repeat(63) + "1")).unwrap(),
            MoveType::String
        );
        assert_eq!(
            MoveType::parse("vector<vector<u8>>").unwrap(),
            MoveType::Vector(Box::new(MoveType::Vector(Box::new(MoveType::U8))))
        );
        assert_eq!(
            MoveType::parse("0x1::option::Option<u64>").unwrap(),
            MoveType::Option(Box::new(MoveType::U64))
        );
        assert!(matches!(
            MoveType::parse("0x1::object::Object<0x4::token::Token>").unwrap(),
            MoveType::Object(_)
        ));
        assert_eq!(MoveType::parse("T0").unwrap(), MoveType::Generic(0));
        assert!(matches!(
            MoveType::parse("0xabc::pog::Player").unwrap(),
            MoveType::Struct(_)
        ));
        assert!(MoveType::parse("float").is_err());
    }

    #[test]
    fn test_matching() {
        assert!(MoveValue::string("x").matches(&MoveType::String));
        assert!(!MoveValue::Bool(true).matches(&MoveType::String));
        assert!(!MoveValue::U64(1).matches(&MoveType::U8));
        assert!(MoveValue::Address(AccountAddress::ZERO).matches(&MoveType::Object("T".into())));
        assert!(MoveValue::Vector(vec![]).matches(&MoveType::Vector(Box::new(MoveType::U64))));
        assert!(!MoveValue::Vector(vec![MoveValue::Bool(true)])
            .matches(&MoveType::Vector(Box::new(MoveType::U64))));
        assert!(MoveValue::Option(None).matches(&MoveType::Option(Box::new(MoveType::U8))));
    }

    #[test]
    fn test_bcs_encoding() {
        assert_eq!(MoveValue::Bool(true).to_bcs().unwrap(), vec![1]);
        assert_eq!(
            MoveValue::U64(5).to_bcs().unwrap(),
            vec![5, 0, 0, 0, 0, 0, 0, 0]
        );
        // uleb128 length prefix then utf8 bytes
        assert_eq!(MoveValue::string("ab").to_bcs().unwrap(), vec![2, b'a', b'b']);
        assert_eq!(
            MoveValue::Option(Some(Box::new(MoveValue::U8(7)))).to_bcs().unwrap(),
            vec![1, 7]
        );
        assert_eq!(MoveValue::Option(None).to_bcs().unwrap(), vec![0]);
    }
}
