//! Account addresses
//!
//! A 32-byte address, written as `0x` plus 64 hex characters. Short forms
//! such as `0x1` are left-padded with zeros on parse.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Address parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,
    #[error("Address too long: {0} hex characters (max 64)")]
    TooLong(usize),
    #[error("Address is not valid hex: {0}")]
    InvalidHex(String),
}

/// A 32-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; AccountAddress::LENGTH]);

impl AccountAddress {
    pub const LENGTH: usize = 32;

    pub const ZERO: Self = Self([0u8; Self::LENGTH]);

    /// Framework address `0x1`
    pub const ONE: Self = Self::from_low_byte(1);

    const fn from_low_byte(byte: u8) -> Self {
        let mut bytes = [0u8; Self::LENGTH];
        bytes[Self::LENGTH - 1] = byte;
        Self(bytes)
    }

    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse a hex address, with or without the `0x` prefix
    pub fn from_hex(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        let literal = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if literal.is_empty() {
            return Err(AddressError::Empty);
        }
        if literal.len() > Self::LENGTH * 2 {
            return Err(AddressError::TooLong(literal.len()));
        }

        // Left-pad to a full 64-character literal
        let padded = format!("{:0>64}", literal);
        let bytes = hex::decode(&padded).map_err(|_| AddressError::InvalidHex(input.to_string()))?;

        let mut out = [0u8; Self::LENGTH];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Shortest form, as used for framework addresses (`0x1`)
    pub fn to_short_string(&self) -> String {
        let full = self.to_hex();
        let trimmed = full.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{}", trimmed)
        }
    }
}

impl From<[u8; AccountAddress::LENGTH]> for AccountAddress {
    fn from(bytes: [u8; AccountAddress::LENGTH]) -> Self {
        Self(bytes)
    }
}

impl FromStr for AccountAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            // BCS: fixed 32 bytes, no length prefix
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(D::Error::custom)
        } else {
            let bytes = <[u8; Self::LENGTH]>::deserialize(deserializer)?;
            Ok(Self(bytes))
        }
    }
}
