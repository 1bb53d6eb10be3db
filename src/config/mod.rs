//! Client configuration
//!
//! Network selection, transaction defaults and the signing identities,
//! loaded from a YAML file laid out like an Aptos CLI config. Private keys
//! come from a `SecretStore` (environment variables by default) or from a
//! named profile, never from literals.

use crate::account::Account;
use crate::crypto::KeyError;
use crate::transaction::{
    ChainId, DEFAULT_EXPIRATION_SECS, DEFAULT_GAS_UNIT_PRICE, DEFAULT_MAX_GAS_AMOUNT,
};
use crate::types::{AccountAddress, AddressError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Default HTTP request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable read for the admin key when nothing else is set
pub const ADMIN_KEY_ENV: &str = "POG_ADMIN_PRIVATE_KEY";

/// Environment variable read for the user key when nothing else is set
pub const USER_KEY_ENV: &str = "POG_USER_PRIVATE_KEY";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
    #[error("Custom network needs a rest_url")]
    MissingRestUrl,
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),
    #[error("No account or key configured for {0}")]
    MissingIdentity(String),
    #[error("{role}: configured account {configured} does not match key address {derived}")]
    AddressMismatch {
        role: String,
        configured: AccountAddress,
        derived: AccountAddress,
    },
    #[error("Invalid key for {role}: {source}")]
    InvalidKey {
        role: String,
        #[source]
        source: KeyError,
    },
    #[error("Invalid address: {0}")]
    AddressError(#[from] AddressError),
}

/// Named network environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Devnet,
    Local,
    Custom,
}

impl Network {
    /// Public fullnode REST endpoint, if the network has one
    pub fn rest_url(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => Some("https://fullnode.mainnet.aptoslabs.com"),
            Network::Testnet => Some("https://fullnode.testnet.aptoslabs.com"),
            Network::Devnet => Some("https://fullnode.devnet.aptoslabs.com"),
            Network::Local => Some("http://127.0.0.1:8080"),
            Network::Custom => None,
        }
    }

    /// Chain id, for networks where it never changes. Devnet is reset
    /// regularly and gets a new one each time.
    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            Network::Mainnet => Some(ChainId::MAINNET),
            Network::Testnet => Some(ChainId::TESTNET),
            Network::Local => Some(ChainId::LOCAL),
            Network::Devnet | Network::Custom => None,
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            "local" | "localnet" => Ok(Network::Local),
            "custom" => Ok(Network::Custom),
            _ => Err(ConfigError::UnknownNetwork(s.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
            Network::Local => "local",
            Network::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

/// Source of private key material
pub trait SecretStore {
    fn secret(&self, name: &str) -> Option<String>;
}

/// Reads secrets from environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn secret(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

impl SecretStore for HashMap<String, String> {
    fn secret(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// An Aptos CLI style profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// Where one signing identity comes from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignerEntry {
    /// Account address; required when no key is available locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Profile holding the private key and/or account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Secret holding the private key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_env: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignersConfig {
    #[serde(default)]
    pub admin: SignerEntry,
    #[serde(default)]
    pub user: SignerEntry,
}

/// Gas and expiry defaults for built transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_secs: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_gas_amount: DEFAULT_MAX_GAS_AMOUNT,
            gas_unit_price: DEFAULT_GAS_UNIT_PRICE,
            expiration_secs: DEFAULT_EXPIRATION_SECS,
        }
    }
}

/// Config file as written on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    network: Option<Network>,
    #[serde(default)]
    rest_url: Option<String>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    profiles: HashMap<String, Profile>,
    #[serde(default)]
    signers: SignersConfig,
    #[serde(default)]
    transaction: TransactionConfig,
}

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub network: Network,
    pub rest_url: Url,
    pub request_timeout_secs: u64,
    pub signers: SignersConfig,
    pub transaction: TransactionConfig,
    profiles: HashMap<String, Profile>,
}

impl Config {
    /// Defaults for a named network, identities from the default secrets
    pub fn for_network(network: Network) -> Result<Self, ConfigError> {
        let rest_url = network.rest_url().ok_or(ConfigError::MissingRestUrl)?;
        Ok(Self {
            network,
            rest_url: Url::parse(rest_url)?,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            signers: SignersConfig::default(),
            transaction: TransactionConfig::default(),
            profiles: HashMap::new(),
        })
    }

    /// Load a YAML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_yaml(&contents)?;
        log::info!("Loaded config from {:?} ({})", path, config.network);
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(contents)?;
        let default_profile = file.profiles.get("default");

        let network = file
            .network
            .or_else(|| default_profile.and_then(|p| p.network))
            .unwrap_or_default();

        let rest_url = match file
            .rest_url
            .clone()
            .or_else(|| default_profile.and_then(|p| p.rest_url.clone()))
        {
            Some(url) => url,
            None => network
                .rest_url()
                .ok_or(ConfigError::MissingRestUrl)?
                .to_string(),
        };

        Ok(Self {
            network,
            rest_url: Url::parse(&rest_url)?,
            request_timeout_secs: file
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            signers: file.signers,
            transaction: file.transaction,
            profiles: file.profiles,
        })
    }

    pub fn with_rest_url(mut self, rest_url: &str) -> Result<Self, ConfigError> {
        self.rest_url = Url::parse(rest_url)?;
        Ok(self)
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    /// Resolve the admin identity
    pub fn admin_account(&self, secrets: &impl SecretStore) -> Result<Account, ConfigError> {
        self.resolve_account("admin", &self.signers.admin, ADMIN_KEY_ENV, secrets)
    }

    /// Resolve the secondary user identity
    pub fn user_account(&self, secrets: &impl SecretStore) -> Result<Account, ConfigError> {
        self.resolve_account("user", &self.signers.user, USER_KEY_ENV, secrets)
    }

    /// Resolve one identity.
    ///
    /// Key lookup order: the entry's `key_env`, its profile's `private_key`,
    /// then `default_env`. Without a key the account is address-only.
    pub fn resolve_account(
        &self,
        role: &str,
        entry: &SignerEntry,
        default_env: &str,
        secrets: &impl SecretStore,
    ) -> Result<Account, ConfigError> {
        let profile = match &entry.profile {
            Some(name) => Some(self.profile(name)?),
            None => None,
        };

        let key = entry
            .key_env
            .as_deref()
            .and_then(|name| secrets.secret(name))
            .or_else(|| profile.and_then(|p| p.private_key.clone()))
            .or_else(|| secrets.secret(default_env));

        let configured = entry
            .account
            .clone()
            .or_else(|| profile.and_then(|p| p.account.clone()))
            .map(|addr| AccountAddress::from_hex(&addr))
            .transpose()?;

        let account = match (key, configured) {
            (Some(key), configured) => {
                let account =
                    Account::from_private_key_hex(&key).map_err(|source| ConfigError::InvalidKey {
                        role: role.to_string(),
                        source,
                    })?;
                if let Some(configured) = configured {
                    if configured != account.address() {
                        return Err(ConfigError::AddressMismatch {
                            role: role.to_string(),
                            configured,
                            derived: account.address(),
                        });
                    }
                }
                account
            }
            (None, Some(address)) => {
                log::warn!("No private key for {}, {} is address-only", role, address);
                Account::address_only(address)
            }
            (None, None) => return Err(ConfigError::MissingIdentity(role.to_string())),
        };

        Ok(account.with_label(role))
    }
}
