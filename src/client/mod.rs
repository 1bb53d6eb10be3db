//! REST client for a fullnode
//!
//! Submits signed transactions and reads the few things the mint workflow
//! needs beforehand: chain id, the sender's sequence number and module ABIs.

use crate::abi::{AbiError, ModuleAbi};
use crate::config::Config;
use crate::transaction::SignedTransaction;
use crate::types::{AccountAddress, ModuleId};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use url::Url;

/// Content type of a BCS-encoded signed transaction
pub const SIGNED_TRANSACTION_BCS: &str = "application/x.pog.signed_transaction+bcs";

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    #[error("Account not found: {0}")]
    AccountNotFound(AccountAddress),
    #[error("Insufficient balance for transaction fee")]
    InsufficientBalance,
    #[error("Sequence number conflict: {0}")]
    SequenceNumberConflict(String),
    #[error("Transaction failed in simulation: {0}")]
    SimulationFailed(String),
    #[error("Transaction {hash} committed with status {vm_status}")]
    ExecutionFailed { hash: String, vm_status: String },
    #[error("Timed out waiting for transaction {0}")]
    WaitTimeout(String),
    #[error("API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),
    #[error("Encoding error: {0}")]
    Encoding(#[from] bcs::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl ClientError {
    /// Transport errors, with timeouts pulled out into their own class
    fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Http(err)
        }
    }
}

/// Node error body
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    vm_error_code: Option<u64>,
}

/// Map a failed response onto the submission failure classes
fn classify(status: reqwest::StatusCode, body: String) -> ClientError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(&body).ok();
    let (message, error_code) = match &parsed {
        Some(err) => (err.message.clone(), err.error_code.clone().unwrap_or_default()),
        None => (body.clone(), String::new()),
    };
    let haystack = format!("{} {}", message, error_code).to_ascii_uppercase();

    if haystack.contains("INSUFFICIENT_BALANCE") {
        ClientError::InsufficientBalance
    } else if haystack.contains("SEQUENCE_NUMBER_TOO_OLD")
        || haystack.contains("SEQUENCE_NUMBER_TOO_NEW")
        || haystack.contains("SEQUENCE_NUMBER_TOO_BIG")
    {
        ClientError::SequenceNumberConflict(message)
    } else if error_code == "vm_error"
        || parsed.as_ref().and_then(|p| p.vm_error_code).is_some()
    {
        ClientError::SimulationFailed(message)
    } else {
        ClientError::Api { status, body }
    }
}

/// Node's JSON encodes u64 as strings
fn u64_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}

/// `GET /v1`
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerInfo {
    pub chain_id: u8,
    #[serde(deserialize_with = "u64_from_string")]
    pub ledger_version: u64,
    #[serde(default)]
    pub node_role: Option<String>,
}

/// `GET /v1/accounts/{address}`
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    #[serde(deserialize_with = "u64_from_string")]
    pub sequence_number: u64,
    pub authentication_key: String,
}

/// Receipt for an accepted submission
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: String,
}

/// Outcome of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Committed { success: bool, vm_status: String },
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    vm_status: Option<String>,
}

/// Something that accepts fully signed transactions
#[allow(async_fn_in_trait)]
pub trait Submitter {
    async fn submit(&self, transaction: &SignedTransaction)
        -> Result<PendingTransaction, ClientError>;
}

/// REST client for a fullnode
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl RestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            other => return Err(ClientError::InvalidScheme(other.to_string())),
        }
        // Url::join drops the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Self::new(
            config.rest_url.as_str(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        if path.is_empty() {
            return Ok(self.base_url.join("v1")?);
        }
        Ok(self.base_url.join(&format!("v1/{}", path))?)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, ClientError> {
        log::debug!("GET {}", url);
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(ClientError::transport)?;
        Ok(response)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await.map_err(ClientError::transport)?;
        if !status.is_success() {
            return Err(classify(status, body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Chain id and ledger version
    pub async fn ledger_info(&self) -> Result<LedgerInfo, ClientError> {
        let response = self.get(self.endpoint("")?).await?;
        Self::read_json(response).await
    }

    /// Sequence number and authentication key of an account
    pub async fn account(&self, address: AccountAddress) -> Result<AccountInfo, ClientError> {
        let response = self
            .get(self.endpoint(&format!("accounts/{}", address))?)
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::AccountNotFound(address));
        }
        Self::read_json(response).await
    }

    /// ABI of a published module
    pub async fn module_abi(&self, module: &ModuleId) -> Result<ModuleAbi, ClientError> {
        let url = self.endpoint(&format!("accounts/{}/module/{}", module.address, module.name))?;
        let response = self.get(url).await?;
        let status = response.status();
        let body = response.text().await.map_err(ClientError::transport)?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AbiError::ModuleNotFound(module.to_string()).into());
        }
        if !status.is_success() {
            return Err(classify(status, body));
        }
        Ok(ModuleAbi::from_json(&body)?)
    }

    /// Current state of a submitted transaction
    pub async fn transaction_status(&self, hash: &str) -> Result<TransactionStatus, ClientError> {
        let response = self
            .get(self.endpoint(&format!("transactions/by_hash/{}", hash))?)
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(TransactionStatus::Pending);
        }
        let txn: TransactionResponse = Self::read_json(response).await?;
        if txn.kind == "pending_transaction" {
            return Ok(TransactionStatus::Pending);
        }
        Ok(TransactionStatus::Committed {
            success: txn.success.unwrap_or(false),
            vm_status: txn.vm_status.unwrap_or_default(),
        })
    }

    /// Poll until the transaction commits or `timeout` elapses
    pub async fn wait_for_transaction(
        &self,
        hash: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.transaction_status(hash).await? {
                TransactionStatus::Committed { success: true, .. } => {
                    log::info!("Transaction {} committed", hash);
                    return Ok(());
                }
                TransactionStatus::Committed { vm_status, .. } => {
                    return Err(ClientError::ExecutionFailed {
                        hash: hash.to_string(),
                        vm_status,
                    })
                }
                TransactionStatus::Pending => {}
            }
            if Instant::now() >= deadline {
                return Err(ClientError::WaitTimeout(hash.to_string()));
            }
            sleep(poll_interval).await;
        }
    }
}

impl Submitter for RestClient {
    async fn submit(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<PendingTransaction, ClientError> {
        let url = self.endpoint("transactions")?;
        let body = transaction.to_bcs()?;
        log::info!("Submitting {} bytes to {}", body.len(), url);

        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, SIGNED_TRANSACTION_BCS)
            .body(body)
            .send()
            .await
            .map_err(ClientError::transport)?;

        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalised() {
        let client = RestClient::new("http://localhost:8080/api", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/api/");
        assert_eq!(
            client.endpoint("transactions").unwrap().as_str(),
            "http://localhost:8080/api/v1/transactions"
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let result = RestClient::new("ftp://localhost", Duration::from_secs(1));
        assert!(matches!(result, Err(ClientError::InvalidScheme(_))));
    }

    #[test]
    fn test_classify_failures() {
        let status = reqwest::StatusCode::BAD_REQUEST;

        let old = r#"{"message":"Invalid transaction: Type: Validation Code: SEQUENCE_NUMBER_TOO_OLD","error_code":"vm_error","vm_error_code":3}"#;
        assert!(matches!(
            classify(status, old.to_string()),
            ClientError::SequenceNumberConflict(_)
        ));

        let broke = r#"{"message":"Code: INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE","error_code":"vm_error","vm_error_code":5}"#;
        assert!(matches!(
            classify(status, broke.to_string()),
            ClientError::InsufficientBalance
        ));

        let aborted = r#"{"message":"Move abort in 0x7bb9::pog: E_ALREADY_MINTED","error_code":"vm_error","vm_error_code":4016}"#;
        assert!(matches!(
            classify(status, aborted.to_string()),
            ClientError::SimulationFailed(_)
        ));

        let server = classify(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string());
        assert!(matches!(server, ClientError::Api { .. }));
        assert_eq!(server.to_string(), "API error 500 Internal Server Error: boom");
    }

    #[test]
    fn test_account_info_accepts_string_numbers() {
        let info: AccountInfo =
            serde_json::from_str(r#"{"sequence_number":"42","authentication_key":"0x01"}"#)
                .unwrap();
        assert_eq!(info.sequence_number, 42);

        let info: AccountInfo =
            serde_json::from_str(r#"{"sequence_number":7,"authentication_key":"0x01"}"#).unwrap();
        assert_eq!(info.sequence_number, 7);
    }
}
