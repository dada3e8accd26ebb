//! JSON-RPC client for chain RPC endpoints.
//!
//! The client is a thin synchronous wrapper over the five endpoint methods
//! the ingestion pipeline uses: `getLedgers`, `getTransactions`,
//! `getEvents`, `getLatestLedger`, and `getNetwork`. Responses carry their
//! payloads as base64 XDR; the `Raw*` types mirror the wire shape and
//! decode into the model records from `stellar_ingest_types`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use stellar_ingest_types::records::{
    EventRecord, EventStage, EventType, TransactionEventSet, TransactionInfo, TransactionStatus,
};
use stellar_ingest_types::xdr::{
    DiagnosticEvent, ReadXdr, ScVal, TransactionEnvelope, TransactionMeta, TransactionResult,
};
use stellar_ingest_types::DecodeError;

use crate::error::RpcError;

/// Page size requested from the endpoint when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 150;

/// Connection settings for an RPC endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Page size for paginated requests.
    pub page_limit: u32,
    /// Extra headers sent with every request, e.g. an API key.
    pub headers: Vec<(String, String)>,
    /// Request timeout in seconds. Unset falls back to
    /// `STELLAR_RPC_TIMEOUT_SECS` or the built-in default.
    pub timeout_secs: Option<u64>,
    /// Connect timeout in seconds. Unset falls back to
    /// `STELLAR_RPC_CONNECT_TIMEOUT_SECS` or the built-in default.
    pub connect_timeout_secs: Option<u64>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            page_limit: DEFAULT_PAGE_SIZE,
            headers: Vec::new(),
            timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

/// Synchronous JSON-RPC client.
#[derive(Debug)]
pub struct RpcClient {
    endpoint: String,
    agent: ureq::Agent,
    headers: Vec<(String, String)>,
    page_limit: u32,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Default request timeout in seconds (can be overridden by env).
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default connect timeout in seconds (can be overridden by env).
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    fn default_timeouts() -> (Duration, Duration) {
        let timeout_secs = std::env::var("STELLAR_RPC_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_TIMEOUT_SECS);
        let connect_secs = std::env::var("STELLAR_RPC_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_CONNECT_TIMEOUT_SECS);
        (
            Duration::from_secs(timeout_secs),
            Duration::from_secs(connect_secs),
        )
    }

    fn build_agent(timeout: Duration, connect_timeout: Duration) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(timeout)
            .timeout_connect(connect_timeout)
            .build()
    }

    /// Create a client. Only `http` and `https` endpoints are accepted.
    pub fn new(endpoint: &str, config: &EndpointConfig) -> Result<Self, RpcError> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(RpcError::new(format!("Unsupported protocol: {endpoint}"), None));
        }
        let (env_timeout, env_connect) = Self::default_timeouts();
        let timeout = config.timeout_secs.map(Duration::from_secs).unwrap_or(env_timeout);
        let connect_timeout =
            config.connect_timeout_secs.map(Duration::from_secs).unwrap_or(env_connect);
        info!(
            endpoint = %endpoint,
            page_limit = config.page_limit,
            "creating RPC client"
        );
        Ok(RpcClient {
            endpoint: endpoint.to_string(),
            agent: Self::build_agent(timeout, connect_timeout),
            headers: config.headers.clone(),
            page_limit: config.page_limit,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    /// Execute one JSON-RPC call.
    fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<R, RpcError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let mut request = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json");
        for (name, value) in &self.headers {
            request = request.set(name, value);
        }

        let response = match request.send_json(&body) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let text = response.into_string().unwrap_or_default();
                let message =
                    if text.is_empty() { format!("HTTP status {code}") } else { text };
                return Err(RpcError::new(message, Some(code)));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(RpcError::new(transport.to_string(), None));
            }
        };

        let envelope: JsonRpcResponse<R> = response
            .into_json()
            .map_err(|e| RpcError::new(format!("invalid JSON-RPC response: {e}"), None))?;
        if let Some(error) = envelope.error {
            return Err(RpcError::new(error.message, None));
        }
        envelope
            .result
            .ok_or_else(|| RpcError::new("JSON-RPC response has no result", None))
    }

    pub fn get_ledgers(&self, request: &GetLedgersRequest) -> Result<GetLedgersResponse, RpcError> {
        self.call("getLedgers", request)
    }

    pub fn get_transactions(
        &self,
        request: &GetTransactionsRequest,
    ) -> Result<GetTransactionsResponse, RpcError> {
        self.call("getTransactions", request)
    }

    pub fn get_events(&self, request: &GetEventsRequest) -> Result<GetEventsResponse, RpcError> {
        self.call("getEvents", request)
    }

    pub fn get_latest_ledger(&self) -> Result<GetLatestLedgerResponse, RpcError> {
        self.call("getLatestLedger", &serde_json::json!({}))
    }

    pub fn get_network(&self) -> Result<GetNetworkResponse, RpcError> {
        self.call("getNetwork", &serde_json::json!({}))
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    #[allow(dead_code)]
    code: i64,
    message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLedgersRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_ledger: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// One ledger as served by `getLedgers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerInfo {
    pub sequence: u32,
    /// Hex-encoded ledger hash.
    pub hash: String,
    /// Close time in epoch seconds.
    pub ledger_close_time: u64,
    /// Base64 XDR of the ledger header history entry.
    pub header_xdr: String,
    /// Base64 XDR of the ledger close metadata. Endpoints that do not
    /// retain metadata omit it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_xdr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLedgersResponse {
    pub ledgers: Vec<LedgerInfo>,
    pub latest_ledger: u32,
    pub latest_ledger_close_time: u64,
    pub oldest_ledger: u32,
    pub oldest_ledger_close_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_ledger: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// One transaction as served by `getTransactions`, payloads still encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransactionInfo {
    pub status: TransactionStatus,
    pub tx_hash: String,
    pub ledger: u32,
    pub created_at: u64,
    pub application_order: u32,
    pub fee_bump: bool,
    pub envelope_xdr: String,
    pub result_xdr: String,
    pub result_meta_xdr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic_events_xdr: Option<Vec<String>>,
}

impl RawTransactionInfo {
    /// Decode the XDR payloads into a model record. Diagnostic events come
    /// from the dedicated response field when the endpoint serves one, and
    /// from the result metadata otherwise.
    pub fn decode(&self) -> Result<TransactionInfo, DecodeError> {
        let envelope = TransactionEnvelope::from_xdr_base64(&self.envelope_xdr)?;
        let result = TransactionResult::from_xdr_base64(&self.result_xdr)?;
        let result_meta = TransactionMeta::from_xdr_base64(&self.result_meta_xdr)?;
        let events = TransactionEventSet::from_meta(&result_meta);
        let diagnostic_events = match &self.diagnostic_events_xdr {
            Some(encoded) => {
                let mut decoded = Vec::with_capacity(encoded.len());
                for event in encoded {
                    decoded.push(DiagnosticEvent::from_xdr_base64(event)?);
                }
                Some(decoded)
            }
            None => {
                let diags = &result_meta.as_v4().diagnostic_events;
                if diags.is_empty() { None } else { Some(diags.clone()) }
            }
        };
        Ok(TransactionInfo {
            status: self.status,
            tx_hash: self.tx_hash.clone(),
            ledger: self.ledger,
            created_at: self.created_at,
            application_order: self.application_order,
            fee_bump: self.fee_bump,
            envelope,
            result,
            result_meta,
            events,
            diagnostic_events,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionsResponse {
    pub transactions: Vec<RawTransactionInfo>,
    pub latest_ledger: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEventsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_ledger: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_ledger: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// One event as served by `getEvents`, topics and value still encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventRecord {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub ledger: u32,
    pub ledger_closed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    pub id: String,
    pub operation_index: u32,
    pub transaction_index: u32,
    pub tx_hash: String,
    pub in_successful_contract_call: bool,
    /// Base64 XDR, one entry per topic.
    pub topic: Vec<String>,
    /// Base64 XDR of the event data.
    pub value: String,
}

impl RawEventRecord {
    /// Decode the topic and value payloads. The stage is recovered from
    /// the record's transaction index, which uses reserved values for the
    /// before-all and after-all buckets.
    pub fn decode(&self) -> Result<EventRecord, DecodeError> {
        let mut topic = Vec::with_capacity(self.topic.len());
        for encoded in &self.topic {
            topic.push(ScVal::from_xdr_base64(encoded)?);
        }
        let value = ScVal::from_xdr_base64(&self.value)?;
        Ok(EventRecord {
            event_type: self.event_type,
            ledger: self.ledger,
            ledger_closed_at: self.ledger_closed_at.clone(),
            id: self.id.clone(),
            operation_index: self.operation_index,
            transaction_index: self.transaction_index,
            tx_hash: self.tx_hash.clone(),
            in_successful_contract_call: self.in_successful_contract_call,
            topic,
            value,
            contract_id: self.contract_id.clone(),
            stage: EventStage::for_transaction_index(self.transaction_index),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEventsResponse {
    pub events: Vec<RawEventRecord>,
    pub latest_ledger: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLatestLedgerResponse {
    /// Hex-encoded hash of the latest ledger.
    pub id: String,
    pub protocol_version: u32,
    pub sequence: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetNetworkResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendbot_url: Option<String>,
    pub passphrase: String,
    pub protocol_version: u32,
}
