//! Network transport for the stellar-ingest workspace.
//!
//! This crate owns everything that talks to a chain RPC endpoint over
//! HTTP:
//!
//! - [`RpcClient`](rpc::RpcClient) - synchronous JSON-RPC client for the
//!   five endpoint methods ingestion depends on
//! - [`SafeLedgerClient`](safe::SafeLedgerClient) - reconnect-and-retry
//!   wrapper for flaky public endpoints
//! - [`RpcError`](error::RpcError) - endpoint failures, classified by
//!   message shape into a closed [`RpcErrorKind`](error::RpcErrorKind)
//!
//! Decoding XDR payloads lives in `stellar_ingest_types`; this crate only
//! moves bytes and maps wire JSON into the `Raw*` response types.

pub mod error;
pub mod rpc;
pub mod safe;

// Re-export commonly used transport types at crate root
pub use error::{classify, RpcError, RpcErrorKind};
pub use rpc::{
    EndpointConfig, GetEventsRequest, GetEventsResponse, GetLatestLedgerResponse,
    GetLedgersRequest, GetLedgersResponse, GetNetworkResponse, GetTransactionsRequest,
    GetTransactionsResponse, LedgerInfo, RawEventRecord, RawTransactionInfo, RpcClient,
    DEFAULT_PAGE_SIZE,
};
pub use safe::{SafeLedgerClient, DEFAULT_SAFE_RETRIES};
