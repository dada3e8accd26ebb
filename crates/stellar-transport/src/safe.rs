//! Retrying wrapper over [`RpcClient`].
//!
//! Public endpoints drop connections and rate-limit freely, so single-shot
//! calls are not reliable enough for ingestion. The safe client rebuilds
//! the underlying client for every attempt (a dropped keep-alive connection
//! poisons an agent) and retries a bounded number of times. Failures whose
//! classification marks them permanent are returned immediately.

use tracing::warn;

use crate::error::{RpcError, RpcErrorKind};
use crate::rpc::{EndpointConfig, GetLedgersRequest, LedgerInfo, RpcClient};

/// Attempts per call, including the first one.
pub const DEFAULT_SAFE_RETRIES: u32 = 5;

/// A ledger reader that survives flaky endpoints.
pub struct SafeLedgerClient {
    endpoint: String,
    config: EndpointConfig,
    max_attempts: u32,
}

impl SafeLedgerClient {
    pub fn new(endpoint: &str, config: EndpointConfig) -> Self {
        Self::with_max_attempts(endpoint, config, DEFAULT_SAFE_RETRIES)
    }

    pub fn with_max_attempts(endpoint: &str, config: EndpointConfig, max_attempts: u32) -> Self {
        SafeLedgerClient { endpoint: endpoint.to_string(), config, max_attempts }
    }

    /// Fetch a single ledger by sequence.
    pub fn ledger(&self, sequence: u32) -> Result<LedgerInfo, RpcError> {
        self.with_retries(|client| {
            let request = GetLedgersRequest {
                start_ledger: Some(sequence),
                cursor: None,
                limit: Some(1),
            };
            let response = client.get_ledgers(&request)?;
            response.ledgers.into_iter().find(|l| l.sequence == sequence).ok_or_else(|| {
                RpcError::new(format!("ledger {sequence} missing from getLedgers response"), None)
            })
        })
    }

    /// Latest ledger sequence known to the endpoint.
    pub fn latest_sequence(&self) -> Result<u32, RpcError> {
        self.with_retries(|client| Ok(client.get_latest_ledger()?.sequence))
    }

    fn with_retries<T>(
        &self,
        op: impl Fn(&RpcClient) -> Result<T, RpcError>,
    ) -> Result<T, RpcError> {
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            let client = RpcClient::new(&self.endpoint, &self.config)?;
            match op(&client) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !retryable(error.kind) {
                        return Err(error);
                    }
                    if attempt < self.max_attempts {
                        warn!(
                            attempt = attempt,
                            max_attempts = self.max_attempts,
                            error = %error,
                            "RPC call failed, reconnecting"
                        );
                    }
                    last_error = Some(error);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| RpcError::new("no RPC attempts were made", None)))
    }
}

/// Whether retrying can help. Pruned-history and oversized-page failures
/// will fail the same way every time.
fn retryable(kind: RpcErrorKind) -> bool {
    !kind.is_pruned() && kind != RpcErrorKind::ResponseTooLarge
}
