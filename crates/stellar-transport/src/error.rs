//! RPC error classification.
//!
//! Endpoint failures arrive as free-form message strings (plus an HTTP
//! status when the failure happened below JSON-RPC). Classification maps
//! the known message shapes onto a closed kind so callers can branch on
//! the kind while the original message is preserved for display.

use std::fmt;

/// What a failed RPC call means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    /// The request timed out.
    Timeout,
    /// The endpoint dropped the connection.
    Disconnection,
    /// The endpoint is throttling the client.
    RateLimited,
    /// The requested page size exceeds what the endpoint serves.
    ResponseTooLarge,
    /// The requested range starts before the endpoint's retained history.
    PrunedLedgerTooOld,
    /// The requested range starts after the endpoint's latest ledger.
    PrunedLedgerTooNew,
    /// Anything not recognized above.
    Default,
}

impl RpcErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcErrorKind::Timeout => "timeout",
            RpcErrorKind::Disconnection => "disconnection",
            RpcErrorKind::RateLimited => "rate_limited",
            RpcErrorKind::ResponseTooLarge => "response_too_large",
            RpcErrorKind::PrunedLedgerTooOld => "pruned_ledger_too_old",
            RpcErrorKind::PrunedLedgerTooNew => "pruned_ledger_too_new",
            RpcErrorKind::Default => "default",
        }
    }

    /// Either pruned-history kind.
    pub fn is_pruned(&self) -> bool {
        matches!(
            self,
            RpcErrorKind::PrunedLedgerTooOld | RpcErrorKind::PrunedLedgerTooNew
        )
    }
}

/// A failed RPC call. The message is kept verbatim; the kind is derived
/// from it once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
    /// HTTP status, when the failure carried one.
    pub status: Option<u16>,
}

impl RpcError {
    pub fn new(message: impl Into<String>, status: Option<u16>) -> Self {
        let message = message.into();
        let kind = classify(&message, status);
        RpcError { kind, message, status }
    }

    /// Replace the message while keeping the classification. Used when a
    /// caller rewrites a terse endpoint message into guidance text.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        RpcError { kind: self.kind, message: message.into(), status: self.status }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RpcError {}

/// Map an endpoint failure message onto a kind. The matched phrases are the
/// ones RPC nodes actually emit; order matters only in that the first match
/// wins.
pub fn classify(message: &str, status: Option<u16>) -> RpcErrorKind {
    if message.contains("Timeout") {
        RpcErrorKind::Timeout
    } else if message.starts_with("disconnected from ") {
        RpcErrorKind::Disconnection
    } else if message.contains("Rate Limit Exceeded")
        || message.contains("Too Many Requests")
        || status == Some(429)
    {
        RpcErrorKind::RateLimited
    } else if message.contains("limit must not exceed") {
        RpcErrorKind::ResponseTooLarge
    } else if message.contains("start is before oldest ledger") {
        RpcErrorKind::PrunedLedgerTooOld
    } else if message.contains("start is after newest ledger") {
        RpcErrorKind::PrunedLedgerTooNew
    } else {
        RpcErrorKind::Default
    }
}
