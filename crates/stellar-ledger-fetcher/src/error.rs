//! Fetch-pipeline errors.

use std::fmt;

use stellar_ingest_types::DecodeError;
use stellar_transport::RpcError;

/// Everything that can go wrong between a height request and an assembled
/// block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// An XDR payload failed to decode.
    Decode(DecodeError),
    /// The endpoint refused or failed a call.
    Rpc(RpcError),
    /// A result entry's transaction hash matched no envelope in the
    /// ledger's transaction set.
    EnvelopeNotFound { tx_hash: String },
    /// A transaction event carried a stage discriminant this library does
    /// not know. Fatal; decoding cannot guess where such an event sorts.
    UnsupportedStage { stage: u32 },
    /// The endpoint answered but did not include the requested ledger.
    MissingLedger { sequence: u32 },
    /// A blocking worker task died before reporting a result.
    Task { message: String },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Decode(e) => write!(f, "decode error: {e}"),
            FetchError::Rpc(e) => write!(f, "{e}"),
            FetchError::EnvelopeNotFound { tx_hash } => {
                write!(f, "no envelope in transaction set for hash {tx_hash}")
            }
            FetchError::UnsupportedStage { stage } => {
                write!(f, "unsupported transaction event stage: {stage}")
            }
            FetchError::MissingLedger { sequence } => {
                write!(f, "ledger {sequence} not found on endpoint")
            }
            FetchError::Task { message } => write!(f, "worker task failed: {message}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Decode(e) => Some(e),
            FetchError::Rpc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DecodeError> for FetchError {
    fn from(e: DecodeError) -> Self {
        FetchError::Decode(e)
    }
}

impl From<RpcError> for FetchError {
    fn from(e: RpcError) -> Self {
        FetchError::Rpc(e)
    }
}
