//! Shared types for the stellar-ingest workspace.
//!
//! This crate provides the foundational types used across the ingestion
//! crates without pulling in any transport or runtime machinery.
//!
//! ## Wire codec
//!
//! The [`xdr`] module decodes the chain's XDR structures: transaction
//! envelopes with deterministic hashing, ledger headers, close metadata,
//! and contract events. Unions are closed over the arms the pipeline
//! handles; unknown discriminants fail with [`DecodeError`].
//!
//! ## Identifiers and records
//!
//! - [`Toid`](toid::Toid) - packed total-order identifier for ledgers,
//!   transactions, and operations
//! - [`EventRecord`](records::EventRecord) / [`TransactionInfo`](records::TransactionInfo) -
//!   the strategy-independent model records ingestion produces
//! - [`strkey`] - `G`/`M`/`C` address encoding
//! - [`filter`] - subscription filter shapes

pub mod error;
pub mod filter;
pub mod records;
pub mod strkey;
pub mod toid;
pub mod xdr;

// Re-export commonly used types at crate root
pub use error::DecodeError;
pub use filter::{
    BlockFilter, EventFilter, HandlerFilter, HandlerKind, OperationFilter, TransactionFilter,
};
pub use records::{
    EventRecord, EventStage, EventType, TransactionEventSet, TransactionInfo, TransactionStatus,
};
pub use toid::{Toid, AFTER_ALL_TX_INDEX};
pub use xdr::{Hash, ReadXdr, WriteXdr};
