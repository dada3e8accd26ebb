//! Ledger fetching and graph assembly for the stellar-ingest workspace.
//!
//! This crate turns raw endpoint responses into the cross-linked object
//! graph downstream indexing consumes:
//!
//! - [`LedgerFetcher`](fetcher::LedgerFetcher) - resolves heights into
//!   assembled [`LedgerBlock`](block::LedgerBlock)s, one task per height
//! - [`reconstruct`] - two interchangeable transaction reconstruction
//!   strategies (close metadata, paginated records)
//! - [`extract`] - mints ordered event records from decoded metadata
//! - [`EventsCache`](events_cache::EventsCache) - banks event overruns so
//!   sequential ledger fetches do not re-page the endpoint
//! - [`filters`] - pure predicates evaluated per subscribed handler
//!
//! Endpoint access goes through the [`LedgerEndpoint`](endpoint::LedgerEndpoint)
//! seam, so tests script an in-memory endpoint while production wires in
//! `stellar_transport`'s JSON-RPC client.

pub mod block;
pub mod endpoint;
pub mod error;
pub mod events_cache;
pub mod extract;
pub mod fetcher;
pub mod filters;
pub mod reconstruct;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used fetcher types at crate root
pub use block::{BlockHeader, Ledger, LedgerBlock, Operation, Transaction};
pub use endpoint::LedgerEndpoint;
pub use error::FetchError;
pub use events_cache::{CachedEvents, EventsCache};
pub use extract::{close_time_iso, extract_ledger_events};
pub use fetcher::{
    BlockSource, FetcherConfig, LedgerFetcher, ReconstructionStrategy, LEDGER_CLOSE_INTERVAL_MS,
};
pub use filters::{
    filter_block, filter_data, filter_event, filter_operation, filter_transaction, HandlerData,
};
pub use reconstruct::{transactions_from_meta, transactions_from_pages};
