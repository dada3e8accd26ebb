//! Ledger fetching and block assembly.
//!
//! [`LedgerFetcher`] turns raw endpoint responses into assembled
//! [`LedgerBlock`]s. Each height in a batch is resolved on its own task,
//! blocking endpoint calls run under `spawn_blocking`, results are joined
//! in request order, and the first failure aborts the batch.
//!
//! Transactions are rebuilt per the configured [`ReconstructionStrategy`].
//! The metadata strategy decodes the ledger's close metadata and falls
//! back to paginated reconstruction for ledgers the endpoint serves
//! without metadata. Events are fetched only when a decoded envelope
//! invokes a host function; ledgers without contract activity always
//! carry an empty event list.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use stellar_ingest_types::records::{EventRecord, TransactionInfo};
use stellar_ingest_types::xdr::{network_id, Hash, LedgerCloseMeta, ReadXdr};
use stellar_transport::rpc::{GetLedgersRequest, LedgerInfo};
use stellar_transport::{EndpointConfig, RpcClient, RpcError, RpcErrorKind, DEFAULT_PAGE_SIZE};

use crate::block::LedgerBlock;
use crate::endpoint::LedgerEndpoint;
use crate::error::FetchError;
use crate::events_cache::EventsCache;
use crate::extract::{close_time_iso, extract_ledger_events};
use crate::reconstruct::{transactions_from_meta, transactions_from_pages};

/// Expected wall-clock gap between ledger closes, for external pollers.
pub const LEDGER_CLOSE_INTERVAL_MS: u64 = 4000;

/// How a ledger's transactions are rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconstructionStrategy {
    /// Decode the ledger's close metadata.
    #[default]
    LedgerMetadata,
    /// Page the endpoint's `getTransactions` records.
    TransactionPages,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetcherConfig {
    pub strategy: ReconstructionStrategy,
    /// Page size for paginated transaction and event fetches.
    pub page_limit: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        FetcherConfig {
            strategy: ReconstructionStrategy::default(),
            page_limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Fetches closed ledgers and assembles them into cross-linked blocks.
///
/// Cheap to clone; clones share the endpoint and the events cache.
#[derive(Clone)]
pub struct LedgerFetcher {
    endpoint: Arc<dyn LedgerEndpoint>,
    events_cache: Arc<EventsCache>,
    config: FetcherConfig,
    network_id: Hash,
    chain_id: String,
}

impl LedgerFetcher {
    /// Probe the endpoint's network and build a fetcher bound to it.
    ///
    /// The network passphrase becomes the chain id and seeds the network
    /// id used for deterministic transaction hashing.
    pub async fn connect(
        endpoint: Arc<dyn LedgerEndpoint>,
        config: FetcherConfig,
    ) -> Result<Self, FetchError> {
        let probe = Arc::clone(&endpoint);
        let network = tokio::task::spawn_blocking(move || probe.get_network())
            .await
            .map_err(task_error)??;
        let chain_id = network.passphrase;
        info!(chain_id = %chain_id, strategy = ?config.strategy, "connected to ledger endpoint");
        Ok(LedgerFetcher {
            network_id: network_id(&chain_id),
            endpoint,
            events_cache: Arc::new(EventsCache::new()),
            config,
            chain_id,
        })
    }

    /// Connect through a fresh JSON-RPC client for `url`.
    pub async fn connect_http(
        url: &str,
        endpoint_config: &EndpointConfig,
        config: FetcherConfig,
    ) -> Result<Self, FetchError> {
        let client = RpcClient::new(url, endpoint_config)?;
        Self::connect(Arc::new(client), config).await
    }

    /// The network passphrase reported by the endpoint.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// SHA-256 of the chain id; the domain separator for transaction
    /// hashing.
    pub fn network_id(&self) -> &Hash {
        &self.network_id
    }

    /// Sequence of the newest closed ledger on the endpoint.
    pub async fn latest_sequence(&self) -> Result<u32, FetchError> {
        let endpoint = Arc::clone(&self.endpoint);
        let latest = tokio::task::spawn_blocking(move || endpoint.get_latest_ledger())
            .await
            .map_err(task_error)??;
        Ok(latest.sequence)
    }

    /// Fetch and assemble every requested height concurrently. Blocks come
    /// back in the order heights were given; the first failure wins.
    pub async fn fetch_blocks(&self, heights: &[u32]) -> Result<Vec<LedgerBlock>, FetchError> {
        let mut handles = Vec::with_capacity(heights.len());
        for &height in heights {
            let fetcher = self.clone();
            handles.push(tokio::spawn(async move { fetcher.fetch_block(height).await }));
        }
        future::try_join_all(
            handles.into_iter().map(|handle| async move { handle.await.map_err(task_error)? }),
        )
        .await
    }

    /// Fetch and assemble a single ledger.
    pub async fn fetch_block(&self, height: u32) -> Result<LedgerBlock, FetchError> {
        match self.config.strategy {
            ReconstructionStrategy::LedgerMetadata => self.block_via_metadata(height).await,
            ReconstructionStrategy::TransactionPages => {
                let (info, transactions) = tokio::try_join!(
                    self.ledger_info(height),
                    self.transactions_via_pages(height),
                )?;
                self.assemble_with_cached_events(info, transactions).await
            }
        }
    }

    async fn block_via_metadata(&self, height: u32) -> Result<LedgerBlock, FetchError> {
        let info = self.ledger_info(height).await?;
        match &info.metadata_xdr {
            Some(blob) => {
                let metadata = LedgerCloseMeta::from_xdr_base64(blob)?;
                let transactions = transactions_from_meta(&metadata, &self.network_id)?;
                let events = if has_invoke_host_function(&transactions) {
                    extract_ledger_events(
                        &transactions,
                        info.sequence,
                        &close_time_iso(info.ledger_close_time),
                    )?
                } else {
                    Vec::new()
                };
                LedgerBlock::assemble(&info, Some(metadata), transactions, events)
            }
            None => {
                debug!(
                    sequence = info.sequence,
                    "ledger served without close metadata, reconstructing from transaction pages"
                );
                let transactions = self.transactions_via_pages(info.sequence).await?;
                self.assemble_with_cached_events(info, transactions).await
            }
        }
    }

    async fn assemble_with_cached_events(
        &self,
        info: LedgerInfo,
        transactions: Vec<TransactionInfo>,
    ) -> Result<LedgerBlock, FetchError> {
        let events = if has_invoke_host_function(&transactions) {
            self.events_via_cache(info.sequence).await?
        } else {
            Vec::new()
        };
        LedgerBlock::assemble(&info, None, transactions, events)
    }

    /// The `getLedgers` record for one height. A pruned-too-old failure is
    /// rewritten into guidance; a response that does not contain the
    /// height is reported as a missing ledger.
    async fn ledger_info(&self, height: u32) -> Result<LedgerInfo, FetchError> {
        let endpoint = Arc::clone(&self.endpoint);
        let request =
            GetLedgersRequest { start_ledger: Some(height), cursor: None, limit: Some(1) };
        let response = tokio::task::spawn_blocking(move || endpoint.get_ledgers(&request))
            .await
            .map_err(task_error)?
            .map_err(|error| describe_pruned_ledger(error, height))?;
        response
            .ledgers
            .into_iter()
            .find(|ledger| ledger.sequence == height)
            .ok_or(FetchError::MissingLedger { sequence: height })
    }

    async fn transactions_via_pages(
        &self,
        height: u32,
    ) -> Result<Vec<TransactionInfo>, FetchError> {
        let endpoint = Arc::clone(&self.endpoint);
        let page_limit = self.config.page_limit;
        tokio::task::spawn_blocking(move || {
            transactions_from_pages(endpoint.as_ref(), height, page_limit)
        })
        .await
        .map_err(task_error)?
    }

    async fn events_via_cache(&self, height: u32) -> Result<Vec<EventRecord>, FetchError> {
        let endpoint = Arc::clone(&self.endpoint);
        let cache = Arc::clone(&self.events_cache);
        let page_limit = self.config.page_limit;
        let cached = tokio::task::spawn_blocking(move || {
            cache.get_events(endpoint.as_ref(), height, page_limit).map_err(|error| {
                match error {
                    FetchError::Rpc(rpc) if rpc.kind.is_pruned() => {
                        FetchError::Rpc(describe_pruned_events(rpc, height, endpoint.as_ref()))
                    }
                    other => other,
                }
            })
        })
        .await
        .map_err(task_error)??;
        Ok(cached.events)
    }
}

/// Chain-agnostic face of the fetcher for pollers and workers.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn fetch_blocks(&self, heights: &[u32]) -> Result<Vec<LedgerBlock>, FetchError>;

    async fn latest_height(&self) -> Result<u32, FetchError>;

    /// Ledgers are final at close, so the finalized height is the latest.
    async fn finalized_height(&self) -> Result<u32, FetchError> {
        self.latest_height().await
    }
}

#[async_trait]
impl BlockSource for LedgerFetcher {
    async fn fetch_blocks(&self, heights: &[u32]) -> Result<Vec<LedgerBlock>, FetchError> {
        LedgerFetcher::fetch_blocks(self, heights).await
    }

    async fn latest_height(&self) -> Result<u32, FetchError> {
        self.latest_sequence().await
    }
}

fn has_invoke_host_function(transactions: &[TransactionInfo]) -> bool {
    transactions.iter().any(|tx| tx.envelope.has_invoke_host_function())
}

fn task_error(error: tokio::task::JoinError) -> FetchError {
    FetchError::Task { message: error.to_string() }
}

fn describe_pruned_ledger(error: RpcError, height: u32) -> FetchError {
    if error.kind == RpcErrorKind::PrunedLedgerTooOld {
        return FetchError::Rpc(error.with_message(format!(
            "The requested ledger number {} is not available on the current blockchain node. \
             This is because you're trying to access a ledger that is older than the oldest \
             ledger stored in this node. To resolve this issue, you can either: \
             1. Increase the start ledger to a more recent one, or \
             2. Connect to a different node that might have a longer history of ledgers.",
            height
        )));
    }
    FetchError::Rpc(error)
}

/// Rewrite a pruned `getEvents` failure into guidance. The too-new shape
/// names the endpoint's latest sequence when it can still be fetched.
fn describe_pruned_events(error: RpcError, height: u32, endpoint: &dyn LedgerEndpoint) -> RpcError {
    match error.kind {
        RpcErrorKind::PrunedLedgerTooOld => error.with_message(format!(
            "The requested events for ledger number {} are not available on the current node. \
             This is because you're trying to access a ledger that is older than the oldest \
             ledger stored in this node. To resolve this issue, you can either: \
             1. Increase the start ledger to a more recent one, or \
             2. Connect to a different node that might have a longer history of ledgers.",
            height
        )),
        RpcErrorKind::PrunedLedgerTooNew => {
            let latest = endpoint.get_latest_ledger().map(|l| l.sequence).ok();
            let message = match latest {
                Some(latest) => format!(
                    "The requested events for ledger number {} are not available on the \
                     current node. This is because you're trying to access a ledger that is \
                     after the latest ledger number {} stored in this node. To resolve this \
                     issue, please check your endpoint node start height.",
                    height, latest
                ),
                None => format!(
                    "The requested events for ledger number {} are not available on the \
                     current node. This is because you're trying to access a ledger that is \
                     after the latest ledger stored in this node. To resolve this issue, \
                     please check your endpoint node start height.",
                    height
                ),
            };
            error.with_message(message)
        }
        _ => error,
    }
}
