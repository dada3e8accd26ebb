//! Model records produced by ingestion.
//!
//! These are the strategy-independent shapes: whether a transaction was
//! reconstructed from ledger close metadata or re-fetched from the
//! endpoint's transaction pages, it lands in the same [`TransactionInfo`],
//! and events from either path land in the same [`EventRecord`].

use serde::{Deserialize, Serialize};

use crate::toid::AFTER_ALL_TX_INDEX;
use crate::xdr::{
    ContractEvent, DiagnosticEvent, ScVal, TransactionEnvelope, TransactionEvent, TransactionMeta,
    TransactionResult, EVENT_STAGE_AFTER_ALL_TXS, EVENT_STAGE_AFTER_TX,
    EVENT_STAGE_BEFORE_ALL_TXS,
};

/// Terminal status of an applied transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
}

impl TransactionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionStatus::Success)
    }
}

/// Whether an event was emitted by a contract or by the chain itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Contract,
    System,
}

/// When in the ledger close an event applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStage {
    BeforeAllTxs,
    AfterTx,
    AfterAllTxs,
}

impl EventStage {
    /// Interpret a wire stage discriminant. `None` for values this library
    /// does not know, which callers must treat as an error rather than
    /// guessing an ordering.
    pub fn from_wire(stage: u32) -> Option<Self> {
        match stage {
            EVENT_STAGE_BEFORE_ALL_TXS => Some(EventStage::BeforeAllTxs),
            EVENT_STAGE_AFTER_TX => Some(EventStage::AfterTx),
            EVENT_STAGE_AFTER_ALL_TXS => Some(EventStage::AfterAllTxs),
            _ => None,
        }
    }

    /// Recover the stage from a record's transaction index. Index zero is
    /// the pre-apply bucket and the sentinel index is the post-apply
    /// bucket; every real transaction index means the event applied with
    /// that transaction.
    pub fn for_transaction_index(tx_index: u32) -> Self {
        match tx_index {
            0 => EventStage::BeforeAllTxs,
            AFTER_ALL_TX_INDEX => EventStage::AfterAllTxs,
            _ => EventStage::AfterTx,
        }
    }
}

/// One emitted event, in the shape the events endpoint serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub ledger: u32,
    /// ISO-8601 close time with seconds precision.
    pub ledger_closed_at: String,
    /// TOID-derived id: 19-digit TOID, a dash, a 10-digit event counter.
    pub id: String,
    pub operation_index: u32,
    pub transaction_index: u32,
    pub tx_hash: String,
    pub in_successful_contract_call: bool,
    pub topic: Vec<ScVal>,
    pub value: ScVal,
    pub contract_id: Option<String>,
    pub stage: EventStage,
}

/// Events grouped the way transaction metadata carries them: one
/// transaction-level stream and one stream per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEventSet {
    pub transaction_events: Vec<TransactionEvent>,
    pub contract_events: Vec<Vec<ContractEvent>>,
}

impl TransactionEventSet {
    pub fn from_meta(meta: &TransactionMeta) -> Self {
        let v4 = meta.as_v4();
        TransactionEventSet {
            transaction_events: v4.events.clone(),
            contract_events: v4.operations.iter().map(|op| op.events.clone()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_events.is_empty() && self.contract_events.iter().all(Vec::is_empty)
    }
}

/// A fully reconstructed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub status: TransactionStatus,
    /// Hex-encoded deterministic transaction hash.
    pub tx_hash: String,
    pub ledger: u32,
    /// Ledger close time in epoch seconds.
    pub created_at: u64,
    /// One-based position in the ledger's apply order.
    pub application_order: u32,
    pub fee_bump: bool,
    pub envelope: TransactionEnvelope,
    pub result: TransactionResult,
    pub result_meta: TransactionMeta,
    pub events: TransactionEventSet,
    pub diagnostic_events: Option<Vec<DiagnosticEvent>>,
}

impl TransactionInfo {
    pub fn succeeded(&self) -> bool {
        self.status.is_success()
    }
}
