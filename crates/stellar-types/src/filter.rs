//! Subscription filter shapes.
//!
//! A handler subscribes at one granularity (block, transaction, operation,
//! or event) with an optional filter. Every filter field is optional and an
//! unset field matches everything, so the empty filter passes all items of
//! its granularity.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Block,
    Transaction,
    Operation,
    Event,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockFilter {
    /// Pass only ledgers whose sequence is divisible by this value.
    pub modulo: Option<u32>,
    /// Accepted for subscription compatibility; not evaluated.
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionFilter {
    /// Source account address the transaction must be paid for by.
    pub account: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationFilter {
    /// Operation type name, e.g. `invoke_host_function`.
    #[serde(rename = "type")]
    pub op_type: Option<String>,
    /// Effective source account: the operation's own override, or the
    /// enclosing transaction's source when the operation has none.
    pub source_account: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventFilter {
    pub contract_id: Option<String>,
    /// Positional topic patterns, at most four are consulted. An empty
    /// string in a slot is a wildcard for that position.
    pub topics: Option<Vec<String>>,
}

/// A filter tagged with the granularity it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HandlerFilter {
    Block(BlockFilter),
    Transaction(TransactionFilter),
    Operation(OperationFilter),
    Event(EventFilter),
}

impl HandlerFilter {
    pub fn kind(&self) -> HandlerKind {
        match self {
            HandlerFilter::Block(_) => HandlerKind::Block,
            HandlerFilter::Transaction(_) => HandlerKind::Transaction,
            HandlerFilter::Operation(_) => HandlerKind::Operation,
            HandlerFilter::Event(_) => HandlerKind::Event,
        }
    }
}
