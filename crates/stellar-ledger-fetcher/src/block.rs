//! Assembled ledger blocks.
//!
//! A [`LedgerBlock`] is the cross-linked object graph for one closed
//! ledger: the ledger record owns its transactions, each transaction owns
//! its decoded operations and the events attributed to it, and events
//! point back at their operation by index. Child records reference their
//! parents by identifier (ledger sequence, transaction hash, operation
//! index) rather than by owning handles, so the graph serializes cleanly.

use stellar_ingest_types::records::{EventRecord, TransactionInfo};
use stellar_ingest_types::xdr::{
    LedgerCloseMeta, LedgerHeader, LedgerHeaderHistoryEntry, OperationBody, ReadXdr,
};
use stellar_transport::rpc::LedgerInfo;

use crate::error::FetchError;

/// Minimal chain-agnostic view of a ledger: height, own hash, parent
/// hash, and close time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u32,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp_ms: u64,
}

impl BlockHeader {
    /// Project a header from a raw `getLedgers` record without assembling
    /// the full block.
    pub fn from_info(info: &LedgerInfo) -> Result<Self, FetchError> {
        let entry = LedgerHeaderHistoryEntry::from_xdr_base64(&info.header_xdr)?;
        Ok(BlockHeader {
            height: info.sequence,
            hash: info.hash.clone(),
            parent_hash: entry.header.previous_ledger_hash.to_hex(),
            timestamp_ms: entry.header.close_time_ms(),
        })
    }
}

/// A closed ledger with its decoded header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    pub sequence: u32,
    pub hash: String,
    pub previous_hash: String,
    pub close_time: u64,
    pub protocol_version: u32,
    pub header: LedgerHeader,
    /// Close metadata, when the endpoint served it.
    pub metadata: Option<LedgerCloseMeta>,
}

/// One operation inside a transaction.
///
/// `source_account` is the operation's own override only; callers fall
/// back to the transaction source when it is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// 0-based position within the owning transaction.
    pub index: u32,
    pub ledger: u32,
    pub tx_hash: String,
    pub source_account: Option<String>,
    pub body: OperationBody,
}

/// A reconstructed transaction with its operations and events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub info: TransactionInfo,
    pub operations: Vec<Operation>,
    pub events: Vec<EventRecord>,
}

/// The assembled graph for one ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerBlock {
    pub ledger: Ledger,
    pub transactions: Vec<Transaction>,
    /// All of the ledger's events in extraction order.
    pub events: Vec<EventRecord>,
}

impl LedgerBlock {
    /// Build the block graph from its fetched parts.
    ///
    /// `transactions` must already be in application order; events are
    /// attributed to transactions by hash, preserving their order.
    pub fn assemble(
        info: &LedgerInfo,
        metadata: Option<LedgerCloseMeta>,
        transactions: Vec<TransactionInfo>,
        events: Vec<EventRecord>,
    ) -> Result<Self, FetchError> {
        let entry = LedgerHeaderHistoryEntry::from_xdr_base64(&info.header_xdr)?;
        let ledger = Ledger {
            sequence: info.sequence,
            hash: info.hash.clone(),
            previous_hash: entry.header.previous_ledger_hash.to_hex(),
            close_time: info.ledger_close_time,
            protocol_version: entry.header.ledger_version,
            header: entry.header,
            metadata,
        };

        let transactions = transactions
            .into_iter()
            .map(|tx| {
                let operations = tx
                    .envelope
                    .operations()
                    .iter()
                    .enumerate()
                    .map(|(index, op)| Operation {
                        index: index as u32,
                        ledger: tx.ledger,
                        tx_hash: tx.tx_hash.clone(),
                        source_account: op.source_account.as_ref().map(|a| a.address()),
                        body: op.body.clone(),
                    })
                    .collect();
                let tx_events =
                    events.iter().filter(|e| e.tx_hash == tx.tx_hash).cloned().collect();
                Transaction { info: tx, operations, events: tx_events }
            })
            .collect();

        Ok(LedgerBlock { ledger, transactions, events })
    }

    /// Header projection of the assembled ledger.
    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            height: self.ledger.sequence,
            hash: self.ledger.hash.clone(),
            parent_hash: self.ledger.previous_hash.clone(),
            timestamp_ms: self.ledger.header.close_time_ms(),
        }
    }

    /// All operations across all transactions, in application order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.transactions.iter().flat_map(|tx| tx.operations.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use stellar_ingest_types::records::{
        EventStage, EventType, TransactionEventSet, TransactionStatus,
    };
    use stellar_ingest_types::toid::Toid;
    use stellar_ingest_types::xdr::{
        CreateAccountOp, Hash, Memo, MuxedAccount, Operation as OperationXdr, PaymentOp,
        ScVal, StellarValue, Transaction as TransactionXdr, TransactionEnvelope,
        TransactionMeta, TransactionMetaV4, TransactionResult, TransactionResultCode,
        TransactionV1Envelope, WriteXdr,
    };

    fn empty_meta() -> TransactionMeta {
        TransactionMeta::V4(TransactionMetaV4 {
            events: vec![],
            operations: vec![],
            diagnostic_events: vec![],
        })
    }

    fn header_xdr(sequence: u32, previous: Hash, close_time: u64) -> String {
        LedgerHeaderHistoryEntry {
            hash: Hash([7; 32]),
            header: LedgerHeader {
                ledger_version: 23,
                previous_ledger_hash: previous,
                scp_value: StellarValue { tx_set_hash: Hash([3; 32]), close_time },
                ledger_seq: sequence,
                ..LedgerHeader::default()
            },
        }
        .to_xdr_base64()
    }

    fn ledger_info(sequence: u32) -> LedgerInfo {
        LedgerInfo {
            sequence,
            hash: "ab".repeat(32),
            ledger_close_time: 1_668_615_041,
            header_xdr: header_xdr(sequence, Hash([0xAA; 32]), 1_668_615_041),
            metadata_xdr: None,
        }
    }

    fn tx_info(sequence: u32, application_order: u32, operations: Vec<OperationXdr>) -> TransactionInfo {
        let envelope = TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: TransactionXdr {
                source_account: MuxedAccount::Ed25519([application_order as u8; 32]),
                fee: 100,
                seq_num: application_order as i64,
                time_bounds: None,
                memo: Memo::None,
                operations,
            },
            signatures: vec![],
        });
        TransactionInfo {
            status: TransactionStatus::Success,
            tx_hash: format!("{:064}", application_order),
            ledger: sequence,
            created_at: 1_668_615_041,
            application_order,
            fee_bump: false,
            envelope,
            result: TransactionResult {
                fee_charged: 100,
                result: TransactionResultCode::Success,
            },
            result_meta: empty_meta(),
            events: TransactionEventSet {
                transaction_events: vec![],
                contract_events: vec![],
            },
            diagnostic_events: None,
        }
    }

    fn event(sequence: u32, tx_index: u32, op_index: u32, tx_hash: &str) -> EventRecord {
        let toid = Toid::new(sequence, tx_index, op_index);
        EventRecord {
            event_type: EventType::Contract,
            ledger: sequence,
            ledger_closed_at: "2022-11-16T16:10:41Z".into(),
            id: toid.event_id(0),
            operation_index: op_index,
            transaction_index: tx_index,
            tx_hash: tx_hash.into(),
            in_successful_contract_call: true,
            topic: vec![ScVal::Symbol("transfer".into())],
            value: ScVal::I64(1),
            contract_id: None,
            stage: EventStage::AfterTx,
        }
    }

    fn payment_op(source: Option<MuxedAccount>) -> OperationXdr {
        OperationXdr {
            source_account: source,
            body: OperationBody::Payment(PaymentOp {
                destination: MuxedAccount::Ed25519([9; 32]),
                amount: 5,
            }),
        }
    }

    fn create_account_op() -> OperationXdr {
        OperationXdr {
            source_account: None,
            body: OperationBody::CreateAccount(CreateAccountOp {
                destination: stellar_ingest_types::xdr::PublicKey::Ed25519([8; 32]),
                starting_balance: 10,
            }),
        }
    }

    #[test]
    fn assembles_cross_linked_graph() {
        let info = ledger_info(42);
        let txs = vec![
            tx_info(42, 1, vec![create_account_op(), payment_op(None)]),
            tx_info(42, 2, vec![payment_op(Some(MuxedAccount::Ed25519([5; 32])))]),
        ];
        let tx1_hash = txs[0].tx_hash.clone();
        let tx2_hash = txs[1].tx_hash.clone();
        let events = vec![
            event(42, 1, 1, &tx1_hash),
            event(42, 2, 0, &tx2_hash),
        ];

        let block = LedgerBlock::assemble(&info, None, txs, events).unwrap();

        assert_eq!(block.ledger.sequence, 42);
        assert_eq!(block.ledger.previous_hash, Hash([0xAA; 32]).to_hex());
        assert_eq!(block.ledger.protocol_version, 23);
        assert!(block.ledger.metadata.is_none());

        assert_eq!(block.transactions.len(), 2);
        let first = &block.transactions[0];
        assert_eq!(first.operations.len(), 2);
        assert_eq!(first.operations[0].index, 0);
        assert_eq!(first.operations[1].index, 1);
        assert_eq!(first.operations[0].tx_hash, tx1_hash);
        assert_eq!(first.operations[0].ledger, 42);
        assert_eq!(first.events.len(), 1);
        assert_eq!(first.events[0].operation_index, 1);

        let second = &block.transactions[1];
        assert_eq!(second.events.len(), 1);
        assert_eq!(second.events[0].tx_hash, tx2_hash);

        assert_eq!(block.events.len(), 2);
        assert_eq!(block.operations().count(), 3);
    }

    #[test]
    fn operation_keeps_only_its_own_source_override() {
        let info = ledger_info(42);
        let own = MuxedAccount::Ed25519([5; 32]);
        let txs = vec![tx_info(42, 1, vec![payment_op(Some(own.clone())), payment_op(None)])];

        let block = LedgerBlock::assemble(&info, None, txs, vec![]).unwrap();
        let ops = &block.transactions[0].operations;
        assert_eq!(ops[0].source_account.as_deref(), Some(own.address().as_str()));
        assert_eq!(ops[1].source_account, None);
    }

    #[test]
    fn header_projection_uses_decoded_parent_and_milliseconds() {
        let info = ledger_info(42);
        let block = LedgerBlock::assemble(&info, None, vec![], vec![]).unwrap();
        let header = block.header();
        assert_eq!(header.height, 42);
        assert_eq!(header.hash, info.hash);
        assert_eq!(header.parent_hash, Hash([0xAA; 32]).to_hex());
        assert_eq!(header.timestamp_ms, 1_668_615_041_000);

        assert_eq!(BlockHeader::from_info(&info).unwrap(), header);
    }

    #[test]
    fn malformed_header_xdr_is_a_decode_error() {
        let mut info = ledger_info(42);
        info.header_xdr = "AAAA".into();
        let err = LedgerBlock::assemble(&info, None, vec![], vec![]).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
