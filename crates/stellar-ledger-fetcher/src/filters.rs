//! Filter evaluation for subscribed handlers.
//!
//! Each predicate returns `true` when the item should be delivered. Unset
//! filter fields match everything, so the empty filter is pass-all. The
//! dispatch entry point is [`filter_data`], which pairs a handler's filter
//! with the item kind it subscribed to; mismatched kinds never match.

use stellar_ingest_types::filter::{
    BlockFilter, EventFilter, HandlerFilter, OperationFilter, TransactionFilter,
};
use stellar_ingest_types::records::EventRecord;

use crate::block::{Ledger, LedgerBlock, Operation, Transaction};

/// Keep a ledger when its sequence is divisible by the filter's modulo.
///
/// A zero modulo is treated as unset. Timestamp schedules are the
/// scheduler's concern and are not evaluated here.
pub fn filter_block(ledger: &Ledger, filter: &BlockFilter) -> bool {
    if let Some(modulo) = filter.modulo {
        if modulo != 0 && ledger.sequence % modulo != 0 {
            return false;
        }
    }
    true
}

/// Keep a transaction when its envelope source matches the filter account.
pub fn filter_transaction(transaction: &Transaction, filter: &TransactionFilter) -> bool {
    match &filter.account {
        Some(account) => *account == transaction.info.envelope.source_account_address(),
        None => true,
    }
}

/// Keep an operation by type name and effective source account.
///
/// The effective source is the operation's own override, or the owning
/// transaction's source when the operation has none.
pub fn filter_operation(
    operation: &Operation,
    transaction: &Transaction,
    filter: &OperationFilter,
) -> bool {
    if let Some(op_type) = &filter.op_type {
        if op_type.as_str() != operation.body.type_name() {
            return false;
        }
    }
    if let Some(source) = &filter.source_account {
        let effective = operation
            .source_account
            .clone()
            .unwrap_or_else(|| transaction.info.envelope.source_account_address());
        if *source != effective {
            return false;
        }
    }
    true
}

/// Keep an event by scoping address, contract id, and positional topics.
///
/// The scoping address comes from the handler's subscription, not the
/// filter body, and compares case-insensitively against the event's
/// contract address; system events (no contract) never match a scoped
/// handler. Topic slots compare against the native rendering of the
/// event's topics; an empty string in a slot is a wildcard, and at most
/// four slots are consulted.
pub fn filter_event(event: &EventRecord, filter: &EventFilter, address: Option<&str>) -> bool {
    if let Some(address) = address {
        match &event.contract_id {
            Some(contract) if contract.eq_ignore_ascii_case(address) => {}
            _ => return false,
        }
    }
    if let Some(contract_id) = &filter.contract_id {
        if event.contract_id.as_deref() != Some(contract_id.as_str()) {
            return false;
        }
    }
    if let Some(topics) = &filter.topics {
        for (slot, wanted) in topics.iter().take(4).enumerate() {
            if wanted.is_empty() {
                continue;
            }
            match event.topic.get(slot) {
                Some(topic) if topic.to_native_string() == *wanted => {}
                _ => return false,
            }
        }
    }
    true
}

/// One deliverable item, borrowed from an assembled block.
#[derive(Debug, Clone, Copy)]
pub enum HandlerData<'a> {
    Block(&'a LedgerBlock),
    Transaction(&'a Transaction),
    Operation { operation: &'a Operation, transaction: &'a Transaction },
    Event(&'a EventRecord),
}

/// Evaluate a handler's filter against one item.
pub fn filter_data(data: &HandlerData<'_>, filter: &HandlerFilter, address: Option<&str>) -> bool {
    match (data, filter) {
        (HandlerData::Block(block), HandlerFilter::Block(f)) => filter_block(&block.ledger, f),
        (HandlerData::Transaction(tx), HandlerFilter::Transaction(f)) => filter_transaction(tx, f),
        (HandlerData::Operation { operation, transaction }, HandlerFilter::Operation(f)) => {
            filter_operation(operation, transaction, f)
        }
        (HandlerData::Event(event), HandlerFilter::Event(f)) => filter_event(event, f, address),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use stellar_ingest_types::records::{
        EventStage, EventType, TransactionEventSet, TransactionInfo, TransactionStatus,
    };
    use stellar_ingest_types::strkey;
    use stellar_ingest_types::toid::Toid;
    use stellar_ingest_types::xdr::{
        Hash, LedgerHeader, Memo, MuxedAccount, Operation as OperationXdr, OperationBody,
        PaymentOp, ScAddress, ScVal, Transaction as TransactionXdr, TransactionEnvelope,
        TransactionMeta, TransactionMetaV4, TransactionResult, TransactionResultCode,
        TransactionV1Envelope,
    };

    fn ledger(sequence: u32) -> Ledger {
        Ledger {
            sequence,
            hash: "00".repeat(32),
            previous_hash: "11".repeat(32),
            close_time: 0,
            protocol_version: 23,
            header: LedgerHeader::default(),
            metadata: None,
        }
    }

    fn transaction(source: [u8; 32]) -> Transaction {
        let envelope = TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: TransactionXdr {
                source_account: MuxedAccount::Ed25519(source),
                fee: 100,
                seq_num: 1,
                time_bounds: None,
                memo: Memo::None,
                operations: vec![],
            },
            signatures: vec![],
        });
        let info = TransactionInfo {
            status: TransactionStatus::Success,
            tx_hash: "aa".repeat(32),
            ledger: 7,
            created_at: 0,
            application_order: 1,
            fee_bump: false,
            envelope,
            result: TransactionResult {
                fee_charged: 100,
                result: TransactionResultCode::Success,
            },
            result_meta: TransactionMeta::V4(TransactionMetaV4 {
                events: vec![],
                operations: vec![],
                diagnostic_events: vec![],
            }),
            events: TransactionEventSet {
                transaction_events: vec![],
                contract_events: vec![],
            },
            diagnostic_events: None,
        };
        Transaction { info, operations: vec![], events: vec![] }
    }

    fn operation(source: Option<[u8; 32]>) -> Operation {
        Operation {
            index: 0,
            ledger: 7,
            tx_hash: "aa".repeat(32),
            source_account: source.map(|s| MuxedAccount::Ed25519(s).address()),
            body: OperationBody::Payment(PaymentOp {
                destination: MuxedAccount::Ed25519([9; 32]),
                amount: 5,
            }),
        }
    }

    fn transfer_event(contract: [u8; 32]) -> EventRecord {
        EventRecord {
            event_type: EventType::Contract,
            ledger: 7,
            ledger_closed_at: "2022-11-16T16:10:41Z".into(),
            id: Toid::new(7, 1, 0).event_id(0),
            operation_index: 0,
            transaction_index: 1,
            tx_hash: "aa".repeat(32),
            in_successful_contract_call: true,
            topic: vec![
                ScVal::Symbol("transfer".into()),
                ScVal::Address(ScAddress::Contract(Hash(contract))),
            ],
            value: ScVal::I64(100),
            contract_id: Some(strkey::encode_contract(&contract)),
            stage: EventStage::AfterTx,
        }
    }

    #[test]
    fn block_modulo_keeps_multiples_only() {
        let filter = BlockFilter { modulo: Some(2), timestamp: None };
        assert!(!filter_block(&ledger(5), &filter));
        assert!(filter_block(&ledger(4), &filter));
        assert!(filter_block(&ledger(5), &BlockFilter::default()));
        assert!(filter_block(&ledger(5), &BlockFilter { modulo: Some(0), timestamp: None }));
    }

    #[test]
    fn transaction_account_matches_envelope_source() {
        let tx = transaction([1; 32]);
        let address = MuxedAccount::Ed25519([1; 32]).address();
        assert!(filter_transaction(&tx, &TransactionFilter { account: Some(address) }));
        assert!(!filter_transaction(
            &tx,
            &TransactionFilter { account: Some(MuxedAccount::Ed25519([2; 32]).address()) },
        ));
        assert!(filter_transaction(&tx, &TransactionFilter::default()));
    }

    #[test]
    fn operation_source_falls_back_to_transaction() {
        let tx = transaction([1; 32]);
        let tx_source = MuxedAccount::Ed25519([1; 32]).address();
        let own_source = MuxedAccount::Ed25519([5; 32]).address();

        let no_override = operation(None);
        let with_override = operation(Some([5; 32]));

        let want_tx = OperationFilter { op_type: None, source_account: Some(tx_source) };
        assert!(filter_operation(&no_override, &tx, &want_tx));
        assert!(!filter_operation(&with_override, &tx, &want_tx));

        let want_own = OperationFilter { op_type: None, source_account: Some(own_source) };
        assert!(filter_operation(&with_override, &tx, &want_own));
    }

    #[test]
    fn operation_type_name_must_match() {
        let tx = transaction([1; 32]);
        let op = operation(None);
        let payment = OperationFilter { op_type: Some("payment".into()), source_account: None };
        assert!(filter_operation(&op, &tx, &payment));
        let invoke = OperationFilter {
            op_type: Some("invoke_host_function".into()),
            source_account: None,
        };
        assert!(!filter_operation(&op, &tx, &invoke));
    }

    #[test]
    fn event_topics_compare_positionally() {
        let contract = [0xC0; 32];
        let event = transfer_event(contract);
        let contract_address = strkey::encode_contract(&contract);

        let transfer = EventFilter {
            contract_id: None,
            topics: Some(vec!["transfer".into(), contract_address.clone()]),
        };
        assert!(filter_event(&event, &transfer, None));

        let swap = EventFilter {
            contract_id: None,
            topics: Some(vec!["swap".into(), contract_address]),
        };
        assert!(!filter_event(&event, &swap, None));

        let wildcard_first = EventFilter {
            contract_id: None,
            topics: Some(vec![String::new(), String::new()]),
        };
        assert!(filter_event(&event, &wildcard_first, None));

        let too_many_slots = EventFilter {
            contract_id: None,
            topics: Some(vec!["transfer".into(), String::new(), "extra".into()]),
        };
        assert!(!filter_event(&event, &too_many_slots, None));
    }

    #[test]
    fn event_scoping_address_is_case_insensitive() {
        let contract = [0xC0; 32];
        let event = transfer_event(contract);
        let address = strkey::encode_contract(&contract);

        assert!(filter_event(&event, &EventFilter::default(), Some(address.as_str())));
        assert!(filter_event(
            &event,
            &EventFilter::default(),
            Some(address.to_ascii_lowercase().as_str()),
        ));
        assert!(!filter_event(
            &event,
            &EventFilter::default(),
            Some(strkey::encode_contract(&[0xC1; 32]).as_str()),
        ));

        let mut system = transfer_event(contract);
        system.contract_id = None;
        assert!(!filter_event(&system, &EventFilter::default(), Some(address.as_str())));
    }

    #[test]
    fn dispatch_rejects_mismatched_kinds() {
        let tx = transaction([1; 32]);
        let block_filter = HandlerFilter::Block(BlockFilter::default());
        assert!(!filter_data(&HandlerData::Transaction(&tx), &block_filter, None));

        let tx_filter = HandlerFilter::Transaction(TransactionFilter::default());
        assert!(filter_data(&HandlerData::Transaction(&tx), &tx_filter, None));
    }
}
