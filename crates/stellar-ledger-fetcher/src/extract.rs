//! Ledger event extraction from decoded transaction metadata.
//!
//! Under the metadata strategy no `getEvents` call is made; the ledger's
//! event list is minted here from the per-transaction event streams. The
//! output records are field-for-field the shape the events endpoint
//! serves, so downstream consumers cannot tell which acquisition path
//! produced a record.

use chrono::SecondsFormat;

use stellar_ingest_types::records::{EventRecord, EventStage, EventType, TransactionInfo};
use stellar_ingest_types::strkey;
use stellar_ingest_types::xdr::{
    ContractEvent, EVENT_STAGE_AFTER_ALL_TXS, EVENT_STAGE_AFTER_TX, EVENT_STAGE_BEFORE_ALL_TXS,
};
use stellar_ingest_types::{Toid, AFTER_ALL_TX_INDEX};

use crate::error::FetchError;

/// Ledger close time as an ISO-8601 string with seconds precision.
pub fn close_time_iso(close_time: u64) -> String {
    chrono::DateTime::from_timestamp(close_time as i64, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| close_time.to_string())
}

/// Mint the ledger's ordered event list from its reconstructed
/// transactions.
///
/// Output order is the apply order: the before-all bucket (transactions
/// in application order), then per-transaction events (operation slots
/// ascending, then the transaction-scoped stream), then the after-all
/// bucket. The before-all and per-transaction buckets share one event
/// counter; the after-all bucket counts independently. An unknown stage
/// discriminant fails the whole ledger before any record escapes.
pub fn extract_ledger_events(
    transactions: &[TransactionInfo],
    sequence: u32,
    closed_at: &str,
) -> Result<Vec<EventRecord>, FetchError> {
    let mut records = Vec::new();
    let mut shared_seq: u32 = 0;

    // First pass doubles as stage validation for every transaction-level
    // event in the ledger.
    for tx in transactions {
        for event in &tx.events.transaction_events {
            match event.stage {
                EVENT_STAGE_BEFORE_ALL_TXS => {
                    records.push(make_record(
                        &event.event,
                        tx,
                        sequence,
                        closed_at,
                        0,
                        0,
                        shared_seq,
                        EventStage::BeforeAllTxs,
                    ));
                    shared_seq += 1;
                }
                EVENT_STAGE_AFTER_TX | EVENT_STAGE_AFTER_ALL_TXS => {}
                stage => return Err(FetchError::UnsupportedStage { stage }),
            }
        }
    }

    for tx in transactions {
        for (slot, op_events) in tx.events.contract_events.iter().enumerate() {
            for event in op_events {
                records.push(make_record(
                    event,
                    tx,
                    sequence,
                    closed_at,
                    tx.application_order,
                    slot as u32,
                    shared_seq,
                    EventStage::AfterTx,
                ));
                shared_seq += 1;
            }
        }
        for event in &tx.events.transaction_events {
            if event.stage == EVENT_STAGE_AFTER_TX {
                records.push(make_record(
                    &event.event,
                    tx,
                    sequence,
                    closed_at,
                    tx.application_order,
                    0,
                    shared_seq,
                    EventStage::AfterTx,
                ));
                shared_seq += 1;
            }
        }
    }

    let mut after_all_seq: u32 = 0;
    for tx in transactions {
        for event in &tx.events.transaction_events {
            if event.stage == EVENT_STAGE_AFTER_ALL_TXS {
                records.push(make_record(
                    &event.event,
                    tx,
                    sequence,
                    closed_at,
                    AFTER_ALL_TX_INDEX,
                    0,
                    after_all_seq,
                    EventStage::AfterAllTxs,
                ));
                after_all_seq += 1;
            }
        }
    }

    Ok(records)
}

#[allow(clippy::too_many_arguments)]
fn make_record(
    event: &ContractEvent,
    tx: &TransactionInfo,
    sequence: u32,
    closed_at: &str,
    tx_index: u32,
    op_index: u32,
    event_seq: u32,
    stage: EventStage,
) -> EventRecord {
    let contract_id = event.contract_id.as_ref().map(|h| strkey::encode_contract(&h.0));
    let event_type =
        if contract_id.is_some() { EventType::Contract } else { EventType::System };
    EventRecord {
        event_type,
        ledger: sequence,
        ledger_closed_at: closed_at.to_string(),
        id: Toid::new(sequence, tx_index, op_index).event_id(event_seq),
        operation_index: op_index,
        transaction_index: tx_index,
        tx_hash: tx.tx_hash.clone(),
        in_successful_contract_call: tx.succeeded(),
        topic: event.topics().to_vec(),
        value: event.data().clone(),
        contract_id,
        stage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use stellar_ingest_types::records::{TransactionEventSet, TransactionStatus};
    use stellar_ingest_types::xdr::{
        ContractEventBody, ContractEventV0, Hash, Memo, MuxedAccount, OperationMetaV2, ScVal,
        Transaction, TransactionEnvelope, TransactionEvent, TransactionMeta, TransactionMetaV4,
        TransactionResult, TransactionResultCode, TransactionV1Envelope,
    };

    fn contract_event(sym: &str, with_contract: bool) -> ContractEvent {
        ContractEvent {
            contract_id: with_contract.then(|| Hash([0xc0; 32])),
            body: ContractEventBody::V0(ContractEventV0 {
                topics: vec![ScVal::Symbol(sym.into())],
                data: ScVal::U64(9),
            }),
        }
    }

    fn tx_event(stage: u32, sym: &str) -> TransactionEvent {
        TransactionEvent { stage, event: contract_event(sym, false) }
    }

    fn fixture_tx(
        application_order: u32,
        status: TransactionStatus,
        tx_events: Vec<TransactionEvent>,
        op_events: Vec<Vec<ContractEvent>>,
    ) -> TransactionInfo {
        let meta = TransactionMeta::V4(TransactionMetaV4 {
            events: tx_events,
            operations: op_events.into_iter().map(|events| OperationMetaV2 { events }).collect(),
            diagnostic_events: vec![],
        });
        TransactionInfo {
            status,
            tx_hash: format!("{:064x}", application_order),
            ledger: 77,
            created_at: 1_668_615_041,
            application_order,
            fee_bump: false,
            envelope: TransactionEnvelope::Tx(TransactionV1Envelope {
                tx: Transaction {
                    source_account: MuxedAccount::Ed25519([application_order as u8; 32]),
                    fee: 100,
                    seq_num: 1,
                    time_bounds: None,
                    memo: Memo::None,
                    operations: vec![],
                },
                signatures: vec![],
            }),
            result: TransactionResult {
                fee_charged: 100,
                result: match status {
                    TransactionStatus::Success => TransactionResultCode::Success,
                    TransactionStatus::Failed => TransactionResultCode::Failed,
                },
            },
            events: TransactionEventSet::from_meta(&meta),
            result_meta: meta,
            diagnostic_events: None,
        }
    }

    #[test]
    fn close_time_renders_iso_seconds() {
        assert_eq!(close_time_iso(1_668_615_041), "2022-11-16T16:10:41Z");
        assert_eq!(close_time_iso(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn buckets_order_and_counters() {
        // Two before-all events, three per-operation events, one
        // transaction-scoped after-tx event, one after-all event.
        let txs = vec![
            fixture_tx(
                1,
                TransactionStatus::Success,
                vec![tx_event(0, "fee"), tx_event(1, "refund")],
                vec![vec![contract_event("a", true), contract_event("b", true)], vec![]],
            ),
            fixture_tx(
                2,
                TransactionStatus::Success,
                vec![tx_event(0, "fee"), tx_event(2, "sweep")],
                vec![vec![contract_event("c", true)]],
            ),
        ];
        let records = extract_ledger_events(&txs, 77, "2022-11-16T16:10:41Z").unwrap();
        assert_eq!(records.len(), 7);

        // Before-all: transaction order, shared counter from zero.
        assert_eq!(records[0].transaction_index, 0);
        assert_eq!(records[0].id, Toid::new(77, 0, 0).event_id(0));
        assert_eq!(records[1].id, Toid::new(77, 0, 0).event_id(1));
        assert_eq!(records[0].stage, EventStage::BeforeAllTxs);

        // Per-operation events, then the transaction-scoped stream, with
        // the counter carried over.
        assert_eq!(records[2].id, Toid::new(77, 1, 0).event_id(2));
        assert_eq!(records[3].id, Toid::new(77, 1, 0).event_id(3));
        assert_eq!(records[4].id, Toid::new(77, 1, 0).event_id(4));
        assert_eq!(records[4].stage, EventStage::AfterTx);
        assert_eq!(records[5].id, Toid::new(77, 2, 0).event_id(5));

        // After-all: sentinel index, independent counter.
        assert_eq!(records[6].transaction_index, stellar_ingest_types::AFTER_ALL_TX_INDEX);
        assert_eq!(
            records[6].id,
            Toid::new(77, stellar_ingest_types::AFTER_ALL_TX_INDEX, 0).event_id(0)
        );
        assert_eq!(records[6].stage, EventStage::AfterAllTxs);

        // Identifier order is the list order.
        let mut ids: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
        let sorted = ids.clone();
        ids.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn operation_slots_ascend_within_transaction() {
        let txs = vec![fixture_tx(
            1,
            TransactionStatus::Success,
            vec![],
            vec![vec![contract_event("a", true)], vec![], vec![contract_event("b", true)]],
        )];
        let records = extract_ledger_events(&txs, 10, "1970-01-01T00:00:00Z").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].operation_index, 0);
        assert_eq!(records[1].operation_index, 2);
        assert_eq!(records[1].id, Toid::new(10, 1, 2).event_id(1));
    }

    #[test]
    fn unknown_stage_fails_whole_ledger() {
        let txs = vec![
            fixture_tx(1, TransactionStatus::Success, vec![tx_event(0, "fee")], vec![]),
            fixture_tx(2, TransactionStatus::Success, vec![tx_event(9, "mystery")], vec![]),
        ];
        let err = extract_ledger_events(&txs, 10, "1970-01-01T00:00:00Z").unwrap_err();
        assert_eq!(err, FetchError::UnsupportedStage { stage: 9 });
    }

    #[test]
    fn record_fields_mirror_transaction() {
        let txs = vec![fixture_tx(
            1,
            TransactionStatus::Failed,
            vec![],
            vec![vec![contract_event("a", true), contract_event("sys", false)]],
        )];
        let records = extract_ledger_events(&txs, 42, "2022-11-16T16:10:41Z").unwrap();

        let contract = &records[0];
        assert_eq!(contract.event_type, EventType::Contract);
        assert_eq!(
            contract.contract_id.as_deref(),
            Some(strkey::encode_contract(&[0xc0; 32]).as_str())
        );
        assert!(!contract.in_successful_contract_call);
        assert_eq!(contract.tx_hash, txs[0].tx_hash);
        assert_eq!(contract.ledger_closed_at, "2022-11-16T16:10:41Z");
        assert_eq!(contract.topic, vec![ScVal::Symbol("a".into())]);
        assert_eq!(contract.value, ScVal::U64(9));

        let system = &records[1];
        assert_eq!(system.event_type, EventType::System);
        assert!(system.contract_id.is_none());
    }
}
