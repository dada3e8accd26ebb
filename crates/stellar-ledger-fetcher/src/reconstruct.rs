//! Transaction reconstruction.
//!
//! Two strategies produce the same [`TransactionInfo`] records for a
//! ledger. The metadata strategy works entirely from the ledger's close
//! metadata: envelopes come from the transaction set in wire order,
//! results come from the processing list in apply order, and the two are
//! matched by deterministic transaction hash. The paginated strategy asks
//! the endpoint's `getTransactions` for the same records instead, for
//! endpoints that do not retain close metadata.

use std::collections::HashMap;

use stellar_ingest_types::records::{TransactionEventSet, TransactionInfo, TransactionStatus};
use stellar_ingest_types::xdr::{Hash, LedgerCloseMeta, TransactionEnvelope};
use stellar_transport::rpc::GetTransactionsRequest;

use crate::endpoint::LedgerEndpoint;
use crate::error::FetchError;

/// Rebuild a ledger's transactions from its close metadata.
///
/// The processing list drives the output: entry `i` becomes application
/// order `i + 1`. A processing hash with no matching envelope is a hard
/// failure; it means the metadata is internally inconsistent.
pub fn transactions_from_meta(
    meta: &LedgerCloseMeta,
    network_id: &Hash,
) -> Result<Vec<TransactionInfo>, FetchError> {
    let header = &meta.ledger_header().header;
    let sequence = header.ledger_seq;
    let close_time = header.scp_value.close_time;

    let mut by_hash: HashMap<Hash, &TransactionEnvelope> = HashMap::new();
    for envelope in meta.transaction_envelopes() {
        by_hash.insert(envelope.hash(network_id), envelope);
    }

    let mut transactions = Vec::with_capacity(meta.tx_processing().len());
    for (index, processing) in meta.tx_processing().iter().enumerate() {
        let tx_hash = processing.result.transaction_hash;
        let envelope = by_hash
            .remove(&tx_hash)
            .ok_or_else(|| FetchError::EnvelopeNotFound { tx_hash: tx_hash.to_hex() })?;

        let success = processing.result.result.result.is_success();
        let status =
            if success { TransactionStatus::Success } else { TransactionStatus::Failed };
        let events = TransactionEventSet::from_meta(&processing.tx_apply_processing);
        let diagnostics = &processing.tx_apply_processing.as_v4().diagnostic_events;
        let diagnostic_events =
            if diagnostics.is_empty() { None } else { Some(diagnostics.clone()) };

        transactions.push(TransactionInfo {
            status,
            tx_hash: tx_hash.to_hex(),
            ledger: sequence,
            created_at: close_time,
            application_order: (index + 1) as u32,
            // A fee bump that failed is reported as a plain transaction.
            fee_bump: envelope.is_fee_bump() && success,
            envelope: envelope.clone(),
            result: processing.result.result,
            result_meta: processing.tx_apply_processing.clone(),
            events,
            diagnostic_events,
        });
    }
    Ok(transactions)
}

/// Rebuild a ledger's transactions by paging `getTransactions`.
///
/// The first request carries the start ledger; follow-ups carry only the
/// cursor. Records from other ledgers are skipped, and paging stops as
/// soon as a page contributes nothing to the target ledger.
pub fn transactions_from_pages(
    endpoint: &dyn LedgerEndpoint,
    sequence: u32,
    page_limit: u32,
) -> Result<Vec<TransactionInfo>, FetchError> {
    let mut transactions = Vec::new();
    let mut request = GetTransactionsRequest {
        start_ledger: Some(sequence),
        cursor: None,
        limit: Some(page_limit),
    };

    loop {
        let page = endpoint.get_transactions(&request)?;
        let mut contributed = 0usize;
        for raw in &page.transactions {
            if raw.ledger != sequence {
                continue;
            }
            transactions.push(raw.decode()?);
            contributed += 1;
        }
        if contributed == 0 {
            break;
        }
        match page.cursor {
            Some(cursor) => {
                request = GetTransactionsRequest {
                    start_ledger: None,
                    cursor: Some(cursor),
                    limit: Some(page_limit),
                };
            }
            None => break,
        }
    }
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use stellar_ingest_types::xdr::{
        network_id, FeeBumpTransaction, FeeBumpTransactionEnvelope, GeneralizedTransactionSet,
        LedgerCloseMetaV1, LedgerHeader, LedgerHeaderHistoryEntry, Memo, MuxedAccount,
        StellarValue, Transaction, TransactionMeta, TransactionMetaV4, TransactionPhase,
        TransactionResult, TransactionResultCode, TransactionResultMeta, TransactionResultPair,
        TransactionSetV1, TransactionV1Envelope, WriteXdr,
    };
    use stellar_transport::rpc::{
        GetEventsRequest, GetEventsResponse, GetLatestLedgerResponse, GetLedgersRequest,
        GetLedgersResponse, GetNetworkResponse, GetTransactionsResponse, RawTransactionInfo,
    };
    use stellar_transport::RpcError;

    const PASSPHRASE: &str = "Test SDF Network ; September 2015";

    fn v1_envelope(key: u8, seq_num: i64) -> TransactionEnvelope {
        TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: Transaction {
                source_account: MuxedAccount::Ed25519([key; 32]),
                fee: 100,
                seq_num,
                time_bounds: None,
                memo: Memo::None,
                operations: vec![],
            },
            signatures: vec![],
        })
    }

    fn fee_bump_envelope(key: u8, inner: TransactionEnvelope) -> TransactionEnvelope {
        let inner = match inner {
            TransactionEnvelope::Tx(e) => e,
            _ => panic!("inner must be a current-form envelope"),
        };
        TransactionEnvelope::TxFeeBump(FeeBumpTransactionEnvelope {
            tx: FeeBumpTransaction {
                fee_source: MuxedAccount::Ed25519([key; 32]),
                fee: 400,
                inner_tx: inner,
            },
            signatures: vec![],
        })
    }

    fn empty_meta() -> TransactionMeta {
        TransactionMeta::V4(TransactionMetaV4 {
            events: vec![],
            operations: vec![],
            diagnostic_events: vec![],
        })
    }

    fn processing(envelope: &TransactionEnvelope, code: TransactionResultCode) -> TransactionResultMeta {
        let net = network_id(PASSPHRASE);
        TransactionResultMeta {
            result: TransactionResultPair {
                transaction_hash: envelope.hash(&net),
                result: TransactionResult { fee_charged: 100, result: code },
            },
            tx_apply_processing: empty_meta(),
        }
    }

    fn close_meta(
        sequence: u32,
        wire_order: Vec<TransactionEnvelope>,
        tx_processing: Vec<TransactionResultMeta>,
    ) -> LedgerCloseMeta {
        LedgerCloseMeta::V1(LedgerCloseMetaV1 {
            ledger_header: LedgerHeaderHistoryEntry {
                hash: Hash([sequence as u8; 32]),
                header: LedgerHeader {
                    ledger_seq: sequence,
                    scp_value: StellarValue {
                        tx_set_hash: Hash([2; 32]),
                        close_time: 1_668_615_041,
                    },
                    ..LedgerHeader::default()
                },
            },
            tx_set: GeneralizedTransactionSet::V1(TransactionSetV1 {
                previous_ledger_hash: Hash([1; 32]),
                phases: vec![TransactionPhase::V0(wire_order)],
            }),
            tx_processing,
        })
    }

    #[test]
    fn meta_strategy_matches_by_hash_across_orders() {
        let a = v1_envelope(1, 10);
        let b = v1_envelope(2, 20);
        let bump = fee_bump_envelope(3, v1_envelope(4, 40));

        // Wire order deliberately disagrees with apply order.
        let meta = close_meta(
            77,
            vec![bump.clone(), b.clone(), a.clone()],
            vec![
                processing(&a, TransactionResultCode::Success),
                processing(&b, TransactionResultCode::Failed),
                processing(&bump, TransactionResultCode::FeeBumpInnerSuccess),
            ],
        );

        let txs = transactions_from_meta(&meta, &network_id(PASSPHRASE)).unwrap();
        assert_eq!(txs.len(), 3);

        assert_eq!(txs[0].envelope, a);
        assert_eq!(txs[0].application_order, 1);
        assert_eq!(txs[0].status, TransactionStatus::Success);
        assert!(!txs[0].fee_bump);
        assert_eq!(txs[0].ledger, 77);
        assert_eq!(txs[0].created_at, 1_668_615_041);
        assert_eq!(txs[0].tx_hash, a.hash(&network_id(PASSPHRASE)).to_hex());

        assert_eq!(txs[1].envelope, b);
        assert_eq!(txs[1].status, TransactionStatus::Failed);
        assert_eq!(txs[1].application_order, 2);

        assert_eq!(txs[2].envelope, bump);
        assert!(txs[2].fee_bump);
        assert_eq!(txs[2].status, TransactionStatus::Success);
    }

    #[test]
    fn failed_fee_bump_is_not_flagged() {
        let bump = fee_bump_envelope(3, v1_envelope(4, 40));
        let meta = close_meta(
            8,
            vec![bump.clone()],
            vec![processing(&bump, TransactionResultCode::FeeBumpInnerFailed)],
        );
        let txs = transactions_from_meta(&meta, &network_id(PASSPHRASE)).unwrap();
        assert_eq!(txs[0].status, TransactionStatus::Failed);
        assert!(!txs[0].fee_bump);
    }

    #[test]
    fn missing_envelope_is_an_error() {
        let a = v1_envelope(1, 10);
        let mut orphan = processing(&a, TransactionResultCode::Success);
        orphan.result.transaction_hash = Hash([9; 32]);
        let meta = close_meta(8, vec![a], vec![orphan]);

        let err = transactions_from_meta(&meta, &network_id(PASSPHRASE)).unwrap_err();
        assert_eq!(
            err,
            FetchError::EnvelopeNotFound { tx_hash: Hash([9; 32]).to_hex() }
        );
    }

    struct ScriptedTransactions {
        pages: Mutex<VecDeque<GetTransactionsResponse>>,
        requests: Mutex<Vec<GetTransactionsRequest>>,
    }

    impl ScriptedTransactions {
        fn new(pages: Vec<GetTransactionsResponse>) -> Self {
            ScriptedTransactions {
                pages: Mutex::new(pages.into()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl LedgerEndpoint for ScriptedTransactions {
        fn get_ledgers(&self, _: &GetLedgersRequest) -> Result<GetLedgersResponse, RpcError> {
            unimplemented!("not scripted")
        }

        fn get_transactions(
            &self,
            request: &GetTransactionsRequest,
        ) -> Result<GetTransactionsResponse, RpcError> {
            self.requests.lock().push(request.clone());
            self.pages
                .lock()
                .pop_front()
                .ok_or_else(|| RpcError::new("script exhausted", None))
        }

        fn get_events(&self, _: &GetEventsRequest) -> Result<GetEventsResponse, RpcError> {
            unimplemented!("not scripted")
        }

        fn get_latest_ledger(&self) -> Result<GetLatestLedgerResponse, RpcError> {
            unimplemented!("not scripted")
        }

        fn get_network(&self) -> Result<GetNetworkResponse, RpcError> {
            unimplemented!("not scripted")
        }
    }

    fn raw_tx(ledger: u32, application_order: u32) -> RawTransactionInfo {
        let envelope = v1_envelope(application_order as u8, application_order as i64);
        RawTransactionInfo {
            status: TransactionStatus::Success,
            tx_hash: envelope.hash(&network_id(PASSPHRASE)).to_hex(),
            ledger,
            created_at: 1_668_615_041,
            application_order,
            fee_bump: false,
            envelope_xdr: envelope.to_xdr_base64(),
            result_xdr: TransactionResult {
                fee_charged: 100,
                result: TransactionResultCode::Success,
            }
            .to_xdr_base64(),
            result_meta_xdr: empty_meta().to_xdr_base64(),
            diagnostic_events_xdr: None,
        }
    }

    #[test]
    fn page_strategy_filters_and_stops() {
        let endpoint = ScriptedTransactions::new(vec![
            GetTransactionsResponse {
                transactions: vec![raw_tx(5, 1), raw_tx(5, 2)],
                latest_ledger: 100,
                cursor: Some("c1".into()),
            },
            GetTransactionsResponse {
                transactions: vec![raw_tx(6, 1)],
                latest_ledger: 100,
                cursor: Some("c2".into()),
            },
        ]);

        let txs = transactions_from_pages(&endpoint, 5, 150).unwrap();
        assert_eq!(txs.len(), 2);
        assert!(txs.iter().all(|tx| tx.ledger == 5));

        let requests = endpoint.requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].start_ledger, Some(5));
        assert_eq!(requests[0].cursor, None);
        assert_eq!(requests[1].start_ledger, None);
        assert_eq!(requests[1].cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn page_strategy_stops_on_missing_cursor() {
        let endpoint = ScriptedTransactions::new(vec![GetTransactionsResponse {
            transactions: vec![raw_tx(5, 1)],
            latest_ledger: 100,
            cursor: None,
        }]);
        let txs = transactions_from_pages(&endpoint, 5, 150).unwrap();
        assert_eq!(txs.len(), 1);
    }
}
