//! Ledger headers and close metadata.
//!
//! A ledger-close record bundles the header, the transaction set that
//! closed, and one result/meta pair per applied transaction. Three close
//! formats exist on the wire; the accessor methods flatten them so callers
//! never match on the format themselves.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

use super::codec::{Hash, ReadXdr, WriteXdr, XdrReader, XdrWriter};
use super::event::{ContractEvent, DiagnosticEvent, TransactionEvent};
use super::tx::TransactionEnvelope;

/// Consensus value a ledger closed on. Only the fields the pipeline reads
/// are carried; the trailing upgrade/extension payload is skipped on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StellarValue {
    pub tx_set_hash: Hash,
    pub close_time: u64,
}

impl ReadXdr for StellarValue {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        let tx_set_hash = Hash::read_xdr(r)?;
        let close_time = r.read_u64()?;
        // upgrades<6>, then ext (v=0 only)
        let upgrades = r.read_u32()?;
        for _ in 0..upgrades {
            r.read_var_bytes()?;
        }
        match r.read_i32()? {
            0 => Ok(StellarValue { tx_set_hash, close_time }),
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "StellarValue.ext",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for StellarValue {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.tx_set_hash.write_xdr(w);
        w.write_u64(self.close_time);
        w.write_u32(0); // no upgrades
        w.write_i32(0); // basic ext
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeader {
    pub ledger_version: u32,
    pub previous_ledger_hash: Hash,
    pub scp_value: StellarValue,
    pub tx_set_result_hash: Hash,
    pub bucket_list_hash: Hash,
    pub ledger_seq: u32,
    pub total_coins: i64,
    pub fee_pool: i64,
    pub inflation_seq: u32,
    pub id_pool: u64,
    pub base_fee: u32,
    pub base_reserve: u32,
    pub max_tx_set_size: u32,
    pub skip_list: [Hash; 4],
}

impl LedgerHeader {
    /// Close time in epoch milliseconds.
    pub fn close_time_ms(&self) -> u64 {
        self.scp_value.close_time * 1000
    }
}

impl ReadXdr for LedgerHeader {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        let header = LedgerHeader {
            ledger_version: r.read_u32()?,
            previous_ledger_hash: Hash::read_xdr(r)?,
            scp_value: StellarValue::read_xdr(r)?,
            tx_set_result_hash: Hash::read_xdr(r)?,
            bucket_list_hash: Hash::read_xdr(r)?,
            ledger_seq: r.read_u32()?,
            total_coins: r.read_i64()?,
            fee_pool: r.read_i64()?,
            inflation_seq: r.read_u32()?,
            id_pool: r.read_u64()?,
            base_fee: r.read_u32()?,
            base_reserve: r.read_u32()?,
            max_tx_set_size: r.read_u32()?,
            skip_list: [
                Hash::read_xdr(r)?,
                Hash::read_xdr(r)?,
                Hash::read_xdr(r)?,
                Hash::read_xdr(r)?,
            ],
        };
        match r.read_i32()? {
            0 => Ok(header),
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "LedgerHeader.ext",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for LedgerHeader {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_u32(self.ledger_version);
        self.previous_ledger_hash.write_xdr(w);
        self.scp_value.write_xdr(w);
        self.tx_set_result_hash.write_xdr(w);
        self.bucket_list_hash.write_xdr(w);
        w.write_u32(self.ledger_seq);
        w.write_i64(self.total_coins);
        w.write_i64(self.fee_pool);
        w.write_u32(self.inflation_seq);
        w.write_u64(self.id_pool);
        w.write_u32(self.base_fee);
        w.write_u32(self.base_reserve);
        w.write_u32(self.max_tx_set_size);
        for h in &self.skip_list {
            h.write_xdr(w);
        }
        w.write_i32(0);
    }
}

impl Default for LedgerHeader {
    fn default() -> Self {
        LedgerHeader {
            ledger_version: 0,
            previous_ledger_hash: Hash([0; 32]),
            scp_value: StellarValue { tx_set_hash: Hash([0; 32]), close_time: 0 },
            tx_set_result_hash: Hash([0; 32]),
            bucket_list_hash: Hash([0; 32]),
            ledger_seq: 0,
            total_coins: 0,
            fee_pool: 0,
            inflation_seq: 0,
            id_pool: 0,
            base_fee: 0,
            base_reserve: 0,
            max_tx_set_size: 0,
            skip_list: [Hash([0; 32]); 4],
        }
    }
}

/// Header plus its own hash, as served by history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerHeaderHistoryEntry {
    pub hash: Hash,
    pub header: LedgerHeader,
}

impl ReadXdr for LedgerHeaderHistoryEntry {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        let hash = Hash::read_xdr(r)?;
        let header = LedgerHeader::read_xdr(r)?;
        match r.read_i32()? {
            0 => Ok(LedgerHeaderHistoryEntry { hash, header }),
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "LedgerHeaderHistoryEntry.ext",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for LedgerHeaderHistoryEntry {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.hash.write_xdr(w);
        self.header.write_xdr(w);
        w.write_i32(0);
    }
}

/// Legacy flat transaction set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSet {
    pub previous_ledger_hash: Hash,
    pub txs: Vec<TransactionEnvelope>,
}

impl ReadXdr for TransactionSet {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(TransactionSet { previous_ledger_hash: Hash::read_xdr(r)?, txs: r.read_vec()? })
    }
}

impl WriteXdr for TransactionSet {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.previous_ledger_hash.write_xdr(w);
        w.write_vec(&self.txs);
    }
}

/// One phase of a generalized transaction set. The component layer that
/// groups transactions by fee discount is flattened away on decode; only
/// the envelopes survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPhase {
    V0(Vec<TransactionEnvelope>),
}

impl TransactionPhase {
    pub fn txs(&self) -> &[TransactionEnvelope] {
        let TransactionPhase::V0(txs) = self;
        txs
    }
}

impl ReadXdr for TransactionPhase {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            0 => {
                let components = r.read_u32()?;
                let mut txs = Vec::new();
                for _ in 0..components {
                    // TXSET_COMP_TXS_MAYBE_DISCOUNTED_FEE
                    match r.read_i32()? {
                        0 => {
                            if r.read_bool()? {
                                let _base_fee = r.read_i64()?;
                            }
                            let mut component_txs: Vec<TransactionEnvelope> = r.read_vec()?;
                            txs.append(&mut component_txs);
                        }
                        v => {
                            return Err(DecodeError::UnknownDiscriminant {
                                type_name: "TxSetComponent",
                                value: v as i64,
                            })
                        }
                    }
                }
                Ok(TransactionPhase::V0(txs))
            }
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "TransactionPhase",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for TransactionPhase {
    fn write_xdr(&self, w: &mut XdrWriter) {
        let TransactionPhase::V0(txs) = self;
        w.write_i32(0);
        w.write_u32(1); // single undiscounted component
        w.write_i32(0);
        w.write_bool(false);
        w.write_vec(txs);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSetV1 {
    pub previous_ledger_hash: Hash,
    pub phases: Vec<TransactionPhase>,
}

impl ReadXdr for TransactionSetV1 {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(TransactionSetV1 { previous_ledger_hash: Hash::read_xdr(r)?, phases: r.read_vec()? })
    }
}

impl WriteXdr for TransactionSetV1 {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.previous_ledger_hash.write_xdr(w);
        w.write_vec(&self.phases);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneralizedTransactionSet {
    V1(TransactionSetV1),
}

impl GeneralizedTransactionSet {
    pub fn phases(&self) -> &[TransactionPhase] {
        let GeneralizedTransactionSet::V1(set) = self;
        &set.phases
    }
}

impl ReadXdr for GeneralizedTransactionSet {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            1 => Ok(GeneralizedTransactionSet::V1(TransactionSetV1::read_xdr(r)?)),
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "GeneralizedTransactionSet",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for GeneralizedTransactionSet {
    fn write_xdr(&self, w: &mut XdrWriter) {
        let GeneralizedTransactionSet::V1(set) = self;
        w.write_i32(1);
        set.write_xdr(w);
    }
}

/// Top-level transaction result codes. Negative values are failures; the
/// two success codes differ only in whether the transaction was a fee bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionResultCode {
    FeeBumpInnerSuccess,
    Success,
    Failed,
    TooEarly,
    TooLate,
    BadSeq,
    InsufficientBalance,
    InsufficientFee,
    InternalError,
    FeeBumpInnerFailed,
}

impl TransactionResultCode {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TransactionResultCode::Success | TransactionResultCode::FeeBumpInnerSuccess
        )
    }

    fn value(&self) -> i32 {
        match self {
            TransactionResultCode::FeeBumpInnerSuccess => 1,
            TransactionResultCode::Success => 0,
            TransactionResultCode::Failed => -1,
            TransactionResultCode::TooEarly => -2,
            TransactionResultCode::TooLate => -3,
            TransactionResultCode::BadSeq => -5,
            TransactionResultCode::InsufficientBalance => -7,
            TransactionResultCode::InsufficientFee => -9,
            TransactionResultCode::InternalError => -11,
            TransactionResultCode::FeeBumpInnerFailed => -13,
        }
    }
}

impl ReadXdr for TransactionResultCode {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            1 => Ok(TransactionResultCode::FeeBumpInnerSuccess),
            0 => Ok(TransactionResultCode::Success),
            -1 => Ok(TransactionResultCode::Failed),
            -2 => Ok(TransactionResultCode::TooEarly),
            -3 => Ok(TransactionResultCode::TooLate),
            -5 => Ok(TransactionResultCode::BadSeq),
            -7 => Ok(TransactionResultCode::InsufficientBalance),
            -9 => Ok(TransactionResultCode::InsufficientFee),
            -11 => Ok(TransactionResultCode::InternalError),
            -13 => Ok(TransactionResultCode::FeeBumpInnerFailed),
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "TransactionResultCode",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for TransactionResultCode {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_i32(self.value());
    }
}

/// Transaction-level result. Per-operation results are not modelled; their
/// wire bytes are validated as an empty vector on the codes that carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub fee_charged: i64,
    pub result: TransactionResultCode,
}

impl ReadXdr for TransactionResult {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        let fee_charged = r.read_i64()?;
        let result = TransactionResultCode::read_xdr(r)?;
        match result {
            TransactionResultCode::Success
            | TransactionResultCode::Failed
            | TransactionResultCode::FeeBumpInnerSuccess
            | TransactionResultCode::FeeBumpInnerFailed => {
                let op_results = r.read_u32()?;
                if op_results != 0 {
                    return Err(DecodeError::UnknownDiscriminant {
                        type_name: "TransactionResult.results",
                        value: op_results as i64,
                    });
                }
            }
            _ => {}
        }
        match r.read_i32()? {
            0 => Ok(TransactionResult { fee_charged, result }),
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "TransactionResult.ext",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for TransactionResult {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_i64(self.fee_charged);
        self.result.write_xdr(w);
        match self.result {
            TransactionResultCode::Success
            | TransactionResultCode::Failed
            | TransactionResultCode::FeeBumpInnerSuccess
            | TransactionResultCode::FeeBumpInnerFailed => w.write_u32(0),
            _ => {}
        }
        w.write_i32(0);
    }
}

/// Result keyed by the hash of the transaction it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResultPair {
    pub transaction_hash: Hash,
    pub result: TransactionResult,
}

impl ReadXdr for TransactionResultPair {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(TransactionResultPair {
            transaction_hash: Hash::read_xdr(r)?,
            result: TransactionResult::read_xdr(r)?,
        })
    }
}

impl WriteXdr for TransactionResultPair {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.transaction_hash.write_xdr(w);
        self.result.write_xdr(w);
    }
}

/// Per-operation apply metadata. Ledger-entry changes are not modelled;
/// their wire bytes must be an empty vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMetaV2 {
    pub events: Vec<ContractEvent>,
}

impl ReadXdr for OperationMetaV2 {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            0 => {}
            v => {
                return Err(DecodeError::UnknownDiscriminant {
                    type_name: "OperationMetaV2.ext",
                    value: v as i64,
                })
            }
        }
        let changes = r.read_u32()?;
        if changes != 0 {
            return Err(DecodeError::UnknownDiscriminant {
                type_name: "OperationMetaV2.changes",
                value: changes as i64,
            });
        }
        Ok(OperationMetaV2 { events: r.read_vec()? })
    }
}

impl WriteXdr for OperationMetaV2 {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_i32(0);
        w.write_u32(0);
        w.write_vec(&self.events);
    }
}

/// The current apply-metadata format. Entry-change streams are validated
/// empty on decode; the event streams are what the pipeline consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetaV4 {
    pub events: Vec<TransactionEvent>,
    pub operations: Vec<OperationMetaV2>,
    pub diagnostic_events: Vec<DiagnosticEvent>,
}

impl ReadXdr for TransactionMetaV4 {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            0 => {}
            v => {
                return Err(DecodeError::UnknownDiscriminant {
                    type_name: "TransactionMetaV4.ext",
                    value: v as i64,
                })
            }
        }
        let changes_before = r.read_u32()?;
        if changes_before != 0 {
            return Err(DecodeError::UnknownDiscriminant {
                type_name: "TransactionMetaV4.txChangesBefore",
                value: changes_before as i64,
            });
        }
        let operations: Vec<OperationMetaV2> = r.read_vec()?;
        let changes_after = r.read_u32()?;
        if changes_after != 0 {
            return Err(DecodeError::UnknownDiscriminant {
                type_name: "TransactionMetaV4.txChangesAfter",
                value: changes_after as i64,
            });
        }
        // sorobanMeta pointer, not modelled
        let soroban_meta = r.read_u32()?;
        if soroban_meta != 0 {
            return Err(DecodeError::UnknownDiscriminant {
                type_name: "TransactionMetaV4.sorobanMeta",
                value: soroban_meta as i64,
            });
        }
        let events = r.read_vec()?;
        let diagnostic_events = r.read_vec()?;
        Ok(TransactionMetaV4 { events, operations, diagnostic_events })
    }
}

impl WriteXdr for TransactionMetaV4 {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_i32(0);
        w.write_u32(0);
        w.write_vec(&self.operations);
        w.write_u32(0);
        w.write_u32(0);
        w.write_vec(&self.events);
        w.write_vec(&self.diagnostic_events);
    }
}

/// Transaction apply metadata. Only the current (v4) format is understood;
/// older formats predate unified event metadata and fail to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionMeta {
    V4(TransactionMetaV4),
}

impl TransactionMeta {
    pub fn as_v4(&self) -> &TransactionMetaV4 {
        let TransactionMeta::V4(v4) = self;
        v4
    }
}

impl ReadXdr for TransactionMeta {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            4 => Ok(TransactionMeta::V4(TransactionMetaV4::read_xdr(r)?)),
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "TransactionMeta",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for TransactionMeta {
    fn write_xdr(&self, w: &mut XdrWriter) {
        let TransactionMeta::V4(v4) = self;
        w.write_i32(4);
        v4.write_xdr(w);
    }
}

/// Result and metadata for one applied transaction. The fee-processing
/// entry changes between the pair and the meta are validated empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResultMeta {
    pub result: TransactionResultPair,
    pub tx_apply_processing: TransactionMeta,
}

impl ReadXdr for TransactionResultMeta {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        let result = TransactionResultPair::read_xdr(r)?;
        let fee_changes = r.read_u32()?;
        if fee_changes != 0 {
            return Err(DecodeError::UnknownDiscriminant {
                type_name: "TransactionResultMeta.feeProcessing",
                value: fee_changes as i64,
            });
        }
        Ok(TransactionResultMeta { result, tx_apply_processing: TransactionMeta::read_xdr(r)? })
    }
}

impl WriteXdr for TransactionResultMeta {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.result.write_xdr(w);
        w.write_u32(0);
        self.tx_apply_processing.write_xdr(w);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCloseMetaV0 {
    pub ledger_header: LedgerHeaderHistoryEntry,
    pub tx_set: TransactionSet,
    pub tx_processing: Vec<TransactionResultMeta>,
}

impl ReadXdr for LedgerCloseMetaV0 {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(LedgerCloseMetaV0 {
            ledger_header: LedgerHeaderHistoryEntry::read_xdr(r)?,
            tx_set: TransactionSet::read_xdr(r)?,
            tx_processing: r.read_vec()?,
        })
    }
}

impl WriteXdr for LedgerCloseMetaV0 {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.ledger_header.write_xdr(w);
        self.tx_set.write_xdr(w);
        w.write_vec(&self.tx_processing);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCloseMetaV1 {
    pub ledger_header: LedgerHeaderHistoryEntry,
    pub tx_set: GeneralizedTransactionSet,
    pub tx_processing: Vec<TransactionResultMeta>,
}

impl ReadXdr for LedgerCloseMetaV1 {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(LedgerCloseMetaV1 {
            ledger_header: LedgerHeaderHistoryEntry::read_xdr(r)?,
            tx_set: GeneralizedTransactionSet::read_xdr(r)?,
            tx_processing: r.read_vec()?,
        })
    }
}

impl WriteXdr for LedgerCloseMetaV1 {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.ledger_header.write_xdr(w);
        self.tx_set.write_xdr(w);
        w.write_vec(&self.tx_processing);
    }
}

/// V2 extends V1 with the keys evicted from live state at this close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCloseMetaV2 {
    pub ledger_header: LedgerHeaderHistoryEntry,
    pub tx_set: GeneralizedTransactionSet,
    pub tx_processing: Vec<TransactionResultMeta>,
    pub evicted_keys: Vec<Hash>,
}

impl ReadXdr for LedgerCloseMetaV2 {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(LedgerCloseMetaV2 {
            ledger_header: LedgerHeaderHistoryEntry::read_xdr(r)?,
            tx_set: GeneralizedTransactionSet::read_xdr(r)?,
            tx_processing: r.read_vec()?,
            evicted_keys: r.read_vec()?,
        })
    }
}

impl WriteXdr for LedgerCloseMetaV2 {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.ledger_header.write_xdr(w);
        self.tx_set.write_xdr(w);
        w.write_vec(&self.tx_processing);
        w.write_vec(&self.evicted_keys);
    }
}

/// Everything a validator emits when a ledger closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCloseMeta {
    V0(LedgerCloseMetaV0),
    V1(LedgerCloseMetaV1),
    V2(LedgerCloseMetaV2),
}

impl LedgerCloseMeta {
    pub fn ledger_header(&self) -> &LedgerHeaderHistoryEntry {
        match self {
            LedgerCloseMeta::V0(m) => &m.ledger_header,
            LedgerCloseMeta::V1(m) => &m.ledger_header,
            LedgerCloseMeta::V2(m) => &m.ledger_header,
        }
    }

    /// All envelopes in the close's transaction set, in set order. The set
    /// order is not the apply order; pair envelopes with results by hash.
    pub fn transaction_envelopes(&self) -> Vec<&TransactionEnvelope> {
        match self {
            LedgerCloseMeta::V0(m) => m.tx_set.txs.iter().collect(),
            LedgerCloseMeta::V1(m) => {
                m.tx_set.phases().iter().flat_map(|p| p.txs().iter()).collect()
            }
            LedgerCloseMeta::V2(m) => {
                m.tx_set.phases().iter().flat_map(|p| p.txs().iter()).collect()
            }
        }
    }

    /// Result/meta pairs in apply order.
    pub fn tx_processing(&self) -> &[TransactionResultMeta] {
        match self {
            LedgerCloseMeta::V0(m) => &m.tx_processing,
            LedgerCloseMeta::V1(m) => &m.tx_processing,
            LedgerCloseMeta::V2(m) => &m.tx_processing,
        }
    }
}

impl ReadXdr for LedgerCloseMeta {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            0 => Ok(LedgerCloseMeta::V0(LedgerCloseMetaV0::read_xdr(r)?)),
            1 => Ok(LedgerCloseMeta::V1(LedgerCloseMetaV1::read_xdr(r)?)),
            2 => Ok(LedgerCloseMeta::V2(LedgerCloseMetaV2::read_xdr(r)?)),
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "LedgerCloseMeta",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for LedgerCloseMeta {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            LedgerCloseMeta::V0(m) => {
                w.write_i32(0);
                m.write_xdr(w);
            }
            LedgerCloseMeta::V1(m) => {
                w.write_i32(1);
                m.write_xdr(w);
            }
            LedgerCloseMeta::V2(m) => {
                w.write_i32(2);
                m.write_xdr(w);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdr::event::{ContractEventBody, ContractEventV0};
    use crate::xdr::scval::ScVal;

    fn header_entry(seq: u32) -> LedgerHeaderHistoryEntry {
        LedgerHeaderHistoryEntry {
            hash: Hash([seq as u8; 32]),
            header: LedgerHeader {
                ledger_seq: seq,
                previous_ledger_hash: Hash([1; 32]),
                scp_value: StellarValue { tx_set_hash: Hash([2; 32]), close_time: 1_700_000_000 },
                ..LedgerHeader::default()
            },
        }
    }

    #[test]
    fn header_round_trip() {
        let entry = header_entry(1234);
        let decoded = LedgerHeaderHistoryEntry::from_xdr(&entry.to_xdr()).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(decoded.header.close_time_ms(), 1_700_000_000_000);
    }

    #[test]
    fn result_code_success_split() {
        assert!(TransactionResultCode::Success.is_success());
        assert!(TransactionResultCode::FeeBumpInnerSuccess.is_success());
        assert!(!TransactionResultCode::Failed.is_success());
        assert!(!TransactionResultCode::InsufficientFee.is_success());
    }

    #[test]
    fn result_round_trip() {
        let result = TransactionResult { fee_charged: 250, result: TransactionResultCode::Failed };
        assert_eq!(TransactionResult::from_xdr(&result.to_xdr()).unwrap(), result);

        let validity =
            TransactionResult { fee_charged: 100, result: TransactionResultCode::TooLate };
        assert_eq!(TransactionResult::from_xdr(&validity.to_xdr()).unwrap(), validity);
    }

    #[test]
    fn only_v4_meta_decodes() {
        let mut w = XdrWriter::new();
        w.write_i32(3);
        let err = TransactionMeta::from_xdr(&w.into_bytes()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownDiscriminant { type_name: "TransactionMeta", value: 3 }
        );
    }

    #[test]
    fn meta_v4_round_trip() {
        let meta = TransactionMeta::V4(TransactionMetaV4 {
            events: vec![],
            operations: vec![OperationMetaV2 {
                events: vec![ContractEvent {
                    contract_id: Some(Hash([5; 32])),
                    body: ContractEventBody::V0(ContractEventV0 {
                        topics: vec![ScVal::Symbol("transfer".into())],
                        data: ScVal::U64(7),
                    }),
                }],
            }],
            diagnostic_events: vec![],
        });
        assert_eq!(TransactionMeta::from_xdr(&meta.to_xdr()).unwrap(), meta);
    }

    #[test]
    fn generalized_set_flattens_phases() {
        let env = crate::xdr::tx::TransactionEnvelope::Tx(crate::xdr::tx::TransactionV1Envelope {
            tx: crate::xdr::tx::Transaction {
                source_account: crate::xdr::tx::MuxedAccount::Ed25519([1; 32]),
                fee: 100,
                seq_num: 7,
                time_bounds: None,
                memo: crate::xdr::tx::Memo::None,
                operations: vec![],
            },
            signatures: vec![],
        });
        let close = LedgerCloseMeta::V1(LedgerCloseMetaV1 {
            ledger_header: header_entry(9),
            tx_set: GeneralizedTransactionSet::V1(TransactionSetV1 {
                previous_ledger_hash: Hash([1; 32]),
                phases: vec![
                    TransactionPhase::V0(vec![env.clone()]),
                    TransactionPhase::V0(vec![env.clone()]),
                ],
            }),
            tx_processing: vec![],
        });
        assert_eq!(close.transaction_envelopes().len(), 2);
        let decoded = LedgerCloseMeta::from_xdr(&close.to_xdr()).unwrap();
        assert_eq!(decoded, close);
    }
}
