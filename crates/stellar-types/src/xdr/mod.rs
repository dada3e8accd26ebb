//! XDR wire codec for the ledger structures the ingest pipeline consumes.
//!
//! Everything here decodes from (and re-encodes to) the chain's big-endian
//! XDR framing. The type set is deliberately a subset of the full chain
//! schema: unions are closed over the arms the pipeline handles, and an
//! unknown discriminant surfaces as [`DecodeError`](crate::DecodeError)
//! instead of being skipped.
//!
//! ```ignore
//! use stellar_ingest_types::xdr::{ReadXdr, TransactionEnvelope};
//!
//! let envelope = TransactionEnvelope::from_xdr_base64(envelope_b64)?;
//! let hash = envelope.hash(&network_id);
//! ```

mod codec;
mod event;
mod meta;
mod scval;
mod tx;

pub use codec::{Hash, ReadXdr, WriteXdr, XdrReader, XdrWriter};
pub use event::{
    ContractEvent, ContractEventBody, ContractEventV0, DiagnosticEvent, TransactionEvent,
    EVENT_STAGE_AFTER_ALL_TXS, EVENT_STAGE_AFTER_TX, EVENT_STAGE_BEFORE_ALL_TXS,
};
pub use meta::{
    GeneralizedTransactionSet, LedgerCloseMeta, LedgerCloseMetaV0, LedgerCloseMetaV1,
    LedgerCloseMetaV2, LedgerHeader, LedgerHeaderHistoryEntry, OperationMetaV2, StellarValue,
    TransactionMeta, TransactionMetaV4, TransactionPhase, TransactionResult,
    TransactionResultCode, TransactionResultMeta, TransactionResultPair, TransactionSet,
    TransactionSetV1,
};
pub use scval::{ScAddress, ScVal};
pub use tx::{
    network_id, AccountId, CreateAccountOp, DecoratedSignature, FeeBumpTransaction,
    FeeBumpTransactionEnvelope, HostFunction, InvokeContractArgs, InvokeHostFunctionOp, Memo,
    MuxedAccount, Operation, OperationBody, PaymentOp, PublicKey, TaggedTransaction, TimeBounds,
    Transaction, TransactionEnvelope, TransactionSignaturePayload, TransactionV0,
    TransactionV0Envelope, TransactionV1Envelope, ENVELOPE_TYPE_TX, ENVELOPE_TYPE_TX_FEE_BUMP,
    ENVELOPE_TYPE_TX_V0,
};
