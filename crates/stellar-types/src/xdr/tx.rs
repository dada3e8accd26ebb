//! Transaction envelopes and deterministic transaction hashing.
//!
//! Three envelope generations exist on the wire: the legacy v0 form (bare
//! ed25519 source key), the current form (muxed-account source), and the
//! fee-bump wrapper around a current-form transaction. The envelope kind is
//! a closed union; an unknown discriminant is a decode failure.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::DecodeError;
use crate::strkey;

use super::codec::{Hash, ReadXdr, WriteXdr, XdrReader, XdrWriter};
use super::scval::{ScAddress, ScVal};

const PUBLIC_KEY_TYPE_ED25519: i32 = 0;

const KEY_TYPE_ED25519: i32 = 0;
const KEY_TYPE_MUXED_ED25519: i32 = 0x100;

pub const ENVELOPE_TYPE_TX_V0: i32 = 0;
pub const ENVELOPE_TYPE_TX: i32 = 2;
pub const ENVELOPE_TYPE_TX_FEE_BUMP: i32 = 5;

/// Account public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicKey {
    Ed25519([u8; 32]),
}

/// Accounts are identified by their public key.
pub type AccountId = PublicKey;

impl PublicKey {
    /// Strkey `G...` form.
    pub fn address(&self) -> String {
        let PublicKey::Ed25519(key) = self;
        strkey::encode_ed25519_public_key(key)
    }
}

impl ReadXdr for PublicKey {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            PUBLIC_KEY_TYPE_ED25519 => Ok(PublicKey::Ed25519(r.read_opaque::<32>()?)),
            v => Err(DecodeError::UnknownDiscriminant { type_name: "PublicKey", value: v as i64 }),
        }
    }
}

impl WriteXdr for PublicKey {
    fn write_xdr(&self, w: &mut XdrWriter) {
        let PublicKey::Ed25519(key) = self;
        w.write_i32(PUBLIC_KEY_TYPE_ED25519);
        w.write_opaque(key);
    }
}

/// Transaction source account: a bare key or a key multiplexed with an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MuxedAccount {
    Ed25519([u8; 32]),
    MuxedEd25519 { id: u64, ed25519: [u8; 32] },
}

impl MuxedAccount {
    /// Strkey form: `G...` for plain keys, `M...` for multiplexed ones.
    pub fn address(&self) -> String {
        match self {
            MuxedAccount::Ed25519(key) => strkey::encode_ed25519_public_key(key),
            MuxedAccount::MuxedEd25519 { id, ed25519 } => {
                strkey::encode_muxed_ed25519(ed25519, *id)
            }
        }
    }
}

impl ReadXdr for MuxedAccount {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            KEY_TYPE_ED25519 => Ok(MuxedAccount::Ed25519(r.read_opaque::<32>()?)),
            KEY_TYPE_MUXED_ED25519 => {
                let id = r.read_u64()?;
                let ed25519 = r.read_opaque::<32>()?;
                Ok(MuxedAccount::MuxedEd25519 { id, ed25519 })
            }
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "MuxedAccount",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for MuxedAccount {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            MuxedAccount::Ed25519(key) => {
                w.write_i32(KEY_TYPE_ED25519);
                w.write_opaque(key);
            }
            MuxedAccount::MuxedEd25519 { id, ed25519 } => {
                w.write_i32(KEY_TYPE_MUXED_ED25519);
                w.write_u64(*id);
                w.write_opaque(ed25519);
            }
        }
    }
}

/// Validity window for a transaction, in epoch seconds. Zero means no bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

impl ReadXdr for TimeBounds {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(TimeBounds { min_time: r.read_u64()?, max_time: r.read_u64()? })
    }
}

impl WriteXdr for TimeBounds {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_u64(self.min_time);
        w.write_u64(self.max_time);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Memo {
    None,
    Text(String),
    Id(u64),
    Hash(Hash),
}

impl ReadXdr for Memo {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            0 => Ok(Memo::None),
            1 => Ok(Memo::Text(r.read_string()?)),
            2 => Ok(Memo::Id(r.read_u64()?)),
            3 => Ok(Memo::Hash(Hash::read_xdr(r)?)),
            v => Err(DecodeError::UnknownDiscriminant { type_name: "Memo", value: v as i64 }),
        }
    }
}

impl WriteXdr for Memo {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            Memo::None => w.write_i32(0),
            Memo::Text(s) => {
                w.write_i32(1);
                w.write_string(s);
            }
            Memo::Id(id) => {
                w.write_i32(2);
                w.write_u64(*id);
            }
            Memo::Hash(h) => {
                w.write_i32(3);
                h.write_xdr(w);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountOp {
    pub destination: AccountId,
    pub starting_balance: i64,
}

impl ReadXdr for CreateAccountOp {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(CreateAccountOp {
            destination: AccountId::read_xdr(r)?,
            starting_balance: r.read_i64()?,
        })
    }
}

impl WriteXdr for CreateAccountOp {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.destination.write_xdr(w);
        w.write_i64(self.starting_balance);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOp {
    pub destination: MuxedAccount,
    pub amount: i64,
}

impl ReadXdr for PaymentOp {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(PaymentOp { destination: MuxedAccount::read_xdr(r)?, amount: r.read_i64()? })
    }
}

impl WriteXdr for PaymentOp {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.destination.write_xdr(w);
        w.write_i64(self.amount);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeContractArgs {
    pub contract_address: ScAddress,
    pub function_name: String,
    pub args: Vec<ScVal>,
}

impl ReadXdr for InvokeContractArgs {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(InvokeContractArgs {
            contract_address: ScAddress::read_xdr(r)?,
            function_name: r.read_string()?,
            args: r.read_vec()?,
        })
    }
}

impl WriteXdr for InvokeContractArgs {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.contract_address.write_xdr(w);
        w.write_string(&self.function_name);
        w.write_vec(&self.args);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostFunction {
    InvokeContract(InvokeContractArgs),
    UploadContractWasm(Vec<u8>),
}

impl ReadXdr for HostFunction {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            0 => Ok(HostFunction::InvokeContract(InvokeContractArgs::read_xdr(r)?)),
            2 => Ok(HostFunction::UploadContractWasm(r.read_var_bytes()?)),
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "HostFunction",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for HostFunction {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            HostFunction::InvokeContract(args) => {
                w.write_i32(0);
                args.write_xdr(w);
            }
            HostFunction::UploadContractWasm(wasm) => {
                w.write_i32(2);
                w.write_var_bytes(wasm);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeHostFunctionOp {
    pub host_function: HostFunction,
}

impl ReadXdr for InvokeHostFunctionOp {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(InvokeHostFunctionOp { host_function: HostFunction::read_xdr(r)? })
    }
}

impl WriteXdr for InvokeHostFunctionOp {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.host_function.write_xdr(w);
    }
}

const OPERATION_TYPE_CREATE_ACCOUNT: i32 = 0;
const OPERATION_TYPE_PAYMENT: i32 = 1;
const OPERATION_TYPE_INVOKE_HOST_FUNCTION: i32 = 24;

/// Operation payload. Discriminants follow the chain's operation-type
/// numbering; this library carries the subset the ingest pipeline handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationBody {
    CreateAccount(CreateAccountOp),
    Payment(PaymentOp),
    InvokeHostFunction(InvokeHostFunctionOp),
}

impl OperationBody {
    /// Stable name used by operation-type filters.
    pub fn type_name(&self) -> &'static str {
        match self {
            OperationBody::CreateAccount(_) => "create_account",
            OperationBody::Payment(_) => "payment",
            OperationBody::InvokeHostFunction(_) => "invoke_host_function",
        }
    }

    pub fn is_invoke_host_function(&self) -> bool {
        matches!(self, OperationBody::InvokeHostFunction(_))
    }
}

impl ReadXdr for OperationBody {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            OPERATION_TYPE_CREATE_ACCOUNT => {
                Ok(OperationBody::CreateAccount(CreateAccountOp::read_xdr(r)?))
            }
            OPERATION_TYPE_PAYMENT => Ok(OperationBody::Payment(PaymentOp::read_xdr(r)?)),
            OPERATION_TYPE_INVOKE_HOST_FUNCTION => {
                Ok(OperationBody::InvokeHostFunction(InvokeHostFunctionOp::read_xdr(r)?))
            }
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "OperationBody",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for OperationBody {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            OperationBody::CreateAccount(op) => {
                w.write_i32(OPERATION_TYPE_CREATE_ACCOUNT);
                op.write_xdr(w);
            }
            OperationBody::Payment(op) => {
                w.write_i32(OPERATION_TYPE_PAYMENT);
                op.write_xdr(w);
            }
            OperationBody::InvokeHostFunction(op) => {
                w.write_i32(OPERATION_TYPE_INVOKE_HOST_FUNCTION);
                op.write_xdr(w);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Overrides the transaction source account when present.
    pub source_account: Option<MuxedAccount>,
    pub body: OperationBody,
}

impl ReadXdr for Operation {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(Operation { source_account: r.read_option()?, body: OperationBody::read_xdr(r)? })
    }
}

impl WriteXdr for Operation {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_option(&self.source_account);
        self.body.write_xdr(w);
    }
}

/// Current-form transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub source_account: MuxedAccount,
    pub fee: u32,
    pub seq_num: i64,
    pub time_bounds: Option<TimeBounds>,
    pub memo: Memo,
    pub operations: Vec<Operation>,
}

impl ReadXdr for Transaction {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(Transaction {
            source_account: MuxedAccount::read_xdr(r)?,
            fee: r.read_u32()?,
            seq_num: r.read_i64()?,
            time_bounds: r.read_option()?,
            memo: Memo::read_xdr(r)?,
            operations: r.read_vec()?,
        })
    }
}

impl WriteXdr for Transaction {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.source_account.write_xdr(w);
        w.write_u32(self.fee);
        w.write_i64(self.seq_num);
        w.write_option(&self.time_bounds);
        self.memo.write_xdr(w);
        w.write_vec(&self.operations);
    }
}

/// Legacy transaction: identical to [`Transaction`] except the source
/// account is a bare ed25519 key with no key-type discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionV0 {
    pub source_account_ed25519: [u8; 32],
    pub fee: u32,
    pub seq_num: i64,
    pub time_bounds: Option<TimeBounds>,
    pub memo: Memo,
    pub operations: Vec<Operation>,
}

impl TransactionV0 {
    /// Restore the key-type discriminant the legacy form stripped off,
    /// yielding the current-form transaction that signing and hashing
    /// operate on.
    pub fn to_transaction(&self) -> Transaction {
        Transaction {
            source_account: MuxedAccount::Ed25519(self.source_account_ed25519),
            fee: self.fee,
            seq_num: self.seq_num,
            time_bounds: self.time_bounds,
            memo: self.memo.clone(),
            operations: self.operations.clone(),
        }
    }
}

impl ReadXdr for TransactionV0 {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(TransactionV0 {
            source_account_ed25519: r.read_opaque::<32>()?,
            fee: r.read_u32()?,
            seq_num: r.read_i64()?,
            time_bounds: r.read_option()?,
            memo: Memo::read_xdr(r)?,
            operations: r.read_vec()?,
        })
    }
}

impl WriteXdr for TransactionV0 {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_opaque(&self.source_account_ed25519);
        w.write_u32(self.fee);
        w.write_i64(self.seq_num);
        w.write_option(&self.time_bounds);
        self.memo.write_xdr(w);
        w.write_vec(&self.operations);
    }
}

/// A fee bump wraps an already-signed current-form transaction and replaces
/// its fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBumpTransaction {
    pub fee_source: MuxedAccount,
    pub fee: i64,
    pub inner_tx: TransactionV1Envelope,
}

impl ReadXdr for FeeBumpTransaction {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        let fee_source = MuxedAccount::read_xdr(r)?;
        let fee = r.read_i64()?;
        // The inner transaction is a one-arm union: only the current
        // envelope form may be wrapped.
        match r.read_i32()? {
            ENVELOPE_TYPE_TX => {
                let inner_tx = TransactionV1Envelope::read_xdr(r)?;
                Ok(FeeBumpTransaction { fee_source, fee, inner_tx })
            }
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "FeeBumpTransaction.innerTx",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for FeeBumpTransaction {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.fee_source.write_xdr(w);
        w.write_i64(self.fee);
        w.write_i32(ENVELOPE_TYPE_TX);
        self.inner_tx.write_xdr(w);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratedSignature {
    pub hint: [u8; 4],
    pub signature: Vec<u8>,
}

impl ReadXdr for DecoratedSignature {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(DecoratedSignature { hint: r.read_opaque::<4>()?, signature: r.read_var_bytes()? })
    }
}

impl WriteXdr for DecoratedSignature {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_opaque(&self.hint);
        w.write_var_bytes(&self.signature);
    }
}

macro_rules! envelope_struct {
    ($name:ident, $tx:ty) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub tx: $tx,
            pub signatures: Vec<DecoratedSignature>,
        }

        impl ReadXdr for $name {
            fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
                Ok(Self { tx: <$tx>::read_xdr(r)?, signatures: r.read_vec()? })
            }
        }

        impl WriteXdr for $name {
            fn write_xdr(&self, w: &mut XdrWriter) {
                self.tx.write_xdr(w);
                w.write_vec(&self.signatures);
            }
        }
    };
}

envelope_struct!(TransactionV0Envelope, TransactionV0);
envelope_struct!(TransactionV1Envelope, Transaction);
envelope_struct!(FeeBumpTransactionEnvelope, FeeBumpTransaction);

/// A signed transaction in any of its wire forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEnvelope {
    TxV0(TransactionV0Envelope),
    Tx(TransactionV1Envelope),
    TxFeeBump(FeeBumpTransactionEnvelope),
}

impl TransactionEnvelope {
    pub fn is_fee_bump(&self) -> bool {
        matches!(self, TransactionEnvelope::TxFeeBump(_))
    }

    /// Operations carried by the transaction (the inner transaction's, for
    /// fee bumps).
    pub fn operations(&self) -> &[Operation] {
        match self {
            TransactionEnvelope::TxV0(e) => &e.tx.operations,
            TransactionEnvelope::Tx(e) => &e.tx.operations,
            TransactionEnvelope::TxFeeBump(e) => &e.tx.inner_tx.tx.operations,
        }
    }

    pub fn has_invoke_host_function(&self) -> bool {
        self.operations().iter().any(|op| op.body.is_invoke_host_function())
    }

    /// The paying account's address: the embedded public key for legacy
    /// envelopes, the muxed-account address for current and fee-bump ones.
    pub fn source_account_address(&self) -> String {
        match self {
            TransactionEnvelope::TxV0(e) => {
                strkey::encode_ed25519_public_key(&e.tx.source_account_ed25519)
            }
            TransactionEnvelope::Tx(e) => e.tx.source_account.address(),
            TransactionEnvelope::TxFeeBump(e) => e.tx.fee_source.address(),
        }
    }

    /// Deterministic transaction hash: SHA-256 over the signature payload
    /// (network id followed by the tagged transaction). Legacy envelopes are
    /// re-wrapped to the current form first, so a v0 envelope hashes
    /// identically to its current-form equivalent.
    pub fn hash(&self, network_id: &Hash) -> Hash {
        let tagged = match self {
            TransactionEnvelope::TxV0(e) => TaggedTransaction::Tx(e.tx.to_transaction()),
            TransactionEnvelope::Tx(e) => TaggedTransaction::Tx(e.tx.clone()),
            TransactionEnvelope::TxFeeBump(e) => TaggedTransaction::TxFeeBump(e.tx.clone()),
        };
        let payload = TransactionSignaturePayload {
            network_id: *network_id,
            tagged_transaction: tagged,
        };
        Hash(Sha256::digest(payload.to_xdr()).into())
    }
}

impl ReadXdr for TransactionEnvelope {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            ENVELOPE_TYPE_TX_V0 => Ok(TransactionEnvelope::TxV0(TransactionV0Envelope::read_xdr(r)?)),
            ENVELOPE_TYPE_TX => Ok(TransactionEnvelope::Tx(TransactionV1Envelope::read_xdr(r)?)),
            ENVELOPE_TYPE_TX_FEE_BUMP => {
                Ok(TransactionEnvelope::TxFeeBump(FeeBumpTransactionEnvelope::read_xdr(r)?))
            }
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "TransactionEnvelope",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for TransactionEnvelope {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            TransactionEnvelope::TxV0(e) => {
                w.write_i32(ENVELOPE_TYPE_TX_V0);
                e.write_xdr(w);
            }
            TransactionEnvelope::Tx(e) => {
                w.write_i32(ENVELOPE_TYPE_TX);
                e.write_xdr(w);
            }
            TransactionEnvelope::TxFeeBump(e) => {
                w.write_i32(ENVELOPE_TYPE_TX_FEE_BUMP);
                e.write_xdr(w);
            }
        }
    }
}

/// The transaction forms that can be signed: legacy envelopes re-wrap to the
/// current form before entering the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggedTransaction {
    Tx(Transaction),
    TxFeeBump(FeeBumpTransaction),
}

impl WriteXdr for TaggedTransaction {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            TaggedTransaction::Tx(tx) => {
                w.write_i32(ENVELOPE_TYPE_TX);
                tx.write_xdr(w);
            }
            TaggedTransaction::TxFeeBump(tx) => {
                w.write_i32(ENVELOPE_TYPE_TX_FEE_BUMP);
                tx.write_xdr(w);
            }
        }
    }
}

/// What actually gets hashed and signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSignaturePayload {
    pub network_id: Hash,
    pub tagged_transaction: TaggedTransaction,
}

impl WriteXdr for TransactionSignaturePayload {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.network_id.write_xdr(w);
        self.tagged_transaction.write_xdr(w);
    }
}

/// Network id used in signature payloads: SHA-256 of the network passphrase.
pub fn network_id(passphrase: &str) -> Hash {
    Hash(Sha256::digest(passphrase.as_bytes()).into())
}
