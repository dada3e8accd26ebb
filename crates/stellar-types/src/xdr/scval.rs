//! Contract values: the tagged value type used for event topics and payloads.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::strkey;

use super::codec::{Hash, ReadXdr, WriteXdr, XdrReader, XdrWriter};
use super::tx::AccountId;

/// Address of an account or a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScAddress {
    Account(AccountId),
    Contract(Hash),
}

const SC_ADDRESS_TYPE_ACCOUNT: i32 = 0;
const SC_ADDRESS_TYPE_CONTRACT: i32 = 1;

impl ScAddress {
    /// Text form: `G...` for accounts, `C...` for contracts.
    pub fn to_address_string(&self) -> String {
        match self {
            ScAddress::Account(id) => id.address(),
            ScAddress::Contract(hash) => strkey::encode_contract(&hash.0),
        }
    }
}

impl ReadXdr for ScAddress {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            SC_ADDRESS_TYPE_ACCOUNT => Ok(ScAddress::Account(AccountId::read_xdr(r)?)),
            SC_ADDRESS_TYPE_CONTRACT => Ok(ScAddress::Contract(Hash::read_xdr(r)?)),
            v => Err(DecodeError::UnknownDiscriminant { type_name: "ScAddress", value: v as i64 }),
        }
    }
}

impl WriteXdr for ScAddress {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            ScAddress::Account(id) => {
                w.write_i32(SC_ADDRESS_TYPE_ACCOUNT);
                id.write_xdr(w);
            }
            ScAddress::Contract(hash) => {
                w.write_i32(SC_ADDRESS_TYPE_CONTRACT);
                hash.write_xdr(w);
            }
        }
    }
}

/// Tagged contract value.
///
/// Discriminants follow the chain's value-type numbering, which is why they
/// are not contiguous here: this library carries the subset that appears in
/// event topics and payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScVal {
    Bool(bool),
    U32(u32),
    U64(u64),
    I64(i64),
    Bytes(Vec<u8>),
    String(String),
    Symbol(String),
    Address(ScAddress),
}

const SCV_BOOL: i32 = 0;
const SCV_U32: i32 = 3;
const SCV_U64: i32 = 5;
const SCV_I64: i32 = 6;
const SCV_BYTES: i32 = 13;
const SCV_STRING: i32 = 14;
const SCV_SYMBOL: i32 = 15;
const SCV_ADDRESS: i32 = 18;

impl ScVal {
    /// Render the value the way a handler-facing filter sees it: symbols and
    /// strings as their text, addresses in strkey form, integers as decimal,
    /// booleans as `true`/`false`, bytes as lowercase hex.
    pub fn to_native_string(&self) -> String {
        match self {
            ScVal::Bool(b) => b.to_string(),
            ScVal::U32(v) => v.to_string(),
            ScVal::U64(v) => v.to_string(),
            ScVal::I64(v) => v.to_string(),
            ScVal::Bytes(bytes) => hex::encode(bytes),
            ScVal::String(s) | ScVal::Symbol(s) => s.clone(),
            ScVal::Address(addr) => addr.to_address_string(),
        }
    }

    pub fn symbol(s: &str) -> Self {
        ScVal::Symbol(s.to_string())
    }
}

impl ReadXdr for ScVal {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            SCV_BOOL => Ok(ScVal::Bool(r.read_bool()?)),
            SCV_U32 => Ok(ScVal::U32(r.read_u32()?)),
            SCV_U64 => Ok(ScVal::U64(r.read_u64()?)),
            SCV_I64 => Ok(ScVal::I64(r.read_i64()?)),
            SCV_BYTES => Ok(ScVal::Bytes(r.read_var_bytes()?)),
            SCV_STRING => Ok(ScVal::String(r.read_string()?)),
            SCV_SYMBOL => Ok(ScVal::Symbol(r.read_string()?)),
            SCV_ADDRESS => Ok(ScVal::Address(ScAddress::read_xdr(r)?)),
            v => Err(DecodeError::UnknownDiscriminant { type_name: "ScVal", value: v as i64 }),
        }
    }
}

impl WriteXdr for ScVal {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            ScVal::Bool(b) => {
                w.write_i32(SCV_BOOL);
                w.write_bool(*b);
            }
            ScVal::U32(v) => {
                w.write_i32(SCV_U32);
                w.write_u32(*v);
            }
            ScVal::U64(v) => {
                w.write_i32(SCV_U64);
                w.write_u64(*v);
            }
            ScVal::I64(v) => {
                w.write_i32(SCV_I64);
                w.write_i64(*v);
            }
            ScVal::Bytes(bytes) => {
                w.write_i32(SCV_BYTES);
                w.write_var_bytes(bytes);
            }
            ScVal::String(s) => {
                w.write_i32(SCV_STRING);
                w.write_string(s);
            }
            ScVal::Symbol(s) => {
                w.write_i32(SCV_SYMBOL);
                w.write_string(s);
            }
            ScVal::Address(addr) => {
                w.write_i32(SCV_ADDRESS);
                addr.write_xdr(w);
            }
        }
    }
}
