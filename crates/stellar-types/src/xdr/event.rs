//! Contract events as they appear inside transaction result metadata.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

use super::codec::{Hash, ReadXdr, WriteXdr, XdrReader, XdrWriter};
use super::scval::ScVal;

/// Wire values for the transaction-event stage discriminant.
///
/// The field is carried raw (see [`TransactionEvent::stage`]) so that a
/// future protocol version adding a stage decodes cleanly and fails at the
/// point where the stage must actually be interpreted.
pub const EVENT_STAGE_BEFORE_ALL_TXS: u32 = 0;
pub const EVENT_STAGE_AFTER_TX: u32 = 1;
pub const EVENT_STAGE_AFTER_ALL_TXS: u32 = 2;

/// An event emitted by a contract (or by the protocol itself, in which case
/// the contract id is absent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub contract_id: Option<Hash>,
    pub body: ContractEventBody,
}

impl ContractEvent {
    pub fn topics(&self) -> &[ScVal] {
        let ContractEventBody::V0(v0) = &self.body;
        &v0.topics
    }

    pub fn data(&self) -> &ScVal {
        let ContractEventBody::V0(v0) = &self.body;
        &v0.data
    }
}

impl ReadXdr for ContractEvent {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(ContractEvent {
            contract_id: r.read_option()?,
            body: ContractEventBody::read_xdr(r)?,
        })
    }
}

impl WriteXdr for ContractEvent {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_option(&self.contract_id);
        self.body.write_xdr(w);
    }
}

/// Versioned event body; only v0 exists today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEventBody {
    V0(ContractEventV0),
}

impl ReadXdr for ContractEventBody {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        match r.read_i32()? {
            0 => Ok(ContractEventBody::V0(ContractEventV0::read_xdr(r)?)),
            v => Err(DecodeError::UnknownDiscriminant {
                type_name: "ContractEventBody",
                value: v as i64,
            }),
        }
    }
}

impl WriteXdr for ContractEventBody {
    fn write_xdr(&self, w: &mut XdrWriter) {
        let ContractEventBody::V0(v0) = self;
        w.write_i32(0);
        v0.write_xdr(w);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEventV0 {
    pub topics: Vec<ScVal>,
    pub data: ScVal,
}

impl ReadXdr for ContractEventV0 {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(ContractEventV0 { topics: r.read_vec()?, data: ScVal::read_xdr(r)? })
    }
}

impl WriteXdr for ContractEventV0 {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_vec(&self.topics);
        self.data.write_xdr(w);
    }
}

/// A transaction-scoped event together with its execution stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Raw stage discriminant; interpreted by the event extractor.
    pub stage: u32,
    pub event: ContractEvent,
}

impl ReadXdr for TransactionEvent {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(TransactionEvent { stage: r.read_u32()?, event: ContractEvent::read_xdr(r)? })
    }
}

impl WriteXdr for TransactionEvent {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_u32(self.stage);
        self.event.write_xdr(w);
    }
}

/// Diagnostic event attached to a transaction's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub in_successful_contract_call: bool,
    pub event: ContractEvent,
}

impl ReadXdr for DiagnosticEvent {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(DiagnosticEvent {
            in_successful_contract_call: r.read_bool()?,
            event: ContractEvent::read_xdr(r)?,
        })
    }
}

impl WriteXdr for DiagnosticEvent {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_bool(self.in_successful_contract_call);
        self.event.write_xdr(w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdr::scval::ScAddress;

    fn sample_event(contract: Option<Hash>) -> ContractEvent {
        ContractEvent {
            contract_id: contract,
            body: ContractEventBody::V0(ContractEventV0 {
                topics: vec![
                    ScVal::symbol("transfer"),
                    ScVal::Address(ScAddress::Contract(Hash([1u8; 32]))),
                ],
                data: ScVal::I64(100),
            }),
        }
    }

    #[test]
    fn event_round_trip_preserves_optional_contract_id() {
        for contract in [None, Some(Hash([2u8; 32]))] {
            let ev = sample_event(contract);
            assert_eq!(ContractEvent::from_xdr(&ev.to_xdr()).unwrap(), ev);
        }
    }

    #[test]
    fn unknown_stage_still_decodes() {
        let tev = TransactionEvent { stage: 9, event: sample_event(None) };
        let decoded = TransactionEvent::from_xdr(&tev.to_xdr()).unwrap();
        assert_eq!(decoded.stage, 9);
    }
}
