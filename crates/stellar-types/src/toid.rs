//! Total-order identifiers.
//!
//! A TOID packs a ledger sequence, a one-based transaction application
//! index, and a one-based operation index into 63 bits of a `u64`, so the
//! numeric order of ids is exactly the chain's application order. Rendered
//! ids are zero-padded to 19 digits so the lexicographic order matches too.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const TX_INDEX_BITS: u32 = 20;
const OP_INDEX_BITS: u32 = 12;

const TX_INDEX_MASK: u32 = (1 << TX_INDEX_BITS) - 1;
const OP_INDEX_MASK: u32 = (1 << OP_INDEX_BITS) - 1;

/// Transaction index that sorts after every real transaction in a ledger.
/// Used for events that apply after the whole transaction set.
pub const AFTER_ALL_TX_INDEX: u32 = TX_INDEX_MASK;

/// A total-order identifier: `ledger_seq << 32 | tx_index << 12 | op_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Toid {
    pub ledger_seq: u32,
    pub tx_index: u32,
    pub op_index: u32,
}

impl Toid {
    /// Out-of-range transaction and operation indexes are masked to their
    /// field widths (20 and 12 bits).
    pub fn new(ledger_seq: u32, tx_index: u32, op_index: u32) -> Self {
        Toid {
            ledger_seq,
            tx_index: tx_index & TX_INDEX_MASK,
            op_index: op_index & OP_INDEX_MASK,
        }
    }

    pub fn pack(&self) -> u64 {
        (self.ledger_seq as u64) << 32
            | ((self.tx_index & TX_INDEX_MASK) as u64) << OP_INDEX_BITS
            | (self.op_index & OP_INDEX_MASK) as u64
    }

    pub fn unpack(value: u64) -> Self {
        Toid {
            ledger_seq: (value >> 32) as u32,
            tx_index: ((value >> OP_INDEX_BITS) as u32) & TX_INDEX_MASK,
            op_index: (value as u32) & OP_INDEX_MASK,
        }
    }

    /// Event id: the rendered TOID followed by a 10-digit per-scope event
    /// counter.
    pub fn event_id(&self, event_index: u32) -> String {
        format!("{:019}-{:010}", self.pack(), event_index)
    }
}

impl fmt::Display for Toid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:019}", self.pack())
    }
}

impl FromStr for Toid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Toid::unpack(s.parse()?))
    }
}
