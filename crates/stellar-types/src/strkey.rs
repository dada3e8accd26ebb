//! Strkey address encoding.
//!
//! Addresses are a version byte, the key payload, and a CRC16 checksum,
//! base32-encoded without padding. The version byte picks the leading
//! character: `G` for ed25519 account keys, `M` for multiplexed accounts,
//! `C` for contracts. Multiplexed payloads append the 64-bit id to the key
//! in big-endian order, and the checksum is appended little-endian.

use std::fmt;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

const VERSION_ED25519_PUBLIC_KEY: u8 = 6 << 3; // 'G'
const VERSION_MUXED_ED25519: u8 = 12 << 3; // 'M'
const VERSION_CONTRACT: u8 = 2 << 3; // 'C'

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrKeyError {
    InvalidCharacter(char),
    InvalidChecksum,
    InvalidLength { len: usize },
    UnexpectedVersion { expected: u8, found: u8 },
}

impl fmt::Display for StrKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrKeyError::InvalidCharacter(c) => {
                write!(f, "invalid base32 character {c:?} in strkey")
            }
            StrKeyError::InvalidChecksum => write!(f, "strkey checksum mismatch"),
            StrKeyError::InvalidLength { len } => {
                write!(f, "strkey payload has invalid length {len}")
            }
            StrKeyError::UnexpectedVersion { expected, found } => {
                write!(f, "strkey version byte {found:#04x}, expected {expected:#04x}")
            }
        }
    }
}

impl std::error::Error for StrKeyError {}

/// `G...` address for an ed25519 account key.
pub fn encode_ed25519_public_key(key: &[u8; 32]) -> String {
    encode(VERSION_ED25519_PUBLIC_KEY, key)
}

/// `M...` address for a multiplexed account.
pub fn encode_muxed_ed25519(key: &[u8; 32], id: u64) -> String {
    let mut payload = [0u8; 40];
    payload[..32].copy_from_slice(key);
    payload[32..].copy_from_slice(&id.to_be_bytes());
    encode(VERSION_MUXED_ED25519, &payload)
}

/// `C...` address for a contract.
pub fn encode_contract(contract_id: &[u8; 32]) -> String {
    encode(VERSION_CONTRACT, contract_id)
}

pub fn decode_ed25519_public_key(s: &str) -> Result<[u8; 32], StrKeyError> {
    let payload = decode(VERSION_ED25519_PUBLIC_KEY, s)?;
    fixed::<32>(&payload)
}

pub fn decode_muxed_ed25519(s: &str) -> Result<([u8; 32], u64), StrKeyError> {
    let payload = decode(VERSION_MUXED_ED25519, s)?;
    let raw = fixed::<40>(&payload)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&raw[..32]);
    let mut id = [0u8; 8];
    id.copy_from_slice(&raw[32..]);
    Ok((key, u64::from_be_bytes(id)))
}

pub fn decode_contract(s: &str) -> Result<[u8; 32], StrKeyError> {
    let payload = decode(VERSION_CONTRACT, s)?;
    fixed::<32>(&payload)
}

fn fixed<const N: usize>(payload: &[u8]) -> Result<[u8; N], StrKeyError> {
    if payload.len() != N {
        return Err(StrKeyError::InvalidLength { len: payload.len() });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(payload);
    Ok(out)
}

fn encode(version: u8, payload: &[u8]) -> String {
    let mut raw = Vec::with_capacity(payload.len() + 3);
    raw.push(version);
    raw.extend_from_slice(payload);
    let crc = crc16_xmodem(&raw);
    raw.extend_from_slice(&crc.to_le_bytes());
    base32_encode(&raw)
}

fn decode(version: u8, s: &str) -> Result<Vec<u8>, StrKeyError> {
    let raw = base32_decode(s)?;
    if raw.len() < 3 {
        return Err(StrKeyError::InvalidLength { len: raw.len() });
    }
    let (body, crc_bytes) = raw.split_at(raw.len() - 2);
    let crc = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
    if crc != crc16_xmodem(body) {
        return Err(StrKeyError::InvalidChecksum);
    }
    if body[0] != version {
        return Err(StrKeyError::UnexpectedVersion { expected: version, found: body[0] });
    }
    Ok(body[1..].to_vec())
}

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for &byte in data {
        acc = (acc << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((acc >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(ALPHABET[((acc << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn base32_decode(s: &str) -> Result<Vec<u8>, StrKeyError> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for c in s.chars() {
        let value = ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .ok_or(StrKeyError::InvalidCharacter(c))?;
        acc = (acc << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((acc >> bits) & 0xff) as u8);
        }
    }
    // Trailing bits are zero padding in a canonical key.
    if bits >= 5 || (acc & ((1 << bits) - 1)) != 0 {
        return Err(StrKeyError::InvalidLength { len: s.len() });
    }
    Ok(out)
}

fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x1021 } else { crc << 1 };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_round_trip() {
        let key = [0x3fu8; 32];
        let addr = encode_ed25519_public_key(&key);
        assert!(addr.starts_with('G'));
        assert_eq!(addr.len(), 56);
        assert_eq!(decode_ed25519_public_key(&addr).unwrap(), key);
    }

    #[test]
    fn muxed_round_trip() {
        let key = [0xa1u8; 32];
        let addr = encode_muxed_ed25519(&key, 123_456_789);
        assert!(addr.starts_with('M'));
        assert_eq!(addr.len(), 69);
        assert_eq!(decode_muxed_ed25519(&addr).unwrap(), (key, 123_456_789));
    }

    #[test]
    fn contract_round_trip() {
        let id = [0x07u8; 32];
        let addr = encode_contract(&id);
        assert!(addr.starts_with('C'));
        assert_eq!(addr.len(), 56);
        assert_eq!(decode_contract(&addr).unwrap(), id);
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let mut addr = encode_ed25519_public_key(&[5u8; 32]).into_bytes();
        let last = addr.len() - 1;
        addr[last] = if addr[last] == b'A' { b'B' } else { b'A' };
        let addr = String::from_utf8(addr).unwrap();
        assert!(matches!(
            decode_ed25519_public_key(&addr),
            Err(StrKeyError::InvalidChecksum | StrKeyError::InvalidLength { .. })
        ));
    }

    #[test]
    fn wrong_version_rejected() {
        let contract = encode_contract(&[9u8; 32]);
        assert!(matches!(
            decode_ed25519_public_key(&contract),
            Err(StrKeyError::UnexpectedVersion { .. })
        ));
    }

    #[test]
    fn lowercase_rejected() {
        let addr = encode_ed25519_public_key(&[5u8; 32]).to_lowercase();
        assert!(matches!(
            decode_ed25519_public_key(&addr),
            Err(StrKeyError::InvalidCharacter(_))
        ));
    }

    #[test]
    fn distinct_ids_yield_distinct_muxed_addresses() {
        let key = [0x55u8; 32];
        assert_ne!(encode_muxed_ed25519(&key, 0), encode_muxed_ed25519(&key, 1));
    }
}
