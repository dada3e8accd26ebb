//! XDR wire primitives: byte-cursor reader/writer and the codec traits.
//!
//! XDR encodes fixed-width integers big-endian, pads opaque data to 4-byte
//! boundaries, length-prefixes variable arrays with a u32 count, and encodes
//! optionals as a u32 presence flag. Enum and union discriminants are signed
//! 32-bit values.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Cursor over an XDR byte buffer.
pub struct XdrReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> XdrReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof { wanted: n, remaining: self.remaining() });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn skip_padding(&mut self, len: usize) -> Result<(), DecodeError> {
        let pad = (4 - len % 4) % 4;
        for &b in self.take(pad)? {
            if b != 0 {
                return Err(DecodeError::NonZeroPadding);
            }
        }
        Ok(())
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(b))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(i32::from_be_bytes(b))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(b))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(i64::from_be_bytes(b))
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(DecodeError::UnknownDiscriminant { type_name: "bool", value: v as i64 }),
        }
    }

    /// Fixed-length opaque data, padded to a 4-byte boundary.
    pub fn read_opaque<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        self.skip_padding(N)?;
        Ok(out)
    }

    /// Variable-length opaque data: u32 length prefix, then padded bytes.
    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_u32()?;
        if len as usize > self.remaining() {
            return Err(DecodeError::LengthOverrun { declared: len, remaining: self.remaining() });
        }
        let out = self.take(len as usize)?.to_vec();
        self.skip_padding(len as usize)?;
        Ok(out)
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn read_option<T: ReadXdr>(&mut self) -> Result<Option<T>, DecodeError> {
        match self.read_u32()? {
            0 => Ok(None),
            1 => Ok(Some(T::read_xdr(self)?)),
            v => Err(DecodeError::UnknownDiscriminant { type_name: "option", value: v as i64 }),
        }
    }

    pub fn read_vec<T: ReadXdr>(&mut self) -> Result<Vec<T>, DecodeError> {
        let count = self.read_u32()?;
        // Every element occupies at least one byte on the wire, so a count
        // beyond the remaining buffer can never decode.
        if count as usize > self.remaining() {
            return Err(DecodeError::LengthOverrun { declared: count, remaining: self.remaining() });
        }
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            out.push(T::read_xdr(self)?);
        }
        Ok(out)
    }

    /// Errors if any bytes remain unconsumed.
    pub fn finish(self) -> Result<(), DecodeError> {
        if self.remaining() != 0 {
            return Err(DecodeError::TrailingBytes { remaining: self.remaining() });
        }
        Ok(())
    }
}

/// Append-only XDR byte writer.
#[derive(Default)]
pub struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn pad(&mut self, len: usize) {
        let pad = (4 - len % 4) % 4;
        self.buf.extend(std::iter::repeat(0u8).take(pad));
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u32(v as u32);
    }

    pub fn write_opaque(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.pad(bytes.len());
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.write_opaque(bytes);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_var_bytes(s.as_bytes());
    }

    pub fn write_option<T: WriteXdr>(&mut self, v: &Option<T>) {
        match v {
            None => self.write_u32(0),
            Some(inner) => {
                self.write_u32(1);
                inner.write_xdr(self);
            }
        }
    }

    pub fn write_vec<T: WriteXdr>(&mut self, v: &[T]) {
        self.write_u32(v.len() as u32);
        for item in v {
            item.write_xdr(self);
        }
    }
}

/// Decode a value from an XDR byte stream.
pub trait ReadXdr: Sized {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError>;

    /// Decode from a complete buffer; trailing bytes are an error.
    fn from_xdr(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = XdrReader::new(bytes);
        let v = Self::read_xdr(&mut r)?;
        r.finish()?;
        Ok(v)
    }

    fn from_xdr_base64(s: &str) -> Result<Self, DecodeError> {
        let bytes = BASE64.decode(s).map_err(|_| DecodeError::InvalidBase64)?;
        Self::from_xdr(&bytes)
    }
}

/// Encode a value to an XDR byte stream. Writing to a growable buffer cannot
/// fail, so the write side is infallible.
pub trait WriteXdr {
    fn write_xdr(&self, w: &mut XdrWriter);

    fn to_xdr(&self) -> Vec<u8> {
        let mut w = XdrWriter::new();
        self.write_xdr(&mut w);
        w.into_bytes()
    }

    fn to_xdr_base64(&self) -> String {
        BASE64.encode(self.to_xdr())
    }
}

/// 32-byte hash (SHA-256 output, ledger hashes, transaction hashes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(s).map_err(|_| DecodeError::InvalidHex)?;
        let mut out = [0u8; 32];
        if bytes.len() != 32 {
            return Err(DecodeError::InvalidHex);
        }
        out.copy_from_slice(&bytes);
        Ok(Hash(out))
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl ReadXdr for Hash {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, DecodeError> {
        Ok(Hash(r.read_opaque::<32>()?))
    }
}

impl WriteXdr for Hash {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_opaque(&self.0);
    }
}
