//! Wire value encoding
//!
//! Each wire value is a one-byte header (present bit plus type tag)
//! followed by a type-specific payload; variable-size payloads are
//! length-prefixed. Batches are rows encoded back to back, walked by the
//! result cursor one value at a time. Row keys reuse the same codec over
//! the key columns in addressing order.

use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::types::Value;

const HEADER_PRESENT: u8 = 0x80;

const TAG_BOOL: u8 = 0x01;
const TAG_I16: u8 = 0x02;
const TAG_I32: u8 = 0x03;
const TAG_I64: u8 = 0x04;
const TAG_F64: u8 = 0x05;
const TAG_DECIMAL: u8 = 0x06;
const TAG_TEXT: u8 = 0x07;
const TAG_BINARY: u8 = 0x08;
const TAG_TIMESTAMP: u8 = 0x09;

/// A batch payload plus the byte offset the cursor has decoded up to.
#[derive(Debug, Default)]
pub struct RowBuffer {
    data: Vec<u8>,
    pos: usize,
}

impl RowBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        RowBuffer { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::Corruption("unexpected end of batch payload".into()))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_exact(&mut self, len: usize) -> Result<&[u8]> {
        if self.pos + len > self.data.len() {
            return Err(Error::Corruption("unexpected end of batch payload".into()));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.read_exact(4)?.try_into().unwrap();
        Ok(u32::from_le_bytes(bytes))
    }
}

/// Appends one value to an outgoing payload.
pub fn encode_value(value: &Value, output: &mut Vec<u8>) {
    match value {
        Value::Null => output.push(0x00),
        Value::Bool(b) => {
            output.push(HEADER_PRESENT | TAG_BOOL);
            output.push(*b as u8);
        }
        Value::I16(i) => {
            output.push(HEADER_PRESENT | TAG_I16);
            output.extend_from_slice(&i.to_le_bytes());
        }
        Value::I32(i) => {
            output.push(HEADER_PRESENT | TAG_I32);
            output.extend_from_slice(&i.to_le_bytes());
        }
        Value::I64(i) => {
            output.push(HEADER_PRESENT | TAG_I64);
            output.extend_from_slice(&i.to_le_bytes());
        }
        Value::F64(f) => {
            output.push(HEADER_PRESENT | TAG_F64);
            output.extend_from_slice(&f.to_le_bytes());
        }
        Value::Decimal(d) => {
            output.push(HEADER_PRESENT | TAG_DECIMAL);
            let repr = d.to_string();
            output.extend_from_slice(&(repr.len() as u32).to_le_bytes());
            output.extend_from_slice(repr.as_bytes());
        }
        Value::Str(s) => {
            output.push(HEADER_PRESENT | TAG_TEXT);
            output.extend_from_slice(&(s.len() as u32).to_le_bytes());
            output.extend_from_slice(s.as_bytes());
        }
        Value::Bytea(b) => {
            output.push(HEADER_PRESENT | TAG_BINARY);
            output.extend_from_slice(&(b.len() as u32).to_le_bytes());
            output.extend_from_slice(b);
        }
        Value::Timestamp(ts) => {
            output.push(HEADER_PRESENT | TAG_TIMESTAMP);
            output.extend_from_slice(&ts.and_utc().timestamp_micros().to_le_bytes());
        }
    }
}

/// Decodes one value from the buffer, advancing its offset.
pub fn decode_value(buf: &mut RowBuffer) -> Result<Value> {
    let header = buf.read_u8()?;
    if header & HEADER_PRESENT == 0 {
        return Ok(Value::Null);
    }
    match header & !HEADER_PRESENT {
        TAG_BOOL => Ok(Value::Bool(buf.read_u8()? != 0)),
        TAG_I16 => {
            let bytes: [u8; 2] = buf.read_exact(2)?.try_into().unwrap();
            Ok(Value::I16(i16::from_le_bytes(bytes)))
        }
        TAG_I32 => {
            let bytes: [u8; 4] = buf.read_exact(4)?.try_into().unwrap();
            Ok(Value::I32(i32::from_le_bytes(bytes)))
        }
        TAG_I64 => {
            let bytes: [u8; 8] = buf.read_exact(8)?.try_into().unwrap();
            Ok(Value::I64(i64::from_le_bytes(bytes)))
        }
        TAG_F64 => {
            let bytes: [u8; 8] = buf.read_exact(8)?.try_into().unwrap();
            Ok(Value::F64(f64::from_le_bytes(bytes)))
        }
        TAG_DECIMAL => {
            let len = buf.read_u32()? as usize;
            let repr = std::str::from_utf8(buf.read_exact(len)?)
                .map_err(|_| Error::Corruption("decimal payload is not utf-8".into()))?;
            let decimal = Decimal::from_str(repr)
                .map_err(|e| Error::Corruption(format!("bad decimal payload: {}", e)))?;
            Ok(Value::Decimal(decimal))
        }
        TAG_TEXT => {
            let len = buf.read_u32()? as usize;
            let text = std::str::from_utf8(buf.read_exact(len)?)
                .map_err(|_| Error::Corruption("text payload is not utf-8".into()))?;
            Ok(Value::Str(text.to_string()))
        }
        TAG_BINARY => {
            let len = buf.read_u32()? as usize;
            Ok(Value::Bytea(buf.read_exact(len)?.to_vec()))
        }
        TAG_TIMESTAMP => {
            let bytes: [u8; 8] = buf.read_exact(8)?.try_into().unwrap();
            let micros = i64::from_le_bytes(bytes);
            let ts = DateTime::from_timestamp_micros(micros)
                .ok_or_else(|| Error::Corruption("timestamp payload out of range".into()))?;
            Ok(Value::Timestamp(ts.naive_utc()))
        }
        tag => Err(Error::Corruption(format!("unknown wire type tag {:#x}", tag))),
    }
}

/// Encodes a row's key column values into stable key bytes. Used both for
/// store addressing and as the row-identity value exposed to callers.
pub fn encode_key(values: &[Value]) -> Vec<u8> {
    let mut key = Vec::new();
    for value in values {
        encode_value(value, &mut key);
    }
    key
}

/// 16-bit partition hash of encoded key bytes (FNV-1a folded to the hash
/// code space).
pub fn partition_hash(key: &[u8]) -> u16 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for &byte in key {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    ((hash >> 48) ^ (hash & 0xFFFF)) as u16
}
