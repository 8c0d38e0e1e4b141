//! Deterministic CBOR codec for journal messages.
//!
//! Messages and entries are CBOR maps with small integer keys:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//!
//! The same message always encodes to the same bytes, so two nodes can
//! compare frames directly.

use std::io::Cursor;

use ciborium::value::Value;

use crate::error::{CoreError, Result};
use crate::journal::{JournalEntry, JournalMessage, MAX_MESSAGE_ENTRIES};
use crate::types::ContentHash;
use crate::validation::validate_message;

/// Message field keys.
mod keys {
    pub const START_EPOCH: u64 = 0;
    pub const END_EPOCH: u64 = 1;
    pub const CURRENT_EPOCH: u64 = 2;
    pub const ENTRIES: u64 = 3;
    /// Present only on offers.
    pub const OFFER: u64 = 4;
}

/// Entry field keys.
mod entry_keys {
    pub const TIMESTAMP: u64 = 0;
    pub const PIN: u64 = 1;
    pub const HASH: u64 = 2;
}

/// Converts journal messages to and from bytes.
pub trait MessageCodec: Send + Sync {
    fn encode(&self, message: &JournalMessage) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<JournalMessage>;
}

/// The default wire codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl MessageCodec for CborCodec {
    fn encode(&self, message: &JournalMessage) -> Result<Vec<u8>> {
        encode_message(message)
    }

    fn decode(&self, bytes: &[u8]) -> Result<JournalMessage> {
        decode_message(bytes)
    }
}

/// Encode a message to canonical CBOR.
pub fn encode_message(message: &JournalMessage) -> Result<Vec<u8>> {
    let value = message_to_cbor_value(message);
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value)?;
    Ok(buf)
}

/// Decode and validate a message.
pub fn decode_message(bytes: &[u8]) -> Result<JournalMessage> {
    if bytes.is_empty() {
        return Err(CoreError::Decoding("empty input".into()));
    }

    let mut cursor = Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(&mut cursor).map_err(|e| CoreError::Decoding(e.to_string()))?;

    if cursor.position() as usize != bytes.len() {
        return Err(CoreError::Decoding(format!(
            "{} trailing bytes",
            bytes.len() - cursor.position() as usize
        )));
    }

    let message = cbor_value_to_message(&value)?;
    validate_message(&message)?;
    Ok(message)
}

fn message_to_cbor_value(message: &JournalMessage) -> Value {
    let entries: Vec<Value> = message.entries.iter().map(entry_to_cbor_value).collect();

    let mut map = vec![
        (int(keys::START_EPOCH), int(message.start_epoch)),
        (int(keys::END_EPOCH), int(message.end_epoch)),
        (int(keys::CURRENT_EPOCH), int(message.current_epoch)),
        (int(keys::ENTRIES), Value::Array(entries)),
    ];
    if message.offer {
        map.push((int(keys::OFFER), Value::Bool(true)));
    }
    Value::Map(map)
}

fn entry_to_cbor_value(entry: &JournalEntry) -> Value {
    Value::Map(vec![
        (int(entry_keys::TIMESTAMP), int(entry.timestamp)),
        (int(entry_keys::PIN), Value::Bool(entry.pin)),
        (
            int(entry_keys::HASH),
            Value::Bytes(entry.hash.as_bytes().to_vec()),
        ),
    ])
}

fn int(n: u64) -> Value {
    Value::Integer(n.into())
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => {
            let n: i128 = (*i).into();
            if n < 0 {
                return Err(CoreError::Encoding("negative integer".into()));
            }
            encode_uint(buf, 0, n as u64);
        }
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => {
            encode_map_canonical(buf, entries)?;
        }
        Value::Bool(b) => {
            buf.push(if *b { 0xf5 } else { 0xf4 });
        }
        other => {
            return Err(CoreError::Encoding(format!(
                "unsupported CBOR value: {:?}",
                other
            )));
        }
    }
    Ok(())
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map with keys sorted by their encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

/// Look up a value in a CBOR map by integer key.
fn get(map: &[(Value, Value)], key: u64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| match k {
            Value::Integer(i) => u64::try_from(*i).map_or(false, |n| n == key),
            _ => false,
        })
        .map(|(_, v)| v)
}

fn get_u64(map: &[(Value, Value)], key: u64, name: &str) -> Result<u64> {
    match get(map, key) {
        Some(Value::Integer(i)) => u64::try_from(*i)
            .map_err(|_| CoreError::Decoding(format!("{} out of range", name))),
        Some(_) => Err(CoreError::Decoding(format!("{} is not an integer", name))),
        None => Err(CoreError::Decoding(format!("missing {}", name))),
    }
}

fn cbor_value_to_message(value: &Value) -> Result<JournalMessage> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::Decoding("expected map".into())),
    };

    let start_epoch = get_u64(map, keys::START_EPOCH, "start_epoch")?;
    let end_epoch = get_u64(map, keys::END_EPOCH, "end_epoch")?;
    let current_epoch = get_u64(map, keys::CURRENT_EPOCH, "current_epoch")?;

    let offer = match get(map, keys::OFFER) {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(CoreError::Decoding("offer is not a bool".into())),
    };

    let entries = match get(map, keys::ENTRIES) {
        Some(Value::Array(arr)) => {
            if arr.len() > MAX_MESSAGE_ENTRIES {
                return Err(CoreError::Decoding(format!(
                    "{} entries exceeds limit of {}",
                    arr.len(),
                    MAX_MESSAGE_ENTRIES
                )));
            }
            arr.iter()
                .map(cbor_value_to_entry)
                .collect::<Result<Vec<_>>>()?
        }
        Some(_) => return Err(CoreError::Decoding("entries is not an array".into())),
        None => return Err(CoreError::Decoding("missing entries".into())),
    };

    Ok(JournalMessage {
        start_epoch,
        end_epoch,
        current_epoch,
        offer,
        entries,
    })
}

fn cbor_value_to_entry(value: &Value) -> Result<JournalEntry> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::Decoding("entry is not a map".into())),
    };

    let timestamp = get_u64(map, entry_keys::TIMESTAMP, "timestamp")?;

    let pin = match get(map, entry_keys::PIN) {
        Some(Value::Bool(b)) => *b,
        _ => return Err(CoreError::Decoding("invalid pin".into())),
    };

    let hash = match get(map, entry_keys::HASH) {
        Some(Value::Bytes(b)) if !b.is_empty() => ContentHash::from_bytes(b.clone()),
        _ => return Err(CoreError::Decoding("invalid hash".into())),
    };

    Ok(JournalEntry {
        timestamp,
        pin,
        hash,
    })
}
