//! Golden test vectors for the journal wire format.
//!
//! Each vector pairs a message with its exact encoded bytes. Another
//! implementation of the protocol must produce and accept the same bytes.

use journal_core::{decode_message, encode_message, ContentHash, JournalEntry, JournalMessage};
use journal_sync::{PROTOCOL_ID, STREAM_HEADER};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The logical message.
    pub message: JournalMessage,
    /// Expected encoding (hex).
    pub expected_hex: &'static str,
}

/// Hex of the per-message stream header. The final byte is `n` (0x6e).
pub const STREAM_HEADER_HEX: &str = "2f697066732f6a6f75726e616c696f2f312e302e302f6e";

/// Hex of the protocol negotiation identifier.
pub const PROTOCOL_ID_HEX: &str = "2f697066732f6a6f75726e616c2f312e302e30";

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty message",
            message: JournalMessage::default(),
            expected_hex: "a40000010002000380",
        },
        GoldenVector {
            name: "single pinned entry",
            message: JournalMessage {
                start_epoch: 100,
                end_epoch: 100,
                current_epoch: 1_700_000_000,
                offer: false,
                entries: vec![JournalEntry::new(
                    100,
                    true,
                    ContentHash::from_bytes(vec![0x01, 0x02, 0x03, 0x04]),
                )],
            },
            expected_hex: "a4001864011864021a6553f1000381a300186401f5024401020304",
        },
        GoldenVector {
            name: "two entries newest first",
            message: JournalMessage {
                start_epoch: 100,
                end_epoch: 200,
                current_epoch: 1000,
                offer: false,
                entries: vec![
                    JournalEntry::new(200, true, ContentHash::from_bytes(vec![0xbb])),
                    JournalEntry::new(100, true, ContentHash::from_bytes(vec![0xaa])),
                ],
            },
            expected_hex: "a40018640118c8021903e80382a30018c801f50241bba300186401f50241aa",
        },
        GoldenVector {
            name: "unpinned entry",
            message: JournalMessage {
                start_epoch: 5,
                end_epoch: 5,
                current_epoch: 5,
                offer: false,
                entries: vec![JournalEntry::new(
                    5,
                    false,
                    ContentHash::from_bytes(vec![0xff]),
                )],
            },
            expected_hex: "a40005010502050381a3000501f40241ff",
        },
    ]
}

/// Check a vector in both directions. Returns a description of the first
/// mismatch.
pub fn verify_vector(vector: &GoldenVector) -> Result<(), String> {
    let encoded = encode_message(&vector.message)
        .map_err(|e| format!("{}: encode failed: {}", vector.name, e))?;
    let actual = hex::encode(&encoded);
    if actual != vector.expected_hex {
        return Err(format!(
            "{}: expected {}, got {}",
            vector.name, vector.expected_hex, actual
        ));
    }

    let bytes = hex::decode(vector.expected_hex)
        .map_err(|e| format!("{}: bad hex: {}", vector.name, e))?;
    let decoded =
        decode_message(&bytes).map_err(|e| format!("{}: decode failed: {}", vector.name, e))?;
    if decoded != vector.message {
        return Err(format!("{}: decoded message differs", vector.name));
    }
    Ok(())
}

/// Verify every vector, including the wire literals.
pub fn verify_all_vectors() -> Vec<String> {
    let mut failures: Vec<String> = all_vectors()
        .iter()
        .filter_map(|v| verify_vector(v).err())
        .collect();

    if hex::encode(STREAM_HEADER) != STREAM_HEADER_HEX {
        failures.push("stream header literal changed".into());
    }
    if hex::encode(PROTOCOL_ID) != PROTOCOL_ID_HEX {
        failures.push("protocol id literal changed".into());
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_verify() {
        let failures = verify_all_vectors();
        assert!(failures.is_empty(), "{:#?}", failures);
    }

    #[test]
    fn test_vector_names_unique() {
        let vectors = all_vectors();
        let mut names: Vec<_> = vectors.iter().map(|v| v.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), vectors.len());
    }
}
