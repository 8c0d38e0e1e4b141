//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use journal_core::{ContentHash, Epoch, JournalEntry, JournalMessage, JournalRecord};

/// Generate a plausible journal time.
pub fn epoch() -> impl Strategy<Value = Epoch> {
    1_600_000_000u64..1_800_000_000
}

/// Generate a journal of up to `max` records with distinct hashes.
pub fn journal(max: usize) -> impl Strategy<Value = Vec<JournalRecord>> {
    prop::collection::btree_map(any::<[u8; 32]>(), epoch(), 0..=max).prop_map(|m| {
        m.into_iter()
            .map(|(h, ts)| JournalRecord::new(ts, ContentHash::from_bytes(h.to_vec())))
            .collect()
    })
}

/// Generate a message whose window matches its entries.
pub fn journal_message(max_entries: usize) -> impl Strategy<Value = JournalMessage> {
    (journal(max_entries), epoch()).prop_map(|(records, current)| {
        let entries: Vec<JournalEntry> = records
            .into_iter()
            .map(|r| JournalEntry::new(r.timestamp, true, r.hash))
            .collect();
        JournalMessage {
            start_epoch: entries.iter().map(|e| e.timestamp).min().unwrap_or(0),
            end_epoch: entries.iter().map(|e| e.timestamp).max().unwrap_or(0),
            current_epoch: current,
            offer: false,
            entries,
        }
    })
}

/// Two journals that overlap: shared content (some at diverging times)
/// plus content only one side has.
#[derive(Debug, Clone)]
pub struct JournalPair {
    pub local: Vec<JournalRecord>,
    pub remote: Vec<JournalRecord>,
}

impl Arbitrary for JournalPair {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: ()) -> Self::Strategy {
        // Per hash: (local time, remote time), either side optional.
        prop::collection::btree_map(
            any::<u16>(),
            (prop::option::of(0u64..500), prop::option::of(0u64..500)),
            0..40,
        )
        .prop_map(|m: BTreeMap<u16, (Option<Epoch>, Option<Epoch>)>| {
            let mut pair = JournalPair {
                local: Vec::new(),
                remote: Vec::new(),
            };
            for (key, (local, remote)) in m {
                let hash = ContentHash::from_bytes(key.to_be_bytes().to_vec());
                if let Some(ts) = local {
                    pair.local.push(JournalRecord::new(ts, hash.clone()));
                }
                if let Some(ts) = remote {
                    pair.remote.push(JournalRecord::new(ts, hash));
                }
            }
            pair
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::{decode_message, encode_message, validate_message};

    proptest! {
        #[test]
        fn generated_messages_are_valid(message in journal_message(20)) {
            prop_assert!(validate_message(&message).is_ok());
        }

        #[test]
        fn generated_messages_decode_to_themselves(message in journal_message(20)) {
            let bytes = encode_message(&message).unwrap();
            prop_assert_eq!(decode_message(&bytes).unwrap(), message);
        }

        #[test]
        fn journal_hashes_are_distinct(records in journal(30)) {
            let mut hashes: Vec<_> = records.iter().map(|r| r.hash.clone()).collect();
            hashes.sort();
            hashes.dedup();
            prop_assert_eq!(hashes.len(), records.len());
        }
    }
}
