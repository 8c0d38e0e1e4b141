//! Structural checks on journal messages.

use crate::error::{CoreError, Result};
use crate::journal::{JournalMessage, MAX_MESSAGE_ENTRIES};

/// Validate a message's structure.
///
/// This checks:
/// - Entry count limit
/// - No empty hashes
/// - `start_epoch`/`end_epoch` equal the min/max entry timestamp
///
/// An empty message carries no window, so its epochs are not checked.
pub fn validate_message(message: &JournalMessage) -> Result<()> {
    if message.entries.len() > MAX_MESSAGE_ENTRIES {
        return Err(CoreError::InvalidMessage(format!(
            "{} entries exceeds limit of {}",
            message.entries.len(),
            MAX_MESSAGE_ENTRIES
        )));
    }

    let mut bounds: Option<(u64, u64)> = None;
    for entry in &message.entries {
        if entry.hash.is_empty() {
            return Err(CoreError::InvalidMessage("entry with empty hash".into()));
        }
        bounds = Some(match bounds {
            Some((lo, hi)) => (lo.min(entry.timestamp), hi.max(entry.timestamp)),
            None => (entry.timestamp, entry.timestamp),
        });
    }

    if let Some((min, max)) = bounds {
        if message.start_epoch != min || message.end_epoch != max {
            return Err(CoreError::InvalidMessage(format!(
                "window [{}, {}] does not match entries [{}, {}]",
                message.start_epoch, message.end_epoch, min, max
            )));
        }
    }

    Ok(())
}
