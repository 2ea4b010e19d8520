//! Redaction of secrets from surfaced messages

use crate::instance::ResourceInstance;
use std::sync::Arc;

/// Placeholder substituted for sensitive values
pub const SUPPRESSED: &str = "*sensitive value suppressed*";

/// Rewrites text surfaced for one resource instance.
///
/// Applied by the executor, after sensitive values are redacted, to
/// provider failure messages and to the declared name and identity key
/// before they are logged or returned. Transforms should only hide or
/// reword; they run on short labels as well as full messages.
pub type MessageTransform = Arc<dyn Fn(&ResourceInstance, &str) -> String + Send + Sync>;

/// Replace every occurrence of each secret with [`SUPPRESSED`].
///
/// Occurrences are located in the original message, so overlapping
/// secrets collapse into one placeholder and no fragment of either leaks.
/// Empty secrets are ignored.
pub fn redact(message: &str, secrets: &[String]) -> String {
    let mut ranges: Vec<(usize, usize)> = secrets
        .iter()
        .filter(|s| !s.is_empty())
        .flat_map(|secret| {
            message
                .match_indices(secret.as_str())
                .map(|(start, hit)| (start, start + hit.len()))
        })
        .collect();
    ranges.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut redacted = String::with_capacity(message.len());
    let mut cursor = 0;
    for (start, end) in merged {
        redacted.push_str(&message[cursor..start]);
        redacted.push_str(SUPPRESSED);
        cursor = end;
    }
    redacted.push_str(&message[cursor..]);
    redacted
}
