//! Overlap detection between splice claims on the same Feed cable.

use splice_core::errors::{ErrorInfo, SpliceError};
use splice_core::{CableId, Circuit, CircuitId, SpliceLink};

/// Returns the first spliced circuit, other than `excluding`, whose claim on
/// `feed_cable` overlaps `feed_start..=feed_end`.
pub fn find_conflict<'a>(
    feed_cable: &CableId,
    feed_start: u32,
    feed_end: u32,
    excluding: &CircuitId,
    spliced: &'a [Circuit],
) -> Option<&'a Circuit> {
    spliced.iter().find(|other| {
        if &other.id == excluding {
            return false;
        }
        match &other.splice {
            Some(link) if &link.feed_cable_id == feed_cable => {
                feed_start <= link.feed_strand_end && link.feed_strand_start <= feed_end
            }
            _ => false,
        }
    })
}

/// Whether any other spliced circuit already claims part of the range.
pub fn has_conflict(
    feed_cable: &CableId,
    feed_start: u32,
    feed_end: u32,
    excluding: &CircuitId,
    spliced: &[Circuit],
) -> bool {
    find_conflict(feed_cable, feed_start, feed_end, excluding, spliced).is_some()
}

/// Fails with [`SpliceError::FeedRangeConflict`] naming the offending circuit.
pub fn ensure_free(
    candidate: &SpliceLink,
    circuit: &CircuitId,
    spliced: &[Circuit],
) -> Result<(), SpliceError> {
    let Some(other) = find_conflict(
        &candidate.feed_cable_id,
        candidate.feed_strand_start,
        candidate.feed_strand_end,
        circuit,
        spliced,
    ) else {
        return Ok(());
    };
    let claimed = other
        .splice
        .as_ref()
        .map(|link| link.feed_span().to_string())
        .unwrap_or_default();
    Err(SpliceError::FeedRangeConflict(
        ErrorInfo::new(
            "feed-overlap",
            format!(
                "feed strands {} on cable {} are already claimed by circuit `{}`",
                candidate.feed_span(),
                candidate.feed_cable_id,
                other.identifier
            ),
        )
        .with_context("circuit", circuit.as_str())
        .with_context("feed_cable", candidate.feed_cable_id.as_str())
        .with_context("requested", candidate.feed_span().to_string())
        .with_context("conflicting_circuit", other.id.as_str())
        .with_context("conflicting_identifier", other.identifier.clone())
        .with_context("claimed", claimed),
    ))
}
