//! Containment matching of Distribution circuits against Feed circuits.

use serde::{Deserialize, Serialize};
use splice_core::errors::{ErrorInfo, SpliceError};
use splice_core::{CableId, Circuit, CircuitId, SpliceLink, StrandSpan};

use crate::codec::{self, CircuitIdentifier};

/// Feed circuit chosen for a Distribution circuit and the strands it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMatch {
    /// Cable owning the matched Feed circuit.
    pub feed_cable_id: CableId,
    /// Matched Feed circuit.
    pub feed_circuit_id: CircuitId,
    /// Physical Feed strands corresponding to the Distribution range.
    pub feed_span: StrandSpan,
}

impl FeedMatch {
    /// Splice link to store on the Distribution circuit.
    pub fn link(&self) -> SpliceLink {
        SpliceLink {
            feed_cable_id: self.feed_cable_id.clone(),
            feed_strand_start: self.feed_span.start,
            feed_strand_end: self.feed_span.end,
        }
    }
}

/// Maps the Distribution range onto the Feed circuit's allocated strands.
///
/// `None` when `feed_identifier` does not contain `dist` or the shifted range
/// would run past the strand numbering.
pub fn translate(
    feed_circuit: &Circuit,
    feed_identifier: &CircuitIdentifier,
    dist: &CircuitIdentifier,
) -> Option<StrandSpan> {
    let base = feed_circuit.strand_start;
    let start = base.checked_add(dist.range_start.checked_sub(feed_identifier.range_start)?)?;
    let end = base.checked_add(dist.range_end.checked_sub(feed_identifier.range_start)?)?;
    Some(StrandSpan::new(start, end))
}

/// Scans `feed_circuits` in order for the first whose identifier contains `dist`.
///
/// Feed circuits with malformed identifiers, or whose strands cannot hold the
/// translated range, are never eligible. When several Feed circuits contain
/// the range, the earliest in `feed_circuits` wins.
pub fn find_feed_match(dist: &CircuitIdentifier, feed_circuits: &[Circuit]) -> Option<FeedMatch> {
    feed_circuits.iter().find_map(|feed| {
        let feed_identifier = codec::parse(&feed.identifier).ok()?;
        if !feed_identifier.contains(dist) {
            return None;
        }
        Some(FeedMatch {
            feed_span: translate(feed, &feed_identifier, dist)?,
            feed_cable_id: feed.cable_id.clone(),
            feed_circuit_id: feed.id.clone(),
        })
    })
}

/// Parses the Distribution circuit and requires a containing Feed circuit.
pub fn require_match(dist: &Circuit, feed_circuits: &[Circuit]) -> Result<FeedMatch, SpliceError> {
    let identifier = codec::parse(&dist.identifier)?;
    find_feed_match(&identifier, feed_circuits).ok_or_else(|| {
        SpliceError::NoMatchingFeedCircuit(
            ErrorInfo::new(
                "no-feed-match",
                format!(
                    "no feed circuit with prefix `{}` contains range {}-{}",
                    identifier.prefix, identifier.range_start, identifier.range_end
                ),
            )
            .with_context("circuit", dist.id.as_str())
            .with_context("prefix", identifier.prefix.clone())
            .with_context(
                "range",
                format!("{}-{}", identifier.range_start, identifier.range_end),
            )
            .with_hint("add a feed circuit covering this range or correct the identifier"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circuit(id: &str, cable: &str, identifier: &str, start: u32, end: u32) -> Circuit {
        Circuit {
            id: CircuitId::from_raw(id),
            cable_id: CableId::from_raw(cable),
            identifier: identifier.into(),
            order_index: 0,
            strand_start: start,
            strand_end: end,
            splice: None,
        }
    }

    #[test]
    fn translates_relative_to_feed_start() {
        let feeds = vec![
            circuit("f1", "feed", "olt,1-4", 1, 4),
            circuit("f2", "feed", "pon,1-12", 5, 16),
        ];
        let dist = codec::parse("pon,3-4").unwrap();
        let found = find_feed_match(&dist, &feeds).unwrap();
        assert_eq!(found.feed_circuit_id.as_str(), "f2");
        assert_eq!(found.feed_span, StrandSpan::new(7, 8));
    }

    #[test]
    fn offset_feed_range() {
        let feeds = vec![circuit("f", "feed", "pon,13-24", 1, 12)];
        let dist = codec::parse("pon,13-13").unwrap();
        assert_eq!(find_feed_match(&dist, &feeds).unwrap().feed_span, StrandSpan::new(1, 1));
    }

    #[test]
    fn first_match_wins() {
        let feeds = vec![
            circuit("first", "feed-a", "pon,1-24", 1, 24),
            circuit("second", "feed-b", "pon,1-12", 1, 12),
        ];
        let dist = codec::parse("pon,2-3").unwrap();
        let found = find_feed_match(&dist, &feeds).unwrap();
        assert_eq!(found.feed_circuit_id.as_str(), "first");
        assert_eq!(found.feed_cable_id.as_str(), "feed-a");
    }

    #[test]
    fn malformed_feed_circuits_are_skipped() {
        let feeds = vec![
            circuit("bad", "feed", "pon 1-12", 1, 12),
            circuit("good", "feed", "pon,1-12", 13, 24),
        ];
        let dist = codec::parse("pon,1-1").unwrap();
        assert_eq!(find_feed_match(&dist, &feeds).unwrap().feed_circuit_id.as_str(), "good");
    }

    #[test]
    fn translation_past_the_last_strand_is_skipped() {
        let feeds = vec![
            circuit("high", "feed", "pon,1-12", u32::MAX - 3, u32::MAX),
            circuit("low", "feed", "pon,1-12", 1, 12),
        ];
        let dist = codec::parse("pon,10-12").unwrap();
        let found = find_feed_match(&dist, &feeds).unwrap();
        assert_eq!(found.feed_circuit_id.as_str(), "low");
        assert_eq!(found.feed_span, StrandSpan::new(10, 12));

        let feed_identifier = codec::parse("pon,5-8").unwrap();
        assert_eq!(translate(&feeds[1], &feed_identifier, &codec::parse("pon,1-2").unwrap()), None);
    }

    #[test]
    fn partial_overlap_is_not_a_match() {
        let feeds = vec![circuit("f", "feed", "pon,1-12", 1, 12)];
        let dist = circuit("d", "dist", "pon,10-14", 1, 5);
        let err = require_match(&dist, &feeds).unwrap_err();
        assert_eq!(err.info().code, "no-feed-match");
        assert_eq!(err.info().context.get("range").map(String::as_str), Some("10-14"));
    }
}
