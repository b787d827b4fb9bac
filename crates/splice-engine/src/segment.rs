//! Ribbon/binder segmentation of strand ranges.
//!
//! Strands are numbered from 1. Strand `n` sits in ribbon `ceil(n / g)` at
//! position `((n - 1) mod g) + 1`, where `g` is the group size of the medium.
//! A splice between two ranges is cut wherever either side crosses a ribbon
//! boundary, so every emitted segment stays inside one ribbon on both sides.

use serde::{Deserialize, Serialize};
use splice_core::StrandSpan;

/// Ribbon (or binder) number holding `strand`.
pub fn ribbon_of(strand: u32, group_size: u32) -> u32 {
    (strand - 1) / group_size + 1
}

/// 1-based position of `strand` inside its ribbon.
pub fn position_in_ribbon(strand: u32, group_size: u32) -> u32 {
    (strand - 1) % group_size + 1
}

fn remaining_in_ribbon(strand: u32, group_size: u32) -> u32 {
    group_size - position_in_ribbon(strand, group_size) + 1
}

/// Whether a chunk fills its whole ribbon or only part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// Positions `1..=group_size`.
    FullRibbon,
    /// Any narrower slice.
    Partial,
}

impl SegmentKind {
    fn classify(pos_start: u32, pos_end: u32, group_size: u32) -> Self {
        if pos_start == 1 && pos_end == group_size {
            SegmentKind::FullRibbon
        } else {
            SegmentKind::Partial
        }
    }
}

/// One display row of a splice, confined to a single ribbon on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Distribution-side ribbon.
    pub dist_ribbon: u32,
    /// First Distribution position within the ribbon.
    pub dist_pos_start: u32,
    /// Last Distribution position within the ribbon.
    pub dist_pos_end: u32,
    /// Feed-side ribbon.
    pub feed_ribbon: u32,
    /// First Feed position within the ribbon.
    pub feed_pos_start: u32,
    /// Last Feed position within the ribbon.
    pub feed_pos_end: u32,
    /// First logical circuit number covered.
    pub circuit_sub_start: u32,
    /// Last logical circuit number covered.
    pub circuit_sub_end: u32,
}

impl Segment {
    /// Strands covered by the segment.
    pub fn width(&self) -> u32 {
        self.dist_pos_end - self.dist_pos_start + 1
    }

    /// Full only when both sides fill their ribbon.
    pub fn kind(&self, group_size: u32) -> SegmentKind {
        match (
            SegmentKind::classify(self.dist_pos_start, self.dist_pos_end, group_size),
            SegmentKind::classify(self.feed_pos_start, self.feed_pos_end, group_size),
        ) {
            (SegmentKind::FullRibbon, SegmentKind::FullRibbon) => SegmentKind::FullRibbon,
            _ => SegmentKind::Partial,
        }
    }

    /// Absolute Distribution strands of the segment.
    pub fn dist_span(&self, group_size: u32) -> StrandSpan {
        let base = (self.dist_ribbon - 1) * group_size;
        StrandSpan::new(base + self.dist_pos_start, base + self.dist_pos_end)
    }

    /// Absolute Feed strands of the segment.
    pub fn feed_span(&self, group_size: u32) -> StrandSpan {
        let base = (self.feed_ribbon - 1) * group_size;
        StrandSpan::new(base + self.feed_pos_start, base + self.feed_pos_end)
    }
}

/// Why a segmentation request produced no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidReason {
    /// The circuit has no feed range.
    MissingFeedRange,
    /// Group size was zero.
    ZeroGroupSize,
    /// A range started at strand zero.
    ZeroStrand,
    /// A range ended before it started.
    ReversedRange,
    /// Distribution and Feed ranges differ in width.
    WidthMismatch,
}

/// Validity marker carried by every [`Segmentation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentationStatus {
    /// Segments partition both ranges.
    Valid,
    /// Input was degenerate; there are no segments.
    Invalid(InvalidReason),
}

/// Rows produced for a splice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmentation {
    /// Segments in strand order.
    pub segments: Vec<Segment>,
    /// Validity marker.
    pub status: SegmentationStatus,
}

impl Segmentation {
    fn invalid(reason: InvalidReason) -> Self {
        Self {
            segments: Vec::new(),
            status: SegmentationStatus::Invalid(reason),
        }
    }

    /// Number of display rows.
    pub fn row_count(&self) -> usize {
        self.segments.len()
    }

    /// Whether the input was usable.
    pub fn is_valid(&self) -> bool {
        matches!(self.status, SegmentationStatus::Valid)
    }
}

/// Segments a splice with circuit numbering starting at 1.
pub fn segment(dist: StrandSpan, feed: Option<StrandSpan>, group_size: u32) -> Segmentation {
    segment_from(1, dist, feed, group_size)
}

/// Segments a splice, numbering the circuit's strands from `logical_start`.
pub fn segment_from(
    logical_start: u32,
    dist: StrandSpan,
    feed: Option<StrandSpan>,
    group_size: u32,
) -> Segmentation {
    let Some(feed) = feed else {
        return Segmentation::invalid(InvalidReason::MissingFeedRange);
    };
    if let Some(reason) = validate(&dist, &feed, group_size) {
        return Segmentation::invalid(reason);
    }

    let mut segments = Vec::new();
    let mut dist_cursor = dist.start;
    let mut feed_cursor = feed.start;
    let mut consumed = 0u32;
    while dist_cursor <= dist.end {
        let step = remaining_in_ribbon(dist_cursor, group_size)
            .min(remaining_in_ribbon(feed_cursor, group_size))
            .min(dist.end - dist_cursor + 1);
        let dist_pos = position_in_ribbon(dist_cursor, group_size);
        let feed_pos = position_in_ribbon(feed_cursor, group_size);
        segments.push(Segment {
            dist_ribbon: ribbon_of(dist_cursor, group_size),
            dist_pos_start: dist_pos,
            dist_pos_end: dist_pos + step - 1,
            feed_ribbon: ribbon_of(feed_cursor, group_size),
            feed_pos_start: feed_pos,
            feed_pos_end: feed_pos + step - 1,
            circuit_sub_start: logical_start.saturating_add(consumed),
            circuit_sub_end: logical_start.saturating_add(consumed + step - 1),
        });
        consumed += step;
        match dist_cursor.checked_add(step) {
            Some(next) => dist_cursor = next,
            None => break,
        }
        feed_cursor = feed_cursor.saturating_add(step);
    }
    Segmentation {
        segments,
        status: SegmentationStatus::Valid,
    }
}

fn validate(dist: &StrandSpan, feed: &StrandSpan, group_size: u32) -> Option<InvalidReason> {
    if group_size == 0 {
        return Some(InvalidReason::ZeroGroupSize);
    }
    if dist.start == 0 || feed.start == 0 {
        return Some(InvalidReason::ZeroStrand);
    }
    if dist.end < dist.start || feed.end < feed.start {
        return Some(InvalidReason::ReversedRange);
    }
    if dist.width() != feed.width() {
        return Some(InvalidReason::WidthMismatch);
    }
    None
}

/// Single-sided slice of a cable's own strands within one ribbon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RibbonChunk {
    /// Ribbon number.
    pub ribbon: u32,
    /// First position within the ribbon.
    pub pos_start: u32,
    /// Last position within the ribbon.
    pub pos_end: u32,
    /// Absolute strands covered.
    pub span: StrandSpan,
    /// Full or partial ribbon.
    pub kind: SegmentKind,
}

/// Splits `span` on ribbon boundaries. Degenerate input yields no chunks.
pub fn ribbon_chunks(span: StrandSpan, group_size: u32) -> Vec<RibbonChunk> {
    if group_size == 0 || span.start == 0 || span.end < span.start {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    let mut cursor = span.start;
    loop {
        let step = remaining_in_ribbon(cursor, group_size).min(span.end - cursor + 1);
        let pos_start = position_in_ribbon(cursor, group_size);
        let pos_end = pos_start + step - 1;
        chunks.push(RibbonChunk {
            ribbon: ribbon_of(cursor, group_size),
            pos_start,
            pos_end,
            span: StrandSpan::new(cursor, cursor + step - 1),
            kind: SegmentKind::classify(pos_start, pos_end, group_size),
        });
        match cursor.checked_add(step) {
            Some(next) if next <= span.end => cursor = next,
            _ => break,
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ribbon_arithmetic() {
        assert_eq!(ribbon_of(1, 12), 1);
        assert_eq!(ribbon_of(12, 12), 1);
        assert_eq!(ribbon_of(13, 12), 2);
        assert_eq!(position_in_ribbon(13, 12), 1);
        assert_eq!(position_in_ribbon(50, 25), 25);
        assert_eq!(ribbon_of(51, 25), 3);
    }

    #[test]
    fn aligned_ranges_emit_one_row_per_ribbon() {
        let rows = segment(StrandSpan::new(1, 24), Some(StrandSpan::new(13, 36)), 12);
        assert!(rows.is_valid());
        assert_eq!(rows.row_count(), 2);
        assert_eq!(rows.segments[0].feed_ribbon, 2);
        assert_eq!(rows.segments[1].circuit_sub_start, 13);
        assert_eq!(rows.segments[1].kind(12), SegmentKind::FullRibbon);
    }

    #[test]
    fn misaligned_ranges_cut_on_both_boundaries() {
        // dist starts mid-ribbon at 5, feed is aligned at 13.
        let rows = segment(StrandSpan::new(5, 16), Some(StrandSpan::new(13, 24)), 12);
        let shape: Vec<_> = rows
            .segments
            .iter()
            .map(|s| (s.dist_ribbon, s.dist_pos_start, s.dist_pos_end, s.feed_ribbon, s.feed_pos_start, s.feed_pos_end))
            .collect();
        assert_eq!(shape, vec![(1, 5, 12, 2, 1, 8), (2, 1, 4, 2, 9, 12)]);
        assert_eq!(rows.segments[0].kind(12), SegmentKind::Partial);
    }

    #[test]
    fn three_way_split() {
        let rows = segment(StrandSpan::new(10, 20), Some(StrandSpan::new(3, 13)), 12);
        let widths: Vec<_> = rows.segments.iter().map(Segment::width).collect();
        assert_eq!(widths, vec![3, 7, 1]);
        assert_eq!(rows.segments[2].feed_span(12), StrandSpan::new(13, 13));
        assert_eq!(rows.segments[2].dist_span(12), StrandSpan::new(20, 20));
    }

    #[test]
    fn logical_numbering_follows_identifier() {
        let rows = segment_from(3, StrandSpan::new(11, 14), Some(StrandSpan::new(3, 6)), 12);
        assert_eq!(rows.segments[0].circuit_sub_start, 3);
        assert_eq!(rows.segments.last().unwrap().circuit_sub_end, 6);
    }

    #[test]
    fn top_of_strand_numbering() {
        let span = StrandSpan::new(u32::MAX - 13, u32::MAX);
        let rows = segment_from(u32::MAX - 1, span, Some(span), 12);
        assert!(rows.is_valid());
        let total: u32 = rows.segments.iter().map(Segment::width).sum();
        assert_eq!(total, 14);
        assert_eq!(rows.segments.last().map(|row| row.circuit_sub_end), Some(u32::MAX));

        let whole = segment(StrandSpan::new(0, u32::MAX), Some(StrandSpan::new(0, u32::MAX)), 12);
        assert_eq!(whole.status, SegmentationStatus::Invalid(InvalidReason::ZeroStrand));
    }

    #[test]
    fn degenerate_input_is_marked_invalid() {
        let missing = segment(StrandSpan::new(1, 4), None, 12);
        assert_eq!(missing.row_count(), 0);
        assert_eq!(missing.status, SegmentationStatus::Invalid(InvalidReason::MissingFeedRange));

        let mismatch = segment(StrandSpan::new(1, 4), Some(StrandSpan::new(1, 5)), 12);
        assert_eq!(mismatch.status, SegmentationStatus::Invalid(InvalidReason::WidthMismatch));

        let zero = segment(StrandSpan::new(1, 4), Some(StrandSpan::new(1, 4)), 0);
        assert_eq!(zero.status, SegmentationStatus::Invalid(InvalidReason::ZeroGroupSize));

        let reversed = segment(StrandSpan::new(4, 1), Some(StrandSpan::new(1, 4)), 12);
        assert_eq!(reversed.status, SegmentationStatus::Invalid(InvalidReason::ReversedRange));
    }

    #[test]
    fn copper_binders() {
        let chunks = ribbon_chunks(StrandSpan::new(20, 60), 25);
        let spans: Vec<_> = chunks.iter().map(|c| c.span).collect();
        assert_eq!(
            spans,
            vec![StrandSpan::new(20, 25), StrandSpan::new(26, 50), StrandSpan::new(51, 60)]
        );
        assert_eq!(chunks[1].kind, SegmentKind::FullRibbon);
        assert_eq!(chunks[2].kind, SegmentKind::Partial);
    }
}
