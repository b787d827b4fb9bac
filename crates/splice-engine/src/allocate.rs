//! Contiguous strand allocation over an ordered identifier list.

use serde::{Deserialize, Serialize};
use splice_core::errors::{ErrorInfo, SpliceError};
use splice_core::StrandSpan;

use crate::codec::{self, CircuitIdentifier};

/// Span assigned to one accepted identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedSpan {
    /// Position of the identifier in the input list.
    pub position: usize,
    /// Parsed identifier.
    pub identifier: CircuitIdentifier,
    /// Strands assigned to the identifier.
    pub span: StrandSpan,
}

/// Input entry that could not be allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedIdentifier {
    /// Position of the identifier in the input list.
    pub position: usize,
    /// Raw input text.
    pub text: String,
    /// Why the entry was skipped.
    pub error: SpliceError,
}

/// Pass/fail summary comparing assigned strands with a cable's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityStatus {
    /// Total strand count of the cable.
    pub capacity: u32,
    /// Strands covered by allocated spans.
    pub assigned: u32,
    /// All strands assigned exactly equal capacity.
    pub fully_assigned: bool,
    /// Assigned strands run past the capacity.
    pub over_capacity: bool,
}

impl CapacityStatus {
    /// Compares `assigned` against `capacity`.
    pub fn new(capacity: u32, assigned: u32) -> Self {
        Self {
            capacity,
            assigned,
            fully_assigned: assigned == capacity,
            over_capacity: assigned > capacity,
        }
    }
}

/// Result of walking an ordered identifier list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Allocation {
    /// Accepted identifiers in input order with contiguous spans.
    pub spans: Vec<AllocatedSpan>,
    /// Entries skipped because they failed to parse.
    pub rejected: Vec<RejectedIdentifier>,
}

impl Allocation {
    /// Last allocated strand, or zero for an empty allocation.
    pub fn assigned(&self) -> u32 {
        self.spans.last().map(|entry| entry.span.end).unwrap_or(0)
    }

    /// Capacity verdict for a cable of the given size.
    pub fn capacity_status(&self, capacity: u32) -> CapacityStatus {
        CapacityStatus::new(capacity, self.assigned())
    }

    /// Spans only, in order.
    pub fn strand_spans(&self) -> Vec<StrandSpan> {
        self.spans.iter().map(|entry| entry.span).collect()
    }
}

/// Walks `identifiers` in order assigning contiguous 1-based spans.
///
/// Malformed entries are collected in [`Allocation::rejected`] and consume
/// no strands. The result depends only on the ordered input.
pub fn allocate<S: AsRef<str>>(identifiers: &[S]) -> Allocation {
    let mut allocation = Allocation::default();
    // `None` once the strand numbering is exhausted.
    let mut cursor: Option<u32> = Some(1);
    for (position, raw) in identifiers.iter().enumerate() {
        let text = raw.as_ref();
        let identifier = match codec::parse(text) {
            Ok(identifier) => identifier,
            Err(error) => {
                allocation.rejected.push(RejectedIdentifier {
                    position,
                    text: text.to_string(),
                    error,
                });
                continue;
            }
        };
        let span = cursor.and_then(|start| {
            let end = start.checked_add(identifier.width().checked_sub(1)?)?;
            Some(StrandSpan::new(start, end))
        });
        let Some(span) = span else {
            allocation.rejected.push(RejectedIdentifier {
                position,
                text: text.to_string(),
                error: SpliceError::CapacityExceeded(
                    ErrorInfo::new("strand-overflow", "allocation runs past the strand numbering")
                        .with_context("identifier", text),
                ),
            });
            continue;
        };
        allocation.spans.push(AllocatedSpan {
            position,
            identifier,
            span,
        });
        cursor = span.end.checked_add(1);
    }
    allocation
}

/// Like [`allocate`] but fails on the first entry that cannot be allocated.
pub fn allocate_strict<S: AsRef<str>>(identifiers: &[S]) -> Result<Vec<StrandSpan>, SpliceError> {
    let mut allocation = allocate(identifiers);
    if !allocation.rejected.is_empty() {
        let first = allocation.rejected.swap_remove(0);
        return Err(first.error);
    }
    Ok(allocation.strand_spans())
}

/// Splits pasted text into candidate identifiers, one per non-blank line.
pub fn identifier_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}
