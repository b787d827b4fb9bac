use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SpliceError};
use crate::ids::{CableId, CircuitId};

/// Physical medium of a cable. Fixes the ribbon/binder group size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    /// Fiber strands grouped into ribbons of 12.
    #[default]
    Fiber,
    /// Copper pairs grouped into binders of 25.
    Copper,
}

impl Medium {
    /// Number of consecutive strands per ribbon (fiber) or binder (copper).
    pub const fn group_size(self) -> u32 {
        match self {
            Medium::Fiber => 12,
            Medium::Copper => 25,
        }
    }

    /// Stable lowercase label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Medium::Fiber => "fiber",
            Medium::Copper => "copper",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Medium {
    type Err = SpliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fiber" => Ok(Medium::Fiber),
            "copper" => Ok(Medium::Copper),
            other => Err(SpliceError::InvalidOperation(
                ErrorInfo::new("unknown-medium", "medium must be fiber or copper")
                    .with_context("value", other),
            )),
        }
    }
}

/// Role a cable plays in a splice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CableRole {
    /// Splice source.
    Feed,
    /// Splice target.
    Distribution,
}

impl CableRole {
    /// Stable label used by stores and the CLI.
    pub const fn as_str(self) -> &'static str {
        match self {
            CableRole::Feed => "Feed",
            CableRole::Distribution => "Distribution",
        }
    }
}

impl fmt::Display for CableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CableRole {
    type Err = SpliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feed" => Ok(CableRole::Feed),
            "distribution" | "dist" => Ok(CableRole::Distribution),
            other => Err(SpliceError::InvalidOperation(
                ErrorInfo::new("unknown-role", "role must be Feed or Distribution")
                    .with_context("value", other),
            )),
        }
    }
}

/// Physical cable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cable {
    /// Opaque identifier.
    pub id: CableId,
    /// Display name, unique case-insensitively within its medium.
    pub name: String,
    /// Total strand/pair count.
    pub capacity: u32,
    /// Fiber or copper.
    pub medium: Medium,
    /// Feed or Distribution.
    pub role: CableRole,
}

impl Cable {
    /// Ribbon/binder group size implied by the medium.
    pub fn group_size(&self) -> u32 {
        self.medium.group_size()
    }

    /// Whether this cable is a splice source.
    pub fn is_feed(&self) -> bool {
        matches!(self.role, CableRole::Feed)
    }
}

/// Inclusive, 1-based strand range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StrandSpan {
    /// First strand of the range.
    pub start: u32,
    /// Last strand of the range.
    pub end: u32,
}

impl StrandSpan {
    /// Creates a span covering `start..=end`.
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Number of strands in the span. Zero for reversed spans.
    pub fn width(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start).saturating_add(1)
        }
    }

    /// Inclusive overlap test.
    pub fn overlaps(&self, other: &StrandSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Whether `other` lies entirely within this span.
    pub fn contains(&self, other: &StrandSpan) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

impl fmt::Display for StrandSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Association from a Distribution circuit to a sub-span of a Feed cable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpliceLink {
    /// Weak reference to the Feed cable.
    pub feed_cable_id: CableId,
    /// First Feed strand claimed.
    pub feed_strand_start: u32,
    /// Last Feed strand claimed.
    pub feed_strand_end: u32,
}

impl SpliceLink {
    /// The claimed Feed strands as a span.
    pub fn feed_span(&self) -> StrandSpan {
        StrandSpan::new(self.feed_strand_start, self.feed_strand_end)
    }
}

/// Logical slice of a cable's capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    /// Opaque identifier.
    pub id: CircuitId,
    /// Owning cable.
    pub cable_id: CableId,
    /// User-entered `prefix,start-end` text.
    pub identifier: String,
    /// Position within the cable, contiguous from zero.
    pub order_index: usize,
    /// First allocated strand. Computed.
    pub strand_start: u32,
    /// Last allocated strand. Computed.
    pub strand_end: u32,
    /// Splice link, only ever set on Distribution circuits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splice: Option<SpliceLink>,
}

impl Circuit {
    /// The allocated strands as a span.
    pub fn span(&self) -> StrandSpan {
        StrandSpan::new(self.strand_start, self.strand_end)
    }

    /// Whether the circuit carries a splice link.
    pub fn is_spliced(&self) -> bool {
        self.splice.is_some()
    }
}

/// Replacement for a circuit's splice link inside [`CircuitFields`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpliceUpdate {
    /// Attach or replace the link.
    Set(SpliceLink),
    /// Remove the link.
    Clear,
}

/// Partial update applied to one circuit. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CircuitFields {
    /// New identifier text.
    pub identifier: Option<String>,
    /// New order index.
    pub order_index: Option<usize>,
    /// New allocated span.
    pub span: Option<StrandSpan>,
    /// New splice state.
    pub splice: Option<SpliceUpdate>,
}

impl CircuitFields {
    /// Whether the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.identifier.is_none()
            && self.order_index.is_none()
            && self.span.is_none()
            && self.splice.is_none()
    }

    /// Writes the populated fields into `circuit`.
    pub fn apply_to(&self, circuit: &mut Circuit) {
        if let Some(identifier) = &self.identifier {
            circuit.identifier = identifier.clone();
        }
        if let Some(order_index) = self.order_index {
            circuit.order_index = order_index;
        }
        if let Some(span) = self.span {
            circuit.strand_start = span.start;
            circuit.strand_end = span.end;
        }
        match &self.splice {
            Some(SpliceUpdate::Set(link)) => circuit.splice = Some(link.clone()),
            Some(SpliceUpdate::Clear) => circuit.splice = None,
            None => {}
        }
    }
}
