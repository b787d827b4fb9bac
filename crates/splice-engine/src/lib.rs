#![deny(missing_docs)]

//! Strand allocation, splice matching and ribbon segmentation for fiber and
//! copper cables.
//!
//! The free functions are pure and deterministic; [`Coordinator`] strings them
//! together against a [`splice_core::CircuitStore`].

pub mod allocate;
pub mod codec;
pub mod conflict;
pub mod coordinator;
pub mod matcher;
pub mod segment;

pub use allocate::{
    allocate, allocate_strict, identifier_lines, AllocatedSpan, Allocation, CapacityStatus,
    RejectedIdentifier,
};
pub use codec::{format, parse, width, CircuitIdentifier};
pub use conflict::{ensure_free, find_conflict, has_conflict};
pub use coordinator::{relayout, BulkReport, CircuitChunks, Coordinator};
pub use matcher::{find_feed_match, require_match, translate, FeedMatch};
pub use segment::{
    position_in_ribbon, ribbon_chunks, ribbon_of, segment, segment_from, InvalidReason,
    RibbonChunk, Segment, SegmentKind, Segmentation, SegmentationStatus,
};
