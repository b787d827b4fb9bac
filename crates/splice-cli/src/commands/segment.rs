use std::error::Error;

use clap::Args;
use serde::Serialize;
use splice_core::{Medium, StrandSpan};
use splice_engine::{segment, SegmentKind, SegmentationStatus};

use super::{emit_json, parse_span};
use crate::config::CliConfig;

#[derive(Args, Debug)]
pub struct SegmentArgs {
    /// Distribution strands, `A-B`.
    #[arg(long, value_parser = parse_span)]
    pub dist: StrandSpan,
    /// Feed strands, `C-D`. Omitted for an unspliced circuit.
    #[arg(long, value_parser = parse_span)]
    pub feed: Option<StrandSpan>,
    /// Medium deciding the ribbon size (fiber or copper).
    #[arg(long)]
    pub medium: Option<Medium>,
}

#[derive(Debug, Serialize)]
struct SegmentReport {
    group_size: u32,
    status: SegmentationStatus,
    rows: Vec<SegmentRow>,
}

#[derive(Debug, Serialize)]
struct SegmentRow {
    dist_ribbon: u32,
    dist_positions: String,
    feed_ribbon: u32,
    feed_positions: String,
    circuits: String,
    kind: SegmentKind,
}

pub fn run(args: &SegmentArgs, config: &CliConfig) -> Result<(), Box<dyn Error>> {
    let group_size = args.medium.unwrap_or(config.medium).group_size();
    let segmentation = segment(args.dist, args.feed, group_size);
    let rows = segmentation
        .segments
        .iter()
        .map(|row| SegmentRow {
            dist_ribbon: row.dist_ribbon,
            dist_positions: format!("{}-{}", row.dist_pos_start, row.dist_pos_end),
            feed_ribbon: row.feed_ribbon,
            feed_positions: format!("{}-{}", row.feed_pos_start, row.feed_pos_end),
            circuits: format!("{}-{}", row.circuit_sub_start, row.circuit_sub_end),
            kind: row.kind(group_size),
        })
        .collect();
    emit_json(&SegmentReport {
        group_size,
        status: segmentation.status,
        rows,
    })
}
