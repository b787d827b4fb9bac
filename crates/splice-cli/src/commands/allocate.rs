use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use splice_core::Medium;
use splice_engine::{allocate, identifier_lines, ribbon_chunks, CapacityStatus, RibbonChunk};
use tracing::warn;

use super::emit_json;
use crate::config::CliConfig;

#[derive(Args, Debug)]
pub struct AllocateArgs {
    /// Text file with one circuit identifier per line.
    #[arg(long)]
    pub input: PathBuf,
    /// Cable capacity to report against.
    #[arg(long)]
    pub capacity: Option<u32>,
    /// Medium deciding the ribbon size (fiber or copper).
    #[arg(long)]
    pub medium: Option<Medium>,
}

#[derive(Debug, Serialize)]
struct AllocationReport {
    medium: Medium,
    group_size: u32,
    assigned: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<CapacityStatus>,
    circuits: Vec<CircuitRow>,
    skipped: Vec<SkippedLine>,
}

#[derive(Debug, Serialize)]
struct CircuitRow {
    line: usize,
    identifier: String,
    strand_start: u32,
    strand_end: u32,
    ribbons: Vec<RibbonChunk>,
}

#[derive(Debug, Serialize)]
struct SkippedLine {
    line: usize,
    text: String,
    code: String,
    message: String,
}

pub fn run(args: &AllocateArgs, config: &CliConfig) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(&args.input)?;
    let medium = args.medium.unwrap_or(config.medium);
    let group_size = medium.group_size();
    let lines = identifier_lines(&text);
    let allocation = allocate(&lines);

    let skipped = allocation
        .rejected
        .iter()
        .map(|rejected| {
            warn!(line = rejected.position + 1, text = %rejected.text, "skipping malformed identifier");
            SkippedLine {
                line: rejected.position + 1,
                text: rejected.text.clone(),
                code: rejected.error.info().code.clone(),
                message: rejected.error.info().message.clone(),
            }
        })
        .collect();
    let circuits = allocation
        .spans
        .iter()
        .map(|entry| CircuitRow {
            line: entry.position + 1,
            identifier: entry.identifier.to_string(),
            strand_start: entry.span.start,
            strand_end: entry.span.end,
            ribbons: ribbon_chunks(entry.span, group_size),
        })
        .collect();

    let report = AllocationReport {
        medium,
        group_size,
        assigned: allocation.assigned(),
        status: args.capacity.map(|capacity| allocation.capacity_status(capacity)),
        circuits,
        skipped,
    };
    emit_json(&report)
}
