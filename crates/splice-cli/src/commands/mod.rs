pub mod allocate;
pub mod db;
pub mod plan;
pub mod segment;

use std::error::Error;
use std::io::{self, Write};

use serde::Serialize;
use splice_core::StrandSpan;

/// Pretty JSON on stdout.
pub fn emit_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(json.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

/// Parses `A-B` (or a single strand `A`) into a span.
pub fn parse_span(text: &str) -> Result<StrandSpan, String> {
    let (start, end) = match text.split_once('-') {
        Some((start, end)) => (start, end),
        None => (text, text),
    };
    let start: u32 = start
        .trim()
        .parse()
        .map_err(|_| format!("`{text}` is not a strand range"))?;
    let end: u32 = end
        .trim()
        .parse()
        .map_err(|_| format!("`{text}` is not a strand range"))?;
    if start == 0 || end < start {
        return Err(format!("`{text}` must be ascending and start at 1 or above"));
    }
    Ok(StrandSpan::new(start, end))
}
