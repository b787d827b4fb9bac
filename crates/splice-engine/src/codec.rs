//! Circuit identifier codec for the `prefix,start-end` format.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use splice_core::errors::{ErrorInfo, SpliceError};

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([^,]+?)\s*,\s*([0-9]+)\s*-\s*([0-9]+)\s*$").expect("identifier pattern compiles")
});

/// Parsed form of a `prefix,start-end` circuit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CircuitIdentifier {
    /// Text before the comma, trimmed.
    pub prefix: String,
    /// First logical number of the range.
    pub range_start: u32,
    /// Last logical number of the range.
    pub range_end: u32,
}

impl CircuitIdentifier {
    /// Number of strands the identifier claims. Zero for a reversed range;
    /// saturates at `u32::MAX` for hand-built values `parse` would reject.
    pub fn width(&self) -> u32 {
        if self.range_end < self.range_start {
            return 0;
        }
        (self.range_end - self.range_start).saturating_add(1)
    }

    /// Same prefix and `other`'s range lies entirely inside this one.
    pub fn contains(&self, other: &CircuitIdentifier) -> bool {
        self.prefix == other.prefix
            && other.range_start >= self.range_start
            && other.range_end <= self.range_end
    }
}

impl fmt::Display for CircuitIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}-{}", self.prefix, self.range_start, self.range_end)
    }
}

impl FromStr for CircuitIdentifier {
    type Err = SpliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parses `prefix,start-end`, trimming whitespace around every token.
pub fn parse(identifier: &str) -> Result<CircuitIdentifier, SpliceError> {
    let Some(captures) = IDENTIFIER_RE.captures(identifier) else {
        return Err(classify_failure(identifier));
    };
    let prefix = captures[1].trim();
    if prefix.is_empty() {
        return Err(malformed(identifier, "empty-prefix", "prefix before the comma is empty"));
    }
    let range_start = parse_bound(identifier, &captures[2])?;
    let range_end = parse_bound(identifier, &captures[3])?;
    if range_start > range_end {
        return Err(SpliceError::MalformedIdentifier(
            ErrorInfo::new("reversed-range", "range start is greater than range end")
                .with_context("identifier", identifier)
                .with_context("start", range_start.to_string())
                .with_context("end", range_end.to_string())
                .with_hint(format!("did you mean {prefix},{range_end}-{range_start}?")),
        ));
    }
    if (range_end - range_start).checked_add(1).is_none() {
        return Err(SpliceError::MalformedIdentifier(
            ErrorInfo::new("range-too-wide", "range covers more strands than can be numbered")
                .with_context("identifier", identifier)
                .with_context("start", range_start.to_string())
                .with_context("end", range_end.to_string()),
        ));
    }
    Ok(CircuitIdentifier {
        prefix: prefix.to_string(),
        range_start,
        range_end,
    })
}

/// Width of the identifier's range.
pub fn width(identifier: &str) -> Result<u32, SpliceError> {
    parse(identifier).map(|parsed| parsed.width())
}

/// Inverse of [`parse`].
pub fn format(prefix: &str, start: u32, end: u32) -> String {
    format!("{prefix},{start}-{end}")
}

fn parse_bound(identifier: &str, digits: &str) -> Result<u32, SpliceError> {
    digits.parse::<u32>().map_err(|_| {
        SpliceError::MalformedIdentifier(
            ErrorInfo::new("range-overflow", "range bound does not fit in 32 bits")
                .with_context("identifier", identifier)
                .with_context("bound", digits),
        )
    })
}

fn classify_failure(identifier: &str) -> SpliceError {
    let commas = identifier.matches(',').count();
    let (code, message) = match commas {
        0 => ("missing-comma", "expected a comma between prefix and range"),
        1 => match identifier.split_once(',') {
            Some((prefix, _)) if prefix.trim().is_empty() => {
                ("empty-prefix", "prefix before the comma is empty")
            }
            _ => ("bad-range", "expected a start-end pair of integers after the comma"),
        },
        _ => ("extra-comma", "expected exactly one comma"),
    };
    malformed(identifier, code, message)
}

fn malformed(identifier: &str, code: &str, message: &str) -> SpliceError {
    SpliceError::MalformedIdentifier(
        ErrorInfo::new(code, message)
            .with_context("identifier", identifier)
            .with_hint("identifiers look like `prefix,start-end`, e.g. `pon,1-12`"),
    )
}
