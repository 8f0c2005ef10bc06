//! SRT record parsing.
//!
//! A record is an index line, a `HH:MM:SS,mmm --> HH:MM:SS,mmm` timing line
//! and one or more text lines, terminated by a blank line or end of input.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use hunter_models::CaptionBlock;

use crate::error::{CaptionError, CaptionResult};

/// Timing ranges that leak into text lines of malformed files.
static STRAY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{2}:\d{2}:\d{2}[,.]\d{3}\s*-->\s*\d{2}:\d{2}:\d{2}[,.]\d{3}")
        .expect("stray range pattern is valid")
});

/// Convert `HH:MM:SS,mmm` into fractional seconds.
pub fn parse_timestamp(timestamp: &str) -> CaptionResult<f64> {
    let invalid = || CaptionError::InvalidTimestamp(timestamp.to_string());

    let (hms, millis) = timestamp.trim().split_once(',').ok_or_else(invalid)?;
    let parts: Vec<&str> = hms.split(':').collect();
    let [h, m, s] = parts.as_slice() else {
        return Err(invalid());
    };

    let field = |value: &str, width: usize| -> CaptionResult<u64> {
        if value.len() != width || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        value.parse::<u64>().map_err(|_| invalid())
    };

    let hours = field(h, 2)?;
    let minutes = field(m, 2)?;
    let seconds = field(s, 2)?;
    let millis = field(millis, 3)?;

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Parse one blank-line delimited record.
pub fn parse_record(lines: &[&str]) -> CaptionResult<CaptionBlock> {
    let (index_line, rest) = lines
        .split_first()
        .ok_or_else(|| CaptionError::Truncated(String::new()))?;
    let index_line = index_line.trim();
    let sequence_index = index_line
        .parse::<u32>()
        .map_err(|_| CaptionError::InvalidIndex(index_line.to_string()))?;

    let (timing_line, text_lines) = rest
        .split_first()
        .ok_or_else(|| CaptionError::Truncated(index_line.to_string()))?;
    let (start, end) = timing_line
        .split_once("-->")
        .ok_or_else(|| CaptionError::InvalidTiming(timing_line.to_string()))?;
    let start_seconds = parse_timestamp(start)?;
    parse_timestamp(end)?;

    let text = clean_text(text_lines);
    if text.is_empty() {
        return Err(CaptionError::EmptyText(sequence_index));
    }

    Ok(CaptionBlock::new(sequence_index, start_seconds, text))
}

/// Drop stray timing lines and collapse the rest into one line.
fn clean_text(lines: &[&str]) -> String {
    lines
        .iter()
        .filter(|line| !STRAY_RANGE.is_match(line))
        .flat_map(|line| line.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse raw caption text, skipping malformed records.
pub fn parse_captions(raw: &str) -> Vec<CaptionBlock> {
    let normalized = raw.trim_start_matches('\u{feff}').replace("\r\n", "\n");

    let mut blocks = Vec::new();
    let mut skipped = 0usize;
    let mut record: Vec<&str> = Vec::new();

    let mut flush = |record: &mut Vec<&str>, blocks: &mut Vec<CaptionBlock>| {
        if record.is_empty() {
            return;
        }
        match parse_record(record) {
            Ok(block) => blocks.push(block),
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "Skipping malformed caption record");
            }
        }
        record.clear();
    };

    for line in normalized.lines() {
        if line.trim().is_empty() {
            flush(&mut record, &mut blocks);
        } else {
            record.push(line);
        }
    }
    flush(&mut record, &mut blocks);

    debug!(parsed = blocks.len(), skipped, "Parsed caption records");
    blocks
}
