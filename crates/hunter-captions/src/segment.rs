//! Time bucketing of caption blocks.

use std::fmt::Write;

use tracing::debug;

use hunter_models::{CaptionBlock, MergedSegment};

use crate::merge::merge_texts;
use crate::srt::parse_captions;

/// Blocks grouped under one bucket start.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionBucket {
    pub start_seconds: f64,
    pub blocks: Vec<CaptionBlock>,
}

impl CaptionBucket {
    fn open(block: CaptionBlock) -> Self {
        Self {
            start_seconds: block.start_seconds,
            blocks: vec![block],
        }
    }

    /// Merge the text of all blocks in order.
    pub fn merged_text(&self) -> String {
        let texts: Vec<&str> = self.blocks.iter().map(|b| b.text.as_str()).collect();
        merge_texts(&texts)
    }
}

/// Greedily group blocks by start time.
///
/// A bucket starts at its first block and accepts later blocks while
/// `block_start - bucket_start <= threshold_secs`. A non-positive threshold
/// puts every block in its own bucket.
pub fn group_blocks(mut blocks: Vec<CaptionBlock>, threshold_secs: i64) -> Vec<CaptionBucket> {
    blocks.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));

    let threshold = threshold_secs as f64;
    let mut buckets: Vec<CaptionBucket> = Vec::new();

    for block in blocks {
        match buckets.last_mut() {
            Some(bucket)
                if threshold_secs > 0 && block.start_seconds - bucket.start_seconds <= threshold =>
            {
                bucket.blocks.push(block);
            }
            _ => buckets.push(CaptionBucket::open(block)),
        }
    }

    buckets
}

/// Parse, bucket and merge raw caption text.
pub fn segment(raw: &str, bucket_threshold_secs: i64) -> Vec<MergedSegment> {
    let blocks = parse_captions(raw);
    let block_count = blocks.len();

    let segments: Vec<MergedSegment> = group_blocks(blocks, bucket_threshold_secs)
        .iter()
        .map(|bucket| {
            MergedSegment::new(bucket.start_seconds.max(0.0).floor() as u64, bucket.merged_text())
        })
        .collect();

    debug!(
        blocks = block_count,
        segments = segments.len(),
        threshold_secs = bucket_threshold_secs,
        "Segmented captions"
    );
    segments
}

/// Render segments as `<seconds>\n<text>\n\n` records.
pub fn render_segments(segments: &[MergedSegment]) -> String {
    let mut out = String::new();
    for seg in segments {
        let _ = write!(out, "{}\n{}\n\n", seg.bucket_start_seconds, seg.text);
    }
    out
}
