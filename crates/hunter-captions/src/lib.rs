//! Caption segmentation.
//!
//! Turns raw SRT caption text into clean, time-bucketed text blocks:
//! - [`parse_captions`] reads records, skipping malformed ones
//! - [`group_blocks`] buckets blocks by start time
//! - [`merge_texts`] collapses text repeated across rolling captions
//! - [`segment`] runs the whole pipeline

pub mod error;
pub mod merge;
pub mod segment;
pub mod srt;

pub use error::{CaptionError, CaptionResult};
pub use merge::{longest_overlap, merge_texts};
pub use segment::{group_blocks, render_segments, segment, CaptionBucket};
pub use srt::{parse_captions, parse_record, parse_timestamp};
