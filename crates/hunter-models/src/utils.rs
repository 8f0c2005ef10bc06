//! Content id extraction and platform link helpers.

use thiserror::Error;
use url::Url;

/// Base URL of the watch page used for flag links.
pub const DEFAULT_WATCH_BASE: &str = "https://www.youtube.com/watch";

/// Errors that can occur during content id extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentIdError {
    #[error("empty content reference")]
    Empty,

    #[error("content id not found in URL: {0}")]
    NotFound(String),

    #[error("invalid content id: {0}")]
    Invalid(String),
}

/// Extract a content id from a watch URL or accept a bare id.
///
/// Supports:
/// - https://youtube.com/watch?v=VIDEO_ID
/// - https://youtu.be/VIDEO_ID
/// - https://youtube.com/embed/VIDEO_ID, /v/VIDEO_ID, /shorts/VIDEO_ID, /live/VIDEO_ID
/// - A bare id made of `[A-Za-z0-9_-]`
pub fn extract_content_id(input: &str) -> Result<String, ContentIdError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ContentIdError::Empty);
    }

    let lower = input.to_ascii_lowercase();
    if !(lower.contains("youtube.com") || lower.contains("youtu.be")) {
        return validate_id(input);
    }

    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    let url = Url::parse(&with_scheme).map_err(|_| ContentIdError::NotFound(input.to_string()))?;

    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        return validate_id(&v);
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let host = url.host_str().unwrap_or_default();
    if host.ends_with("youtu.be") {
        if let Some(id) = segments.first() {
            return validate_id(id);
        }
    }

    if let [prefix, id, ..] = segments.as_slice() {
        if matches!(*prefix, "embed" | "v" | "shorts" | "live") {
            return validate_id(id);
        }
    }

    Err(ContentIdError::NotFound(input.to_string()))
}

fn validate_id(id: &str) -> Result<String, ContentIdError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(id.to_string())
    } else {
        Err(ContentIdError::Invalid(id.to_string()))
    }
}

/// Watch page link, optionally positioned at `at_secs`.
pub fn watch_link(base: &str, content_id: &str, at_secs: Option<u64>) -> String {
    match at_secs {
        Some(t) => format!("{}?v={}&t={}", base, content_id, t),
        None => format!("{}?v={}", base, content_id),
    }
}

/// Watch page link that highlights one comment.
pub fn comment_link(base: &str, content_id: &str, comment_id: &str) -> String {
    format!("{}?v={}&lc={}", base, content_id, comment_id)
}
