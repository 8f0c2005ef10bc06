//! yt-dlp backed fetcher.
//!
//! Each call runs yt-dlp under a timeout inside its own temporary directory.
//! Downloaded subtitle and info files are read back and the directory is
//! removed when the call returns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

use hunter_models::{watch_link, Comment, ContentMetadata, DEFAULT_WATCH_BASE};

use crate::error::{WorkerError, WorkerResult};
use crate::fetch::Fetcher;

/// Fetcher shelling out to yt-dlp.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary: String,
    timeout: Duration,
    watch_base: String,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            watch_base: DEFAULT_WATCH_BASE.to_string(),
        }
    }

    pub fn with_watch_base(mut self, watch_base: impl Into<String>) -> Self {
        self.watch_base = watch_base.into();
        self
    }

    fn url(&self, content_id: &str) -> String {
        watch_link(&self.watch_base, content_id, None)
    }

    async fn run(&self, args: &[&str]) -> WorkerResult<std::process::Output> {
        debug!(binary = %self.binary, ?args, "Running yt-dlp");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary).args(args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| {
            WorkerError::timeout(format!("yt-dlp did not finish within {:?}", self.timeout))
        })?
        .map_err(|e| WorkerError::fetch_failed(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkerError::fetch_failed(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(output)
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch_metadata(&self, content_id: &str) -> WorkerResult<Option<ContentMetadata>> {
        let url = self.url(content_id);
        let output = self.run(&["--skip-download", "--no-warnings", "--dump-json", &url]).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let metadata = match stdout.lines().find(|line| !line.trim().is_empty()) {
            Some(line) => Some(parse_metadata_json(content_id, line)?),
            None => None,
        };

        if let Some(meta) = &metadata {
            info!(content_id, title = %meta.title, "Fetched metadata");
        }
        Ok(metadata.map(|mut meta| {
            meta.webpage_url = url;
            meta
        }))
    }

    async fn fetch_captions(
        &self,
        content_id: &str,
        language: &str,
    ) -> WorkerResult<Option<String>> {
        let workdir = TempDir::new()?;
        let template = workdir.path().join("%(id)s.%(ext)s");
        let template = template.to_string_lossy();
        let url = self.url(content_id);

        self.run(&[
            "--skip-download",
            "--write-auto-subs",
            "--sub-lang",
            language,
            "--convert-subs",
            "srt",
            "-o",
            &template,
            &url,
        ])
        .await?;

        let Some(path) = pick_subtitle_file(workdir.path(), language).await? else {
            info!(content_id, language, "No captions downloaded");
            return Ok(None);
        };

        let raw = tokio::fs::read_to_string(&path).await?;
        debug!(content_id, path = %path.display(), bytes = raw.len(), "Read caption file");
        Ok(Some(raw))
    }

    async fn fetch_comments(&self, content_id: &str) -> WorkerResult<Option<Vec<Comment>>> {
        let workdir = TempDir::new()?;
        let template = workdir.path().join("%(id)s.%(ext)s");
        let template = template.to_string_lossy();
        let url = self.url(content_id);

        self.run(&[
            "--skip-download",
            "--write-comments",
            "--write-info-json",
            "-o",
            &template,
            &url,
        ])
        .await?;

        let info_path = workdir.path().join(format!("{}.info.json", content_id));
        let contents = match tokio::fs::read_to_string(&info_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(content_id, "yt-dlp wrote no info file");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let comments = parse_info_comments(&contents)?;
        info!(content_id, count = comments.as_ref().map_or(0, Vec::len), "Fetched comments");
        Ok(comments)
    }
}

/// Pick the `.srt` file to read, preferring the requested language.
async fn pick_subtitle_file(dir: &Path, language: &str) -> WorkerResult<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("srt") {
            files.push(path);
        }
    }

    let lang_marker = format!(".{}.", language);
    files.sort_by_key(|p| {
        let name = p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        (!name.contains(&lang_marker), name)
    });
    Ok(files.into_iter().next())
}

#[derive(Debug, Deserialize)]
struct InfoJson {
    comments: Option<Vec<InfoComment>>,
}

#[derive(Debug, Deserialize)]
struct InfoComment {
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    author_thumbnail: Option<String>,
}

/// Comments from a yt-dlp info JSON; `None` when the key is missing.
fn parse_info_comments(contents: &str) -> WorkerResult<Option<Vec<Comment>>> {
    let info: InfoJson = serde_json::from_str(contents)?;
    Ok(info.comments.map(|comments| {
        comments
            .into_iter()
            .filter(|c| !c.text.trim().is_empty())
            .map(|c| Comment {
                id: c.id,
                author: c.author.unwrap_or_default(),
                text: c.text,
                author_thumbnail: c.author_thumbnail,
            })
            .collect()
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataJson {
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    upload_date: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    comment_count: Option<u64>,
    thumbnail: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build metadata from the info object printed by `--dump-json`.
fn parse_metadata_json(content_id: &str, json: &str) -> WorkerResult<ContentMetadata> {
    let info: MetadataJson = serde_json::from_str(json)?;
    let fallback = ContentMetadata::fallback(content_id);

    Ok(ContentMetadata {
        title: non_empty(info.title).unwrap_or(fallback.title),
        uploader: non_empty(info.uploader).or(non_empty(info.channel)).unwrap_or_default(),
        upload_date: info
            .upload_date
            .map(|d| format_upload_date(&d))
            .unwrap_or_default(),
        duration: info
            .duration
            .map(|d| format_duration(&(d.round() as u64).to_string()))
            .unwrap_or_default(),
        view_count: info
            .view_count
            .map(|n| format_count(&n.to_string()))
            .unwrap_or_default(),
        comment_count: info
            .comment_count
            .map(|n| format_count(&n.to_string()))
            .unwrap_or_default(),
        thumbnail: non_empty(info.thumbnail).unwrap_or(fallback.thumbnail),
        webpage_url: fallback.webpage_url,
    })
}

/// `YYYYMMDD` to `YYYY-MM-DD`; other shapes pass through.
pub fn format_upload_date(raw: &str) -> String {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..])
    } else {
        raw.to_string()
    }
}

/// Seconds to `H:MM:SS`, or `M:SS` under an hour; other shapes pass through.
pub fn format_duration(raw: &str) -> String {
    let Ok(total) = raw.parse::<u64>() else {
        return raw.to_string();
    };
    let (hours, rem) = (total / 3600, total % 3600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Abbreviate counts as `1.2K` / `3.4M`; other shapes pass through.
pub fn format_count(raw: &str) -> String {
    let Ok(count) = raw.parse::<u64>() else {
        return raw.to_string();
    };
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatters() {
        assert_eq!(format_upload_date("20240131"), "2024-01-31");
        assert_eq!(format_upload_date("soon"), "soon");
        assert_eq!(format_duration("3723"), "1:02:03");
        assert_eq!(format_duration("245"), "4:05");
        assert_eq!(format_count("999"), "999");
        assert_eq!(format_count("1230"), "1.2K");
        assert_eq!(format_count("3400000"), "3.4M");
    }

    #[test]
    fn test_parse_metadata_json() {
        let json = r#"{
            "id": "abc",
            "title": "A title",
            "uploader": "Uploader",
            "upload_date": "20230102",
            "view_count": 15300,
            "comment_count": null,
            "duration": 65.0,
            "thumbnail": "https://i.ytimg.com/vi/abc/hq.jpg"
        }"#;
        let meta = parse_metadata_json("abc", json).unwrap();
        assert_eq!(meta.title, "A title");
        assert_eq!(meta.uploader, "Uploader");
        assert_eq!(meta.upload_date, "2023-01-02");
        assert_eq!(meta.view_count, "15.3K");
        assert_eq!(meta.comment_count, "");
        assert_eq!(meta.duration, "1:05");
        assert_eq!(meta.thumbnail, "https://i.ytimg.com/vi/abc/hq.jpg");
    }

    #[test]
    fn test_metadata_title_with_separators() {
        let json = r#"{
            "title": "Part 1 | Part 2 | Finale",
            "channel": "Some Channel",
            "view_count": 12
        }"#;
        let meta = parse_metadata_json("abc", json).unwrap();
        assert_eq!(meta.title, "Part 1 | Part 2 | Finale");
        assert_eq!(meta.uploader, "Some Channel");
        assert_eq!(meta.view_count, "12");
    }

    #[test]
    fn test_parse_metadata_json_fallbacks() {
        let meta = parse_metadata_json("abc", r#"{"title": "", "thumbnail": null}"#).unwrap();
        assert_eq!(meta.title, "Video abc");
        assert_eq!(meta.thumbnail, "https://img.youtube.com/vi/abc/mqdefault.jpg");
        assert_eq!(meta.upload_date, "");
        assert!(parse_metadata_json("abc", "A title|Uploader|NA").is_err());
    }

    #[test]
    fn test_parse_info_comments() {
        let json = r#"{
            "id": "abc",
            "comments": [
                {"id": "c1", "text": "first", "author": "@one",
                 "author_thumbnail": "https://x/1.jpg"},
                {"id": "c2", "text": "  "},
                {"id": "c3", "text": "third"}
            ]
        }"#;
        let comments = parse_info_comments(json).unwrap().unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author, "@one");
        assert_eq!(comments[1].author, "");

        assert!(parse_info_comments(r#"{"id": "abc"}"#).unwrap().is_none());
        assert!(parse_info_comments("nope").is_err());
    }

    #[tokio::test]
    async fn test_pick_subtitle_file_prefers_language() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("abc.de.srt"), "x").await.unwrap();
        tokio::fs::write(dir.path().join("abc.en.srt"), "x").await.unwrap();
        tokio::fs::write(dir.path().join("abc.info.json"), "{}").await.unwrap();

        let picked = pick_subtitle_file(dir.path(), "en").await.unwrap().unwrap();
        assert!(picked.ends_with("abc.en.srt"));

        let empty = TempDir::new().unwrap();
        assert!(pick_subtitle_file(empty.path(), "en").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_fetch_error() {
        let fetcher = YtDlpFetcher::new("/nonexistent/yt-dlp", Duration::from_secs(5));
        let err = fetcher.fetch_captions("abc", "en").await.unwrap_err();
        assert!(matches!(err, WorkerError::FetchFailed(_)));
    }
}
