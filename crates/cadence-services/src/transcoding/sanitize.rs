//! Turns raw worker failure text into a short message safe to store and show.

use anyhow::{Context, Result};
use cadence_core::constants::{DEFAULT_TRANSCODING_ERROR, TRANSCODING_ERROR_MAX_LEN};
use regex::Regex;

const TRACEBACK_MARKER: &str = "Traceback (most recent call last)";
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone)]
pub struct ErrorSanitizer {
    url: Regex,
    unix_path: Regex,
    windows_path: Regex,
    whitespace: Regex,
}

impl ErrorSanitizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            url: Regex::new(r"(?i)\b[a-z][a-z0-9+.\-]*://[^\s'\x22<>]+")
                .context("Failed to compile URL redaction regex")?,
            unix_path: Regex::new(r"(?P<pre>^|[\s(\['\x22=])/[A-Za-z0-9._\-]+(?:/[^\s'\x22,):]*)+")
                .context("Failed to compile path redaction regex")?,
            windows_path: Regex::new(r"\b[A-Za-z]:\\[^\s'\x22]+")
                .context("Failed to compile path redaction regex")?,
            whitespace: Regex::new(r"\s+").context("Failed to compile whitespace regex")?,
        })
    }

    /// Bounded, infrastructure-free version of a worker error message.
    ///
    /// Python tracebacks are reduced to their final exception line. URLs
    /// become `[url]` and absolute filesystem paths `[path]`.
    pub fn sanitize(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return DEFAULT_TRANSCODING_ERROR.to_string();
        };

        let text = if raw.contains(TRACEBACK_MARKER) {
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last()
                .unwrap_or_default()
                .to_string()
        } else {
            raw.to_string()
        };

        let text = self.url.replace_all(&text, "[url]");
        let text = self.windows_path.replace_all(&text, "[path]");
        let text = self.unix_path.replace_all(&text, "${pre}[path]");
        let text = self.whitespace.replace_all(&text, " ");
        let text = text.trim();

        if text.is_empty() {
            return DEFAULT_TRANSCODING_ERROR.to_string();
        }
        truncate_chars(text, TRANSCODING_ERROR_MAX_LEN)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(raw: Option<&str>) -> String {
        ErrorSanitizer::new().unwrap().sanitize(raw)
    }

    #[test]
    fn plain_messages_pass_through() {
        assert_eq!(sanitize(Some("Corrupt input file")), "Corrupt input file");
    }

    #[test]
    fn empty_messages_get_default() {
        assert_eq!(sanitize(None), DEFAULT_TRANSCODING_ERROR);
        assert_eq!(sanitize(Some("   \n ")), DEFAULT_TRANSCODING_ERROR);
    }

    #[test]
    fn tracebacks_reduce_to_exception_line() {
        let raw = "Traceback (most recent call last):\n  \
                   File \"/app/handler/main.py\", line 695, in handler\n    \
                   probe_data = probe_media(input_path)\n\
                   RuntimeError: ffprobe failed: moov atom not found\n";
        assert_eq!(sanitize(Some(raw)), "RuntimeError: ffprobe failed: moov atom not found");
    }

    #[test]
    fn urls_and_paths_are_redacted() {
        let raw = "Failed to download https://acct.r2.cloudflarestorage.com/media/c1/originals/m1/video.mp4?X-Amz-Signature=abc";
        assert_eq!(sanitize(Some(raw)), "Failed to download [url]");

        let raw = "ffmpeg failed: /tmp/transcoding_x1y2/input.mp4: Invalid data found";
        assert_eq!(sanitize(Some(raw)), "ffmpeg failed: [path]: Invalid data found");

        let raw = "cannot open C:\\work\\input.mp4";
        assert_eq!(sanitize(Some(raw)), "cannot open [path]");

        assert_eq!(sanitize(Some("upload to s3://bucket/key failed")), "upload to [url] failed");
    }

    #[test]
    fn whitespace_collapses_and_length_is_bounded() {
        assert_eq!(sanitize(Some("a\n\n  b\tc")), "a b c");

        let long = "é".repeat(2000);
        let out = sanitize(Some(&long));
        assert_eq!(out.chars().count(), TRANSCODING_ERROR_MAX_LEN);
        assert!(out.ends_with(ELLIPSIS));
    }
}
