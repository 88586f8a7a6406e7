//! Filename pattern rendering
//!
//! Supported placeholders: `{title}`, `{id}` (alias `{video_id}`), `{date}`,
//! `{original}`, `{channel_name}` and `{channel_id}`. Anything else in braces
//! is left as literal text.

use crate::extractor::{SourceFile, VideoIdentifier, VideoMetadata};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use regex::{Captures, Regex};
use std::fmt::{self, Write};
use std::sync::OnceLock;
use tracing::debug;

pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d";
const FALLBACK_NAME: &str = "unnamed_file";
const MAX_NAME_BYTES: usize = 200;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("placeholder regex is valid"))
}

/// Whether chrono understands every specifier in `format`
pub fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Format `now`, falling back to [`DEFAULT_DATE_FORMAT`] when `format` is
/// rejected by chrono.
fn format_date(now: &DateTime<Local>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", now.format(format)).is_ok() {
        return out;
    }
    debug!(date_format = format, "Unusable date format, using {}", DEFAULT_DATE_FORMAT);
    now.format(DEFAULT_DATE_FORMAT).to_string()
}

/// A fully substituted, filesystem-safe file name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderedName(String);

impl RenderedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RenderedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct PatternRenderer {
    pattern: String,
    date_format: String,
}

impl PatternRenderer {
    pub fn new(pattern: impl Into<String>, date_format: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            date_format: date_format.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Substitute placeholders and sanitize the result.
    ///
    /// Pure given its inputs: the same arguments always produce the same name.
    pub fn render(
        &self,
        id: &VideoIdentifier,
        metadata: &VideoMetadata,
        source: &SourceFile,
        now: DateTime<Local>,
    ) -> RenderedName {
        let date = if self.pattern.contains("{date}") {
            format_date(&now, &self.date_format)
        } else {
            String::new()
        };

        let substituted = placeholder_regex().replace_all(&self.pattern, |caps: &Captures| {
            let value = match &caps[1] {
                "title" => metadata.title.clone(),
                "id" | "video_id" => id.as_str().to_string(),
                "date" => date.clone(),
                "original" => source.stem(),
                "channel_name" => metadata.channel_name.clone(),
                "channel_id" => source.channel_dir.clone(),
                other => {
                    debug!(placeholder = other, "Unknown placeholder left as literal text");
                    return caps[0].to_string();
                }
            };
            if value.is_empty() {
                debug!(placeholder = &caps[1], "Placeholder substituted with empty value");
                return value;
            }
            sanitize_component(&value)
        });

        let mut name = sanitize_filename(&substituted);

        if !source.extension.is_empty() {
            let suffix = format!(".{}", source.extension.to_lowercase());
            if !name.to_lowercase().ends_with(&suffix) {
                name.push('.');
                name.push_str(&source.extension);
            }
        }

        RenderedName(name)
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

/// Replace forbidden characters in a single substituted value.
///
/// Trailing dots are dropped so a title like `Jr.` does not collide with the
/// extension separator.
fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}

/// Sanitizes a filename so it is safe as a single path component.
///
/// - Path separators, `: * ? " < > |`, NUL and other control characters
///   become `_`
/// - Leading dots (hidden files, `.` and `..`) and surrounding whitespace
///   are removed. Inner `..` is kept: with separators gone it cannot leave
///   the directory, and titles like `Wait... what` stay intact
/// - Trailing dots and spaces are removed
/// - An empty result becomes `unnamed_file`
/// - Length is capped at 200 bytes on a char boundary, keeping a short
///   extension when present
///
/// # Examples
/// ```
/// use tuberename::utils::pattern::sanitize_filename;
/// assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
/// assert_eq!(sanitize_filename(".hidden"), "hidden");
/// assert_eq!(sanitize_filename("normal_file.mp4"), "normal_file.mp4");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();

    let sanitized = replaced
        .trim()
        .trim_start_matches('.')
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .trim_start()
        .to_string();

    if sanitized.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    if sanitized.len() <= MAX_NAME_BYTES {
        return sanitized;
    }

    if let Some(dot_pos) = sanitized.rfind('.') {
        let extension = &sanitized[dot_pos..];
        if extension.len() < 10 {
            let stem = truncate_bytes(&sanitized[..dot_pos], MAX_NAME_BYTES - extension.len());
            return format!("{}{}", stem, extension);
        }
    }

    truncate_bytes(&sanitized, MAX_NAME_BYTES).to_string()
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::path::Path;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 7, 26, 12, 0, 0).unwrap()
    }

    fn sample() -> (VideoIdentifier, VideoMetadata, SourceFile) {
        (
            VideoIdentifier::new("Axux_INFMZ4"),
            VideoMetadata {
                title: "House UAP Hearing".into(),
                channel_name: "GreatScott".into(),
            },
            SourceFile::new("/media/UC6mIxFTvXkWQVEHPsEdflzQ/Axux_INFMZ4.mp4"),
        )
    }

    #[test]
    fn renders_title_and_channel() {
        let (id, meta, source) = sample();
        let renderer = PatternRenderer::new("{title} - {channel_name}.mp4", DEFAULT_DATE_FORMAT);
        assert_eq!(
            renderer.render(&id, &meta, &source, fixed_now()).as_str(),
            "House UAP Hearing - GreatScott.mp4"
        );
    }

    #[test]
    fn renders_id_date_original_and_channel_id() {
        let (id, meta, source) = sample();
        let renderer = PatternRenderer::new(
            "{date} {id} {video_id} {original} {channel_id}",
            DEFAULT_DATE_FORMAT,
        );
        assert_eq!(
            renderer.render(&id, &meta, &source, fixed_now()).as_str(),
            "20240726 Axux_INFMZ4 Axux_INFMZ4 Axux_INFMZ4 UC6mIxFTvXkWQVEHPsEdflzQ.mp4"
        );
    }

    #[test]
    fn unknown_placeholders_stay_literal() {
        let (id, meta, source) = sample();
        let renderer = PatternRenderer::new("{title} {views}.mp4", DEFAULT_DATE_FORMAT);
        assert_eq!(
            renderer.render(&id, &meta, &source, fixed_now()).as_str(),
            "House UAP Hearing {views}.mp4"
        );
    }

    #[test]
    fn appends_missing_extension() {
        let (id, meta, source) = sample();
        let renderer = PatternRenderer::new("{title}", DEFAULT_DATE_FORMAT);
        assert_eq!(
            renderer.render(&id, &meta, &source, fixed_now()).as_str(),
            "House UAP Hearing.mp4"
        );
    }

    #[test]
    fn separators_in_metadata_are_replaced() {
        let (id, _, source) = sample();
        let meta = VideoMetadata {
            title: "AC/DC: Live\u{0}?".into(),
            channel_name: "x".into(),
        };
        let renderer = PatternRenderer::new("{title}.mp4", DEFAULT_DATE_FORMAT);
        let name = renderer.render(&id, &meta, &source, fixed_now());
        assert_eq!(name.as_str(), "AC_DC_ Live__.mp4");
        assert!(!name.as_str().contains('/'));
    }

    #[test]
    fn trailing_dot_in_title_does_not_double_up() {
        let (id, _, source) = sample();
        let meta = VideoMetadata {
            title: "Mr. Smith Jr.".into(),
            channel_name: "x".into(),
        };
        let renderer = PatternRenderer::new("{title}.mp4", DEFAULT_DATE_FORMAT);
        assert_eq!(
            renderer.render(&id, &meta, &source, fixed_now()).as_str(),
            "Mr. Smith Jr.mp4"
        );
    }

    #[test]
    fn bad_date_format_falls_back_instead_of_panicking() {
        let (id, meta, source) = sample();
        let renderer = PatternRenderer::new("{title} {date}.mp4", "%Q");
        assert_eq!(
            renderer.render(&id, &meta, &source, fixed_now()).as_str(),
            "House UAP Hearing 20240726.mp4"
        );
    }

    #[test]
    fn date_is_not_formatted_without_placeholder() {
        let (id, meta, source) = sample();
        let renderer = PatternRenderer::new("{title}.mp4", "%Q");
        assert_eq!(
            renderer.render(&id, &meta, &source, fixed_now()).as_str(),
            "House UAP Hearing.mp4"
        );
    }

    #[test]
    fn date_format_validation() {
        assert!(is_valid_date_format(DEFAULT_DATE_FORMAT));
        assert!(is_valid_date_format("%Y-%m-%d_%H%M"));
        assert!(!is_valid_date_format("%Q"));
    }

    #[test]
    fn dotted_titles_cannot_escape_the_directory() {
        let (id, _, source) = sample();
        let meta = VideoMetadata {
            title: "../../Wait... what".into(),
            channel_name: "x".into(),
        };
        let renderer = PatternRenderer::new("{title}.mp4", DEFAULT_DATE_FORMAT);
        let name = renderer.render(&id, &meta, &source, fixed_now());
        assert_eq!(name.as_str(), "_.._Wait... what.mp4");
        assert!(!name.as_str().contains('/'));
        assert_eq!(Path::new(name.as_str()).components().count(), 1);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Test/Video:2024"), "Test_Video_2024");
        assert_eq!(sanitize_filename("Hello <World>"), "Hello _World_");
        assert_eq!(sanitize_filename("Normal Title"), "Normal Title");
    }

    #[test]
    fn test_sanitize_filename_hidden_files() {
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("...dots"), "dots");
        assert_eq!(sanitize_filename("."), FALLBACK_NAME);
        assert_eq!(sanitize_filename(".."), FALLBACK_NAME);
    }

    #[test]
    fn test_sanitize_filename_empty() {
        assert_eq!(sanitize_filename(""), FALLBACK_NAME);
        assert_eq!(sanitize_filename("   "), FALLBACK_NAME);
    }

    #[test]
    fn test_sanitize_filename_control_chars() {
        assert_eq!(sanitize_filename("a\tb\nc"), "a_b_c");
        assert_eq!(sanitize_filename("nul\0byte"), "nul_byte");
    }

    #[test]
    fn test_sanitize_filename_length() {
        let long_name = "a".repeat(300) + ".mp4";
        let result = sanitize_filename(&long_name);
        assert!(result.len() <= MAX_NAME_BYTES);
        assert!(result.ends_with(".mp4"));

        let long_multibyte = "é".repeat(150);
        let result = sanitize_filename(&long_multibyte);
        assert!(result.len() <= MAX_NAME_BYTES);
        assert!(result.chars().all(|c| c == 'é'));
    }

    proptest! {
        #[test]
        fn rendering_is_deterministic(title in ".{0,80}", channel in ".{1,30}", id in "[A-Za-z0-9_-]{11}") {
            let meta = VideoMetadata { title, channel_name: channel };
            let id = VideoIdentifier::new(id);
            let source = SourceFile::new(format!("/media/chan/{}.mp4", id));
            let renderer = PatternRenderer::new("{title} - {channel_name} [{id}] {date}.mp4", DEFAULT_DATE_FORMAT);

            let first = renderer.render(&id, &meta, &source, fixed_now());
            let second = renderer.render(&id, &meta, &source, fixed_now());
            prop_assert_eq!(&first, &second);
            prop_assert!(!first.as_str().contains('/'));
            prop_assert!(!first.as_str().contains('\\'));
            prop_assert!(!first.as_str().chars().any(|c| c.is_control()));
        }
    }
}
