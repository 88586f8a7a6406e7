//! Bounded, sequential retry around a [`MetadataSource`].

use crate::extractor::models::{VideoIdentifier, VideoMetadata};
use crate::extractor::traits::MetadataSource;
use crate::utils::error::RenameError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// How resolved titles are shortened before rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitlePolicy {
    pub max_chars: usize,
    pub trim_to_word_boundary: bool,
    /// Appended only when the title was actually cut
    pub ellipsis: String,
}

impl Default for TitlePolicy {
    fn default() -> Self {
        Self {
            max_chars: 50,
            trim_to_word_boundary: true,
            ellipsis: String::new(),
        }
    }
}

/// Every attempt failed
#[derive(Debug)]
pub struct ResolveFailure {
    pub identifier: VideoIdentifier,
    pub attempts: usize,
    pub last_error: RenameError,
}

#[derive(Debug)]
pub enum Resolution {
    Resolved(VideoMetadata),
    Exhausted(ResolveFailure),
}

pub struct MetadataResolver {
    source: Arc<dyn MetadataSource>,
    max_retries: usize,
    retry_delay: Duration,
    title_policy: TitlePolicy,
}

impl MetadataResolver {
    pub fn new(
        source: Arc<dyn MetadataSource>,
        max_retries: usize,
        retry_delay: Duration,
        title_policy: TitlePolicy,
    ) -> Self {
        Self {
            source,
            max_retries,
            retry_delay,
            title_policy,
        }
    }

    /// Total attempts per identifier. Zero retries still means one lookup.
    pub fn attempts(&self) -> usize {
        self.max_retries.max(1)
    }

    /// Resolve metadata with a fixed delay between attempts.
    ///
    /// Never returns an error: exhaustion is reported as
    /// [`Resolution::Exhausted`] so callers can record it per file.
    pub async fn resolve(&self, id: &VideoIdentifier) -> Resolution {
        let attempts = self.attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!(video_id = %id, attempt, source = self.source.id(), "Resolving metadata");

            let result = if id.is_empty() {
                Err(RenameError::MetadataUnavailable(
                    "empty video identifier".to_string(),
                ))
            } else {
                self.source.lookup(id).await
            };

            let error = match result {
                Ok(metadata) => {
                    let title = truncate_title(&metadata.title, &self.title_policy);
                    if !title.is_empty() && !metadata.channel_name.trim().is_empty() {
                        if title != metadata.title {
                            debug!(video_id = %id, %title, "Trimmed title");
                        }
                        return Resolution::Resolved(VideoMetadata {
                            title,
                            channel_name: metadata.channel_name,
                        });
                    }
                    RenameError::MetadataUnavailable(format!("empty title or channel for {}", id))
                }
                Err(e) => e,
            };

            if attempt < attempts {
                warn!(
                    video_id = %id,
                    attempt,
                    error = %error,
                    "Metadata lookup failed, retrying in {:?}",
                    self.retry_delay
                );
                sleep(self.retry_delay).await;
            }
            last_error = Some(error);
        }

        let last_error = last_error
            .unwrap_or_else(|| RenameError::MetadataUnavailable(format!("no attempt made for {}", id)));
        warn!(
            video_id = %id,
            attempts,
            error = %last_error,
            "Failed to fetch metadata after all attempts"
        );
        Resolution::Exhausted(ResolveFailure {
            identifier: id.clone(),
            attempts,
            last_error,
        })
    }
}

/// Shorten a title to at most `policy.max_chars` characters (plus ellipsis).
///
/// Cuts on char boundaries only. With `trim_to_word_boundary`, backs off to
/// the last space inside the cut when there is one.
pub fn truncate_title(title: &str, policy: &TitlePolicy) -> String {
    let title = title.trim();
    if title.chars().count() <= policy.max_chars {
        return title.to_string();
    }

    let mut cut: String = title.chars().take(policy.max_chars).collect();
    let ends_on_word = title
        .chars()
        .nth(policy.max_chars)
        .is_some_and(char::is_whitespace);
    if policy.trim_to_word_boundary && !ends_on_word {
        if let Some(space) = cut.rfind(' ') {
            if space > 0 {
                cut.truncate(space);
            }
        }
    }

    let mut cut = cut.trim_end().to_string();
    cut.push_str(&policy.ellipsis);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakySource {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl MetadataSource for FlakySource {
        fn id(&self) -> &'static str {
            "flaky"
        }

        async fn lookup(&self, _id: &VideoIdentifier) -> Result<VideoMetadata, RenameError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(RenameError::MetadataUnavailable("boom".into()))
            } else {
                Ok(VideoMetadata {
                    title: "A fairly long title that goes on and on and on for quite a while".into(),
                    channel_name: "GreatScott".into(),
                })
            }
        }
    }

    fn resolver(source: Arc<FlakySource>, retries: usize) -> MetadataResolver {
        MetadataResolver::new(source, retries, Duration::ZERO, TitlePolicy::default())
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            fail_first: 2,
        });
        let outcome = resolver(source.clone(), 3)
            .resolve(&VideoIdentifier::new("abc"))
            .await;

        assert!(matches!(outcome, Resolution::Resolved(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_retries() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
        });
        let outcome = resolver(source.clone(), 3)
            .resolve(&VideoIdentifier::new("abc"))
            .await;

        match outcome {
            Resolution::Exhausted(failure) => {
                assert_eq!(failure.attempts, 3);
                assert_eq!(failure.identifier.as_str(), "abc");
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_still_makes_one_attempt() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
        });
        let _ = resolver(source.clone(), 0)
            .resolve(&VideoIdentifier::new("abc"))
            .await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_identifier_never_reaches_the_source() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            fail_first: 0,
        });
        let outcome = resolver(source.clone(), 2)
            .resolve(&VideoIdentifier::new(""))
            .await;

        assert!(matches!(outcome, Resolution::Exhausted(f) if f.attempts == 2));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resolved_title_is_truncated() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            fail_first: 0,
        });
        let outcome = resolver(source, 1).resolve(&VideoIdentifier::new("abc")).await;

        match outcome {
            Resolution::Resolved(meta) => {
                assert!(meta.title.chars().count() <= 50);
                assert_eq!(meta.title, "A fairly long title that goes on and on and on for");
            }
            other => panic!("expected metadata, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_fixed_delay_between_attempts_only() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
        });
        let resolver = MetadataResolver::new(
            source.clone(),
            3,
            Duration::from_secs(5),
            TitlePolicy::default(),
        );

        let start = tokio::time::Instant::now();
        let outcome = resolver.resolve(&VideoIdentifier::new("abc")).await;
        let elapsed = start.elapsed();

        assert!(matches!(outcome, Resolution::Exhausted(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert!(elapsed >= Duration::from_secs(10), "two delays expected, got {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(15), "no delay after the last attempt, got {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_does_not_wait() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            fail_first: 0,
        });
        let resolver =
            MetadataResolver::new(source, 3, Duration::from_secs(5), TitlePolicy::default());

        let start = tokio::time::Instant::now();
        let outcome = resolver.resolve(&VideoIdentifier::new("abc")).await;

        assert!(matches!(outcome, Resolution::Resolved(_)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn short_titles_pass_through() {
        let policy = TitlePolicy::default();
        assert_eq!(truncate_title("House UAP Hearing", &policy), "House UAP Hearing");
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        let policy = TitlePolicy {
            max_chars: 3,
            trim_to_word_boundary: false,
            ellipsis: String::new(),
        };
        assert_eq!(truncate_title("日本語のタイトル", &policy), "日本語");
    }

    #[test]
    fn hard_cut_without_word_boundary() {
        let policy = TitlePolicy {
            max_chars: 5,
            trim_to_word_boundary: false,
            ellipsis: String::new(),
        };
        assert_eq!(truncate_title("Hello World", &policy), "Hello");
    }

    #[test]
    fn ellipsis_only_added_when_cut() {
        let policy = TitlePolicy {
            max_chars: 8,
            trim_to_word_boundary: true,
            ellipsis: "...".into(),
        };
        assert_eq!(truncate_title("Hello World", &policy), "Hello...");
        assert_eq!(truncate_title("Hello", &policy), "Hello");
    }

    #[test]
    fn single_long_word_is_hard_cut() {
        let policy = TitlePolicy {
            max_chars: 4,
            trim_to_word_boundary: true,
            ellipsis: String::new(),
        };
        assert_eq!(truncate_title("Supercalifragilistic", &policy), "Supe");
    }
}
