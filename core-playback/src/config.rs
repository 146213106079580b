//! Session configuration types.

use crate::backoff::RetryPolicy;
use crate::url::MediaUrlRules;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-session behavior flags, fixed for the life of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Start playback as soon as the stream reports ready.
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,

    /// Render audio. When false the stream is muted on every start and
    /// resume.
    #[serde(default = "default_audio_enabled")]
    pub audio_enabled: bool,

    /// Restart from the beginning when the stream ends.
    #[serde(default)]
    pub loop_enabled: bool,
}

fn default_autoplay() -> bool {
    true
}

fn default_audio_enabled() -> bool {
    true
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autoplay: default_autoplay(),
            audio_enabled: default_audio_enabled(),
            loop_enabled: false,
        }
    }
}

impl SessionOptions {
    /// Options for an in-feed media cell.
    ///
    /// - Autoplays when visible
    /// - Muted until the user opts into sound
    /// - Loops seamlessly
    pub fn feed_cell() -> Self {
        Self {
            autoplay: true,
            audio_enabled: false,
            loop_enabled: true,
        }
    }
}

/// Tunable configuration for one streaming session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Automatic retry budget and backoff schedule.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// URL rewrite rules for the canonical media host.
    #[serde(default)]
    pub url_rules: MediaUrlRules,

    /// Pre-buffer hint forwarded to the engine, in milliseconds. Zero sends
    /// no hint.
    #[serde(default = "default_prebuffer_ms")]
    pub prebuffer_ms: u64,
}

fn default_prebuffer_ms() -> u64 {
    500
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            url_rules: MediaUrlRules::default(),
            prebuffer_ms: default_prebuffer_ms(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration tuned for fast failure recovery.
    ///
    /// - First retry after 300ms instead of 800ms
    /// - Backoff capped at 5s
    /// - Smaller pre-buffer hint
    pub fn fast_recovery() -> Self {
        Self {
            retry: RetryPolicy {
                max_retries: 3,
                base_delay_ms: 300, // first retry at 300ms
                max_delay_ms: 5_000,
            },
            prebuffer_ms: 250,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        self.retry.validate()?;
        self.url_rules.validate()?;
        Ok(())
    }

    /// Pre-buffer hint as a duration, when one should be sent.
    pub fn prebuffer(&self) -> Option<Duration> {
        if self.prebuffer_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.prebuffer_ms))
        }
    }
}
