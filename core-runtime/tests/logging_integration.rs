//! End-to-end checks for the tracing setup in `core_runtime::logging`.

use bridge_traits::log::LogLevel;
use core_runtime::logging::{init_logging, redact_url_query, LogFormat, LoggingConfig};

#[test]
fn test_logging_initialization() {
    // The global subscriber can only be installed once per process, so this
    // is the single test that calls init_logging.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    init_logging(config.clone()).expect("first initialization should succeed");

    let second = init_logging(config);
    assert!(second.is_err());

    tracing::debug!(target: "core_runtime", "logging initialized for integration tests");
}

#[test]
fn test_url_redaction_signed_query() {
    let url = "https://sacavia.com/api/media/file/abc.mp4?Expires=1699999999&Signature=abc123";
    let redacted = redact_url_query(url);

    assert_eq!(redacted, "https://sacavia.com/api/media/file/abc.mp4");
    assert!(!redacted.contains("Signature"));
}

#[test]
fn test_url_redaction_fragment() {
    assert_eq!(
        redact_url_query("https://sacavia.com/video.mp4#t=42"),
        "https://sacavia.com/video.mp4"
    );
}

#[test]
fn test_url_redaction_plain_values() {
    // URLs without query or fragment pass through unchanged
    assert_eq!(
        redact_url_query("https://sacavia.com/api/media/file/abc.mp4"),
        "https://sacavia.com/api/media/file/abc.mp4"
    );
    assert_eq!(redact_url_query(""), "");
}

#[test]
fn test_default_format_tracks_build_profile() {
    let config = LoggingConfig::default();
    if cfg!(debug_assertions) {
        assert_eq!(config.format, LogFormat::Pretty);
    } else {
        assert_eq!(config.format, LogFormat::Json);
    }
}

#[test]
fn test_filter_directive_is_stored_verbatim() {
    let directives = "core_playback=debug,bridge_desktop=trace";
    let config = LoggingConfig::default().with_filter(directives);

    assert_eq!(config.filter.as_deref(), Some(directives));
}

#[test]
fn test_builder_chain_covers_every_knob() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(config.display_thread_info);
    assert!(!config.enable_spans && !config.display_target);
}
