//! Structured logging walkthrough for the playback core.
//!
//! Narrates one streaming session (launch, a dropped attempt, the retry that
//! recovers) through the tracing pipeline, so every level, span shape, and
//! the URL redaction helper show up in the output at least once.
//!
//! Run with:
//! ```bash
//! cargo run --example logging_demo                # Pretty (debug default)
//! cargo run --example logging_demo -- json
//! cargo run --example logging_demo -- compact
//! cargo run --example logging_demo -- pretty "core_runtime=trace"
//! ```

use bridge_traits::log::LogLevel;
use core_runtime::logging::{init_logging, redact_url_query, LogFormat, LoggingConfig};
use std::env;
use std::time::Duration;
use tracing::{debug, error, info, instrument, span, trace, warn, Level};

const SOURCE_URL: &str =
    "https://sacavia.com/api/media/file/demo-clip.mp4?token=secret_access_token_12345";

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_spans(true)
        .with_target(true);
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }
    init_logging(config).expect("Failed to initialize logging");

    info!(format = ?format, "Playback logging walkthrough starting");

    let session = "b8f3d2a1";
    launch_session(session).await;
    dropped_attempt(session).await;
    recovered_attempt(session).await;

    info!(session, "Walkthrough complete");
}

/// The launch path down to the media request, traced at every level the
/// pipeline supports.
async fn launch_session(session: &str) {
    let span = span!(Level::INFO, "stream_session", session);
    let _guard = span.enter();

    // Query strings can carry signed tokens, so only the path is logged
    info!(url = %redact_url_query(SOURCE_URL), "Session launched");
    trace!(prebuffer_ms = 500, "Applying stream options");

    {
        let attempt = span!(Level::DEBUG, "open_stream", attempt = 0);
        let _guard = attempt.enter();

        debug!("Issuing media request");
        tokio::time::sleep(Duration::from_millis(10)).await;
        debug!(bytes = 16_384, "First chunk received");
    }

    info!(status = "playing", "Stream rendering");
}

/// Second act: the stream stalls mid-play and the retry machinery reports
/// itself through warn and error records.
async fn dropped_attempt(session: &str) {
    let span = span!(Level::INFO, "stream_session", session);
    let _guard = span.enter();

    warn!(reason = "stalled", "Stream interrupted mid-play");
    error!(category = "interrupted", "Video streaming interrupted. Retrying...");
    warn!(
        attempt = 1,
        max_retries = 3,
        delay_ms = 800u64,
        "Retry scheduled"
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[instrument(fields(attempt = 2))]
async fn recovered_attempt(session: &str) {
    debug!("Reopening stream after backoff");
    hand_to_engine(session, 2).await;
    info!(active_sessions = 1, retries_used = 1, "Playback restored");
}

#[instrument(fields(host = "sacavia.com"))]
async fn hand_to_engine(session: &str, attempt: u32) {
    trace!(session, attempt, "Handing request to the media engine");
    tokio::time::sleep(Duration::from_millis(5)).await;
}
