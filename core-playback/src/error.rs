//! # Playback Error Types
//!
//! Construction errors and the user-facing failure taxonomy.

use bridge_traits::media::{StreamError, StreamErrorKind};
use thiserror::Error;

/// Errors surfaced by controller construction.
///
/// Stream establishment never fails synchronously; connection problems
/// arrive through the session state machine as a [`PlaybackFailure`]. This
/// enum covers only local preconditions.
#[derive(Error, Debug)]
pub enum PlayerError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Session or engine configuration failed validation.
    #[error("Invalid player configuration: {0}")]
    Config(String),

    // ========================================================================
    // Bridge Errors
    // ========================================================================
    /// A host bridge rejected an operation outright.
    #[error("Bridge failure: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    // ========================================================================
    // Internal Errors
    // ========================================================================
    /// A controller-internal channel or task failed.
    #[error("Internal playback error: {0}")]
    Internal(String),
}

/// Convenience result type for playback operations.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// User-facing failure envelope for one session.
///
/// The engine's normalized [`StreamErrorKind`] picks the display message; the
/// engine detail is folded in only for the generic category, where no better
/// wording exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackFailure {
    /// Normalized category reported by the engine.
    pub kind: StreamErrorKind,
    /// Message suitable for direct display.
    pub message: String,
}

impl PlaybackFailure {
    pub fn from_stream_error(err: &StreamError) -> Self {
        let message = match err.kind {
            StreamErrorKind::NoConnectivity => "No internet connection".to_string(),
            StreamErrorKind::TimedOut => "Connection timed out".to_string(),
            StreamErrorKind::HostUnreachable => "Server not found".to_string(),
            StreamErrorKind::Interrupted => "Video streaming interrupted. Retrying...".to_string(),
            StreamErrorKind::Other => format!("Video loading failed: {}", err.detail),
        };
        Self {
            kind: err.kind,
            message,
        }
    }

    /// Whether the failure is the kind that tends to clear up on its own.
    ///
    /// Does not gate retries; every failure is retried while budget remains.
    /// Used to pick log severity.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            StreamErrorKind::NoConnectivity
                | StreamErrorKind::TimedOut
                | StreamErrorKind::Interrupted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_messages_match_categories() {
        let cases = [
            (
                StreamError::no_connectivity("socket down"),
                "No internet connection",
            ),
            (StreamError::timed_out("deadline"), "Connection timed out"),
            (StreamError::host_unreachable("dns"), "Server not found"),
            (
                StreamError::interrupted("reset"),
                "Video streaming interrupted. Retrying...",
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(PlaybackFailure::from_stream_error(&err).message, expected);
        }
    }

    #[test]
    fn generic_failure_embeds_detail() {
        let err = StreamError::other("HTTP status 404");
        let failure = PlaybackFailure::from_stream_error(&err);
        assert_eq!(failure.message, "Video loading failed: HTTP status 404");
        assert!(!failure.is_transient());
    }

    #[test]
    fn transient_kinds_are_flagged() {
        let failure = PlaybackFailure::from_stream_error(&StreamError::timed_out("t"));
        assert!(failure.is_transient());

        let failure = PlaybackFailure::from_stream_error(&StreamError::host_unreachable("h"));
        assert!(!failure.is_transient());
    }
}
