//! # Host Bridge Traits
//!
//! Capability contracts each host platform implements for the streaming
//! playback core.
//!
//! The core never talks to a player, an audio stack, or a logging backend
//! directly. It talks to these traits, and each host (desktop, iOS, Android)
//! supplies its own adapters:
//!
//! - [`MediaEngine`](media::MediaEngine) establishes one stream resource per
//!   request
//! - [`MediaStream`](media::MediaStream) is play/pause/mute/rewind/shutdown
//!   for a live resource
//! - [`AudioRoute`](audio::AudioRoute) is idempotent audio-session
//!   configuration
//! - [`LoggerSink`](log::LoggerSink) forwards structured logs to the host
//!
//! ## Signal Discipline
//!
//! [`MediaEngine::open`](media::MediaEngine::open) hands back an
//! [`OpenedStream`](media::OpenedStream): the control handle plus a signal
//! receiver scoped to that one resource. The core drops the receiver and
//! awaits [`MediaStream::shutdown`](media::MediaStream::shutdown) before
//! opening a replacement, so a signal from an abandoned stream can never be
//! attributed to its successor.
//!
//! ## Fail-Fast Strategy
//!
//! A capability nobody registered surfaces when the core config is built,
//! not when the first session launches, and the error names both the missing
//! trait and where each host can get an implementation:
//!
//! ```text
//! Capability missing: MediaEngine - MediaEngine implementation is required
//! for stream playback. Desktop: ensure the 'desktop-shims' feature is
//! enabled to use the default HttpMediaEngine. ...
//! ```
//!
//! ## Error Handling
//!
//! Every trait returns [`BridgeError`](error::BridgeError). Implementations
//! convert their native failures into it, and classify stream failures into
//! [`StreamErrorKind`](media::StreamErrorKind) so the core can pick retry
//! behavior and display text without string matching.
//!
//! ## Thread Safety
//!
//! Every trait carries `Send + Sync` bounds; the core calls bridges from
//! concurrent async tasks.

pub mod audio;
pub mod error;
pub mod log;
pub mod media;

pub use error::BridgeError;

// Flat re-exports so hosts rarely need the module paths
pub use audio::{AudioRoute, SilentAudioRoute};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{
    MediaEngine, MediaStream, OpenedStream, SessionId, StreamError, StreamErrorKind,
    StreamRequest, StreamSignal,
};
