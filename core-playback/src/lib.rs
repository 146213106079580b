//! # Streaming Playback
//!
//! Resilient playback sessions for remote video streams, split into:
//!
//! - the session lifecycle as a pure state machine ([`session`])
//! - the per-session driver and its public handle ([`controller`])
//! - media URL normalization ([`url`])
//! - exponential backoff for automatic retries ([`backoff`])
//!
//! Host engines plug in through [`bridge_traits::media::MediaEngine`]; the
//! assembled runtime (event bus, logging, capabilities) lives in
//! `core-runtime`.

pub mod backoff;
pub mod config;
pub mod controller;
pub mod error;
pub mod session;
pub mod url;

pub use config::{SessionConfig, SessionOptions};
pub use controller::StreamingPlaybackController;
pub use error::{PlaybackFailure, PlayerError, Result};
pub use session::{PlaybackSnapshot, PlaybackStatus};
