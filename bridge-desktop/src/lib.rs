//! # Desktop Bridges
//!
//! Ready-made playback bridges for macOS, Windows, and Linux hosts:
//! [`HttpMediaEngine`], a progressive fetcher built on `reqwest`, and
//! [`SharedAudioRoute`], a process-wide output route. Mobile and web hosts
//! inject their own engines (AVPlayer, ExoPlayer, MSE) instead of this
//! crate.
//!
//! ```ignore
//! use bridge_desktop::{EngineConfig, HttpMediaEngine, SharedAudioRoute};
//!
//! let engine = HttpMediaEngine::new(EngineConfig::default())?;
//! let route = SharedAudioRoute::new();
//! // Hand both to the core configuration.
//! ```

mod audio;
mod media;

pub use audio::SharedAudioRoute;
pub use media::{EngineConfig, HttpMediaEngine};
