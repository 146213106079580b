//! # Core Configuration Module
//!
//! Builder-validated configuration for the Sacavia playback core.
//!
//! A [`CoreConfig`] bundles what every streaming session shares: the
//! `MediaEngine` that opens stream resources, the `AudioRoute` that prepares
//! the host audio session, and the lifecycle [`EventBus`]. Validation is
//! fail-fast, so a missing bridge surfaces when the config is built rather
//! than when the first session launches.
//!
//! With the `desktop-shims` feature enabled, both bridges default to the
//! desktop implementations (the progressive HTTP fetcher and the shared
//! process audio route):
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder().build()?;
//! ```
//!
//! Hosts that bring their own bridges set them explicitly:
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_engine(Arc::new(MyPlayerEngine))
//!     .audio_route(Arc::new(MyAudioSession))
//!     .event_capacity(256)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use bridge_traits::{AudioRoute, MediaEngine};
use std::sync::Arc;

/// Shared dependencies and settings for the playback core.
///
/// Holds the bridges and the event bus every streaming session uses. Built
/// through [`CoreConfigBuilder`]. Cloning is cheap, and clones share the
/// same bus.
#[derive(Clone)]
pub struct CoreConfig {
    /// Engine that opens and drives stream resources (required)
    pub media_engine: Arc<dyn MediaEngine>,

    /// Host audio session control (required)
    pub audio_route: Arc<dyn AudioRoute>,

    /// Lifecycle event bus shared by all sessions
    pub events: EventBus,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("media_engine", &"MediaEngine { ... }")
            .field("audio_route", &"AudioRoute { ... }")
            .field("events", &self.events)
            .finish()
    }
}

impl CoreConfig {
    /// Entry point for assembling a config; see [`CoreConfigBuilder`].
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn media_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaEngine".to_string(),
        message: "MediaEngine implementation is required for stream playback. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default HttpMediaEngine. \
                 Mobile: inject a platform player engine (AVPlayer/ExoPlayer). \
                 Web: inject an MSE-backed engine."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn audio_route_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioRoute".to_string(),
        message: "AudioRoute implementation is required for audio session control. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default SharedAudioRoute. \
                 Mobile: inject platform audio session control (AVAudioSession/AudioManager). \
                 Headless hosts: inject bridge_traits::audio::SilentAudioRoute."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_media_engine() -> Result<Arc<dyn MediaEngine>> {
    use bridge_desktop::{EngineConfig, HttpMediaEngine};

    let engine = HttpMediaEngine::new(EngineConfig::default())
        .map_err(|e| Error::Internal(format!("Failed to initialize default MediaEngine: {}", e)))?;
    let engine: Arc<dyn MediaEngine> = Arc::new(engine);
    Ok(engine)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_media_engine() -> Result<Arc<dyn MediaEngine>> {
    Err(media_engine_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_audio_route() -> Result<Arc<dyn AudioRoute>> {
    use bridge_desktop::SharedAudioRoute;

    let route: Arc<dyn AudioRoute> = Arc::new(SharedAudioRoute::new());
    Ok(route)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_audio_route() -> Result<Arc<dyn AudioRoute>> {
    Err(audio_route_missing_error())
}

/// Assembles a [`CoreConfig`] step by step.
///
/// Setters chain in any order. [`build()`](CoreConfigBuilder::build) fills
/// unset bridges with desktop defaults when the `desktop-shims` feature
/// provides them, and otherwise reports exactly which capability is missing
/// and where a host can get one.
#[derive(Default)]
pub struct CoreConfigBuilder {
    media_engine: Option<Arc<dyn MediaEngine>>,
    audio_route: Option<Arc<dyn AudioRoute>>,
    event_capacity: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the engine that opens stream resources.
    ///
    /// Without this, `build` falls back to the desktop progressive fetcher
    /// when `desktop-shims` is enabled and errors when it is not.
    pub fn media_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(engine);
        self
    }

    /// Sets the bridge that prepares the host audio session before playback.
    ///
    /// Fallback rules match [`media_engine`](Self::media_engine): desktop
    /// default when the shims are compiled in, an actionable error when not.
    pub fn audio_route(mut self, route: Arc<dyn AudioRoute>) -> Self {
        self.audio_route = Some(route);
        self
    }

    /// Overrides the per-subscriber event buffer size, which otherwise uses
    /// [`DEFAULT_EVENT_BUFFER_SIZE`].
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Resolves defaults, validates, and produces the final [`CoreConfig`].
    ///
    /// # Errors
    ///
    /// - `Error::CapabilityMissing` when a required bridge was not set and no
    ///   desktop default is compiled in
    /// - `Error::Config` when the event capacity is out of range
    pub fn build(self) -> Result<CoreConfig> {
        // Capacity bounds are checked before the broadcast channel exists
        let event_capacity = self.event_capacity.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        if event_capacity == 0 {
            return Err(Error::Config(
                "Event capacity must be at least 1".to_string(),
            ));
        }
        if event_capacity > 10_000 {
            return Err(Error::Config(format!(
                "Event capacity {} is over the 10,000 event ceiling",
                event_capacity
            )));
        }

        let media_engine = match self.media_engine {
            Some(engine) => engine,
            None => provide_default_media_engine()?,
        };

        let audio_route = match self.audio_route {
            Some(route) => route,
            None => provide_default_audio_route()?,
        };

        Ok(CoreConfig {
            media_engine,
            audio_route,
            events: EventBus::new(event_capacity),
        })
    }
}
