//! Desktop Audio Route
//!
//! Desktop hosts have no audio session hand-off to negotiate, so activation
//! only needs to happen once per process. Mobile bridges replace this with
//! AVAudioSession and AudioManager calls.

use async_trait::async_trait;
use bridge_traits::audio::AudioRoute;
use bridge_traits::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Process-wide audio route for desktop hosts.
#[derive(Debug, Default)]
pub struct SharedAudioRoute {
    activated: AtomicBool,
}

impl SharedAudioRoute {
    pub fn new() -> Self {
        Self {
            activated: AtomicBool::new(false),
        }
    }

    /// Whether any session has activated the route yet.
    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioRoute for SharedAudioRoute {
    async fn activate_playback(&self) -> Result<()> {
        if !self.activated.swap(true, Ordering::SeqCst) {
            debug!("Audio route activated for shared output");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_activation_is_idempotent() {
        let route = SharedAudioRoute::new();
        assert!(!route.is_activated());

        route.activate_playback().await.unwrap();
        assert!(route.is_activated());

        route.activate_playback().await.unwrap();
        assert!(route.is_activated());
    }
}
