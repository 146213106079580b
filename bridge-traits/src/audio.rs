//! Audio route bridge trait.
//!
//! Hosts with a configurable audio session (mobile platforms, some desktop
//! sound servers) implement [`AudioRoute`] to put the device into a playback
//! configuration before the first stream starts.

use crate::error::Result;

/// Host audio-session configuration.
///
/// Activation happens once per controller launch, before the first stream is
/// opened. Implementations must be idempotent; repeated activation is normal
/// when several sessions run over the life of a process. A failed activation
/// is reported to the caller but is not fatal to playback.
#[async_trait::async_trait]
pub trait AudioRoute: Send + Sync {
    /// Configure the host audio session for media playback.
    async fn activate_playback(&self) -> Result<()>;
}

/// No-op route for hosts without a configurable audio session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAudioRoute;

#[async_trait::async_trait]
impl AudioRoute for SilentAudioRoute {
    async fn activate_playback(&self) -> Result<()> {
        Ok(())
    }
}
