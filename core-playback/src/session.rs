//! Session state machine.
//!
//! All session state lives in one place and changes through one pure
//! function, [`step`]. The controller's driver task feeds it inputs (engine
//! signals, caller commands, the retry timer) and interprets the effects it
//! returns; nothing else writes state. That keeps every transition unit
//! testable without an engine, a clock, or a task.
//!
//! ```text
//!  idle --> loading ----> ready <--> playing <--> paused
//!             ^             (autoplay)   |  \
//!             |                          |   \ end + loop: rewind, keep playing
//!             |        stream error      v
//!             +---- retrying <-------- failed states
//!                (timer, counted)   (terminal once budget is spent;
//!                                    manual retry re-enters loading)
//! ```

use crate::backoff::RetryPolicy;
use crate::config::SessionOptions;
use crate::error::PlaybackFailure;
use bridge_traits::media::StreamError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle status of one streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    /// Session exists, nothing requested yet.
    Idle,
    /// A stream is being established.
    Loading,
    /// The stream can render; playback not started.
    Ready,
    /// Rendering.
    Playing,
    /// Rendering suspended; resource kept.
    Paused,
    /// A retry has been scheduled or is being serviced.
    Retrying,
    /// The last attempt failed. Terminal when the retry budget is spent,
    /// though a manual retry is accepted at any time in this status.
    Failed,
}

impl PlaybackStatus {
    /// Whether a stream resource is attached and healthy.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            PlaybackStatus::Ready | PlaybackStatus::Playing | PlaybackStatus::Paused
        )
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackStatus::Playing)
    }
}

/// Full mutable state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub status: PlaybackStatus,
    /// Automatic retries scheduled in the current failure streak.
    pub retry_count: u32,
    /// Most recent failure. Kept through the recovery attempt so a terminal
    /// landing can re-expose it; cleared when a stream reaches ready.
    pub failure: Option<PlaybackFailure>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            retry_count: 0,
            failure: None,
        }
    }

    /// Observable projection of this state.
    ///
    /// `error_message` is populated only while failed; during a retry the
    /// attempt counters carry the story instead. The URLs are fixed at launch
    /// and threaded through by the driver.
    pub fn snapshot(
        &self,
        max_retries: u32,
        source_url: &str,
        normalized_url: &str,
    ) -> PlaybackSnapshot {
        let error_message = if self.status == PlaybackStatus::Failed {
            self.failure.as_ref().map(|f| f.message.clone())
        } else {
            None
        };
        PlaybackSnapshot {
            status: self.status,
            error_message,
            retry_count: self.retry_count,
            max_retries,
            source_url: source_url.to_string(),
            normalized_url: normalized_url.to_string(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a session published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    /// Display message; present exactly while `status == Failed`.
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    /// URL as supplied by the caller.
    pub source_url: String,
    /// Rewritten URL actually handed to the engine.
    pub normalized_url: String,
}

impl PlaybackSnapshot {
    pub fn is_playing(&self) -> bool {
        self.status.is_playing()
    }

    /// Whether the automatic retry budget is spent.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Everything that can happen to a session.
///
/// Engine signals, caller commands, and the retry timer all funnel into this
/// one input type before touching state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// The driver is opening the first stream.
    AttemptStarted,
    /// The current stream reported it can render.
    StreamReady,
    /// The current stream failed.
    StreamFailed(StreamError),
    /// The current stream reached its end.
    StreamEnded,
    /// The scheduled backoff delay elapsed.
    RetryTimerFired,
    PlayRequested,
    PauseRequested,
    ToggleRequested,
    /// Caller asked for a manual retry.
    RetryRequested,
}

/// Side effects the driver must carry out after a transition.
///
/// Listed effects are applied in order; release always precedes a replacement
/// open so exactly one stream resource is live at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Release the current stream, then open a new one for the session URL.
    OpenStream,
    /// Start or resume rendering and re-apply the configured mute state.
    StartPlayback,
    PausePlayback,
    /// Seek back to the start and keep playing.
    RestartPlayback,
    /// Arm the backoff timer for the `attempt`-th automatic retry.
    ScheduleRetry { delay: Duration, attempt: u32 },
    /// Release the current stream and drop its signal channel.
    ReleaseStream,
}

/// Result of one reducer step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<SessionEffect>,
}

/// Advance the session by one input.
///
/// Any (status, input) pair not handled below leaves the state untouched and
/// produces no effects; late or duplicated signals degrade to no-ops instead
/// of corrupting the session.
pub fn step(
    state: &SessionState,
    input: SessionInput,
    options: &SessionOptions,
    retry: &RetryPolicy,
) -> Transition {
    use PlaybackStatus::*;
    use SessionInput::*;

    let mut next = state.clone();
    let mut effects = Vec::new();

    match (state.status, input) {
        (Idle, AttemptStarted) => {
            next.status = Loading;
            effects.push(SessionEffect::OpenStream);
        }

        (Loading, StreamReady) => {
            next.retry_count = 0;
            next.failure = None;
            if options.autoplay {
                next.status = Playing;
                effects.push(SessionEffect::StartPlayback);
            } else {
                next.status = Ready;
            }
        }

        (Loading | Ready | Playing | Paused, StreamFailed(err)) => {
            let failure = PlaybackFailure::from_stream_error(&err);
            effects.push(SessionEffect::ReleaseStream);
            if state.retry_count < retry.max_retries {
                // delay uses the pre-increment count: 0.8s, 1.6s, 3.2s
                let delay = retry.delay_for(state.retry_count);
                next.retry_count = state.retry_count + 1;
                next.status = Retrying;
                next.failure = Some(failure);
                effects.push(SessionEffect::ScheduleRetry {
                    delay,
                    attempt: next.retry_count,
                });
            } else {
                next.status = Failed;
                next.failure = Some(failure);
            }
        }

        (Retrying, RetryTimerFired) => {
            next.status = Loading;
            effects.push(SessionEffect::OpenStream);
        }

        (Failed, RetryRequested) => {
            // manual retry: immediate, uncounted
            next.status = Loading;
            effects.push(SessionEffect::ReleaseStream);
            effects.push(SessionEffect::OpenStream);
        }

        (Ready | Paused, ToggleRequested | PlayRequested) => {
            next.status = Playing;
            effects.push(SessionEffect::StartPlayback);
        }

        (Playing, ToggleRequested | PauseRequested) => {
            next.status = Paused;
            effects.push(SessionEffect::PausePlayback);
        }

        (Playing | Paused, StreamEnded) => {
            if options.loop_enabled {
                next.status = Playing;
                effects.push(SessionEffect::RestartPlayback);
            } else {
                next.status = Paused;
            }
        }

        _ => {}
    }

    Transition {
        state: next,
        effects,
    }
}
