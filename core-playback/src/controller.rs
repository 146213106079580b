//! # Streaming Playback Controller
//!
//! Owns one resilient streaming session per remote video URL. The controller
//! spawns a single driver task that holds all session state and runs it
//! through the pure reducer in [`crate::session`]; callers talk to the driver
//! through a command channel and observe it through a `watch` snapshot channel
//! and the shared [`EventBus`].
//!
//! ## Architecture
//!
//! ```text
//!            commands (mpsc)                signals (per-attempt mpsc)
//!  caller ──────────────────> driver task <────────────────── MediaEngine
//!            <──────────────     │    │
//!            watch snapshots     │    └── retry deadline (select! arm)
//!                                v
//!                            EventBus
//! ```
//!
//! The driver is the only writer. Engine signals, caller commands, and the
//! backoff timer are all funneled through `select!` into [`session::step`];
//! the driver then carries out the returned effects (open/release the stream,
//! play, pause, rewind, arm the timer) and publishes a fresh snapshot.
//!
//! Signal routing is structural: each stream attempt gets its own signal
//! receiver, and the receiver is dropped before a replacement stream is
//! opened, so a late signal from a superseded attempt has no path into the
//! state machine.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::controller::StreamingPlaybackController;
//! use core_playback::config::{SessionConfig, SessionOptions};
//! use core_runtime::config::CoreConfig;
//!
//! let core = CoreConfig::builder().build()?;
//! let controller = StreamingPlaybackController::launch(
//!     &core,
//!     SessionConfig::default(),
//!     SessionOptions::default(),
//!     "http://www.sacavia.com/api/media/abc.mp4",
//! )
//! .await?;
//!
//! controller.toggle_play_pause();
//! let snapshot = controller.snapshot();
//! controller.teardown().await;
//! ```

use crate::backoff::RetryPolicy;
use crate::config::{SessionConfig, SessionOptions};
use crate::error::{PlayerError, Result};
use crate::session::{
    self, PlaybackSnapshot, PlaybackStatus, SessionEffect, SessionInput, SessionState,
};
use crate::url::normalize_media_url;
use bridge_traits::media::{
    MediaEngine, MediaStream, SessionId, StreamError, StreamRequest, StreamSignal,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, PlayerEvent};
use core_runtime::logging::redact_url_query;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Caller commands marshaled to the driver task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Pause,
    Toggle,
    Retry,
}

/// Handle to one streaming session.
///
/// Cheap to share by reference; all mutation happens on the driver task.
/// Dropping the controller cancels the driver as a best effort, but the
/// deterministic release path is the awaited [`teardown`](Self::teardown).
pub struct StreamingPlaybackController {
    session: SessionId,
    source_url: String,
    normalized_url: String,
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
    cancel: CancellationToken,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl StreamingPlaybackController {
    /// Launches a streaming session for `url`.
    ///
    /// Normalizes the URL, activates the audio route (activation failure is
    /// logged, not fatal), spawns the driver task, and starts the first
    /// stream attempt. Establishment problems never surface here; they
    /// arrive later through the snapshot channel as retry or failure states.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::Config`] when `config` fails validation or the
    /// URL is empty.
    #[instrument(skip_all, fields(url = %redact_url_query(url.as_ref())))]
    pub async fn launch(
        core: &CoreConfig,
        config: SessionConfig,
        options: SessionOptions,
        url: impl AsRef<str>,
    ) -> Result<Self> {
        config.validate().map_err(PlayerError::Config)?;

        let source_url = url.as_ref().to_string();
        if source_url.trim().is_empty() {
            return Err(PlayerError::Config(
                "Stream URL cannot be empty".to_string(),
            ));
        }

        let normalized_url = normalize_media_url(&source_url, &config.url_rules);
        let session = SessionId::new();

        info!(
            session = %session,
            url = %redact_url_query(&normalized_url),
            autoplay = options.autoplay,
            "Launching streaming session"
        );

        if let Err(err) = core.audio_route.activate_playback().await {
            warn!(session = %session, error = %err, "Audio route activation failed");
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let initial =
            SessionState::new().snapshot(config.retry.max_retries, &source_url, &normalized_url);
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let cancel = CancellationToken::new();

        let events = core.events.clone();
        events
            .emit(PlayerEvent::SessionLaunched {
                session,
                url: redact_url_query(&normalized_url).to_string(),
            })
            .ok();

        let driver = Driver {
            session,
            engine: Arc::clone(&core.media_engine),
            events,
            options,
            retry: config.retry.clone(),
            prebuffer: config.prebuffer(),
            source_url: source_url.clone(),
            normalized_url: normalized_url.clone(),
            state: SessionState::new(),
            stream: None,
            signals: None,
            stream_ended: false,
            retry_deadline: None,
            commands: command_rx,
            snapshots: snapshot_tx,
            cancel: cancel.clone(),
        };

        let handle = tokio::spawn(driver.run());

        Ok(Self {
            session,
            source_url,
            normalized_url,
            commands: command_tx,
            snapshots: snapshot_rx,
            cancel,
            driver: Mutex::new(Some(handle)),
        })
    }

    /// Identifier correlating this session's events and log records.
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// URL as supplied by the caller.
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Rewritten URL actually handed to the engine.
    pub fn normalized_url(&self) -> &str {
        &self.normalized_url
    }

    /// Current observable state.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to state changes.
    ///
    /// `watch` semantics: a receiver always sees the latest snapshot, never
    /// a backlog.
    pub fn watch(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    /// Request playback to start or resume.
    ///
    /// A no-op unless a stream is attached and not failed.
    pub fn play(&self) {
        self.send(Command::Play);
    }

    /// Request playback to pause. The stream resource is kept.
    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    /// Flip between playing and paused.
    ///
    /// A no-op while loading, retrying, or failed; the mute state configured
    /// at launch is re-applied on every resume.
    pub fn toggle_play_pause(&self) {
        self.send(Command::Toggle);
    }

    /// Request a manual retry.
    ///
    /// Accepted only while the session is failed; the attempt starts
    /// immediately and does not count against the automatic retry budget.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!(session = %self.session, ?command, "Command dropped; driver already exited");
        }
    }

    /// Tears the session down deterministically.
    ///
    /// Cancels the driver and waits for it to release the stream resource,
    /// disarm any pending retry timer, and exit. Idempotent; a second call
    /// returns immediately.
    pub async fn teardown(&self) {
        self.cancel.cancel();

        let handle = self.driver.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(session = %self.session, error = %err, "Driver task ended abnormally");
            }
        }
    }
}

impl Drop for StreamingPlaybackController {
    fn drop(&mut self) {
        // Best effort; the deterministic release path is teardown().await.
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for StreamingPlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingPlaybackController")
            .field("session", &self.session)
            .field("normalized_url", &redact_url_query(&self.normalized_url))
            .field("status", &self.snapshots.borrow().status)
            .finish()
    }
}

/// The driver task: sole owner and writer of session state.
struct Driver {
    session: SessionId,
    engine: Arc<dyn MediaEngine>,
    events: EventBus,
    options: SessionOptions,
    retry: RetryPolicy,
    prebuffer: Option<Duration>,
    source_url: String,
    normalized_url: String,
    state: SessionState,
    /// Control handle for the live stream, if one is attached.
    stream: Option<Box<dyn MediaStream>>,
    /// Signal endpoint scoped to the current attempt. Dropped before any
    /// replacement stream is opened.
    signals: Option<mpsc::Receiver<StreamSignal>>,
    /// Whether the current stream reached its end and the session parked on
    /// it. Closure of the signal channel after a parked end is the engine
    /// winding down, not a mid-stream death.
    stream_ended: bool,
    /// Armed while a scheduled retry is waiting to fire.
    retry_deadline: Option<Instant>,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<PlaybackSnapshot>,
    cancel: CancellationToken,
}

impl Driver {
    #[instrument(name = "session_driver", skip(self), fields(session = %self.session))]
    async fn run(mut self) {
        debug!("Session driver started");
        self.apply(SessionInput::AttemptStarted).await;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                Some(command) = self.commands.recv() => {
                    let input = match command {
                        Command::Play => SessionInput::PlayRequested,
                        Command::Pause => SessionInput::PauseRequested,
                        Command::Toggle => SessionInput::ToggleRequested,
                        Command::Retry => SessionInput::RetryRequested,
                    };
                    self.apply(input).await;
                }

                signal = next_signal(&mut self.signals) => match signal {
                    Some(StreamSignal::ReadyToPlay) => {
                        self.stream_ended = false;
                        self.apply(SessionInput::StreamReady).await;
                    }
                    Some(StreamSignal::Ended) => {
                        self.apply(SessionInput::StreamEnded).await;
                        // a loop restart keeps the stream live instead of parking
                        self.stream_ended = self.state.status == PlaybackStatus::Paused;
                    }
                    Some(StreamSignal::Stalled) => {
                        self.apply(SessionInput::StreamFailed(StreamError::interrupted(
                            "playback stalled",
                        )))
                        .await;
                    }
                    Some(StreamSignal::Failed(err)) => {
                        self.apply(SessionInput::StreamFailed(err)).await;
                    }
                    None => self.signal_channel_closed().await,
                },

                _ = wait_until(self.retry_deadline) => {
                    self.retry_deadline = None;
                    self.apply(SessionInput::RetryTimerFired).await;
                }
            }
        }

        self.shutdown().await;
    }

    /// Feeds one input through the reducer and carries out its effects.
    ///
    /// Effects that fail (an engine refusing to open, a dead control handle)
    /// synthesize follow-up failure inputs, which are processed here in the
    /// same pass rather than recursing.
    async fn apply(&mut self, input: SessionInput) {
        let mut pending = VecDeque::from([input]);

        while let Some(input) = pending.pop_front() {
            let transition = session::step(&self.state, input.clone(), &self.options, &self.retry);
            let previous = std::mem::replace(&mut self.state, transition.state);

            if previous.status != self.state.status {
                debug!(from = ?previous.status, to = ?self.state.status, "Session transition");
            }
            if self.state.status == PlaybackStatus::Retrying
                && previous.status != PlaybackStatus::Retrying
            {
                if let Some(failure) = &self.state.failure {
                    if failure.is_transient() {
                        debug!(kind = ?failure.kind, "Transient stream failure");
                    } else {
                        warn!(kind = ?failure.kind, message = %failure.message, "Stream failure");
                    }
                }
            }
            if self.state.status == PlaybackStatus::Failed
                && previous.status != PlaybackStatus::Failed
            {
                let message = self
                    .state
                    .failure
                    .as_ref()
                    .map(|f| f.message.as_str())
                    .unwrap_or_default();
                warn!(retry_count = self.state.retry_count, %message, "Stream failed permanently");
            }

            self.emit_lifecycle(&input, &previous);
            self.publish();

            for effect in transition.effects {
                if let Some(follow_up) = self.perform(effect).await {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    /// Carries out one effect, returning a synthesized input when the effect
    /// itself fails.
    async fn perform(&mut self, effect: SessionEffect) -> Option<SessionInput> {
        match effect {
            SessionEffect::OpenStream => {
                // Exactly one live resource: detach the old attempt first.
                self.release_stream().await;

                let mut request = StreamRequest::new(self.normalized_url.clone(), self.session);
                if let Some(prebuffer) = self.prebuffer {
                    request = request.with_prebuffer(prebuffer);
                }

                match self.engine.open(request).await {
                    Ok(opened) => {
                        self.stream = Some(opened.handle);
                        self.signals = Some(opened.signals);
                        self.stream_ended = false;
                        None
                    }
                    Err(err) => {
                        warn!(error = %err, "Engine refused to open stream");
                        Some(SessionInput::StreamFailed(StreamError::other(
                            err.to_string(),
                        )))
                    }
                }
            }

            SessionEffect::StartPlayback => {
                let muted = !self.options.audio_enabled;
                let Some(stream) = self.stream.as_ref() else {
                    return None;
                };
                if let Err(err) = stream.set_muted(muted).await {
                    warn!(error = %err, muted, "Mute state could not be applied");
                }
                if let Err(err) = stream.play().await {
                    return Some(SessionInput::StreamFailed(StreamError::interrupted(
                        err.to_string(),
                    )));
                }
                None
            }

            SessionEffect::PausePlayback => {
                if let Some(stream) = self.stream.as_ref() {
                    if let Err(err) = stream.pause().await {
                        warn!(error = %err, "Pause was not applied");
                    }
                }
                None
            }

            SessionEffect::RestartPlayback => {
                let Some(stream) = self.stream.as_ref() else {
                    return None;
                };
                if let Err(err) = stream.rewind().await {
                    return Some(SessionInput::StreamFailed(StreamError::interrupted(
                        err.to_string(),
                    )));
                }
                if let Err(err) = stream.play().await {
                    return Some(SessionInput::StreamFailed(StreamError::interrupted(
                        err.to_string(),
                    )));
                }
                None
            }

            SessionEffect::ScheduleRetry { delay, attempt } => {
                info!(
                    attempt,
                    max_retries = self.retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling automatic retry"
                );
                self.retry_deadline = Some(Instant::now() + delay);
                None
            }

            SessionEffect::ReleaseStream => {
                self.release_stream().await;
                None
            }
        }
    }

    /// Detaches the current stream resource.
    ///
    /// The signal endpoint goes first so nothing from the old resource can
    /// reach the state machine once release has begun.
    async fn release_stream(&mut self) {
        self.signals = None;
        if let Some(stream) = self.stream.take() {
            stream.shutdown().await;
        }
    }

    /// The engine dropped the signal channel.
    ///
    /// Once the stream has ended and the session parked, closure is the
    /// engine winding down and the parked state is kept. Any other closure
    /// means the engine died without a terminal signal, whatever the session
    /// was doing at the time, and counts as an interruption.
    async fn signal_channel_closed(&mut self) {
        self.signals = None;

        if self.stream_ended {
            debug!("Signal channel closed after stream end");
            return;
        }

        if matches!(
            self.state.status,
            PlaybackStatus::Loading
                | PlaybackStatus::Ready
                | PlaybackStatus::Playing
                | PlaybackStatus::Paused
        ) {
            self.apply(SessionInput::StreamFailed(StreamError::interrupted(
                "stream signal channel closed",
            )))
            .await;
        }
    }

    fn publish(&self) {
        let snapshot = self.state.snapshot(
            self.retry.max_retries,
            &self.source_url,
            &self.normalized_url,
        );
        self.snapshots.send_replace(snapshot);
    }

    /// Emits lifecycle events for the transition `previous` -> current.
    ///
    /// Keyed on the (before, after) status pair plus the triggering input, so
    /// no-op transitions emit nothing.
    fn emit_lifecycle(&self, input: &SessionInput, previous: &SessionState) {
        use PlaybackStatus::*;

        let session = self.session;
        let before = previous.status;
        let now = self.state.status;
        let mut out = Vec::new();

        if now == Loading && before != Loading {
            out.push(PlayerEvent::Loading {
                session,
                attempt: self.state.retry_count,
            });
        }

        if before == Loading && matches!(now, Ready | Playing) {
            out.push(PlayerEvent::Ready { session });
        }

        match (before, now) {
            (Loading | Ready, Playing) => out.push(PlayerEvent::Started { session }),
            (Paused, Playing) if !matches!(input, SessionInput::StreamEnded) => {
                out.push(PlayerEvent::Resumed { session });
            }
            (Playing, Paused) if !matches!(input, SessionInput::StreamEnded) => {
                out.push(PlayerEvent::Paused { session });
            }
            _ => {}
        }

        if matches!(input, SessionInput::StreamEnded) && matches!(before, Playing | Paused) {
            if now == Playing {
                out.push(PlayerEvent::Looped { session });
            } else {
                out.push(PlayerEvent::Ended { session });
            }
        }

        if now == Retrying && before != Retrying {
            let message = self
                .state
                .failure
                .as_ref()
                .map(|f| f.message.clone())
                .unwrap_or_default();
            out.push(PlayerEvent::Failed {
                session,
                message,
                terminal: false,
            });
            out.push(PlayerEvent::RetryScheduled {
                session,
                attempt: self.state.retry_count,
                max_retries: self.retry.max_retries,
                delay_ms: self.retry.delay_for(previous.retry_count).as_millis() as u64,
            });
        }

        if now == Failed && before != Failed {
            let message = self
                .state
                .failure
                .as_ref()
                .map(|f| f.message.clone())
                .unwrap_or_default();
            out.push(PlayerEvent::Failed {
                session,
                message,
                terminal: true,
            });
        }

        for event in out {
            self.events.emit(event).ok();
        }
    }

    async fn shutdown(&mut self) {
        self.retry_deadline = None;
        self.release_stream().await;
        self.events
            .emit(PlayerEvent::TornDown {
                session: self.session,
            })
            .ok();
        debug!("Session driver exited");
    }
}

/// Receives the next engine signal, or pends forever when no attempt is
/// attached. Keeping the closed-channel case out of the `select!` loop stops
/// a dead receiver from busy-waking the driver.
async fn next_signal(
    signals: &mut Option<mpsc::Receiver<StreamSignal>>,
) -> Option<StreamSignal> {
    match signals {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// Sleeps until `deadline`, or pends forever when no retry is armed.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
