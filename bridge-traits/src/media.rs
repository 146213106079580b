//! Media engine bridge traits and streaming session types.
//!
//! These abstractions let the core playback module drive a platform media
//! framework (a desktop HTTP fetcher, a native AV stack, a test double)
//! through one async-first surface. A host provides a [`MediaEngine`]; the
//! core opens at most one stream per session at a time and observes it through
//! the signal channel handed back at open time.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Default capacity for the per-stream signal channel.
///
/// Streams emit a handful of lifecycle signals over their whole life, so a
/// small buffer is enough; an engine that outruns it should treat the stream
/// as abandoned rather than block.
pub const DEFAULT_SIGNAL_BUFFER: usize = 16;

/// Unique identifier for a playback session, used to correlate engine
/// activity, events, and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Request describing the stream a host engine should establish.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// Fully resolved URL of the remote resource.
    pub url: String,
    /// Session the stream belongs to, for correlation.
    pub session: SessionId,
    /// Hint for engines to pre-buffer this much media before reporting ready.
    pub prebuffer: Option<Duration>,
}

impl StreamRequest {
    /// Construct a request for the given URL and session.
    pub fn new(url: impl Into<String>, session: SessionId) -> Self {
        Self {
            url: url.into(),
            session,
            prebuffer: None,
        }
    }

    /// Attach a pre-buffer hint.
    pub fn with_prebuffer(mut self, prebuffer: Duration) -> Self {
        self.prebuffer = Some(prebuffer);
        self
    }
}

/// Normalized failure category reported by host engines.
///
/// Engines map their platform error surface (URL loader codes, socket errno,
/// HTTP client errors) onto this fixed set; when several categories could
/// apply, the first matching one in declaration order wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorKind {
    /// The device has no usable network path.
    NoConnectivity,
    /// The request or a mid-stream read exceeded its deadline.
    TimedOut,
    /// The remote host could not be resolved or reached.
    HostUnreachable,
    /// An established stream stopped making progress or was cut off.
    Interrupted,
    /// Anything else; `detail` carries the underlying description.
    Other,
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StreamErrorKind::NoConnectivity => "network unreachable",
            StreamErrorKind::TimedOut => "request timed out",
            StreamErrorKind::HostUnreachable => "host not found",
            StreamErrorKind::Interrupted => "stream interrupted",
            StreamErrorKind::Other => "stream error",
        };
        f.write_str(label)
    }
}

/// Failure reported by an engine for one stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct StreamError {
    /// Normalized category.
    pub kind: StreamErrorKind,
    /// Engine-level description of what went wrong.
    pub detail: String,
}

impl StreamError {
    /// Construct an error with an explicit category.
    pub fn new(kind: StreamErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn no_connectivity(detail: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::NoConnectivity, detail)
    }

    pub fn timed_out(detail: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::TimedOut, detail)
    }

    pub fn host_unreachable(detail: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::HostUnreachable, detail)
    }

    pub fn interrupted(detail: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Interrupted, detail)
    }

    pub fn other(detail: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Other, detail)
    }
}

/// Lifecycle signal emitted by an engine for one stream.
///
/// Signals arrive on the channel returned from [`MediaEngine::open`] and are
/// scoped to that stream only. After [`MediaStream::shutdown`] the engine may
/// still attempt sends; they fail harmlessly once the receiver is dropped.
#[derive(Debug, Clone)]
pub enum StreamSignal {
    /// Enough media is buffered for rendering to begin.
    ReadyToPlay,
    /// The stream reached its end.
    Ended,
    /// The stream stopped making progress mid-flight.
    Stalled,
    /// The stream failed; no further signals follow.
    Failed(StreamError),
}

/// A freshly opened stream: the control handle plus its private signal
/// channel.
///
/// Dropping `signals` and awaiting [`MediaStream::shutdown`] is the
/// deterministic detach: afterwards nothing the engine does can reach the
/// caller.
pub struct OpenedStream {
    /// Control surface for the live stream resource.
    pub handle: Box<dyn MediaStream>,
    /// Lifecycle signals for this resource only.
    pub signals: mpsc::Receiver<StreamSignal>,
}

impl fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedStream").finish_non_exhaustive()
    }
}

/// Trait for host media engines that establish streams over the network.
///
/// `open` must not block on stream establishment: it returns as soon as the
/// resource exists, and success or failure of the actual connection arrives
/// later as a [`StreamSignal`]. An engine may only return `Err` for local
/// preconditions, for example when it has already been shut down.
#[async_trait::async_trait]
pub trait MediaEngine: Send + Sync {
    /// Provision a new stream resource for `request`.
    async fn open(&self, request: StreamRequest) -> Result<OpenedStream>;
}

/// Control surface for one live stream resource.
#[async_trait::async_trait]
pub trait MediaStream: Send + Sync {
    /// Begin or resume rendering.
    async fn play(&self) -> Result<()>;

    /// Pause rendering without releasing the resource.
    async fn pause(&self) -> Result<()>;

    /// Apply the mute state. Re-applied by the core on every resume.
    async fn set_muted(&self, muted: bool) -> Result<()>;

    /// Seek back to the start of the stream, used for gapless looping.
    async fn rewind(&self) -> Result<()>;

    /// Release the underlying resource. Idempotent; never fails. Returns
    /// once the engine has stopped all work for this stream.
    async fn shutdown(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        Engine {}

        #[async_trait]
        impl MediaEngine for Engine {
            async fn open(&self, request: StreamRequest) -> Result<OpenedStream>;
        }
    }

    mock! {
        Stream {}

        #[async_trait]
        impl MediaStream for Stream {
            async fn play(&self) -> Result<()>;
            async fn pause(&self) -> Result<()>;
            async fn set_muted(&self, muted: bool) -> Result<()>;
            async fn rewind(&self) -> Result<()>;
            async fn shutdown(&self);
        }
    }

    #[test]
    fn session_id_is_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert_eq!(a, SessionId::from_uuid(*a.as_uuid()));
    }

    #[test]
    fn stream_request_defaults() {
        let req = StreamRequest::new("https://sacavia.com/api/media/file/a.mp4", SessionId::new());
        assert!(req.prebuffer.is_none());

        let req = req.with_prebuffer(Duration::from_millis(500));
        assert_eq!(req.prebuffer, Some(Duration::from_millis(500)));
    }

    #[test]
    fn stream_error_display_includes_category_and_detail() {
        let err = StreamError::timed_out("read deadline 15s exceeded");
        assert_eq!(err.kind, StreamErrorKind::TimedOut);
        assert_eq!(
            err.to_string(),
            "request timed out: read deadline 15s exceeded"
        );
    }

    #[test]
    fn failed_signal_carries_error() {
        let signal = StreamSignal::Failed(StreamError::interrupted("connection reset"));
        match signal {
            StreamSignal::Failed(err) => assert_eq!(err.kind, StreamErrorKind::Interrupted),
            other => panic!("unexpected signal: {other:?}"),
        }
    }

    #[tokio::test]
    async fn opened_stream_detach_drops_late_signals() {
        let session = SessionId::new();
        let url = "https://sacavia.com/api/media/file/clip.mp4";

        let (tx, rx) = mpsc::channel(DEFAULT_SIGNAL_BUFFER);
        let mut handle = MockStream::new();
        handle.expect_play().times(1).returning(|| Ok(()));
        handle.expect_shutdown().times(1).return_const(());

        let mut engine = MockEngine::new();
        engine
            .expect_open()
            .withf(move |request| request.url == url && request.session == session)
            .return_once(move |_| {
                Ok(OpenedStream {
                    handle: Box::new(handle),
                    signals: rx,
                })
            });
        let engine: Box<dyn MediaEngine> = Box::new(engine);

        let mut opened = engine
            .open(StreamRequest::new(url, session))
            .await
            .unwrap();
        tx.send(StreamSignal::ReadyToPlay).await.unwrap();
        assert!(matches!(
            opened.signals.recv().await,
            Some(StreamSignal::ReadyToPlay)
        ));
        opened.handle.play().await.unwrap();

        // Dropping the receiver and awaiting shutdown is the detach; the
        // engine's remaining sends go nowhere.
        drop(opened.signals);
        opened.handle.shutdown().await;
        assert!(tx.try_send(StreamSignal::Ended).is_err());
    }
}
