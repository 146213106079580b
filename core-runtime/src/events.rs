//! # Event Bus System
//!
//! Event-driven side channel for the streaming playback core using
//! `tokio::sync::broadcast`. The snapshot channel owned by the controller is
//! the authoritative state surface; this bus carries the lifecycle moments a
//! shell wants to react to without polling state (toasts, diagnostics,
//! analytics hooks written by the host).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │   Session    ├──────────────>│           │
//! │   driver     │               │ EventBus  │     subscribe    ┌────────────┐
//! └──────────────┘               │ (broadcast├─────────────────>│  UI shell  │
//!                                │  channel) │                  └────────────┘
//! ┌──────────────┐     emit      │           │     subscribe    ┌────────────┐
//! │  Controller  ├──────────────>│           ├─────────────────>│ Diagnostics│
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use core_runtime::events::{EventBus, PlayerEvent};
//! use bridge_traits::media::SessionId;
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut events = bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match events.recv().await {
//!             Ok(event) => println!("{}", event.description()),
//!             Err(RecvError::Lagged(missed)) => eprintln!("dropped {missed} events"),
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//!
//! bus.emit(PlayerEvent::Ready { session: SessionId::new() }).ok();
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The bus uses `tokio::sync::broadcast`, which can produce two errors on the
//! receiving side:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; the subscriber keeps receiving new events. The snapshot
//!   channel still holds the current truth.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates
//!   shutdown.
//!
//! ## Thread Safety
//!
//! The event bus is fully thread-safe (`Send + Sync`) and cheap to clone;
//! every clone publishes into the same channel.

use bridge_traits::media::SessionId;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Broadcast error and receiver types are part of the public surface.
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// A session emits a handful of events per lifecycle phase, so this absorbs
/// bursts from several concurrent sessions. Subscribers that cannot keep up
/// receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Player Event Types
// ============================================================================

/// Lifecycle events published by streaming sessions.
///
/// Every variant names the session it belongs to, so one bus can serve any
/// number of controllers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlayerEvent {
    /// A controller was created and its driver started.
    SessionLaunched {
        session: SessionId,
        /// Normalized URL the session will stream, without query parameters.
        url: String,
    },
    /// A stream attempt is being established.
    Loading {
        session: SessionId,
        /// Automatic retries scheduled so far; 0 for the first attempt.
        attempt: u32,
    },
    /// The stream reported it can render.
    Ready { session: SessionId },
    /// Playback started from the ready state.
    Started { session: SessionId },
    /// Playback paused.
    Paused { session: SessionId },
    /// Playback resumed from pause.
    Resumed { session: SessionId },
    /// An automatic retry was scheduled after a failure.
    RetryScheduled {
        session: SessionId,
        /// 1-based index of the scheduled retry.
        attempt: u32,
        max_retries: u32,
        delay_ms: u64,
    },
    /// A stream attempt failed.
    Failed {
        session: SessionId,
        /// Display message derived from the failure category.
        message: String,
        /// True when the retry budget is spent and no retry was scheduled.
        terminal: bool,
    },
    /// The stream ended and restarted from the top.
    Looped { session: SessionId },
    /// The stream ended without looping.
    Ended { session: SessionId },
    /// The session was torn down and its resources released.
    TornDown { session: SessionId },
}

impl PlayerEvent {
    /// Returns the session this event belongs to.
    pub fn session(&self) -> SessionId {
        match self {
            PlayerEvent::SessionLaunched { session, .. }
            | PlayerEvent::Loading { session, .. }
            | PlayerEvent::Ready { session }
            | PlayerEvent::Started { session }
            | PlayerEvent::Paused { session }
            | PlayerEvent::Resumed { session }
            | PlayerEvent::RetryScheduled { session, .. }
            | PlayerEvent::Failed { session, .. }
            | PlayerEvent::Looped { session }
            | PlayerEvent::Ended { session }
            | PlayerEvent::TornDown { session } => *session,
        }
    }

    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            PlayerEvent::SessionLaunched { .. } => "Streaming session launched",
            PlayerEvent::Loading { .. } => "Establishing stream",
            PlayerEvent::Ready { .. } => "Stream ready to play",
            PlayerEvent::Started { .. } => "Playback started",
            PlayerEvent::Paused { .. } => "Playback paused",
            PlayerEvent::Resumed { .. } => "Playback resumed",
            PlayerEvent::RetryScheduled { .. } => "Automatic retry scheduled",
            PlayerEvent::Failed { terminal: true, .. } => "Stream failed permanently",
            PlayerEvent::Failed { terminal: false, .. } => "Stream failed",
            PlayerEvent::Looped { .. } => "Stream looped",
            PlayerEvent::Ended { .. } => "Stream ended",
            PlayerEvent::TornDown { .. } => "Session torn down",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::Failed { terminal: true, .. } => EventSeverity::Error,
            PlayerEvent::Failed { terminal: false, .. } => EventSeverity::Warning,
            PlayerEvent::RetryScheduled { .. } => EventSeverity::Warning,
            PlayerEvent::SessionLaunched { .. }
            | PlayerEvent::Ready { .. }
            | PlayerEvent::Started { .. }
            | PlayerEvent::TornDown { .. } => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Coarse severity attached to every event, for shells that route the bus
/// into their own logging or toast machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Routine lifecycle chatter (pause, resume, loop).
    Debug,
    /// Milestones worth surfacing.
    Info,
    /// Recoverable trouble; a retry is in flight.
    Warning,
    /// Terminal failure.
    Error,
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for session lifecycle events.
///
/// Cloning is cheap; all clones publish into the same channel. Subscribers
/// see only events emitted after they subscribe.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a bus that buffers up to `capacity` events per subscriber.
    ///
    /// A subscriber that falls further behind than `capacity` gets
    /// `RecvError::Lagged` on its next receive and resumes from the oldest
    /// event still retained.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a bus with [`DEFAULT_EVENT_BUFFER_SIZE`].
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to every current subscriber and returns how many
    /// received it.
    ///
    /// Emitting into a bus with no subscribers is an error at the channel
    /// level. Callers that treat events as fire-and-forget (the controller
    /// does) discard the result with `ok()`.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    /// Opens an independent receiver. Events emitted before this call are
    /// not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    /// Number of receivers currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Boxed predicate deciding which events a stream lets through.
type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` paired with an optional predicate, for consumers
/// interested in one session or one class of events.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, PlayerEvent};
///
/// let bus = EventBus::new(16);
/// let failures = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, PlayerEvent::Failed { .. }));
/// ```
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Wraps a receiver with no predicate attached.
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Attaches a predicate; `recv` then skips events it rejects.
    ///
    /// Scoping a stream to a single session:
    ///
    /// ```rust
    /// use core_runtime::events::{EventBus, EventStream};
    /// use bridge_traits::media::SessionId;
    ///
    /// let bus = EventBus::new(16);
    /// let session = SessionId::new();
    /// let mine = EventStream::new(bus.subscribe())
    ///     .filter(move |event| event.session() == session);
    /// ```
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Waits for the next event the predicate accepts.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` when this subscriber fell `n` events behind;
    /// `RecvError::Closed` once every sender is gone.
    pub async fn recv(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            match &self.filter {
                Some(keep) if !keep(&event) => continue,
                _ => return Ok(event),
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv). Returns `None` when no
    /// event is queued.
    pub fn try_recv(&mut self) -> Option<Result<PlayerEvent, RecvError>> {
        use tokio::sync::broadcast::error::TryRecvError;

        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            match &self.filter {
                Some(keep) if !keep(&event) => continue,
                _ => return Some(Ok(event)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_count_tracks_receivers() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);

        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(sub);
        bus.emit(PlayerEvent::Ready {
            session: SessionId::new(),
        })
        .ok();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_channel_error() {
        let bus = EventBus::new(8);
        let event = PlayerEvent::Ready {
            session: SessionId::new(),
        };

        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_emitted_event_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe();

        let event = PlayerEvent::Started {
            session: SessionId::new(),
        };
        assert_eq!(bus.emit(event.clone()).unwrap(), 1);

        assert_eq!(sub.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_the_event() {
        let bus = EventBus::new(8);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = PlayerEvent::RetryScheduled {
            session: SessionId::new(),
            attempt: 1,
            max_retries: 3,
            delay_ms: 800,
        };
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, PlayerEvent::Failed { .. }));

        // Should be filtered out
        bus.emit(PlayerEvent::Loading {
            session: SessionId::new(),
            attempt: 0,
        })
        .ok();

        // Should pass through
        let failure = PlayerEvent::Failed {
            session: SessionId::new(),
            message: "Connection timed out".to_string(),
            terminal: false,
        };
        bus.emit(failure.clone()).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received, failure);
    }

    #[tokio::test]
    async fn test_session_filter_separates_sessions() {
        let bus = EventBus::new(10);
        let mine = SessionId::new();
        let other = SessionId::new();

        let mut stream =
            EventStream::new(bus.subscribe()).filter(move |event| event.session() == mine);

        bus.emit(PlayerEvent::Started { session: other }).ok();
        bus.emit(PlayerEvent::Started { session: mine }).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received.session(), mine);
    }

    #[tokio::test]
    async fn test_slow_subscriber_observes_lag() {
        // Buffer of 2, then overrun it by three events
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        let session = SessionId::new();
        for attempt in 0..5 {
            bus.emit(PlayerEvent::Loading { session, attempt }).ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_event_severity() {
        let session = SessionId::new();

        let terminal = PlayerEvent::Failed {
            session,
            message: "Server not found".to_string(),
            terminal: true,
        };
        assert_eq!(terminal.severity(), EventSeverity::Error);

        let retrying = PlayerEvent::Failed {
            session,
            message: "Connection timed out".to_string(),
            terminal: false,
        };
        assert_eq!(retrying.severity(), EventSeverity::Warning);

        let ready = PlayerEvent::Ready { session };
        assert_eq!(ready.severity(), EventSeverity::Info);

        let paused = PlayerEvent::Paused { session };
        assert_eq!(paused.severity(), EventSeverity::Debug);
    }

    #[tokio::test]
    async fn test_event_description() {
        let event = PlayerEvent::RetryScheduled {
            session: SessionId::new(),
            attempt: 2,
            max_retries: 3,
            delay_ms: 1600,
        };
        assert_eq!(event.description(), "Automatic retry scheduled");
    }

    #[tokio::test]
    async fn test_event_serialization() {
        let event = PlayerEvent::Failed {
            session: SessionId::new(),
            message: "Video streaming interrupted. Retrying...".to_string(),
            terminal: false,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"Failed\""));
        assert!(json.contains("interrupted"));

        let deserialized: PlayerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());

        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();
        let session = SessionId::new();

        let handle1 = tokio::spawn(async move {
            for attempt in 0..10 {
                bus1.emit(PlayerEvent::Loading { session, attempt }).ok();
            }
        });

        let handle2 = tokio::spawn(async move {
            for _ in 0..10 {
                bus2.emit(PlayerEvent::Paused { session }).ok();
            }
        });

        handle1.await.ok();
        handle2.await.ok();

        let mut seen = 0;
        while sub.try_recv().is_ok() {
            seen += 1;
        }
        assert_eq!(seen, 20);
    }
}
