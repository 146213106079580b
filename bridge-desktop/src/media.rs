//! HTTP Media Engine Implementation using Reqwest
//!
//! A progressive fetcher standing in for a platform video player on desktop
//! hosts. Each opened stream runs a transfer task that issues the GET,
//! reports readiness once a success status and the first body chunk arrive,
//! and then consumes the body while playback is active. Lifecycle outcomes
//! (end of stream, stalls, transport failures) are reported as
//! [`StreamSignal`]s; the engine never retries on its own, that policy
//! belongs to the playback core.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::media::{
    MediaEngine, MediaStream, OpenedStream, SessionId, StreamError, StreamRequest, StreamSignal,
    DEFAULT_SIGNAL_BUFFER,
};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Tuning for the HTTP media engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deadline for the response head of each GET, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// TCP connect deadline, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// A body read exceeding this is reported as a stall, in milliseconds.
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_stall_timeout_ms() -> u64 {
    15_000
}

fn default_user_agent() -> String {
    "sacavia-media-core/0.1".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            stall_timeout_ms: default_stall_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    /// Validate config values.
    ///
    /// Returns a description of the first problem found, if any.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be greater than zero".to_string());
        }
        if self.connect_timeout_ms == 0 {
            return Err("connect_timeout_ms must be greater than zero".to_string());
        }
        if self.stall_timeout_ms == 0 {
            return Err("stall_timeout_ms must be greater than zero".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }
        Ok(())
    }
}

/// Reqwest-based media engine.
///
/// One shared client provides connection pooling and TLS; per-stream state
/// lives entirely in the transfer task spawned by [`MediaEngine::open`].
pub struct HttpMediaEngine {
    client: Client,
    config: EngineConfig,
}

impl HttpMediaEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid engine config: {e}")))?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(4)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Create an engine around an existing client, for hosts that already
    /// maintain one.
    pub fn with_client(client: Client, config: EngineConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl MediaEngine for HttpMediaEngine {
    async fn open(&self, request: StreamRequest) -> Result<OpenedStream> {
        let (signal_tx, signal_rx) = mpsc::channel(DEFAULT_SIGNAL_BUFFER);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        if let Some(prebuffer) = request.prebuffer {
            // Hint only; a byte-oriented fetcher has no media clock to honor it.
            debug!(session = %request.session, prebuffer_ms = prebuffer.as_millis() as u64,
                "Ignoring prebuffer hint");
        }

        let transfer = Transfer {
            client: self.client.clone(),
            url: request.url,
            session: request.session,
            request_timeout: self.config.request_timeout(),
            stall_timeout: self.config.stall_timeout(),
            signals: signal_tx,
            commands: command_rx,
            stream: None,
            playing: false,
            bytes: 0,
        };
        let task = tokio::spawn(transfer.run());
        debug!(session = %request.session, "Opened HTTP media transfer");

        Ok(OpenedStream {
            handle: Box::new(HttpMediaStream {
                commands: command_tx,
                task: tokio::sync::Mutex::new(Some(task)),
            }),
            signals: signal_rx,
        })
    }
}

/// Control handle for one transfer task.
struct HttpMediaStream {
    commands: mpsc::UnboundedSender<TransferCommand>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl HttpMediaStream {
    fn command(&self, command: TransferCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| BridgeError::ShutDown("media transfer task has exited".to_string()))
    }
}

#[async_trait]
impl MediaStream for HttpMediaStream {
    async fn play(&self) -> Result<()> {
        self.command(TransferCommand::Play)
    }

    async fn pause(&self) -> Result<()> {
        self.command(TransferCommand::Pause)
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.command(TransferCommand::SetMuted(muted))
    }

    async fn rewind(&self) -> Result<()> {
        self.command(TransferCommand::Rewind)
    }

    async fn shutdown(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            // Wait out the cancellation so no transfer work survives return.
            let _ = handle.await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferCommand {
    Play,
    Pause,
    SetMuted(bool),
    Rewind,
}

type BodyStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Outcome of issuing the GET and gating on the first body chunk.
enum Fetch {
    /// Body is flowing; readiness was signaled when asked for.
    Streaming(BodyStream),
    /// Empty body on the initial fetch; ready and `Ended` were already
    /// signaled.
    Drained,
    /// A terminal signal was sent; the task must exit.
    Terminal,
}

enum ChunkRead {
    Data(Bytes),
    Eof,
    Stalled,
    Failed(StreamError),
}

/// Per-stream transfer task state.
struct Transfer {
    client: Client,
    url: String,
    session: SessionId,
    request_timeout: Duration,
    stall_timeout: Duration,
    signals: mpsc::Sender<StreamSignal>,
    commands: mpsc::UnboundedReceiver<TransferCommand>,
    stream: Option<BodyStream>,
    playing: bool,
    bytes: u64,
}

impl Transfer {
    async fn run(mut self) {
        match self.start_stream(true).await {
            Fetch::Streaming(stream) => self.stream = Some(stream),
            Fetch::Drained => {}
            Fetch::Terminal => return,
        }

        loop {
            if self.playing {
                tokio::select! {
                    biased;

                    command = self.commands.recv() => match command {
                        Some(command) => {
                            if !self.handle_command(command).await {
                                return;
                            }
                        }
                        None => return,
                    },

                    read = Self::next_chunk(&mut self.stream, self.stall_timeout) => {
                        if !self.handle_read(read).await {
                            return;
                        }
                    }
                }
            } else {
                match self.commands.recv().await {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            return;
                        }
                    }
                    None => return,
                }
            }
        }
    }

    /// Issue the GET and wait for the first body chunk.
    ///
    /// Readiness is only reported on the `initial` fetch. A rewind re-fetch
    /// that finds an empty body is reported as a failure, not a second end;
    /// a looping caller answers every end with another rewind.
    async fn start_stream(&mut self, initial: bool) -> Fetch {
        let request = self.client.get(&self.url).send();
        let response = match tokio::time::timeout(self.request_timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(session = %self.session, error = %err, "Media request failed");
                self.signal(StreamSignal::Failed(classify_transport_error(&err)))
                    .await;
                return Fetch::Terminal;
            }
            Err(_) => {
                warn!(
                    session = %self.session,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "Media request timed out"
                );
                self.signal(StreamSignal::Failed(StreamError::timed_out(
                    "no response before the request deadline",
                )))
                .await;
                return Fetch::Terminal;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(session = %self.session, status = status.as_u16(), "Media request rejected");
            self.signal(StreamSignal::Failed(StreamError::other(format!(
                "HTTP status {status}"
            ))))
            .await;
            return Fetch::Terminal;
        }

        let mut stream: BodyStream = Box::pin(response.bytes_stream());
        match tokio::time::timeout(self.stall_timeout, stream.next()).await {
            Ok(Some(Ok(chunk))) => {
                self.bytes = chunk.len() as u64;
                debug!(
                    session = %self.session,
                    status = status.as_u16(),
                    first_chunk = chunk.len(),
                    "Media transfer ready"
                );
                if initial && !self.signal(StreamSignal::ReadyToPlay).await {
                    return Fetch::Terminal;
                }
                Fetch::Streaming(stream)
            }
            Ok(Some(Err(err))) => {
                warn!(session = %self.session, error = %err, "Media body failed before readiness");
                self.signal(StreamSignal::Failed(classify_transport_error(&err)))
                    .await;
                Fetch::Terminal
            }
            Ok(None) => {
                if !initial {
                    warn!(session = %self.session, "Media body empty on rewind");
                    self.signal(StreamSignal::Failed(StreamError::other(
                        "empty body on rewind",
                    )))
                    .await;
                    return Fetch::Terminal;
                }
                debug!(session = %self.session, "Media body is empty");
                if !self.signal(StreamSignal::ReadyToPlay).await {
                    return Fetch::Terminal;
                }
                self.signal(StreamSignal::Ended).await;
                self.playing = false;
                Fetch::Drained
            }
            Err(_) => {
                warn!(session = %self.session, "Media body stalled before readiness");
                self.signal(StreamSignal::Stalled).await;
                Fetch::Terminal
            }
        }
    }

    /// Returns false when the task must exit.
    async fn handle_command(&mut self, command: TransferCommand) -> bool {
        match command {
            TransferCommand::Play => {
                if self.stream.is_none() {
                    // Replaying a drained stream ends it immediately.
                    self.playing = false;
                    return self.signal(StreamSignal::Ended).await;
                }
                self.playing = true;
                true
            }
            TransferCommand::Pause => {
                self.playing = false;
                true
            }
            TransferCommand::SetMuted(muted) => {
                // Logged only; a byte-oriented fetcher has no audio path to mute.
                debug!(session = %self.session, muted, "Ignoring mute command");
                true
            }
            TransferCommand::Rewind => {
                self.stream = None;
                self.bytes = 0;
                match self.start_stream(false).await {
                    Fetch::Streaming(stream) => {
                        self.stream = Some(stream);
                        true
                    }
                    Fetch::Drained => true,
                    Fetch::Terminal => false,
                }
            }
        }
    }

    /// Returns false when the task must exit.
    async fn handle_read(&mut self, read: ChunkRead) -> bool {
        match read {
            ChunkRead::Data(chunk) => {
                self.bytes += chunk.len() as u64;
                true
            }
            ChunkRead::Eof => {
                debug!(session = %self.session, bytes = self.bytes,
                    "Media transfer reached end of stream");
                self.stream = None;
                self.playing = false;
                self.signal(StreamSignal::Ended).await
            }
            ChunkRead::Stalled => {
                warn!(
                    session = %self.session,
                    stall_ms = self.stall_timeout.as_millis() as u64,
                    "Media transfer stalled"
                );
                self.signal(StreamSignal::Stalled).await;
                false
            }
            ChunkRead::Failed(error) => {
                warn!(session = %self.session, error = %error, "Media transfer failed");
                self.signal(StreamSignal::Failed(error)).await;
                false
            }
        }
    }

    /// Next body chunk, or pend forever while no body is attached.
    async fn next_chunk(stream: &mut Option<BodyStream>, stall_timeout: Duration) -> ChunkRead {
        match stream {
            Some(stream) => match tokio::time::timeout(stall_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => ChunkRead::Data(chunk),
                Ok(Some(Err(err))) => ChunkRead::Failed(classify_transport_error(&err)),
                Ok(None) => ChunkRead::Eof,
                Err(_) => ChunkRead::Stalled,
            },
            None => std::future::pending().await,
        }
    }

    /// Returns false once the receiver is gone and signaling is pointless.
    async fn signal(&mut self, signal: StreamSignal) -> bool {
        self.signals.send(signal).await.is_ok()
    }
}

/// Map a transport error onto the normalized failure categories.
///
/// Connectivity loss outranks timeouts, timeouts outrank unreachable hosts,
/// and cut-off transfers outrank the catch-all. The raw error text is kept
/// as the detail.
fn classify_transport_error(err: &reqwest::Error) -> StreamError {
    let detail = err.to_string();

    if let Some(kind) = io_error_kind(err) {
        if let Some(classified) = classify_io_error_kind(kind, &detail) {
            return classified;
        }
    }

    if err.is_timeout() {
        return StreamError::timed_out(detail);
    }
    if err.is_connect() {
        // DNS and routing failures surface as connect errors.
        return StreamError::host_unreachable(detail);
    }
    if err.is_body() || err.is_decode() {
        return StreamError::interrupted(detail);
    }
    StreamError::other(detail)
}

/// Classification for errors that expose an OS-level cause.
fn classify_io_error_kind(kind: std::io::ErrorKind, detail: &str) -> Option<StreamError> {
    use std::io::ErrorKind;

    match kind {
        ErrorKind::NetworkDown | ErrorKind::NetworkUnreachable | ErrorKind::AddrNotAvailable => {
            Some(StreamError::no_connectivity(detail))
        }
        ErrorKind::TimedOut => Some(StreamError::timed_out(detail)),
        ErrorKind::HostUnreachable | ErrorKind::ConnectionRefused => {
            Some(StreamError::host_unreachable(detail))
        }
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => Some(StreamError::interrupted(detail)),
        _ => None,
    }
}

/// First `std::io::Error` in the source chain, if any.
fn io_error_kind(err: &(dyn std::error::Error + 'static)) -> Option<std::io::ErrorKind> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = cause.source();
    }
    None
}
