//! # Streaming Playback Controller Usage Example
//!
//! This example demonstrates how to drive a `StreamingPlaybackController`
//! against a custom `MediaEngine` implementation: launch a session, watch its
//! lifecycle events, recover from a simulated connection drop, toggle
//! play/pause, and tear down.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use bridge_traits::audio::AudioRoute;
use bridge_traits::media::{
    MediaEngine, MediaStream, OpenedStream, StreamError, StreamRequest, StreamSignal,
    DEFAULT_SIGNAL_BUFFER,
};
use core_playback::{PlaybackStatus, SessionConfig, SessionOptions, StreamingPlaybackController};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventSeverity, PlayerEvent};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

// ============================================================================
// Simple In-Memory Media Engine (for demonstration)
// ============================================================================

/// Engine whose first stream drops mid-establishment, then serves a short
/// canned clip on every later attempt. The failure exercises the controller's
/// automatic retry path.
struct FlakyMediaEngine {
    opens: AtomicUsize,
    clip: Duration,
}

impl FlakyMediaEngine {
    fn new(clip: Duration) -> Self {
        Self {
            opens: AtomicUsize::new(0),
            clip,
        }
    }
}

#[async_trait::async_trait]
impl MediaEngine for FlakyMediaEngine {
    async fn open(&self, request: StreamRequest) -> bridge_traits::error::Result<OpenedStream> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst);
        println!("📡 Engine: opening stream #{attempt} for {}", request.url);

        let (signals, receiver) = mpsc::channel(DEFAULT_SIGNAL_BUFFER);

        if attempt == 0 {
            let _ = signals
                .send(StreamSignal::Failed(StreamError::interrupted(
                    "simulated connection drop",
                )))
                .await;
        } else {
            let _ = signals.send(StreamSignal::ReadyToPlay).await;
        }

        Ok(OpenedStream {
            handle: Box::new(ConsoleMediaStream {
                signals,
                clip: self.clip,
                end_armed: AtomicBool::new(false),
            }),
            signals: receiver,
        })
    }
}

/// Stream handle that narrates every control call and reports the end of the
/// canned clip once, `clip` after the first play.
struct ConsoleMediaStream {
    signals: mpsc::Sender<StreamSignal>,
    clip: Duration,
    end_armed: AtomicBool,
}

#[async_trait::async_trait]
impl MediaStream for ConsoleMediaStream {
    async fn play(&self) -> bridge_traits::error::Result<()> {
        println!("▶️  Stream: play");

        if !self.end_armed.swap(true, Ordering::SeqCst) {
            let signals = self.signals.clone();
            let clip = self.clip;
            tokio::spawn(async move {
                tokio::time::sleep(clip).await;
                let _ = signals.send(StreamSignal::Ended).await;
            });
        }

        Ok(())
    }

    async fn pause(&self) -> bridge_traits::error::Result<()> {
        println!("⏸️  Stream: pause");
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> bridge_traits::error::Result<()> {
        println!("🔇 Stream: muted = {muted}");
        Ok(())
    }

    async fn rewind(&self) -> bridge_traits::error::Result<()> {
        println!("⏪ Stream: rewind");
        Ok(())
    }

    async fn shutdown(&self) {
        println!("🧹 Stream: shutdown");
    }
}

// ============================================================================
// Simple Console Audio Route (for demonstration)
// ============================================================================

struct ConsoleAudioRoute;

#[async_trait::async_trait]
impl AudioRoute for ConsoleAudioRoute {
    async fn activate_playback(&self) -> bridge_traits::error::Result<()> {
        println!("🔊 Audio route: activated for playback");
        Ok(())
    }
}

// ============================================================================
// Main Demo
// ============================================================================

fn print_event(event: &PlayerEvent) {
    let icon = match event.severity() {
        EventSeverity::Error => "❌",
        EventSeverity::Warning => "⚠️ ",
        EventSeverity::Info => "ℹ️ ",
        EventSeverity::Debug => "· ",
    };
    println!("{icon} Event: {}", event.description());

    match event {
        PlayerEvent::RetryScheduled {
            attempt,
            max_retries,
            delay_ms,
            ..
        } => println!("   retry {attempt}/{max_retries} in {delay_ms} ms"),
        PlayerEvent::Failed { message, .. } => println!("   {message}"),
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🎬 Streaming Playback Controller Demo\n");

    // Wire the bridges into a core config
    let core = CoreConfig::builder()
        .media_engine(std::sync::Arc::new(FlakyMediaEngine::new(
            Duration::from_millis(1200),
        )))
        .audio_route(std::sync::Arc::new(ConsoleAudioRoute))
        .event_capacity(64)
        .build()?;

    // Print lifecycle events as they are published
    let mut events = core.events.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => println!("   (skipped {skipped} events)"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Launch a session; the URL is normalized before it reaches the engine
    let controller = StreamingPlaybackController::launch(
        &core,
        SessionConfig::fast_recovery(),
        SessionOptions::default(),
        "http://www.sacavia.com/api/media/demo-clip.mp4",
    )
    .await?;

    println!("🔗 Source URL:     {}", controller.source_url());
    println!("🔗 Normalized URL: {}\n", controller.normalized_url());

    // The first attempt fails; the controller retries on its own
    let mut watch = controller.watch();
    watch
        .wait_for(|snapshot| snapshot.status == PlaybackStatus::Playing)
        .await?;

    // A healthy stream restores the retry budget, so the count is back to 0
    let snapshot = controller.snapshot();
    println!(
        "\n📊 Now playing (session {}), retry budget used: {}/{}\n",
        controller.session_id(),
        snapshot.retry_count,
        snapshot.max_retries
    );

    // Toggle pause and back
    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.toggle_play_pause();
    watch
        .wait_for(|snapshot| snapshot.status == PlaybackStatus::Paused)
        .await?;
    println!("📊 Status: {:?}\n", controller.snapshot().status);

    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.toggle_play_pause();
    watch
        .wait_for(|snapshot| snapshot.status == PlaybackStatus::Playing)
        .await?;

    // Looping is disabled, so the end of the clip parks the session paused
    watch
        .wait_for(|snapshot| snapshot.status == PlaybackStatus::Paused)
        .await?;
    println!("📊 Clip finished, status: {:?}\n", controller.snapshot().status);

    // Release the stream and stop the driver
    controller.teardown().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    printer.abort();

    println!("\n🎉 Demo completed successfully!");

    Ok(())
}
