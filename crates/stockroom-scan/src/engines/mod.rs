//! # Engine Implementations
//!
//! The three concrete backends and the frame loop they share.
//!
//! ## Detection Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   spawn ──► alive? ──no──► release stream ──► exit                      │
//! │               │ yes                                                     │
//! │               ▼                                                         │
//! │          next_frame() ◄── stop signal wins the select                   │
//! │               │                                                         │
//! │               ▼                                                         │
//! │          decode(frame) ──Some(text)──► sink.emit ──► release ──► exit   │
//! │               │ None                                                    │
//! │               ▼                                                         │
//! │          wait cadence (poll interval or next frame) ──► alive? ...      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop owns the stream, so every exit path releases it. Stopping clears
//! the liveness flag before waking the loop; a loop never reschedules after
//! the flag drops.

pub mod fallback;
pub mod native;
pub mod vision;

pub use fallback::FallbackEngine;
pub use native::{NativeDetectorEngine, PlatformDetector};
pub use vision::{DecoderModule, VisionDecoderEngine};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::camera::{Camera, CameraStream, PreviewSurface};
use crate::config::ScannerSettings;
use crate::engine::{
    BarcodeEngine, DecoderFactory, DetectionSink, EngineHandle, EngineId, FrameDecoder,
};
use crate::error::{ScanError, ScanResult};

/// How the loop paces itself between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cadence {
    /// Decode every frame as it arrives.
    EveryFrame,
    /// Sleep between detection attempts.
    Interval(Duration),
}

/// A running detection loop. The handle every engine returns.
pub(crate) struct DetectionLoop {
    engine: EngineId,
    alive: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: Option<JoinHandle<()>>,
    surface: Arc<dyn PreviewSurface>,
}

impl DetectionLoop {
    /// Attaches the preview and spawns the loop.
    pub(crate) fn spawn(
        mut stream: Box<dyn CameraStream>,
        mut decoder: Box<dyn FrameDecoder>,
        sink: DetectionSink,
        cadence: Cadence,
        surface: Arc<dyn PreviewSurface>,
    ) -> Self {
        let engine = sink.engine();
        let alive = Arc::new(AtomicBool::new(true));
        let wake = Arc::new(Notify::new());

        surface.attach(stream.id());
        debug!(engine = %engine, stream = stream.id(), "Detection loop attached");

        let task = {
            let alive = alive.clone();
            let wake = wake.clone();

            tokio::spawn(async move {
                while alive.load(Ordering::Acquire) {
                    let frame = tokio::select! {
                        _ = wake.notified() => break,
                        frame = stream.next_frame() => frame,
                    };

                    let Some(frame) = frame else {
                        debug!(engine = %engine, "Camera stream ended");
                        break;
                    };

                    if !alive.load(Ordering::Acquire) {
                        break;
                    }

                    match decoder.decode(&frame) {
                        Ok(Some(text)) => {
                            debug!(engine = %engine, "Barcode decoded");
                            sink.emit(text);
                            break;
                        }
                        Ok(None) => {}
                        Err(e) => trace!(engine = %engine, error = %e, "Frame decode failed"),
                    }

                    if let Cadence::Interval(interval) = cadence {
                        tokio::select! {
                            _ = wake.notified() => break,
                            _ = tokio::time::sleep(interval) => {}
                        }
                    }
                }

                stream.release();
                trace!(engine = %engine, "Detection loop exited");
            })
        };

        DetectionLoop {
            engine,
            alive,
            wake,
            task: Some(task),
            surface,
        }
    }
}

#[async_trait]
impl EngineHandle for DetectionLoop {
    fn engine(&self) -> EngineId {
        self.engine
    }

    async fn stop(&mut self) -> ScanResult<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        self.alive.store(false, Ordering::Release);
        self.wake.notify_one();

        let joined = task.await;
        self.surface.clear();

        joined.map_err(|e| ScanError::EngineStop {
            engine: self.engine,
            reason: e.to_string(),
        })
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        // Dropped without stop: the task still sees the flag and releases.
        if self.task.is_some() {
            self.alive.store(false, Ordering::Release);
            self.wake.notify_one();
        }
    }
}

// =============================================================================
// Standard Engine Set
// =============================================================================

/// Builds the three engines in their default priority order.
pub fn standard_engines(
    camera: Arc<dyn Camera>,
    detector: Arc<dyn PlatformDetector>,
    module: Arc<dyn DecoderModule>,
    fallback_decoder: DecoderFactory,
    settings: &ScannerSettings,
) -> Vec<Arc<dyn BarcodeEngine>> {
    vec![
        Arc::new(NativeDetectorEngine::new(
            camera.clone(),
            detector,
            settings.poll_interval(),
        )),
        Arc::new(VisionDecoderEngine::new(camera.clone(), module)),
        Arc::new(FallbackEngine::new(camera, fallback_decoder)),
    ]
}
