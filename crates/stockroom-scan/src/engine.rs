//! # Barcode Engines
//!
//! The capability interface every scanning backend implements, and the
//! normalized detection event they all report through.
//!
//! ## Engine Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  BarcodeEngine                                                          │
//! │  ├── id()     → EngineId                                                │
//! │  ├── probe()  → Ok if usable here (no stream left open)                 │
//! │  └── start(target, sink) → Box<dyn EngineHandle>                        │
//! │                                                                         │
//! │  EngineHandle                                                           │
//! │  └── stop()   → releases stream, clears preview (idempotent)            │
//! │                                                                         │
//! │  DetectionSink                                                          │
//! │  └── emit(raw_text) → DetectionEvent { raw_text, engine, timestamp }    │
//! │      delivered at most once per session (oneshot)                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::trace;

use crate::camera::{Frame, ScanTarget};
use crate::error::{ScanError, ScanResult};

// =============================================================================
// Engine Identity
// =============================================================================

/// Identifies one scanning backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EngineId {
    /// On-device barcode detection API.
    #[serde(rename = "native")]
    NativeDetector,
    /// General-purpose computer-vision decoding library, loaded on demand.
    #[serde(rename = "vision")]
    VisionDecoder,
    /// Widely compatible decoder. Always assumed usable.
    #[serde(rename = "fallback")]
    Fallback,
}

/// Fixed engine priority used when no configuration overrides it.
pub const DEFAULT_PRIORITY: [EngineId; 3] = [
    EngineId::NativeDetector,
    EngineId::VisionDecoder,
    EngineId::Fallback,
];

impl EngineId {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineId::NativeDetector => "native",
            EngineId::VisionDecoder => "vision",
            EngineId::Fallback => "fallback",
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EngineId {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" | "native_detector" => Ok(EngineId::NativeDetector),
            "vision" | "vision_decoder" => Ok(EngineId::VisionDecoder),
            "fallback" => Ok(EngineId::Fallback),
            other => Err(ScanError::InvalidConfig(format!(
                "Unknown engine: '{}'. Valid options: native, vision, fallback",
                other
            ))),
        }
    }
}

/// Whether an engine can be used in this runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// Not probed yet.
    #[default]
    Unknown,
    Available,
    /// Probe or runtime start failed.
    Failed,
}

/// Symbologies a detector may report support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code128,
    QrCode,
}

// =============================================================================
// Detection
// =============================================================================

/// A decoded payload, identical in shape regardless of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub raw_text: String,
    pub engine: EngineId,
    pub timestamp: DateTime<Utc>,
}

/// Hands an engine's first decoded payload to the scanner.
///
/// Clones share one oneshot sender, so only the first `emit` across all
/// clones is delivered.
#[derive(Clone)]
pub struct DetectionSink {
    engine: EngineId,
    tx: Arc<Mutex<Option<oneshot::Sender<DetectionEvent>>>>,
}

impl DetectionSink {
    /// Creates a sink for `engine` and the receiver its event arrives on.
    pub fn channel(engine: EngineId) -> (Self, oneshot::Receiver<DetectionEvent>) {
        let (tx, rx) = oneshot::channel();
        (
            DetectionSink {
                engine,
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    pub fn engine(&self) -> EngineId {
        self.engine
    }

    /// Normalizes and delivers a decoded payload.
    ///
    /// Returns false if an event was already delivered or nobody listens.
    pub fn emit(&self, raw_text: impl Into<String>) -> bool {
        let sender = match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(sender) = sender else {
            trace!(engine = %self.engine, "Detection ignored, session already has a code");
            return false;
        };

        let event = DetectionEvent {
            raw_text: raw_text.into(),
            engine: self.engine,
            timestamp: Utc::now(),
        };
        sender.send(event).is_ok()
    }

    /// True once an event has been delivered.
    pub fn is_spent(&self) -> bool {
        match self.tx.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl fmt::Debug for DetectionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionSink")
            .field("engine", &self.engine)
            .field("spent", &self.is_spent())
            .finish()
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Decodes barcodes out of frames. One instance per session.
pub trait FrameDecoder: Send {
    /// `Ok(None)` when the frame holds no readable code.
    fn decode(&mut self, frame: &Frame) -> ScanResult<Option<String>>;
}

/// Builds a fresh decoder per session.
pub type DecoderFactory = Arc<dyn Fn() -> Box<dyn FrameDecoder> + Send + Sync>;

/// One scanning backend.
#[async_trait]
pub trait BarcodeEngine: Send + Sync {
    fn id(&self) -> EngineId;

    /// Checks the backend can run here. Must release anything it opens.
    async fn probe(&self) -> ScanResult<()>;

    /// Opens the camera, attaches the preview and begins decoding.
    ///
    /// The first decoded payload is reported through `sink`.
    async fn start(
        &self,
        target: &ScanTarget,
        sink: DetectionSink,
    ) -> ScanResult<Box<dyn EngineHandle>>;
}

/// A running engine. Owns the camera stream until stopped.
#[async_trait]
pub trait EngineHandle: Send {
    fn engine(&self) -> EngineId;

    /// Releases the stream and clears the preview. Safe to call twice.
    async fn stop(&mut self) -> ScanResult<()>;
}
