//! # Camera Abstraction
//!
//! The runtime-facing side of scanning: permission, streams, frames and the
//! preview surface a stream is attached to.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Camera ──open()──► Box<dyn CameraStream>                               │
//! │                          │  moved into the active engine's              │
//! │                          │  detection task (sole owner)                 │
//! │                          ▼                                              │
//! │                     next_frame() ... release()                          │
//! │                                                                         │
//! │  PreviewSurface: attach(stream_id) on start, clear() on stop            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScanResult;

/// Which camera to prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Rear camera, the one pointed at products.
    #[default]
    Environment,
    /// Front camera.
    User,
}

/// Requested capture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub facing: Facing,
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        CaptureConstraints {
            facing: Facing::Environment,
            width: 1280,
            height: 720,
        }
    }
}

/// A grayscale frame captured from a stream.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub luma: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(width: u32, height: u32, luma: Vec<u8>) -> Self {
        Frame {
            width,
            height,
            luma,
            captured_at: Utc::now(),
        }
    }
}

/// Access to the device camera.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Requests (or confirms) permission to use the camera.
    ///
    /// Errors with `PermissionDenied` or `CameraUnsupported`.
    async fn check_permission(&self) -> ScanResult<()>;

    /// Opens a stream matching `constraints`.
    async fn open(&self, constraints: &CaptureConstraints) -> ScanResult<Box<dyn CameraStream>>;
}

/// An open camera stream. Exclusively owned by one engine at a time.
#[async_trait]
pub trait CameraStream: Send {
    /// Identifier used to attach the stream to a preview surface.
    fn id(&self) -> &str;

    /// Waits for the next frame. `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<Frame>;

    /// Stops all tracks. Must be safe to call more than once.
    fn release(&mut self);
}

/// Where the live preview is rendered.
pub trait PreviewSurface: Send + Sync {
    fn attach(&self, stream_id: &str);
    fn clear(&self);
}

/// A surface that renders nothing. Used for headless scanning.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSurface;

impl PreviewSurface for HeadlessSurface {
    fn attach(&self, _stream_id: &str) {}
    fn clear(&self) {}
}

/// Everything an engine needs to start capturing.
#[derive(Clone)]
pub struct ScanTarget {
    pub surface: Arc<dyn PreviewSurface>,
    pub constraints: CaptureConstraints,
}

impl ScanTarget {
    pub fn new(surface: Arc<dyn PreviewSurface>, constraints: CaptureConstraints) -> Self {
        ScanTarget {
            surface,
            constraints,
        }
    }

    /// A target without a preview.
    pub fn headless(constraints: CaptureConstraints) -> Self {
        ScanTarget::new(Arc::new(HeadlessSurface), constraints)
    }
}

impl std::fmt::Debug for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanTarget")
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}
