//! Fakes for the camera runtime and the engines.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::camera::{Camera, CameraStream, CaptureConstraints, Frame, PreviewSurface, ScanTarget};
use crate::engine::{
    BarcodeEngine, BarcodeFormat, DecoderFactory, DetectionSink, EngineHandle, EngineId,
    FrameDecoder,
};
use crate::engines::{DecoderModule, PlatformDetector};
use crate::error::{ScanError, ScanResult};
use crate::scanner::{Scanner, ScannerState};

// =============================================================================
// Camera
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permission {
    Granted,
    Denied,
    Unsupported,
}

/// A camera whose streams replay scripted frames, then idle forever.
///
/// Each frame's luma bytes are the UTF-8 text a decoder should find; an empty
/// string is a frame without a code.
#[derive(Clone)]
pub(crate) struct FakeCamera {
    frames: Arc<Vec<String>>,
    permission: Permission,
    fail_open: bool,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub(crate) fn with_frames(frames: &[&str]) -> Self {
        FakeCamera {
            frames: Arc::new(frames.iter().map(|f| f.to_string()).collect()),
            permission: Permission::Granted,
            fail_open: false,
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn denied() -> Self {
        FakeCamera {
            permission: Permission::Denied,
            ..Self::with_frames(&[])
        }
    }

    pub(crate) fn unsupported() -> Self {
        FakeCamera {
            permission: Permission::Unsupported,
            ..Self::with_frames(&[])
        }
    }

    pub(crate) fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub(crate) fn open_stream(&self) -> Box<dyn CameraStream> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeStream {
            id: format!("fake-stream-{n}"),
            frames: self.frames.iter().cloned().collect(),
            released: false,
            release_count: self.released.clone(),
        })
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn check_permission(&self) -> ScanResult<()> {
        match self.permission {
            Permission::Granted => Ok(()),
            Permission::Denied => Err(ScanError::PermissionDenied("user dismissed prompt".into())),
            Permission::Unsupported => Err(ScanError::CameraUnsupported),
        }
    }

    async fn open(&self, _constraints: &CaptureConstraints) -> ScanResult<Box<dyn CameraStream>> {
        if self.fail_open {
            return Err(ScanError::StreamUnavailable("device busy".into()));
        }
        Ok(self.open_stream())
    }
}

struct FakeStream {
    id: String,
    frames: VecDeque<String>,
    released: bool,
    release_count: Arc<AtomicUsize>,
}

#[async_trait]
impl CameraStream for FakeStream {
    fn id(&self) -> &str {
        &self.id
    }

    async fn next_frame(&mut self) -> Option<Frame> {
        match self.frames.pop_front() {
            Some(text) => Some(Frame::new(1, 1, text.into_bytes())),
            None => std::future::pending().await,
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.release_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingSurface {
    attached: AtomicUsize,
    cleared: AtomicUsize,
}

impl RecordingSurface {
    pub(crate) fn attached(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    pub(crate) fn cleared(&self) -> usize {
        self.cleared.load(Ordering::SeqCst)
    }
}

impl PreviewSurface for RecordingSurface {
    fn attach(&self, _stream_id: &str) {
        self.attached.fetch_add(1, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Decoders
// =============================================================================

/// Reads a frame's luma bytes back as text.
pub(crate) struct TextDecoder;

impl FrameDecoder for TextDecoder {
    fn decode(&mut self, frame: &Frame) -> ScanResult<Option<String>> {
        if frame.luma.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&frame.luma).into_owned()))
    }
}

pub(crate) fn text_decoder_factory() -> DecoderFactory {
    Arc::new(|| Box::new(TextDecoder) as Box<dyn FrameDecoder>)
}

pub(crate) struct FakeDetector {
    available: bool,
    formats: Vec<BarcodeFormat>,
}

impl FakeDetector {
    pub(crate) fn supporting(formats: &[BarcodeFormat]) -> Self {
        FakeDetector {
            available: true,
            formats: formats.to_vec(),
        }
    }

    pub(crate) fn absent() -> Self {
        FakeDetector {
            available: false,
            formats: Vec::new(),
        }
    }
}

impl PlatformDetector for FakeDetector {
    fn is_available(&self) -> bool {
        self.available
    }

    fn supported_formats(&self) -> ScanResult<Vec<BarcodeFormat>> {
        Ok(self.formats.clone())
    }

    fn create(&self, _formats: &[BarcodeFormat]) -> ScanResult<Box<dyn FrameDecoder>> {
        Ok(Box::new(TextDecoder))
    }
}

pub(crate) struct FakeModule {
    loads: bool,
}

impl FakeModule {
    pub(crate) fn working() -> Self {
        FakeModule { loads: true }
    }

    pub(crate) fn broken() -> Self {
        FakeModule { loads: false }
    }
}

#[async_trait]
impl DecoderModule for FakeModule {
    fn name(&self) -> &str {
        "fake-vision"
    }

    async fn load(&self) -> ScanResult<Box<dyn FrameDecoder>> {
        if !self.loads {
            return Err(ScanError::EngineInit {
                engine: EngineId::VisionDecoder,
                reason: "module failed to load".into(),
            });
        }
        Ok(Box::new(TextDecoder))
    }
}

// =============================================================================
// Engines
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeBehavior {
    Succeed,
    Fail,
    Panic,
    Hang,
}

/// An engine driven by the test: `detect` plays the role of the camera.
pub(crate) struct FakeEngine {
    id: EngineId,
    probe: ProbeBehavior,
    start_failures: AtomicUsize,
    gate: Option<Arc<Notify>>,
    starts: AtomicUsize,
    probes: AtomicUsize,
    stops: Arc<AtomicUsize>,
    sink: Arc<Mutex<Option<DetectionSink>>>,
}

impl FakeEngine {
    pub(crate) fn new(id: EngineId) -> Self {
        FakeEngine {
            id,
            probe: ProbeBehavior::Succeed,
            start_failures: AtomicUsize::new(0),
            gate: None,
            starts: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            stops: Arc::new(AtomicUsize::new(0)),
            sink: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn failing_probe(mut self) -> Self {
        self.probe = ProbeBehavior::Fail;
        self
    }

    pub(crate) fn panicking_probe(mut self) -> Self {
        self.probe = ProbeBehavior::Panic;
        self
    }

    pub(crate) fn hanging_probe(mut self) -> Self {
        self.probe = ProbeBehavior::Hang;
        self
    }

    pub(crate) fn failing_start(self) -> Self {
        self.failing_starts(usize::MAX)
    }

    /// The first `count` starts fail, later ones succeed.
    pub(crate) fn failing_starts(self, count: usize) -> Self {
        self.start_failures.store(count, Ordering::SeqCst);
        self
    }

    /// `start` waits for `gate` before returning.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Emits through the running session's sink. False if none is running.
    pub(crate) fn detect(&self, text: &str) -> bool {
        let sink = self.sink.lock().unwrap().clone();
        sink.map(|s| s.emit(text)).unwrap_or(false)
    }
}

#[async_trait]
impl BarcodeEngine for FakeEngine {
    fn id(&self) -> EngineId {
        self.id
    }

    async fn probe(&self) -> ScanResult<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.probe {
            ProbeBehavior::Succeed => Ok(()),
            ProbeBehavior::Fail => Err(ScanError::EngineInit {
                engine: self.id,
                reason: "not supported here".into(),
            }),
            ProbeBehavior::Panic => panic!("probe exploded"),
            ProbeBehavior::Hang => std::future::pending().await,
        }
    }

    async fn start(
        &self,
        _target: &ScanTarget,
        sink: DetectionSink,
    ) -> ScanResult<Box<dyn EngineHandle>> {
        self.starts.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let failing = self
            .start_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ScanError::EngineInit {
                engine: self.id,
                reason: "camera stream refused".into(),
            });
        }

        *self.sink.lock().unwrap() = Some(sink);
        Ok(Box::new(FakeHandle {
            engine: self.id,
            sink: self.sink.clone(),
            stops: self.stops.clone(),
            stopped: false,
        }))
    }
}

struct FakeHandle {
    engine: EngineId,
    sink: Arc<Mutex<Option<DetectionSink>>>,
    stops: Arc<AtomicUsize>,
    stopped: bool,
}

#[async_trait]
impl EngineHandle for FakeHandle {
    fn engine(&self) -> EngineId {
        self.engine
    }

    async fn stop(&mut self) -> ScanResult<()> {
        if !self.stopped {
            self.stopped = true;
            self.sink.lock().unwrap().take();
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

pub(crate) fn as_engines(engines: &[&Arc<FakeEngine>]) -> Vec<Arc<dyn BarcodeEngine>> {
    engines
        .iter()
        .map(|e| Arc::clone(*e) as Arc<dyn BarcodeEngine>)
        .collect()
}

/// Waits for background session teardown to reach `Idle`.
pub(crate) async fn settle(scanner: &Scanner) {
    for _ in 0..100 {
        if scanner.state().await == ScannerState::Idle {
            return;
        }
        tokio::task::yield_now().await;
    }
}
