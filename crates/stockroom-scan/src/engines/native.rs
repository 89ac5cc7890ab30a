//! On-device barcode detection.
//!
//! Preferred whenever the platform exposes a detector that supports EAN-13.
//! The platform detector is polled on a timer rather than per frame.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Cadence, DetectionLoop};
use crate::camera::{Camera, ScanTarget};
use crate::engine::{
    BarcodeEngine, BarcodeFormat, DetectionSink, EngineHandle, EngineId, FrameDecoder,
};
use crate::error::{ScanError, ScanResult};

/// The platform's barcode detection facility.
pub trait PlatformDetector: Send + Sync {
    /// Whether the detection API exists at all.
    fn is_available(&self) -> bool;

    fn supported_formats(&self) -> ScanResult<Vec<BarcodeFormat>>;

    /// Instantiates a detector restricted to `formats`.
    fn create(&self, formats: &[BarcodeFormat]) -> ScanResult<Box<dyn FrameDecoder>>;
}

/// Formats requested from the platform detector.
const REQUESTED_FORMATS: [BarcodeFormat; 3] =
    [BarcodeFormat::Ean13, BarcodeFormat::Ean8, BarcodeFormat::UpcA];

pub struct NativeDetectorEngine {
    camera: Arc<dyn Camera>,
    detector: Arc<dyn PlatformDetector>,
    poll_interval: Duration,
}

impl NativeDetectorEngine {
    pub fn new(
        camera: Arc<dyn Camera>,
        detector: Arc<dyn PlatformDetector>,
        poll_interval: Duration,
    ) -> Self {
        NativeDetectorEngine {
            camera,
            detector,
            poll_interval,
        }
    }

    fn init_error(reason: impl Into<String>) -> ScanError {
        ScanError::EngineInit {
            engine: EngineId::NativeDetector,
            reason: reason.into(),
        }
    }

    /// Requested formats the platform actually supports. Always has EAN-13.
    fn usable_formats(&self) -> ScanResult<Vec<BarcodeFormat>> {
        if !self.detector.is_available() {
            return Err(Self::init_error("barcode detection API not present"));
        }

        let supported = self.detector.supported_formats()?;
        if !supported.contains(&BarcodeFormat::Ean13) {
            return Err(Self::init_error("detector does not support ean_13"));
        }

        Ok(REQUESTED_FORMATS
            .iter()
            .copied()
            .filter(|f| supported.contains(f))
            .collect())
    }
}

#[async_trait]
impl BarcodeEngine for NativeDetectorEngine {
    fn id(&self) -> EngineId {
        EngineId::NativeDetector
    }

    async fn probe(&self) -> ScanResult<()> {
        let formats = self.usable_formats()?;
        let _detector = self.detector.create(&formats)?;
        debug!(?formats, "Native detector usable");
        Ok(())
    }

    async fn start(
        &self,
        target: &ScanTarget,
        sink: DetectionSink,
    ) -> ScanResult<Box<dyn EngineHandle>> {
        let formats = self.usable_formats()?;
        let decoder = self.detector.create(&formats)?;
        let stream = self.camera.open(&target.constraints).await?;

        Ok(Box::new(DetectionLoop::spawn(
            stream,
            decoder,
            sink,
            Cadence::Interval(self.poll_interval),
            target.surface.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCamera, FakeDetector};

    fn engine(camera: &FakeCamera, detector: FakeDetector) -> NativeDetectorEngine {
        NativeDetectorEngine::new(
            Arc::new(camera.clone()),
            Arc::new(detector),
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_probe_requires_ean13() {
        let camera = FakeCamera::with_frames(&[]);

        assert!(engine(&camera, FakeDetector::supporting(&[BarcodeFormat::Ean13]))
            .probe()
            .await
            .is_ok());

        let err = engine(&camera, FakeDetector::supporting(&[BarcodeFormat::QrCode]))
            .probe()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ean_13"));

        assert!(engine(&camera, FakeDetector::absent()).probe().await.is_err());
        assert_eq!(camera.opened(), 0);
    }

    #[tokio::test]
    async fn test_start_polls_until_detection() {
        let camera = FakeCamera::with_frames(&["", "4006381333931"]);
        let native = engine(&camera, FakeDetector::supporting(&[BarcodeFormat::Ean13]));
        let (sink, rx) = DetectionSink::channel(EngineId::NativeDetector);

        let mut handle = native
            .start(&ScanTarget::headless(Default::default()), sink)
            .await
            .unwrap();

        let event = rx.await.unwrap();
        assert_eq!(event.raw_text, "4006381333931");
        assert_eq!(event.engine, EngineId::NativeDetector);

        handle.stop().await.unwrap();
        assert_eq!(camera.released(), 1);
    }

    #[tokio::test]
    async fn test_start_fails_without_opening_stream() {
        let camera = FakeCamera::with_frames(&[]);
        let native = engine(&camera, FakeDetector::absent());
        let (sink, _rx) = DetectionSink::channel(EngineId::NativeDetector);

        assert!(native
            .start(&ScanTarget::headless(Default::default()), sink)
            .await
            .is_err());
        assert_eq!(camera.opened(), 0);
    }
}
