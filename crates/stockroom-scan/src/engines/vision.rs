//! Computer-vision decoding through a module loaded on demand.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Cadence, DetectionLoop};
use crate::camera::{Camera, ScanTarget};
use crate::engine::{BarcodeEngine, DetectionSink, EngineHandle, EngineId, FrameDecoder};
use crate::error::ScanResult;

/// A decoding library that has to be loaded before use.
#[async_trait]
pub trait DecoderModule: Send + Sync {
    fn name(&self) -> &str;

    /// Loads (or reuses) the module and returns a decoder instance.
    async fn load(&self) -> ScanResult<Box<dyn FrameDecoder>>;
}

pub struct VisionDecoderEngine {
    camera: Arc<dyn Camera>,
    module: Arc<dyn DecoderModule>,
}

impl VisionDecoderEngine {
    pub fn new(camera: Arc<dyn Camera>, module: Arc<dyn DecoderModule>) -> Self {
        VisionDecoderEngine { camera, module }
    }
}

#[async_trait]
impl BarcodeEngine for VisionDecoderEngine {
    fn id(&self) -> EngineId {
        EngineId::VisionDecoder
    }

    async fn probe(&self) -> ScanResult<()> {
        let _decoder = self.module.load().await?;
        debug!(module = self.module.name(), "Vision module loaded");
        Ok(())
    }

    async fn start(
        &self,
        target: &ScanTarget,
        sink: DetectionSink,
    ) -> ScanResult<Box<dyn EngineHandle>> {
        let decoder = self.module.load().await?;
        let stream = self.camera.open(&target.constraints).await?;

        Ok(Box::new(DetectionLoop::spawn(
            stream,
            decoder,
            sink,
            Cadence::EveryFrame,
            target.surface.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCamera, FakeModule};

    #[tokio::test]
    async fn test_probe_reports_load_failure() {
        let camera = FakeCamera::with_frames(&[]);
        let broken = VisionDecoderEngine::new(Arc::new(camera.clone()), Arc::new(FakeModule::broken()));
        assert!(broken.probe().await.is_err());

        let ok = VisionDecoderEngine::new(Arc::new(camera.clone()), Arc::new(FakeModule::working()));
        assert!(ok.probe().await.is_ok());
        assert_eq!(camera.opened(), 0);
    }

    #[tokio::test]
    async fn test_start_decodes_frames() {
        let camera = FakeCamera::with_frames(&["", "7790001234568"]);
        let vision = VisionDecoderEngine::new(Arc::new(camera.clone()), Arc::new(FakeModule::working()));
        let (sink, rx) = DetectionSink::channel(EngineId::VisionDecoder);

        let mut handle = vision
            .start(&ScanTarget::headless(Default::default()), sink)
            .await
            .unwrap();

        assert_eq!(rx.await.unwrap().raw_text, "7790001234568");
        handle.stop().await.unwrap();
        assert_eq!(camera.released(), 1);
    }
}
