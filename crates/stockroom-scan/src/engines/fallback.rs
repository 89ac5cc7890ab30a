//! The widely compatible decoder of last resort.
//!
//! Never probed: it reports available everywhere, and only a failed start
//! can demote it.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Cadence, DetectionLoop};
use crate::camera::{Camera, ScanTarget};
use crate::engine::{BarcodeEngine, DecoderFactory, DetectionSink, EngineHandle, EngineId};
use crate::error::ScanResult;

pub struct FallbackEngine {
    camera: Arc<dyn Camera>,
    decoder: DecoderFactory,
}

impl FallbackEngine {
    pub fn new(camera: Arc<dyn Camera>, decoder: DecoderFactory) -> Self {
        FallbackEngine { camera, decoder }
    }
}

#[async_trait]
impl BarcodeEngine for FallbackEngine {
    fn id(&self) -> EngineId {
        EngineId::Fallback
    }

    async fn probe(&self) -> ScanResult<()> {
        Ok(())
    }

    async fn start(
        &self,
        target: &ScanTarget,
        sink: DetectionSink,
    ) -> ScanResult<Box<dyn EngineHandle>> {
        let stream = self.camera.open(&target.constraints).await?;

        Ok(Box::new(DetectionLoop::spawn(
            stream,
            (self.decoder)(),
            sink,
            Cadence::EveryFrame,
            target.surface.clone(),
        )))
    }
}
