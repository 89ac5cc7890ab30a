//! # Scan Resolution
//!
//! Turns a scanned code into a product, or into a draft for a new one.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DetectionEvent / typed code                                            │
//! │       │ trim                                                            │
//! │       ▼                                                                 │
//! │  EAN-13 valid? ──no (scanner path, require_ean13)──► Rejected           │
//! │       │ yes                                                             │
//! │       ▼                                                                 │
//! │  find_by_barcode ──miss──► find_by_code ──miss──► NotFound { draft }    │
//! │       │ hit                     │ hit                                   │
//! │       ▼                         ▼                                       │
//! │     Found                     Found                                     │
//! │                                                                         │
//! │  Every attempt is appended to the bounded ScanLog.                      │
//! │  A lookup failure is logged as an error event and returned.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use stockroom_core::{is_valid_ean13, Product, ProductDraft};

use crate::camera::ScanTarget;
use crate::config::ScannerSettings;
use crate::engine::{DetectionEvent, EngineId};
use crate::error::ScanResult;
use crate::log::{ScanEvent, ScanLog};
use crate::scanner::Scanner;

/// Read access to the product store.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn find_by_barcode(&self, barcode: &str) -> ScanResult<Option<Product>>;

    async fn find_by_code(&self, code: &str) -> ScanResult<Option<Product>>;
}

/// What a scanned or typed code resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanResolution {
    Found { product: Product },
    /// No product matched. The draft is pre-filled from the code.
    NotFound { barcode: String, draft: ProductDraft },
    /// The code failed the EAN-13 checksum.
    Rejected { barcode: String, reason: String },
}

impl ScanResolution {
    pub fn barcode(&self) -> &str {
        match self {
            ScanResolution::Found { product } => product.barcode.as_deref().unwrap_or(&product.code),
            ScanResolution::NotFound { barcode, .. } | ScanResolution::Rejected { barcode, .. } => {
                barcode
            }
        }
    }
}

/// The scanning counter: scanner, store lookups and the recent-scan log.
pub struct ScanDesk {
    scanner: Scanner,
    lookup: Arc<dyn ProductLookup>,
    log: Mutex<ScanLog>,
    require_ean13: bool,
    target: ScanTarget,
}

impl ScanDesk {
    pub fn new(
        scanner: Scanner,
        lookup: Arc<dyn ProductLookup>,
        settings: &ScannerSettings,
        target: ScanTarget,
    ) -> Self {
        ScanDesk {
            scanner,
            lookup,
            log: Mutex::new(ScanLog::new(settings.scan_log_capacity)),
            require_ean13: settings.require_ean13,
            target,
        }
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Scans one code with the camera and resolves it.
    ///
    /// A scan that fails before any code is read is logged with an empty
    /// barcode.
    pub async fn scan(&self) -> ScanResult<ScanResolution> {
        let event = match self.scanner.scan_once(&self.target).await {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Scan failed before a code was read");
                self.record(ScanEvent::error("", None, e.to_string())).await;
                return Err(e);
            }
        };
        self.resolve_detection(event).await
    }

    /// Resolves a code reported by an engine.
    pub async fn resolve_detection(&self, event: DetectionEvent) -> ScanResult<ScanResolution> {
        self.resolve(&event.raw_text, Some(event.engine), self.require_ean13)
            .await
    }

    /// Resolves a code typed in by hand. Any symbology is accepted.
    pub async fn resolve_manual(&self, code: &str) -> ScanResult<ScanResolution> {
        self.resolve(code, None, false).await
    }

    /// Recent attempts, newest first.
    pub async fn recent_scans(&self) -> Vec<ScanEvent> {
        self.log.lock().await.recent()
    }

    async fn resolve(
        &self,
        raw: &str,
        engine: Option<EngineId>,
        enforce_ean13: bool,
    ) -> ScanResult<ScanResolution> {
        let barcode = raw.trim();

        if enforce_ean13 && !is_valid_ean13(barcode) {
            let reason = "not a valid EAN-13 code".to_string();
            warn!(barcode = %barcode, "Rejected scanned code");
            self.record(ScanEvent::error(barcode, engine, reason.clone()))
                .await;
            return Ok(ScanResolution::Rejected {
                barcode: barcode.to_string(),
                reason,
            });
        }

        match self.find(barcode).await {
            Ok(Some(product)) => {
                info!(barcode = %barcode, code = %product.code, "Product found");
                self.record(ScanEvent::found(barcode, product.clone(), engine))
                    .await;
                Ok(ScanResolution::Found { product })
            }
            Ok(None) => {
                debug!(barcode = %barcode, "No product for code");
                self.record(ScanEvent::not_found(barcode, engine)).await;
                Ok(ScanResolution::NotFound {
                    barcode: barcode.to_string(),
                    draft: ProductDraft::from_scan(barcode),
                })
            }
            Err(e) => {
                warn!(barcode = %barcode, error = %e, "Product lookup failed");
                self.record(ScanEvent::error(barcode, engine, e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn find(&self, barcode: &str) -> ScanResult<Option<Product>> {
        if let Some(product) = self.lookup.find_by_barcode(barcode).await? {
            return Ok(Some(product));
        }
        self.lookup.find_by_code(barcode).await
    }

    async fn record(&self, event: ScanEvent) {
        self.log.lock().await.push(event);
    }
}
