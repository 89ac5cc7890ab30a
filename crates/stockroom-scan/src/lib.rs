//! # stockroom-scan: Barcode Scanning Runtime for Stockroom
//!
//! This crate drives the camera scanner: it probes which decoding engines
//! work on the device, runs one scan session at a time with automatic
//! fallback, and resolves scanned codes against the product store.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scanning Architecture                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   ScanDesk (resolution flow)                     │  │
//! │  │                                                                  │  │
//! │  │  scan() ──► EAN-13 check ──► ProductLookup ──► ScanResolution    │  │
//! │  │  Every attempt lands in the bounded ScanLog                      │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ scan_once()                             │
//! │  ┌────────────────────────────▼─────────────────────────────────────┐  │
//! │  │                   Scanner (state machine)                        │  │
//! │  │                                                                  │  │
//! │  │  Idle → Starting → Active(engine) → Stopping → Idle              │  │
//! │  │  permission check, priority + fallback, one-shot detection       │  │
//! │  └──────────┬──────────────────────────────────┬────────────────────┘  │
//! │             │ probe_engines()                  │ start(target, sink)    │
//! │  ┌──────────▼─────────┐   ┌────────────────────▼────────────────────┐  │
//! │  │  Prober            │   │  Engines                                │  │
//! │  │                    │   │                                         │  │
//! │  │ isolated probes,   │   │ native   (platform detector, polled)    │  │
//! │  │ timeout + panic    │   │ vision   (decoder module, per frame)    │  │
//! │  │ capture            │   │ fallback (always available)             │  │
//! │  └────────────────────┘   └────────────────────┬────────────────────┘  │
//! │                                                │ owns stream            │
//! │                                   ┌────────────▼────────────┐          │
//! │                                   │  Camera / PreviewSurface │          │
//! │                                   └─────────────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! ### Scanning
//! - [`camera`] - Camera, stream and preview abstractions
//! - [`engine`] - Engine trait, identifiers, detection events
//! - [`engines`] - Native detector, vision decoder and fallback engines
//! - [`probe`] - Engine capability prober
//! - [`scanner`] - Scan session state machine
//!
//! ### Resolution
//! - [`resolver`] - `ProductLookup` and the `ScanDesk` flow
//! - [`catalog`] - In-memory product store
//! - [`log`] - Recent scan log
//!
//! ### Ambient
//! - [`config`] - TOML + environment configuration
//! - [`telemetry`] - Tracing subscriber setup
//! - [`error`] - Scan error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockroom_scan::{engines, ScanDesk, ScanTarget, Scanner, StockroomConfig};
//!
//! stockroom_scan::telemetry::init_tracing();
//! let config = StockroomConfig::load_or_default(None);
//!
//! let engines = engines::standard_engines(camera.clone(), detector, module, decoder, &config.scanner);
//! let scanner = Scanner::new(camera, engines, &config.scanner);
//! let desk = ScanDesk::new(scanner, store, &config.scanner, ScanTarget::new(surface, config.scanner.constraints()));
//!
//! match desk.scan().await? {
//!     ScanResolution::Found { product } => println!("{}: {}", product.code, product.stock),
//!     ScanResolution::NotFound { draft, .. } => show_new_product_form(draft),
//!     ScanResolution::Rejected { reason, .. } => println!("{}", reason),
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

// Scanning
pub mod camera;
pub mod engine;
pub mod engines;
pub mod probe;
pub mod scanner;

// Resolution
pub mod catalog;
pub mod log;
pub mod resolver;

// Ambient
pub mod config;
pub mod error;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use camera::{Camera, CameraStream, CaptureConstraints, Facing, Frame, PreviewSurface, ScanTarget};
pub use catalog::InMemoryCatalog;
pub use config::{ScannerSettings, StockroomConfig};
pub use engine::{
    BarcodeEngine, BarcodeFormat, DetectionEvent, DetectionSink, EngineHandle, EngineId,
    EngineStatus, FrameDecoder,
};
pub use error::{EngineFailure, ScanError, ScanResult};
pub use log::{ScanEvent, ScanLog, ScanOutcome};
pub use probe::{probe_engines, ProbeReport};
pub use resolver::{ProductLookup, ScanDesk, ScanResolution};
pub use scanner::{ScanSession, Scanner, ScannerState};
