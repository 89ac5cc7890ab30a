//! # Scanner State Machine
//!
//! Owns the one active scanning session: picks an engine, falls back on
//! failure, and stops itself after the first decoded code.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │          start()                 engine Ok                              │
//! │   Idle ───────────► Starting ──────────────► Active(engine)             │
//! │    ▲                  │  │  │                    │                      │
//! │    │   all failed     │  │  │ engine Err         │ detection / stop()   │
//! │    ├──────────────────┘  │  └──► Starting(next)  ▼                      │
//! │    │                     │ stop()             Stopping                  │
//! │    │                     └───────────────────►   │                      │
//! │    │   handle released / pending start returned  │                      │
//! │    └─────────────────────────────────────────────┘                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `start` is rejected with `AlreadyActive` in every state but `Idle`, so a
//! cancelled start keeps the scanner in `Stopping` until its engine call
//! returns and any late handle is released.
//!
//! ## Locking
//! `Inner` sits behind a tokio mutex that is never held across a permission
//! check, probe, engine start or engine stop. Every `start` takes a new
//! generation number; `stop` bumps it, which is how an in-flight start
//! learns it was cancelled.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::camera::{Camera, ScanTarget};
use crate::config::ScannerSettings;
use crate::engine::{BarcodeEngine, DetectionEvent, DetectionSink, EngineHandle, EngineId};
use crate::error::{EngineFailure, ScanError, ScanResult};
use crate::probe::{probe_engines, ProbeReport};

// =============================================================================
// State
// =============================================================================

/// Observable scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "engine", rename_all = "snake_case")]
pub enum ScannerState {
    Idle,
    Starting,
    Active(EngineId),
    Stopping,
}

impl fmt::Display for ScannerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannerState::Idle => write!(f, "idle"),
            ScannerState::Starting => write!(f, "starting"),
            ScannerState::Active(engine) => write!(f, "active ({})", engine),
            ScannerState::Stopping => write!(f, "stopping"),
        }
    }
}

/// The engine currently holding the camera, if any.
enum ActiveScanner {
    None,
    Active {
        engine: EngineId,
        handle: Box<dyn EngineHandle>,
    },
}

impl ActiveScanner {
    fn take(&mut self) -> ActiveScanner {
        std::mem::replace(self, ActiveScanner::None)
    }
}

struct Inner {
    state: ScannerState,
    active: ActiveScanner,
    report: Option<ProbeReport>,
    generation: u64,
    session_id: Option<Uuid>,
    /// Generation of a start that `stop` cancelled before it returned.
    cancelled_start: Option<u64>,
}

impl Inner {
    fn settle_cancelled(&mut self, generation: u64) {
        if self.cancelled_start == Some(generation) {
            self.cancelled_start = None;
            if self.state == ScannerState::Stopping {
                self.state = ScannerState::Idle;
            }
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// A started scan. Resolves with the first decoded code.
#[derive(Debug)]
pub struct ScanSession {
    pub id: Uuid,
    pub engine: EngineId,
    detection: oneshot::Receiver<ScanResult<DetectionEvent>>,
}

impl ScanSession {
    /// Waits for the session's code.
    ///
    /// Fails with `Cancelled` if the scanner was stopped first.
    pub async fn detection(self) -> ScanResult<DetectionEvent> {
        self.detection.await.unwrap_or(Err(ScanError::Cancelled))
    }
}

// =============================================================================
// Scanner
// =============================================================================

/// Handle to the scanner. Clones share one state machine.
#[derive(Clone)]
pub struct Scanner {
    camera: Arc<dyn Camera>,
    engines: Arc<Vec<Arc<dyn BarcodeEngine>>>,
    priority: Arc<Vec<EngineId>>,
    probe_timeout: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl Scanner {
    pub fn new(
        camera: Arc<dyn Camera>,
        engines: Vec<Arc<dyn BarcodeEngine>>,
        settings: &ScannerSettings,
    ) -> Self {
        Scanner {
            camera,
            engines: Arc::new(engines),
            priority: Arc::new(settings.engine_priority.clone()),
            probe_timeout: settings.probe_timeout(),
            inner: Arc::new(Mutex::new(Inner {
                state: ScannerState::Idle,
                active: ActiveScanner::None,
                report: None,
                generation: 0,
                session_id: None,
                cancelled_start: None,
            })),
        }
    }

    pub async fn state(&self) -> ScannerState {
        self.inner.lock().await.state
    }

    /// Id of the running session, if one is active.
    pub async fn session_id(&self) -> Option<Uuid> {
        self.inner.lock().await.session_id
    }

    /// The current probe report, if engines were probed.
    pub async fn engine_status(&self) -> Option<ProbeReport> {
        self.inner.lock().await.report.clone()
    }

    /// Probes engines unless a report already exists.
    pub async fn probe(&self) -> ProbeReport {
        if let Some(report) = self.engine_status().await {
            return report;
        }
        self.reprobe().await
    }

    /// Probes every engine again and replaces the report.
    pub async fn reprobe(&self) -> ProbeReport {
        let report = probe_engines(&self.engines, self.probe_timeout).await;
        self.inner.lock().await.report = Some(report.clone());
        report
    }

    /// Starts a scan session on the best available engine.
    pub async fn start(&self, target: &ScanTarget) -> ScanResult<ScanSession> {
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.state != ScannerState::Idle {
                return Err(ScanError::AlreadyActive);
            }
            inner.state = ScannerState::Starting;
            inner.generation += 1;
            inner.generation
        };

        let session_id = Uuid::new_v4();
        info!(%session_id, "Starting scan session");

        // Detached so a dropped caller still settles the state machine.
        let scanner = self.clone();
        let target = target.clone();
        let attempt =
            tokio::spawn(async move { scanner.run_start(generation, session_id, &target).await });

        match attempt.await {
            Ok(result) => result,
            Err(e) => {
                error!(%session_id, error = %e, "Scan start task failed");
                self.abandon_start(generation).await;
                Err(ScanError::ChannelClosed(format!("scan start aborted: {e}")))
            }
        }
    }

    /// Starts a session and waits for its code.
    pub async fn scan_once(&self, target: &ScanTarget) -> ScanResult<DetectionEvent> {
        self.start(target).await?.detection().await
    }

    /// Stops the active session or cancels a pending start.
    ///
    /// Never fails. Safe to call in any state.
    pub async fn stop(&self) {
        self.stop_generation(None).await;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn run_start(
        &self,
        generation: u64,
        session_id: Uuid,
        target: &ScanTarget,
    ) -> ScanResult<ScanSession> {
        if let Err(e) = self.camera.check_permission().await {
            warn!(%session_id, error = %e, "Camera unavailable");
            self.abandon_start(generation).await;
            return Err(e);
        }

        let candidates = self.probe().await.candidates(&self.priority);
        debug!(%session_id, ?candidates, "Engine candidates");

        let mut attempts = Vec::new();
        for engine_id in candidates {
            if self.is_cancelled(generation).await {
                info!(%session_id, "Scan cancelled during start");
                return Err(self.settle_cancelled(generation).await);
            }

            let Some(engine) = self.engines.iter().find(|e| e.id() == engine_id) else {
                continue;
            };

            let (sink, detection) = DetectionSink::channel(engine_id);
            debug!(%session_id, engine = %engine_id, "Trying engine");

            match engine.start(target, sink).await {
                Ok(handle) => {
                    return self
                        .activate(generation, session_id, engine_id, handle, detection)
                        .await;
                }
                Err(e) => {
                    warn!(%session_id, engine = %engine_id, error = %e, "Engine failed to start");
                    self.mark_failed(engine_id).await;
                    attempts.push(EngineFailure {
                        engine: engine_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !self.abandon_start(generation).await {
            info!(%session_id, "Scan cancelled during start");
            return Err(ScanError::Cancelled);
        }

        let err = ScanError::AllEnginesExhausted { attempts };
        error!(%session_id, error = %err, "No engine could be started");
        Err(err)
    }

    async fn is_cancelled(&self, generation: u64) -> bool {
        let inner = self.inner.lock().await;
        inner.generation != generation || inner.state != ScannerState::Starting
    }

    async fn mark_failed(&self, engine: EngineId) {
        if let Some(report) = self.inner.lock().await.report.as_mut() {
            report.mark_failed(engine);
        }
    }

    /// Returns to `Idle` if this start still owns the state machine.
    ///
    /// False if the start was cancelled; the cancellation is settled either way.
    async fn abandon_start(&self, generation: u64) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.generation == generation && inner.state == ScannerState::Starting {
            inner.state = ScannerState::Idle;
            true
        } else {
            inner.settle_cancelled(generation);
            false
        }
    }

    /// Ends the `Stopping` phase of a cancelled start.
    async fn settle_cancelled(&self, generation: u64) -> ScanError {
        self.inner.lock().await.settle_cancelled(generation);
        ScanError::Cancelled
    }

    async fn activate(
        &self,
        generation: u64,
        session_id: Uuid,
        engine: EngineId,
        mut handle: Box<dyn EngineHandle>,
        detection: oneshot::Receiver<DetectionEvent>,
    ) -> ScanResult<ScanSession> {
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation || inner.state != ScannerState::Starting {
                drop(inner);
                info!(%session_id, engine = %engine, "Scan cancelled, releasing late engine");
                if let Err(e) = handle.stop().await {
                    warn!(engine = %engine, error = %e, "Failed to stop engine");
                }
                return Err(self.settle_cancelled(generation).await);
            }

            inner.state = ScannerState::Active(engine);
            inner.active = ActiveScanner::Active { engine, handle };
            inner.session_id = Some(session_id);
        }

        info!(%session_id, engine = %engine, "Scan session active");

        let (tx, rx) = oneshot::channel();
        let scanner = self.clone();
        tokio::spawn(async move {
            let outcome = match detection.await {
                Ok(event) => {
                    debug!(%session_id, engine = %event.engine, "Code detected, ending session");
                    Ok(event)
                }
                Err(_) => {
                    if scanner.is_current(generation).await {
                        Err(ScanError::ChannelClosed(
                            "camera stream ended before a code was detected".into(),
                        ))
                    } else {
                        Err(ScanError::Cancelled)
                    }
                }
            };
            scanner.stop_generation(Some(generation)).await;
            let _ = tx.send(outcome);
        });

        Ok(ScanSession {
            id: session_id,
            engine,
            detection: rx,
        })
    }

    async fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().await.generation == generation
    }

    /// Stops the session. With `Some(generation)`, only if it is still that
    /// session.
    async fn stop_generation(&self, expected: Option<u64>) {
        let taken = {
            let mut inner = self.inner.lock().await;
            if expected.is_some_and(|g| g != inner.generation) {
                return;
            }

            match inner.state {
                ScannerState::Idle | ScannerState::Stopping => {
                    debug!("Stop requested with no running session");
                    return;
                }
                ScannerState::Starting => {
                    // Held until the pending engine start returns.
                    inner.cancelled_start = Some(inner.generation);
                    inner.generation += 1;
                    inner.state = ScannerState::Stopping;
                    info!("Cancelling scan start");
                    return;
                }
                ScannerState::Active(_) => {
                    inner.generation += 1;
                    inner.state = ScannerState::Stopping;
                    inner.session_id = None;
                    inner.active.take()
                }
            }
        };

        if let ActiveScanner::Active { engine, mut handle } = taken {
            match handle.stop().await {
                Ok(()) => info!(engine = %engine, "Scan session stopped"),
                Err(e) => warn!(engine = %engine, error = %e, "Error while stopping engine"),
            }
        }

        let mut inner = self.inner.lock().await;
        if inner.state == ScannerState::Stopping {
            inner.state = ScannerState::Idle;
        }
    }
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("engines", &self.engines.iter().map(|e| e.id()).collect::<Vec<_>>())
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineStatus;
    use crate::testing::{as_engines, settle, FakeCamera, FakeEngine};
    use tokio::sync::Notify;

    fn target() -> ScanTarget {
        ScanTarget::headless(Default::default())
    }

    fn scanner(camera: FakeCamera, engines: &[&Arc<FakeEngine>]) -> Scanner {
        Scanner::new(Arc::new(camera), as_engines(engines), &ScannerSettings::default())
    }

    #[tokio::test]
    async fn test_fallback_only_start_attempts_one_engine() {
        let native = Arc::new(FakeEngine::new(EngineId::NativeDetector).failing_probe());
        let vision = Arc::new(FakeEngine::new(EngineId::VisionDecoder).failing_probe());
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&native, &vision, &fallback]);

        let session = scanner.start(&target()).await.unwrap();

        assert_eq!(session.engine, EngineId::Fallback);
        assert_eq!(native.starts(), 0);
        assert_eq!(vision.starts(), 0);
        assert_eq!(fallback.starts(), 1);
        assert_eq!(scanner.state().await, ScannerState::Active(EngineId::Fallback));
    }

    #[tokio::test]
    async fn test_priority_wins_over_detection_order() {
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback));
        let native = Arc::new(FakeEngine::new(EngineId::NativeDetector));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&fallback, &native]);

        let session = scanner.start(&target()).await.unwrap();
        assert_eq!(session.engine, EngineId::NativeDetector);
        assert_eq!(fallback.starts(), 0);
    }

    #[tokio::test]
    async fn test_stop_twice_is_a_noop() {
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&fallback]);

        scanner.stop().await;
        let _session = scanner.start(&target()).await.unwrap();

        scanner.stop().await;
        scanner.stop().await;

        assert_eq!(fallback.stops(), 1);
        assert_eq!(scanner.state().await, ScannerState::Idle);
        assert_eq!(scanner.session_id().await, None);
    }

    #[tokio::test]
    async fn test_permission_denied_attempts_no_engine() {
        let native = Arc::new(FakeEngine::new(EngineId::NativeDetector));
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback));
        let scanner = scanner(FakeCamera::denied(), &[&native, &fallback]);

        let err = scanner.start(&target()).await.unwrap_err();

        assert!(matches!(err, ScanError::PermissionDenied(_)));
        assert_eq!(native.starts() + fallback.starts(), 0);
        assert_eq!(native.probes(), 0);
        assert_eq!(scanner.state().await, ScannerState::Idle);

        let unsupported = Scanner::new(
            Arc::new(FakeCamera::unsupported()),
            as_engines(&[&fallback]),
            &ScannerSettings::default(),
        );
        assert!(matches!(
            unsupported.start(&target()).await.unwrap_err(),
            ScanError::CameraUnsupported
        ));
    }

    #[tokio::test]
    async fn test_start_falls_back_and_demotes() {
        let native = Arc::new(FakeEngine::new(EngineId::NativeDetector).failing_start());
        let vision = Arc::new(FakeEngine::new(EngineId::VisionDecoder));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&native, &vision]);

        let session = scanner.start(&target()).await.unwrap();
        assert_eq!(session.engine, EngineId::VisionDecoder);

        let report = scanner.engine_status().await.unwrap();
        assert_eq!(report.status_of(EngineId::NativeDetector), EngineStatus::Failed);
        assert!(!report.is_usable(EngineId::NativeDetector));

        scanner.stop().await;
        let report = scanner.reprobe().await;
        assert!(report.is_usable(EngineId::NativeDetector));
    }

    #[tokio::test]
    async fn test_exhaustion_summarizes_attempts() {
        let native = Arc::new(FakeEngine::new(EngineId::NativeDetector).failing_start());
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback).failing_start());
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&native, &fallback]);

        let err = scanner.start(&target()).await.unwrap_err();

        match &err {
            ScanError::AllEnginesExhausted { attempts } => {
                let engines: Vec<_> = attempts.iter().map(|a| a.engine).collect();
                assert_eq!(engines, vec![EngineId::NativeDetector, EngineId::Fallback]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("All scanning engines failed: native: "));
        assert_eq!(scanner.state().await, ScannerState::Idle);

        // The demoted native engine is skipped; the fallback is retried.
        match scanner.start(&target()).await.unwrap_err() {
            ScanError::AllEnginesExhausted { attempts } => {
                let engines: Vec<_> = attempts.iter().map(|a| a.engine).collect();
                assert_eq!(engines, vec![EngineId::Fallback]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(native.starts(), 1);
        assert_eq!(fallback.starts(), 2);
    }

    #[tokio::test]
    async fn test_fallback_recovers_after_failed_start() {
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback).failing_starts(1));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&fallback]);

        assert!(matches!(
            scanner.start(&target()).await.unwrap_err(),
            ScanError::AllEnginesExhausted { .. }
        ));

        let session = scanner.start(&target()).await.unwrap();
        assert_eq!(session.engine, EngineId::Fallback);
        assert_eq!(fallback.starts(), 2);
        assert!(scanner.engine_status().await.unwrap().is_usable(EngineId::Fallback));
    }

    #[tokio::test]
    async fn test_reentrant_start_is_rejected() {
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&fallback]);

        let _session = scanner.start(&target()).await.unwrap();
        assert!(matches!(
            scanner.start(&target()).await.unwrap_err(),
            ScanError::AlreadyActive
        ));
        assert_eq!(fallback.starts(), 1);
    }

    #[tokio::test]
    async fn test_stop_during_start_cancels() {
        let gate = Arc::new(Notify::new());
        let native = Arc::new(FakeEngine::new(EngineId::NativeDetector).gated(gate.clone()));
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&native, &fallback]);

        let pending = {
            let scanner = scanner.clone();
            tokio::spawn(async move { scanner.start(&target()).await })
        };

        while native.starts() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(scanner.state().await, ScannerState::Starting);

        scanner.stop().await;
        gate.notify_one();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(ScanError::Cancelled)));
        assert_eq!(native.stops(), 1);
        assert_eq!(fallback.starts(), 0);
        assert_eq!(scanner.state().await, ScannerState::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_start_holds_the_camera_until_it_returns() {
        let gate = Arc::new(Notify::new());
        let native = Arc::new(FakeEngine::new(EngineId::NativeDetector).gated(gate.clone()));
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&native, &fallback]);

        let first = {
            let scanner = scanner.clone();
            tokio::spawn(async move { scanner.start(&target()).await })
        };
        while native.starts() == 0 {
            tokio::task::yield_now().await;
        }

        scanner.stop().await;
        assert_eq!(scanner.state().await, ScannerState::Stopping);
        assert!(matches!(
            scanner.start(&target()).await.unwrap_err(),
            ScanError::AlreadyActive
        ));
        assert_eq!(native.starts(), 1);
        assert_eq!(fallback.starts(), 0);

        gate.notify_one();
        assert!(matches!(first.await.unwrap(), Err(ScanError::Cancelled)));
        assert_eq!(native.stops(), 1);
        assert_eq!(scanner.state().await, ScannerState::Idle);

        gate.notify_one();
        let session = scanner.start(&target()).await.unwrap();
        assert_eq!(session.engine, EngineId::NativeDetector);
        assert_eq!(native.starts(), 2);
    }

    #[tokio::test]
    async fn test_dropped_start_still_settles() {
        let gate = Arc::new(Notify::new());
        let native = Arc::new(FakeEngine::new(EngineId::NativeDetector).gated(gate.clone()));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&native]);

        let first = {
            let scanner = scanner.clone();
            tokio::spawn(async move { scanner.start(&target()).await })
        };
        while native.starts() == 0 {
            tokio::task::yield_now().await;
        }

        first.abort();
        scanner.stop().await;
        gate.notify_one();

        settle(&scanner).await;
        assert_eq!(scanner.state().await, ScannerState::Idle);
        assert_eq!(native.stops(), 1);
    }

    #[tokio::test]
    async fn test_detection_ends_session() {
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&fallback]);

        let session = scanner.start(&target()).await.unwrap();
        assert!(fallback.detect("4006381333931"));
        assert!(!fallback.detect("7790001234568"));

        let event = session.detection().await.unwrap();
        assert_eq!(event.raw_text, "4006381333931");
        assert_eq!(event.engine, EngineId::Fallback);

        settle(&scanner).await;
        assert_eq!(scanner.state().await, ScannerState::Idle);
        assert_eq!(fallback.stops(), 1);

        // A fresh session can start right away.
        let _next = scanner.start(&target()).await.unwrap();
        assert_eq!(fallback.starts(), 2);
    }

    #[tokio::test]
    async fn test_stop_cancels_pending_detection() {
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&fallback]);

        let session = scanner.start(&target()).await.unwrap();
        scanner.stop().await;

        assert!(matches!(
            session.detection().await,
            Err(ScanError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_scan_once() {
        let fallback = Arc::new(FakeEngine::new(EngineId::Fallback));
        let scanner = scanner(FakeCamera::with_frames(&[]), &[&fallback]);

        let pending = {
            let scanner = scanner.clone();
            tokio::spawn(async move { scanner.scan_once(&target()).await })
        };

        while !fallback.detect("4006381333931") {
            tokio::task::yield_now().await;
        }

        let event = pending.await.unwrap().unwrap();
        assert_eq!(event.raw_text, "4006381333931");
        settle(&scanner).await;
        assert_eq!(scanner.state().await, ScannerState::Idle);
    }
}
