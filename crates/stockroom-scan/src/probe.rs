//! # Engine Capability Prober
//!
//! Finds out which engines can run here before any of them is started.
//!
//! ## Probe Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  engines ──► join_all ──┬── fallback ──────────────► Available (skip)   │
//! │                         ├── native  ── probe() ──┬─► Available          │
//! │                         └── vision  ── probe() ──┼─► Failed (Err)       │
//! │                                                  ├─► Failed (panic)     │
//! │                                                  └─► Failed (timeout)   │
//! │                                                                         │
//! │  ProbeReport { usable: [detection order], status: {id → status} }       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One engine failing never aborts the others. Detection order is only the
//! order engines were registered in; the scanner applies its own priority.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::{BarcodeEngine, EngineId, EngineStatus};

/// The outcome of probing every registered engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Engines confirmed usable, in detection order.
    pub usable: Vec<EngineId>,
    pub status: BTreeMap<EngineId, EngineStatus>,
}

impl ProbeReport {
    pub fn status_of(&self, engine: EngineId) -> EngineStatus {
        self.status.get(&engine).copied().unwrap_or_default()
    }

    pub fn is_usable(&self, engine: EngineId) -> bool {
        self.usable.contains(&engine)
    }

    /// Demotes an engine after it failed to start.
    ///
    /// The fallback is never demoted; it stays a candidate for the next start.
    pub fn mark_failed(&mut self, engine: EngineId) {
        if engine == EngineId::Fallback {
            return;
        }
        self.usable.retain(|e| *e != engine);
        self.status.insert(engine, EngineStatus::Failed);
    }

    /// `priority` filtered to usable engines, without duplicates.
    pub fn candidates(&self, priority: &[EngineId]) -> Vec<EngineId> {
        let mut out: Vec<EngineId> = Vec::with_capacity(priority.len());
        for engine in priority {
            if self.is_usable(*engine) && !out.contains(engine) {
                out.push(*engine);
            }
        }
        out
    }

    fn record(&mut self, engine: EngineId, status: EngineStatus) {
        if status == EngineStatus::Available && !self.usable.contains(&engine) {
            self.usable.push(engine);
        }
        self.status.insert(engine, status);
    }
}

async fn probe_one(engine: &Arc<dyn BarcodeEngine>, timeout: Duration) -> EngineStatus {
    let id = engine.id();

    if id == EngineId::Fallback {
        return EngineStatus::Available;
    }

    let probe = AssertUnwindSafe(engine.probe()).catch_unwind();

    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(Ok(()))) => {
            debug!(engine = %id, "Engine probe succeeded");
            EngineStatus::Available
        }
        Ok(Ok(Err(e))) => {
            warn!(engine = %id, error = %e, "Engine probe failed");
            EngineStatus::Failed
        }
        Ok(Err(_)) => {
            warn!(engine = %id, "Engine probe panicked");
            EngineStatus::Failed
        }
        Err(_) => {
            warn!(engine = %id, ?timeout, "Engine probe timed out");
            EngineStatus::Failed
        }
    }
}

/// Probes every engine concurrently, each bounded by `timeout`.
pub async fn probe_engines(engines: &[Arc<dyn BarcodeEngine>], timeout: Duration) -> ProbeReport {
    let statuses = join_all(engines.iter().map(|engine| probe_one(engine, timeout))).await;

    let mut report = ProbeReport::default();
    for (engine, status) in engines.iter().zip(statuses) {
        report.record(engine.id(), status);
    }

    info!(usable = ?report.usable, "Engine probe complete");
    report
}
