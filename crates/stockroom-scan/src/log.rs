//! Bounded in-memory log of recent scans.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::Product;

use crate::engine::EngineId;

/// How a scan or lookup attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    Found,
    NotFound,
    Error,
}

/// One scan or lookup attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub barcode: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: ScanOutcome,
    pub product: Option<Product>,
    /// `None` for codes typed in by hand.
    pub engine: Option<EngineId>,
    pub message: Option<String>,
}

impl ScanEvent {
    pub fn found(barcode: &str, product: Product, engine: Option<EngineId>) -> Self {
        ScanEvent {
            barcode: barcode.to_string(),
            timestamp: Utc::now(),
            outcome: ScanOutcome::Found,
            product: Some(product),
            engine,
            message: None,
        }
    }

    pub fn not_found(barcode: &str, engine: Option<EngineId>) -> Self {
        ScanEvent {
            barcode: barcode.to_string(),
            timestamp: Utc::now(),
            outcome: ScanOutcome::NotFound,
            product: None,
            engine,
            message: None,
        }
    }

    pub fn error(barcode: &str, engine: Option<EngineId>, message: impl Into<String>) -> Self {
        ScanEvent {
            barcode: barcode.to_string(),
            timestamp: Utc::now(),
            outcome: ScanOutcome::Error,
            product: None,
            engine,
            message: Some(message.into()),
        }
    }
}

/// Keeps the most recent `capacity` events. Oldest are evicted first.
#[derive(Debug, Clone)]
pub struct ScanLog {
    capacity: usize,
    events: VecDeque<ScanEvent>,
}

impl ScanLog {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ScanLog {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: ScanEvent) {
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Newest first.
    pub fn recent(&self) -> Vec<ScanEvent> {
        self.events.iter().rev().cloned().collect()
    }

    pub fn latest(&self) -> Option<&ScanEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
