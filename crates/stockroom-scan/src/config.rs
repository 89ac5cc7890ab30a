//! # Stockroom Configuration
//!
//! Configuration for the scanner and the dashboard.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKROOM_ENGINE_PRIORITY=vision,fallback                          │
//! │     STOCKROOM_EXCHANGE_RATE=40                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockroom/stockroom.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stockroom.stockroom/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     native → vision → fallback, rate 1.0, factor 1.0                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stockroom.toml
//! [scanner]
//! engine_priority = ["native", "vision", "fallback"]
//! poll_interval_ms = 100
//! probe_timeout_ms = 3000
//! scan_log_capacity = 10
//! require_ean13 = true
//! facing = "environment"
//!
//! [dashboard]
//! exchange_rate = 40.0
//! import_factor = 1.3
//! top_n = 10
//! critical_window = 5
//! months_window = 6
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use stockroom_core::validation::validate_multiplier;
use stockroom_core::{DashboardSettings, ExchangeRate, ImportFactor};

use crate::camera::{CaptureConstraints, Facing};
use crate::engine::{EngineId, DEFAULT_PRIORITY};
use crate::error::{ScanError, ScanResult};

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "stockroom.toml";

// =============================================================================
// Scanner Settings
// =============================================================================

/// Scanner behavior settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Engines tried in this order, filtered by what the prober found.
    #[serde(default = "default_priority")]
    pub engine_priority: Vec<EngineId>,

    /// Native detector polling interval (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Upper bound on a single engine probe (milliseconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Number of recent scans kept in memory.
    #[serde(default = "default_scan_log_capacity")]
    pub scan_log_capacity: usize,

    /// Reject scanned codes that fail the EAN-13 checksum.
    #[serde(default = "default_true")]
    pub require_ean13: bool,

    #[serde(default)]
    pub facing: Facing,
}

fn default_priority() -> Vec<EngineId> {
    DEFAULT_PRIORITY.to_vec()
}

fn default_poll_interval() -> u64 {
    100
}

fn default_probe_timeout() -> u64 {
    3000
}

fn default_scan_log_capacity() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for ScannerSettings {
    fn default() -> Self {
        ScannerSettings {
            engine_priority: default_priority(),
            poll_interval_ms: default_poll_interval(),
            probe_timeout_ms: default_probe_timeout(),
            scan_log_capacity: default_scan_log_capacity(),
            require_ean13: true,
            facing: Facing::default(),
        }
    }
}

impl ScannerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Capture constraints for the configured camera.
    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            facing: self.facing,
            ..CaptureConstraints::default()
        }
    }
}

/// Parses a comma-separated engine list (`"vision, fallback"`).
pub fn parse_priority(value: &str) -> ScanResult<Vec<EngineId>> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockroomConfig {
    #[serde(default)]
    pub scanner: ScannerSettings,

    #[serde(default)]
    pub dashboard: DashboardSettings,
}

impl StockroomConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stockroom.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ScanResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ScanResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ScanError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ScanResult<()> {
        let scanner = &self.scanner;

        if scanner.engine_priority.is_empty() {
            return Err(ScanError::InvalidConfig(
                "engine_priority must name at least one engine".into(),
            ));
        }
        for (i, engine) in scanner.engine_priority.iter().enumerate() {
            if scanner.engine_priority[..i].contains(engine) {
                return Err(ScanError::InvalidConfig(format!(
                    "engine_priority lists '{}' twice",
                    engine
                )));
            }
        }

        if scanner.poll_interval_ms == 0 {
            return Err(ScanError::InvalidConfig(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        if scanner.probe_timeout_ms == 0 {
            return Err(ScanError::InvalidConfig(
                "probe_timeout_ms must be greater than 0".into(),
            ));
        }
        if scanner.scan_log_capacity == 0 {
            return Err(ScanError::InvalidConfig(
                "scan_log_capacity must be greater than 0".into(),
            ));
        }

        let dashboard = &self.dashboard;
        validate_multiplier("exchange_rate", dashboard.exchange_rate.value())
            .map_err(|e| ScanError::InvalidConfig(e.to_string()))?;
        validate_multiplier("import_factor", dashboard.import_factor.value())
            .map_err(|e| ScanError::InvalidConfig(e.to_string()))?;

        if dashboard.top_n == 0 {
            return Err(ScanError::InvalidConfig("top_n must be greater than 0".into()));
        }
        if dashboard.months_window == 0 {
            return Err(ScanError::InvalidConfig(
                "months_window must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `STOCKROOM_*` overrides read through `get`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Engine priority
        if let Some(value) = get("STOCKROOM_ENGINE_PRIORITY") {
            match parse_priority(&value) {
                Ok(priority) => {
                    debug!(?priority, "Overriding engine priority from environment");
                    self.scanner.engine_priority = priority;
                }
                Err(e) => warn!(error = %e, "Ignoring STOCKROOM_ENGINE_PRIORITY"),
            }
        }

        if let Some(value) = get("STOCKROOM_POLL_INTERVAL_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                self.scanner.poll_interval_ms = ms;
            }
        }

        if let Some(value) = get("STOCKROOM_PROBE_TIMEOUT_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                self.scanner.probe_timeout_ms = ms;
            }
        }

        if let Some(value) = get("STOCKROOM_SCAN_LOG_CAPACITY") {
            if let Ok(n) = value.parse::<usize>() {
                self.scanner.scan_log_capacity = n;
            }
        }

        if let Some(value) = get("STOCKROOM_REQUIRE_EAN13") {
            match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.scanner.require_ean13 = true,
                "0" | "false" | "no" => self.scanner.require_ean13 = false,
                _ => warn!(value = %value, "Unknown STOCKROOM_REQUIRE_EAN13 value"),
            }
        }

        if let Some(value) = get("STOCKROOM_CAMERA_FACING") {
            match value.to_lowercase().as_str() {
                "environment" | "rear" => self.scanner.facing = Facing::Environment,
                "user" | "front" => self.scanner.facing = Facing::User,
                _ => warn!(value = %value, "Unknown camera facing in environment"),
            }
        }

        // Dashboard
        if let Some(value) = get("STOCKROOM_EXCHANGE_RATE") {
            if let Ok(rate) = value.parse::<f64>() {
                debug!(rate, "Overriding exchange rate from environment");
                self.dashboard.exchange_rate = ExchangeRate::new(rate);
            }
        }

        if let Some(value) = get("STOCKROOM_IMPORT_FACTOR") {
            if let Ok(factor) = value.parse::<f64>() {
                self.dashboard.import_factor = ImportFactor::new(factor);
            }
        }

        if let Some(value) = get("STOCKROOM_TOP_N") {
            if let Ok(n) = value.parse::<usize>() {
                self.dashboard.top_n = n;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockroom", "stockroom")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
