//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (pumps, battery ADC, wall clock, event sinks, storage)
//! implement these traits. The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use crate::config::SystemConfig;
use crate::scheduler::WallClock;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to drive the pump outputs.
///
/// Pump indices are 0-based here; the 1-based numbering only exists on
/// the command channel.
pub trait ActuatorPort {
    /// Energise pump `index`.
    fn pump_on(&mut self, index: usize);

    /// De-energise pump `index`.
    fn pump_off(&mut self, index: usize);

    /// Kill every pump output — safe shutdown before sleep.
    fn all_off(&mut self);

    /// Block the control loop for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Battery port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One raw sample from the battery divider ADC (12-bit, 0–4095).
pub trait BatteryPort {
    fn read_raw(&mut self) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: SNTP-synced RTC → domain)
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time, or `None` when no time source was synced this
/// boot (no WiFi / SNTP timeout).
pub trait ClockPort {
    fn now(&self) -> Option<WallClock>;
}

// ───────────────────────────────────────────────────────────────
// Hour-boundary delegate (scheduler → domain)
// ───────────────────────────────────────────────────────────────

/// Called by the [`HourlyScheduler`](crate::scheduler::HourlyScheduler)
/// exactly once per new hour boundary.
pub trait HourBoundaryDelegate {
    fn on_hour_boundary(&mut self, epoch_hour: u64);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, MQTT).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists device configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage of small unsigned integers.
///
/// Every call is a scoped critical section: the implementation opens its
/// handle, performs the operation, commits and closes before returning.
/// No handle may stay open across a call boundary, because the device can
/// enter deep sleep right after any of them.
pub trait StoragePort {
    /// Read a value. `Err(StorageError::NotFound)` if the key was never written.
    fn read_u32(&self, key: &str) -> Result<u32, StorageError>;

    /// Write one value and commit.
    fn write_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError>;

    /// Write several values under a single open/commit/close.
    ///
    /// The default implementation falls back to one commit per entry.
    fn write_batch(&mut self, entries: &[(&str, u32)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.write_u32(key, *value)?;
        }
        Ok(())
    }

    /// Check whether a key exists without reading it.
    fn exists(&self, key: &str) -> bool {
        self.read_u32(key).is_ok()
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Key longer than the backend allows (NVS: 15 bytes).
    KeyTooLong,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::KeyTooLong => write!(f, "key too long"),
        }
    }
}
