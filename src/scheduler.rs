//! Hourly tick scheduler.
//!
//! Decides, on every loop iteration of a wake cycle, whether the wall
//! clock has just crossed an hour boundary. When it has, the scheduler
//! notifies a [`HourBoundaryDelegate`] exactly once for that boundary;
//! the delegate counts the pump slots down and runs the evaluator.
//!
//! ```text
//!            minute == 0 && second <= tolerance
//!            && boundary not yet handled
//!   ┌──────┐ ─────────────────────────────────▶ ┌─────────────────────┐
//!   │ Idle │                                    │ HourBoundaryReached │
//!   └──────┘ ◀───────────────────────────────── └─────────────────────┘
//!                 delegate.on_hour_boundary()
//! ```
//!
//! Without a synced clock the scheduler cannot tell the minute. It then
//! reports [`TickOutcome::Degraded`] and the caller sleeps a blind hour
//! without touching any countdown. Repeated blind cycles drift; nothing
//! here corrects that.

use crate::app::ports::HourBoundaryDelegate;
use crate::config::SystemConfig;
use log::{info, warn};

pub const SECS_PER_HOUR: u32 = 3600;

// ═══════════════════════════════════════════════════════════════
//  Wall clock
// ═══════════════════════════════════════════════════════════════

/// Local time as delivered by the clock port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    /// Seconds since the Unix epoch (UTC).
    pub epoch_secs: u64,
    /// Local hour of day, 0–23.
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl WallClock {
    /// Monotonic hour number, identifies one boundary uniquely.
    pub fn epoch_hour(&self) -> u64 {
        self.epoch_secs / u64::from(SECS_PER_HOUR)
    }

    /// Seconds from now to the next hh:00:00.
    pub fn secs_until_next_hour(&self) -> u32 {
        let into_hour = u32::from(self.minute) * 60 + u32::from(self.second);
        SECS_PER_HOUR - into_hour.min(SECS_PER_HOUR - 1)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickState {
    Idle,
    HourBoundaryReached,
}

/// What one [`HourlyScheduler::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new boundary was handled; persist `epoch_hour` as the stamp.
    Fired { epoch_hour: u64 },
    /// Between boundaries, or this boundary was already handled.
    Idle,
    /// No wall clock available.
    Degraded,
}

pub struct HourlyScheduler {
    state: TickState,
    /// Epoch hour of the last handled boundary (restored from NVS).
    last_handled: Option<u64>,
    tolerance_secs: u8,
    drift_compensation_secs: u32,
    blind_sleep_secs: u32,
}

impl HourlyScheduler {
    pub fn new(config: &SystemConfig, last_handled: Option<u64>) -> Self {
        Self {
            state: TickState::Idle,
            last_handled,
            tolerance_secs: config.boundary_tolerance_secs,
            drift_compensation_secs: config.timer_drift_compensation_secs,
            blind_sleep_secs: config.blind_sleep_secs,
        }
    }

    pub fn state(&self) -> TickState {
        self.state
    }

    pub fn last_handled(&self) -> Option<u64> {
        self.last_handled
    }

    /// Whether `now` lies inside the boundary window.
    pub fn is_boundary(&self, now: &WallClock) -> bool {
        now.minute == 0 && now.second <= self.tolerance_secs
    }

    /// Check the clock and fire the delegate if a new boundary was reached.
    pub fn tick(
        &mut self,
        now: Option<WallClock>,
        delegate: &mut dyn HourBoundaryDelegate,
    ) -> TickOutcome {
        let Some(now) = now else {
            return TickOutcome::Degraded;
        };

        if !self.is_boundary(&now) {
            return TickOutcome::Idle;
        }

        let epoch_hour = now.epoch_hour();
        if self.last_handled == Some(epoch_hour) {
            return TickOutcome::Idle;
        }

        self.state = TickState::HourBoundaryReached;
        info!(
            "Scheduler: hour boundary {:02}:{:02}:{:02} (epoch hour {})",
            now.hour, now.minute, now.second, epoch_hour
        );
        delegate.on_hour_boundary(epoch_hour);

        self.last_handled = Some(epoch_hour);
        self.state = TickState::Idle;
        TickOutcome::Fired { epoch_hour }
    }

    /// Timer wake-up length for a sleep starting at `now`.
    ///
    /// Aims at the next hour boundary plus drift compensation. Without a
    /// clock this is the blind-sleep fallback.
    pub fn sleep_secs(&self, now: Option<WallClock>) -> u32 {
        match now {
            Some(now) => now.secs_until_next_hour() + self.drift_compensation_secs,
            None => {
                warn!(
                    "Scheduler: no wall clock, blind sleep {}s (countdowns untouched)",
                    self.blind_sleep_secs
                );
                self.blind_sleep_secs
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
