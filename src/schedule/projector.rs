//! Remaining-duration projector.
//!
//! Replays the hourly schedule on a scratch copy of the state until the
//! simulated reservoir runs dry and reports how many whole days that
//! took. Uses the same [`PumpSlot`](super::state::PumpSlot) countdown
//! primitives as the live hourly tick, so projection and reality agree
//! hour for hour as long as the device wakes every hour.

use core::fmt;

use super::state::ScheduleState;

/// Simulation stops here; a plausible schedule empties any box long before.
pub const MAX_SIMULATED_HOURS: u32 = 10 * 365 * 24;

/// Display estimate of how long the water lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Days(u32),
    /// No active pump, or the budget outlasts [`MAX_SIMULATED_HOURS`].
    Indefinite,
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(1) => write!(f, "1 day"),
            Self::Days(n) => write!(f, "{n} days"),
            Self::Indefinite => write!(f, "indefinite"),
        }
    }
}

/// Project how many days `state` lasts. Never mutates its input.
pub fn project_remaining_days(state: &ScheduleState) -> Projection {
    if state.active_pumps() == 0 {
        return Projection::Indefinite;
    }

    let mut scratch = *state;
    let mut hours: u32 = 0;

    while !scratch.budget.is_empty() {
        if hours >= MAX_SIMULATED_HOURS {
            return Projection::Indefinite;
        }
        for slot in &mut scratch.pumps {
            slot.advance_hour();
            if slot.is_due() {
                scratch.budget.deduct(slot.amount().volume_ml);
                slot.rearm();
            }
        }
        hours += 1;
    }

    Projection::Days(hours / 24)
}
