//! Due-pump evaluator and actuator sequencer.
//!
//! Walks the four slots in index order, runs every due pump for its
//! configured on-time, books the assumed volume against the water budget
//! and re-arms the countdown. Pumps share one supply rail, so a settle
//! pause separates consecutive slots whether or not either pump ran.
//!
//! ```text
//!  slot 0 ──[due?]──▶ ON ─ hold ─ OFF ─ deduct ─ rearm
//!     │ settle
//!  slot 1 ──[due?]──▶ …
//!     │ settle
//!   …
//!  grouped NVS write (countdowns + water) ─▶ WaterLevel telemetry
//! ```
//!
//! There is no flow sensor. Delivery is assumed, never verified.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, EventSink, StoragePort};
use crate::config::NUMBER_OF_PUMPS;

use super::state::ScheduleState;

/// One pump run performed during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    /// 0-based pump index.
    pub pump: usize,
    pub duration_ms: u32,
    pub volume_ml: u32,
}

/// Result of a completed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationReport {
    pub activations: heapless::Vec<Activation, NUMBER_OF_PUMPS>,
    pub remaining_water_ml: i32,
    /// `false` if the grouped write failed; the in-memory state is still
    /// authoritative for the rest of this wake cycle.
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// Budget was already ≤ 0. No pump ran, no countdown changed.
    SkippedEmpty { remaining_water_ml: i32 },
    Completed(EvaluationReport),
}

impl EvaluationOutcome {
    pub fn activations(&self) -> &[Activation] {
        match self {
            Self::SkippedEmpty { .. } => &[],
            Self::Completed(report) => &report.activations,
        }
    }
}

/// Run every due pump once.
pub fn run_due_pumps(
    state: &mut ScheduleState,
    settle_ms: u32,
    hw: &mut impl ActuatorPort,
    store: &mut impl StoragePort,
    sink: &mut impl EventSink,
) -> EvaluationOutcome {
    if state.budget.is_empty() {
        warn!(
            "Evaluator: reservoir empty ({}mL), skipping pass",
            state.budget.remaining_water_ml
        );
        sink.emit(&AppEvent::WaterEmpty {
            remaining_ml: state.budget.remaining_water_ml,
        });
        return EvaluationOutcome::SkippedEmpty {
            remaining_water_ml: state.budget.remaining_water_ml,
        };
    }

    let mut activations = heapless::Vec::new();

    for index in 0..NUMBER_OF_PUMPS {
        if index > 0 {
            hw.delay_ms(settle_ms);
        }

        let slot = &mut state.pumps[index];
        if !slot.is_due() {
            continue;
        }

        let amount = slot.amount();
        info!(
            "Evaluator: pump {} due ({}h), running {}ms for {}mL",
            index + 1,
            slot.hours_until_due,
            amount.duration_ms,
            amount.volume_ml
        );
        hw.pump_on(index);
        hw.delay_ms(amount.duration_ms);
        hw.pump_off(index);

        state.budget.deduct(amount.volume_ml);
        slot.rearm();

        let activation = Activation {
            pump: index,
            duration_ms: amount.duration_ms,
            volume_ml: amount.volume_ml,
        };
        let _ = activations.push(activation);
        sink.emit(&AppEvent::PumpActivated(activation));

        if state.budget.is_empty() {
            warn!(
                "Evaluator: reservoir estimated empty after pump {} ({}mL)",
                index + 1,
                state.budget.remaining_water_ml
            );
        }
    }

    let persisted = match state.persist_progress(store) {
        Ok(()) => true,
        Err(e) => {
            warn!("Evaluator: persisting progress failed: {}", e);
            false
        }
    };

    sink.emit(&AppEvent::WaterLevel {
        remaining_ml: state.budget.remaining_water_ml,
    });

    EvaluationOutcome::Completed(EvaluationReport {
        activations,
        remaining_water_ml: state.budget.remaining_water_ml,
        persisted,
    })
}
