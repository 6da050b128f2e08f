//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the schedule state, the hourly scheduler and the
//! inactivity timer for one wake cycle. It exposes a clean,
//! hardware-agnostic API.  All I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  EventQueue ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  ClockPort  ──▶ │        AppService         │
//! ActuatorPort ◀──│ Scheduler · Evaluator ·   │──▶ StoragePort
//!  BatteryPort ──▶│ Commands · Projector      │
//!                 └──────────────────────────┘
//! ```
//!
//! The outer driver calls [`AppService::poll`] in a loop until it returns
//! [`CycleStep::Sleep`], then performs the platform deep-sleep call.

use log::{info, warn};

use crate::battery;
use crate::config::{NUMBER_OF_PUMPS, SystemConfig};
use crate::error::{self, CommandError};
use crate::events::{Event, EventQueue};
use crate::power::InactivityTimer;
use crate::schedule::state::{
    KEY_AMOUNT, KEY_CONTAINER_SIZE, KEY_FREQUENCY, KEY_HOURS_UNTIL_DUE, KEY_LAST_TICK,
    KEY_REMAINING_WATER, encode_signed,
};
use crate::schedule::{
    EvaluationOutcome, Projection, ScheduleState, project_remaining_days, run_due_pumps,
};
use crate::scheduler::{HourlyScheduler, TickOutcome};
use crate::topics;

use super::commands::AppCommand;
use super::events::{AppEvent, PumpStatus, TelemetryData};
use super::ports::{
    ActuatorPort, BatteryPort, ClockPort, ConfigPort, EventSink, HourBoundaryDelegate,
    StorageError, StoragePort,
};

/// What the outer driver should do after one [`AppService::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    /// Keep looping.
    Continue,
    /// Power down for this many seconds.
    Sleep(u32),
}

// ───────────────────────────────────────────────────────────────
// Hour-boundary delegate
// ───────────────────────────────────────────────────────────────
//
// Bridges the scheduler (which knows nothing about pumps or storage) to
// the evaluator. Lives only for the duration of one `tick` call.

struct HourRun<'a, H, S, E> {
    state: &'a mut ScheduleState,
    settle_ms: u32,
    hw: &'a mut H,
    store: &'a mut S,
    sink: &'a mut E,
    outcome: Option<EvaluationOutcome>,
}

impl<H: ActuatorPort, S: StoragePort, E: EventSink> HourBoundaryDelegate for HourRun<'_, H, S, E> {
    fn on_hour_boundary(&mut self, epoch_hour: u64) {
        self.sink.emit(&AppEvent::HourTick { epoch_hour });

        for slot in &mut self.state.pumps {
            slot.advance_hour();
        }

        let outcome = run_due_pumps(self.state, self.settle_ms, self.hw, self.store, self.sink);

        // The evaluator only persists after a completed pass; the
        // decremented countdowns must survive an empty tank too.
        if matches!(outcome, EvaluationOutcome::SkippedEmpty { .. }) {
            if let Err(e) = self.state.persist_progress(self.store) {
                warn!("AppService: persisting countdowns failed: {}", e);
            }
        }

        let stamp = u32::try_from(epoch_hour).unwrap_or(u32::MAX);
        if let Err(e) = self.store.write_u32(KEY_LAST_TICK, stamp) {
            warn!("AppService: persisting tick stamp failed: {}", e);
        }

        self.outcome = Some(outcome);
    }
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic of one wake cycle.
pub struct AppService {
    config: SystemConfig,
    state: ScheduleState,
    scheduler: HourlyScheduler,
    inactivity: InactivityTimer,
    last_evaluation: Option<EvaluationOutcome>,
    degraded_reported: bool,
    run_complete: bool,
}

impl AppService {
    /// Construct the service, loading the schedule from `store`.
    pub fn new(config: SystemConfig, store: &impl StoragePort, now_ms: u64) -> Self {
        let state = ScheduleState::load(store);
        let last_tick = match store.read_u32(KEY_LAST_TICK) {
            Ok(stamp) => Some(u64::from(stamp)),
            Err(StorageError::NotFound) => None,
            Err(e) => {
                warn!("AppService: reading tick stamp failed ({}), assuming none", e);
                None
            }
        };
        let scheduler = HourlyScheduler::new(&config, last_tick);
        let inactivity = InactivityTimer::new(config.inactivity_threshold_secs, now_ms);

        Self {
            config,
            state,
            scheduler,
            inactivity,
            last_evaluation: None,
            degraded_reported: false,
            run_complete: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started {
            remaining_ml: self.state.budget.remaining_water_ml,
            active_pumps: self.state.active_pumps(),
        });
        info!(
            "AppService started: water={}mL, {} active pump(s)",
            self.state.budget.remaining_water_ml,
            self.state.active_pumps()
        );
    }

    /// Write the full schedule and the device config on first boot.
    ///
    /// Returns `Ok(true)` if the store was empty and has been provisioned.
    pub fn provision<S: StoragePort + ConfigPort>(&self, store: &mut S) -> error::Result<bool> {
        if store.exists(KEY_CONTAINER_SIZE) {
            return Ok(false);
        }
        self.state.persist_all(store)?;
        store.save(&self.config)?;
        info!("AppService: first boot, store provisioned with defaults");
        Ok(true)
    }

    /// Restart the inactivity window, e.g. after a slow network bring-up.
    pub fn extend_wake(&mut self, now_ms: u64) {
        self.inactivity.touch(now_ms);
    }

    // ── Per-iteration orchestration ───────────────────────────

    /// One loop iteration: drain inputs, check the hour boundary, decide
    /// whether the wake cycle is over.
    ///
    /// A fired boundary returns [`CycleStep::Continue`]; the following
    /// iteration applies whatever was queued during actuation and then
    /// requests the sleep.
    #[allow(clippy::too_many_arguments)]
    pub fn poll(
        &mut self,
        now_ms: u64,
        queue: &EventQueue,
        clock: &impl ClockPort,
        hw: &mut impl ActuatorPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> CycleStep {
        // 1. Inputs
        self.drain_inputs(now_ms, queue, store, sink);

        // Commands that arrived while the pumps ran have now been applied.
        if self.run_complete {
            return self.sleep(clock, hw, sink);
        }

        // 2. Hour boundary
        let now = clock.now();
        let mut run = HourRun {
            state: &mut self.state,
            settle_ms: self.config.pump_settle_ms,
            hw: &mut *hw,
            store: &mut *store,
            sink: &mut *sink,
            outcome: None,
        };
        let outcome = self.scheduler.tick(now, &mut run);
        let evaluation = run.outcome.take();

        match outcome {
            TickOutcome::Fired { .. } => {
                self.last_evaluation = evaluation;
                // Sleep on the next iteration, once the queue has been
                // drained again.
                self.run_complete = true;
                return CycleStep::Continue;
            }
            TickOutcome::Degraded if !self.degraded_reported => {
                self.degraded_reported = true;
                sink.emit(&AppEvent::ClockUnavailable);
            }
            _ => {}
        }

        // 3. Inactivity
        if self.inactivity.expired(now_ms) {
            info!(
                "AppService: idle for {}ms, ending wake cycle",
                self.inactivity.idle_ms(now_ms)
            );
            return self.sleep(clock, hw, sink);
        }

        CycleStep::Continue
    }

    fn drain_inputs(
        &mut self,
        now_ms: u64,
        queue: &EventQueue,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        queue.drain(|event| {
            self.inactivity.touch(now_ms);
            match event {
                Event::Message(msg) => {
                    match topics::parse_command(&self.config, &msg.topic, &msg.payload) {
                        Ok(cmd) => {
                            let _ = self.handle_command(cmd, store, sink);
                        }
                        Err(e) => {
                            warn!("AppService: ignoring '{}': {}", msg.topic, e);
                            sink.emit(&AppEvent::CommandRejected(e));
                        }
                    }
                }
                Event::Command(cmd) => {
                    let _ = self.handle_command(cmd, store, sink);
                }
                Event::UserActivity => {}
            }
        });
    }

    fn sleep(
        &mut self,
        clock: &impl ClockPort,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> CycleStep {
        hw.all_off();
        let secs = self.scheduler.sleep_secs(clock.now());
        sink.emit(&AppEvent::Sleeping { secs });
        CycleStep::Sleep(secs)
    }

    // ── Command handling ──────────────────────────────────────

    /// Validate, write through and apply one command.
    ///
    /// A rejected command leaves both the store and the in-memory state
    /// untouched.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<(), CommandError> {
        match self.apply_command(cmd, store) {
            Ok(()) => {
                info!("AppService: applied {:?}", cmd);
                sink.emit(&AppEvent::CommandApplied(cmd));
                if matches!(cmd, AppCommand::SetRemainingWater(_) | AppCommand::Refill) {
                    sink.emit(&AppEvent::WaterLevel {
                        remaining_ml: self.state.budget.remaining_water_ml,
                    });
                }
                Ok(())
            }
            Err(e) => {
                warn!("AppService: rejected {:?}: {}", cmd, e);
                sink.emit(&AppEvent::CommandRejected(e));
                Err(e)
            }
        }
    }

    fn apply_command(
        &mut self,
        cmd: AppCommand,
        store: &mut impl StoragePort,
    ) -> Result<(), CommandError> {
        match cmd {
            AppCommand::SetContainerSize(value) => {
                let category = category(value)?;
                store.write_u32(KEY_CONTAINER_SIZE, u32::from(category))?;
                self.state.budget.container_size_category = category;
            }
            AppCommand::SetRemainingWater(ml) => {
                store.write_u32(KEY_REMAINING_WATER, encode_signed(ml))?;
                self.state.budget.remaining_water_ml = ml;
            }
            AppCommand::SetFrequency { pump, category: value } => {
                let index = pump_index(pump)?;
                let category = category(value)?;
                store.write_u32(KEY_FREQUENCY[index], u32::from(category))?;
                self.state.pumps[index].frequency_category = category;
            }
            AppCommand::SetNextDue { pump, hours } => {
                let index = pump_index(pump)?;
                store.write_u32(KEY_HOURS_UNTIL_DUE[index], encode_signed(hours))?;
                self.state.pumps[index].hours_until_due = hours;
            }
            AppCommand::SetAmount { pump, category: value } => {
                let index = pump_index(pump)?;
                let category = category(value)?;
                store.write_u32(KEY_AMOUNT[index], u32::from(category))?;
                self.state.pumps[index].amount_category = category;
            }
            AppCommand::Refill => {
                let mut budget = self.state.budget;
                budget.refill();
                store.write_u32(KEY_REMAINING_WATER, encode_signed(budget.remaining_water_ml))?;
                self.state.budget = budget;
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Days the current budget lasts under the current schedule.
    pub fn projection(&self) -> Projection {
        project_remaining_days(&self.state)
    }

    /// Sample the battery and emit a full telemetry snapshot.
    pub fn publish_telemetry(&self, adc: &mut impl BatteryPort, sink: &mut impl EventSink) {
        let reading = battery::read_battery(adc);
        sink.emit(&AppEvent::Telemetry(self.build_telemetry(reading)));
    }

    pub fn build_telemetry(&self, reading: battery::BatteryReading) -> TelemetryData {
        let pumps: [PumpStatus; NUMBER_OF_PUMPS] = self.state.pumps.map(|p| PumpStatus {
            frequency_category: p.frequency_category,
            hours_until_due: p.hours_until_due,
            amount_category: p.amount_category,
        });
        TelemetryData {
            battery_volts: reading.volts,
            battery_level: reading.level,
            remaining_ml: self.state.budget.remaining_water_ml,
            container_size_category: self.state.budget.container_size_category,
            pumps,
            days_left: self.projection(),
        }
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &HourlyScheduler {
        &self.scheduler
    }

    /// Outcome of the evaluator pass run during this wake, if any.
    pub fn last_evaluation(&self) -> Option<&EvaluationOutcome> {
        self.last_evaluation.as_ref()
    }
}

// ───────────────────────────────────────────────────────────────
// Range checks
// ───────────────────────────────────────────────────────────────

/// 1-based command index → 0-based slot.
fn pump_index(pump: i32) -> Result<usize, CommandError> {
    match usize::try_from(pump) {
        Ok(p) if (1..=NUMBER_OF_PUMPS).contains(&p) => Ok(p - 1),
        _ => Err(CommandError::PumpOutOfRange(pump)),
    }
}

/// Category payloads must fit a byte. Unknown categories inside that
/// range are accepted and degrade at translation time.
fn category(value: i32) -> Result<u8, CommandError> {
    u8::try_from(value).map_err(|_| CommandError::CategoryOutOfRange(value))
}
