//! Wake-cycle tests for the AppService → Scheduler → Evaluator pipeline.
//!
//! These run on the host and drive `AppService::poll` the way the
//! firmware's wake loop does, with a fixed clock and recording adapters.

use crate::mock_hw::{ActuatorCall, FixedClock, JAN_1_2024, MockHardware, MockStore, RecordingSink};

use plantnanny::app::events::AppEvent;
use plantnanny::app::service::{AppService, CycleStep};
use plantnanny::config::SystemConfig;
use plantnanny::app::ports::ActuatorPort;
use plantnanny::events::{Event, EventQueue, InboundMessage};
use plantnanny::schedule::Projection;
use plantnanny::schedule::state::{
    KEY_AMOUNT, KEY_CONTAINER_SIZE, KEY_FREQUENCY, KEY_HOURS_UNTIL_DUE, KEY_LAST_TICK,
    KEY_REMAINING_WATER, encode_signed,
};

const EIGHT_AM_EPOCH_HOUR: u32 = (JAN_1_2024 / 3600) as u32 + 8;

/// One pump at 48 h / 50 mL, due at the next boundary, 100 mL left.
fn one_pump_due() -> MockStore {
    MockStore::with(&[
        (KEY_CONTAINER_SIZE, 1),
        (KEY_REMAINING_WATER, 100),
        (KEY_FREQUENCY[0], 3),
        (KEY_AMOUNT[0], 2),
        (KEY_HOURS_UNTIL_DUE[0], 1),
    ])
}

struct Rig {
    app: AppService,
    queue: EventQueue,
    hw: MockHardware,
    sink: RecordingSink,
}

impl Rig {
    fn new(store: &MockStore) -> Self {
        let mut sink = RecordingSink::new();
        let mut app = AppService::new(SystemConfig::default(), store, 0);
        app.start(&mut sink);
        Self {
            app,
            queue: EventQueue::new(),
            hw: MockHardware::new(),
            sink,
        }
    }

    fn poll(&mut self, now_ms: u64, clock: &FixedClock, store: &mut MockStore) -> CycleStep {
        self.app
            .poll(now_ms, &self.queue, clock, &mut self.hw, store, &mut self.sink)
    }

    /// Poll every 50 ms until the service asks for sleep.
    fn run_wake(&mut self, clock: &FixedClock, store: &mut MockStore) -> u32 {
        for i in 0..1_000 {
            if let CycleStep::Sleep(secs) = self.poll(i * 50, clock, store) {
                return secs;
            }
        }
        panic!("wake cycle never ended");
    }
}

/// Actuator that delivers a command the first time a pump starts, like a
/// broker message landing mid-run.
struct DeliveringActuator<'a> {
    hw: MockHardware,
    queue: &'a EventQueue,
    pending: Option<Event>,
}

impl ActuatorPort for DeliveringActuator<'_> {
    fn pump_on(&mut self, index: usize) {
        if let Some(event) = self.pending.take() {
            assert!(self.queue.push(event));
        }
        self.hw.pump_on(index);
    }

    fn pump_off(&mut self, index: usize) {
        self.hw.pump_off(index);
    }

    fn all_off(&mut self) {
        self.hw.all_off();
    }

    fn delay_ms(&mut self, ms: u32) {
        self.hw.delay_ms(ms);
    }
}

// ── Hour boundary ─────────────────────────────────────────────

#[test]
fn boundary_runs_due_pump_and_sleeps_to_next_hour() {
    let mut store = one_pump_due();
    let mut rig = Rig::new(&store);
    let clock = FixedClock::at(8, 0, 27);

    // The run itself keeps the wake alive for one more drain.
    assert_eq!(rig.poll(0, &clock, &mut store), CycleStep::Continue);
    assert_eq!(rig.hw.pumps_started(), vec![0]);

    // 3573 s to 09:00:00 plus 27 s drift compensation.
    assert_eq!(rig.poll(50, &clock, &mut store), CycleStep::Sleep(3600));
    assert_eq!(rig.hw.pumps_started(), vec![0]);
    assert!(!rig.hw.any_pump_on());

    let state = rig.app.state();
    assert_eq!(state.budget.remaining_water_ml, 50);
    assert_eq!(state.pumps[0].hours_until_due, 48);

    assert_eq!(store.get_signed(KEY_REMAINING_WATER), Some(50));
    assert_eq!(store.get_signed(KEY_HOURS_UNTIL_DUE[0]), Some(48));
    assert_eq!(store.get(KEY_LAST_TICK), Some(EIGHT_AM_EPOCH_HOUR));

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::PumpActivated(_))), 1);
    assert!(matches!(rig.sink.events.last(), Some(AppEvent::Sleeping { secs: 3600 })));
}

#[test]
fn pumps_run_in_order_with_settle_delay_between_slots() {
    let mut store = MockStore::with(&[
        (KEY_CONTAINER_SIZE, 4),
        (KEY_REMAINING_WATER, 5000),
        (KEY_FREQUENCY[0], 4),
        (KEY_AMOUNT[0], 2),
        (KEY_FREQUENCY[2], 4),
        (KEY_AMOUNT[2], 1),
    ]);
    let mut rig = Rig::new(&store);
    let clock = FixedClock::at(6, 0, 30);

    rig.run_wake(&clock, &mut store);

    let settle = SystemConfig::default().pump_settle_ms;
    assert_eq!(
        rig.hw.calls,
        vec![
            ActuatorCall::PumpOn(0),
            ActuatorCall::Delay(5000),
            ActuatorCall::PumpOff(0),
            ActuatorCall::Delay(settle),
            ActuatorCall::Delay(settle),
            ActuatorCall::PumpOn(2),
            ActuatorCall::Delay(2500),
            ActuatorCall::PumpOff(2),
            ActuatorCall::Delay(settle),
            ActuatorCall::AllOff,
        ]
    );
    assert_eq!(rig.app.state().budget.remaining_water_ml, 5000 - 50 - 25);
}

#[test]
fn empty_tank_skips_pumps_but_keeps_counting_down() {
    let mut store = one_pump_due();
    store.values.insert(KEY_REMAINING_WATER.into(), encode_signed(-10));
    let mut rig = Rig::new(&store);
    let clock = FixedClock::at(8, 0, 5);

    rig.run_wake(&clock, &mut store);

    assert!(rig.hw.pumps_started().is_empty());
    assert_eq!(store.get_signed(KEY_HOURS_UNTIL_DUE[0]), Some(0));
    assert_eq!(store.get_signed(KEY_REMAINING_WATER), Some(-10));
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::WaterEmpty { .. })), 1);
}

#[test]
fn handled_boundary_is_not_run_again_after_reboot() {
    let mut store = one_pump_due();
    let clock = FixedClock::at(8, 0, 27);

    let mut first = Rig::new(&store);
    first.run_wake(&clock, &mut store);
    assert_eq!(first.hw.pumps_started(), vec![0]);

    // Early timer wake inside the same boundary window.
    let clock = FixedClock::at(8, 0, 50);
    let mut second = Rig::new(&store);
    assert_eq!(second.poll(0, &clock, &mut store), CycleStep::Continue);
    assert!(second.hw.pumps_started().is_empty());
    assert_eq!(second.app.state().budget.remaining_water_ml, 50);
    assert_eq!(second.sink.count(|e| matches!(e, AppEvent::HourTick { .. })), 0);
}

#[test]
fn next_boundary_fires_again() {
    let mut store = one_pump_due();
    store.values.insert(KEY_LAST_TICK.into(), EIGHT_AM_EPOCH_HOUR);
    let mut rig = Rig::new(&store);
    let clock = FixedClock::at(9, 0, 27);

    rig.run_wake(&clock, &mut store);
    assert_eq!(store.get(KEY_LAST_TICK), Some(EIGHT_AM_EPOCH_HOUR + 1));
    assert_eq!(rig.hw.pumps_started(), vec![0]);
}

#[test]
fn command_arriving_during_pump_run_is_applied_before_sleep() {
    let mut store = one_pump_due();
    let queue = EventQueue::new();
    let mut app = AppService::new(SystemConfig::default(), &store, 0);
    let mut sink = RecordingSink::new();
    let mut hw = DeliveringActuator {
        hw: MockHardware::new(),
        queue: &queue,
        pending: Some(Event::Message(
            InboundMessage::new("plant-nanny/1/command-water", b"3000").unwrap(),
        )),
    };
    let clock = FixedClock::at(8, 0, 27);

    assert_eq!(app.poll(0, &queue, &clock, &mut hw, &mut store, &mut sink), CycleStep::Continue);
    assert_eq!(hw.hw.pumps_started(), vec![0]);
    assert_eq!(queue.len(), 1);

    let step = app.poll(50, &queue, &clock, &mut hw, &mut store, &mut sink);

    assert_eq!(step, CycleStep::Sleep(3600));
    assert!(queue.is_empty());
    assert_eq!(app.state().budget.remaining_water_ml, 3000);
    assert_eq!(store.get_signed(KEY_REMAINING_WATER), Some(3000));
    // Applied once; the boundary does not fire a second time.
    assert_eq!(hw.hw.pumps_started(), vec![0]);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::HourTick { .. })), 1);
}

// ── Off-boundary and degraded wakes ───────────────────────────

#[test]
fn off_boundary_wake_sleeps_after_inactivity() {
    let mut store = one_pump_due();
    let mut rig = Rig::new(&store);
    let clock = FixedClock::at(10, 23, 10);

    assert_eq!(rig.poll(0, &clock, &mut store), CycleStep::Continue);
    assert_eq!(rig.poll(14_999, &clock, &mut store), CycleStep::Continue);

    // 36 min 50 s to 11:00 plus drift compensation.
    assert_eq!(rig.poll(15_000, &clock, &mut store), CycleStep::Sleep(2210 + 27));
    assert!(rig.hw.pumps_started().is_empty());
    assert_eq!(rig.hw.calls.last(), Some(&ActuatorCall::AllOff));
}

#[test]
fn boundary_runs_before_slow_network_bring_up() {
    let mut store = one_pump_due();
    let mut rig = Rig::new(&store);

    // Boot poll at hh:00:27 off the RTC, before any radio work.
    assert_eq!(rig.poll(0, &FixedClock::at(8, 0, 27), &mut store), CycleStep::Continue);
    assert_eq!(rig.hw.pumps_started(), vec![0]);

    // WiFi, SNTP and MQTT took 18 s; minute 0 has passed by now.
    let late = FixedClock::at(8, 1, 5);
    rig.app.extend_wake(18_000);
    rig.queue
        .push(Event::Message(InboundMessage::new("plant-nanny/1/2/command-freq", b"4").unwrap()));

    assert_eq!(rig.poll(18_050, &late, &mut store), CycleStep::Sleep(3535 + 27));
    assert_eq!(rig.app.state().pumps[1].frequency_category, 4);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::HourTick { .. })), 1);
    assert_eq!(store.get(KEY_LAST_TICK), Some(EIGHT_AM_EPOCH_HOUR));
}

#[test]
fn extend_wake_restarts_the_inactivity_window() {
    let mut store = one_pump_due();
    let mut rig = Rig::new(&store);
    let clock = FixedClock::at(10, 23, 10);

    assert_eq!(rig.poll(0, &clock, &mut store), CycleStep::Continue);
    rig.app.extend_wake(18_000);
    assert_eq!(rig.poll(20_000, &clock, &mut store), CycleStep::Continue);
    assert!(matches!(rig.poll(33_000, &clock, &mut store), CycleStep::Sleep(_)));
}

#[test]
fn user_activity_extends_the_wake() {
    let mut store = one_pump_due();
    let mut rig = Rig::new(&store);
    let clock = FixedClock::at(10, 23, 10);

    rig.queue.push(Event::UserActivity);
    assert_eq!(rig.poll(10_000, &clock, &mut store), CycleStep::Continue);
    assert_eq!(rig.poll(20_000, &clock, &mut store), CycleStep::Continue);
    assert!(matches!(rig.poll(25_000, &clock, &mut store), CycleStep::Sleep(_)));
}

#[test]
fn no_clock_sleeps_blind_without_touching_countdowns() {
    let mut store = one_pump_due();
    let mut rig = Rig::new(&store);
    let clock = FixedClock::unsynced();

    assert_eq!(rig.poll(0, &clock, &mut store), CycleStep::Continue);
    assert_eq!(rig.poll(5_000, &clock, &mut store), CycleStep::Continue);
    assert_eq!(rig.poll(15_000, &clock, &mut store), CycleStep::Sleep(3600));

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ClockUnavailable)), 1);
    assert_eq!(rig.app.state().pumps[0].hours_until_due, 1);
    assert_eq!(store.writes, 0);
    assert_eq!(store.get(KEY_LAST_TICK), None);
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_carries_projection_and_battery() {
    let store = MockStore::with(&[
        (KEY_CONTAINER_SIZE, 2),
        (KEY_REMAINING_WATER, 4200),
        (KEY_FREQUENCY[0], 3),
        (KEY_FREQUENCY[1], 3),
        (KEY_FREQUENCY[2], 3),
        (KEY_FREQUENCY[3], 3),
        (KEY_AMOUNT[0], 2),
        (KEY_AMOUNT[1], 2),
        (KEY_AMOUNT[2], 2),
        (KEY_AMOUNT[3], 2),
    ]);
    let mut rig = Rig::new(&store);

    rig.app.publish_telemetry(&mut rig.hw, &mut rig.sink);

    let Some(AppEvent::Telemetry(t)) = rig.sink.events.last() else {
        panic!("no telemetry emitted");
    };
    assert_eq!(t.remaining_ml, 4200);
    assert_eq!(t.container_size_category, 2);
    match t.days_left {
        Projection::Days(d) => assert!((40..=42).contains(&d), "got {d} days"),
        Projection::Indefinite => panic!("expected a finite projection"),
    }
    // 3100 raw ≈ 5.0 V through the 1:2 divider.
    assert!((t.battery_volts - 5.0).abs() < 0.01, "got {}", t.battery_volts);
}

#[test]
fn started_event_reports_active_pumps() {
    let store = one_pump_due();
    let rig = Rig::new(&store);
    assert_eq!(
        rig.sink.events.first(),
        Some(&AppEvent::Started {
            remaining_ml: 100,
            active_pumps: 1
        })
    );
}
