//! Command-channel tests: raw messages in, write-through state changes out.

use crate::mock_hw::{FixedClock, MockHardware, MockStore, RecordingSink};

use plantnanny::app::commands::AppCommand;
use plantnanny::app::events::AppEvent;
use plantnanny::app::ports::StorageError;
use plantnanny::app::service::{AppService, CycleStep};
use plantnanny::config::SystemConfig;
use plantnanny::error::CommandError;
use plantnanny::events::{Event, EventQueue, InboundMessage};
use plantnanny::schedule::state::{
    KEY_AMOUNT, KEY_CONTAINER_SIZE, KEY_FREQUENCY, KEY_HOURS_UNTIL_DUE, KEY_REMAINING_WATER,
};

fn message(topic: &str, payload: &str) -> Event {
    Event::Message(InboundMessage::new(topic, payload.as_bytes()).unwrap())
}

/// Deliver `events` and run one off-boundary poll.
fn deliver(store: &mut MockStore, events: Vec<Event>) -> (AppService, RecordingSink) {
    let mut app = AppService::new(SystemConfig::default(), &*store, 0);
    let queue = EventQueue::new();
    for e in events {
        assert!(queue.push(e));
    }
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let clock = FixedClock::at(12, 30, 0);
    let step = app.poll(100, &queue, &clock, &mut hw, store, &mut sink);
    assert_eq!(step, CycleStep::Continue);
    (app, sink)
}

#[test]
fn global_commands_write_through() {
    let mut store = MockStore::new();
    let (app, sink) = deliver(
        &mut store,
        vec![
            message("plant-nanny/1/command-container", "3"),
            message("plant-nanny/1/command-water", "1234"),
        ],
    );

    assert_eq!(app.state().budget.container_size_category, 3);
    assert_eq!(app.state().budget.remaining_water_ml, 1234);
    assert_eq!(store.get(KEY_CONTAINER_SIZE), Some(3));
    assert_eq!(store.get_signed(KEY_REMAINING_WATER), Some(1234));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::CommandApplied(_))), 2);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::WaterLevel { remaining_ml: 1234 })), 1);
}

#[test]
fn pump_commands_use_one_based_index() {
    let mut store = MockStore::new();
    let (app, _) = deliver(
        &mut store,
        vec![
            message("plant-nanny/1/2/command-freq", "4"),
            message("plant-nanny/1/2/command-wait", "12"),
            message("plant-nanny/1/2/command-amount", "3"),
        ],
    );

    let slot = app.state().pumps[1];
    assert_eq!(slot.frequency_category, 4);
    assert_eq!(slot.hours_until_due, 12);
    assert_eq!(slot.amount_category, 3);
    assert_eq!(store.get(KEY_FREQUENCY[1]), Some(4));
    assert_eq!(store.get_signed(KEY_HOURS_UNTIL_DUE[1]), Some(12));
    assert_eq!(store.get(KEY_AMOUNT[1]), Some(3));
    // Neighbours untouched.
    assert_eq!(store.get(KEY_FREQUENCY[0]), None);
    assert_eq!(store.get(KEY_FREQUENCY[2]), None);
}

#[test]
fn pump_five_is_rejected_and_changes_nothing() {
    let mut store = MockStore::new();
    let before = AppService::new(SystemConfig::default(), &store, 0).state().clone();

    let (app, sink) = deliver(&mut store, vec![message("plant-nanny/1/5/command-freq", "3")]);

    assert_eq!(app.state(), &before);
    assert_eq!(store.writes, 0);
    assert!(sink
        .events
        .contains(&AppEvent::CommandRejected(CommandError::PumpOutOfRange(5))));
}

#[test]
fn set_frequency_does_not_rearm_the_countdown() {
    let mut store = MockStore::with(&[(KEY_FREQUENCY[0], 1), (KEY_HOURS_UNTIL_DUE[0], 30)]);
    let (app, _) = deliver(&mut store, vec![message("plant-nanny/1/1/command-freq", "4")]);

    assert_eq!(app.state().pumps[0].frequency_category, 4);
    assert_eq!(app.state().pumps[0].hours_until_due, 30);
}

#[test]
fn lenient_payloads_and_negative_water() {
    let mut store = MockStore::new();
    let (app, _) = deliver(
        &mut store,
        vec![
            message("plant-nanny/1/command-water", " -40 mL"),
            message("plant-nanny/1/3/command-wait", "abc"),
        ],
    );

    assert_eq!(app.state().budget.remaining_water_ml, -40);
    assert_eq!(store.get_signed(KEY_REMAINING_WATER), Some(-40));
    assert_eq!(app.state().pumps[2].hours_until_due, 0);
}

#[test]
fn foreign_and_unknown_topics_are_ignored() {
    let mut store = MockStore::new();
    let (_, sink) = deliver(
        &mut store,
        vec![
            message("plant-nanny/2/command-water", "10"),
            message("plant-nanny/1/command-reboot", "1"),
            message("other/1/command-water", "10"),
        ],
    );

    assert_eq!(store.writes, 0);
    assert_eq!(
        sink.count(|e| *e == AppEvent::CommandRejected(CommandError::UnknownTopic)),
        3
    );
}

#[test]
fn oversized_category_is_rejected() {
    let mut store = MockStore::new();
    let (app, sink) = deliver(&mut store, vec![message("plant-nanny/1/1/command-amount", "300")]);

    assert_eq!(app.state().pumps[0].amount_category, 1);
    assert!(sink
        .events
        .contains(&AppEvent::CommandRejected(CommandError::CategoryOutOfRange(300))));
}

#[test]
fn storage_failure_leaves_memory_untouched() {
    let mut store = MockStore::new();
    store.fail_writes = true;
    let mut app = AppService::new(SystemConfig::default(), &store, 0);
    let mut sink = RecordingSink::new();

    let result = app.handle_command(AppCommand::SetRemainingWater(777), &mut store, &mut sink);

    assert_eq!(result, Err(CommandError::Storage(StorageError::IoError)));
    assert_ne!(app.state().budget.remaining_water_ml, 777);
}

#[test]
fn local_refill_command_fills_to_capacity() {
    let mut store = MockStore::with(&[(KEY_CONTAINER_SIZE, 4), (KEY_REMAINING_WATER, 12)]);
    let (app, _) = deliver(&mut store, vec![Event::Command(AppCommand::Refill)]);

    assert_eq!(app.state().budget.remaining_water_ml, 10_600);
    assert_eq!(store.get_signed(KEY_REMAINING_WATER), Some(10_600));
}
