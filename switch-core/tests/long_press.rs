mod support;

use core::cell::Cell;

use rstest::rstest;
use switch_core::sequences::{LongPressTiming, SequenceConfig, SequenceConfigError};
use switch_core::simulator::{ButtonEventSimulator, ExecuteError, OneShotTimer, SimulatorState};
use switch_core::switch::{SwitchEvent, SwitchFeatures};

use support::{Call, RecordingSink, drive, ms};

fn long_press(features: SwitchFeatures, delay: u64, duration: u64) -> SequenceConfig {
    SequenceConfig::long_press(0, 1, features, LongPressTiming::new(ms(delay), ms(duration)))
}

#[test]
fn long_press_with_long_release_follows_timeline() {
    let done = Cell::new(0u8);
    let config = long_press(
        SwitchFeatures::MOMENTARY_SWITCH | SwitchFeatures::MOMENTARY_SWITCH_LONG_PRESS,
        500,
        2_000,
    );
    let mut simulator =
        ButtonEventSimulator::new(1, config, RecordingSink::default(), OneShotTimer::new());

    simulator.execute(|| done.set(done.get() + 1)).unwrap();
    let finished_at = drive(&mut simulator);

    let sink = simulator.sink();
    assert_eq!(
        sink.calls_at(ms(0)),
        vec![
            Call::SetPosition(1),
            Call::Event(SwitchEvent::InitialPress { new_position: 1 }),
        ]
    );
    assert_eq!(
        sink.calls_at(ms(500)),
        vec![Call::Event(SwitchEvent::LongPress { new_position: 1 })]
    );
    assert_eq!(
        sink.calls_at(ms(2_000)),
        vec![
            Call::SetPosition(0),
            Call::Event(SwitchEvent::LongRelease {
                previous_position: 1
            }),
        ]
    );
    assert_eq!(sink.calls.len(), 5);
    assert_eq!(finished_at, ms(2_000));
    assert_eq!(done.get(), 1);
    assert_eq!(simulator.state(), SimulatorState::Idle);
}

#[test]
fn long_press_falls_back_to_short_release() {
    let done = Cell::new(0u8);
    let config = long_press(
        SwitchFeatures::MOMENTARY_SWITCH | SwitchFeatures::MOMENTARY_SWITCH_RELEASE,
        200,
        1_000,
    );
    let mut simulator =
        ButtonEventSimulator::new(1, config, RecordingSink::default(), OneShotTimer::new());

    simulator.execute(|| done.set(done.get() + 1)).unwrap();
    drive(&mut simulator);

    assert_eq!(
        simulator.sink().events(),
        vec![
            SwitchEvent::InitialPress { new_position: 1 },
            SwitchEvent::LongPress { new_position: 1 },
            SwitchEvent::ShortRelease {
                previous_position: 1
            },
        ]
    );
    assert_eq!(done.get(), 1);
}

#[test]
fn long_press_without_release_features_emits_no_release() {
    let config = long_press(SwitchFeatures::MOMENTARY_SWITCH, 200, 1_000);
    let mut simulator: ButtonEventSimulator<_, _, fn()> =
        ButtonEventSimulator::new(1, config, RecordingSink::default(), OneShotTimer::new());

    simulator.execute(|| ()).unwrap();
    drive(&mut simulator);

    assert_eq!(simulator.sink().events().len(), 2);
    assert_eq!(
        simulator.sink().calls.last(),
        Some(&(ms(1_000), Call::SetPosition(0)))
    );
}

#[test]
fn rejected_position_does_not_stall_the_sequence() {
    let done = Cell::new(false);
    let config = SequenceConfig::long_press(
        0,
        5,
        SwitchFeatures::MOMENTARY_SWITCH | SwitchFeatures::MOMENTARY_SWITCH_LONG_PRESS,
        LongPressTiming::new(ms(100), ms(300)),
    );
    let mut simulator = ButtonEventSimulator::new(
        1,
        config,
        RecordingSink::with_positions(2),
        OneShotTimer::new(),
    );

    simulator.execute(|| done.set(true)).unwrap();
    drive(&mut simulator);

    let sink = simulator.sink();
    assert!(!sink.calls.contains(&(ms(0), Call::SetPosition(5))));
    assert_eq!(sink.events().len(), 3);
    assert!(done.get());
}

#[rstest]
#[case::same_positions(1, 1, 500, 2_000, SequenceConfigError::SamePositions(1))]
#[case::duration_equals_delay(0, 1, 500, 500, SequenceConfigError::LongPressTooShort)]
#[case::duration_below_delay(0, 1, 800, 500, SequenceConfigError::LongPressTooShort)]
fn invalid_long_press_is_rejected_without_side_effects(
    #[case] idle: u8,
    #[case] pressed: u8,
    #[case] delay: u64,
    #[case] duration: u64,
    #[case] expected: SequenceConfigError,
) {
    let called = Cell::new(false);
    let config = SequenceConfig::long_press(
        idle,
        pressed,
        SwitchFeatures::all(),
        LongPressTiming::new(ms(delay), ms(duration)),
    );
    let mut simulator =
        ButtonEventSimulator::new(1, config, RecordingSink::default(), OneShotTimer::new());

    assert_eq!(
        simulator.execute(|| called.set(true)),
        Err(ExecuteError::InvalidConfig(expected))
    );
    assert!(simulator.sink().calls.is_empty());
    assert!(!simulator.timer().is_armed());
    assert_eq!(simulator.state(), SimulatorState::Idle);
    assert!(!called.get());
}
