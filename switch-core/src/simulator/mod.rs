//! Timer-driven button event sequencer.
//!
//! [`ButtonEventSimulator`] replays a long press or a multi-press burst
//! against a [`SwitchSink`]. Each step updates the sink, arms exactly one
//! timer through the [`TimerService`] seam and returns; the owner calls
//! [`ButtonEventSimulator::on_timer_expired`] when that timer fires. The
//! completion callback runs once when the sequence reaches `Idle` again.

use core::fmt;

use log::{debug, error, info};
use thiserror::Error;

mod timer;

pub use timer::{OneShotTimer, TimerService};

use crate::sequences::{
    LongPressTiming, MultiPressTiming, SequenceConfig, SequenceConfigError, SequenceMode,
};
use crate::switch::{EndpointId, EventNumber, SwitchEvent, SwitchFeatures, SwitchSink};

/// Phases of a simulated sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimulatorState {
    Idle,
    StartLongPress,
    SignalLongPress,
    EndLongPress,
    StartMultiPress,
    AwaitMultiPressRelease,
    EndMultiPress,
}

impl SimulatorState {
    /// Returns `true` while a sequence is in flight.
    #[must_use]
    pub const fn is_running(self) -> bool {
        !matches!(self, SimulatorState::Idle)
    }

    const fn as_str(self) -> &'static str {
        match self {
            SimulatorState::Idle => "idle",
            SimulatorState::StartLongPress => "start-long-press",
            SimulatorState::SignalLongPress => "signal-long-press",
            SimulatorState::EndLongPress => "end-long-press",
            SimulatorState::StartMultiPress => "start-multi-press",
            SimulatorState::AwaitMultiPressRelease => "await-multi-press-release",
            SimulatorState::EndMultiPress => "end-multi-press",
        }
    }
}

impl fmt::Display for SimulatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons [`ButtonEventSimulator::execute`] refused to start.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum ExecuteError {
    #[error("invalid sequence: {0}")]
    InvalidConfig(#[from] SequenceConfigError),
    #[error("a sequence is already running")]
    Busy,
}

/// Button event sequencer bound to one endpoint.
pub struct ButtonEventSimulator<S, T, F>
where
    S: SwitchSink,
    T: TimerService,
    F: FnOnce(),
{
    endpoint: EndpointId,
    config: SequenceConfig,
    sink: S,
    timer: T,
    state: SimulatorState,
    presses_done: u8,
    on_done: Option<F>,
}

impl<S, T, F> ButtonEventSimulator<S, T, F>
where
    S: SwitchSink,
    T: TimerService,
    F: FnOnce(),
{
    /// Creates an idle simulator that reports to `sink` and schedules
    /// through `timer`.
    #[must_use]
    pub fn new(endpoint: EndpointId, config: SequenceConfig, sink: S, timer: T) -> Self {
        Self {
            endpoint,
            config,
            sink,
            timer,
            state: SimulatorState::Idle,
            presses_done: 0,
            on_done: None,
        }
    }

    /// Validates the configuration and runs the first step of the sequence.
    ///
    /// On error nothing was touched: no position change, no timer, and
    /// `on_done` is dropped without being called.
    pub fn execute(&mut self, on_done: F) -> Result<(), ExecuteError> {
        if self.state.is_running() {
            return Err(ExecuteError::Busy);
        }
        self.config.validate()?;

        let start = match self.config.mode {
            SequenceMode::LongPress(_) => SimulatorState::StartLongPress,
            SequenceMode::MultiPress(_) => SimulatorState::StartMultiPress,
        };
        self.presses_done = 0;
        self.on_done = Some(on_done);
        self.set_state(start);
        self.next();
        Ok(())
    }

    /// Advances the sequence after the armed timer fired.
    pub fn on_timer_expired(&mut self) {
        self.next();
    }

    #[must_use]
    pub fn state(&self) -> SimulatorState {
        self.state
    }

    /// Presses completed so far in the current multi-press burst.
    #[must_use]
    pub fn presses_done(&self) -> u8 {
        self.presses_done
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    #[must_use]
    pub fn endpoint(&self) -> EndpointId {
        self.endpoint
    }

    #[must_use]
    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    #[must_use]
    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Releases the sink and timer handles.
    #[must_use]
    pub fn into_parts(self) -> (S, T) {
        (self.sink, self.timer)
    }

    fn next(&mut self) {
        match (self.state, self.config.mode) {
            (SimulatorState::Idle, _) => {
                error!("endpoint {}: simulator stepped while idle", self.endpoint);
            }
            (SimulatorState::StartLongPress, SequenceMode::LongPress(timing)) => {
                self.start_long_press(timing);
            }
            (SimulatorState::SignalLongPress, SequenceMode::LongPress(timing)) => {
                self.signal_long_press(timing);
            }
            (SimulatorState::EndLongPress, SequenceMode::LongPress(_)) => self.end_long_press(),
            (SimulatorState::StartMultiPress, SequenceMode::MultiPress(timing)) => {
                self.start_multi_press(timing);
            }
            (SimulatorState::AwaitMultiPressRelease, SequenceMode::MultiPress(timing)) => {
                self.release_multi_press(timing);
            }
            (SimulatorState::EndMultiPress, SequenceMode::MultiPress(timing)) => {
                self.end_multi_press(timing);
            }
            (state, mode) => {
                error!(
                    "endpoint {}: state {} does not belong to {:?}",
                    self.endpoint, state, mode
                );
            }
        }
    }

    fn start_long_press(&mut self, timing: LongPressTiming) {
        let pressed = self.config.pressed_position;
        self.set_position(pressed);
        let number = self.sink.record_initial_press(pressed);
        self.report(SwitchEvent::InitialPress { new_position: pressed }, number);
        self.set_state(SimulatorState::SignalLongPress);
        self.timer.start_timer(timing.delay);
    }

    fn signal_long_press(&mut self, timing: LongPressTiming) {
        let pressed = self.config.pressed_position;
        let number = self.sink.record_long_press(pressed);
        self.report(SwitchEvent::LongPress { new_position: pressed }, number);
        self.set_state(SimulatorState::EndLongPress);
        self.timer.start_timer(timing.hold_after_signal());
    }

    fn end_long_press(&mut self) {
        let pressed = self.config.pressed_position;
        self.set_position(self.config.idle_position);
        if self.has_feature(SwitchFeatures::MOMENTARY_SWITCH_LONG_PRESS) {
            let number = self.sink.record_long_release(pressed);
            self.report(
                SwitchEvent::LongRelease {
                    previous_position: pressed,
                },
                number,
            );
        } else if self.has_feature(SwitchFeatures::MOMENTARY_SWITCH_RELEASE) {
            self.short_release(pressed);
        }
        self.finish();
    }

    fn start_multi_press(&mut self, timing: MultiPressTiming) {
        let pressed = self.config.pressed_position;
        self.set_position(pressed);
        let number = self.sink.record_initial_press(pressed);
        self.report(SwitchEvent::InitialPress { new_position: pressed }, number);

        if self.config.is_action_switch() {
            self.timer.start_timer(timing.all_cycles());
            self.set_state(SimulatorState::EndMultiPress);
        } else {
            self.set_state(SimulatorState::AwaitMultiPressRelease);
            self.timer.start_timer(timing.hold);
        }
    }

    fn release_multi_press(&mut self, timing: MultiPressTiming) {
        let pressed = self.config.pressed_position;
        self.presses_done = self.presses_done.saturating_add(1);
        let count = self.presses_done;
        if count > 1 {
            let number = self.sink.record_multi_press_ongoing(pressed, count);
            self.report(
                SwitchEvent::MultiPressOngoing {
                    new_position: pressed,
                    current_number_of_presses_counted: count,
                },
                number,
            );
        }

        if count == timing.presses {
            self.set_state(SimulatorState::EndMultiPress);
        } else {
            self.set_state(SimulatorState::StartMultiPress);
        }

        if self.has_feature(SwitchFeatures::MOMENTARY_SWITCH_RELEASE) {
            self.short_release(pressed);
        }
        self.set_position(self.config.idle_position);
        self.timer.start_timer(timing.gap);
    }

    fn end_multi_press(&mut self, timing: MultiPressTiming) {
        let pressed = self.config.pressed_position;
        let count = if self.config.is_action_switch() && timing.presses > timing.max {
            0
        } else {
            timing.presses
        };
        let number = self.sink.record_multi_press_complete(pressed, count);
        self.report(
            SwitchEvent::MultiPressComplete {
                previous_position: pressed,
                total_number_of_presses_counted: count,
            },
            number,
        );
        self.finish();
    }

    fn short_release(&mut self, pressed: u8) {
        let number = self.sink.record_short_release(pressed);
        self.report(
            SwitchEvent::ShortRelease {
                previous_position: pressed,
            },
            number,
        );
    }

    fn finish(&mut self) {
        self.set_state(SimulatorState::Idle);
        if let Some(on_done) = self.on_done.take() {
            on_done();
        }
    }

    fn set_position(&mut self, position: u8) {
        if let Err(err) = self.sink.set_position(position) {
            error!(
                "endpoint {}: failed to set position {}: {}",
                self.endpoint, position, err
            );
        }
    }

    fn report(&self, event: SwitchEvent, number: Option<EventNumber>) {
        match number {
            Some(number) => info!(
                "endpoint {}: logged {} as event #{}",
                self.endpoint, event, number
            ),
            None => debug!("endpoint {}: {} not recorded", self.endpoint, event),
        }
    }

    fn has_feature(&self, feature: SwitchFeatures) -> bool {
        self.config.features.contains(feature)
    }

    fn set_state(&mut self, next: SimulatorState) {
        if self.state != next {
            info!(
                "endpoint {}: simulator state {} -> {}",
                self.endpoint, self.state, next
            );
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::time::Duration;

    use super::*;
    use crate::switch::SwitchError;

    #[derive(Default)]
    struct CountingSink {
        positions: u8,
        events: u8,
    }

    impl SwitchSink for CountingSink {
        fn set_position(&mut self, _: u8) -> Result<(), SwitchError> {
            self.positions += 1;
            Ok(())
        }

        fn record_initial_press(&mut self, _: u8) -> Option<EventNumber> {
            self.events += 1;
            Some(u64::from(self.events))
        }

        fn record_long_press(&mut self, _: u8) -> Option<EventNumber> {
            self.events += 1;
            Some(u64::from(self.events))
        }

        fn record_long_release(&mut self, _: u8) -> Option<EventNumber> {
            self.events += 1;
            Some(u64::from(self.events))
        }

        fn record_short_release(&mut self, _: u8) -> Option<EventNumber> {
            None
        }

        fn record_multi_press_ongoing(&mut self, _: u8, _: u8) -> Option<EventNumber> {
            None
        }

        fn record_multi_press_complete(&mut self, _: u8, _: u8) -> Option<EventNumber> {
            None
        }
    }

    fn long_press_config() -> SequenceConfig {
        SequenceConfig::long_press(
            0,
            1,
            SwitchFeatures::MOMENTARY_SWITCH | SwitchFeatures::MOMENTARY_SWITCH_LONG_PRESS,
            LongPressTiming::new(Duration::from_millis(500), Duration::from_millis(2_000)),
        )
    }

    #[test]
    fn execute_runs_first_step_synchronously() {
        let done = Cell::new(false);
        let mut simulator = ButtonEventSimulator::new(
            7,
            long_press_config(),
            CountingSink::default(),
            OneShotTimer::new(),
        );

        simulator.execute(|| done.set(true)).unwrap();

        assert_eq!(simulator.state(), SimulatorState::SignalLongPress);
        assert_eq!(simulator.timer().pending(), Some(Duration::from_millis(500)));
        assert_eq!(simulator.sink().positions, 1);
        assert!(!done.get());
    }

    #[test]
    fn execute_while_running_is_busy() {
        let mut simulator: ButtonEventSimulator<_, _, fn()> = ButtonEventSimulator::new(
            7,
            long_press_config(),
            CountingSink::default(),
            OneShotTimer::new(),
        );

        simulator.execute(|| ()).unwrap();
        assert_eq!(simulator.execute(|| ()), Err(ExecuteError::Busy));
        assert_eq!(simulator.state(), SimulatorState::SignalLongPress);
    }

    #[test]
    fn stepping_while_idle_changes_nothing() {
        let mut simulator: ButtonEventSimulator<_, _, fn()> = ButtonEventSimulator::new(
            7,
            long_press_config(),
            CountingSink::default(),
            OneShotTimer::new(),
        );

        simulator.on_timer_expired();

        assert_eq!(simulator.state(), SimulatorState::Idle);
        assert!(!simulator.timer().is_armed());
        assert_eq!(simulator.sink().positions, 0);
    }

    #[test]
    fn simulator_is_reusable_after_completion() {
        let runs = Cell::new(0u8);
        let mut simulator = ButtonEventSimulator::new(
            7,
            long_press_config(),
            CountingSink::default(),
            OneShotTimer::new(),
        );

        for _ in 0..2 {
            simulator.execute(|| runs.set(runs.get() + 1)).unwrap();
            while simulator.timer_mut().take().is_some() {
                simulator.on_timer_expired();
            }
        }

        assert_eq!(runs.get(), 2);
        assert_eq!(simulator.sink().events, 6);
        assert!(!simulator.is_running());
    }
}
