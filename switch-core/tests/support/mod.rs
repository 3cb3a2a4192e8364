#![allow(dead_code)]

use core::time::Duration;

use switch_core::simulator::{ButtonEventSimulator, OneShotTimer};
use switch_core::switch::{EventNumber, SwitchError, SwitchEvent, SwitchSink};

/// Call observed by [`RecordingSink`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Call {
    SetPosition(u8),
    Event(SwitchEvent),
}

/// Sink that accepts everything and timestamps each call with a virtual clock.
#[derive(Default)]
pub struct RecordingSink {
    pub now: Duration,
    pub calls: Vec<(Duration, Call)>,
    /// Positions at or above this value are refused by `set_position`.
    pub positions: Option<u8>,
    next_number: EventNumber,
}

impl RecordingSink {
    pub fn with_positions(positions: u8) -> Self {
        Self {
            positions: Some(positions),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<SwitchEvent> {
        self.calls
            .iter()
            .filter_map(|(_, call)| match call {
                Call::Event(event) => Some(*event),
                Call::SetPosition(_) => None,
            })
            .collect()
    }

    pub fn calls_at(&self, at: Duration) -> Vec<Call> {
        self.calls
            .iter()
            .filter(|(time, _)| *time == at)
            .map(|(_, call)| *call)
            .collect()
    }

    fn event(&mut self, event: SwitchEvent) -> Option<EventNumber> {
        self.calls.push((self.now, Call::Event(event)));
        let number = self.next_number;
        self.next_number += 1;
        Some(number)
    }
}

impl SwitchSink for RecordingSink {
    fn set_position(&mut self, position: u8) -> Result<(), SwitchError> {
        if let Some(number_of_positions) = self.positions
            && position >= number_of_positions
        {
            return Err(SwitchError::InvalidPosition {
                position,
                number_of_positions,
            });
        }
        self.calls.push((self.now, Call::SetPosition(position)));
        Ok(())
    }

    fn record_initial_press(&mut self, new_position: u8) -> Option<EventNumber> {
        self.event(SwitchEvent::InitialPress { new_position })
    }

    fn record_long_press(&mut self, new_position: u8) -> Option<EventNumber> {
        self.event(SwitchEvent::LongPress { new_position })
    }

    fn record_long_release(&mut self, previous_position: u8) -> Option<EventNumber> {
        self.event(SwitchEvent::LongRelease { previous_position })
    }

    fn record_short_release(&mut self, previous_position: u8) -> Option<EventNumber> {
        self.event(SwitchEvent::ShortRelease { previous_position })
    }

    fn record_multi_press_ongoing(&mut self, new_position: u8, count: u8) -> Option<EventNumber> {
        self.event(SwitchEvent::MultiPressOngoing {
            new_position,
            current_number_of_presses_counted: count,
        })
    }

    fn record_multi_press_complete(
        &mut self,
        previous_position: u8,
        count: u8,
    ) -> Option<EventNumber> {
        self.event(SwitchEvent::MultiPressComplete {
            previous_position,
            total_number_of_presses_counted: count,
        })
    }
}

/// Fires armed timers until none is left, advancing the sink clock.
pub fn drive<F: FnOnce()>(
    simulator: &mut ButtonEventSimulator<RecordingSink, OneShotTimer, F>,
) -> Duration {
    while let Some(duration) = simulator.timer_mut().take() {
        simulator.sink_mut().now += duration;
        simulator.on_timer_expired();
    }
    simulator.sink().now
}

pub const fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
