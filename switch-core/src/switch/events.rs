//! Switch cluster event catalog and the bounded log that numbers them.
//!
//! Event identifiers follow the Matter Switch cluster definition so records
//! can be matched against controller-side logs. The log keeps the most recent
//! records in a fixed-size ring and hands out monotonically increasing event
//! numbers, mirroring what the interaction model event generator returns.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use super::EndpointId;

/// Event number assigned by the log when an event is generated.
pub type EventNumber = u64;

/// Number of event records retained in memory.
pub const EVENT_LOG_CAPACITY: usize = 64;

/// Events emitted by the Switch cluster.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SwitchEvent {
    SwitchLatched {
        new_position: u8,
    },
    InitialPress {
        new_position: u8,
    },
    LongPress {
        new_position: u8,
    },
    ShortRelease {
        previous_position: u8,
    },
    LongRelease {
        previous_position: u8,
    },
    MultiPressOngoing {
        new_position: u8,
        current_number_of_presses_counted: u8,
    },
    MultiPressComplete {
        previous_position: u8,
        total_number_of_presses_counted: u8,
    },
}

impl SwitchEvent {
    const SWITCH_LATCHED_ID: u32 = 0x00;
    const INITIAL_PRESS_ID: u32 = 0x01;
    const LONG_PRESS_ID: u32 = 0x02;
    const SHORT_RELEASE_ID: u32 = 0x03;
    const LONG_RELEASE_ID: u32 = 0x04;
    const MULTI_PRESS_ONGOING_ID: u32 = 0x05;
    const MULTI_PRESS_COMPLETE_ID: u32 = 0x06;

    /// Cluster-scoped event identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        match self {
            SwitchEvent::SwitchLatched { .. } => Self::SWITCH_LATCHED_ID,
            SwitchEvent::InitialPress { .. } => Self::INITIAL_PRESS_ID,
            SwitchEvent::LongPress { .. } => Self::LONG_PRESS_ID,
            SwitchEvent::ShortRelease { .. } => Self::SHORT_RELEASE_ID,
            SwitchEvent::LongRelease { .. } => Self::LONG_RELEASE_ID,
            SwitchEvent::MultiPressOngoing { .. } => Self::MULTI_PRESS_ONGOING_ID,
            SwitchEvent::MultiPressComplete { .. } => Self::MULTI_PRESS_COMPLETE_ID,
        }
    }

    /// Event name as it appears in the cluster definition.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SwitchEvent::SwitchLatched { .. } => "SwitchLatched",
            SwitchEvent::InitialPress { .. } => "InitialPress",
            SwitchEvent::LongPress { .. } => "LongPress",
            SwitchEvent::ShortRelease { .. } => "ShortRelease",
            SwitchEvent::LongRelease { .. } => "LongRelease",
            SwitchEvent::MultiPressOngoing { .. } => "MultiPressOngoing",
            SwitchEvent::MultiPressComplete { .. } => "MultiPressComplete",
        }
    }

    /// Position carried by the event payload.
    #[must_use]
    pub const fn position(self) -> u8 {
        match self {
            SwitchEvent::SwitchLatched { new_position }
            | SwitchEvent::InitialPress { new_position }
            | SwitchEvent::LongPress { new_position }
            | SwitchEvent::MultiPressOngoing { new_position, .. } => new_position,
            SwitchEvent::ShortRelease { previous_position }
            | SwitchEvent::LongRelease { previous_position }
            | SwitchEvent::MultiPressComplete {
                previous_position, ..
            } => previous_position,
        }
    }
}

impl fmt::Display for SwitchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchEvent::MultiPressOngoing {
                new_position,
                current_number_of_presses_counted,
            } => write!(
                f,
                "MultiPressOngoing({new_position}, count={current_number_of_presses_counted})"
            ),
            SwitchEvent::MultiPressComplete {
                previous_position,
                total_number_of_presses_counted,
            } => write!(
                f,
                "MultiPressComplete({previous_position}, count={total_number_of_presses_counted})"
            ),
            other => write!(f, "{}({})", other.name(), other.position()),
        }
    }
}

/// Event stored in the log.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EventRecord {
    pub number: EventNumber,
    pub endpoint: EndpointId,
    pub event: SwitchEvent,
}

/// Fixed-capacity record of generated switch events.
pub struct EventLog<const CAPACITY: usize = EVENT_LOG_CAPACITY> {
    ring: HistoryBuf<EventRecord, CAPACITY>,
    next_number: EventNumber,
}

impl<const CAPACITY: usize> EventLog<CAPACITY> {
    /// Creates an empty log whose first event will be numbered `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates an empty log starting at the provided event number.
    #[must_use]
    pub const fn starting_at(first: EventNumber) -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_number: first,
        }
    }

    /// Appends an event and returns the number assigned to it.
    pub fn record(&mut self, endpoint: EndpointId, event: SwitchEvent) -> EventNumber {
        let number = self.next_number;
        self.next_number = self.next_number.wrapping_add(1);
        self.ring.write(EventRecord {
            number,
            endpoint,
            event,
        });
        number
    }

    /// Returns the retained records in chronological order.
    #[must_use]
    pub fn oldest_first(&self) -> OldestOrdered<'_, EventRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns retained records numbered strictly after `after`, or all of
    /// them when `after` is `None`.
    pub fn since(&self, after: Option<EventNumber>) -> impl Iterator<Item = &EventRecord> + '_ {
        self.ring
            .oldest_ordered()
            .filter(move |record| after.is_none_or(|number| record.number > number))
    }

    /// Returns the most recent record, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&EventRecord> {
        self.ring.recent()
    }

    /// Number of the most recently generated event, if any.
    #[must_use]
    pub fn last_number(&self) -> Option<EventNumber> {
        self.latest().map(|record| record.number)
    }

    /// Number of records currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no records are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<const CAPACITY: usize> Default for EventLog<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ids_follow_cluster_definition() {
        assert_eq!(SwitchEvent::SwitchLatched { new_position: 0 }.id(), 0x00);
        assert_eq!(SwitchEvent::InitialPress { new_position: 0 }.id(), 0x01);
        assert_eq!(SwitchEvent::LongPress { new_position: 0 }.id(), 0x02);
        assert_eq!(
            SwitchEvent::ShortRelease {
                previous_position: 0
            }
            .id(),
            0x03
        );
        assert_eq!(
            SwitchEvent::LongRelease {
                previous_position: 0
            }
            .id(),
            0x04
        );
        assert_eq!(
            SwitchEvent::MultiPressOngoing {
                new_position: 0,
                current_number_of_presses_counted: 2
            }
            .id(),
            0x05
        );
        assert_eq!(
            SwitchEvent::MultiPressComplete {
                previous_position: 0,
                total_number_of_presses_counted: 2
            }
            .id(),
            0x06
        );
    }

    #[test]
    fn log_numbers_increase_and_keep_latest() {
        let mut log = EventLog::<2>::new();
        let first = log.record(1, SwitchEvent::InitialPress { new_position: 1 });
        let second = log.record(1, SwitchEvent::LongPress { new_position: 1 });
        let third = log.record(
            1,
            SwitchEvent::LongRelease {
                previous_position: 1,
            },
        );

        assert_eq!((first, second, third), (0, 1, 2));
        assert_eq!(log.len(), 2);
        assert_eq!(log.last_number(), Some(2));

        let mut retained = log.oldest_first();
        assert_eq!(retained.next().map(|record| record.number), Some(1));
        assert_eq!(retained.next().map(|record| record.number), Some(2));
        assert!(retained.next().is_none());
    }

    #[test]
    fn since_skips_already_seen_records() {
        let mut log = EventLog::<8>::starting_at(10);
        log.record(3, SwitchEvent::InitialPress { new_position: 1 });
        log.record(
            3,
            SwitchEvent::ShortRelease {
                previous_position: 1,
            },
        );

        assert_eq!(log.since(None).count(), 2);
        let unseen: heapless::Vec<EventNumber, 4> =
            log.since(Some(10)).map(|record| record.number).collect();
        assert_eq!(unseen.as_slice(), &[11]);
        assert_eq!(log.since(Some(11)).count(), 0);
    }

    #[test]
    fn display_includes_counts_for_multi_press() {
        let mut text: heapless::String<48> = heapless::String::new();
        core::fmt::write(
            &mut text,
            format_args!(
                "{}",
                SwitchEvent::MultiPressComplete {
                    previous_position: 1,
                    total_number_of_presses_counted: 3,
                }
            ),
        )
        .unwrap();
        assert_eq!(text.as_str(), "MultiPressComplete(1, count=3)");
    }
}
