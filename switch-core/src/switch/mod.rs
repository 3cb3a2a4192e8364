//! Matter Switch cluster server model and the sink interface the sequencer
//! drives.
//!
//! The cluster keeps the attribute values of a single Switch endpoint and
//! generates feature-gated events into a bounded [`EventLog`]. The simulator
//! only sees the [`SwitchSink`] trait, so tests and embedders can swap the
//! cluster for their own recording or forwarding sink.

use thiserror::Error;

mod cluster;
pub mod events;

pub use cluster::SwitchCluster;
pub use events::{EVENT_LOG_CAPACITY, EventLog, EventNumber, EventRecord, SwitchEvent};

/// Endpoint identifier the cluster instance is bound to.
pub type EndpointId = u16;

/// Attribute identifier within the Switch cluster.
pub type AttributeId = u32;

/// Revision of the Switch cluster implemented here.
pub const CLUSTER_REVISION: u16 = 2;

/// Smallest position count a switch may declare.
pub const MIN_NUMBER_OF_POSITIONS: u8 = 2;

/// Smallest `MultiPressMax` accepted when the multi-press feature is enabled.
pub const MIN_MULTI_PRESS_MAX: u8 = 2;

bitflags::bitflags! {
    /// Feature map bits of the Switch cluster.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct SwitchFeatures: u32 {
        const LATCHING_SWITCH = 0x01;
        const MOMENTARY_SWITCH = 0x02;
        const MOMENTARY_SWITCH_RELEASE = 0x04;
        const MOMENTARY_SWITCH_LONG_PRESS = 0x08;
        const MOMENTARY_SWITCH_MULTI_PRESS = 0x10;
        const ACTION_SWITCH = 0x20;
    }
}

impl SwitchFeatures {
    /// Short lowercase tags accepted on the command line, paired with their bit.
    pub const TAGS: [(&'static str, SwitchFeatures); 6] = [
        ("latching", SwitchFeatures::LATCHING_SWITCH),
        ("momentary", SwitchFeatures::MOMENTARY_SWITCH),
        ("release", SwitchFeatures::MOMENTARY_SWITCH_RELEASE),
        ("long-press", SwitchFeatures::MOMENTARY_SWITCH_LONG_PRESS),
        ("multi-press", SwitchFeatures::MOMENTARY_SWITCH_MULTI_PRESS),
        ("action", SwitchFeatures::ACTION_SWITCH),
    ];

    /// Looks up a single feature by its tag (case-insensitive).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::TAGS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tag))
            .map(|(_, feature)| *feature)
    }

    /// Returns the tag for a single feature bit.
    #[must_use]
    pub fn tag(self) -> Option<&'static str> {
        Self::TAGS
            .iter()
            .find(|(_, feature)| *feature == self)
            .map(|(name, _)| *name)
    }
}

/// Attributes exposed by the Switch cluster.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SwitchAttribute {
    NumberOfPositions,
    CurrentPosition,
    MultiPressMax,
    FeatureMap,
    ClusterRevision,
}

impl SwitchAttribute {
    /// Attributes every Switch cluster instance exposes.
    pub const MANDATORY: [SwitchAttribute; 4] = [
        SwitchAttribute::NumberOfPositions,
        SwitchAttribute::CurrentPosition,
        SwitchAttribute::FeatureMap,
        SwitchAttribute::ClusterRevision,
    ];

    #[must_use]
    pub const fn id(self) -> AttributeId {
        match self {
            SwitchAttribute::NumberOfPositions => 0x0000,
            SwitchAttribute::CurrentPosition => 0x0001,
            SwitchAttribute::MultiPressMax => 0x0002,
            SwitchAttribute::FeatureMap => 0xFFFC,
            SwitchAttribute::ClusterRevision => 0xFFFD,
        }
    }

    #[must_use]
    pub const fn from_id(id: AttributeId) -> Option<Self> {
        match id {
            0x0000 => Some(SwitchAttribute::NumberOfPositions),
            0x0001 => Some(SwitchAttribute::CurrentPosition),
            0x0002 => Some(SwitchAttribute::MultiPressMax),
            0xFFFC => Some(SwitchAttribute::FeatureMap),
            0xFFFD => Some(SwitchAttribute::ClusterRevision),
            _ => None,
        }
    }
}

/// Value read back from a Switch attribute.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttributeValue {
    U8(u8),
    U16(u16),
    Bitmap(u32),
}

/// Startup parameters of a Switch cluster instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SwitchConfig {
    pub number_of_positions: u8,
    pub multi_press_max: u8,
}

impl SwitchConfig {
    #[must_use]
    pub const fn new(number_of_positions: u8, multi_press_max: u8) -> Self {
        Self {
            number_of_positions,
            multi_press_max,
        }
    }
}

/// Errors reported by the Switch cluster.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum SwitchError {
    #[error("position {position} outside 0..{number_of_positions}")]
    InvalidPosition {
        position: u8,
        number_of_positions: u8,
    },
    #[error("switch needs at least 2 positions, got {0}")]
    TooFewPositions(u8),
    #[error("multi-press switch needs MultiPressMax >= 2, got {0}")]
    MultiPressMaxTooSmall(u8),
    #[error("unsupported attribute {0:#06x}")]
    UnsupportedAttribute(AttributeId),
}

/// Sink receiving the position changes and events synthesized by the simulator.
///
/// Every `record_*` call returns `None` when the sink cannot represent the
/// event for its current configuration. That is a normal outcome.
pub trait SwitchSink {
    /// Updates the reported current position.
    fn set_position(&mut self, position: u8) -> Result<(), SwitchError>;

    fn record_initial_press(&mut self, new_position: u8) -> Option<EventNumber>;

    fn record_long_press(&mut self, new_position: u8) -> Option<EventNumber>;

    fn record_long_release(&mut self, previous_position: u8) -> Option<EventNumber>;

    fn record_short_release(&mut self, previous_position: u8) -> Option<EventNumber>;

    fn record_multi_press_ongoing(&mut self, new_position: u8, count: u8) -> Option<EventNumber>;

    fn record_multi_press_complete(
        &mut self,
        previous_position: u8,
        count: u8,
    ) -> Option<EventNumber>;
}

impl<T> SwitchSink for &mut T
where
    T: SwitchSink + ?Sized,
{
    fn set_position(&mut self, position: u8) -> Result<(), SwitchError> {
        (**self).set_position(position)
    }

    fn record_initial_press(&mut self, new_position: u8) -> Option<EventNumber> {
        (**self).record_initial_press(new_position)
    }

    fn record_long_press(&mut self, new_position: u8) -> Option<EventNumber> {
        (**self).record_long_press(new_position)
    }

    fn record_long_release(&mut self, previous_position: u8) -> Option<EventNumber> {
        (**self).record_long_release(previous_position)
    }

    fn record_short_release(&mut self, previous_position: u8) -> Option<EventNumber> {
        (**self).record_short_release(previous_position)
    }

    fn record_multi_press_ongoing(&mut self, new_position: u8, count: u8) -> Option<EventNumber> {
        (**self).record_multi_press_ongoing(new_position, count)
    }

    fn record_multi_press_complete(
        &mut self,
        previous_position: u8,
        count: u8,
    ) -> Option<EventNumber> {
        (**self).record_multi_press_complete(previous_position, count)
    }
}
