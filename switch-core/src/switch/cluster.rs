use heapless::Vec;
use log::{debug, info};

use super::{
    AttributeId, AttributeValue, CLUSTER_REVISION, EVENT_LOG_CAPACITY, EndpointId, EventLog,
    EventNumber, MIN_MULTI_PRESS_MAX, MIN_NUMBER_OF_POSITIONS, SwitchAttribute, SwitchConfig,
    SwitchError, SwitchEvent, SwitchFeatures, SwitchSink,
};

/// Upper bound on the number of attributes a Switch instance can list.
pub const MAX_SWITCH_ATTRIBUTES: usize = 5;

/// In-memory Switch cluster server for a single endpoint.
///
/// Events are only generated between [`startup`](Self::startup) and
/// [`shutdown`](Self::shutdown); outside that window every `on_*` call
/// returns `None`.
pub struct SwitchCluster<const EVENTS: usize = EVENT_LOG_CAPACITY> {
    endpoint: EndpointId,
    features: SwitchFeatures,
    number_of_positions: u8,
    multi_press_max: u8,
    current_position: u8,
    data_version: u32,
    started: bool,
    events: EventLog<EVENTS>,
}

impl<const EVENTS: usize> SwitchCluster<EVENTS> {
    /// Validates the startup configuration and builds a stopped cluster.
    pub fn new(
        endpoint: EndpointId,
        features: SwitchFeatures,
        config: SwitchConfig,
    ) -> Result<Self, SwitchError> {
        if config.number_of_positions < MIN_NUMBER_OF_POSITIONS {
            return Err(SwitchError::TooFewPositions(config.number_of_positions));
        }
        if features.contains(SwitchFeatures::MOMENTARY_SWITCH_MULTI_PRESS)
            && config.multi_press_max < MIN_MULTI_PRESS_MAX
        {
            return Err(SwitchError::MultiPressMaxTooSmall(config.multi_press_max));
        }

        Ok(Self {
            endpoint,
            features,
            number_of_positions: config.number_of_positions,
            multi_press_max: config.multi_press_max,
            current_position: 0,
            data_version: 0,
            started: false,
            events: EventLog::new(),
        })
    }

    /// Enables event generation.
    pub fn startup(&mut self) {
        self.started = true;
    }

    /// Disables event generation.
    pub fn shutdown(&mut self) {
        self.started = false;
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn endpoint(&self) -> EndpointId {
        self.endpoint
    }

    #[must_use]
    pub fn features(&self) -> SwitchFeatures {
        self.features
    }

    #[must_use]
    pub fn number_of_positions(&self) -> u8 {
        self.number_of_positions
    }

    #[must_use]
    pub fn multi_press_max(&self) -> u8 {
        self.multi_press_max
    }

    #[must_use]
    pub fn current_position(&self) -> u8 {
        self.current_position
    }

    /// Data version, bumped whenever an attribute value changes.
    #[must_use]
    pub fn data_version(&self) -> u32 {
        self.data_version
    }

    /// Generated events retained by the cluster.
    #[must_use]
    pub fn events(&self) -> &EventLog<EVENTS> {
        &self.events
    }

    /// Lists the attributes this instance exposes, mandatory ones first.
    #[must_use]
    pub fn attributes(&self) -> Vec<SwitchAttribute, MAX_SWITCH_ATTRIBUTES> {
        let mut list = Vec::new();
        for attribute in SwitchAttribute::MANDATORY {
            // Capacity covers every Switch attribute.
            let _ = list.push(attribute);
        }
        if self.has_multi_press_max() {
            let _ = list.push(SwitchAttribute::MultiPressMax);
        }
        list
    }

    /// Reads an attribute by identifier.
    pub fn read_attribute(&self, id: AttributeId) -> Result<AttributeValue, SwitchError> {
        match SwitchAttribute::from_id(id) {
            Some(SwitchAttribute::ClusterRevision) => Ok(AttributeValue::U16(CLUSTER_REVISION)),
            Some(SwitchAttribute::FeatureMap) => Ok(AttributeValue::Bitmap(self.features.bits())),
            Some(SwitchAttribute::NumberOfPositions) => {
                Ok(AttributeValue::U8(self.number_of_positions))
            }
            Some(SwitchAttribute::CurrentPosition) => Ok(AttributeValue::U8(self.current_position)),
            // Readable even when the optional attribute is not listed.
            Some(SwitchAttribute::MultiPressMax) => Ok(AttributeValue::U8(self.multi_press_max)),
            None => Err(SwitchError::UnsupportedAttribute(id)),
        }
    }

    /// Sets the `CurrentPosition` attribute.
    pub fn set_current_position(&mut self, position: u8) -> Result<(), SwitchError> {
        if !self.position_is_valid(position) {
            return Err(SwitchError::InvalidPosition {
                position,
                number_of_positions: self.number_of_positions,
            });
        }

        if self.current_position != position {
            self.current_position = position;
            self.data_version = self.data_version.wrapping_add(1);
            debug!(
                "switch[{}]: CurrentPosition={} dataver={}",
                self.endpoint, position, self.data_version
            );
        }
        Ok(())
    }

    /// Reports a latching switch moving to `new_position`.
    pub fn on_switch_latch(&mut self, new_position: u8) -> Option<EventNumber> {
        self.generate(
            SwitchFeatures::LATCHING_SWITCH,
            SwitchEvent::SwitchLatched { new_position },
        )
    }

    /// Reports the start of a momentary press.
    pub fn on_initial_press(&mut self, new_position: u8) -> Option<EventNumber> {
        self.generate(
            SwitchFeatures::MOMENTARY_SWITCH,
            SwitchEvent::InitialPress { new_position },
        )
    }

    /// Reports a momentary press held for a "long" time.
    pub fn on_long_press(&mut self, new_position: u8) -> Option<EventNumber> {
        self.generate(
            SwitchFeatures::MOMENTARY_SWITCH_LONG_PRESS,
            SwitchEvent::LongPress { new_position },
        )
    }

    /// Reports the release of a short momentary press.
    pub fn on_short_release(&mut self, previous_position: u8) -> Option<EventNumber> {
        self.generate(
            SwitchFeatures::MOMENTARY_SWITCH_RELEASE,
            SwitchEvent::ShortRelease { previous_position },
        )
    }

    /// Reports the release of a long momentary press.
    pub fn on_long_release(&mut self, previous_position: u8) -> Option<EventNumber> {
        self.generate(
            SwitchFeatures::MOMENTARY_SWITCH_LONG_PRESS,
            SwitchEvent::LongRelease { previous_position },
        )
    }

    /// Reports the running press count of a multi-press sequence.
    ///
    /// Action switches never report intermediate counts.
    pub fn on_multi_press_ongoing(&mut self, new_position: u8, count: u8) -> Option<EventNumber> {
        if self.features.contains(SwitchFeatures::ACTION_SWITCH) {
            return None;
        }
        self.generate(
            SwitchFeatures::MOMENTARY_SWITCH_MULTI_PRESS,
            SwitchEvent::MultiPressOngoing {
                new_position,
                current_number_of_presses_counted: count,
            },
        )
    }

    /// Reports the final press count once a multi-press sequence ended.
    pub fn on_multi_press_complete(
        &mut self,
        previous_position: u8,
        count: u8,
    ) -> Option<EventNumber> {
        self.generate(
            SwitchFeatures::MOMENTARY_SWITCH_MULTI_PRESS,
            SwitchEvent::MultiPressComplete {
                previous_position,
                total_number_of_presses_counted: count,
            },
        )
    }

    fn has_multi_press_max(&self) -> bool {
        self.features
            .contains(SwitchFeatures::MOMENTARY_SWITCH_MULTI_PRESS)
    }

    fn position_is_valid(&self, position: u8) -> bool {
        position < self.number_of_positions
    }

    fn generate(&mut self, required: SwitchFeatures, event: SwitchEvent) -> Option<EventNumber> {
        if !self.started || !self.features.contains(required) {
            return None;
        }
        if !self.position_is_valid(event.position()) {
            return None;
        }

        let number = self.events.record(self.endpoint, event);
        info!("switch[{}]: event #{} {}", self.endpoint, number, event);
        Some(number)
    }
}

impl<const EVENTS: usize> SwitchSink for SwitchCluster<EVENTS> {
    fn set_position(&mut self, position: u8) -> Result<(), SwitchError> {
        self.set_current_position(position)
    }

    fn record_initial_press(&mut self, new_position: u8) -> Option<EventNumber> {
        self.on_initial_press(new_position)
    }

    fn record_long_press(&mut self, new_position: u8) -> Option<EventNumber> {
        self.on_long_press(new_position)
    }

    fn record_long_release(&mut self, previous_position: u8) -> Option<EventNumber> {
        self.on_long_release(previous_position)
    }

    fn record_short_release(&mut self, previous_position: u8) -> Option<EventNumber> {
        self.on_short_release(previous_position)
    }

    fn record_multi_press_ongoing(&mut self, new_position: u8, count: u8) -> Option<EventNumber> {
        self.on_multi_press_ongoing(new_position, count)
    }

    fn record_multi_press_complete(
        &mut self,
        previous_position: u8,
        count: u8,
    ) -> Option<EventNumber> {
        self.on_multi_press_complete(previous_position, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn momentary_all() -> SwitchFeatures {
        SwitchFeatures::MOMENTARY_SWITCH
            | SwitchFeatures::MOMENTARY_SWITCH_RELEASE
            | SwitchFeatures::MOMENTARY_SWITCH_LONG_PRESS
            | SwitchFeatures::MOMENTARY_SWITCH_MULTI_PRESS
    }

    #[test]
    fn rejects_single_position_switch() {
        let result =
            SwitchCluster::<8>::new(1, SwitchFeatures::empty(), SwitchConfig::new(1, 0));
        assert!(matches!(result, Err(SwitchError::TooFewPositions(1))));
    }

    #[test]
    fn multi_press_requires_max_of_two() {
        let result = SwitchCluster::<8>::new(
            1,
            SwitchFeatures::MOMENTARY_SWITCH_MULTI_PRESS,
            SwitchConfig::new(2, 1),
        );
        assert!(matches!(result, Err(SwitchError::MultiPressMaxTooSmall(1))));

        // Without the feature the max is not inspected.
        let plain = SwitchCluster::<8>::new(1, SwitchFeatures::empty(), SwitchConfig::new(2, 0));
        assert!(plain.is_ok());
    }

    #[test]
    fn data_version_only_moves_on_change() {
        let mut cluster =
            SwitchCluster::<8>::new(1, SwitchFeatures::empty(), SwitchConfig::new(2, 0)).unwrap();
        cluster.set_current_position(0).unwrap();
        assert_eq!(cluster.data_version(), 0);

        cluster.set_current_position(1).unwrap();
        assert_eq!(cluster.data_version(), 1);
        cluster.set_current_position(1).unwrap();
        assert_eq!(cluster.data_version(), 1);
    }

    #[test]
    fn events_need_startup() {
        let mut cluster =
            SwitchCluster::<8>::new(1, momentary_all(), SwitchConfig::new(2, 2)).unwrap();
        assert_eq!(cluster.on_initial_press(1), None);

        cluster.startup();
        assert_eq!(cluster.on_initial_press(1), Some(0));

        cluster.shutdown();
        assert_eq!(cluster.on_short_release(1), None);
        assert_eq!(cluster.events().len(), 1);
    }

    #[test]
    fn action_switch_suppresses_ongoing_reports() {
        let mut cluster = SwitchCluster::<8>::new(
            1,
            momentary_all() | SwitchFeatures::ACTION_SWITCH,
            SwitchConfig::new(2, 2),
        )
        .unwrap();
        cluster.startup();

        assert_eq!(cluster.on_multi_press_ongoing(1, 2), None);
        assert!(cluster.on_multi_press_complete(1, 2).is_some());
    }
}
