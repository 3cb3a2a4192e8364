//! High-level REPL command dispatcher.
//!
//! This module glues parsed commands to the Switch cluster: simulation
//! commands are resolved into [`SequenceConfig`] values for the caller to run,
//! while `latch`, `status`, `events` and `help` are answered directly. It
//! stays `no_std` friendly so any front-end can share it.

use core::fmt;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use thiserror::Error;

use crate::sequences::{LongPressTiming, MultiPressTiming, SequenceConfig};
use crate::switch::{
    EVENT_LOG_CAPACITY, EndpointId, EventNumber, EventRecord, SwitchCluster, SwitchError,
    SwitchFeatures,
};

use super::catalog::{self, CommandSpec};
use super::grammar::{self, Command, LongPressCommand, MultiPressCommand};

/// Values used when a simulation command omits an argument.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SimulationDefaults {
    pub idle_position: u8,
    pub pressed_position: u8,
    pub long_press_delay: Duration,
    pub long_press_duration: Duration,
    pub multi_press_count: u8,
    pub multi_press_hold: Duration,
    pub multi_press_gap: Duration,
}

impl SimulationDefaults {
    pub const DEFAULT: Self = Self {
        idle_position: 0,
        pressed_position: 1,
        long_press_delay: Duration::from_millis(500),
        long_press_duration: Duration::from_millis(2_000),
        multi_press_count: 2,
        multi_press_hold: Duration::from_millis(300),
        multi_press_gap: Duration::from_millis(200),
    };

    /// Returns the defaults with a different idle position.
    #[must_use]
    pub const fn with_idle_position(self, idle_position: u8) -> Self {
        Self {
            idle_position,
            ..self
        }
    }
}

impl Default for SimulationDefaults {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Attribute snapshot returned by `status`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SwitchStatus {
    pub endpoint: EndpointId,
    pub features: SwitchFeatures,
    pub number_of_positions: u8,
    pub current_position: u8,
    pub multi_press_max: Option<u8>,
    pub data_version: u32,
}

impl fmt::Display for SwitchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "endpoint={} positions={} current={} features=",
            self.endpoint, self.number_of_positions, self.current_position
        )?;
        write_features(f, self.features)?;
        if let Some(max) = self.multi_press_max {
            write!(f, " multi-press-max={max}")?;
        }
        write!(f, " dataver={}", self.data_version)
    }
}

/// Writes a feature set as `tag|tag`, or `none` when empty.
pub fn write_features(f: &mut impl fmt::Write, features: SwitchFeatures) -> fmt::Result {
    let mut first = true;
    for (tag, feature) in SwitchFeatures::TAGS {
        if features.contains(feature) {
            if !first {
                f.write_char('|')?;
            }
            f.write_str(tag)?;
            first = false;
        }
    }
    if first {
        f.write_str("none")?;
    }
    Ok(())
}

/// Events returned by a single `events` command.
pub type EventBatch = HeaplessVec<EventRecord, EVENT_LOG_CAPACITY>;

/// Command execution successes.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    /// Validated parameters of a sequence the caller should run.
    Sequence(SequenceConfig),
    Latched {
        position: u8,
        event: Option<EventNumber>,
    },
    Status(SwitchStatus),
    Events(EventBatch),
    /// `None` lists the whole catalog.
    Help(Option<&'static CommandSpec>),
}

/// Errors surfaced while executing a command.
#[derive(Debug, PartialEq, Error)]
pub enum CommandError<'a> {
    #[error(transparent)]
    Parse(#[from] grammar::ParseError<'a>),
    #[error(transparent)]
    Switch(#[from] SwitchError),
    #[error("no help for `{0}`")]
    UnknownTopic(&'a str),
}

/// Dispatches REPL commands against a Switch cluster.
pub struct CommandExecutor {
    cluster: SwitchCluster,
    defaults: SimulationDefaults,
    last_reported: Option<EventNumber>,
}

impl CommandExecutor {
    /// Creates a new executor around the provided cluster.
    #[must_use]
    pub const fn new(cluster: SwitchCluster, defaults: SimulationDefaults) -> Self {
        Self {
            cluster,
            defaults,
            last_reported: None,
        }
    }

    #[must_use]
    pub fn cluster(&self) -> &SwitchCluster {
        &self.cluster
    }

    /// Returns the cluster, typically to hand it to a simulator as its sink.
    pub fn cluster_mut(&mut self) -> &mut SwitchCluster {
        &mut self.cluster
    }

    #[must_use]
    pub fn defaults(&self) -> &SimulationDefaults {
        &self.defaults
    }

    /// Consumes the executor and yields the inner cluster.
    #[must_use]
    pub fn into_inner(self) -> SwitchCluster {
        self.cluster
    }

    /// Parses and executes a REPL command.
    pub fn execute<'a>(&mut self, line: &'a str) -> Result<CommandOutcome, CommandError<'a>> {
        let command = grammar::parse(line)?;
        self.dispatch(command)
    }

    /// Executes an already parsed command.
    pub fn dispatch<'a>(
        &mut self,
        command: Command<'a>,
    ) -> Result<CommandOutcome, CommandError<'a>> {
        match command {
            Command::LongPress(args) => Ok(CommandOutcome::Sequence(self.long_press(args)?)),
            Command::MultiPress(args) => Ok(CommandOutcome::Sequence(self.multi_press(args)?)),
            Command::Latch(args) => {
                self.cluster.set_current_position(args.position)?;
                let event = self.cluster.on_switch_latch(args.position);
                Ok(CommandOutcome::Latched {
                    position: args.position,
                    event,
                })
            }
            Command::Status => Ok(CommandOutcome::Status(self.status())),
            Command::Events => Ok(CommandOutcome::Events(self.unreported_events())),
            Command::Help(help) => match help.topic {
                None => Ok(CommandOutcome::Help(None)),
                Some(topic) => catalog::find(topic)
                    .map(|spec| CommandOutcome::Help(Some(spec)))
                    .ok_or(CommandError::UnknownTopic(topic)),
            },
        }
    }

    /// Resolves `long-press` arguments against the defaults and the cluster.
    pub fn long_press(&self, args: LongPressCommand) -> Result<SequenceConfig, SwitchError> {
        let pressed = self.pressed_position(args.position)?;
        let timing = LongPressTiming::new(
            args.delay.unwrap_or(self.defaults.long_press_delay),
            args.duration.unwrap_or(self.defaults.long_press_duration),
        );
        Ok(SequenceConfig::long_press(
            self.defaults.idle_position,
            pressed,
            self.cluster.features(),
            timing,
        ))
    }

    /// Resolves `multi-press` arguments against the defaults and the cluster.
    pub fn multi_press(&self, args: MultiPressCommand) -> Result<SequenceConfig, SwitchError> {
        let pressed = self.pressed_position(args.position)?;
        let timing = MultiPressTiming::new(
            args.hold.unwrap_or(self.defaults.multi_press_hold),
            args.gap.unwrap_or(self.defaults.multi_press_gap),
            args.count.unwrap_or(self.defaults.multi_press_count),
            self.cluster.multi_press_max(),
        );
        Ok(SequenceConfig::multi_press(
            self.defaults.idle_position,
            pressed,
            self.cluster.features(),
            timing,
        ))
    }

    /// Snapshot of the cluster attributes.
    #[must_use]
    pub fn status(&self) -> SwitchStatus {
        let features = self.cluster.features();
        SwitchStatus {
            endpoint: self.cluster.endpoint(),
            features,
            number_of_positions: self.cluster.number_of_positions(),
            current_position: self.cluster.current_position(),
            multi_press_max: features
                .contains(SwitchFeatures::MOMENTARY_SWITCH_MULTI_PRESS)
                .then_some(self.cluster.multi_press_max()),
            data_version: self.cluster.data_version(),
        }
    }

    /// Returns the events generated since the previous call.
    pub fn unreported_events(&mut self) -> EventBatch {
        let batch: EventBatch = self
            .cluster
            .events()
            .since(self.last_reported)
            .copied()
            .collect();
        if let Some(last) = batch.last() {
            self.last_reported = Some(last.number);
        }
        batch
    }

    fn pressed_position(&self, requested: Option<u8>) -> Result<u8, SwitchError> {
        let position = requested.unwrap_or(self.defaults.pressed_position);
        let number_of_positions = self.cluster.number_of_positions();
        if position < number_of_positions {
            Ok(position)
        } else {
            Err(SwitchError::InvalidPosition {
                position,
                number_of_positions,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequences::SequenceMode;
    use crate::switch::SwitchConfig;

    fn executor(features: SwitchFeatures, positions: u8) -> CommandExecutor {
        let mut cluster = SwitchCluster::new(1, features, SwitchConfig::new(positions, 3)).unwrap();
        cluster.startup();
        CommandExecutor::new(cluster, SimulationDefaults::DEFAULT)
    }

    fn momentary() -> SwitchFeatures {
        SwitchFeatures::MOMENTARY_SWITCH
            | SwitchFeatures::MOMENTARY_SWITCH_RELEASE
            | SwitchFeatures::MOMENTARY_SWITCH_MULTI_PRESS
    }

    #[test]
    fn long_press_fills_in_defaults() {
        let mut executor = executor(momentary(), 2);
        let outcome = executor.execute("long-press delay=1s").unwrap();

        let CommandOutcome::Sequence(config) = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(config.idle_position, 0);
        assert_eq!(config.pressed_position, 1);
        assert_eq!(config.features, momentary());
        assert_eq!(
            config.mode,
            SequenceMode::LongPress(LongPressTiming::new(
                Duration::from_secs(1),
                Duration::from_millis(2_000)
            ))
        );
    }

    #[test]
    fn multi_press_takes_max_from_cluster() {
        let mut executor = executor(momentary(), 3);
        let outcome = executor.execute("multi-press position=2 count=4").unwrap();

        let CommandOutcome::Sequence(config) = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(config.pressed_position, 2);
        assert_eq!(
            config.mode,
            SequenceMode::MultiPress(MultiPressTiming::new(
                Duration::from_millis(300),
                Duration::from_millis(200),
                4,
                3
            ))
        );
    }

    #[test]
    fn pressed_position_must_exist() {
        let mut executor = executor(momentary(), 2);
        assert_eq!(
            executor.execute("long-press position=2"),
            Err(CommandError::Switch(SwitchError::InvalidPosition {
                position: 2,
                number_of_positions: 2,
            }))
        );
    }

    #[test]
    fn command_errors_display_their_cause() {
        let mut executor = executor(momentary(), 2);
        let mut text: heapless::String<64> = heapless::String::new();

        let err = executor.execute("long-press position=9").unwrap_err();
        core::fmt::write(&mut text, format_args!("{err}")).unwrap();
        assert_eq!(text.as_str(), "position 9 outside 0..2");

        text.clear();
        let err = executor.execute("help toggle").unwrap_err();
        core::fmt::write(&mut text, format_args!("{err}")).unwrap();
        assert_eq!(text.as_str(), "no help for `toggle`");

        let err: &dyn core::error::Error = &CommandError::from(SwitchError::TooFewPositions(1));
        assert!(err.source().is_none());
    }

    #[test]
    fn latch_updates_position_and_reports_event() {
        let mut executor = executor(SwitchFeatures::LATCHING_SWITCH, 3);
        assert_eq!(
            executor.execute("latch position=2"),
            Ok(CommandOutcome::Latched {
                position: 2,
                event: Some(0),
            })
        );
        assert_eq!(executor.cluster().current_position(), 2);
    }

    #[test]
    fn events_are_reported_once() {
        let mut executor = executor(SwitchFeatures::LATCHING_SWITCH, 2);
        executor.execute("latch position=1").unwrap();

        let Ok(CommandOutcome::Events(first)) = executor.execute("events") else {
            panic!("events should succeed");
        };
        assert_eq!(first.len(), 1);

        let Ok(CommandOutcome::Events(second)) = executor.execute("events") else {
            panic!("events should succeed");
        };
        assert!(second.is_empty());
    }

    #[test]
    fn status_hides_multi_press_max_without_feature() {
        let executor = executor(SwitchFeatures::LATCHING_SWITCH, 2);
        let mut text: heapless::String<96> = heapless::String::new();
        core::fmt::write(&mut text, format_args!("{}", executor.status())).unwrap();
        assert_eq!(
            text.as_str(),
            "endpoint=1 positions=2 current=0 features=latching dataver=0"
        );
    }

    #[test]
    fn help_topics_resolve_through_catalog() {
        let mut executor = executor(momentary(), 2);
        assert!(matches!(
            executor.execute("help latch"),
            Ok(CommandOutcome::Help(Some(spec))) if spec.name == "latch"
        ));
        assert_eq!(
            executor.execute("help toggle"),
            Err(CommandError::UnknownTopic("toggle"))
        );
    }
}
