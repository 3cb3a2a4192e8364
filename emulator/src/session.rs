use std::cell::Cell;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant as HostInstant};

use log::{debug, info};
use switch_core::repl::catalog::{self, CommandSpec};
use switch_core::repl::commands::{
    CommandError, CommandExecutor, CommandOutcome, EventBatch, SimulationDefaults,
};
use switch_core::sequences::{SequenceConfig, SequenceMode};
use switch_core::simulator::{ButtonEventSimulator, OneShotTimer};
use switch_core::switch::{
    EndpointId, EventNumber, SwitchCluster, SwitchConfig, SwitchError, SwitchFeatures, SwitchSink,
};

/// How armed sequencer timers are waited out.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Clock {
    /// Sleep on an `embassy-time` timer.
    Real,
    /// Advance a session-local clock without sleeping.
    Virtual,
}

impl Clock {
    fn wait(self, duration: Duration) {
        if self == Clock::Real {
            let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
            embassy_futures::block_on(embassy_time::Timer::after(
                embassy_time::Duration::from_micros(micros),
            ));
        }
    }
}

/// Switch configuration and session behavior chosen on the command line.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub endpoint: EndpointId,
    pub features: SwitchFeatures,
    pub switch: SwitchConfig,
    pub idle_position: u8,
    pub pressed_position: u8,
    pub clock: Clock,
    pub transcript: Option<PathBuf>,
}

impl SessionOptions {
    /// Two-position momentary switch with every momentary feature enabled.
    #[must_use]
    pub fn momentary(clock: Clock) -> Self {
        Self {
            endpoint: 1,
            features: SwitchFeatures::MOMENTARY_SWITCH
                | SwitchFeatures::MOMENTARY_SWITCH_RELEASE
                | SwitchFeatures::MOMENTARY_SWITCH_LONG_PRESS
                | SwitchFeatures::MOMENTARY_SWITCH_MULTI_PRESS,
            switch: SwitchConfig::new(2, 3),
            idle_position: 0,
            pressed_position: 1,
            clock,
            transcript: None,
        }
    }

    #[must_use]
    pub fn with_features(mut self, features: SwitchFeatures) -> Self {
        self.features = features;
        self
    }

    #[must_use]
    pub fn with_transcript(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcript = Some(path.into());
        self
    }
}

/// Canonical sessions recorded by `capture-transcripts`.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    LongPress,
    MultiPress,
    ActionSwitch,
}

#[allow(dead_code)]
impl TranscriptProfile {
    pub const ALL: [TranscriptProfile; 3] = [
        TranscriptProfile::LongPress,
        TranscriptProfile::MultiPress,
        TranscriptProfile::ActionSwitch,
    ];

    #[must_use]
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::LongPress => "transcripts/emulator-long-press.log",
            TranscriptProfile::MultiPress => "transcripts/emulator-multi-press.log",
            TranscriptProfile::ActionSwitch => "transcripts/emulator-action-switch.log",
        }
    }

    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::LongPress => "Switch Emulator long-press transcript",
            TranscriptProfile::MultiPress => "Switch Emulator multi-press transcript",
            TranscriptProfile::ActionSwitch => "Switch Emulator action switch transcript",
        }
    }

    /// Switch under test for the profile, always on the virtual clock.
    #[must_use]
    pub fn options(self) -> SessionOptions {
        let options = SessionOptions::momentary(Clock::Virtual).with_transcript(self.log_path());
        match self {
            TranscriptProfile::LongPress | TranscriptProfile::MultiPress => options,
            TranscriptProfile::ActionSwitch => {
                let features = options.features | SwitchFeatures::ACTION_SWITCH;
                options.with_features(features)
            }
        }
    }
}

pub struct Session {
    executor: CommandExecutor,
    transcript: Option<TranscriptLogger>,
    clock: Clock,
    started_at: HostInstant,
    virtual_elapsed: Duration,
    sequence_count: usize,
}

impl Session {
    pub fn new(options: SessionOptions) -> io::Result<Self> {
        let SessionOptions {
            endpoint,
            features,
            switch,
            idle_position,
            pressed_position,
            clock,
            transcript,
        } = options;

        let mut cluster =
            SwitchCluster::new(endpoint, features, switch).map_err(invalid_input)?;
        cluster
            .set_current_position(idle_position)
            .map_err(invalid_input)?;
        cluster.startup();

        let defaults = SimulationDefaults {
            pressed_position,
            ..SimulationDefaults::DEFAULT.with_idle_position(idle_position)
        };
        let transcript = match transcript {
            Some(path) => Some(TranscriptLogger::create(&path)?),
            None => None,
        };
        info!(
            "endpoint {endpoint}: session ready ({} positions, {:?} clock)",
            switch.number_of_positions, clock
        );

        Ok(Self {
            executor: CommandExecutor::new(cluster, defaults),
            transcript,
            clock,
            started_at: HostInstant::now(),
            virtual_elapsed: Duration::ZERO,
            sequence_count: 0,
        })
    }

    /// Writes the transcript banner.
    pub fn write_header(&mut self, header: &str) -> io::Result<()> {
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.write_header(header)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn cluster(&self) -> &SwitchCluster {
        self.executor.cluster()
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.elapsed();
        self.record(elapsed, TranscriptRole::Host, &[trimmed])?;

        let lines = match self.executor.execute(trimmed) {
            Ok(CommandOutcome::Sequence(config)) => self.run_sequence(&config),
            Ok(CommandOutcome::Latched { position, event }) => {
                vec![format!("OK latch position={position} event={}", event_label(event))]
            }
            Ok(CommandOutcome::Status(status)) => vec![format!("OK status {status}")],
            Ok(CommandOutcome::Events(batch)) => describe_events(&batch),
            Ok(CommandOutcome::Help(topic)) => describe_help(topic),
            Err(CommandError::Parse(err)) => vec![format!("ERR syntax {err}")],
            Err(CommandError::Switch(err)) => vec![format!("ERR switch {err}")],
            Err(CommandError::UnknownTopic(topic)) => vec![
                format!("ERR help no help available for `{topic}`"),
                format!("Available topics: {}", help_topic_list()),
            ],
        };

        // Sequences advance the virtual clock, so stamp the output afterwards.
        let elapsed = self.elapsed();
        self.record(elapsed, TranscriptRole::Emulator, &lines)?;
        Ok(lines)
    }

    fn run_sequence(&mut self, config: &SequenceConfig) -> Vec<String> {
        self.sequence_count += 1;
        let sequence_id = self.sequence_count;
        let endpoint = self.executor.cluster().endpoint();
        let clock = self.clock;
        let completed = Cell::new(false);

        let sink = NarratingSink::new(self.executor.cluster_mut());
        let mut simulator = ButtonEventSimulator::new(endpoint, *config, sink, OneShotTimer::new());
        if let Err(err) = simulator.execute(|| completed.set(true)) {
            return vec![format!("ERR sequence {err}")];
        }

        let mut offset = Duration::ZERO;
        while let Some(wait) = simulator.timer_mut().take() {
            debug!("sequence {sequence_id}: waiting {}ms", wait.as_millis());
            clock.wait(wait);
            offset += wait;
            simulator.sink_mut().offset = offset;
            simulator.on_timer_expired();
        }

        let final_state = simulator.state();
        let (sink, _timer) = simulator.into_parts();
        if clock == Clock::Virtual {
            self.virtual_elapsed += offset;
        }

        let mut lines = Vec::with_capacity(sink.lines.len() + 2);
        lines.push(describe_sequence(sequence_id, config));
        lines.extend(sink.lines);
        if completed.get() {
            lines.push(format!("  +{}ms complete", offset.as_millis()));
        } else {
            lines.push(format!(
                "  +{}ms stalled in {final_state}",
                offset.as_millis()
            ));
        }
        lines
    }

    fn elapsed(&self) -> Duration {
        match self.clock {
            Clock::Real => self.started_at.elapsed(),
            Clock::Virtual => self.virtual_elapsed,
        }
    }

    fn record<S: AsRef<str>>(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        lines: &[S],
    ) -> io::Result<()> {
        if let Some(transcript) = self.transcript.as_mut() {
            for line in lines {
                transcript.append_line(elapsed, role, line.as_ref())?;
            }
        }
        Ok(())
    }
}

/// Cluster sink that narrates every change with its offset from the start
/// of the sequence.
struct NarratingSink<'a> {
    cluster: &'a mut SwitchCluster,
    offset: Duration,
    lines: Vec<String>,
}

impl<'a> NarratingSink<'a> {
    fn new(cluster: &'a mut SwitchCluster) -> Self {
        Self {
            cluster,
            offset: Duration::ZERO,
            lines: Vec::new(),
        }
    }

    fn note(&mut self, detail: &str) {
        let line = format!("  +{}ms {detail}", self.offset.as_millis());
        self.lines.push(line);
    }

    fn reported(&mut self, number: Option<EventNumber>) -> Option<EventNumber> {
        if number.is_some()
            && let Some(record) = self.cluster.events().latest().copied()
        {
            self.note(&format!("event #{} {}", record.number, record.event));
        }
        number
    }
}

impl SwitchSink for NarratingSink<'_> {
    fn set_position(&mut self, position: u8) -> Result<(), SwitchError> {
        let result = self.cluster.set_position(position);
        match result {
            Ok(()) => self.note(&format!("position={position}")),
            Err(err) => self.note(&format!("position={position} refused: {err}")),
        }
        result
    }

    fn record_initial_press(&mut self, new_position: u8) -> Option<EventNumber> {
        let number = self.cluster.record_initial_press(new_position);
        self.reported(number)
    }

    fn record_long_press(&mut self, new_position: u8) -> Option<EventNumber> {
        let number = self.cluster.record_long_press(new_position);
        self.reported(number)
    }

    fn record_long_release(&mut self, previous_position: u8) -> Option<EventNumber> {
        let number = self.cluster.record_long_release(previous_position);
        self.reported(number)
    }

    fn record_short_release(&mut self, previous_position: u8) -> Option<EventNumber> {
        let number = self.cluster.record_short_release(previous_position);
        self.reported(number)
    }

    fn record_multi_press_ongoing(&mut self, new_position: u8, count: u8) -> Option<EventNumber> {
        let number = self.cluster.record_multi_press_ongoing(new_position, count);
        self.reported(number)
    }

    fn record_multi_press_complete(
        &mut self,
        previous_position: u8,
        count: u8,
    ) -> Option<EventNumber> {
        let number = self
            .cluster
            .record_multi_press_complete(previous_position, count);
        self.reported(number)
    }
}

struct TranscriptLogger {
    writer: BufWriter<File>,
}

impl TranscriptLogger {
    fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write_header(&mut self, header: &str) -> io::Result<()> {
        writeln!(self.writer, "# {header}")?;
        writeln!(self.writer, "# Format: [+elapsed ms] ROLE message")?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6}ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

fn invalid_input(error: SwitchError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, error.to_string())
}

fn event_label(event: Option<EventNumber>) -> String {
    event.map_or_else(|| "none".to_string(), |number| format!("#{number}"))
}

fn describe_sequence(sequence_id: usize, config: &SequenceConfig) -> String {
    let run = format_duration_short(config.run_duration());
    match config.mode {
        SequenceMode::LongPress(timing) => format!(
            "OK long-press seq={sequence_id} position={} delay={} duration={} run={run}",
            config.pressed_position,
            format_duration_short(timing.delay),
            format_duration_short(timing.duration),
        ),
        SequenceMode::MultiPress(timing) => format!(
            "OK multi-press seq={sequence_id} position={} count={} max={} hold={} gap={} run={run}",
            config.pressed_position,
            timing.presses,
            timing.max,
            format_duration_short(timing.hold),
            format_duration_short(timing.gap),
        ),
    }
}

fn describe_events(batch: &EventBatch) -> Vec<String> {
    let mut lines = Vec::with_capacity(batch.len() + 1);
    lines.push(format!("OK events count={}", batch.len()));
    for record in batch {
        lines.push(format!(
            "  #{} endpoint={} {}",
            record.number, record.endpoint, record.event
        ));
    }
    lines
}

fn describe_help(topic: Option<&'static CommandSpec>) -> Vec<String> {
    match topic {
        Some(spec) => vec![format!("{} - {}", spec.usage, spec.summary)],
        None => {
            let mut lines = vec!["Available commands:".to_string()];
            for spec in catalog::commands() {
                lines.push(format!("  {:<64} - {}", spec.usage, spec.summary));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
            lines
        }
    }
}

fn help_topic_list() -> String {
    catalog::commands()
        .iter()
        .map(|spec| spec.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_duration_short(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
