mod session;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use switch_core::switch::{SwitchConfig, SwitchFeatures};

use session::{Clock, Session, SessionOptions};

/// Interactive Matter Generic Switch emulator.
#[derive(Parser)]
#[command(name = "switch-emulator", version, about)]
struct Cli {
    /// Endpoint hosting the Switch cluster
    #[arg(long, default_value_t = 1)]
    endpoint: u16,

    /// NumberOfPositions attribute
    #[arg(long, default_value_t = 2)]
    positions: u8,

    /// Position the switch rests in between presses
    #[arg(long, default_value_t = 0)]
    idle_position: u8,

    /// Position used when a command omits `position=`
    #[arg(long, default_value_t = 1)]
    pressed_position: u8,

    /// Feature tags (latching, momentary, release, long-press, multi-press, action)
    #[arg(
        long,
        value_delimiter = ',',
        value_parser = parse_feature,
        default_value = "momentary,release,long-press,multi-press"
    )]
    features: Vec<SwitchFeatures>,

    /// MultiPressMax attribute
    #[arg(long, default_value_t = 2)]
    multi_press_max: u8,

    /// Advance time without sleeping
    #[arg(long)]
    virtual_clock: bool,

    /// Write a timestamped transcript of the session to this file
    #[arg(long)]
    transcript: Option<PathBuf>,
}

impl Cli {
    fn session_options(self) -> SessionOptions {
        SessionOptions {
            endpoint: self.endpoint,
            features: self
                .features
                .into_iter()
                .fold(SwitchFeatures::empty(), |acc, feature| acc | feature),
            switch: SwitchConfig::new(self.positions, self.multi_press_max),
            idle_position: self.idle_position,
            pressed_position: self.pressed_position,
            clock: if self.virtual_clock {
                Clock::Virtual
            } else {
                Clock::Real
            },
            transcript: self.transcript,
        }
    }
}

fn parse_feature(tag: &str) -> Result<SwitchFeatures, String> {
    SwitchFeatures::from_tag(tag).ok_or_else(|| format!("unknown feature `{tag}`"))
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut session = Session::new(cli.session_options())?;
    session.write_header("Switch Emulator interactive transcript")?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Switch Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
