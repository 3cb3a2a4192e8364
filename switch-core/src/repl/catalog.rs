//! Command catalog shared by the parser and the `help` command.
//!
//! Each entry names the keyword, the `key=value` arguments it accepts, and
//! the help text printed for it.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    LongPress,
    MultiPress,
    Latch,
    Status,
    Events,
    Help,
}

/// Argument keys accepted after a command keyword.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKey {
    Position,
    Delay,
    Duration,
    Count,
    Hold,
    Gap,
}

impl ArgKey {
    /// Number of distinct argument keys.
    pub const COUNT: usize = 6;

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            ArgKey::Position => 0,
            ArgKey::Delay => 1,
            ArgKey::Duration => 2,
            ArgKey::Count => 3,
            ArgKey::Hold => 4,
            ArgKey::Gap => 5,
        }
    }
}

/// Literal kind expected on the right-hand side of an argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub key: ArgKey,
    pub value: ValueKind,
    pub required: bool,
}

/// Trailing free-form word, used by `help <topic>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trailer {
    None,
    Topic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub args: &'static [ArgSpec],
    pub trailer: Trailer,
    pub usage: &'static str,
    pub summary: &'static str,
}

impl CommandSpec {
    /// Finds an argument by name (case insensitive).
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&'static ArgSpec> {
        self.args
            .iter()
            .find(|arg| arg.name.eq_ignore_ascii_case(name))
    }
}

const POSITION: ArgSpec = ArgSpec {
    name: "position",
    key: ArgKey::Position,
    value: ValueKind::Integer,
    required: false,
};

const LONG_PRESS_ARGS: [ArgSpec; 3] = [
    POSITION,
    ArgSpec {
        name: "delay",
        key: ArgKey::Delay,
        value: ValueKind::Duration,
        required: false,
    },
    ArgSpec {
        name: "duration",
        key: ArgKey::Duration,
        value: ValueKind::Duration,
        required: false,
    },
];

const MULTI_PRESS_ARGS: [ArgSpec; 4] = [
    POSITION,
    ArgSpec {
        name: "count",
        key: ArgKey::Count,
        value: ValueKind::Integer,
        required: false,
    },
    ArgSpec {
        name: "hold",
        key: ArgKey::Hold,
        value: ValueKind::Duration,
        required: false,
    },
    ArgSpec {
        name: "gap",
        key: ArgKey::Gap,
        value: ValueKind::Duration,
        required: false,
    },
];

const LATCH_ARGS: [ArgSpec; 1] = [ArgSpec {
    required: true,
    ..POSITION
}];

const COMMANDS: [CommandSpec; 6] = [
    CommandSpec {
        name: "long-press",
        tag: CommandTag::LongPress,
        args: &LONG_PRESS_ARGS,
        trailer: Trailer::None,
        usage: "long-press [position=<n>] [delay=<dur>] [duration=<dur>]",
        summary: "press and hold, signal LongPress after delay, release after duration",
    },
    CommandSpec {
        name: "multi-press",
        tag: CommandTag::MultiPress,
        args: &MULTI_PRESS_ARGS,
        trailer: Trailer::None,
        usage: "multi-press [position=<n>] [count=<n>] [hold=<dur>] [gap=<dur>]",
        summary: "press count times, holding for hold and resting for gap",
    },
    CommandSpec {
        name: "latch",
        tag: CommandTag::Latch,
        args: &LATCH_ARGS,
        trailer: Trailer::None,
        usage: "latch position=<n>",
        summary: "move a latching switch to a new position",
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        args: &[],
        trailer: Trailer::None,
        usage: "status",
        summary: "show switch attributes",
    },
    CommandSpec {
        name: "events",
        tag: CommandTag::Events,
        args: &[],
        trailer: Trailer::None,
        usage: "events",
        summary: "list events generated since the last `events`",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        args: &[],
        trailer: Trailer::Topic,
        usage: "help [topic]",
        summary: "list commands or describe one",
    },
];

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_indices_are_dense() {
        let mut seen = [false; ArgKey::COUNT];
        for command in commands() {
            for arg in command.args {
                seen[arg.key.index()] = true;
            }
        }
        assert!(seen.iter().all(|flag| *flag));
    }

    #[test]
    fn latch_requires_position() {
        let latch = find("LATCH").unwrap();
        assert!(latch.arg("position").unwrap().required);
        assert!(!find("long-press").unwrap().arg("position").unwrap().required);
    }
}
