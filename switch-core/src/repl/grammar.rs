#![allow(clippy::module_name_repetitions)]

//! Lexer and parser for the switch emulator REPL.
//!
//! The lexer uses `regal` to produce a bounded token stream, while the parser
//! composes `winnow` combinators over those tokens. Commands are a keyword
//! followed by `key=value` arguments in any order, as listed in the
//! [`catalog`](super::catalog).

use core::fmt;
use core::ops::Range;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use regal::IncrementalError;
use regal::TokenCache;
use regal_macros::RegalLexer;
#[allow(deprecated)]
use winnow::error::ErrorKind;
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::stream::Stream;

use super::catalog::{self, ArgKey, ArgSpec, CommandSpec, CommandTag, Trailer, ValueKind};

/// Maximum number of tokens produced per REPL line.
pub const MAX_TOKENS: usize = 32;
const MAX_CACHE_RECORDS: usize = MAX_TOKENS * 2;

/// Lexical token kinds recognized by the REPL grammar.
#[derive(RegalLexer, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Duration literal ending in `ms` or `s`.
    #[regex(r"[0-9]+(?:ms|s)", priority = 2)]
    Duration,
    /// Unsuffixed integer literal.
    #[regex(r"[0-9]+")]
    Integer,
    /// Keyword, argument name or help topic.
    #[regex(r"[A-Za-z][A-Za-z0-9-]*")]
    Ident,
    #[token("=")]
    Equals,
    #[regex(r"[ \t]+", skip)]
    Whitespace,
    /// End-of-line token (`\r`, `\n`, or `\r\n`).
    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Eol,
    /// Pseudo variant used when the lexer encounters unsupported input.
    #[default]
    #[regex(r".", priority = 1024)]
    Error,
}

/// Token emitted by the lexer with a byte span back into the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

/// Bounded token buffer to avoid dynamic allocation in `no_std` environments.
pub type TokenBuffer<'a> = HeaplessVec<Token<'a>, MAX_TOKENS>;

/// Lexer errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    /// Input produced more tokens than the static buffer allows.
    TooManyTokens { processed: usize },
    /// Underlying lexer reported an unrecoverable error.
    Engine,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyTokens { processed } => {
                write!(f, "token buffer exhausted after {processed} items")
            }
            LexError::Engine => write!(f, "lexer engine error"),
        }
    }
}

/// Grammar errors emitted by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind<'a> {
    UnexpectedToken {
        expected: &'static str,
        found: Option<TokenKind>,
        span: Range<usize>,
    },
    UnexpectedEnd {
        expected: &'static str,
    },
    InvalidInteger {
        span: Range<usize>,
    },
    InvalidDuration {
        span: Range<usize>,
    },
    InvalidToken {
        span: Range<usize>,
        lexeme: &'a str,
    },
    UnknownArgument {
        command: &'static str,
        lexeme: &'a str,
        span: Range<usize>,
    },
    DuplicateArgument {
        name: &'static str,
        span: Range<usize>,
    },
    MissingArgument {
        command: &'static str,
        name: &'static str,
    },
}

impl fmt::Display for GrammarErrorKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarErrorKind::UnexpectedToken {
                expected,
                found,
                span,
            } => write!(f, "expected {expected}, found {found:?} at {span:?}"),
            GrammarErrorKind::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            GrammarErrorKind::InvalidInteger { span } => {
                write!(f, "invalid integer literal at {span:?}")
            }
            GrammarErrorKind::InvalidDuration { span } => {
                write!(f, "invalid duration literal at {span:?}")
            }
            GrammarErrorKind::InvalidToken { span, lexeme } => {
                write!(f, "unsupported token `{lexeme}` at {span:?}")
            }
            GrammarErrorKind::UnknownArgument {
                command,
                lexeme,
                span,
            } => write!(f, "`{command}` takes no argument `{lexeme}` at {span:?}"),
            GrammarErrorKind::DuplicateArgument { name, span } => {
                write!(f, "argument `{name}` given twice at {span:?}")
            }
            GrammarErrorKind::MissingArgument { command, name } => {
                write!(f, "`{command}` requires `{name}=`")
            }
        }
    }
}

/// Wrapper type enabling a consistent error surface for consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError<'a> {
    pub kind: GrammarErrorKind<'a>,
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl<'a> GrammarError<'a> {
    const fn new(kind: GrammarErrorKind<'a>) -> Self {
        Self { kind }
    }

    fn unexpected(expected: &'static str, token: Option<&Token<'a>>) -> Self {
        Self::new(match token {
            Some(tok) => GrammarErrorKind::UnexpectedToken {
                expected,
                found: Some(tok.kind),
                span: tok.span.clone(),
            },
            None => GrammarErrorKind::UnexpectedEnd { expected },
        })
    }

    fn invalid_integer(token: &Token<'a>) -> Self {
        Self::new(GrammarErrorKind::InvalidInteger {
            span: token.span.clone(),
        })
    }

    fn invalid_duration(token: &Token<'a>) -> Self {
        Self::new(GrammarErrorKind::InvalidDuration {
            span: token.span.clone(),
        })
    }

    fn invalid_token(token: &Token<'a>) -> Self {
        Self::new(GrammarErrorKind::InvalidToken {
            span: token.span.clone(),
            lexeme: token.lexeme,
        })
    }
}

type Input<'src, 'slice> = &'slice [Token<'src>];

#[allow(deprecated)]
impl<'src, 'slice> ParserError<Input<'src, 'slice>> for GrammarError<'src>
where
    'src: 'slice,
{
    fn from_error_kind(input: &Input<'src, 'slice>, _kind: ErrorKind) -> Self {
        GrammarError::unexpected("token", input.first())
    }

    fn append(
        self,
        _input: &Input<'src, 'slice>,
        _token_start: &<Input<'src, 'slice> as Stream>::Checkpoint,
        _kind: ErrorKind,
    ) -> Self {
        self
    }

    fn or(self, other: Self) -> Self {
        other
    }
}

/// Combined lex/parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    Lex(LexError),
    Grammar(GrammarError<'a>),
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => err.fmt(f),
            ParseError::Grammar(err) => err.fmt(f),
        }
    }
}

impl core::error::Error for ParseError<'_> {}

/// Structured commands produced by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    LongPress(LongPressCommand),
    MultiPress(MultiPressCommand),
    Latch(LatchCommand),
    Status,
    Events,
    Help(HelpCommand<'a>),
}

/// Arguments of `long-press`; omitted values fall back to session defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LongPressCommand {
    pub position: Option<u8>,
    pub delay: Option<Duration>,
    pub duration: Option<Duration>,
}

/// Arguments of `multi-press`; omitted values fall back to session defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MultiPressCommand {
    pub position: Option<u8>,
    pub count: Option<u8>,
    pub hold: Option<Duration>,
    pub gap: Option<Duration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatchCommand {
    pub position: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpCommand<'a> {
    pub topic: Option<&'a str>,
}

pub(crate) fn parse_tokens_partial<'src, 'slice>(
    tokens: &'slice [Token<'src>],
) -> Result<(Command<'src>, &'slice [Token<'src>]), GrammarError<'src>>
where
    'src: 'slice,
{
    let mut input = tokens;
    match command().parse_next(&mut input) {
        Ok(cmd) => Ok((cmd, input)),
        Err(ErrMode::Backtrack(err) | ErrMode::Cut(err)) => Err(err),
        Err(ErrMode::Incomplete(_)) => Err(GrammarError::unexpected("token", input.first())),
    }
}

/// Tokenize the provided line.
pub fn lex(line: &str) -> Result<TokenBuffer<'_>, LexError> {
    let compiled = TokenKind::lexer();
    let mut cache: TokenCache<TokenKind, MAX_CACHE_RECORDS> = TokenCache::new();
    let partial = cache
        .rebuild(compiled, line)
        .map_err(map_incremental_error)?;
    let mut buffer = TokenBuffer::new();

    for record in cache.tokens() {
        if record.skipped {
            continue;
        }

        let span = record.start..record.end;
        let lexeme = &line[span.clone()];
        push_token(&mut buffer, record.token, lexeme, span)?;
    }

    if let Some(partial) = partial.filter(|partial| !partial.fragment.is_empty()) {
        let start = partial.start;
        let span = start..start + partial.fragment.len();
        push_token(&mut buffer, TokenKind::Error, partial.fragment, span)?;
    }

    Ok(buffer)
}

fn push_token<'a>(
    buffer: &mut TokenBuffer<'a>,
    kind: TokenKind,
    lexeme: &'a str,
    span: Range<usize>,
) -> Result<(), LexError> {
    buffer
        .push(Token { kind, lexeme, span })
        .map_err(|_| LexError::TooManyTokens {
            processed: buffer.len() + 1,
        })
}

fn map_incremental_error(error: IncrementalError) -> LexError {
    match error {
        IncrementalError::TokenOverflow => LexError::TooManyTokens {
            processed: MAX_TOKENS,
        },
        _ => LexError::Engine,
    }
}

/// Parse a REPL command from the provided line.
pub fn parse(line: &str) -> Result<Command<'_>, ParseError<'_>> {
    let tokens = lex(line).map_err(ParseError::Lex)?;

    if let Some(token) = tokens.iter().find(|token| token.kind == TokenKind::Error) {
        return Err(ParseError::Grammar(GrammarError::invalid_token(token)));
    }

    let (command, mut rest) =
        parse_tokens_partial(tokens.as_slice()).map_err(ParseError::Grammar)?;

    while let Some((token, remaining)) = rest.split_first() {
        if token.kind == TokenKind::Eol {
            rest = remaining;
        } else {
            return Err(ParseError::Grammar(GrammarError::unexpected(
                "end of command",
                Some(token),
            )));
        }
    }

    Ok(command)
}

fn command<'src, 'slice>() -> impl Parser<Input<'src, 'slice>, Command<'src>, GrammarError<'src>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| {
        let snapshot = *input;
        let command_token = expect_kind(TokenKind::Ident, "command keyword").parse_next(input)?;

        if let Some(spec) = catalog::find(command_token.lexeme) {
            let mut state = CommandState::new(spec);
            parse_arguments(input, &mut state)?;
            state.finish()
        } else {
            *input = snapshot;
            Err(ErrMode::Backtrack(GrammarError::unexpected(
                "command keyword",
                Some(&command_token),
            )))
        }
    }
}

fn parse_arguments<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    while let Some((token, rest)) = input.split_first() {
        if token.kind == TokenKind::Eol {
            break;
        }

        let is_assignment = rest
            .first()
            .is_some_and(|next| next.kind == TokenKind::Equals);
        if token.kind == TokenKind::Ident && !is_assignment && state.accepts_topic() {
            state.topic = Some(token.lexeme);
            *input = rest;
            continue;
        }

        let name = expect_kind(TokenKind::Ident, "argument name").parse_next(input)?;
        let Some(arg) = state.spec.arg(name.lexeme) else {
            return Err(ErrMode::Cut(GrammarError::new(
                GrammarErrorKind::UnknownArgument {
                    command: state.spec.name,
                    lexeme: name.lexeme,
                    span: name.span,
                },
            )));
        };
        let _ = expect_kind(TokenKind::Equals, "=").parse_next(input)?;
        let value = parse_value(input, arg)?;
        state.assign(arg, value, name.span)?;
    }

    Ok(())
}

fn parse_value<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    arg: &ArgSpec,
) -> Result<ArgValue, ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    match arg.value {
        ValueKind::Integer => {
            let token = expect_kind(TokenKind::Integer, "integer").parse_next(input)?;
            parse_integer(&token)
                .map(ArgValue::Integer)
                .map_err(ErrMode::Cut)
        }
        ValueKind::Duration => {
            let token = expect_kind(TokenKind::Duration, "duration").parse_next(input)?;
            parse_duration(&token)
                .map(ArgValue::Duration)
                .map_err(ErrMode::Cut)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArgValue {
    Integer(u8),
    Duration(Duration),
}

impl ArgValue {
    fn integer(self) -> Option<u8> {
        match self {
            ArgValue::Integer(value) => Some(value),
            ArgValue::Duration(_) => None,
        }
    }

    fn duration(self) -> Option<Duration> {
        match self {
            ArgValue::Duration(value) => Some(value),
            ArgValue::Integer(_) => None,
        }
    }
}

struct CommandState<'a> {
    spec: &'static CommandSpec,
    values: [Option<ArgValue>; ArgKey::COUNT],
    topic: Option<&'a str>,
}

impl<'a> CommandState<'a> {
    fn new(spec: &'static CommandSpec) -> Self {
        Self {
            spec,
            values: [None; ArgKey::COUNT],
            topic: None,
        }
    }

    fn accepts_topic(&self) -> bool {
        self.spec.trailer == Trailer::Topic && self.topic.is_none()
    }

    fn assign(
        &mut self,
        arg: &ArgSpec,
        value: ArgValue,
        span: Range<usize>,
    ) -> Result<(), ErrMode<GrammarError<'a>>> {
        let slot = &mut self.values[arg.key.index()];
        if slot.is_some() {
            return Err(ErrMode::Cut(GrammarError::new(
                GrammarErrorKind::DuplicateArgument {
                    name: arg.name,
                    span,
                },
            )));
        }
        *slot = Some(value);
        Ok(())
    }

    fn get(&self, key: ArgKey) -> Option<ArgValue> {
        self.values[key.index()]
    }

    fn finish(self) -> Result<Command<'a>, ErrMode<GrammarError<'a>>> {
        if let Some(missing) = self
            .spec
            .args
            .iter()
            .find(|arg| arg.required && self.get(arg.key).is_none())
        {
            return Err(ErrMode::Cut(GrammarError::new(
                GrammarErrorKind::MissingArgument {
                    command: self.spec.name,
                    name: missing.name,
                },
            )));
        }

        let integer = |key| self.get(key).and_then(ArgValue::integer);
        let duration = |key| self.get(key).and_then(ArgValue::duration);

        Ok(match self.spec.tag {
            CommandTag::LongPress => Command::LongPress(LongPressCommand {
                position: integer(ArgKey::Position),
                delay: duration(ArgKey::Delay),
                duration: duration(ArgKey::Duration),
            }),
            CommandTag::MultiPress => Command::MultiPress(MultiPressCommand {
                position: integer(ArgKey::Position),
                count: integer(ArgKey::Count),
                hold: duration(ArgKey::Hold),
                gap: duration(ArgKey::Gap),
            }),
            CommandTag::Latch => Command::Latch(LatchCommand {
                // Presence checked above.
                position: integer(ArgKey::Position).unwrap_or_default(),
            }),
            CommandTag::Status => Command::Status,
            CommandTag::Events => Command::Events,
            CommandTag::Help => Command::Help(HelpCommand { topic: self.topic }),
        })
    }
}

fn expect_kind<'src, 'slice>(
    kind: TokenKind,
    label: &'static str,
) -> impl Parser<Input<'src, 'slice>, Token<'src>, GrammarError<'src>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| match input.split_first() {
        Some((token, rest)) if token.kind == kind => {
            *input = rest;
            Ok(token.clone())
        }
        Some((token, _)) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            Some(token),
        ))),
        None => Err(ErrMode::Backtrack(GrammarError::unexpected(label, None))),
    }
}

fn parse_integer<'a>(token: &Token<'a>) -> Result<u8, GrammarError<'a>> {
    token
        .lexeme
        .parse::<u8>()
        .map_err(|_| GrammarError::invalid_integer(token))
}

fn parse_duration<'a>(token: &Token<'a>) -> Result<Duration, GrammarError<'a>> {
    let text = token.lexeme;
    if let Some(rest) = text.strip_suffix("ms") {
        let millis = rest
            .parse::<u32>()
            .map_err(|_| GrammarError::invalid_duration(token))?;
        Ok(Duration::from_millis(millis.into()))
    } else if let Some(rest) = text.strip_suffix('s') {
        let seconds = rest
            .parse::<u32>()
            .map_err(|_| GrammarError::invalid_duration(token))?;
        Ok(Duration::from_secs(seconds.into()))
    } else {
        Err(GrammarError::invalid_duration(token))
    }
}
