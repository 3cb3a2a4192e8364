//! REPL tooling shared by the emulator and any other front-end.
//!
//! The grammar lives in [`grammar`] and uses a token/parse pipeline that
//! stays compatible with `no_std`. [`commands`] turns parsed commands into
//! switch operations and sequence configurations.

pub mod catalog;
pub mod commands;
pub mod grammar;
