#![no_std]

// Generic Switch button simulation shared by the host emulator and tests.
//
// The crate avoids the Rust standard library so the sequencer and cluster
// model can run next to an embedded Matter stack as well as on a host.

pub mod repl;
pub mod sequences;
pub mod simulator;
pub mod switch;
