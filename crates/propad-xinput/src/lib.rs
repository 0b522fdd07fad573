//! Drop-in XInput surface backed by the Pro controller agent.
//!
//! [`surface`] holds the entry-point behavior against an explicit agent
//! reference; [`global`] owns the one process-wide agent the flat C
//! exports use. On Windows the [`exports`] module emits the actual
//! `XInput*` symbols for the version set selected at build time
//! (`set-1-3`, `set-9-1-0`, `set-uap`), and the `forward` feature builds
//! the variant that chain-loads a sibling XInput library instead.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod global;
pub mod surface;

#[cfg(windows)]
pub mod raw_input;

#[cfg(windows)]
pub mod exports;

#[cfg(all(windows, feature = "forward"))]
pub mod forward;
