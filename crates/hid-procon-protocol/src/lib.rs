//! USB HID wire protocol for the Nintendo Switch Pro controller.
//!
//! The Pro controller (VID `0x057E`, PID `0x2009`) exchanges fixed 64-byte
//! reports over USB. The first byte of every report is a type tag; the rest
//! is a type-specific body. Host-to-device traffic carries commands (type
//! `0x80`), rumble data (`0x10`), or rumble-plus-subcommand frames (`0x01`);
//! device-to-host traffic carries command replies (`0x81`), subcommand
//! replies (`0x21`), and the steady-state input stream (`0x30`).
//!
//! ## Protocol Notes
//!
//! The format is not documented by the vendor. Field layout and command
//! codes follow the community USB captures collected in
//! `dekuNukem/Nintendo_Switch_Reverse_Engineering`.
//!
//! Stick axes are 12-bit values packed two-per-three-bytes; see [`U24`].
//! Buttons are a 24-bit little-endian bitfield; see [`Button`] for the
//! assigned bit indices. Battery charge is the high nibble of the
//! `battery_and_wired` byte; the low nibble is undecoded.
//!
//! The USB HID stack may coalesce several reports into a single transfer.
//! [`frames`] and [`iterate_frames`] walk a transfer as a sequence of
//! 64-byte slots, visiting every slot and leaving it to the visitor to
//! reject what it does not recognize; [`packets`] is the convenience view
//! that yields only the decodable reports.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod frame;
pub mod packet;
pub mod types;

pub use frame::*;
pub use packet::*;
pub use types::*;

use thiserror::Error;

/// Errors returned when interpreting raw report bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Short frame: expected {expected} bytes, got {actual}")]
    ShortFrame { expected: usize, actual: usize },

    #[error("Unrecognized packet type: {0:#04x}")]
    UnknownPacketType(u8),
}

/// Convenience result alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Nintendo USB vendor ID.
pub const VENDOR_ID: u16 = 0x057E;
/// Pro controller USB product ID.
pub const PRODUCT_ID: u16 = 0x2009;

/// Lower-cased signature found in the Windows HID interface path of a
/// USB-attached Pro controller.
pub const DEVICE_PATH_SIGNATURE: &str = "hid#vid_057e&pid_2009";

/// Every transfer to or from the controller is exactly this long.
pub const FRAME_LEN: usize = 64;
