//! Bridges a USB Nintendo Switch Pro controller to XInput state.
//!
//! The engine owns the whole path from device bytes to cached gamepad
//! state:
//!
//! - [`io`] — fixed buffers, one-operation-at-a-time asynchronous pipes,
//!   and the duplex [`DeviceChannel`](io::DeviceChannel) over one handle
//! - [`hid`] — hidapi transport and the VID `057E` / PID `2009` locator
//! - [`driver`] — command/subcommand send with ordered reply matching and
//!   the vendor initialization handshake
//! - [`adaptor`] — stick calibration, positional button mapping, battery
//!   decode
//! - [`agent`] — the worker thread, the reader/writer state cache, and
//!   reattach-on-failure
//!
//! Scripted stand-ins for the device live in [`testing`] and plug into the
//! same seams as the real transport.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod adaptor;
pub mod agent;
pub mod config;
pub mod driver;
pub mod error;
pub mod hid;
pub mod io;
pub mod testing;

pub use adaptor::{AxisCalibration, StickCalibration};
pub use agent::ProAgent;
pub use config::{AgentConfig, PipeParams};
pub use error::{DeviceError, DeviceResult, IoFault};
pub use io::{Buffer, DeviceChannel, DeviceFile, DeviceOpener, OpStatus, SYNC_INFINITE};
