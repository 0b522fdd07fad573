//! Asynchronous device I/O: buffers, pipes, and the duplex channel.

pub mod buffer;
pub mod channel;
pub mod device;
pub mod pipe;

pub use buffer::Buffer;
pub use channel::DeviceChannel;
pub use device::{ClosedDevice, DeviceFile, DeviceOpener};
pub use pipe::{OpResult, OpStatus, ReadPipe, ReadResult, WritePipe, SYNC_INFINITE};
