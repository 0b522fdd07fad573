//! The seam between the pipe machinery and an actual device handle.

use crate::error::IoFault;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Blocking transfer interface over one opened device.
///
/// Implementations must support a read and a write proceeding from two
/// threads at once, and must honor the `cancel` token: a blocked `read`
/// returns [`IoFault::Cancelled`] promptly once the token is raised.
/// `close` releases the handle and unblocks any waiter with
/// [`IoFault::Closed`]; afterwards every operation fails the same way.
pub trait DeviceFile: Send + Sync {
    /// Block until a transfer arrives, the token is raised, or the handle
    /// dies. Returns the transfer length.
    fn read(&self, buf: &mut [u8], cancel: &AtomicBool) -> Result<usize, IoFault>;

    /// Write one transfer, blocking until accepted.
    fn write(&self, buf: &[u8]) -> Result<usize, IoFault>;

    fn is_open(&self) -> bool;

    /// Release the handle. Idempotent.
    fn close(&self);
}

/// Locates and opens the controller; called at startup and on every
/// reattach attempt.
pub trait DeviceOpener: Send + Sync {
    fn open(&self) -> Result<Arc<dyn DeviceFile>, crate::error::DeviceError>;
}

/// A permanently-closed device, used as the placeholder behind a channel
/// that has not attached yet.
#[derive(Debug, Default)]
pub struct ClosedDevice;

impl DeviceFile for ClosedDevice {
    fn read(&self, _buf: &mut [u8], _cancel: &AtomicBool) -> Result<usize, IoFault> {
        Err(IoFault::Closed)
    }

    fn write(&self, _buf: &[u8]) -> Result<usize, IoFault> {
        Err(IoFault::Closed)
    }

    fn is_open(&self) -> bool {
        false
    }

    fn close(&self) {}
}
