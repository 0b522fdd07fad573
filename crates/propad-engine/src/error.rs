//! Error types for device discovery, I/O, and the initialization handshake.

use thiserror::Error;

/// Failure of a single blocking transfer at the [`DeviceFile`] seam.
///
/// [`DeviceFile`]: crate::io::DeviceFile
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoFault {
    /// The handle was closed, locally or by the OS.
    #[error("device handle closed")]
    Closed,

    /// The transfer was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Any other transport failure. The message is advisory only; callers
    /// branch on the tri-state operation status, not on this.
    #[error("transport error: {0}")]
    Os(String),
}

/// Device and handshake errors surfaced by the engine.
///
/// None of these ever reach the host game; the XInput surface collapses
/// everything into connected/not-connected.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// No attached interface matched the Pro controller signature.
    #[error("Pro controller not present")]
    NotFound,

    /// HID enumeration itself failed.
    #[error("failed to enumerate HID interfaces: {0}")]
    Enumeration(String),

    /// The interface was found but could not be opened.
    #[error("failed to open device: {0}")]
    Open(String),

    /// A read or write failed mid-protocol.
    #[error("device I/O failed: {0}")]
    Io(IoFault),

    /// A reply did not arrive within the command-reply deadline.
    #[error("timed out after {timeout_ms}ms waiting for device reply")]
    ReplyTimeout { timeout_ms: u64 },

    /// One step of the initialization handshake failed.
    #[error("initialization failed at step '{step}': {source}")]
    InitFailed {
        step: &'static str,
        #[source]
        source: Box<DeviceError>,
    },
}

impl DeviceError {
    /// Whether retrying on a later reattach attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DeviceError::Enumeration(_))
    }

    /// Whether the error means there is currently no usable device.
    pub fn is_device_unavailable(&self) -> bool {
        matches!(
            self,
            DeviceError::NotFound | DeviceError::Open(_) | DeviceError::Io(IoFault::Closed)
        )
    }

    pub(crate) fn init_step(step: &'static str) -> impl FnOnce(DeviceError) -> DeviceError {
        move |source| DeviceError::InitFailed { step, source: Box::new(source) }
    }
}

/// Convenience result alias for engine operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(DeviceError::NotFound.is_device_unavailable());
        assert!(DeviceError::Io(IoFault::Closed).is_device_unavailable());
        assert!(!DeviceError::ReplyTimeout { timeout_ms: 400 }.is_device_unavailable());
    }

    #[test]
    fn test_init_failure_carries_step() {
        let err = DeviceError::init_step("handshake")(DeviceError::ReplyTimeout { timeout_ms: 400 });
        let msg = err.to_string();
        assert!(msg.contains("handshake"));
        assert!(err.is_retryable());
    }
}
