//! hidapi-backed transport and the Pro controller locator.

use crate::error::{DeviceError, IoFault};
use crate::io::device::{DeviceFile, DeviceOpener};
use hid_procon_protocol::{DEVICE_PATH_SIGNATURE, PRODUCT_ID, VENDOR_ID};
use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Granularity of the blocking-read slices; bounds both cancellation and
/// close latency.
const READ_SLICE_MS: i32 = 10;

/// Return the interface path of the first attached Pro controller.
///
/// Windows HID paths carry the `hid#vid_057e&pid_2009` signature; other
/// platforms use different path syntax, so the VID/PID pair is matched as
/// a fallback.
pub fn find_device_path(api: &HidApi) -> Option<CString> {
    for info in api.device_list() {
        let path = info.path();
        let lowered = path.to_string_lossy().to_ascii_lowercase();
        if lowered.contains(DEVICE_PATH_SIGNATURE)
            || (info.vendor_id() == VENDOR_ID && info.product_id() == PRODUCT_ID)
        {
            debug!(path = %lowered, "located Pro controller interface");
            return Some(path.to_owned());
        }
    }
    None
}

/// A [`DeviceFile`] over an opened `hidapi` handle.
///
/// Reads poll in short timeout slices so the cancel token and `close` are
/// observed within [`READ_SLICE_MS`]. The handle is dropped (and the OS
/// handle released) on `close` or when the wrapper itself drops.
pub struct HidDeviceFile {
    device: Mutex<Option<HidDevice>>,
}

impl HidDeviceFile {
    pub fn new(device: HidDevice) -> Self {
        Self { device: Mutex::new(Some(device)) }
    }
}

impl DeviceFile for HidDeviceFile {
    fn read(&self, buf: &mut [u8], cancel: &AtomicBool) -> Result<usize, IoFault> {
        loop {
            if cancel.load(Ordering::Acquire) {
                return Err(IoFault::Cancelled);
            }
            let guard = self.device.lock();
            let Some(device) = guard.as_ref() else {
                return Err(IoFault::Closed);
            };
            match device.read_timeout(buf, READ_SLICE_MS) {
                Ok(0) => continue, // slice elapsed with no report
                Ok(len) => return Ok(len),
                Err(err) => return Err(IoFault::Os(err.to_string())),
            }
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize, IoFault> {
        let guard = self.device.lock();
        let Some(device) = guard.as_ref() else {
            return Err(IoFault::Closed);
        };
        device.write(buf).map_err(|err| IoFault::Os(err.to_string()))
    }

    fn is_open(&self) -> bool {
        self.device.lock().is_some()
    }

    fn close(&self) {
        self.device.lock().take();
    }
}

/// Production opener: enumerate, locate, open.
pub struct HidOpener {
    api: Mutex<HidApi>,
}

impl HidOpener {
    pub fn new() -> Result<Self, DeviceError> {
        HidApi::new()
            .map(|api| Self { api: Mutex::new(api) })
            .map_err(|err| DeviceError::Enumeration(err.to_string()))
    }
}

impl DeviceOpener for HidOpener {
    fn open(&self) -> Result<Arc<dyn DeviceFile>, DeviceError> {
        let mut api = self.api.lock();
        api.refresh_devices().map_err(|err| DeviceError::Enumeration(err.to_string()))?;
        let path = find_device_path(&api).ok_or(DeviceError::NotFound)?;
        let device =
            api.open_path(&path).map_err(|err| DeviceError::Open(err.to_string()))?;
        Ok(Arc::new(HidDeviceFile::new(device)))
    }
}

/// Fallback opener used when HID enumeration itself cannot start; keeps
/// the agent alive in a permanently-disconnected state.
pub struct UnavailableOpener {
    reason: String,
}

impl UnavailableOpener {
    pub fn new(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(%reason, "HID enumeration unavailable; agent stays disconnected");
        Self { reason }
    }
}

impl DeviceOpener for UnavailableOpener {
    fn open(&self) -> Result<Arc<dyn DeviceFile>, DeviceError> {
        Err(DeviceError::Enumeration(self.reason.clone()))
    }
}
