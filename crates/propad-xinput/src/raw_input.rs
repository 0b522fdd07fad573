//! Raw-input deregistration for the host process.
//!
//! Engines like Unity also pull joystick data through the raw-input
//! interface, which races this library for the controller. The Pro
//! controller enumerates as a generic joystick, so that registration is
//! removed once at startup.

use tracing::debug;
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::{RegisterRawInputDevices, RAWINPUTDEVICE, RIDEV_REMOVE};

const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
const HID_USAGE_GENERIC_JOYSTICK: u16 = 0x04;

/// Remove any generic-joystick raw-input registration in this process.
pub fn deregister_joystick_raw_input() {
    let device = RAWINPUTDEVICE {
        usUsagePage: HID_USAGE_PAGE_GENERIC,
        usUsage: HID_USAGE_GENERIC_JOYSTICK,
        dwFlags: RIDEV_REMOVE,
        hwndTarget: HWND::default(),
    };

    let result = unsafe {
        RegisterRawInputDevices(&[device], std::mem::size_of::<RAWINPUTDEVICE>() as u32)
    };
    if let Err(err) = result {
        // failing just means there was no registration to remove
        debug!("raw-input deregistration skipped: {err}");
    }
}
