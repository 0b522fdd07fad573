//! C-compatible XInput structures and constants.
//!
//! These mirror the layouts a host game expects from `xinput1_*.dll`
//! entry points. All structures are `#[repr(C)]` with fixed sizes; byte
//! layout matches the Windows SDK headers so the same types back both the
//! in-process API and the exported C surface.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]

/// Win32 status code: success.
pub const ERROR_SUCCESS: u32 = 0;
/// Win32 status code: no controller at the queried index.
pub const ERROR_DEVICE_NOT_CONNECTED: u32 = 1167;
/// Win32 status code: no keystroke event available.
pub const ERROR_EMPTY: u32 = 4306;

/// Gamepad button bit: d-pad up.
pub const GAMEPAD_DPAD_UP: u16 = 0x0001;
/// Gamepad button bit: d-pad down.
pub const GAMEPAD_DPAD_DOWN: u16 = 0x0002;
/// Gamepad button bit: d-pad left.
pub const GAMEPAD_DPAD_LEFT: u16 = 0x0004;
/// Gamepad button bit: d-pad right.
pub const GAMEPAD_DPAD_RIGHT: u16 = 0x0008;
/// Gamepad button bit: start.
pub const GAMEPAD_START: u16 = 0x0010;
/// Gamepad button bit: back.
pub const GAMEPAD_BACK: u16 = 0x0020;
/// Gamepad button bit: left stick click.
pub const GAMEPAD_LEFT_THUMB: u16 = 0x0040;
/// Gamepad button bit: right stick click.
pub const GAMEPAD_RIGHT_THUMB: u16 = 0x0080;
/// Gamepad button bit: left shoulder.
pub const GAMEPAD_LEFT_SHOULDER: u16 = 0x0100;
/// Gamepad button bit: right shoulder.
pub const GAMEPAD_RIGHT_SHOULDER: u16 = 0x0200;
/// Gamepad button bit: A.
pub const GAMEPAD_A: u16 = 0x1000;
/// Gamepad button bit: B.
pub const GAMEPAD_B: u16 = 0x2000;
/// Gamepad button bit: X.
pub const GAMEPAD_X: u16 = 0x4000;
/// Gamepad button bit: Y.
pub const GAMEPAD_Y: u16 = 0x8000;

/// Device type: gamepad.
pub const DEVTYPE_GAMEPAD: u8 = 0x01;
/// Device subtype: gamepad.
pub const DEVSUBTYPE_GAMEPAD: u8 = 0x01;

/// Battery device type selector: the gamepad itself.
pub const BATTERY_DEVTYPE_GAMEPAD: u8 = 0x00;

/// Battery type: no battery fitted.
pub const BATTERY_TYPE_DISCONNECTED: u8 = 0x00;
/// Battery type: wired, no battery.
pub const BATTERY_TYPE_WIRED: u8 = 0x01;
/// Battery type: alkaline cells.
pub const BATTERY_TYPE_ALKALINE: u8 = 0x02;
/// Battery type: nickel metal hydride cells.
pub const BATTERY_TYPE_NIMH: u8 = 0x03;
/// Battery type: unknown.
pub const BATTERY_TYPE_UNKNOWN: u8 = 0xFF;

/// Battery level: empty.
pub const BATTERY_LEVEL_EMPTY: u8 = 0x00;
/// Battery level: low.
pub const BATTERY_LEVEL_LOW: u8 = 0x01;
/// Battery level: medium.
pub const BATTERY_LEVEL_MEDIUM: u8 = 0x02;
/// Battery level: full.
pub const BATTERY_LEVEL_FULL: u8 = 0x03;

/// Stick and trigger state of one gamepad.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XInputGamepad {
    /// Bitwise OR of the `GAMEPAD_*` button constants.
    pub buttons: u16,
    /// Left trigger, 0..=255.
    pub left_trigger: u8,
    /// Right trigger, 0..=255.
    pub right_trigger: u8,
    /// Left stick X, full signed 16-bit range.
    pub thumb_lx: i16,
    /// Left stick Y.
    pub thumb_ly: i16,
    /// Right stick X.
    pub thumb_rx: i16,
    /// Right stick Y.
    pub thumb_ry: i16,
}

/// Gamepad state plus the packet counter games use for change detection.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XInputState {
    /// Increments (or at least changes) whenever the state changes.
    pub packet_number: u32,
    /// The current pad state.
    pub gamepad: XInputGamepad,
}

/// Rumble motor speeds.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XInputVibration {
    /// Low-frequency motor, 0..=65535.
    pub left_motor_speed: u16,
    /// High-frequency motor, 0..=65535.
    pub right_motor_speed: u16,
}

/// Capability description returned to the host game.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XInputCapabilities {
    /// One of the `DEVTYPE_*` constants.
    pub device_type: u8,
    /// One of the `DEVSUBTYPE_*` constants.
    pub sub_type: u8,
    /// Capability flags; zero here.
    pub flags: u16,
    /// Resolution mask of the reported pad fields.
    pub gamepad: XInputGamepad,
    /// Resolution mask of the rumble motors.
    pub vibration: XInputVibration,
}

impl XInputCapabilities {
    /// The capability set reported for the bridged controller: the values a
    /// wired Xbox One pad reports.
    pub const fn bridged_gamepad() -> Self {
        Self {
            device_type: DEVTYPE_GAMEPAD,
            sub_type: DEVSUBTYPE_GAMEPAD,
            flags: 0,
            gamepad: XInputGamepad {
                buttons: 0xF3FF,
                left_trigger: 0xFF,
                right_trigger: 0xFF,
                thumb_lx: 0xFFC0u16 as i16,
                thumb_ly: 0xFFC0u16 as i16,
                thumb_rx: 0xFFC0u16 as i16,
                thumb_ry: 0xFFC0u16 as i16,
            },
            vibration: XInputVibration { left_motor_speed: 0xFF, right_motor_speed: 0xFF },
        }
    }
}

/// Battery type and charge level of a device.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XInputBatteryInformation {
    /// One of the `BATTERY_TYPE_*` constants.
    pub battery_type: u8,
    /// One of the `BATTERY_LEVEL_*` constants.
    pub battery_level: u8,
}

/// Keystroke event record. Unused by the bridge (keystroke queries always
/// report empty) but required for the exported signature.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XInputKeystroke {
    /// Virtual-key code.
    pub virtual_key: u16,
    /// Unused.
    pub unicode: u16,
    /// Event flags.
    pub flags: u16,
    /// Controller index.
    pub user_index: u8,
    /// HID code.
    pub hid_code: u8,
}
