//! Translating Pro controller reports into XInput structures.

use hid_procon_protocol::{Button, CommonStates};
use propad_xinput_types::{
    XInputBatteryInformation, XInputGamepad, XInputState, BATTERY_LEVEL_EMPTY, BATTERY_LEVEL_FULL,
    BATTERY_LEVEL_LOW, BATTERY_LEVEL_MEDIUM, BATTERY_TYPE_NIMH, GAMEPAD_A, GAMEPAD_B,
    GAMEPAD_BACK, GAMEPAD_DPAD_DOWN, GAMEPAD_DPAD_LEFT, GAMEPAD_DPAD_RIGHT, GAMEPAD_DPAD_UP,
    GAMEPAD_LEFT_SHOULDER, GAMEPAD_LEFT_THUMB, GAMEPAD_RIGHT_SHOULDER, GAMEPAD_RIGHT_THUMB,
    GAMEPAD_START, GAMEPAD_X, GAMEPAD_Y,
};
use serde::{Deserialize, Serialize};

/// Three-point calibration for one 12-bit axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisCalibration {
    pub min: u16,
    pub neutral: u16,
    pub max: u16,
}

impl AxisCalibration {
    /// Remap a raw 12-bit sample to the signed 16-bit XInput range.
    ///
    /// Values clamp to `[min, max]`; the positive and negative halves
    /// scale independently so `neutral` lands exactly on zero.
    pub fn remap(&self, value: u16) -> i16 {
        let clamped = value.clamp(self.min, self.max);
        let signed = i32::from(clamped) - i32::from(self.neutral);
        if signed > 0 {
            let range = f32::from(self.max - self.neutral);
            (signed as f32 * (0x7FFF as f32) / range).round() as i16
        } else if signed < 0 {
            let range = f32::from(self.neutral - self.min);
            (signed as f32 * (0x8000 as f32) / range).round() as i16
        } else {
            0
        }
    }
}

/// Per-axis calibration for both sticks.
///
/// The defaults are one fixed table measured from a single unit; per-device
/// calibration readout is deliberately out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickCalibration {
    pub left_x: AxisCalibration,
    pub left_y: AxisCalibration,
    pub right_x: AxisCalibration,
    pub right_y: AxisCalibration,
}

impl Default for StickCalibration {
    fn default() -> Self {
        Self {
            left_x: AxisCalibration { min: 0x220, neutral: 0x7E0, max: 0xE20 },
            left_y: AxisCalibration { min: 0x1B0, neutral: 0x7A0, max: 0xE20 },
            right_x: AxisCalibration { min: 0x230, neutral: 0x800, max: 0xE00 },
            right_y: AxisCalibration { min: 0x150, neutral: 0x770, max: 0xE20 },
        }
    }
}

/// Map the controller's 0..=8 charge gauge onto the four XInput levels.
pub fn decode_battery_level(battery_and_wired: u8) -> u8 {
    match battery_and_wired >> 4 {
        7.. => BATTERY_LEVEL_FULL,
        4.. => BATTERY_LEVEL_MEDIUM,
        1.. => BATTERY_LEVEL_LOW,
        _ => BATTERY_LEVEL_EMPTY,
    }
}

fn map_buttons(keys: u32) -> u16 {
    // Pro face buttons map by physical position, not label: the pad's Y
    // sits where an Xbox pad's X is, and so on around the diamond.
    let mut buttons = 0u16;
    let mut set = |button: Button, bit: u16| {
        if button.is_pressed(keys) {
            buttons |= bit;
        }
    };
    set(Button::Y, GAMEPAD_X);
    set(Button::X, GAMEPAD_Y);
    set(Button::B, GAMEPAD_A);
    set(Button::A, GAMEPAD_B);
    set(Button::R, GAMEPAD_RIGHT_SHOULDER);
    set(Button::L, GAMEPAD_LEFT_SHOULDER);
    set(Button::Minus, GAMEPAD_BACK);
    set(Button::Plus, GAMEPAD_START);
    set(Button::TriggerR, GAMEPAD_RIGHT_THUMB);
    set(Button::TriggerL, GAMEPAD_LEFT_THUMB);
    set(Button::Down, GAMEPAD_DPAD_DOWN);
    set(Button::Up, GAMEPAD_DPAD_UP);
    set(Button::Right, GAMEPAD_DPAD_RIGHT);
    set(Button::Left, GAMEPAD_DPAD_LEFT);
    buttons
}

/// Translate one input report into XInput gamepad and battery state.
pub fn translate(
    states: &CommonStates,
    calibration: &StickCalibration,
) -> (XInputState, XInputBatteryInformation) {
    let keys = states.keys.value();
    let (left_x, left_y) = states.left_stick.split();
    let (right_x, right_y) = states.right_stick.split();

    let gamepad = XInputGamepad {
        buttons: map_buttons(keys),
        // the Pro's triggers are switches, not analog axes
        left_trigger: if Button::Zl.is_pressed(keys) { 0xFF } else { 0 },
        right_trigger: if Button::Zr.is_pressed(keys) { 0xFF } else { 0 },
        thumb_lx: calibration.left_x.remap(left_x),
        thumb_ly: calibration.left_y.remap(left_y),
        thumb_rx: calibration.right_x.remap(right_x),
        thumb_ry: calibration.right_y.remap(right_y),
    };

    let state = XInputState { packet_number: u32::from(states.timestamp), gamepad };
    let battery = XInputBatteryInformation {
        battery_type: BATTERY_TYPE_NIMH,
        battery_level: decode_battery_level(states.battery_and_wired),
    };
    (state, battery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hid_procon_protocol::U24;

    fn neutral_states() -> CommonStates {
        let calibration = StickCalibration::default();
        CommonStates {
            timestamp: 0,
            battery_and_wired: 0x80,
            keys: U24::from_value(0),
            left_stick: U24::pack(calibration.left_x.neutral, calibration.left_y.neutral),
            right_stick: U24::pack(calibration.right_x.neutral, calibration.right_y.neutral),
            vibration: 0,
        }
    }

    #[test]
    fn test_remap_hits_the_three_calibration_points() {
        let axis = AxisCalibration { min: 0x220, neutral: 0x7E0, max: 0xE20 };
        assert_eq!(axis.remap(axis.neutral), 0);
        assert_eq!(axis.remap(axis.max), 0x7FFF);
        assert_eq!(axis.remap(axis.min), -0x8000);
    }

    #[test]
    fn test_remap_clamps_out_of_range_samples() {
        let axis = AxisCalibration { min: 0x220, neutral: 0x7E0, max: 0xE20 };
        assert_eq!(axis.remap(0x000), -0x8000);
        assert_eq!(axis.remap(0xFFF), 0x7FFF);
    }

    #[test]
    fn test_positional_face_button_mapping() {
        let mut states = neutral_states();
        states.keys = U24::from_value(Button::A.bit());
        let (state, _) = translate(&states, &StickCalibration::default());
        assert_eq!(state.gamepad.buttons, GAMEPAD_B);

        states.keys = U24::from_value(Button::Y.bit());
        let (state, _) = translate(&states, &StickCalibration::default());
        assert_eq!(state.gamepad.buttons, GAMEPAD_X);
    }

    #[test]
    fn test_digital_triggers_saturate() {
        let mut states = neutral_states();
        states.keys = U24::from_value(Button::Zl.bit() | Button::Zr.bit());
        let (state, _) = translate(&states, &StickCalibration::default());
        assert_eq!(state.gamepad.left_trigger, 0xFF);
        assert_eq!(state.gamepad.right_trigger, 0xFF);
        assert_eq!(state.gamepad.buttons, 0);
    }

    #[test]
    fn test_neutral_sticks_translate_to_zero() {
        let (state, battery) = translate(&neutral_states(), &StickCalibration::default());
        assert_eq!(state.gamepad.thumb_lx, 0);
        assert_eq!(state.gamepad.thumb_ly, 0);
        assert_eq!(state.gamepad.thumb_rx, 0);
        assert_eq!(state.gamepad.thumb_ry, 0);
        assert_eq!(battery.battery_type, BATTERY_TYPE_NIMH);
        assert_eq!(battery.battery_level, BATTERY_LEVEL_FULL);
    }

    #[test]
    fn test_stick_extremes_reach_the_full_xinput_range() {
        let calibration = StickCalibration::default();
        let mut states = neutral_states();
        states.left_stick =
            U24::pack(calibration.left_x.max, calibration.left_y.min);
        let (state, _) = translate(&states, &calibration);
        assert_eq!(state.gamepad.thumb_lx, 0x7FFF);
        assert_eq!(state.gamepad.thumb_ly, -0x8000);
    }

    #[test]
    fn test_packet_number_carries_device_timestamp() {
        let mut states = neutral_states();
        states.timestamp = 0xC7;
        let (state, _) = translate(&states, &StickCalibration::default());
        assert_eq!(state.packet_number, 0xC7);
    }

    #[test]
    fn test_battery_decode_boundaries() {
        assert_eq!(decode_battery_level(0x00), BATTERY_LEVEL_EMPTY);
        assert_eq!(decode_battery_level(0x10), BATTERY_LEVEL_LOW);
        assert_eq!(decode_battery_level(0x3F), BATTERY_LEVEL_LOW);
        assert_eq!(decode_battery_level(0x40), BATTERY_LEVEL_MEDIUM);
        assert_eq!(decode_battery_level(0x6C), BATTERY_LEVEL_MEDIUM);
        assert_eq!(decode_battery_level(0x70), BATTERY_LEVEL_FULL);
        assert_eq!(decode_battery_level(0x80), BATTERY_LEVEL_FULL);
    }
}
