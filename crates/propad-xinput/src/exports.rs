//! The exported `XInput*` symbols.
//!
//! Which symbols a build carries follows the selected version set:
//! every set exposes the state/capability core, `set-1-3` adds the
//! legacy keystroke/battery/DSound entries, and `set-uap` the modern
//! audio-device query. Name decoration and ordinals are left to the
//! module-definition step of the packaging build.

#![allow(non_snake_case)]

use crate::global::global_agent;
use crate::surface;
use propad_xinput_types::{
    XInputBatteryInformation, XInputCapabilities, XInputKeystroke, XInputState, XInputVibration,
    ERROR_DEVICE_NOT_CONNECTED,
};

#[cfg(feature = "forward")]
fn sibling() -> Option<&'static crate::forward::SiblingXInput> {
    use std::sync::OnceLock;
    static SIBLING: OnceLock<Option<crate::forward::SiblingXInput>> = OnceLock::new();
    SIBLING.get_or_init(crate::forward::SiblingXInput::load).as_ref()
}

#[no_mangle]
pub unsafe extern "system" fn XInputGetState(user_index: u32, state: *mut XInputState) -> u32 {
    let Some(state) = (unsafe { state.as_mut() }) else {
        return ERROR_DEVICE_NOT_CONNECTED;
    };

    #[cfg(feature = "forward")]
    if let Some(sibling) = sibling() {
        if let Some(code) = sibling.get_state(user_index, state) {
            return code;
        }
    }

    surface::get_state(global_agent(), user_index, state)
}

#[no_mangle]
pub unsafe extern "system" fn XInputSetState(
    user_index: u32,
    vibration: *const XInputVibration,
) -> u32 {
    let Some(vibration) = (unsafe { vibration.as_ref() }) else {
        return ERROR_DEVICE_NOT_CONNECTED;
    };

    #[cfg(feature = "forward")]
    if let Some(sibling) = sibling() {
        if let Some(code) = sibling.set_state(user_index, vibration) {
            return code;
        }
    }

    surface::set_state(global_agent(), user_index, vibration)
}

#[no_mangle]
pub unsafe extern "system" fn XInputGetCapabilities(
    user_index: u32,
    flags: u32,
    capabilities: *mut XInputCapabilities,
) -> u32 {
    let Some(capabilities) = (unsafe { capabilities.as_mut() }) else {
        return ERROR_DEVICE_NOT_CONNECTED;
    };

    #[cfg(feature = "forward")]
    if let Some(sibling) = sibling() {
        if let Some(code) = sibling.get_capabilities(user_index, flags, capabilities) {
            return code;
        }
    }

    surface::get_capabilities(global_agent(), user_index, flags, capabilities)
}

#[cfg(any(feature = "set-1-3", feature = "set-uap"))]
#[no_mangle]
pub unsafe extern "system" fn XInputEnable(enable: i32) {
    surface::enable(enable != 0);
}

#[cfg(any(feature = "set-1-3", feature = "set-uap"))]
#[no_mangle]
pub unsafe extern "system" fn XInputGetBatteryInformation(
    user_index: u32,
    dev_type: u8,
    battery_information: *mut XInputBatteryInformation,
) -> u32 {
    let Some(battery_information) = (unsafe { battery_information.as_mut() }) else {
        return ERROR_DEVICE_NOT_CONNECTED;
    };
    surface::get_battery_information(global_agent(), user_index, dev_type, battery_information)
}

#[cfg(any(feature = "set-1-3", feature = "set-uap"))]
#[no_mangle]
pub unsafe extern "system" fn XInputGetKeystroke(
    user_index: u32,
    reserved: u32,
    keystroke: *mut XInputKeystroke,
) -> u32 {
    let Some(keystroke) = (unsafe { keystroke.as_mut() }) else {
        return ERROR_DEVICE_NOT_CONNECTED;
    };
    surface::get_keystroke(global_agent(), user_index, reserved, keystroke)
}

#[cfg(feature = "set-uap")]
#[no_mangle]
pub unsafe extern "system" fn XInputGetAudioDeviceIds(
    user_index: u32,
    _render_device_id: *mut u16,
    _render_count: *mut u32,
    _capture_device_id: *mut u16,
    _capture_count: *mut u32,
) -> u32 {
    surface::get_audio_device_ids(global_agent(), user_index)
}

#[cfg(any(feature = "set-1-3", feature = "set-9-1-0"))]
#[no_mangle]
pub unsafe extern "system" fn XInputGetDSoundAudioDeviceGuids(
    _user_index: u32,
    _dsound_render_guid: *mut core::ffi::c_void,
    _dsound_capture_guid: *mut core::ffi::c_void,
) -> u32 {
    surface::get_dsound_audio_device_guids()
}
