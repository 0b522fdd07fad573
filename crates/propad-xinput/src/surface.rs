//! The XInput entry-point behavior, implemented against an agent
//! reference so it can be exercised without the exported C surface.
//!
//! Error policy: the host game only ever sees `ERROR_SUCCESS`,
//! `ERROR_DEVICE_NOT_CONNECTED`, or `ERROR_EMPTY`. Protocol and OS
//! failures stay inside the engine.

use propad_engine::ProAgent;
use propad_xinput_types::{
    XInputBatteryInformation, XInputCapabilities, XInputKeystroke, XInputState, XInputVibration,
    BATTERY_DEVTYPE_GAMEPAD, BATTERY_LEVEL_MEDIUM, BATTERY_TYPE_NIMH, ERROR_DEVICE_NOT_CONNECTED,
    ERROR_EMPTY, ERROR_SUCCESS,
};

/// Only one controller is bridged; every other index is vacant.
const USER_INDEX: u32 = 0;

fn connected(agent: &ProAgent, user_index: u32) -> bool {
    user_index == USER_INDEX && agent.is_device_valid()
}

/// `XInputGetState`.
///
/// A stale cache still reports success with a neutral state: some games
/// stop polling a slot for good after the first non-success result, so a
/// momentary gap must not look like a disconnect.
pub fn get_state(agent: &ProAgent, user_index: u32, out: &mut XInputState) -> u32 {
    if !connected(agent, user_index) {
        return ERROR_DEVICE_NOT_CONNECTED;
    }

    agent.wait_for_first_pull();

    let (state, fresh) = agent.get_state();
    *out = if fresh { state } else { XInputState::default() };
    ERROR_SUCCESS
}

/// `XInputSetState`. Vibration is accepted and discarded; the rumble
/// protocol exists but stays inactive.
pub fn set_state(agent: &ProAgent, user_index: u32, _vibration: &XInputVibration) -> u32 {
    if !connected(agent, user_index) {
        return ERROR_DEVICE_NOT_CONNECTED;
    }
    ERROR_SUCCESS
}

/// `XInputGetCapabilities`. Reports the capability block of a wired
/// gamepad regardless of flags.
pub fn get_capabilities(
    agent: &ProAgent,
    user_index: u32,
    _flags: u32,
    out: &mut XInputCapabilities,
) -> u32 {
    if !connected(agent, user_index) {
        return ERROR_DEVICE_NOT_CONNECTED;
    }
    *out = XInputCapabilities::bridged_gamepad();
    ERROR_SUCCESS
}

/// `XInputGetBatteryInformation`, with the same staleness policy as
/// [`get_state`]: a quiet device reports a plausible NiMH/medium pack.
pub fn get_battery_information(
    agent: &ProAgent,
    user_index: u32,
    dev_type: u8,
    out: &mut XInputBatteryInformation,
) -> u32 {
    if !connected(agent, user_index) || dev_type != BATTERY_DEVTYPE_GAMEPAD {
        return ERROR_DEVICE_NOT_CONNECTED;
    }

    agent.wait_for_first_pull();

    let (battery, fresh) = agent.get_battery();
    *out = if fresh {
        battery
    } else {
        XInputBatteryInformation {
            battery_type: BATTERY_TYPE_NIMH,
            battery_level: BATTERY_LEVEL_MEDIUM,
        }
    };
    ERROR_SUCCESS
}

/// `XInputGetKeystroke`: the bridge never produces keystroke events.
pub fn get_keystroke(
    agent: &ProAgent,
    user_index: u32,
    _reserved: u32,
    _out: &mut XInputKeystroke,
) -> u32 {
    if !connected(agent, user_index) {
        return ERROR_DEVICE_NOT_CONNECTED;
    }
    ERROR_EMPTY
}

/// `XInputGetAudioDeviceIds`: the controller has no audio endpoints.
pub fn get_audio_device_ids(agent: &ProAgent, user_index: u32) -> u32 {
    let _ = connected(agent, user_index);
    ERROR_DEVICE_NOT_CONNECTED
}

/// `XInputGetDSoundAudioDeviceGuids`: legacy audio is never available.
pub fn get_dsound_audio_device_guids() -> u32 {
    ERROR_DEVICE_NOT_CONNECTED
}

/// `XInputEnable`: accepted and ignored.
pub fn enable(_enable: bool) {}
