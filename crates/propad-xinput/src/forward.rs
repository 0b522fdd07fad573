//! Chain-loading a sibling XInput library for the forwarding variant.
//!
//! Some titles ship pinned to a specific XInput file name; the forwarding
//! build stands in under that name and delegates the core entry points to
//! the real system library, falling back to the bridged agent when the
//! sibling or one of its symbols is missing.

use propad_xinput_types::{XInputCapabilities, XInputState, XInputVibration};
use tracing::{debug, warn};
use windows::core::{s, PCWSTR};
use windows::Win32::Foundation::HMODULE;
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

/// The system library the forwarding build delegates to.
const SIBLING_LIBRARY: &str = "xinput1_4.dll";

type RawSymbol = unsafe extern "system" fn() -> isize;
type GetStateFn = unsafe extern "system" fn(u32, *mut XInputState) -> u32;
type SetStateFn = unsafe extern "system" fn(u32, *const XInputVibration) -> u32;
type GetCapabilitiesFn = unsafe extern "system" fn(u32, u32, *mut XInputCapabilities) -> u32;

/// Resolved entry points of the sibling library. The module stays loaded
/// for the process lifetime, which keeps the function pointers valid.
pub struct SiblingXInput {
    _module: HMODULE,
    get_state: Option<GetStateFn>,
    set_state: Option<SetStateFn>,
    get_capabilities: Option<GetCapabilitiesFn>,
}

unsafe impl Send for SiblingXInput {}
unsafe impl Sync for SiblingXInput {}

impl SiblingXInput {
    pub fn load() -> Option<Self> {
        let wide: Vec<u16> = SIBLING_LIBRARY.encode_utf16().chain(std::iter::once(0)).collect();
        let module = match unsafe { LoadLibraryW(PCWSTR(wide.as_ptr())) } {
            Ok(module) if !module.is_invalid() => module,
            Ok(_) => {
                warn!("sibling {SIBLING_LIBRARY} loaded as an invalid module");
                return None;
            }
            Err(err) => {
                warn!("sibling {SIBLING_LIBRARY} not loadable: {err}");
                return None;
            }
        };
        debug!("forwarding to {SIBLING_LIBRARY}");

        unsafe {
            Some(Self {
                get_state: GetProcAddress(module, s!("XInputGetState"))
                    .map(|f| std::mem::transmute::<RawSymbol, GetStateFn>(f)),
                set_state: GetProcAddress(module, s!("XInputSetState"))
                    .map(|f| std::mem::transmute::<RawSymbol, SetStateFn>(f)),
                get_capabilities: GetProcAddress(module, s!("XInputGetCapabilities"))
                    .map(|f| std::mem::transmute::<RawSymbol, GetCapabilitiesFn>(f)),
                _module: module,
            })
        }
    }

    pub fn get_state(&self, user_index: u32, out: &mut XInputState) -> Option<u32> {
        self.get_state.map(|f| unsafe { f(user_index, out) })
    }

    pub fn set_state(&self, user_index: u32, vibration: &XInputVibration) -> Option<u32> {
        self.set_state.map(|f| unsafe { f(user_index, vibration) })
    }

    pub fn get_capabilities(
        &self,
        user_index: u32,
        flags: u32,
        out: &mut XInputCapabilities,
    ) -> Option<u32> {
        self.get_capabilities.map(|f| unsafe { f(user_index, flags, out) })
    }
}
