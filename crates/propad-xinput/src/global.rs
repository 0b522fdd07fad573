//! The process-wide agent behind the flat C entry points.

use propad_engine::{AgentConfig, ProAgent};
use std::sync::OnceLock;

static AGENT: OnceLock<ProAgent> = OnceLock::new();

/// The singleton agent, constructed on first use.
///
/// Construction also deregisters generic-joystick raw input with the
/// window manager so other input layers in the host process stop racing
/// this library for the controller's reports.
pub fn global_agent() -> &'static ProAgent {
    AGENT.get_or_init(|| {
        #[cfg(windows)]
        crate::raw_input::deregister_joystick_raw_input();

        ProAgent::new(AgentConfig::default())
    })
}
