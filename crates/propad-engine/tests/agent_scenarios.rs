//! End-to-end agent scenarios over scripted devices: streaming, staleness,
//! coalesced transfers, and reattach.

use hid_procon_protocol::{Button, CommandReply, CommonStates, Packet, U24};
use propad_engine::testing::{ScriptedDevice, ScriptedOpener};
use propad_engine::{AgentConfig, DeviceFile, PipeParams, ProAgent, StickCalibration};
use propad_xinput_types::{BATTERY_LEVEL_FULL, BATTERY_TYPE_NIMH, GAMEPAD_A, GAMEPAD_X};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn fast_config() -> AgentConfig {
    AgentConfig {
        pull_interval_ms: 2,
        packet_timeout_ms: 40,
        reply_timeout_ms: 80,
        ..Default::default()
    }
}

/// An input report with neutral sticks, the given keys, and a full battery.
fn full_states(timestamp: u8, keys: u32) -> Packet {
    let calibration = StickCalibration::default();
    Packet::FullStates(CommonStates {
        timestamp,
        battery_and_wired: 0x80,
        keys: U24::from_value(keys),
        left_stick: U24::pack(calibration.left_x.neutral, calibration.left_y.neutral),
        right_stick: U24::pack(calibration.right_x.neutral, calibration.right_y.neutral),
        vibration: 0,
    })
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Push reports on a background thread until the returned guard is dropped.
struct Feeder {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Feeder {
    fn start(device: Arc<ScriptedDevice>, keys: u32) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut timestamp = 0u8;
                while !stop.load(Ordering::Acquire) {
                    device.queue_packets(&[full_states(timestamp, keys)]);
                    timestamp = timestamp.wrapping_add(1);
                    thread::sleep(Duration::from_millis(5));
                }
            })
        };
        Self { stop, handle: Some(handle) }
    }
}

impl Drop for Feeder {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A device that passes the streaming probe immediately.
fn streaming_device() -> Arc<ScriptedDevice> {
    let device = ScriptedDevice::new();
    device.queue_packets(&[full_states(0, 0)]);
    device
}

#[test]
fn test_streamed_reports_reach_the_cache() {
    let device = streaming_device();
    let opener = ScriptedOpener::new();
    opener.push_device(device.clone());
    let agent = ProAgent::with_opener(fast_config(), opener);

    let _feeder = Feeder::start(device.clone(), Button::B.bit());

    assert!(agent.wait_for_first_pull(), "first pull must be observed");
    assert!(wait_until(Duration::from_millis(500), || {
        let (state, fresh) = agent.get_state();
        fresh && state.gamepad.buttons == GAMEPAD_A // Pro B sits at Xbox A's spot
    }));

    let (battery, fresh) = agent.get_battery();
    assert!(fresh);
    assert_eq!(battery.battery_type, BATTERY_TYPE_NIMH);
    assert_eq!(battery.battery_level, BATTERY_LEVEL_FULL);
    assert!(agent.is_device_valid());
}

#[test]
fn test_last_report_in_a_coalesced_transfer_wins() {
    let device = streaming_device();
    let opener = ScriptedOpener::new();
    opener.push_device(device.clone());

    // triple-frame transfers need a wider read buffer
    let config = AgentConfig {
        pipes: PipeParams { read_buffer_len: 256, write_buffer_len: 64 },
        ..fast_config()
    };
    let agent = ProAgent::with_opener(config, opener);

    let transfer: Vec<u8> = [
        full_states(5, Button::B.bit()),
        Packet::CommandReply(CommandReply { cmd_code: 0x02 }),
        full_states(9, Button::Y.bit()),
    ]
    .iter()
    .flat_map(|p| p.encode())
    .collect();
    device.queue_transfer(transfer);

    assert!(
        wait_until(Duration::from_millis(500), || {
            let (state, _) = agent.get_state();
            state.packet_number == 9
        }),
        "cache must reflect the final report of the transfer"
    );
    let (state, _) = agent.get_state();
    assert_eq!(state.gamepad.buttons, GAMEPAD_X); // Pro Y, positionally Xbox X
}

#[test]
fn test_cache_goes_stale_after_silence() {
    let device = streaming_device();
    let opener = ScriptedOpener::new();
    opener.push_device(device.clone());
    let agent = ProAgent::with_opener(fast_config(), opener);

    {
        let _feeder = Feeder::start(device.clone(), 0);
        assert!(agent.wait_for_first_pull());
        assert!(wait_until(Duration::from_millis(500), || agent.get_state().1));
    }

    // silence for well past the packet timeout
    thread::sleep(Duration::from_millis(150));

    let (state, fresh) = agent.get_state();
    assert!(!fresh, "state must be stale after 150ms of silence");
    let _ = state;

    // the worker treats the silence as a dead channel; with no replacement
    // device available it stays detached
    assert!(wait_until(Duration::from_millis(500), || !agent.is_device_valid()));
    assert!(!device.is_open(), "silent device must have been closed");
}

#[test]
fn test_reattach_after_silence_resumes_from_new_device() {
    let device_a = streaming_device();
    let device_b = streaming_device();
    let opener = ScriptedOpener::new();
    opener.push_device(device_a.clone());
    let agent = ProAgent::with_opener(fast_config(), opener.clone());

    {
        let _feed_a = Feeder::start(device_a.clone(), Button::B.bit());
        assert!(agent.wait_for_first_pull());
        assert!(wait_until(Duration::from_millis(500), || {
            let (state, fresh) = agent.get_state();
            fresh && state.gamepad.buttons == GAMEPAD_A
        }));
    }

    // the agent must notice the silence and drop the first device
    assert!(wait_until(Duration::from_millis(500), || !device_a.is_open()));

    // a replacement appears and streams different input
    opener.push_device(device_b.clone());
    let _feed_b = Feeder::start(device_b.clone(), Button::Y.bit());

    assert!(wait_until(Duration::from_millis(1000), || {
        let (state, fresh) = agent.get_state();
        fresh && state.gamepad.buttons == GAMEPAD_X
    }));
    assert!(agent.wait_for_first_pull(), "first pull must be re-observed after reattach");
    assert!(agent.is_device_valid());
}

#[test]
fn test_unplug_triggers_reattach() {
    let device_a = streaming_device();
    let device_b = streaming_device();
    let opener = ScriptedOpener::new();
    opener.push_device(device_a.clone());
    opener.push_device(device_b.clone());
    let agent = ProAgent::with_opener(fast_config(), opener);

    {
        let _feed_a = Feeder::start(device_a.clone(), 0);
        assert!(agent.wait_for_first_pull());
        // yank the device out from under the agent mid-stream
        device_a.close();
    }

    let _feed_b = Feeder::start(device_b.clone(), Button::B.bit());
    assert!(wait_until(Duration::from_millis(1000), || {
        let (state, fresh) = agent.get_state();
        fresh && state.gamepad.buttons == GAMEPAD_A
    }));
}

#[test]
fn test_agent_with_no_device_stays_disconnected() {
    let opener = ScriptedOpener::new();
    let agent = ProAgent::with_opener(fast_config(), opener);

    assert!(!agent.wait_for_first_pull());
    let (_, fresh) = agent.get_state();
    assert!(!fresh);
    assert!(!agent.is_device_valid());
}

#[test]
fn test_concurrent_readers_observe_consistent_snapshots() {
    let device = streaming_device();
    let opener = ScriptedOpener::new();
    opener.push_device(device.clone());
    let agent = Arc::new(ProAgent::with_opener(fast_config(), opener));

    let _feeder = Feeder::start(device.clone(), Button::B.bit());
    assert!(agent.wait_for_first_pull());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let agent = Arc::clone(&agent);
            thread::spawn(move || {
                let mut saw_fresh = false;
                for _ in 0..200 {
                    let (state, fresh) = agent.get_state();
                    let (battery, _) = agent.get_battery();
                    if fresh {
                        saw_fresh = true;
                        // a fresh snapshot is a complete one
                        assert_eq!(state.gamepad.buttons, GAMEPAD_A);
                        assert_eq!(battery.battery_level, BATTERY_LEVEL_FULL);
                    }
                    thread::sleep(Duration::from_millis(1));
                }
                saw_fresh
            })
        })
        .collect();

    for reader in readers {
        assert!(reader.join().expect("reader thread must not panic"));
    }
}
