//! The controller agent: one worker thread driving device I/O into a
//! cache that game threads query at will.

use crate::adaptor;
use crate::config::AgentConfig;
use crate::driver;
use crate::hid::{HidOpener, UnavailableOpener};
use crate::io::buffer::Buffer;
use crate::io::channel::DeviceChannel;
use crate::io::device::DeviceOpener;
use crate::io::pipe::OpStatus;
use hid_procon_protocol::{packets, CommonStates, Packet};
use parking_lot::{Condvar, Mutex, RwLock};
use propad_xinput_types::{XInputBatteryInformation, XInputState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Slice length for the first-pull gate so waiters notice a channel going
/// invalid even without a matching notify.
const GATE_WAIT_SLICE: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, Default)]
struct CachedState {
    /// `None` until the first report lands after construction.
    updated_at: Option<Instant>,
    gamepad: XInputState,
    battery: XInputBatteryInformation,
}

struct AgentShared {
    config: AgentConfig,
    channel: DeviceChannel,
    cache: RwLock<CachedState>,
    stop: AtomicBool,
    first_pull: AtomicBool,
    gate: Mutex<()>,
    gate_event: Condvar,
    opener: Arc<dyn DeviceOpener>,
}

impl AgentShared {
    fn cache_is_stale(&self) -> bool {
        let cache = self.cache.read();
        cache.updated_at.map_or(true, |at| at.elapsed() > self.config.packet_timeout())
    }

    fn store_states(&self, states: &CommonStates) {
        let (gamepad, battery) = adaptor::translate(states, &self.config.calibration);
        {
            let mut cache = self.cache.write();
            cache.updated_at = Some(Instant::now());
            cache.gamepad = gamepad;
            cache.battery = battery;
        }
        if !self.first_pull.swap(true, Ordering::AcqRel) {
            trace!("first input report cached");
        }
        self.notify_gate();
    }

    fn reset_first_pull(&self) {
        self.first_pull.store(false, Ordering::Release);
        self.notify_gate();
    }

    fn teardown_channel(&self) {
        self.channel.close();
        self.notify_gate();
    }

    fn notify_gate(&self) {
        let _gate = self.gate.lock();
        self.gate_event.notify_all();
    }
}

/// Owns the device channel and a worker thread polling it at a fixed
/// cadence; serves synchronous state queries from the cached translation.
///
/// Consumers may call the query methods from any number of threads; the
/// worker is the only writer.
pub struct ProAgent {
    shared: Arc<AgentShared>,
    worker: Option<JoinHandle<()>>,
}

impl ProAgent {
    /// Agent over the real HID transport.
    pub fn new(config: AgentConfig) -> Self {
        let opener: Arc<dyn DeviceOpener> = match HidOpener::new() {
            Ok(opener) => Arc::new(opener),
            Err(err) => Arc::new(UnavailableOpener::new(err.to_string())),
        };
        Self::with_opener(config, opener)
    }

    /// Agent over any opener; this is the seam scripted tests use.
    pub fn with_opener(config: AgentConfig, opener: Arc<dyn DeviceOpener>) -> Self {
        let pipes = config.pipes;
        let shared = Arc::new(AgentShared {
            config,
            channel: DeviceChannel::detached(pipes),
            cache: RwLock::new(CachedState::default()),
            stop: AtomicBool::new(false),
            first_pull: AtomicBool::new(false),
            gate: Mutex::new(()),
            gate_event: Condvar::new(),
            opener,
        });

        // Open synchronously so queries arriving right after construction
        // already see a valid device; the worker probes and initializes it.
        match shared.opener.open().and_then(|device| DeviceChannel::open(device, pipes)) {
            Ok(channel) => shared.channel.replace(channel),
            Err(err) => debug!("no controller at construction: {err}"),
        }

        // with no worker the agent stays permanently disconnected; the
        // host only ever sees a missing controller
        let worker = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("propad-agent".into())
                .spawn(move || Self::worker_loop(shared))
        };
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("failed to spawn agent worker thread: {err}");
                shared.teardown_channel();
                None
            }
        };

        Self { shared, worker }
    }

    /// Copy of the cached gamepad state, plus whether it is fresh (updated
    /// within the packet timeout).
    pub fn get_state(&self) -> (XInputState, bool) {
        let cache = self.shared.cache.read();
        let fresh = cache
            .updated_at
            .is_some_and(|at| at.elapsed() < self.shared.config.packet_timeout());
        (cache.gamepad, fresh)
    }

    /// Copy of the cached battery information, with the same freshness
    /// contract as [`get_state`](Self::get_state).
    pub fn get_battery(&self) -> (XInputBatteryInformation, bool) {
        let cache = self.shared.cache.read();
        let fresh = cache
            .updated_at
            .is_some_and(|at| at.elapsed() < self.shared.config.packet_timeout());
        (cache.battery, fresh)
    }

    /// Whether the channel currently holds a usable device handle.
    pub fn is_device_valid(&self) -> bool {
        self.shared.channel.is_device_valid()
    }

    /// Block until the worker has cached at least one report since the
    /// last (re)attach, or the channel goes invalid. Must not be called
    /// from the worker thread.
    pub fn wait_for_first_pull(&self) -> bool {
        let mut gate = self.shared.gate.lock();
        loop {
            if self.shared.first_pull.load(Ordering::Acquire) {
                return true;
            }
            if !self.shared.channel.is_device_valid() {
                return false;
            }
            let _ = self.shared.gate_event.wait_for(&mut gate, GATE_WAIT_SLICE);
        }
    }

    fn worker_loop(shared: Arc<AgentShared>) {
        debug!("agent worker started");
        if shared.channel.is_device_valid() {
            Self::prepare_channel(&shared);
        }
        let mut transfer = Buffer::new(shared.config.pipes.read_buffer_len);
        while !shared.stop.load(Ordering::Acquire) {
            Self::tick(&shared, &mut transfer);
            std::thread::sleep(shared.config.pull_interval());
        }
        debug!("agent worker stopped");
    }

    /// One worker tick: drain a completed read if there is one, keep the
    /// pipeline filled, and tear down on anything channel-fatal. Reattach
    /// runs at most once per tick.
    fn tick(shared: &AgentShared, transfer: &mut Buffer) {
        let mut reattach_budget = 1u32;

        if !shared.channel.is_device_valid()
            && !Self::try_reattach(shared, &mut reattach_budget)
        {
            return;
        }

        let popped = shared.channel.pop_read_result(transfer);
        match popped.status {
            OpStatus::InvalidFile => {
                shared.teardown_channel();
                Self::try_reattach(shared, &mut reattach_budget);
            }
            OpStatus::StillExecuting => {
                // A read that never completes usually means another process
                // (e.g. Steam) owns the device and pushed it to sleep.
                if shared.cache_is_stale() {
                    warn!("no report within the packet timeout; detaching");
                    shared.teardown_channel();
                    Self::try_reattach(shared, &mut reattach_budget);
                }
            }
            OpStatus::Success => {
                // reissue before translating so the device pipeline stays full
                let reissued = shared.channel.issue_read();

                let len = popped.len.min(transfer.len());
                let mut last_report: Option<CommonStates> = None;
                for packet in packets(&transfer.as_slice()[..len]) {
                    if let Packet::FullStates(states) = packet {
                        last_report = Some(states);
                    }
                }
                if let Some(states) = last_report {
                    shared.store_states(&states);
                }

                if reissued.status == OpStatus::InvalidFile {
                    shared.teardown_channel();
                    Self::try_reattach(shared, &mut reattach_budget);
                }
            }
        }
    }

    fn try_reattach(shared: &AgentShared, budget: &mut u32) -> bool {
        if *budget == 0 {
            return false;
        }
        *budget -= 1;
        Self::reattach(shared)
    }

    /// Locate and open the controller, then bring the fresh channel into
    /// its steady streaming state.
    fn reattach(shared: &AgentShared) -> bool {
        shared.reset_first_pull();

        let device = match shared.opener.open() {
            Ok(device) => device,
            Err(err) => {
                trace!("reattach attempt failed: {err}");
                return false;
            }
        };

        info!("Pro controller attached");
        let channel = match DeviceChannel::open(device, shared.config.pipes) {
            Ok(channel) => channel,
            Err(err) => {
                // thread exhaustion counts as a disconnect; retried on a
                // later tick
                warn!("could not stand up the device channel: {err}");
                return false;
            }
        };
        shared.channel.replace(channel);
        Self::prepare_channel(shared)
    }

    /// Probe whether the device is already streaming; when it is not, run
    /// the initialization handshake.
    fn prepare_channel(shared: &AgentShared) -> bool {
        if driver::wait_full_states(&shared.channel, shared.config.reply_timeout()).is_ok() {
            debug!("device already streaming; handshake skipped");
            return true;
        }

        // the probe read may still be pending; clear it before talking
        shared.channel.cancel_read();

        match driver::initialize(&shared.channel, shared.config.reply_timeout()) {
            Ok(()) => {
                info!("initialization handshake complete");
                true
            }
            Err(err) => {
                warn!("initialization handshake failed: {err}");
                false
            }
        }
    }
}

impl Drop for ProAgent {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.shared.channel.close();
    }
}
