//! One-direction asynchronous pipes over a device handle.
//!
//! Each pipe owns its transfer buffer, a completion event, and a dedicated
//! I/O thread that performs the blocking transfer; issuing, polling,
//! waiting, and cancelling never block the caller. At most one operation
//! is in flight per pipe, and a completed read yields its payload exactly
//! once.

use crate::error::{DeviceError, IoFault};
use crate::io::buffer::Buffer;
use crate::io::device::{ClosedDevice, DeviceFile};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Timeout sentinel: wait until the operation settles, however long.
pub const SYNC_INFINITE: Duration = Duration::ZERO;

/// Tri-state outcome surfaced by every pipe operation. OS-level detail
/// rides along as an advisory [`IoFault`] and is never branched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    Success,
    /// A previous operation is still executing (issue) or the wait timed
    /// out (sync).
    StillExecuting,
    /// The handle is, or has become, unusable.
    InvalidFile,
}

/// Outcome of issuing or completing a write-side operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpResult {
    pub status: OpStatus,
    pub fault: Option<IoFault>,
}

impl OpResult {
    pub(crate) fn success() -> Self {
        Self { status: OpStatus::Success, fault: None }
    }

    pub(crate) fn still_executing() -> Self {
        Self { status: OpStatus::StillExecuting, fault: None }
    }

    pub(crate) fn invalid(fault: Option<IoFault>) -> Self {
        Self { status: OpStatus::InvalidFile, fault }
    }

    pub fn is_success(&self) -> bool {
        self.status == OpStatus::Success
    }
}

/// Outcome of consuming a read, carrying the transfer length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    pub status: OpStatus,
    pub fault: Option<IoFault>,
    /// Bytes the device produced for this read. May exceed what was copied
    /// into an undersized output buffer.
    pub len: usize,
}

impl ReadResult {
    fn success(len: usize) -> Self {
        Self { status: OpStatus::Success, fault: None, len }
    }

    fn still_executing() -> Self {
        Self { status: OpStatus::StillExecuting, fault: None, len: 0 }
    }

    pub(crate) fn invalid(fault: Option<IoFault>) -> Self {
        Self { status: OpStatus::InvalidFile, fault, len: 0 }
    }

    pub fn is_success(&self) -> bool {
        self.status == OpStatus::Success
    }
}

#[derive(Debug)]
enum Phase {
    Idle,
    InFlight,
    Done { outcome: Result<usize, IoFault>, consumed: bool },
}

struct Slot {
    phase: Phase,
    /// The pipe's transfer buffer. `None` exactly while the I/O thread is
    /// using it for an in-flight operation.
    buffer: Option<Buffer>,
}

struct PipeShared {
    slot: Mutex<Slot>,
    completed: Condvar,
    cancel: AtomicBool,
    device: Arc<dyn DeviceFile>,
}

enum Request {
    Read,
    Write,
    Shutdown,
}

fn io_thread(shared: Arc<PipeShared>, requests: mpsc::Receiver<Request>) {
    while let Ok(request) = requests.recv() {
        let is_read = match request {
            Request::Read => true,
            Request::Write => false,
            Request::Shutdown => break,
        };

        let mut buffer = {
            let mut slot = shared.slot.lock();
            slot.buffer.take().expect("transfer buffer present when an operation starts")
        };

        let outcome = if is_read {
            shared.device.read(buffer.as_mut_slice(), &shared.cancel)
        } else {
            shared.device.write(buffer.as_slice())
        };

        let mut slot = shared.slot.lock();
        slot.buffer = Some(buffer);
        slot.phase = Phase::Done { outcome, consumed: false };
        shared.completed.notify_all();
    }
}

/// State and thread shared by both pipe directions.
struct PipeCore {
    shared: Arc<PipeShared>,
    requests: Option<mpsc::Sender<Request>>,
    worker: Option<JoinHandle<()>>,
    buffer_len: usize,
}

impl PipeCore {
    /// Stand up the pipe's I/O thread. A spawn failure is returned as a
    /// failed open.
    fn new(
        device: Arc<dyn DeviceFile>,
        buffer_len: usize,
        label: &'static str,
    ) -> Result<Self, DeviceError> {
        let shared = Self::make_shared(device, buffer_len);
        let (requests, receiver) = mpsc::channel();
        let worker = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name(format!("propad-io-{label}"))
                .spawn(move || io_thread(shared, receiver))
                .map_err(|err| {
                    DeviceError::Open(format!("spawning the {label} pipe I/O thread: {err}"))
                })?
        };
        Ok(Self { shared, requests: Some(requests), worker: Some(worker), buffer_len })
    }

    /// A pipe with no I/O engine behind it, over a permanently-closed
    /// device. Backs the detached channel placeholder; every operation
    /// reports `InvalidFile` without ever dispatching.
    fn idle(buffer_len: usize) -> Self {
        Self {
            shared: Self::make_shared(Arc::new(ClosedDevice), buffer_len),
            requests: None,
            worker: None,
            buffer_len,
        }
    }

    fn make_shared(device: Arc<dyn DeviceFile>, buffer_len: usize) -> Arc<PipeShared> {
        Arc::new(PipeShared {
            slot: Mutex::new(Slot { phase: Phase::Idle, buffer: Some(Buffer::new(buffer_len)) }),
            completed: Condvar::new(),
            cancel: AtomicBool::new(false),
            device,
        })
    }

    /// Flip to in-flight and hand the staged operation to the I/O thread.
    /// The slot lock must be held by the caller, which has already ruled
    /// out a concurrent operation.
    fn dispatch(&self, slot: &mut Slot, request: Request) -> OpResult {
        let Some(requests) = self.requests.as_ref() else {
            return OpResult::invalid(Some(IoFault::Closed));
        };
        self.shared.cancel.store(false, Ordering::Release);
        slot.phase = Phase::InFlight;
        if requests.send(request).is_err() {
            slot.phase = Phase::Done { outcome: Err(IoFault::Closed), consumed: false };
            return OpResult::invalid(Some(IoFault::Closed));
        }
        OpResult::success()
    }

    fn sync(&self, timeout: Duration) -> OpStatus {
        let deadline = (timeout != SYNC_INFINITE).then(|| Instant::now() + timeout);
        let mut slot = self.shared.slot.lock();
        loop {
            match slot.phase {
                Phase::InFlight => {}
                Phase::Done { .. } => return OpStatus::Success,
                Phase::Idle => {
                    return if self.shared.device.is_open() {
                        OpStatus::Success
                    } else {
                        OpStatus::InvalidFile
                    };
                }
            }

            match deadline {
                None => {
                    self.shared.completed.wait(&mut slot);
                }
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return OpStatus::StillExecuting;
                    }
                    if self.shared.completed.wait_until(&mut slot, deadline).timed_out()
                        && matches!(slot.phase, Phase::InFlight)
                    {
                        return OpStatus::StillExecuting;
                    }
                }
            }
        }
    }

    fn cancel(&self) {
        let slot = self.shared.slot.lock();
        if matches!(slot.phase, Phase::InFlight) {
            self.shared.cancel.store(true, Ordering::Release);
        }
    }

    fn is_executing(&self) -> bool {
        matches!(self.shared.slot.lock().phase, Phase::InFlight)
    }
}

impl Drop for PipeCore {
    fn drop(&mut self) {
        self.shared.cancel.store(true, Ordering::Release);
        if let Some(requests) = self.requests.take() {
            let _ = requests.send(Request::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// The inbound half: issues device reads and hands out each completed
/// payload exactly once.
pub struct ReadPipe {
    core: PipeCore,
}

impl ReadPipe {
    pub fn new(device: Arc<dyn DeviceFile>, buffer_len: usize) -> Result<Self, DeviceError> {
        Ok(Self { core: PipeCore::new(device, buffer_len, "read")? })
    }

    pub(crate) fn idle(buffer_len: usize) -> Self {
        Self { core: PipeCore::idle(buffer_len) }
    }

    /// Start an asynchronous read. Re-issuing after a completed read
    /// clears its consumed flag and overwrites the old payload.
    pub fn issue(&self) -> OpResult {
        let mut slot = self.core.shared.slot.lock();
        if !self.core.shared.device.is_open() {
            return OpResult::invalid(Some(IoFault::Closed));
        }
        if matches!(slot.phase, Phase::InFlight) {
            return OpResult::still_executing();
        }
        self.core.dispatch(&mut slot, Request::Read)
    }

    /// Wait up to `timeout` for the in-flight operation to settle.
    /// [`SYNC_INFINITE`] waits without bound. Success means "settled",
    /// not "succeeded"; failures surface from [`consume_result`].
    ///
    /// [`consume_result`]: Self::consume_result
    pub fn sync(&self, timeout: Duration) -> OpStatus {
        self.core.sync(timeout)
    }

    /// Request cancellation of the in-flight read without waiting for it
    /// to settle.
    pub fn cancel(&self) {
        self.core.cancel();
    }

    pub fn is_executing(&self) -> bool {
        self.core.is_executing()
    }

    pub fn buffer_len(&self) -> usize {
        self.core.buffer_len
    }

    /// Copy the completed read into `out`. The first call after a
    /// successful read copies `min(out.len, transferred)` bytes and
    /// reports the transfer length; repeat calls succeed with zero bytes
    /// and leave `out` untouched.
    pub fn consume_result(&self, out: &mut Buffer) -> ReadResult {
        let mut slot = self.core.shared.slot.lock();
        if !self.core.shared.device.is_open() {
            return ReadResult::invalid(Some(IoFault::Closed));
        }

        let Slot { phase, buffer } = &mut *slot;
        match phase {
            Phase::Idle => ReadResult::success(0),
            Phase::InFlight => ReadResult::still_executing(),
            Phase::Done { outcome, consumed } => match outcome {
                Ok(len) => {
                    if *consumed {
                        return ReadResult::success(0);
                    }
                    *consumed = true;
                    let len = *len;
                    let payload = buffer.as_ref().expect("buffer present after completion");
                    let copy = len.min(out.len()).min(payload.len());
                    out.as_mut_slice()[..copy].copy_from_slice(&payload.as_slice()[..copy]);
                    ReadResult::success(len)
                }
                Err(fault) => ReadResult::invalid(Some(fault.clone())),
            },
        }
    }

    /// Issue a read and wait for its payload in one call.
    ///
    /// A leftover operation from an earlier cancel may still be draining;
    /// one settle-and-discard round absorbs it before the fresh read.
    pub fn read_sync(&self, out: &mut Buffer, timeout: Duration) -> ReadResult {
        for _ in 0..2 {
            let issued = self.issue();
            match issued.status {
                OpStatus::Success => {
                    return match self.sync(timeout) {
                        OpStatus::Success => self.consume_result(out),
                        OpStatus::StillExecuting => ReadResult::still_executing(),
                        OpStatus::InvalidFile => ReadResult::invalid(issued.fault),
                    };
                }
                OpStatus::StillExecuting => match self.sync(timeout) {
                    OpStatus::Success => {
                        let mut discard = Buffer::new(0);
                        let _ = self.consume_result(&mut discard);
                    }
                    OpStatus::StillExecuting => return ReadResult::still_executing(),
                    OpStatus::InvalidFile => return ReadResult::invalid(None),
                },
                OpStatus::InvalidFile => return ReadResult::invalid(issued.fault),
            }
        }
        ReadResult::still_executing()
    }
}

/// The outbound half: stages a transfer in its own buffer and writes it
/// asynchronously.
pub struct WritePipe {
    core: PipeCore,
}

impl WritePipe {
    pub fn new(device: Arc<dyn DeviceFile>, buffer_len: usize) -> Result<Self, DeviceError> {
        Ok(Self { core: PipeCore::new(device, buffer_len, "write")? })
    }

    pub(crate) fn idle(buffer_len: usize) -> Self {
        Self { core: PipeCore::idle(buffer_len) }
    }

    /// Start an asynchronous write of `data`, zero-padded to the pipe's
    /// buffer length.
    pub fn write(&self, data: &[u8]) -> OpResult {
        let mut slot = self.core.shared.slot.lock();
        if !self.core.shared.device.is_open() {
            return OpResult::invalid(Some(IoFault::Closed));
        }
        if matches!(slot.phase, Phase::InFlight) {
            return OpResult::still_executing();
        }

        let staging = slot.buffer.as_mut().expect("transfer buffer present while idle");
        if data.len() > staging.len() {
            return OpResult::invalid(Some(IoFault::Os(format!(
                "write of {} bytes exceeds the {}-byte pipe buffer",
                data.len(),
                staging.len()
            ))));
        }
        staging.clear();
        staging.as_mut_slice()[..data.len()].copy_from_slice(data);

        self.core.dispatch(&mut slot, Request::Write)
    }

    /// Write and wait for the transfer to settle, surfacing a completion
    /// failure as `InvalidFile`.
    pub fn write_sync(&self, data: &[u8], timeout: Duration) -> OpResult {
        let written = self.write(data);
        if !written.is_success() {
            return written;
        }
        match self.sync(timeout) {
            OpStatus::Success => {
                let slot = self.core.shared.slot.lock();
                match &slot.phase {
                    Phase::Done { outcome: Err(fault), .. } => {
                        OpResult::invalid(Some(fault.clone()))
                    }
                    _ => OpResult::success(),
                }
            }
            OpStatus::StillExecuting => OpResult::still_executing(),
            OpStatus::InvalidFile => OpResult::invalid(None),
        }
    }

    pub fn sync(&self, timeout: Duration) -> OpStatus {
        self.core.sync(timeout)
    }

    pub fn cancel(&self) {
        self.core.cancel();
    }

    pub fn is_executing(&self) -> bool {
        self.core.is_executing()
    }

    pub fn buffer_len(&self) -> usize {
        self.core.buffer_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDevice;

    #[test]
    fn test_issue_while_in_flight_reports_still_executing() {
        let device = ScriptedDevice::new();
        let pipe = ReadPipe::new(device.clone(), 64).expect("pipe");

        assert!(pipe.issue().is_success());
        assert_eq!(pipe.issue().status, OpStatus::StillExecuting);
        assert!(pipe.is_executing());

        device.queue_transfer(vec![0u8; 64]);
        assert_eq!(pipe.sync(Duration::from_millis(500)), OpStatus::Success);
        assert!(!pipe.is_executing());
    }

    #[test]
    fn test_consume_result_yields_payload_exactly_once() {
        let device = ScriptedDevice::new();
        let pipe = ReadPipe::new(device.clone(), 64).expect("pipe");
        device.queue_transfer(vec![0xAB; 64]);

        assert!(pipe.issue().is_success());
        assert_eq!(pipe.sync(Duration::from_millis(500)), OpStatus::Success);

        let mut out = Buffer::new(64);
        let first = pipe.consume_result(&mut out);
        assert_eq!(first.status, OpStatus::Success);
        assert_eq!(first.len, 64);
        assert_eq!(out.as_slice()[0], 0xAB);

        out.clear();
        let second = pipe.consume_result(&mut out);
        assert_eq!(second.status, OpStatus::Success);
        assert_eq!(second.len, 0);
        assert!(out.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_short_output_buffer_is_truncated_but_reports_full_length() {
        let device = ScriptedDevice::new();
        let pipe = ReadPipe::new(device.clone(), 128).expect("pipe");
        device.queue_transfer(vec![0x11; 100]);

        assert!(pipe.issue().is_success());
        assert_eq!(pipe.sync(Duration::from_millis(500)), OpStatus::Success);

        let mut out = Buffer::new(32);
        let result = pipe.consume_result(&mut out);
        assert_eq!(result.len, 100);
        assert!(out.as_slice().iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_sync_timeout_reports_still_executing() {
        let device = ScriptedDevice::new();
        let pipe = ReadPipe::new(device.clone(), 64).expect("pipe");

        assert!(pipe.issue().is_success());
        assert_eq!(pipe.sync(Duration::from_millis(30)), OpStatus::StillExecuting);

        pipe.cancel();
    }

    #[test]
    fn test_closed_device_reports_invalid_file() {
        let device = ScriptedDevice::new();
        let pipe = ReadPipe::new(device.clone(), 64).expect("pipe");
        device.close();

        let issued = pipe.issue();
        assert_eq!(issued.status, OpStatus::InvalidFile);
        assert_eq!(issued.fault, Some(IoFault::Closed));
    }

    #[test]
    fn test_cancel_settles_the_operation() {
        let device = ScriptedDevice::new();
        let pipe = ReadPipe::new(device.clone(), 64).expect("pipe");

        assert!(pipe.issue().is_success());
        pipe.cancel();
        assert_eq!(pipe.sync(Duration::from_millis(500)), OpStatus::Success);

        let mut out = Buffer::new(64);
        let result = pipe.consume_result(&mut out);
        assert_eq!(result.status, OpStatus::InvalidFile);
        assert_eq!(result.fault, Some(IoFault::Cancelled));
    }

    #[test]
    fn test_reissue_after_cancel_reads_fresh_data() {
        let device = ScriptedDevice::new();
        let pipe = ReadPipe::new(device.clone(), 64).expect("pipe");

        assert!(pipe.issue().is_success());
        pipe.cancel();

        device.queue_transfer(vec![0x5A; 64]);
        let mut out = Buffer::new(64);
        let result = pipe.read_sync(&mut out, Duration::from_millis(500));
        assert!(result.is_success());
        assert_eq!(out.as_slice()[0], 0x5A);
    }

    #[test]
    fn test_write_records_transfer_on_device() {
        let device = ScriptedDevice::new();
        let pipe = WritePipe::new(device.clone(), 64).expect("pipe");

        let mut frame = [0u8; 64];
        frame[0] = 0x80;
        frame[1] = 0x02;
        let result = pipe.write_sync(&frame, Duration::from_millis(500));
        assert!(result.is_success());

        let written = device.written_packets();
        assert_eq!(written.len(), 1);
    }

    #[test]
    fn test_oversized_write_is_rejected() {
        let device = ScriptedDevice::new();
        let pipe = WritePipe::new(device.clone(), 16).expect("pipe");
        let result = pipe.write(&[0u8; 64]);
        assert_eq!(result.status, OpStatus::InvalidFile);
    }
}
