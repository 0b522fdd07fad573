//! Duplex channel pairing a read pipe and a write pipe over one device.

use crate::config::PipeParams;
use crate::error::{DeviceError, IoFault};
use crate::io::buffer::Buffer;
use crate::io::device::{ClosedDevice, DeviceFile};
use crate::io::pipe::{OpResult, OpStatus, ReadPipe, ReadResult, WritePipe, SYNC_INFINITE};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Both directions of device I/O with per-direction serialization.
///
/// Each public operation takes the mutex of the affected direction, so at
/// most one read and one write are in flight at any time. When both
/// directions are involved (close, replace) the locks are always taken in
/// the same order: read, then write, then the device slot.
pub struct DeviceChannel {
    read: Mutex<ReadPipe>,
    write: Mutex<WritePipe>,
    device: Mutex<Arc<dyn DeviceFile>>,
}

impl DeviceChannel {
    /// Wrap an opened device in a pair of pipes. Fails when the OS cannot
    /// provide the pipes' I/O threads; callers treat that like any other
    /// failed open.
    pub fn open(device: Arc<dyn DeviceFile>, params: PipeParams) -> Result<Self, DeviceError> {
        Ok(Self {
            read: Mutex::new(ReadPipe::new(Arc::clone(&device), params.read_buffer_len)?),
            write: Mutex::new(WritePipe::new(Arc::clone(&device), params.write_buffer_len)?),
            device: Mutex::new(device),
        })
    }

    /// A channel with no device behind it; every operation reports
    /// `InvalidFile` until [`replace`](Self::replace) swaps a live one in.
    /// Needs no I/O threads, so it cannot fail.
    pub fn detached(params: PipeParams) -> Self {
        let device: Arc<dyn DeviceFile> = Arc::new(ClosedDevice);
        Self {
            read: Mutex::new(ReadPipe::idle(params.read_buffer_len)),
            write: Mutex::new(WritePipe::idle(params.write_buffer_len)),
            device: Mutex::new(device),
        }
    }

    pub fn issue_read(&self) -> OpResult {
        self.read.lock().issue()
    }

    pub fn read_sync(&self, out: &mut Buffer, timeout: Duration) -> ReadResult {
        self.read.lock().read_sync(out, timeout)
    }

    /// Consume the completed read, if any. Reports `InvalidFile` once the
    /// channel has been closed, whatever the pipe state.
    pub fn pop_read_result(&self, out: &mut Buffer) -> ReadResult {
        let read = self.read.lock();
        if !self.is_device_valid() {
            return ReadResult::invalid(Some(IoFault::Closed));
        }
        read.consume_result(out)
    }

    pub fn write(&self, data: &[u8]) -> OpResult {
        self.write.lock().write(data)
    }

    pub fn write_sync(&self, data: &[u8], timeout: Duration) -> OpResult {
        self.write.lock().write_sync(data, timeout)
    }

    pub fn sync_read(&self, timeout: Duration) -> OpStatus {
        self.read.lock().sync(timeout)
    }

    pub fn sync_write(&self, timeout: Duration) -> OpStatus {
        self.write.lock().sync(timeout)
    }

    /// Wait for the read first, then spend whatever budget remains on the
    /// write. Scheduling overhead can eat the whole budget, in which case
    /// the write wait is skipped and the result is `StillExecuting`.
    pub fn sync_all(&self, timeout: Duration) -> OpStatus {
        let started = Instant::now();
        let read_outcome = self.sync_read(timeout);
        if read_outcome != OpStatus::Success {
            return read_outcome;
        }
        if timeout == SYNC_INFINITE {
            return self.sync_write(SYNC_INFINITE);
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return OpStatus::StillExecuting;
        }
        self.sync_write(timeout - elapsed)
    }

    pub fn cancel_read(&self) {
        self.read.lock().cancel();
    }

    /// Cancel the in-flight read and release the device. Later operations
    /// report `InvalidFile`.
    pub fn close(&self) {
        let read = self.read.lock();
        let _write = self.write.lock();
        read.cancel();
        self.device.lock().close();
    }

    pub fn is_device_valid(&self) -> bool {
        self.device.lock().is_open()
    }

    pub fn read_buffer_len(&self) -> usize {
        self.read.lock().buffer_len()
    }

    pub fn write_buffer_len(&self) -> usize {
        self.write.lock().buffer_len()
    }

    /// Swap this channel's pipes and device for another's, closing out the
    /// old device. The replacement is consumed.
    pub fn replace(&self, other: DeviceChannel) {
        let mut read = self.read.lock();
        let mut write = self.write.lock();
        let mut device = self.device.lock();

        let DeviceChannel { read: new_read, write: new_write, device: new_device } = other;
        let old_read = std::mem::replace(&mut *read, new_read.into_inner());
        let old_write = std::mem::replace(&mut *write, new_write.into_inner());
        let old_device = std::mem::replace(&mut *device, new_device.into_inner());

        old_read.cancel();
        drop(old_read);
        drop(old_write);
        old_device.close();
    }
}
