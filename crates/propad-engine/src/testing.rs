//! Scripted devices for exercising the engine without hardware.
//!
//! A [`ScriptedDevice`] plugs into the same [`DeviceFile`] seam as the real
//! transport: tests queue inbound transfers, observe outbound packets, and
//! can auto-reply to writes the way the controller firmware would.

use crate::error::{DeviceError, IoFault};
use crate::io::device::{DeviceFile, DeviceOpener};
use hid_procon_protocol::{
    packets, CommandCode, CommandReply, CommonStates, Packet, SubcommandReply,
};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Reply policy invoked for every outbound packet; each returned `Vec<u8>`
/// becomes one inbound transfer.
pub type Responder = Box<dyn FnMut(&Packet) -> Vec<Vec<u8>> + Send>;

struct ScriptState {
    pending: VecDeque<Vec<u8>>,
    written: Vec<Packet>,
    responder: Option<Responder>,
}

/// An in-memory stand-in for the controller.
pub struct ScriptedDevice {
    state: Mutex<ScriptState>,
    readable: Condvar,
    open: AtomicBool,
}

impl ScriptedDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ScriptState {
                pending: VecDeque::new(),
                written: Vec::new(),
                responder: None,
            }),
            readable: Condvar::new(),
            open: AtomicBool::new(true),
        })
    }

    /// Queue one inbound transfer (any byte shape, valid or not).
    pub fn queue_transfer(&self, bytes: impl Into<Vec<u8>>) {
        self.state.lock().pending.push_back(bytes.into());
        self.readable.notify_all();
    }

    /// Queue a single coalesced transfer carrying `packets` back to back.
    pub fn queue_packets(&self, packets: &[Packet]) {
        let bytes: Vec<u8> = packets.iter().flat_map(|p| p.encode()).collect();
        self.queue_transfer(bytes);
    }

    /// Every outbound packet decoded so far, in write order.
    pub fn written_packets(&self) -> Vec<Packet> {
        self.state.lock().written.clone()
    }

    /// Install a reply policy for future writes.
    pub fn set_responder(&self, responder: impl FnMut(&Packet) -> Vec<Vec<u8>> + Send + 'static) {
        self.state.lock().responder = Some(Box::new(responder));
    }

    pub fn pending_transfers(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl DeviceFile for ScriptedDevice {
    fn read(&self, buf: &mut [u8], cancel: &AtomicBool) -> Result<usize, IoFault> {
        let mut state = self.state.lock();
        loop {
            if !self.open.load(Ordering::Acquire) {
                return Err(IoFault::Closed);
            }
            if cancel.load(Ordering::Acquire) {
                return Err(IoFault::Cancelled);
            }
            if let Some(transfer) = state.pending.pop_front() {
                let len = transfer.len().min(buf.len());
                buf[..len].copy_from_slice(&transfer[..len]);
                return Ok(len);
            }
            // short slices so cancellation and close are observed promptly
            let _ = self.readable.wait_for(&mut state, Duration::from_millis(2));
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize, IoFault> {
        if !self.open.load(Ordering::Acquire) {
            return Err(IoFault::Closed);
        }
        let mut state = self.state.lock();
        let ScriptState { pending, written, responder } = &mut *state;
        for packet in packets(buf) {
            written.push(packet);
            if let Some(responder) = responder {
                pending.extend(responder(&packet));
            }
        }
        drop(state);
        self.readable.notify_all();
        Ok(buf.len())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
        self.readable.notify_all();
    }
}

/// Hands out a fixed sequence of scripted devices, one per reattach.
pub struct ScriptedOpener {
    devices: Mutex<VecDeque<Arc<ScriptedDevice>>>,
}

impl ScriptedOpener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { devices: Mutex::new(VecDeque::new()) })
    }

    pub fn push_device(&self, device: Arc<ScriptedDevice>) {
        self.devices.lock().push_back(device);
    }
}

impl DeviceOpener for ScriptedOpener {
    fn open(&self) -> Result<Arc<dyn DeviceFile>, DeviceError> {
        match self.devices.lock().pop_front() {
            Some(device) => Ok(device),
            None => Err(DeviceError::NotFound),
        }
    }
}

/// A responder scripting the firmware's side of the initialization
/// handshake: commands are acknowledged with `0x81` frames (except
/// `ForceUsb`, which the device never answers) and subcommands with
/// `0x21` frames.
pub fn handshake_responder() -> Responder {
    Box::new(|packet: &Packet| match packet {
        Packet::Command(code) if *code != CommandCode::ForceUsb => {
            vec![Packet::CommandReply(CommandReply { cmd_code: *code as u8 }).encode().to_vec()]
        }
        Packet::RumbleAndSubcommand(p) => {
            let reply = Packet::SubcommandReply(SubcommandReply {
                states: CommonStates::default(),
                subcmd_ack: 0x80,
                subcmd_code: p.subcmd as u8,
                data: 0,
            });
            vec![reply.encode().to_vec()]
        }
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hid_procon_protocol::SubcommandCode;

    #[test]
    fn test_handshake_responder_matches_firmware_behavior() {
        let device = ScriptedDevice::new();
        device.set_responder(handshake_responder());

        let frame = Packet::host_command(CommandCode::HandShake).encode();
        device.write(&frame).expect("write");
        assert_eq!(device.pending_transfers(), 1);

        let silent = Packet::host_command(CommandCode::ForceUsb).encode();
        device.write(&silent).expect("write");
        assert_eq!(device.pending_transfers(), 1);

        let sub = Packet::host_subcommand(SubcommandCode::SetPlayerLights, 1, 1).encode();
        device.write(&sub).expect("write");
        assert_eq!(device.pending_transfers(), 2);
    }
}
