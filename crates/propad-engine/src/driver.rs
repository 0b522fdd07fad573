//! Synchronous protocol helpers and the initialization handshake.

use crate::error::{DeviceError, DeviceResult, IoFault};
use crate::io::buffer::Buffer;
use crate::io::channel::DeviceChannel;
use crate::io::pipe::{OpStatus, SYNC_INFINITE};
use hid_procon_protocol::{iterate_frames, CommandCode, FrameStep, Packet, SubcommandCode};
use std::time::{Duration, Instant};
use tracing::debug;

/// LED index payload for the player-one light.
const PLAYER_ONE_LED: u32 = 1;

/// Keep issuing synchronous reads until a packet satisfies `matcher` or
/// the deadline passes. Each read gets the remaining budget; a transfer
/// may carry several frames and all of them are offered to the matcher.
fn read_until<F>(channel: &DeviceChannel, timeout: Duration, mut matcher: F) -> DeviceResult<()>
where
    F: FnMut(&Packet) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut transfer = Buffer::new(channel.read_buffer_len());

    loop {
        let Some(remaining) = deadline.checked_duration_since(Instant::now()).filter(|d| !d.is_zero())
        else {
            return Err(DeviceError::ReplyTimeout { timeout_ms: timeout.as_millis() as u64 });
        };

        let result = channel.read_sync(&mut transfer, remaining);
        match result.status {
            OpStatus::Success => {}
            OpStatus::StillExecuting => {
                return Err(DeviceError::ReplyTimeout { timeout_ms: timeout.as_millis() as u64 });
            }
            OpStatus::InvalidFile => {
                return Err(DeviceError::Io(
                    result.fault.unwrap_or(IoFault::Closed),
                ));
            }
        }

        let len = result.len.min(transfer.len());
        let mut matched = false;
        iterate_frames(&transfer.as_slice()[..len], |frame| {
            match frame.decode() {
                Some(packet) if matcher(&packet) => {
                    matched = true;
                    FrameStep::Stop
                }
                _ => FrameStep::Continue,
            }
        });
        if matched {
            return Ok(());
        }
    }
}

/// Write a bare command and, when the device produces one, wait for the
/// matching `0x81` reply.
pub fn send_command(
    channel: &DeviceChannel,
    code: CommandCode,
    expect_reply: bool,
    reply_timeout: Duration,
) -> DeviceResult<()> {
    let frame = Packet::host_command(code).encode();
    let written = channel.write_sync(&frame, SYNC_INFINITE);
    if !written.is_success() {
        return Err(DeviceError::Io(written.fault.unwrap_or(IoFault::Closed)));
    }

    if expect_reply {
        read_until(channel, reply_timeout, |packet| {
            matches!(packet, Packet::CommandReply(reply) if reply.cmd_code == code as u8)
        })?;
    }
    Ok(())
}

/// Write a subcommand frame (neutral rumble) and, when asked, wait for
/// the matching `0x21` reply. The acknowledge byte is not inspected; a
/// reply with the right subcommand code counts as success.
pub fn send_subcommand(
    channel: &DeviceChannel,
    code: SubcommandCode,
    serial_id: u8,
    data: u32,
    expect_reply: bool,
    reply_timeout: Duration,
) -> DeviceResult<()> {
    let frame = Packet::host_subcommand(code, serial_id, data).encode();
    let written = channel.write_sync(&frame, SYNC_INFINITE);
    if !written.is_success() {
        return Err(DeviceError::Io(written.fault.unwrap_or(IoFault::Closed)));
    }

    if expect_reply {
        read_until(channel, reply_timeout, |packet| {
            matches!(packet, Packet::SubcommandReply(reply) if reply.subcmd_code == code as u8)
        })?;
    }
    Ok(())
}

/// Wait until the device emits a `0x30` input report. Used to probe
/// whether a freshly-opened controller is already streaming.
pub fn wait_full_states(channel: &DeviceChannel, reply_timeout: Duration) -> DeviceResult<()> {
    read_until(channel, reply_timeout, |packet| matches!(packet, Packet::FullStates(_)))
}

/// The vendor initialization handshake, run after open and after any
/// reattach that finds the controller not yet streaming.
///
/// Order matters: the handshake brackets the high-speed switch, `ForceUsb`
/// never gets a reply, and the player light doubles as the final liveness
/// check. The first failing step aborts; the agent retries on the next
/// reattach.
pub fn initialize(channel: &DeviceChannel, reply_timeout: Duration) -> DeviceResult<()> {
    debug!("handshake: HandShake");
    send_command(channel, CommandCode::HandShake, true, reply_timeout)
        .map_err(DeviceError::init_step("handshake"))?;

    debug!("handshake: SetHighSpeed");
    send_command(channel, CommandCode::SetHighSpeed, true, reply_timeout)
        .map_err(DeviceError::init_step("set-high-speed"))?;

    debug!("handshake: HandShake (at high speed)");
    send_command(channel, CommandCode::HandShake, true, reply_timeout)
        .map_err(DeviceError::init_step("handshake-high-speed"))?;

    debug!("handshake: ForceUsb");
    send_command(channel, CommandCode::ForceUsb, false, reply_timeout)
        .map_err(DeviceError::init_step("force-usb"))?;

    debug!("handshake: SetPlayerLights");
    send_subcommand(
        channel,
        SubcommandCode::SetPlayerLights,
        1,
        PLAYER_ONE_LED,
        true,
        reply_timeout,
    )
    .map_err(DeviceError::init_step("set-player-lights"))?;

    Ok(())
}
