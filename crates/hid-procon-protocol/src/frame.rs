//! Walking a transfer buffer as a sequence of 64-byte frames.
//!
//! A transfer is treated as `⌊len / 64⌋` consecutive slots (an undersized
//! tail is discarded). Iteration visits every slot; whether a slot holds a
//! recognizable packet is for the visitor to decide, so an unrecognized
//! type tag is still visited — it just matches no predicate.

use crate::packet::{Packet, PacketType};
use crate::FRAME_LEN;

/// Zero-copy view over one 64-byte slot of a transfer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    bytes: &'a [u8; FRAME_LEN],
}

impl<'a> Frame<'a> {
    /// The raw type tag in byte 0.
    pub fn type_tag(&self) -> u8 {
        self.bytes[0]
    }

    /// The tag interpreted as a packet type, when it is one.
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_byte(self.bytes[0])
    }

    /// Decode the slot. `None` for an unrecognized type tag.
    pub fn decode(&self) -> Option<Packet> {
        Packet::decode(self.bytes)
    }

    pub fn as_bytes(&self) -> &'a [u8; FRAME_LEN] {
        self.bytes
    }
}

/// Visitor verdict for [`iterate_frames`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    Continue,
    Stop,
}

/// How an iteration pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Every frame in the buffer was visited.
    Completed,
    /// The visitor asked to stop.
    Stopped,
}

impl IterationOutcome {
    pub const fn was_stopped(self) -> bool {
        matches!(self, IterationOutcome::Stopped)
    }
}

/// Iterator over every frame slot of a transfer buffer.
pub fn frames(buf: &[u8]) -> impl Iterator<Item = Frame<'_>> {
    buf.chunks_exact(FRAME_LEN)
        .filter_map(|chunk| chunk.try_into().ok())
        .map(|bytes| Frame { bytes })
}

/// Iterator over the decodable packets of a transfer buffer. Slots with
/// unrecognized type tags are dropped silently.
pub fn packets(buf: &[u8]) -> impl Iterator<Item = Packet> + '_ {
    frames(buf).filter_map(|frame| frame.decode())
}

/// Invoke `visitor` on each of the `⌊len / 64⌋` frame slots in order,
/// stopping early when it returns [`FrameStep::Stop`].
pub fn iterate_frames<F>(buf: &[u8], mut visitor: F) -> IterationOutcome
where
    F: FnMut(&Frame<'_>) -> FrameStep,
{
    for frame in frames(buf) {
        if visitor(&frame) == FrameStep::Stop {
            return IterationOutcome::Stopped;
        }
    }
    IterationOutcome::Completed
}
