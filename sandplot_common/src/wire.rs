//! Byte-exact wire protocol shared by host and firmware.
//!
//! Every frame in both directions starts with the two-byte header sentinel,
//! followed by a one-byte opcode and an optional payload. The adjacent
//! appearance of the two header bytes (in order) is the only
//! resynchronization signal in the stream.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

// ─── Frame Layout ───────────────────────────────────────────────────

/// Two-byte header sentinel sent with every frame in both directions.
pub const HEADER: [u8; 2] = [0x61, 0x62];

/// Position payload: two 4-byte big-endian signed integers (`r`, `phi`).
pub const POSITION_PAYLOAD_LEN: usize = 8;

/// Speed payload: one 2-byte big-endian unsigned integer.
pub const SPEED_PAYLOAD_LEN: usize = 2;

/// Response frame without payload: `[header0, header1, opcode]`.
pub const RESPONSE_LEN: usize = 3;

/// Response frame with the queue-depth payload byte appended.
pub const RESPONSE_WITH_PAYLOAD_LEN: usize = 4;

const_assert!(POSITION_PAYLOAD_LEN == 2 * core::mem::size_of::<i32>());
const_assert!(SPEED_PAYLOAD_LEN == core::mem::size_of::<u16>());
const_assert!(RESPONSE_WITH_PAYLOAD_LEN == RESPONSE_LEN + 1);

// ─── Opcodes ────────────────────────────────────────────────────────

/// One-byte command identifier following a header (closed set).
///
/// Wire values 0x63..=0x68 are host→firmware commands; 0x69..=0x73 are
/// firmware→host responses. `QueryQueueDepth` is the one host command
/// answered with a payload-carrying response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Enqueue one target: 8-byte payload (`r` absolute, `phi` delta).
    Position = 0x63,
    /// Update max axis speed: 2-byte payload.
    Speed = 0x64,
    /// Resume motion toward the current target.
    Start = 0x65,
    /// Pause motion (controller goes idle).
    Stop = 0x66,
    /// Discard all queued targets and go idle.
    Clear = 0x67,
    /// Re-run the homing procedure.
    Home = 0x68,
    /// Response: command received and applied.
    Ack = 0x69,
    /// Response: unrecognized opcode byte.
    Nack = 0x70,
    /// Request the current queue occupancy.
    QueryQueueDepth = 0x71,
    /// Response to `QueryQueueDepth`: one occupancy payload byte.
    QueueDepthReply = 0x72,
    /// Response: position discarded, queue had no room.
    QueueFull = 0x73,
}

impl Opcode {
    /// Convert from a raw wire byte. Returns `None` for any byte outside
    /// the closed opcode set (including the header sentinels).
    #[inline]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0x63 => Some(Self::Position),
            0x64 => Some(Self::Speed),
            0x65 => Some(Self::Start),
            0x66 => Some(Self::Stop),
            0x67 => Some(Self::Clear),
            0x68 => Some(Self::Home),
            0x69 => Some(Self::Ack),
            0x70 => Some(Self::Nack),
            0x71 => Some(Self::QueryQueueDepth),
            0x72 => Some(Self::QueueDepthReply),
            0x73 => Some(Self::QueueFull),
            _ => None,
        }
    }

    /// The raw byte sent on the wire.
    #[inline]
    pub const fn wire(self) -> u8 {
        self as u8
    }
}

// ─── Position ───────────────────────────────────────────────────────

/// A two-axis target in step counts: radial `r` and angular `phi`.
///
/// On the wire, `r` is an absolute (clamped) coordinate while `phi` is a
/// delta accumulated onto the running angular target. That asymmetry is a
/// protocol contract owned by the motion layer; this type is plain data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Radial step count.
    pub r: i32,
    /// Angular step count.
    pub phi: i32,
}

impl Position {
    #[inline]
    pub const fn new(r: i32, phi: i32) -> Self {
        Self { r, phi }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
