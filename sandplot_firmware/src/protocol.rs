//! Byte-driven protocol parser and response encoder.
//!
//! The parser is a cyclic state machine fed from the transport once per
//! tick. It frames incoming bytes into commands, enqueues position targets,
//! records speed/control requests for the motion side, and answers every
//! completed command synchronously through the [`ResponseEncoder`].
//!
//! ## Resynchronization
//!
//! `SeekHeader` keeps a two-byte sliding window over every incoming byte and
//! only leaves when the window equals the header sentinel in order. Nothing
//! is skipped by frame length, so the parser recovers from arbitrary stream
//! corruption as soon as the next valid header arrives.
//!
//! ## Backpressure
//!
//! A full queue is reported with `QueueFull`, but the 8 payload bytes of the
//! rejected position are still drained from the stream — framing is never
//! broken by backpressure.

use bitflags::bitflags;
use sandplot_common::hal::ByteTransport;
use sandplot_common::wire::{
    HEADER, Opcode, POSITION_PAYLOAD_LEN, Position, RESPONSE_LEN, RESPONSE_WITH_PAYLOAD_LEN,
    SPEED_PAYLOAD_LEN,
};
use tracing::{debug, warn};

use crate::queue::RingQueue;

// ─── Control Requests ───────────────────────────────────────────────

bitflags! {
    /// Motion control requests accumulated by the parser, consumed by the
    /// tick glue. Several may accumulate within one `feed()` call when the
    /// host batches commands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ControlRequests: u8 {
        const START = 1 << 0;
        const STOP  = 1 << 1;
        const CLEAR = 1 << 2;
        const HOME  = 1 << 3;
    }
}

// ─── Parser State ───────────────────────────────────────────────────

/// Framing state, preserved across ticks for partial frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Scanning the sliding window for the header sentinel.
    SeekHeader,
    /// Header found; next byte is the opcode.
    SeekOpcode,
    /// Waiting for the 8-byte position payload.
    ReadPosition,
    /// Waiting for the 2-byte speed payload.
    ReadSpeed,
}

// ─── Response Encoder ───────────────────────────────────────────────

/// Builds and emits fixed-layout response frames.
///
/// The only sender of host-bound bytes in the system; every completed
/// command triggers exactly one response.
#[derive(Debug)]
pub struct ResponseEncoder {
    frame: [u8; RESPONSE_WITH_PAYLOAD_LEN],
}

impl ResponseEncoder {
    pub const fn new() -> Self {
        Self {
            frame: [HEADER[0], HEADER[1], 0, 0],
        }
    }

    /// Emit `[header0, header1, opcode]`.
    pub fn respond<T: ByteTransport>(&mut self, transport: &mut T, opcode: Opcode) {
        self.frame[2] = opcode.wire();
        transport.write(&self.frame[..RESPONSE_LEN]);
    }

    /// Emit `[header0, header1, opcode, payload]` (queue-depth reply).
    pub fn respond_with<T: ByteTransport>(&mut self, transport: &mut T, opcode: Opcode, payload: u8) {
        self.frame[2] = opcode.wire();
        self.frame[3] = payload;
        transport.write(&self.frame[..RESPONSE_WITH_PAYLOAD_LEN]);
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Protocol Parser ────────────────────────────────────────────────

/// Byte-driven command framing and dispatch state machine.
#[derive(Debug)]
pub struct ProtocolParser {
    state: ParserState,
    /// Sliding window of the two most recent bytes seen in `SeekHeader`.
    window: [u8; 2],
    requests: ControlRequests,
    pending_speed: Option<f32>,
    encoder: ResponseEncoder,
    commands_completed: u64,
}

impl ProtocolParser {
    pub const fn new() -> Self {
        Self {
            state: ParserState::SeekHeader,
            window: [0, 0],
            requests: ControlRequests::empty(),
            pending_speed: None,
            encoder: ResponseEncoder::new(),
            commands_completed: 0,
        }
    }

    /// Current framing state.
    #[inline]
    pub const fn state(&self) -> ParserState {
        self.state
    }

    /// Total commands completed (responses emitted) since startup.
    #[inline]
    pub const fn commands_completed(&self) -> u64 {
        self.commands_completed
    }

    /// Return and clear the accumulated control requests.
    pub fn take_control_requests(&mut self) -> ControlRequests {
        core::mem::take(&mut self.requests)
    }

    /// Consume the pending speed update, if any arrived since the last call.
    pub fn take_speed_update(&mut self) -> Option<f32> {
        self.pending_speed.take()
    }

    /// Consume every byte currently available from `transport`, advancing
    /// the state machine and emitting responses for each completed command.
    /// Returns immediately once no further progress is possible; partial
    /// frames park the state until the next tick.
    pub fn feed<T: ByteTransport>(&mut self, transport: &mut T, queue: &mut RingQueue) {
        loop {
            let progressed = match self.state {
                ParserState::SeekHeader => self.seek_header(transport),
                ParserState::SeekOpcode => self.seek_opcode(transport, queue),
                ParserState::ReadPosition => self.read_position(transport, queue),
                ParserState::ReadSpeed => self.read_speed(transport),
            };
            if !progressed {
                break;
            }
        }
    }

    /// Slide the window over incoming bytes until it matches the header.
    /// Returns `true` when the header was found (state advanced).
    fn seek_header<T: ByteTransport>(&mut self, transport: &mut T) -> bool {
        while let Some(byte) = transport.read_byte() {
            self.window[0] = self.window[1];
            self.window[1] = byte;
            if self.window == HEADER {
                self.state = ParserState::SeekOpcode;
                return true;
            }
        }
        false
    }

    /// Dispatch on the opcode byte following a header.
    fn seek_opcode<T: ByteTransport>(&mut self, transport: &mut T, queue: &mut RingQueue) -> bool {
        let Some(byte) = transport.read_byte() else {
            return false;
        };

        match Opcode::from_wire(byte) {
            Some(Opcode::Position) => {
                self.state = ParserState::ReadPosition;
            }
            Some(Opcode::Speed) => {
                self.state = ParserState::ReadSpeed;
            }
            Some(Opcode::QueryQueueDepth) => {
                let depth = queue.occupancy();
                debug!(depth, "queue depth query");
                self.complete_with_payload(transport, Opcode::QueueDepthReply, depth);
            }
            Some(Opcode::Start) => {
                self.requests |= ControlRequests::START;
                self.complete(transport, Opcode::Ack);
            }
            Some(Opcode::Stop) => {
                self.requests |= ControlRequests::STOP;
                self.complete(transport, Opcode::Ack);
            }
            Some(Opcode::Clear) => {
                self.requests |= ControlRequests::CLEAR;
                self.complete(transport, Opcode::Ack);
            }
            Some(Opcode::Home) => {
                self.requests |= ControlRequests::HOME;
                self.complete(transport, Opcode::Ack);
            }
            // Response opcodes arriving inbound, or bytes outside the set:
            // reject and wait for the next valid header.
            _ => {
                warn!(byte, "unrecognized opcode");
                self.complete(transport, Opcode::Nack);
            }
        }
        true
    }

    /// Decode the 8-byte position payload once fully available.
    fn read_position<T: ByteTransport>(&mut self, transport: &mut T, queue: &mut RingQueue) -> bool {
        if transport.bytes_available() < POSITION_PAYLOAD_LEN {
            return false;
        }

        // Drain the payload regardless of queue state so framing survives
        // backpressure.
        let mut payload = [0u8; POSITION_PAYLOAD_LEN];
        if !transport.read_exact(&mut payload) {
            return false;
        }

        if queue.is_full() {
            warn!("position dropped, queue full");
            self.complete(transport, Opcode::QueueFull);
            return true;
        }

        let r = i32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let phi = i32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
        queue.enqueue(Position::new(r, phi));
        debug!(r, phi, occupancy = queue.occupancy(), "position queued");
        self.complete(transport, Opcode::Ack);
        true
    }

    /// Decode the 2-byte speed payload once fully available.
    fn read_speed<T: ByteTransport>(&mut self, transport: &mut T) -> bool {
        if transport.bytes_available() < SPEED_PAYLOAD_LEN {
            return false;
        }

        let mut payload = [0u8; SPEED_PAYLOAD_LEN];
        if !transport.read_exact(&mut payload) {
            return false;
        }

        let speed = f32::from(u16::from_be_bytes(payload));
        debug!(speed, "speed update");
        self.pending_speed = Some(speed);
        self.complete(transport, Opcode::Ack);
        true
    }

    fn complete<T: ByteTransport>(&mut self, transport: &mut T, opcode: Opcode) {
        self.encoder.respond(transport, opcode);
        self.commands_completed += 1;
        self.state = ParserState::SeekHeader;
    }

    fn complete_with_payload<T: ByteTransport>(
        &mut self,
        transport: &mut T,
        opcode: Opcode,
        payload: u8,
    ) {
        self.encoder.respond_with(transport, opcode, payload);
        self.commands_completed += 1;
        self.state = ParserState::SeekHeader;
    }
}

impl Default for ProtocolParser {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
