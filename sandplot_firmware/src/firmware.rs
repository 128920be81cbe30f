//! Cooperative tick runner joining the parser and the motion controller.
//!
//! One `tick()` is one pass of the firmware main loop: let the parser
//! consume whatever bytes arrived, hand its accumulated requests to the
//! motion side, drain at most one queued target when the previous move has
//! finished, then advance motion by one cycle.
//!
//! The runner is the single owner of the queue and both machines; write
//! rights are lent to the parser during `feed()` and read rights exercised
//! here afterwards, which is what makes the shared state lock-free.

use sandplot_common::config::FirmwareConfig;
use sandplot_common::hal::{ByteTransport, Endstop, StepperBank};
use tracing::debug;

use crate::motion::{MotionController, MotionState};
use crate::protocol::{ControlRequests, ProtocolParser};
use crate::queue::RingQueue;

/// O(1) per-tick counters for the simulator log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickStats {
    /// Total ticks executed.
    pub ticks: u64,
    /// Targets handed from the queue to the motion controller.
    pub targets_drained: u64,
}

/// The firmware main-loop state: transport, queue, and both state machines.
pub struct Firmware<T: ByteTransport, S: StepperBank, E: Endstop> {
    transport: T,
    queue: RingQueue,
    parser: ProtocolParser,
    motion: MotionController<S, E>,
    stats: TickStats,
}

impl<T: ByteTransport, S: StepperBank, E: Endstop> Firmware<T, S, E> {
    pub fn new(config: &FirmwareConfig, transport: T, steppers: S, endstop: E) -> Self {
        Self {
            transport,
            queue: RingQueue::new(),
            parser: ProtocolParser::new(),
            motion: MotionController::new(steppers, endstop, config),
            stats: TickStats::default(),
        }
    }

    /// One pass of the cooperative loop.
    pub fn tick(&mut self) {
        // ═══ PARSE PHASE ═══
        self.parser.feed(&mut self.transport, &mut self.queue);

        // ═══ HANDOFF PHASE ═══
        if let Some(speed) = self.parser.take_speed_update() {
            self.motion.set_speed(speed);
        }

        // Fixed application order: clear implies stop, start last so a
        // clear+start batch leaves the machine running.
        let requests = self.parser.take_control_requests();
        if requests.contains(ControlRequests::STOP) {
            self.motion.request_stop();
        }
        if requests.contains(ControlRequests::CLEAR) {
            // Safe here: feed() finished above, no partial frame in flight.
            self.queue.clear();
            self.motion.request_clear();
        }
        if requests.contains(ControlRequests::HOME) {
            self.motion.request_home();
        }
        if requests.contains(ControlRequests::START) {
            self.motion.request_start();
        }
        if !requests.is_empty() {
            debug!(?requests, "control requests applied");
        }

        // At most one target per tick, only once the previous move is done
        // and the origin is established. A clear during boot homing marks
        // the move finished while still unhomed; targets must wait.
        if self.motion.move_finished() && self.motion.is_homed() {
            if let Some(pos) = self.queue.dequeue() {
                self.motion.set_target_delta(pos.r, pos.phi);
                self.stats.targets_drained += 1;
            }
        }

        // ═══ MOTION PHASE ═══
        self.motion.tick();
        self.stats.ticks += 1;
    }

    /// Nothing left to do: no inbound bytes, no queued targets, and the
    /// controller is neither homing nor mid-move. Used by the simulator to
    /// decide when a script has fully played out.
    pub fn is_settled(&self) -> bool {
        self.transport.bytes_available() == 0
            && self.queue.is_empty()
            && matches!(
                self.motion.state(),
                MotionState::Idle | MotionState::Finished
            )
    }

    #[inline]
    pub const fn stats(&self) -> TickStats {
        self.stats
    }

    #[inline]
    pub const fn parser(&self) -> &ProtocolParser {
        &self.parser
    }

    #[inline]
    pub const fn motion(&self) -> &MotionController<S, E> {
        &self.motion
    }

    #[inline]
    pub const fn queue(&self) -> &RingQueue {
        &self.queue
    }

    #[inline]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
