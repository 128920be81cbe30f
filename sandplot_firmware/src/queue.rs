//! Fixed-capacity circular queue of position targets.
//!
//! Array of `QUEUE_CAPACITY` slots with two modulo cursors. One slot is
//! always kept empty so the two cursors alone distinguish empty from full:
//! usable depth is `QUEUE_CAPACITY - 1`.
//!
//! Single-producer / single-consumer by ownership discipline: the protocol
//! parser holds write rights during `feed()`, the tick glue holds read
//! rights afterwards. Both run from the same cooperative loop, never
//! concurrently.

use sandplot_common::wire::Position;
use static_assertions::const_assert;

/// Number of slots in the ring. Usable depth is one less.
pub const QUEUE_CAPACITY: usize = 10;

// Two cursors need a spare slot to tell empty from full.
const_assert!(QUEUE_CAPACITY >= 2);

/// Fixed-capacity circular buffer of two-axis targets.
#[derive(Debug, Clone)]
pub struct RingQueue {
    slots: [Position; QUEUE_CAPACITY],
    read_idx: usize,
    write_idx: usize,
}

impl RingQueue {
    pub const fn new() -> Self {
        Self {
            slots: [Position::new(0, 0); QUEUE_CAPACITY],
            read_idx: 0,
            write_idx: 0,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.read_idx == self.write_idx
    }

    #[inline]
    pub const fn is_full(&self) -> bool {
        (self.write_idx + 1) % QUEUE_CAPACITY == self.read_idx
    }

    /// Number of queued targets: `(w - r + N) mod N`.
    #[inline]
    pub const fn occupancy(&self) -> u8 {
        ((self.write_idx + QUEUE_CAPACITY - self.read_idx) % QUEUE_CAPACITY) as u8
    }

    /// Append a target. Returns `false` (target dropped) when full; the
    /// overflow-response path checks `is_full()` before decoding instead.
    pub fn enqueue(&mut self, pos: Position) -> bool {
        if self.is_full() {
            return false;
        }
        self.slots[self.write_idx] = pos;
        self.write_idx = (self.write_idx + 1) % QUEUE_CAPACITY;
        true
    }

    /// Remove the oldest target, or `None` when empty.
    pub fn dequeue(&mut self) -> Option<Position> {
        if self.is_empty() {
            return None;
        }
        let pos = self.slots[self.read_idx];
        self.read_idx = (self.read_idx + 1) % QUEUE_CAPACITY;
        Some(pos)
    }

    /// Discard all queued targets. Must only be called between ticks,
    /// never from inside `feed()` while a frame is being written.
    pub fn clear(&mut self) {
        self.read_idx = 0;
        self.write_idx = 0;
    }
}

impl Default for RingQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
