//! Fixed-period tick pacing.
//!
//! The clock keeps an *anchor*: the instant the previous tick's publish
//! was issued (or the tick started, when nothing was published).  The
//! next tick is due one period after the anchor.  An overrun simply makes
//! the next tick due immediately; missed ticks are never replayed, so
//! two anchors are always at least one period apart.
//!
//! ```text
//!   anchor        anchor + P              anchor' (≥ anchor + P)
//!     │──── wait ────│── sample ── publish ──│
//! ```

#[derive(Debug, Clone)]
pub struct TickClock {
    period_ms: u64,
    anchor_ms: Option<u64>,
}

impl TickClock {
    pub fn new(period_ms: u32) -> Self {
        Self {
            period_ms: u64::from(period_ms),
            anchor_ms: None,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Milliseconds until the next tick is due (0 = due now).
    /// The very first tick is always due.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        match self.anchor_ms {
            None => 0,
            Some(anchor) => (anchor + self.period_ms).saturating_sub(now_ms),
        }
    }

    /// Record the anchor for the tick in progress.
    pub fn mark(&mut self, now_ms: u64) {
        self.anchor_ms = Some(now_ms);
    }
}
