#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timing information handed to every per-tick system.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
}

impl TickContext {
    pub fn new(tick: u64, dt_seconds: f32) -> Self {
        Self { tick, dt_seconds }
    }

    /// The context for the following tick with the same frame time.
    pub fn next(self) -> Self {
        Self {
            tick: self.tick.saturating_add(1),
            dt_seconds: self.dt_seconds,
        }
    }
}
