//! Occupancy snapshot for a resource list

use serde::{Deserialize, Serialize};

/// A point-in-time view of a resource list's occupancy.
///
/// Instantaneous and racy: by the time a caller inspects it, the counts
/// may have moved on. Advisory only, never a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolGauge {
    /// Idle connections available for reuse
    idle: usize,
    /// Connections currently held by callers
    acquired: usize,
    /// Hard cap on concurrently acquired connections
    max_hard: usize,
}

impl PoolGauge {
    /// Create a new gauge snapshot
    pub fn new(idle: usize, acquired: usize, max_hard: usize) -> Self {
        Self {
            idle,
            acquired,
            max_hard,
        }
    }

    /// Get the number of idle connections
    pub fn idle(&self) -> usize {
        self.idle
    }

    /// Get the number of acquired connections
    pub fn acquired(&self) -> usize {
        self.acquired
    }

    /// Get the hard maximum
    pub fn max_hard(&self) -> usize {
        self.max_hard
    }

    /// Remaining acquisition capacity as an integer percentage (0..=100).
    ///
    /// Returns 0 for a gauge with no capacity at all.
    pub fn availability_percent(&self) -> u8 {
        if self.max_hard == 0 {
            return 0;
        }
        let free = self.max_hard.saturating_sub(self.acquired);
        ((free * 100) / self.max_hard) as u8
    }

    /// Check if every slot is taken (the next acquire would suspend)
    pub fn is_saturated(&self) -> bool {
        self.acquired >= self.max_hard
    }
}
