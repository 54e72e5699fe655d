//! ScrapeSnapshot - the outcome of one poll of supervisord.

use crate::StateCounts;

/// Everything the publisher exposes after one poll.
///
/// A snapshot is built whole and then swapped in, so readers never observe a
/// half-updated mix of liveness and counts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScrapeSnapshot {
    /// Whether the poll reached supervisord and got a usable response.
    pub up: bool,

    /// Per-state counts. `None` when the poll failed.
    pub counts: Option<StateCounts>,

    /// Number of distinct process slots after reconciliation.
    pub process_count: usize,
}

impl ScrapeSnapshot {
    /// A successful poll.
    pub fn up(counts: StateCounts, process_count: usize) -> Self {
        Self {
            up: true,
            counts: Some(counts),
            process_count,
        }
    }

    /// A failed poll: liveness 0 and no per-state counts.
    pub fn down() -> Self {
        Self {
            up: false,
            counts: None,
            process_count: 0,
        }
    }

    /// Value of the liveness gauge.
    pub fn up_value(&self) -> u8 {
        u8::from(self.up)
    }
}

impl Default for ScrapeSnapshot {
    /// Before the first poll the exporter reports itself down.
    fn default() -> Self {
        Self::down()
    }
}
