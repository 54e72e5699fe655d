//! Semantic process states and per-state counts.

use std::fmt;

/// The closed set of states exported to the collector.
///
/// Each state covers a fixed set of raw supervisord codes. Codes outside every
/// set (e.g. STARTING = 10 is included in RUNNING, but an unknown 999 is not)
/// are simply not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum SemanticState {
    Running,
    Stopped,
    Backoff,
    Exited,
    Fatal,
    Unknown,
}

impl SemanticState {
    /// All states, in exposition order.
    pub const ALL: [SemanticState; 6] = [
        SemanticState::Running,
        SemanticState::Stopped,
        SemanticState::Backoff,
        SemanticState::Exited,
        SemanticState::Fatal,
        SemanticState::Unknown,
    ];

    /// Raw supervisord codes mapped to this state.
    pub const fn codes(self) -> &'static [i64] {
        match self {
            // STARTING, RUNNING, STOPPING
            SemanticState::Running => &[10, 20, 40],
            SemanticState::Stopped => &[0],
            SemanticState::Backoff => &[30],
            SemanticState::Exited => &[100],
            SemanticState::Fatal => &[200],
            SemanticState::Unknown => &[1000],
        }
    }

    /// Classify a raw code. Returns `None` for codes outside every set.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.codes().contains(&code))
    }

    /// The `state` label value used in the exposition format.
    pub const fn label(self) -> &'static str {
        match self {
            SemanticState::Running => "RUNNING",
            SemanticState::Stopped => "STOPPED",
            SemanticState::Backoff => "BACKOFF",
            SemanticState::Exited => "EXITED",
            SemanticState::Fatal => "FATAL",
            SemanticState::Unknown => "UNKNOWN",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SemanticState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Number of resolved processes in each [`SemanticState`].
///
/// Always holds all six states; a state with no processes reads as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateCounts {
    counts: [u64; 6],
}

impl StateCounts {
    /// All six states at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for a single state.
    pub fn get(&self, state: SemanticState) -> u64 {
        self.counts[state.index()]
    }

    /// Add one process to a state.
    pub fn increment(&mut self, state: SemanticState) {
        self.counts[state.index()] += 1;
    }

    /// Iterate over every state and its count, in exposition order.
    pub fn iter(&self) -> impl Iterator<Item = (SemanticState, u64)> + '_ {
        SemanticState::ALL
            .into_iter()
            .map(move |state| (state, self.get(state)))
    }

    /// Sum of all six counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

impl FromIterator<SemanticState> for StateCounts {
    fn from_iter<I: IntoIterator<Item = SemanticState>>(iter: I) -> Self {
        let mut counts = StateCounts::new();
        for state in iter {
            counts.increment(state);
        }
        counts
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for StateCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(SemanticState::ALL.len()))?;
        for (state, count) in self.iter() {
            map.serialize_entry(state.label(), &count)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_sets_match_supervisord() {
        assert_eq!(SemanticState::from_code(10), Some(SemanticState::Running));
        assert_eq!(SemanticState::from_code(20), Some(SemanticState::Running));
        assert_eq!(SemanticState::from_code(40), Some(SemanticState::Running));
        assert_eq!(SemanticState::from_code(0), Some(SemanticState::Stopped));
        assert_eq!(SemanticState::from_code(30), Some(SemanticState::Backoff));
        assert_eq!(SemanticState::from_code(100), Some(SemanticState::Exited));
        assert_eq!(SemanticState::from_code(200), Some(SemanticState::Fatal));
        assert_eq!(SemanticState::from_code(1000), Some(SemanticState::Unknown));
    }

    #[test]
    fn unmapped_codes_have_no_state() {
        assert_eq!(SemanticState::from_code(999), None);
        assert_eq!(SemanticState::from_code(-1), None);
        assert_eq!(SemanticState::from_code(50), None);
    }

    #[test]
    fn code_sets_are_disjoint() {
        for (i, a) in SemanticState::ALL.iter().enumerate() {
            for b in &SemanticState::ALL[i + 1..] {
                assert!(a.codes().iter().all(|code| !b.codes().contains(code)));
            }
        }
    }

    #[test]
    fn labels_are_distinct_and_uppercase() {
        for (i, a) in SemanticState::ALL.iter().enumerate() {
            assert_eq!(a.label(), a.label().to_ascii_uppercase());
            assert_eq!(a.to_string(), a.label());
            for b in &SemanticState::ALL[i + 1..] {
                assert_ne!(a.label(), b.label());
            }
        }
    }

    #[test]
    fn empty_counts_report_all_states_as_zero() {
        let counts = StateCounts::new();
        let all: Vec<_> = counts.iter().collect();
        assert_eq!(all.len(), 6);
        assert!(all.iter().all(|(_, n)| *n == 0));
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn counts_collect_from_states() {
        let counts: StateCounts = [
            SemanticState::Running,
            SemanticState::Running,
            SemanticState::Fatal,
        ]
        .into_iter()
        .collect();

        assert_eq!(counts.get(SemanticState::Running), 2);
        assert_eq!(counts.get(SemanticState::Fatal), 1);
        assert_eq!(counts.get(SemanticState::Stopped), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn iter_follows_exposition_order() {
        let labels: Vec<_> = StateCounts::new().iter().map(|(s, _)| s.label()).collect();
        assert_eq!(
            labels,
            ["RUNNING", "STOPPED", "BACKOFF", "EXITED", "FATAL", "UNKNOWN"]
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn counts_serialize_as_label_map() {
        let mut counts = StateCounts::new();
        counts.increment(SemanticState::Exited);
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["EXITED"], 1);
        assert_eq!(json["RUNNING"], 0);
    }
}
