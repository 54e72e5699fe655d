//! Collapse raw process records into one authoritative record per slot, and
//! count the result per semantic state.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use supervisor_types::{ProcessIdentity, RawProcessRecord, SemanticState, StateCounts};
use tracing::{debug, trace};

/// One resolved record per process identity.
pub type ResolvedRecords = BTreeMap<ProcessIdentity, RawProcessRecord>;

/// Deduplicate records by `(group, name)`, keeping the most recent start.
///
/// A later record replaces an earlier one only when its `start` is strictly
/// greater, so on ties the first record encountered wins.
pub fn reconcile<I>(records: I) -> ResolvedRecords
where
    I: IntoIterator<Item = RawProcessRecord>,
{
    let mut latest = ResolvedRecords::new();

    for record in records {
        match latest.entry(record.identity()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if record.start > slot.get().start {
                    trace!(
                        process = %slot.key(),
                        previous_start = slot.get().start,
                        start = record.start,
                        "replacing stale process record"
                    );
                    slot.insert(record);
                }
            }
        }
    }

    latest
}

/// Count resolved records per semantic state.
///
/// All six states are present in the result. Records whose raw code maps to
/// no state are left out of every count.
pub fn count(resolved: &ResolvedRecords) -> StateCounts {
    let mut counts = StateCounts::new();

    for (identity, record) in resolved {
        match SemanticState::from_code(record.state) {
            Some(state) => counts.increment(state),
            None => debug!(
                process = %identity,
                code = record.state,
                "process state code maps to no exported state"
            ),
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(group: &str, name: &str, state: i64, start: i64) -> RawProcessRecord {
        RawProcessRecord::new(name, group, state, start)
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(reconcile(Vec::new()).is_empty());
        assert_eq!(count(&ResolvedRecords::new()), StateCounts::new());
    }

    #[test]
    fn later_start_wins() {
        let resolved = reconcile(vec![record("g", "n", 20, 100), record("g", "n", 100, 200)]);

        assert_eq!(resolved.len(), 1);
        let chosen = &resolved[&ProcessIdentity::new("g", "n")];
        assert_eq!(chosen.start, 200);
        assert_eq!(chosen.state, 100);
    }

    #[test]
    fn later_start_wins_regardless_of_order() {
        let resolved = reconcile(vec![record("g", "n", 100, 200), record("g", "n", 20, 100)]);

        assert_eq!(resolved[&ProcessIdentity::new("g", "n")].start, 200);
    }

    #[test]
    fn tie_keeps_first_seen() {
        let resolved = reconcile(vec![record("g", "n", 20, 100), record("g", "n", 200, 100)]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[&ProcessIdentity::new("g", "n")].state, 20);
    }

    #[test]
    fn distinct_identities_are_kept_apart() {
        let resolved = reconcile(vec![
            record("web", "app", 20, 1),
            record("worker", "app", 0, 1),
            record("web", "cron", 20, 1),
            // "ab" + "c" vs "a" + "bc" must not merge
            record("ab", "c", 20, 1),
            record("a", "bc", 200, 1),
        ]);

        assert_eq!(resolved.len(), 5);
    }

    #[test]
    fn count_reports_all_states() {
        let resolved = reconcile(vec![record("g", "a", 20, 1), record("g", "b", 0, 1)]);
        let counts = count(&resolved);

        assert_eq!(counts.get(SemanticState::Running), 1);
        assert_eq!(counts.get(SemanticState::Stopped), 1);
        assert_eq!(counts.get(SemanticState::Backoff), 0);
        assert_eq!(counts.get(SemanticState::Exited), 0);
        assert_eq!(counts.get(SemanticState::Fatal), 0);
        assert_eq!(counts.get(SemanticState::Unknown), 0);
        assert_eq!(counts.iter().count(), 6);
    }

    #[test]
    fn count_groups_running_codes() {
        let resolved = reconcile(vec![
            record("g", "starting", 10, 1),
            record("g", "running", 20, 1),
            record("g", "stopping", 40, 1),
        ]);

        assert_eq!(count(&resolved).get(SemanticState::Running), 3);
    }

    #[test]
    fn unmapped_code_is_not_counted() {
        let resolved = reconcile(vec![
            record("g", "a", 999, 1),
            record("g", "b", 30, 1),
            record("g", "c", 1000, 1),
        ]);
        let counts = count(&resolved);

        assert_eq!(counts.total(), 2);
        assert_eq!(counts.get(SemanticState::Backoff), 1);
        assert_eq!(counts.get(SemanticState::Unknown), 1);
    }

    #[test]
    fn only_the_resolved_record_is_counted() {
        let resolved = reconcile(vec![record("g", "a", 20, 1), record("g", "a", 100, 5)]);
        let counts = count(&resolved);

        assert_eq!(counts.get(SemanticState::Running), 0);
        assert_eq!(counts.get(SemanticState::Exited), 1);
        assert_eq!(counts.total(), 1);
    }
}
