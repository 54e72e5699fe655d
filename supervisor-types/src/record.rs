//! Process records as reported by supervisord.

use std::fmt;

/// One process entry from `supervisor.getAllProcessInfo`.
///
/// supervisord may report several entries for the same group/name slot in a
/// single response (restarts, historical generations). Use
/// [`RawProcessRecord::identity`] to collapse them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawProcessRecord {
    /// Program name within its group.
    pub name: String,

    /// Process group name.
    pub group: String,

    /// Raw supervisord state code (e.g. 20 = RUNNING).
    pub state: i64,

    /// Start time, seconds since the epoch. Zero if the process never started.
    pub start: i64,

    /// Human-readable state name as reported by supervisord.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub statename: Option<String>,

    /// OS process id, zero when not running.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub pid: Option<i64>,

    /// Free-form description (e.g. "pid 123, uptime 0:01:02").
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
}

impl RawProcessRecord {
    /// Create a record from the four fields reconciliation depends on.
    pub fn new(name: impl Into<String>, group: impl Into<String>, state: i64, start: i64) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            state,
            start,
            statename: None,
            pid: None,
            description: None,
        }
    }

    /// The deduplication key for this record.
    pub fn identity(&self) -> ProcessIdentity {
        ProcessIdentity::new(self.group.clone(), self.name.clone())
    }
}

/// Identifies one logical managed process slot: `(group, name)`.
///
/// Kept as a tuple rather than a concatenated string so that
/// `("ab", "c")` and `("a", "bc")` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessIdentity {
    pub group: String,
    pub name: String,
}

impl ProcessIdentity {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ProcessIdentity {
    /// Formats as `group:name`, matching supervisorctl's naming.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_uses_group_and_name() {
        let record = RawProcessRecord::new("worker_00", "workers", 20, 10);
        let identity = record.identity();
        assert_eq!(identity.group, "workers");
        assert_eq!(identity.name, "worker_00");
        assert_eq!(identity.to_string(), "workers:worker_00");
    }

    #[test]
    fn identity_does_not_collide_on_concatenation() {
        let a = RawProcessRecord::new("c", "ab", 20, 1).identity();
        let b = RawProcessRecord::new("bc", "a", 20, 1).identity();
        assert_ne!(a, b);
    }

    #[test]
    fn new_leaves_descriptive_fields_empty() {
        let record = RawProcessRecord::new("a", "g", 0, 0);
        assert!(record.statename.is_none());
        assert!(record.pid.is_none());
        assert!(record.description.is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_without_optional_fields() {
        let json = r#"{"name":"a","group":"g","state":20,"start":5}"#;
        let record: RawProcessRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record, RawProcessRecord::new("a", "g", 20, 5));
    }
}
