//! Prometheus exposition format support.
//!
//! The publisher holds the current [`ScrapeSnapshot`] and renders it in the
//! Prometheus text-based exposition format. Snapshots are replaced whole, so a
//! reader sees either the previous poll or the new one, never a mix.

use std::sync::Arc;

use parking_lot::RwLock;
use supervisor_types::ScrapeSnapshot;

/// Content type for the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared holder for the most recently published snapshot.
#[derive(Debug, Clone)]
pub struct Publisher {
    latest_snapshot: Arc<RwLock<Arc<ScrapeSnapshot>>>,
    namespace: Option<String>,
}

impl Publisher {
    /// Create a publisher. Until the first poll it reports supervisord as down.
    pub fn new(namespace: Option<String>) -> Self {
        Self {
            latest_snapshot: Arc::new(RwLock::new(Arc::new(ScrapeSnapshot::down()))),
            namespace,
        }
    }

    /// Replace the current snapshot.
    pub fn publish(&self, snapshot: ScrapeSnapshot) -> Arc<ScrapeSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.latest_snapshot.write() = snapshot.clone();
        snapshot
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<ScrapeSnapshot> {
        self.latest_snapshot.read().clone()
    }

    /// Render the current snapshot in exposition format.
    pub fn render(&self) -> String {
        format_prometheus(&self.current(), self.namespace.as_deref())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Format a snapshot as Prometheus exposition format.
///
/// `supervisord_up` is always present. The per-state family always carries its
/// HELP/TYPE header; samples for all six states follow when the poll
/// succeeded, and none when it failed.
pub fn format_prometheus(snapshot: &ScrapeSnapshot, namespace: Option<&str>) -> String {
    let mut output = String::new();
    let prefix = namespace.map(|n| format!("{}_", n)).unwrap_or_default();

    output.push_str(&format!(
        "# HELP {}supervisord_up Supervisord XML-RPC connection status (1 if up, 0 if down)\n",
        prefix
    ));
    output.push_str(&format!("# TYPE {}supervisord_up gauge\n", prefix));
    output.push_str(&format!(
        "{}supervisord_up {}\n",
        prefix,
        snapshot.up_value()
    ));

    output.push_str(&format!(
        "# HELP {}supervisor_processes_per_state Supervisor processes per state\n",
        prefix
    ));
    output.push_str(&format!(
        "# TYPE {}supervisor_processes_per_state gauge\n",
        prefix
    ));

    if let Some(counts) = &snapshot.counts {
        for (state, count) in counts.iter() {
            output.push_str(&format!(
                "{}supervisor_processes_per_state{{state=\"{}\"}} {}\n",
                prefix,
                state.label(),
                count
            ));
        }
    }

    output
}
