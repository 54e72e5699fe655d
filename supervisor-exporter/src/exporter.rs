//! The poll-reconcile-count-publish cycle.

use std::sync::Arc;

use supervisor_rpc::ProcessSource;
use supervisor_types::ScrapeSnapshot;
use tracing::{debug, error};

use crate::publisher::{format_prometheus, Publisher};
use crate::reconcile::{count, reconcile};

/// Poll a source once and build the resulting snapshot.
///
/// Upstream failures never escape: they are logged and turned into a down
/// snapshot with no per-state counts.
pub async fn poll(source: &dyn ProcessSource) -> ScrapeSnapshot {
    match source.fetch().await {
        Ok(records) => {
            let fetched = records.len();
            let resolved = reconcile(records);
            let counts = count(&resolved);
            debug!(
                fetched,
                resolved = resolved.len(),
                counted = counts.total(),
                "refreshed supervisor process states"
            );
            ScrapeSnapshot::up(counts, resolved.len())
        }
        Err(e) => {
            error!(
                source = source.description(),
                error = %e,
                "Error fetching supervisor process info"
            );
            ScrapeSnapshot::down()
        }
    }
}

/// Ties an upstream source to a publisher.
///
/// Every call to [`Exporter::scrape`] performs exactly one upstream fetch;
/// nothing is cached between scrapes.
pub struct Exporter {
    source: Arc<dyn ProcessSource>,
    publisher: Publisher,
}

impl Exporter {
    pub fn new(source: impl ProcessSource + 'static, publisher: Publisher) -> Self {
        Self {
            source: Arc::new(source),
            publisher,
        }
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Poll upstream and publish the result.
    pub async fn refresh(&self) -> Arc<ScrapeSnapshot> {
        let snapshot = poll(self.source.as_ref()).await;
        self.publisher.publish(snapshot)
    }

    /// Refresh, then render the snapshot this refresh produced.
    ///
    /// Concurrent scrapes each answer with their own poll, even if another
    /// scrape publishes in between.
    pub async fn scrape(&self) -> String {
        let snapshot = self.refresh().await;
        format_prometheus(&snapshot, self.publisher.namespace())
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("source", &self.source.description())
            .field("publisher", &self.publisher)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use supervisor_rpc::{ProcessSource, UpstreamError};
    use supervisor_types::RawProcessRecord;

    /// One scripted upstream answer.
    #[derive(Debug, Clone)]
    pub enum Reply {
        Records(Vec<RawProcessRecord>),
        Refused,
    }

    /// A source that plays back scripted replies, repeating the last one.
    #[derive(Debug)]
    pub struct ScriptedSource {
        replies: Mutex<VecDeque<Reply>>,
        calls: Mutex<usize>,
    }

    impl ScriptedSource {
        pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                calls: Mutex::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl ProcessSource for ScriptedSource {
        async fn fetch(&self) -> Result<Vec<RawProcessRecord>, UpstreamError> {
            *self.calls.lock() += 1;

            let reply = {
                let mut replies = self.replies.lock();
                if replies.len() > 1 {
                    replies.pop_front()
                } else {
                    replies.front().cloned()
                }
            };

            match reply {
                Some(Reply::Records(records)) => Ok(records),
                Some(Reply::Refused) | None => {
                    Err(UpstreamError::Connection("connection refused".to_string()))
                }
            }
        }

        fn description(&self) -> &str {
            "scripted"
        }
    }
}
