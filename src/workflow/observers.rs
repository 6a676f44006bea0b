//! Observers notified after a resolution change has been committed.
//!
//! The whole chain runs on a detached task, so the caller never waits for it.
//! Inside the chain observers run in registration order, each on its own task
//! with a time limit, so an error, panic or stall in one is logged and never
//! reaches the others.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::OBSERVER_TIMEOUT_SECS;
use crate::db::Post;

/// A committed resolution change.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionChange {
    /// Actor who made the change.
    pub uid: i64,
    /// New flag.
    pub resolved: bool,
    /// The post as it was before the change.
    pub post: Post,
}

#[async_trait]
pub trait ResolutionObserver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn on_resolution_change(&self, change: &ResolutionChange) -> anyhow::Result<()>;
}

/// Ordered list of observers.
#[derive(Clone)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn ResolutionObserver>>,
    timeout: Duration,
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
            timeout: Duration::from_secs(OBSERVER_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|o| o.name()))
            .finish()
    }
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn ResolutionObserver>) {
        debug!(observer = observer.name(), "Registered resolution observer");
        self.observers.push(observer);
    }

    #[must_use]
    pub fn with(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.register(observer);
        self
    }

    /// Per-observer time limit.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Start notifying every observer in order and return without waiting.
    ///
    /// The handle resolves to the number of observers that failed, panicked
    /// or timed out. Dropping it detaches the chain.
    pub fn notify(&self, change: ResolutionChange) -> JoinHandle<usize> {
        let registry = self.clone();
        tokio::spawn(async move { registry.run_chain(&change).await })
    }

    async fn run_chain(&self, change: &ResolutionChange) -> usize {
        let mut failures = 0;

        for observer in &self.observers {
            let name = observer.name().to_string();
            let observer = Arc::clone(observer);
            let owned = change.clone();
            let mut handle =
                tokio::spawn(async move { observer.on_resolution_change(&owned).await });

            match tokio::time::timeout(self.timeout, &mut handle).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    failures += 1;
                    warn!(observer = %name, pid = change.post.id, "Resolution observer failed: {e:#}");
                }
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(observer = %name, pid = change.post.id, "Resolution observer panicked: {e}");
                }
                Err(_) => {
                    failures += 1;
                    handle.abort();
                    warn!(
                        observer = %name,
                        pid = change.post.id,
                        timeout = ?self.timeout,
                        "Resolution observer timed out"
                    );
                }
            }
        }

        failures
    }
}

/// Writes every change to the log.
#[derive(Debug, Default)]
pub struct LoggingObserver;

#[async_trait]
impl ResolutionObserver for LoggingObserver {
    fn name(&self) -> &str {
        "logging"
    }

    async fn on_resolution_change(&self, change: &ResolutionChange) -> anyhow::Result<()> {
        info!(
            uid = change.uid,
            pid = change.post.id,
            tid = change.post.topic_id,
            resolved = change.resolved,
            previous = ?change.post.resolved_state(),
            "Post resolution changed"
        );
        Ok(())
    }
}
