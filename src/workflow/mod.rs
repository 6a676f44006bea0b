//! Resolution and needs-attention workflow.
//!
//! The [`ResolutionGate`] writes the resolved flag on main posts, the
//! [`AttentionDetector`] reads it back together with topic age and reply
//! recency, and [`CategoryListing`] uses the detector to annotate and reorder
//! category pages.

pub mod attention;
pub mod listing;
pub mod observers;
pub mod resolution;

pub use attention::{is_stale, AttentionDetector};
pub use listing::{pin_attention_topics, CategoryListing, CategoryTopics, TopicListItem};
pub use observers::{LoggingObserver, ObserverRegistry, ResolutionChange, ResolutionObserver};
pub use resolution::{ResolutionGate, ResolvedResponse};

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::clock::Clock;
use crate::config::Config;
use crate::db::{self, Database};

/// All workflow components wired to one database and clock.
#[derive(Clone)]
pub struct Workflow {
    pub db: Database,
    pub resolution: ResolutionGate,
    pub attention: AttentionDetector,
    pub listing: CategoryListing,
    attention_category: Arc<str>,
}

impl Workflow {
    /// Wire the components and bring every category's attention eligibility
    /// in line with the configured category name.
    pub async fn new(
        db: &Database,
        config: &Config,
        clock: Arc<dyn Clock>,
        observers: ObserverRegistry,
    ) -> Result<Self> {
        let pool = db.pool().clone();

        let changed = db::sync_attention_eligibility(&pool, &config.attention_category).await?;
        if changed > 0 {
            info!(
                changed,
                attention_category = %config.attention_category,
                "Updated category attention eligibility"
            );
        }

        let attention = AttentionDetector::new(pool.clone(), clock);
        Ok(Self {
            db: db.clone(),
            resolution: ResolutionGate::new(pool.clone(), config.resolve_scope, observers),
            listing: CategoryListing::new(pool, attention.clone(), config.pin_policy),
            attention,
            attention_category: Arc::from(config.attention_category.as_str()),
        })
    }

    /// Category name that receives attention tracking.
    #[must_use]
    pub fn attention_category(&self) -> &str {
        &self.attention_category
    }

    /// Create a category, deciding eligibility from the configured name.
    pub async fn create_category(&self, name: &str, description: Option<&str>) -> Result<i64> {
        db::create_category(self.db.pool(), name, description, &self.attention_category).await
    }

    /// Rename a category, re-deciding eligibility from the configured name.
    pub async fn rename_category(&self, cid: i64, name: &str) -> Result<()> {
        db::rename_category(self.db.pool(), cid, name, &self.attention_category).await
    }
}
