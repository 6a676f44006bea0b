use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::warn;

use crate::clock::Clock;
use crate::constants::{ATTENTION_MIN_AGE_MS, RECENT_ACTIVITY_MS};
use crate::db::{self, Category, ResolvedState, Topic};

/// Staleness rule, independent of storage.
///
/// True when the topic is at least 7 days old (inclusive), unresolved, and
/// its latest reply (if any) is not younger than 3 days. Category
/// eligibility is checked by the caller.
#[must_use]
pub fn is_stale(
    now_ms: i64,
    topic_timestamp: i64,
    resolved: ResolvedState,
    latest_reply: Option<i64>,
) -> bool {
    if now_ms - topic_timestamp < ATTENTION_MIN_AGE_MS {
        return false;
    }
    if resolved.is_resolved() {
        return false;
    }
    match latest_reply {
        Some(reply_ts) => now_ms - reply_ts >= RECENT_ACTIVITY_MS,
        None => true,
    }
}

/// Derives the needs-attention signal for topics.
#[derive(Clone)]
pub struct AttentionDetector {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl AttentionDetector {
    #[must_use]
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Whether a topic needs attention. Missing data and store errors yield false.
    pub async fn needs_attention(&self, tid: i64) -> bool {
        match self.try_needs_attention(tid).await {
            Ok(flag) => flag,
            Err(e) => {
                warn!(tid, "Needs-attention check failed: {e:#}");
                false
            }
        }
    }

    /// Like [`Self::needs_attention`] but surfaces store errors.
    pub async fn try_needs_attention(&self, tid: i64) -> anyhow::Result<bool> {
        let Some(topic) = db::get_topic(&self.pool, tid).await? else {
            return Ok(false);
        };
        let Some(category) = db::get_category(&self.pool, topic.category_id).await? else {
            return Ok(false);
        };
        self.check_topic(&topic, &category).await
    }

    /// Evaluate an already loaded topic in its already loaded category.
    pub(crate) async fn check_topic(
        &self,
        topic: &Topic,
        category: &Category,
    ) -> anyhow::Result<bool> {
        if !category.attention_eligible {
            return Ok(false);
        }

        let now = self.clock.now_ms();
        if now - topic.timestamp < ATTENTION_MIN_AGE_MS {
            return Ok(false);
        }

        let Some(main_pid) = topic.main_post_id else {
            return Ok(false);
        };
        let Some(resolved) = db::get_post_resolved_state(&self.pool, main_pid).await? else {
            return Ok(false);
        };

        let latest_reply = self.try_latest_reply_time(topic.id).await?;
        Ok(is_stale(now, topic.timestamp, resolved, latest_reply))
    }

    /// Timestamp of the topic's last reply; `None` without replies or topic.
    pub async fn latest_reply_time(&self, tid: i64) -> Option<i64> {
        match self.try_latest_reply_time(tid).await {
            Ok(ts) => ts,
            Err(e) => {
                warn!(tid, "Latest reply lookup failed: {e:#}");
                None
            }
        }
    }

    pub async fn try_latest_reply_time(&self, tid: i64) -> anyhow::Result<Option<i64>> {
        Ok(db::get_latest_reply(&self.pool, tid)
            .await?
            .map(|post| post.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DAY_MS;

    const NOW: i64 = 1_735_732_800_000; // 2025-01-01T12:00:00Z

    #[test]
    fn test_age_boundary_is_inclusive() {
        assert!(is_stale(NOW, NOW - 7 * DAY_MS, ResolvedState::Unset, None));
        assert!(!is_stale(NOW, NOW - 7 * DAY_MS + 60_000, ResolvedState::Unset, None));
        assert!(is_stale(NOW, NOW - 30 * DAY_MS, ResolvedState::Unresolved, None));
    }

    #[test]
    fn test_resolved_topics_never_stale() {
        assert!(!is_stale(NOW, NOW - 30 * DAY_MS, ResolvedState::Resolved, None));
    }

    #[test]
    fn test_reply_boundary_is_strict() {
        let topic_ts = NOW - 10 * DAY_MS;
        assert!(!is_stale(NOW, topic_ts, ResolvedState::Unset, Some(NOW - DAY_MS)));
        assert!(!is_stale(
            NOW,
            topic_ts,
            ResolvedState::Unset,
            Some(NOW - 3 * DAY_MS + 60_000)
        ));
        assert!(is_stale(NOW, topic_ts, ResolvedState::Unset, Some(NOW - 3 * DAY_MS)));
        assert!(is_stale(NOW, topic_ts, ResolvedState::Unset, Some(NOW - 5 * DAY_MS)));
    }
}
