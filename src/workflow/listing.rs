use futures_util::future::join_all;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::attention::AttentionDetector;
use crate::config::PinPolicy;
use crate::db::{self, Topic};
use crate::entities::decode_ampersands;
use crate::error::{WorkflowError, WorkflowResult};
use crate::privileges;

/// A topic as rendered in a category listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicListItem {
    pub tid: i64,
    pub cid: i64,
    pub uid: i64,
    pub title: String,
    pub main_pid: Option<i64>,
    pub timestamp: i64,
    /// Only present for topics in the attention-eligible category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_attention: Option<bool>,
}

impl TopicListItem {
    fn from_topic(topic: &Topic) -> Self {
        Self {
            tid: topic.id,
            cid: topic.category_id,
            uid: topic.user_id,
            title: topic.title.clone(),
            main_pid: topic.main_post_id,
            timestamp: topic.timestamp,
            needs_attention: None,
        }
    }

    fn flagged(&self) -> bool {
        self.needs_attention == Some(true)
    }
}

/// One page of a category listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTopics {
    pub cid: i64,
    pub name: String,
    pub topic_count: i64,
    /// Whether needs-attention topics were moved to the top for this viewer.
    pub pinned: bool,
    pub topics: Vec<TopicListItem>,
}

/// Move needs-attention topics to the front, oldest first.
///
/// Other topics keep their relative order. The sort is stable, so flagged
/// topics with equal timestamps keep their listing order too.
pub fn pin_attention_topics(topics: &mut Vec<TopicListItem>) {
    let (mut flagged, normal): (Vec<_>, Vec<_>) =
        std::mem::take(topics).into_iter().partition(TopicListItem::flagged);
    flagged.sort_by_key(|t| t.timestamp);
    flagged.extend(normal);
    *topics = flagged;
}

/// Category topic listings annotated with the needs-attention signal.
#[derive(Clone)]
pub struct CategoryListing {
    pool: SqlitePool,
    detector: AttentionDetector,
    pin_policy: PinPolicy,
}

impl CategoryListing {
    #[must_use]
    pub fn new(pool: SqlitePool, detector: AttentionDetector, pin_policy: PinPolicy) -> Self {
        Self {
            pool,
            detector,
            pin_policy,
        }
    }

    /// Topics `start..=stop` of a category, newest first, as seen by `viewer_uid`.
    ///
    /// A negative `stop` reads to the end of the category.
    pub async fn get_category_topics(
        &self,
        cid: i64,
        viewer_uid: i64,
        start: i64,
        stop: i64,
    ) -> WorkflowResult<CategoryTopics> {
        let category = db::get_category(&self.pool, cid)
            .await?
            .ok_or(WorkflowError::NotFound("no-category"))?;

        let start = start.max(0);
        let limit = if stop < 0 {
            -1
        } else {
            stop.saturating_sub(start).saturating_add(1).max(0)
        };

        let (topics, topic_count) = tokio::try_join!(
            db::get_topics_by_category(&self.pool, cid, limit, start),
            db::count_topics_in_category(&self.pool, cid),
        )?;

        let mut items: Vec<TopicListItem> = topics.iter().map(TopicListItem::from_topic).collect();

        let mut pinned = false;
        if category.attention_eligible {
            let flags = join_all(
                topics
                    .iter()
                    .map(|topic| self.detector.check_topic(topic, &category)),
            )
            .await;

            for (item, flag) in items.iter_mut().zip(flags) {
                let flag = flag.unwrap_or_else(|e| {
                    warn!(tid = item.tid, "Needs-attention check failed: {e:#}");
                    false
                });
                item.needs_attention = Some(flag);
            }

            if privileges::sees_attention_pinning(&self.pool, self.pin_policy, viewer_uid, cid)
                .await?
            {
                pin_attention_topics(&mut items);
                pinned = true;
            }
        }

        debug!(
            cid,
            viewer_uid,
            start,
            stop,
            count = items.len(),
            pinned,
            "Built category listing"
        );

        Ok(CategoryTopics {
            cid,
            name: decode_ampersands(&category.name),
            topic_count,
            pinned,
            topics: items,
        })
    }
}
