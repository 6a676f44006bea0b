use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::observers::{ObserverRegistry, ResolutionChange};
use crate::config::ResolveScope;
use crate::constants::{EVENT_POST_RESOLVED, EVENT_POST_UNRESOLVED};
use crate::db::{self, Post};
use crate::error::{WorkflowError, WorkflowResult};
use crate::privileges;

/// Result of a resolve/unresolve action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedResponse {
    pub resolved: bool,
}

/// Decides who may mark posts resolved and persists the flag.
#[derive(Debug, Clone)]
pub struct ResolutionGate {
    pool: SqlitePool,
    scope: ResolveScope,
    observers: ObserverRegistry,
}

impl ResolutionGate {
    #[must_use]
    pub fn new(pool: SqlitePool, scope: ResolveScope, observers: ObserverRegistry) -> Self {
        Self {
            pool,
            scope,
            observers,
        }
    }

    /// Whether `uid` may toggle the resolved flag of `pid`.
    ///
    /// Guests, missing posts and posts whose topic or category is gone are
    /// denied. Store failures are logged and also deny.
    pub async fn can_resolve(&self, pid: i64, uid: i64) -> bool {
        match self.try_can_resolve(pid, uid).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(pid, uid, "Resolve permission check failed: {e:#}");
                false
            }
        }
    }

    /// Like [`Self::can_resolve`] but surfaces store errors.
    pub async fn try_can_resolve(&self, pid: i64, uid: i64) -> anyhow::Result<bool> {
        if privileges::is_guest(uid) {
            return Ok(false);
        }
        let Some(post) = db::get_post(&self.pool, pid).await? else {
            return Ok(false);
        };
        self.authorize(&post, uid).await
    }

    async fn authorize(&self, post: &Post, uid: i64) -> anyhow::Result<bool> {
        if privileges::is_guest(uid) {
            return Ok(false);
        }

        let Some(topic) = db::get_topic(&self.pool, post.topic_id).await? else {
            return Ok(false);
        };
        let Some(category) = db::get_category(&self.pool, topic.category_id).await? else {
            return Ok(false);
        };

        if self.scope == ResolveScope::EligibleOnly && !category.attention_eligible {
            return Ok(false);
        }

        if privileges::is_administrator(&self.pool, uid).await?
            || privileges::is_global_moderator(&self.pool, uid).await?
            || privileges::is_moderator(&self.pool, uid, category.id).await?
        {
            return Ok(true);
        }

        Ok(post.user_id == uid)
    }

    /// Mark a post resolved or unresolved on behalf of `uid`.
    ///
    /// On success the flag is stored, an audit event is written and then the
    /// observers are notified in the background. Observers never delay or
    /// change the outcome.
    pub async fn set_resolved(
        &self,
        pid: i64,
        resolved: bool,
        uid: i64,
    ) -> WorkflowResult<ResolvedResponse> {
        let post = db::get_post(&self.pool, pid)
            .await?
            .ok_or(WorkflowError::NotFound("no-post"))?;

        if !self.authorize(&post, uid).await? {
            debug!(pid, uid, "Resolve denied");
            return Err(WorkflowError::NoPrivileges);
        }

        if !db::set_post_resolved(&self.pool, pid, resolved).await? {
            // Deleted between the read and the write.
            return Err(WorkflowError::NotFound("no-post"));
        }

        let event_type = if resolved {
            EVENT_POST_RESOLVED
        } else {
            EVENT_POST_UNRESOLVED
        };
        db::insert_event(&self.pool, event_type, uid, Some(pid), Some(post.topic_id)).await?;

        info!(pid, tid = post.topic_id, uid, resolved, "Post resolution updated");

        let change = ResolutionChange {
            uid,
            resolved,
            post,
        };
        drop(self.observers.notify(change));

        Ok(ResolvedResponse { resolved })
    }

    /// Stored resolved flag as a strict boolean. Missing posts are unresolved.
    pub async fn get_resolved_status(&self, pid: i64) -> WorkflowResult<bool> {
        let state = db::get_post_resolved_state(&self.pool, pid).await?;
        Ok(state.is_some_and(db::ResolvedState::is_resolved))
    }
}
