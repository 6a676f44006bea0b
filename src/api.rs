//! Public API boundary consumed by the HTTP layer.
//!
//! Request validation happens here, before any authorization or store work:
//! the caller must be logged in, then the payload must be complete, then the
//! workflow decides privileges.

use serde::{Deserialize, Serialize};

use crate::error::{WorkflowError, WorkflowResult};
use crate::privileges;
use crate::workflow::{CategoryTopics, ResolvedResponse, Workflow};

/// Default number of events returned by [`recent_events`].
pub const DEFAULT_EVENT_LIMIT: i64 = 50;
const MAX_EVENT_LIMIT: i64 = 500;

/// Default listing page, `0..=19`.
pub const DEFAULT_LISTING_STOP: i64 = 19;

/// Identity of whoever is making the request. uid 0 is a guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub uid: i64,
}

impl Caller {
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            uid: privileges::GUEST_UID,
        }
    }

    fn require_login(self) -> WorkflowResult<i64> {
        if privileges::is_guest(self.uid) {
            Err(WorkflowError::NotLoggedIn)
        } else {
            Ok(self.uid)
        }
    }
}

/// Body of a set-resolved request. Both fields are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetResolvedPayload {
    pub pid: Option<i64>,
    pub resolved: Option<bool>,
}

/// Resolved flag of a post plus whether the caller may change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStatus {
    pub pid: i64,
    pub resolved: bool,
    pub can_resolve: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedsAttentionStatus {
    pub tid: i64,
    pub needs_attention: bool,
}

/// Pagination bounds for a category listing, inclusive.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListingParams {
    pub start: Option<i64>,
    pub stop: Option<i64>,
}

/// An audit event as returned to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventView {
    #[serde(rename = "type")]
    pub event_type: String,
    pub uid: i64,
    pub pid: Option<i64>,
    pub tid: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Mark a post resolved or unresolved.
///
/// Fails with `not-logged-in`, then `invalid-data`, then `no-post` or
/// `no-privileges`.
pub async fn set_resolved(
    workflow: &Workflow,
    caller: Caller,
    payload: &SetResolvedPayload,
) -> WorkflowResult<ResolvedResponse> {
    let uid = caller.require_login()?;
    let (Some(pid), Some(resolved)) = (payload.pid, payload.resolved) else {
        return Err(WorkflowError::InvalidData);
    };
    workflow.resolution.set_resolved(pid, resolved, uid).await
}

/// Read a post's resolved flag and whether the caller could toggle it.
pub async fn get_resolved(
    workflow: &Workflow,
    caller: Caller,
    pid: i64,
) -> WorkflowResult<ResolvedStatus> {
    let (resolved, can_resolve) = tokio::join!(
        workflow.resolution.get_resolved_status(pid),
        workflow.resolution.can_resolve(pid, caller.uid),
    );
    Ok(ResolvedStatus {
        pid,
        resolved: resolved?,
        can_resolve,
    })
}

pub async fn needs_attention(workflow: &Workflow, tid: i64) -> NeedsAttentionStatus {
    NeedsAttentionStatus {
        tid,
        needs_attention: workflow.attention.needs_attention(tid).await,
    }
}

pub async fn category_topics(
    workflow: &Workflow,
    caller: Caller,
    cid: i64,
    params: ListingParams,
) -> WorkflowResult<CategoryTopics> {
    let start = params.start.unwrap_or(0);
    let stop = params
        .stop
        .unwrap_or_else(|| start.saturating_add(DEFAULT_LISTING_STOP));
    workflow
        .listing
        .get_category_topics(cid, caller.uid, start, stop)
        .await
}

/// Most recent audit events. Administrators only.
pub async fn recent_events(
    workflow: &Workflow,
    caller: Caller,
    limit: Option<i64>,
) -> WorkflowResult<Vec<EventView>> {
    let uid = caller.require_login()?;
    if !privileges::is_administrator(workflow.db.pool(), uid).await? {
        return Err(WorkflowError::NoPrivileges);
    }

    let limit = limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);
    let events = crate::db::get_recent_events(workflow.db.pool(), limit).await?;

    Ok(events
        .into_iter()
        .map(|e| EventView {
            event_type: e.event_type,
            uid: e.user_id,
            pid: e.post_id,
            tid: e.topic_id,
            created_at: e.created_at,
        })
        .collect())
}
