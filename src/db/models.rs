use serde::{Deserialize, Serialize};

/// A registered forum account. The guest (uid 0) is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub is_global_moderator: bool,
    pub created_at: String,
}

/// A forum category.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    /// Name as stored, possibly with `&amp;` escapes.
    pub name: String,
    pub description: Option<String>,
    /// Whether this is the designated category for resolution/staleness
    /// tracking. Resolved from the name when the category is created or renamed.
    pub attention_eligible: bool,
    pub created_at: String,
}

/// A topic. Its first post is the main post.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Topic {
    pub id: i64,
    pub category_id: i64,
    pub user_id: i64,
    pub title: String,
    pub main_post_id: Option<i64>,
    /// Creation time, milliseconds since epoch.
    pub timestamp: i64,
}

/// A post. `resolved` only means something on a topic's main post.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    pub user_id: i64,
    pub content: String,
    /// Raw column: NULL, 0 or 1.
    pub resolved: Option<i64>,
    pub timestamp: i64,
}

impl Post {
    #[must_use]
    pub fn resolved_state(&self) -> ResolvedState {
        ResolvedState::from_column(self.resolved)
    }
}

/// Resolution state of a main post.
///
/// Defaults to `Unset` for freshly created posts. Only `Resolved` counts as
/// resolved; `Unset` and `Unresolved` behave the same everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedState {
    #[default]
    Unset,
    Unresolved,
    Resolved,
}

impl ResolvedState {
    /// Decode the stored column. Anything other than exactly 1 is unresolved.
    #[must_use]
    pub fn from_column(value: Option<i64>) -> Self {
        match value {
            None => Self::Unset,
            Some(1) => Self::Resolved,
            Some(_) => Self::Unresolved,
        }
    }

    #[must_use]
    pub fn as_column(self) -> Option<i64> {
        match self {
            Self::Unset => None,
            Self::Unresolved => Some(0),
            Self::Resolved => Some(1),
        }
    }

    #[must_use]
    pub fn is_resolved(self) -> bool {
        self == Self::Resolved
    }
}

impl From<bool> for ResolvedState {
    fn from(resolved: bool) -> Self {
        if resolved {
            Self::Resolved
        } else {
            Self::Unresolved
        }
    }
}

/// Data for creating a new topic together with its main post.
#[derive(Debug, Clone)]
pub struct NewTopic {
    pub category_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub timestamp: i64,
}

/// Data for appending a reply to a topic.
#[derive(Debug, Clone)]
pub struct NewReply {
    pub topic_id: i64,
    pub user_id: i64,
    pub content: String,
    pub timestamp: i64,
}

/// Ids of a freshly created topic and its main post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedTopic {
    pub topic_id: i64,
    pub main_post_id: i64,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub event_type: String,
    pub user_id: i64,
    pub post_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub created_at: String,
}

/// A login session.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub expires_at: String,
    pub created_at: String,
}
