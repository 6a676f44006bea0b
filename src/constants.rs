//! Shared constants used across the application.

/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Minimum topic age before it can need attention (inclusive).
pub const ATTENTION_MIN_AGE_MS: i64 = 7 * DAY_MS;

/// A reply younger than this counts as recent activity.
pub const RECENT_ACTIVITY_MS: i64 = 3 * DAY_MS;

/// Category name that gets resolution and staleness tracking unless configured otherwise.
pub const DEFAULT_ATTENTION_CATEGORY: &str = "Comments & Feedback";

/// Session lifetime in seconds (30 days).
pub const SESSION_TTL_SECS: i64 = 2_592_000;

/// Audit event type written when a post is marked resolved.
pub const EVENT_POST_RESOLVED: &str = "post-resolved";

/// Audit event type written when a post is marked unresolved.
pub const EVENT_POST_UNRESOLVED: &str = "post-unresolved";

/// Time limit for a single resolution observer.
pub const OBSERVER_TIMEOUT_SECS: u64 = 30;
