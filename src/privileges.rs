//! Role checks. The guest (uid 0, or any non-positive id) holds no role.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::PinPolicy;
use crate::db;

/// Uid of an unauthenticated visitor.
pub const GUEST_UID: i64 = 0;

#[must_use]
pub fn is_guest(uid: i64) -> bool {
    uid <= GUEST_UID
}

pub async fn is_administrator(pool: &SqlitePool, uid: i64) -> Result<bool> {
    if is_guest(uid) {
        return Ok(false);
    }
    db::is_user_admin(pool, uid).await
}

pub async fn is_global_moderator(pool: &SqlitePool, uid: i64) -> Result<bool> {
    if is_guest(uid) {
        return Ok(false);
    }
    db::is_user_global_moderator(pool, uid).await
}

/// Moderator of this specific category.
pub async fn is_moderator(pool: &SqlitePool, uid: i64, cid: i64) -> Result<bool> {
    if is_guest(uid) {
        return Ok(false);
    }
    db::is_category_moderator(pool, cid, uid).await
}

/// Whether `uid` gets needs-attention topics pinned when listing `cid`.
pub async fn sees_attention_pinning(
    pool: &SqlitePool,
    policy: PinPolicy,
    uid: i64,
    cid: i64,
) -> Result<bool> {
    match policy {
        PinPolicy::Nobody => Ok(false),
        PinPolicy::Everyone => Ok(true),
        PinPolicy::Administrators => is_administrator(pool, uid).await,
        PinPolicy::Moderators => {
            let (admin, global_mod, category_mod) = tokio::try_join!(
                is_administrator(pool, uid),
                is_global_moderator(pool, uid),
                is_moderator(pool, uid, cid),
            )?;
            Ok(admin || global_mod || category_mod)
        }
    }
}
