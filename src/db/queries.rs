use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{
    Category, CreatedTopic, Event, NewReply, NewTopic, Post, ResolvedState, Session, Topic, User,
};
use crate::entities::is_designated_name;

// ========== Users ==========

/// Create a user, returning its ID.
pub async fn create_user(pool: &SqlitePool, username: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO users (username) VALUES (?)")
        .bind(username)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(result.last_insert_rowid())
}

/// Get a user by ID.
pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch user by id")
}

/// Grant or revoke site administrator rights.
pub async fn update_user_admin(pool: &SqlitePool, id: i64, is_admin: bool) -> Result<()> {
    sqlx::query("UPDATE users SET is_admin = ? WHERE id = ?")
        .bind(is_admin)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update user admin flag")?;
    Ok(())
}

/// Grant or revoke global moderator rights.
pub async fn update_user_global_moderator(
    pool: &SqlitePool,
    id: i64,
    is_global_moderator: bool,
) -> Result<()> {
    sqlx::query("UPDATE users SET is_global_moderator = ? WHERE id = ?")
        .bind(is_global_moderator)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update user global moderator flag")?;
    Ok(())
}

/// Whether the user is a site administrator. Unknown users are not.
pub async fn is_user_admin(pool: &SqlitePool, id: i64) -> Result<bool> {
    let row: Option<(bool,)> = sqlx::query_as("SELECT is_admin FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to check admin flag")?;
    Ok(row.is_some_and(|(v,)| v))
}

/// Whether the user is a global moderator. Unknown users are not.
pub async fn is_user_global_moderator(pool: &SqlitePool, id: i64) -> Result<bool> {
    let row: Option<(bool,)> =
        sqlx::query_as("SELECT is_global_moderator FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to check global moderator flag")?;
    Ok(row.is_some_and(|(v,)| v))
}

// ========== Categories ==========

/// Create a category, returning its ID.
///
/// `attention_eligible` is decided here by comparing the decoded name with
/// `designated_name`, so later checks never need to look at the name again.
pub async fn create_category(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
    designated_name: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO categories (name, description, attention_eligible) VALUES (?, ?, ?)",
    )
    .bind(name)
    .bind(description)
    .bind(is_designated_name(name, designated_name))
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(result.last_insert_rowid())
}

/// Rename a category, re-deciding its attention eligibility.
pub async fn rename_category(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    designated_name: &str,
) -> Result<()> {
    sqlx::query("UPDATE categories SET name = ?, attention_eligible = ? WHERE id = ?")
        .bind(name)
        .bind(is_designated_name(name, designated_name))
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to rename category")?;
    Ok(())
}

/// Recompute `attention_eligible` for every category against `designated_name`.
///
/// Returns how many categories changed.
pub async fn sync_attention_eligibility(pool: &SqlitePool, designated_name: &str) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let categories: Vec<(i64, String, bool)> =
        sqlx::query_as("SELECT id, name, attention_eligible FROM categories")
            .fetch_all(&mut *tx)
            .await
            .context("Failed to load categories")?;

    let mut changed = 0;
    for (id, name, eligible) in categories {
        let wanted = is_designated_name(&name, designated_name);
        if wanted == eligible {
            continue;
        }
        sqlx::query("UPDATE categories SET attention_eligible = ? WHERE id = ?")
            .bind(wanted)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to update category eligibility")?;
        changed += 1;
    }

    tx.commit()
        .await
        .context("Failed to commit category eligibility")?;
    Ok(changed)
}

/// Get a category by ID.
pub async fn get_category(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    sqlx::query_as("SELECT * FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch category")
}

/// Make a user a moderator of one category.
pub async fn add_category_moderator(pool: &SqlitePool, category_id: i64, user_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO category_moderators (category_id, user_id) VALUES (?, ?)",
    )
    .bind(category_id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to add category moderator")?;
    Ok(())
}

/// Remove a user's moderation rights in one category.
pub async fn remove_category_moderator(
    pool: &SqlitePool,
    category_id: i64,
    user_id: i64,
) -> Result<()> {
    sqlx::query("DELETE FROM category_moderators WHERE category_id = ? AND user_id = ?")
        .bind(category_id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to remove category moderator")?;
    Ok(())
}

/// Whether the user moderates the given category.
pub async fn is_category_moderator(pool: &SqlitePool, category_id: i64, user_id: i64) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM category_moderators WHERE category_id = ? AND user_id = ?",
    )
    .bind(category_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to check category moderator")?;
    Ok(row.is_some())
}

// ========== Topics ==========

/// Create a topic and its main post in one transaction.
pub async fn create_topic(pool: &SqlitePool, topic: &NewTopic) -> Result<CreatedTopic> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let topic_id = sqlx::query(
        "INSERT INTO topics (category_id, user_id, title, timestamp) VALUES (?, ?, ?, ?)",
    )
    .bind(topic.category_id)
    .bind(topic.user_id)
    .bind(&topic.title)
    .bind(topic.timestamp)
    .execute(&mut *tx)
    .await
    .context("Failed to insert topic")?
    .last_insert_rowid();

    let main_post_id = sqlx::query(
        "INSERT INTO posts (topic_id, user_id, content, timestamp) VALUES (?, ?, ?, ?)",
    )
    .bind(topic_id)
    .bind(topic.user_id)
    .bind(&topic.content)
    .bind(topic.timestamp)
    .execute(&mut *tx)
    .await
    .context("Failed to insert main post")?
    .last_insert_rowid();

    sqlx::query("UPDATE topics SET main_post_id = ? WHERE id = ?")
        .bind(main_post_id)
        .bind(topic_id)
        .execute(&mut *tx)
        .await
        .context("Failed to link main post")?;

    tx.commit().await.context("Failed to commit topic")?;

    Ok(CreatedTopic {
        topic_id,
        main_post_id,
    })
}

/// Get a topic by ID.
pub async fn get_topic(pool: &SqlitePool, id: i64) -> Result<Option<Topic>> {
    sqlx::query_as("SELECT * FROM topics WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch topic")
}

/// Get a page of a category's topics, newest first.
pub async fn get_topics_by_category(
    pool: &SqlitePool,
    category_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<Topic>> {
    sqlx::query_as(
        r"
        SELECT * FROM topics
        WHERE category_id = ?
        ORDER BY timestamp DESC, id DESC
        LIMIT ? OFFSET ?
        ",
    )
    .bind(category_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to fetch category topics")
}

/// Count the topics in a category.
pub async fn count_topics_in_category(pool: &SqlitePool, category_id: i64) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM topics WHERE category_id = ?")
        .bind(category_id)
        .fetch_one(pool)
        .await
        .context("Failed to count category topics")?;
    Ok(count)
}

// ========== Posts ==========

/// Append a reply to a topic, returning the new post ID.
pub async fn create_reply(pool: &SqlitePool, reply: &NewReply) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO posts (topic_id, user_id, content, timestamp) VALUES (?, ?, ?, ?)",
    )
    .bind(reply.topic_id)
    .bind(reply.user_id)
    .bind(&reply.content)
    .bind(reply.timestamp)
    .execute(pool)
    .await
    .context("Failed to insert reply")?;

    Ok(result.last_insert_rowid())
}

/// Get a post by ID.
pub async fn get_post(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post")
}

/// Read the raw resolved column of a post. `None` when the post is missing.
pub async fn get_post_resolved_state(pool: &SqlitePool, id: i64) -> Result<Option<ResolvedState>> {
    let row: Option<(Option<i64>,)> = sqlx::query_as("SELECT resolved FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post resolved state")?;
    Ok(row.map(|(v,)| ResolvedState::from_column(v)))
}

/// Persist a post's resolved flag as 0/1. Returns false if no such post.
pub async fn set_post_resolved(pool: &SqlitePool, id: i64, resolved: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE posts SET resolved = ? WHERE id = ?")
        .bind(ResolvedState::from(resolved).as_column())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update post resolved flag")?;
    Ok(result.rows_affected() > 0)
}

/// Get the last reply of a topic in its canonical reply sequence.
///
/// The main post is excluded; `None` when the topic has no replies.
pub async fn get_latest_reply(pool: &SqlitePool, topic_id: i64) -> Result<Option<Post>> {
    sqlx::query_as(
        r"
        SELECT p.* FROM posts p
        JOIN topics t ON t.id = p.topic_id
        WHERE p.topic_id = ? AND p.id != COALESCE(t.main_post_id, -1)
        ORDER BY p.timestamp DESC, p.id DESC
        LIMIT 1
        ",
    )
    .bind(topic_id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch latest reply")
}

// ========== Events ==========

/// Append an audit event, returning its ID.
pub async fn insert_event(
    pool: &SqlitePool,
    event_type: &str,
    user_id: i64,
    post_id: Option<i64>,
    topic_id: Option<i64>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO events (event_type, user_id, post_id, topic_id) VALUES (?, ?, ?, ?)",
    )
    .bind(event_type)
    .bind(user_id)
    .bind(post_id)
    .bind(topic_id)
    .execute(pool)
    .await
    .context("Failed to insert event")?;

    Ok(result.last_insert_rowid())
}

/// Get the most recent events, newest first.
pub async fn get_recent_events(pool: &SqlitePool, limit: i64) -> Result<Vec<Event>> {
    sqlx::query_as("SELECT * FROM events ORDER BY id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to get recent events")
}

/// Get all events recorded for a post, oldest first.
pub async fn get_events_for_post(pool: &SqlitePool, post_id: i64) -> Result<Vec<Event>> {
    sqlx::query_as("SELECT * FROM events WHERE post_id = ? ORDER BY id ASC")
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to get events for post")
}

// ========== Sessions ==========

/// Create a session for a user.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    token: &str,
    expires_at: &str,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(result.last_insert_rowid())
}

/// Get a session by its token.
pub async fn get_session_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    sqlx::query_as("SELECT * FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch session")
}

/// Delete a session.
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to delete session")?;
    Ok(())
}
