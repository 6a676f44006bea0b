use anyhow::Result;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sqlx::SqlitePool;

use crate::constants::SESSION_TTL_SECS;
use crate::db;

/// Generate a cryptographically secure random session token.
pub fn generate_session_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Open a session for a user and return its token.
pub async fn start_session(pool: &SqlitePool, user_id: i64) -> Result<String> {
    let token = generate_session_token();
    let expires_at =
        (chrono::Utc::now() + chrono::Duration::seconds(SESSION_TTL_SECS)).to_rfc3339();
    db::create_session(pool, user_id, &token, &expires_at).await?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_token() {
        let token1 = generate_session_token();
        let token2 = generate_session_token();

        assert_eq!(token1.len(), 64);
        assert_eq!(token2.len(), 64);
        assert_ne!(token1, token2);
        assert!(token1.chars().all(|c| c.is_alphanumeric()));
    }
}
