use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::{debug, warn};

use crate::api::Caller;
use crate::db as queries;
use crate::web::AppState;

/// Whoever is making the request; a guest when there is no valid session.
///
/// Never rejects: endpoints decide for themselves whether a guest may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let pool = state.workflow.db.pool();

        let Some(token) = session_token(parts, &state.config.session_cookie) else {
            return Ok(Viewer(Caller::guest()));
        };

        let session = match queries::get_session_by_token(pool, token).await {
            Ok(Some(s)) => s,
            Ok(None) => return Ok(Viewer(Caller::guest())),
            Err(e) => {
                tracing::error!("Failed to look up session: {e:#}");
                return Ok(Viewer(Caller::guest()));
            }
        };

        let now = chrono::Utc::now().to_rfc3339();
        if session.expires_at < now {
            debug!(user_id = session.user_id, "Session expired");
            if let Err(e) = queries::delete_session(pool, token).await {
                warn!(user_id = session.user_id, "Failed to delete expired session: {e:#}");
            }
            return Ok(Viewer(Caller::guest()));
        }

        Ok(Viewer(Caller {
            uid: session.user_id,
        }))
    }
}

/// Read the session token from the request's cookies.
pub fn session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get("cookie")
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                cookie
                    .trim()
                    .strip_prefix(cookie_name)
                    .and_then(|rest| rest.strip_prefix('='))
            })
        })
        .filter(|token| !token.is_empty())
}
