use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use tracing::warn;

use crate::auth::repo::User;
use crate::auth::sessions::resolve_session;
use crate::state::AppState;

/// Resolves an optional `Authorization: Bearer <token>` into the session's
/// user. Missing, unknown, expired, or unreadable tokens all come back as
/// `None`; a storage fault during resolution is logged and treated as
/// "not authenticated" rather than failing the request.
pub struct CurrentUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")));

        let Some(token) = token else {
            return Ok(CurrentUser(None));
        };

        match resolve_session(state.store.as_ref(), token).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(e) => {
                warn!(error = %e, "session resolution failed");
                Ok(CurrentUser(None))
            }
        }
    }
}
