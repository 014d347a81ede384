use anyhow::{anyhow, Context};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::auth::repo::User;
use crate::store::{DocumentStore, Filter};

pub const SESSIONS: &str = "session";

/// Session record keyed by an opaque token. A user may hold any number of
/// concurrent sessions; nothing renews or slides the expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// 32 bytes of OS entropy, URL-safe base64. The token carries no meaning;
/// it is only a lookup key.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Create a session for `email` expiring `ttl_days` from now and return
/// the raw token. Retries a bounded number of times if the generated token
/// collides with an existing one.
pub async fn create_session(
    store: &dyn DocumentStore,
    email: &str,
    ttl_days: i64,
) -> anyhow::Result<String> {
    for _ in 0..3 {
        let token = generate_token();
        let now = OffsetDateTime::now_utc();
        let session = Session {
            token: token.clone(),
            email: email.to_string(),
            created_at: now,
            expires_at: now + Duration::days(ttl_days),
        };
        let doc = serde_json::to_value(&session).context("serialize session")?;
        if store.insert_unique(SESSIONS, "token", doc).await?.is_some() {
            return Ok(token);
        }
    }
    Err(anyhow!("failed to generate unique session token"))
}

/// Resolve a token to its user. An expired session is deleted on the way
/// out (read-time sweep; there is no background job). Returns `None` for
/// unknown tokens, expired sessions, and sessions whose user vanished.
pub async fn resolve_session(
    store: &dyn DocumentStore,
    token: &str,
) -> anyhow::Result<Option<User>> {
    let filter = Filter::new().eq("token", token);
    let Some(doc) = store.find_one(SESSIONS, &filter).await? else {
        return Ok(None);
    };
    let session: Session = serde_json::from_value(doc).context("deserialize session")?;
    if session.expires_at < OffsetDateTime::now_utc() {
        store.delete(SESSIONS, &filter).await?;
        debug!(email = %session.email, "expired session removed");
        return Ok(None);
    }
    User::find_by_email(store, &session.email).await
}

/// Delete a session by token. Deleting a missing or already-expired token
/// is fine; revocation is idempotent.
pub async fn revoke_session(store: &dyn DocumentStore, token: &str) -> anyhow::Result<()> {
    store
        .delete(SESSIONS, &Filter::new().eq("token", token))
        .await?;
    Ok(())
}
