use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::store::{DocumentStore, Filter};

pub const USERS: &str = "appuser";

fn default_true() -> bool {
    true
}

/// User record as stored. Emails are matched case-sensitively, exactly as
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(
        store: &dyn DocumentStore,
        email: &str,
    ) -> anyhow::Result<Option<User>> {
        let doc = store
            .find_one(USERS, &Filter::new().eq("email", email))
            .await?;
        doc.map(|doc| serde_json::from_value(doc).context("deserialize user"))
            .transpose()
    }

    /// Create a new user with a hashed password. Returns `None` when the
    /// email is already taken; the storage layer's unique index is the
    /// authority, so concurrent registrations cannot both win.
    pub async fn create(
        store: &dyn DocumentStore,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = User {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            avatar: None,
            is_active: true,
        };
        let doc = serde_json::json!({
            "name": user.name,
            "email": user.email,
            "password_hash": user.password_hash,
            "avatar": user.avatar,
            "is_active": user.is_active,
        });
        let inserted = store.insert_unique(USERS, "email", doc).await?;
        Ok(inserted.map(|_| user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn create_then_find_roundtrip() {
        let store = MemoryStore::new();
        let created = User::create(&store, "Alan Grant", "grant@isla.nublar", "digest")
            .await
            .expect("create")
            .expect("not a duplicate");
        assert!(created.is_active);

        let found = User::find_by_email(&store, "grant@isla.nublar")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.name, "Alan Grant");
        assert_eq!(found.password_hash, "digest");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        User::create(&store, "First", "same@example.com", "h1")
            .await
            .expect("create")
            .expect("not a duplicate");
        let second = User::create(&store, "Second", "same@example.com", "h2")
            .await
            .expect("create");
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let store = MemoryStore::new();
        User::create(&store, "Ellie", "Ellie@example.com", "h")
            .await
            .expect("create")
            .expect("not a duplicate");
        let found = User::find_by_email(&store, "ellie@example.com")
            .await
            .expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn serialized_user_hides_password_hash() {
        let user = User {
            name: "Ian".into(),
            email: "ian@example.com".into(),
            password_hash: "secret".into(),
            avatar: None,
            is_active: true,
        };
        let json = serde_json::to_string(&user).expect("serialize");
        assert!(!json.contains("secret"));
        assert!(json.contains("ian@example.com"));
    }
}
