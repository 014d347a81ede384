use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::instrument;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/test", get(test_storage))
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Jurassic Quiz API running" }))
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Storage diagnostics. Introspection faults are reported inside the body,
/// never as a failed request.
#[instrument(skip(state))]
pub async fn test_storage(State(state): State<AppState>) -> Json<Value> {
    let (database, collections) = match state.store.collection_names().await {
        Ok(names) => (
            "✅ Connected & Working".to_string(),
            names.into_iter().take(10).collect::<Vec<_>>(),
        ),
        Err(e) => (
            format!("⚠️  Connected but Error: {}", truncate(&e.to_string(), 50)),
            Vec::new(),
        ),
    };

    Json(json!({
        "backend": "✅ Running",
        "database": database,
        "database_url": if std::env::var("DATABASE_URL").is_ok() { "✅ Set" } else { "❌ Not Set" },
        "database_name": if std::env::var("DATABASE_NAME").is_ok() { "✅ Set" } else { "❌ Not Set" },
        "connection_status": "Connected",
        "collections": collections,
    }))
}
