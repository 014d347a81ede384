use serde::{Deserialize, Serialize};

fn default_limit() -> i64 {
    10
}

/// Query parameters for question listing. An unrecognized difficulty is
/// ignored rather than rejected.
#[derive(Debug, Deserialize)]
pub struct QuestionsQuery {
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Request body for a quiz submission. `user_email` is taken at face
/// value; submissions are not tied to a session.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub user_email: String,
    pub answers: Vec<i64>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub score: u32,
    pub total: u32,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}
