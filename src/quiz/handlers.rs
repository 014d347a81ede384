use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, instrument};

use crate::{
    auth::extractors::CurrentUser,
    error::ApiError,
    quiz::{
        catalog::{ensure_seeded, get_questions, Difficulty, QuizQuestion},
        dto::{LeaderboardQuery, QuestionsQuery, SubmitRequest, SubmitResponse},
        leaderboard::{top_results, LeaderboardEntry},
        scoring::submit_quiz,
    },
    state::AppState,
};

pub fn quiz_routes() -> Router<AppState> {
    Router::new()
        .route("/quiz/questions", get(questions))
        .route("/quiz/submit", post(submit))
        .route("/quiz/leaderboard", get(leaderboard))
}

/// The response carries `answer_index` — the contract exposes correct
/// answers to the client.
#[instrument(skip(state))]
pub async fn questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionsQuery>,
) -> Result<Json<Vec<QuizQuestion>>, ApiError> {
    ensure_seeded(state.store.as_ref()).await?;
    let difficulty = query.difficulty.as_deref().and_then(Difficulty::parse);
    let questions = get_questions(state.store.as_ref(), difficulty, Some(query.limit)).await?;
    Ok(Json(questions))
}

#[instrument(skip(state, current_user, payload))]
pub async fn submit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    // Sessions only attribute the submission in logs; `user_email` is
    // trusted as supplied.
    if let Some(user) = &current_user.0 {
        debug!(session_email = %user.email, "authenticated submission");
    }

    let difficulty = payload.difficulty.as_deref().and_then(Difficulty::parse);
    let scored = submit_quiz(
        state.store.as_ref(),
        &payload.user_email,
        &payload.answers,
        difficulty,
    )
    .await?
    .ok_or_else(|| ApiError::BadRequest("No questions available".into()))?;

    Ok(Json(SubmitResponse {
        score: scored.score,
        total: scored.total,
    }))
}

#[instrument(skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let entries = top_results(state.store.as_ref(), query.limit).await?;
    Ok(Json(entries))
}
