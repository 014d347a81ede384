use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::quiz::catalog::{default_theme, ensure_seeded, get_questions, Difficulty, THEME};
use crate::store::DocumentStore;

pub const RESULTS: &str = "quizresult";

/// Append-only record of one submission. `created_at` is stamped by the
/// storage adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub user_email: String,
    pub score: u32,
    pub total: u32,
    pub difficulty: Difficulty,
    #[serde(default = "default_theme")]
    pub theme: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Scored {
    pub score: u32,
    pub total: u32,
}

/// Grade a submission and persist the result. Returns `None` when no
/// questions match the filter (the caller reports that as a bad request).
///
/// Grading is positional: the nth answer is compared against the nth
/// question in the order storage returned them, not by question identity.
/// That order is only coincidentally the client's fetch order.
pub async fn submit_quiz(
    store: &dyn DocumentStore,
    user_email: &str,
    answers: &[i64],
    difficulty: Option<Difficulty>,
) -> anyhow::Result<Option<Scored>> {
    ensure_seeded(store).await?;

    let questions = get_questions(store, difficulty, None).await?;
    if questions.is_empty() {
        return Ok(None);
    }

    let total = questions.len().min(answers.len());
    let mut score = 0u32;
    for i in 0..total {
        if answers[i] == i64::from(questions[i].answer_index) {
            score += 1;
        }
    }

    let resolved_difficulty = difficulty.unwrap_or(questions[0].difficulty);
    let result = QuizResult {
        user_email: user_email.to_string(),
        score,
        total: total as u32,
        difficulty: resolved_difficulty,
        theme: THEME.to_string(),
    };
    let doc = serde_json::to_value(&result).context("serialize quiz result")?;
    store.insert(RESULTS, doc).await?;

    info!(user_email = %user_email, score, total, "quiz submitted");
    Ok(Some(Scored {
        score,
        total: total as u32,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::catalog::QUESTIONS;
    use crate::store::{Filter, MemoryStore};
    use serde_json::json;

    /// Correct answers for the canonical set in seeded order.
    const CANONICAL_ANSWERS: [i64; 9] = [0, 3, 1, 1, 1, 0, 2, 2, 1];

    #[tokio::test]
    async fn perfect_submission_scores_full_marks() {
        let store = MemoryStore::new();
        let scored = submit_quiz(&store, "grant@isla.nublar", &CANONICAL_ANSWERS, None)
            .await
            .expect("submit")
            .expect("questions available");
        assert_eq!(scored.score, 9);
        assert_eq!(scored.total, 9);
    }

    #[tokio::test]
    async fn partial_submission_grades_leading_positions_only() {
        let store = MemoryStore::new();
        let scored = submit_quiz(&store, "grant@isla.nublar", &CANONICAL_ANSWERS[..3], None)
            .await
            .expect("submit")
            .expect("questions available");
        assert_eq!(scored.total, 3);
        assert_eq!(scored.score, 3);
    }

    #[tokio::test]
    async fn wrong_answers_score_zero() {
        let store = MemoryStore::new();
        // One past each correct index, wrapped into range.
        let wrong: Vec<i64> = CANONICAL_ANSWERS.iter().map(|a| (a + 1) % 4).collect();
        let scored = submit_quiz(&store, "nedry@ingen.example", &wrong, None)
            .await
            .expect("submit")
            .expect("questions available");
        assert_eq!(scored.score, 0);
        assert_eq!(scored.total, 9);
    }

    #[tokio::test]
    async fn difficulty_filter_grades_against_that_subset() {
        let store = MemoryStore::new();
        // The three easy questions answer 0, 3, 1 in seeded order.
        let scored = submit_quiz(
            &store,
            "sattler@isla.nublar",
            &[0, 3, 0],
            Some(Difficulty::Easy),
        )
        .await
        .expect("submit")
        .expect("questions available");
        assert_eq!(scored.total, 3);
        assert_eq!(scored.score, 2);
    }

    #[tokio::test]
    async fn result_is_persisted_with_resolved_difficulty() {
        let store = MemoryStore::new();
        submit_quiz(&store, "grant@isla.nublar", &CANONICAL_ANSWERS, None)
            .await
            .expect("submit")
            .expect("questions available");

        let docs = store
            .find_many(RESULTS, &Filter::new(), None, None)
            .await
            .expect("find results");
        assert_eq!(docs.len(), 1);
        let result: QuizResult = serde_json::from_value(docs[0].clone()).expect("deserialize");
        assert_eq!(result.user_email, "grant@isla.nublar");
        assert_eq!(result.score, 9);
        assert_eq!(result.total, 9);
        // No difficulty supplied: falls back to the first question's.
        assert_eq!(result.difficulty, Difficulty::Easy);
        assert_eq!(result.theme, THEME);
        assert!(docs[0].get("created_at").is_some());
    }

    #[tokio::test]
    async fn no_matching_questions_yields_none() {
        let store = MemoryStore::new();
        // Pre-populate one easy question so seeding is skipped, then ask
        // for a difficulty with no questions at all.
        store
            .insert(
                QUESTIONS,
                json!({"theme": THEME, "question": "only easy", "answer_index": 0, "difficulty": "easy"}),
            )
            .await
            .expect("insert");
        let scored = submit_quiz(&store, "wu@ingen.example", &[0], Some(Difficulty::Hard))
            .await
            .expect("submit");
        assert!(scored.is_none());
    }
}
