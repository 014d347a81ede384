use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::quiz::catalog::{ensure_seeded, Difficulty, THEME};
use crate::quiz::scoring::RESULTS;
use crate::store::{DocumentStore, Filter, Order};

/// Projection of a quiz result for the public leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Best scores first. Ties keep storage order, which is not a guarantee.
pub async fn top_results(
    store: &dyn DocumentStore,
    limit: i64,
) -> anyhow::Result<Vec<LeaderboardEntry>> {
    ensure_seeded(store).await?;
    let docs = store
        .find_many(
            RESULTS,
            &Filter::new().eq("theme", THEME),
            Some(("score", Order::Desc)),
            Some(limit),
        )
        .await?;
    docs.into_iter()
        .map(|doc| serde_json::from_value(doc).context("deserialize leaderboard entry"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::scoring::QuizResult;
    use crate::store::MemoryStore;

    async fn seed_result(store: &MemoryStore, email: &str, score: u32) {
        let result = QuizResult {
            user_email: email.to_string(),
            score,
            total: 9,
            difficulty: Difficulty::Easy,
            theme: THEME.to_string(),
        };
        store
            .insert(RESULTS, serde_json::to_value(&result).unwrap())
            .await
            .expect("insert result");
    }

    #[tokio::test]
    async fn returns_top_scores_non_increasing() {
        let store = MemoryStore::new();
        seed_result(&store, "third@example.com", 4).await;
        seed_result(&store, "first@example.com", 9).await;
        seed_result(&store, "fourth@example.com", 2).await;
        seed_result(&store, "second@example.com", 7).await;

        let entries = top_results(&store, 3).await.expect("top");
        assert_eq!(entries.len(), 3);
        let scores: Vec<u32> = entries.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![9, 7, 4]);
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(entries[0].user_email, "first@example.com");
    }

    #[tokio::test]
    async fn empty_board_is_fine() {
        let store = MemoryStore::new();
        let entries = top_results(&store, 10).await.expect("top");
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn entries_carry_created_at_from_storage() {
        let store = MemoryStore::new();
        seed_result(&store, "stamped@example.com", 5).await;
        let entries = top_results(&store, 10).await.expect("top");
        assert!(entries[0].created_at.is_some());
    }
}
