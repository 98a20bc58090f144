use crate::backend::domain::commands::leaderboard::RankedEntry;
use crate::backend::domain::models::{PointsError, PointsResult};
use crate::backend::storage::LeaderboardRepository;

pub const DEFAULT_LEADERBOARD_SIZE: u32 = 10;
pub const MAX_LEADERBOARD_SIZE: u32 = 100;

/// Read side of the per-game leaderboard. Writes happen inside the award
/// transaction.
#[derive(Clone)]
pub struct LeaderboardService {
    leaderboard_repository: LeaderboardRepository,
}

impl LeaderboardService {
    pub fn new(leaderboard_repository: LeaderboardRepository) -> Self {
        Self { leaderboard_repository }
    }

    pub async fn top(&self, game_id: &str, limit: Option<u32>) -> PointsResult<Vec<RankedEntry>> {
        let game_id = game_id.trim();
        if game_id.is_empty() {
            return Err(PointsError::Validation("gameId is required".to_string()));
        }
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
            .clamp(1, MAX_LEADERBOARD_SIZE);

        let entries = self.leaderboard_repository.top_entries(game_id, limit).await?;
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| RankedEntry {
                rank: index as u32 + 1,
                entry,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::{DbConnection, LedgerSession};

    #[tokio::test]
    async fn test_ranks_are_one_based_and_ordered() {
        let db = DbConnection::init_test().await.unwrap();
        let mut session = LedgerSession::begin(&db).await.unwrap();
        session.bump_leaderboard("chess", "alice", "Alice", 10, "2025-01-01T00:00:00+00:00").await.unwrap();
        session.bump_leaderboard("chess", "bob", "Bob", 25, "2025-01-01T00:00:00+00:00").await.unwrap();
        session.bump_leaderboard("chess", "alice", "Alice", 20, "2025-01-02T00:00:00+00:00").await.unwrap();
        session.commit().await.unwrap();

        let service = LeaderboardService::new(LeaderboardRepository::new(db));
        let ranked = service.top("chess", None).await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!((ranked[0].rank, ranked[0].entry.uid.as_str(), ranked[0].entry.total_points), (1, "alice", 30));
        assert_eq!(ranked[0].entry.plays, 2);
        assert_eq!((ranked[1].rank, ranked[1].entry.uid.as_str()), (2, "bob"));

        assert_eq!(service.top("chess", Some(0)).await.unwrap().len(), 1);
        assert!(matches!(service.top(" ", None).await.unwrap_err(), PointsError::Validation(_)));
    }
}
