use crate::backend::domain::commands::leaderboard::RankedEntry;
use crate::backend::domain::models::tier::{Tier, TierTable};
use shared::{LeaderboardEntryDto, LeaderboardResponse, TierDto, TierListResponse};

pub struct TierMapper;

impl TierMapper {
    pub fn to_dto(tier: Tier) -> TierDto {
        TierDto {
            name: tier.name,
            min_xp: tier.min_xp,
            multiplier: tier.multiplier,
        }
    }

    pub fn to_list_response(table: TierTable) -> TierListResponse {
        TierListResponse {
            tiers: table.tiers().iter().cloned().map(Self::to_dto).collect(),
        }
    }

    pub fn to_leaderboard_response(game_id: &str, ranked: Vec<RankedEntry>) -> LeaderboardResponse {
        LeaderboardResponse {
            game_id: game_id.trim().to_string(),
            entries: ranked
                .into_iter()
                .map(|ranked| LeaderboardEntryDto {
                    rank: ranked.rank as usize,
                    uid: ranked.entry.uid,
                    name: ranked.entry.name,
                    total_points: ranked.entry.total_points,
                    plays: ranked.entry.plays,
                    last_played: ranked.entry.last_played,
                })
                .collect(),
        }
    }
}
