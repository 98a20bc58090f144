use crate::backend::domain::commands::rotation::{ReplacePolicyCommand, RotationSnapshot};
use shared::{ReplaceRotationPolicyRequest, RotationPolicyResponse};

pub struct RotationMapper;

impl RotationMapper {
    pub fn to_command(request: ReplaceRotationPolicyRequest) -> ReplacePolicyCommand {
        ReplacePolicyCommand {
            enabled: request.enabled,
            games_per_day: request.games_per_day,
            selected_games: request.selected_games,
        }
    }

    pub fn to_response(snapshot: RotationSnapshot) -> RotationPolicyResponse {
        let active_games = snapshot.active_games();
        let game_of_the_day = snapshot.game_of_the_day();
        let policy = snapshot.policy;
        RotationPolicyResponse {
            version: policy.version,
            enabled: policy.enabled,
            games_per_day: policy.games_per_day,
            selected_games: policy.selected_games,
            rotation_schedule: policy.rotation_schedule,
            date: snapshot.date,
            active_games,
            game_of_the_day,
            last_rotation: policy.last_rotation,
        }
    }
}
