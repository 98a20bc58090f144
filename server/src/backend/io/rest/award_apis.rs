//! # REST API for Game Awards

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::Json,
};
use tracing::info;

use crate::backend::domain::commands::rewards::{AwardGameCommand, AwardGameResult};
use crate::backend::domain::models::PointsError;
use crate::backend::AppState;
use shared::{AwardGameRequest, AwardGameResponse};

/// Award a completed game to the caller.
///
/// Identity is checked first, then the rate limit, then the body, so a
/// rejected request never reaches storage.
pub async fn award_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AwardGameRequest>, JsonRejection>,
) -> Result<Json<AwardGameResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    state.award_limiter.check(&identity.uid)?;
    let Json(request) = body.map_err(|e| PointsError::Validation(e.body_text()))?;
    info!("POST /api/games/award - uid: {}, request: {:?}", identity.uid, request);

    let command = AwardGameCommand {
        uid: identity.uid,
        display_name: identity.name,
        game_id: request.game_id.unwrap_or_default(),
        retry: request.retry.unwrap_or(0),
        level: request.level,
        points: request.points,
    };
    let result = state.reward_service.award_game(command).await?;
    Ok(Json(to_response(result)))
}

fn to_response(result: AwardGameResult) -> AwardGameResponse {
    AwardGameResponse {
        success: result.success,
        awarded_points: result.awarded_points,
        awarded_xp: result.awarded_xp,
        tier_multiplier: result.tier_multiplier,
        current_tier: result.current_tier,
        is_game_of_day: result.is_game_of_day,
        applied_multiplier: result.applied_multiplier,
        already_played: result.already_played,
        message: result.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::{bearer, setup_test_state};

    fn request(game_id: Option<&str>) -> AwardGameRequest {
        AwardGameRequest {
            game_id: game_id.map(str::to_string),
            retry: None,
            level: None,
            points: None,
        }
    }

    #[tokio::test]
    async fn test_award_then_repeat() {
        let state = setup_test_state().await;
        let headers = bearer(&state, "alice");

        let first = award_game(State(state.clone()), headers.clone(), Ok(Json(request(Some("catan")))))
            .await
            .unwrap();
        assert!(first.success);
        assert!(first.awarded_points >= 1);

        let repeat = award_game(State(state), headers, Ok(Json(request(Some("catan")))))
            .await
            .unwrap();
        assert!(!repeat.success);
        assert!(repeat.already_played);
        assert_eq!(repeat.awarded_points, 0);
    }

    #[tokio::test]
    async fn test_award_requires_identity_and_game() {
        let state = setup_test_state().await;
        let err = award_game(State(state.clone()), HeaderMap::new(), Ok(Json(request(Some("catan")))))
            .await
            .unwrap_err();
        assert!(matches!(err, PointsError::Authentication(_)));

        let err = award_game(State(state.clone()), bearer(&state, "alice"), Ok(Json(request(None))))
            .await
            .unwrap_err();
        assert!(matches!(err, PointsError::Validation(_)));
    }
}
