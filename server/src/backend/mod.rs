//! # Backend Module
//!
//! Everything behind the HTTP surface of the points service.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST handlers, identity, rate limiting)
//!     ↓
//! Domain Layer (rewards, rotation, spending, reconciliation)
//!     ↓
//! Storage Layer (SQLite repositories, ledger sessions)
//! ```
//!
//! ## Key Responsibilities
//!
//! - Build the application state from configuration
//! - Seed the tier table and voucher catalog on startup
//! - Set up the REST API router with CORS and request tracing

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{anyhow, Result};
use axum::{
    http::{HeaderMap, HeaderValue, Method},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::config::{AppConfig, ServerConfig};
use crate::backend::domain::models::identity::Identity;
use crate::backend::domain::models::wheel::PrizeTable;
use crate::backend::domain::models::PointsResult;
use crate::backend::domain::{
    BackfillService, BalanceService, CalendarService, LeaderboardService, RewardService,
    RotationService, TierService, VoucherService, WheelService,
};
use crate::backend::io::{AwardRateLimiter, TokenAuthority};
use crate::backend::storage::{
    BalanceRepository, DbConnection, GamePlayRepository, LeaderboardRepository,
    RotationRepository, SettingsRepository, SourceRepository, TierRepository,
    TransactionRepository, VoucherRepository,
};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub db: DbConnection,
    pub calendar: CalendarService,
    pub reward_service: RewardService,
    pub rotation_service: RotationService,
    pub tier_service: TierService,
    pub balance_service: BalanceService,
    pub leaderboard_service: LeaderboardService,
    pub voucher_service: VoucherService,
    pub wheel_service: WheelService,
    pub backfill_service: BackfillService,
    pub token_authority: TokenAuthority,
    pub award_limiter: AwardRateLimiter,
}

impl AppState {
    /// Verified identity of the caller
    pub fn identify(&self, headers: &HeaderMap) -> PointsResult<Identity> {
        let now = self.calendar.now().with_timezone(&Utc);
        self.token_authority.identify(headers, now)
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up database at {}", config.database.url);
    let db = DbConnection::new(&config.database.url, config.database.max_connections).await?;
    let calendar = CalendarService::new(config.calendar.utc_offset_hours)?;
    build_state(config, db, calendar).await
}

/// Wire services over an open database and seed startup data
pub async fn build_state(config: &AppConfig, db: DbConnection, calendar: CalendarService) -> Result<AppState> {
    info!("Setting up domain model");
    let tier_service = TierService::new(TierRepository::new(db.clone()));
    tier_service.seed(&config.tiers).await?;

    let rotation_service = RotationService::new(
        RotationRepository::new(db.clone()),
        SettingsRepository::new(db.clone()),
        calendar.clone(),
        config.known_games(),
        config.rotation.fallback_games.clone(),
        config.rotation.games_per_day,
    );
    let reward_service = RewardService::new(
        db.clone(),
        calendar.clone(),
        rotation_service.clone(),
        tier_service.clone(),
        config.reward.clone(),
    );
    let balance_service = BalanceService::new(
        BalanceRepository::new(db.clone()),
        TransactionRepository::new(db.clone()),
        tier_service.clone(),
    );
    let leaderboard_service = LeaderboardService::new(LeaderboardRepository::new(db.clone()));

    let voucher_service = VoucherService::new(db.clone(), VoucherRepository::new(db.clone()), calendar.clone());
    voucher_service
        .sync_catalog(&config.vouchers)
        .await
        .map_err(|e| anyhow!("Failed to sync voucher catalog: {}", e))?;

    let wheel_service = WheelService::new(
        db.clone(),
        BalanceRepository::new(db.clone()),
        calendar.clone(),
        PrizeTable::new(config.wheel.prizes.clone())?,
        config.wheel.spin_cost,
    );
    let backfill_service = BackfillService::new(
        TransactionRepository::new(db.clone()),
        SourceRepository::new(db.clone()),
        GamePlayRepository::new(db.clone()),
        VoucherRepository::new(db.clone()),
        calendar.clone(),
        config.backfill.clone(),
    );

    info!("Setting up application state");
    Ok(AppState {
        db,
        calendar,
        reward_service,
        rotation_service,
        tier_service,
        balance_service,
        leaderboard_service,
        voucher_service,
        wheel_service,
        backfill_service,
        token_authority: TokenAuthority::new(&config.auth.token_secret, &config.auth.admin_uids),
        award_limiter: AwardRateLimiter::new(&config.rate_limit)?,
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, server: &ServerConfig) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);
    let cors = match &server.allowed_origin {
        Some(origin) => cors.allow_origin(
            origin
                .parse::<HeaderValue>()
                .map_err(|e| anyhow!("Invalid allowed_origin {}: {}", origin, e))?,
        ),
        None => cors.allow_origin(Any),
    };

    let api_routes = Router::new()
        .route("/games/award", post(io::award_apis::award_game))
        .route(
            "/rotation",
            get(io::rotation_apis::get_rotation)
                .post(io::rotation_apis::replace_rotation)
                .put(io::rotation_apis::reroll_rotation),
        )
        .route("/backfill", post(io::backfill_apis::backfill_ledger))
        .route("/balance", get(io::ledger_apis::get_balance))
        .route("/transactions", get(io::ledger_apis::list_transactions))
        .route("/ledger/audit", get(io::ledger_apis::audit_ledger))
        .route("/tiers", get(io::ledger_apis::list_tiers))
        .route("/leaderboard/:game_id", get(io::ledger_apis::get_leaderboard))
        .route("/vouchers", get(io::voucher_apis::list_vouchers))
        .route("/vouchers/:voucher_id/redeem", post(io::voucher_apis::redeem_voucher))
        .route(
            "/vouchers/redemptions/:code/consume",
            post(io::voucher_apis::consume_redemption),
        )
        .route("/wheel", get(io::wheel_apis::get_wheel))
        .route("/wheel/spin", post(io::wheel_apis::spin_wheel));

    Ok(Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::backend::config::GameConfig;
    use axum::http::header::AUTHORIZATION;
    use chrono::{Duration, TimeZone};

    pub const TEST_SECRET: &str = "test-secret";
    pub const TEST_ADMIN: &str = "ops";

    pub fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.token_secret = TEST_SECRET.to_string();
        config.auth.admin_uids = vec![TEST_ADMIN.to_string()];
        for game in ["catan", "chess", "go"] {
            config.reward.games.insert(game.to_string(), GameConfig::default());
        }
        config
    }

    pub async fn setup_test_state_with(config: AppConfig) -> AppState {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let calendar = CalendarService::utc();
        calendar.freeze_at(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap());
        build_state(&config, db, calendar).await.expect("Failed to build test state")
    }

    pub async fn setup_test_state() -> AppState {
        setup_test_state_with(test_config()).await
    }

    pub fn token(state: &AppState, uid: &str) -> String {
        let expires_at = state.calendar.now().with_timezone(&Utc) + Duration::hours(1);
        state.token_authority.issue(uid, None, expires_at).unwrap()
    }

    pub fn bearer(state: &AppState, uid: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token(state, uid))).unwrap(),
        );
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::backend::config::RateLimitConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn award_request(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/games/award")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_public_routes() {
        let state = setup_test_state().await;
        let router = create_router(state, &ServerConfig::default()).unwrap();

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/api/tiers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["tiers"].is_array());

        let response = router
            .oneshot(Request::builder().uri("/api/rotation").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["enabled"], true);
    }

    #[tokio::test]
    async fn test_award_over_http() {
        let state = setup_test_state().await;
        let token = token(&state, "alice");
        let router = create_router(state, &ServerConfig::default()).unwrap();

        let response = router
            .clone()
            .oneshot(award_request(None, r#"{"gameId":"catan"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["success"], false);

        let response = router
            .clone()
            .oneshot(award_request(Some(&token), r#"{"gameId":"catan","level":"hard"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        // base 10, hard doubles it; a Game of the Day doubles again
        let expected_xp = if body["isGameOfDay"] == true { 40 } else { 20 };
        assert_eq!(body["awardedXP"], expected_xp);

        let response = router
            .clone()
            .oneshot(award_request(Some(&token), r#"{"gameId":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(award_request(Some(&token), "not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rate_limit_precedes_body_validation() {
        let mut config = test_config();
        config.rate_limit = RateLimitConfig {
            requests: 1,
            window_secs: 60,
        };
        let state = setup_test_state_with(config).await;
        let token = token(&state, "alice");
        let router = create_router(state, &ServerConfig::default()).unwrap();

        let response = router
            .clone()
            .oneshot(award_request(Some(&token), r#"{"gameId":"chess"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(award_request(Some(&token), "not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get(header::RETRY_AFTER).is_some());
    }

    #[tokio::test]
    async fn test_rotation_changes_need_admin() {
        let state = setup_test_state().await;
        let user = token(&state, "alice");
        let admin = token(&state, TEST_ADMIN);
        let router = create_router(state, &ServerConfig::default()).unwrap();

        let reroll = |token: String| {
            Request::builder()
                .method("PUT")
                .uri("/api/rotation")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap()
        };
        let response = router.clone().oneshot(reroll(user)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = router.oneshot(reroll(admin)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejects_invalid_origin() {
        let server = ServerConfig {
            bind: "127.0.0.1:0".to_string(),
            allowed_origin: Some("bad\norigin".to_string()),
        };
        let state = setup_test_state().await;
        assert!(create_router(state, &server).is_err());
    }
}
