//! Reward engine: points for completing a game.
//!
//! The first completion of a game per user and canonical day earns points
//! and XP; later completions the same day are only counted. The daily guard,
//! balance increments, ledger entry and leaderboard update share one storage
//! transaction.

use tracing::{debug, info};

use crate::backend::config::RewardConfig;
use crate::backend::domain::calendar::CalendarService;
use crate::backend::domain::commands::rewards::{AwardGameCommand, AwardGameResult};
use crate::backend::domain::models::game_play::{Difficulty, GamePlayRecord};
use crate::backend::domain::models::tier::Tier;
use crate::backend::domain::models::transaction::{
    Transaction, TransactionMetadata, TransactionSource, TransactionType,
};
use crate::backend::domain::models::{PointsError, PointsResult};
use crate::backend::domain::rotation_service::RotationService;
use crate::backend::domain::tier_service::TierService;
use crate::backend::storage::{DbConnection, LedgerSession};

/// Factor applied to the first Game-of-the-Day completion
pub const GAME_OF_THE_DAY_MULTIPLIER: i64 = 2;

/// Points for one completion, before the tier multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsBreakdown {
    /// Base points after the level multiplier and clamping
    pub base_points: i64,
    /// After retry penalty and Game-of-the-Day factor
    pub final_points: i64,
    pub applied_multiplier: i64,
}

/// Pure points calculation for one completion
pub fn compute_points(
    rules: &RewardConfig,
    game_id: &str,
    level: Option<&str>,
    caller_points: Option<i64>,
    retry: u32,
    game_of_the_day_bonus: bool,
) -> PointsBreakdown {
    let configured = rules.games.get(game_id).and_then(|game| game.base_points);
    let raw_base = configured
        .or(caller_points)
        .unwrap_or(rules.default_base_points);

    let leveled = (raw_base as f64 * Difficulty::multiplier_for(level)).round() as i64;
    let base_points = leveled.min(rules.max_points).max(1);

    let penalty = (retry as i64).saturating_mul(rules.retry_penalty);
    let after_retry = base_points.saturating_sub(penalty).max(1);

    let applied_multiplier = if game_of_the_day_bonus {
        GAME_OF_THE_DAY_MULTIPLIER
    } else {
        1
    };

    PointsBreakdown {
        base_points,
        final_points: after_retry * applied_multiplier,
        applied_multiplier,
    }
}

/// Spendable points for `final_points` at the given tier, rounded half away from zero
pub fn tiered_points(final_points: i64, tier: &Tier) -> i64 {
    (final_points as f64 * tier.multiplier).round() as i64
}

#[derive(Clone)]
pub struct RewardService {
    db: DbConnection,
    calendar: CalendarService,
    rotation_service: RotationService,
    tier_service: TierService,
    rules: RewardConfig,
}

impl RewardService {
    pub fn new(
        db: DbConnection,
        calendar: CalendarService,
        rotation_service: RotationService,
        tier_service: TierService,
        rules: RewardConfig,
    ) -> Self {
        Self {
            db,
            calendar,
            rotation_service,
            tier_service,
            rules,
        }
    }

    pub async fn award_game(&self, command: AwardGameCommand) -> PointsResult<AwardGameResult> {
        let game_id = command.game_id.trim().to_string();
        if game_id.is_empty() {
            return Err(PointsError::Validation("gameId is required".to_string()));
        }
        let uid = command.uid.as_str();

        let today = self.calendar.today_string();
        let now = self.calendar.now_rfc3339();

        // Loaded before the session opens; the session holds a pooled connection
        let game_of_the_day = self.rotation_service.game_of_the_day(&today).await?;
        let is_game_of_day = game_of_the_day.as_deref() == Some(game_id.as_str());
        let tiers = self.tier_service.table().await?;

        let first_play = compute_points(
            &self.rules,
            &game_id,
            command.level.as_deref(),
            command.points,
            command.retry,
            is_game_of_day,
        );

        let mut session = LedgerSession::begin(&self.db).await?;
        session.ensure_balance(uid, &now).await?;
        let xp = session.balance(uid).await?.map(|b| b.xp).unwrap_or(0);
        let tier = tiers.resolve(xp);

        let record = GamePlayRecord {
            uid: uid.to_string(),
            game_id: game_id.clone(),
            date: today.clone(),
            played_at: now.clone(),
            retry_count: command.retry,
            level: command.level.clone(),
            points_awarded: first_play.final_points,
            is_game_of_day,
            applied_multiplier: first_play.applied_multiplier,
            tier_multiplier: Some(tier.multiplier),
            last_played_at: None,
            latest_points: None,
            play_count: 1,
        };

        if !session.claim_daily_play(&record).await? {
            let repeat = compute_points(
                &self.rules,
                &game_id,
                command.level.as_deref(),
                command.points,
                command.retry,
                false,
            );
            session
                .touch_repeat_play(uid, &game_id, &today, &now, repeat.final_points)
                .await?;
            session.commit().await?;
            debug!("Repeat play of {} by {} on {}", game_id, uid, today);

            return Ok(AwardGameResult {
                success: false,
                awarded_points: 0,
                awarded_xp: 0,
                tier_multiplier: tier.multiplier,
                current_tier: tier.name,
                is_game_of_day,
                applied_multiplier: 1,
                already_played: true,
                message: format!("{} was already completed today; no points awarded", game_id),
            });
        }

        let xp_earned = first_play.final_points;
        let points_earned = tiered_points(first_play.final_points, &tier);

        session
            .credit(uid, points_earned, xp_earned, xp_earned, &now)
            .await?;

        let metadata = TransactionMetadata {
            game_id: Some(game_id.clone()),
            date: Some(today.clone()),
            played_at: Some(now.clone()),
            xp_earned: Some(xp_earned),
            multiplier: Some(tier.multiplier),
            ..Default::default()
        };
        let transaction = Transaction::new(
            uid,
            TransactionType::Earn,
            points_earned,
            TransactionSource::GameAward,
            format!("Completed {}", game_id),
            metadata,
            now.clone(),
        );
        session.append_transaction(&transaction).await?;
        session
            .bump_leaderboard(&game_id, uid, &command.display_name, first_play.final_points, &now)
            .await?;
        session.commit().await?;

        info!(
            "Awarded {} points / {} XP to {} for {} (tier {} x{}, game of the day: {})",
            points_earned, xp_earned, uid, game_id, tier.name, tier.multiplier, is_game_of_day
        );

        let message = if is_game_of_day {
            format!(
                "Game of the Day! Earned {} points and {} XP",
                points_earned, xp_earned
            )
        } else {
            format!("Earned {} points and {} XP", points_earned, xp_earned)
        };

        Ok(AwardGameResult {
            success: true,
            awarded_points: points_earned,
            awarded_xp: xp_earned,
            tier_multiplier: tier.multiplier,
            current_tier: tier.name,
            is_game_of_day,
            applied_multiplier: first_play.applied_multiplier,
            already_played: false,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::config::GameConfig;
    use crate::backend::domain::models::tier::TierTable;
    use crate::backend::storage::{
        BalanceRepository, GamePlayRepository, LeaderboardRepository, RotationRepository,
        SettingsRepository, TierRepository, TransactionRepository,
    };
    use chrono::{TimeZone, Utc};

    fn rules_with(games: &[(&str, Option<i64>)]) -> RewardConfig {
        let mut rules = RewardConfig::default();
        for (game, points) in games {
            rules.games.insert(
                game.to_string(),
                GameConfig {
                    base_points: *points,
                },
            );
        }
        rules
    }

    async fn build_service(db: DbConnection, rules: RewardConfig) -> (RewardService, CalendarService) {
        let calendar = CalendarService::utc();
        calendar.freeze_at(Utc.with_ymd_and_hms(2025, 5, 20, 15, 0, 0).unwrap());
        let known: Vec<String> = rules.games.keys().cloned().collect();
        let rotation = RotationService::new(
            RotationRepository::new(db.clone()),
            SettingsRepository::new(db.clone()),
            calendar.clone(),
            known,
            vec![],
            1,
        );
        let tiers = TierService::new(TierRepository::new(db.clone()));
        tiers.seed(&TierTable::default_tiers()).await.unwrap();
        let service = RewardService::new(db, calendar.clone(), rotation, tiers, rules);
        (service, calendar)
    }

    fn command(uid: &str, game_id: &str) -> AwardGameCommand {
        AwardGameCommand {
            uid: uid.to_string(),
            display_name: uid.to_uppercase(),
            game_id: game_id.to_string(),
            retry: 0,
            level: None,
            points: None,
        }
    }

    async fn grant_xp(db: &DbConnection, uid: &str, xp: i64) {
        let mut session = LedgerSession::begin(db).await.unwrap();
        session.ensure_balance(uid, "t").await.unwrap();
        session.credit(uid, 0, xp, 0, "t").await.unwrap();
        session.commit().await.unwrap();
    }

    #[test]
    fn test_compute_points_base_precedence() {
        let rules = rules_with(&[("catan", Some(20))]);
        assert_eq!(compute_points(&rules, "catan", None, Some(50), 0, false).final_points, 20);
        assert_eq!(compute_points(&rules, "go", None, Some(50), 0, false).final_points, 50);
        assert_eq!(compute_points(&rules, "go", None, None, 0, false).final_points, 10);
    }

    #[test]
    fn test_compute_points_clamps_and_penalizes() {
        let rules = RewardConfig::default();
        // 80 * 3 capped at 100
        assert_eq!(compute_points(&rules, "g", Some("expert"), Some(80), 0, false).base_points, 100);
        assert_eq!(compute_points(&rules, "g", None, Some(0), 0, false).base_points, 1);
        // Retry penalty never goes below one point
        assert_eq!(compute_points(&rules, "g", None, Some(10), 7, false).final_points, 1);
        assert_eq!(compute_points(&rules, "g", None, Some(10), u32::MAX, false).final_points, 1);
        // 15 * 1.5 = 22.5 rounds to 23
        assert_eq!(compute_points(&rules, "g", Some("medium"), Some(15), 0, false).base_points, 23);
    }

    #[test]
    fn test_compute_points_worked_example() {
        let rules = RewardConfig::default();
        let breakdown = compute_points(&rules, "g", Some("hard"), Some(10), 1, true);
        assert_eq!(breakdown.base_points, 20);
        assert_eq!(breakdown.final_points, 30);
        assert_eq!(breakdown.applied_multiplier, 2);
        assert_eq!(tiered_points(30, &Tier::new("Gold", 2000, 1.25)), 38);
    }

    #[tokio::test]
    async fn test_first_play_awards_and_records_everything() {
        let db = DbConnection::init_test().await.unwrap();
        let (service, _) = build_service(db.clone(), rules_with(&[("catan", Some(10)), ("go", None)])).await;

        // Award whichever game is not today's Game of the Day
        let gotd = service.rotation_service.game_of_the_day("2025-05-20").await.unwrap().unwrap();
        let other = if gotd == "catan" { "go" } else { "catan" };

        let result = service.award_game(command("alice", other)).await.unwrap();
        assert!(result.success);
        assert!(!result.already_played);
        assert!(!result.is_game_of_day);
        assert_eq!(result.awarded_points, 10);
        assert_eq!(result.awarded_xp, 10);
        assert_eq!(result.current_tier, "Bronze");

        let balance = BalanceRepository::new(db.clone()).get_balance("alice").await.unwrap().unwrap();
        assert_eq!((balance.points, balance.xp, balance.game_xp), (10, 10, 10));

        let ledger = TransactionRepository::new(db.clone()).get_all_transactions("alice").await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].source, TransactionSource::GameAward);
        assert_eq!(ledger[0].metadata.game_id.as_deref(), Some(other));
        assert_eq!(ledger[0].metadata.date.as_deref(), Some("2025-05-20"));

        let board = LeaderboardRepository::new(db.clone()).top_entries(other, 10).await.unwrap();
        assert_eq!(board[0].total_points, 10);
        assert_eq!(board[0].name, "ALICE");

        let play = GamePlayRepository::new(db).get_play("alice", other, "2025-05-20").await.unwrap().unwrap();
        assert_eq!(play.points_awarded, 10);
        assert_eq!(play.tier_multiplier, Some(1.0));
    }

    #[tokio::test]
    async fn test_repeat_play_awards_nothing() {
        let db = DbConnection::init_test().await.unwrap();
        let (service, calendar) = build_service(db.clone(), rules_with(&[("catan", Some(10))])).await;

        let first = service.award_game(command("alice", "catan")).await.unwrap();
        assert!(first.success);
        let second = service.award_game(command("alice", "catan")).await.unwrap();
        assert!(!second.success);
        assert!(second.already_played);
        assert_eq!(second.awarded_points, 0);
        assert_eq!(second.awarded_xp, 0);

        let balance = BalanceRepository::new(db.clone()).get_balance("alice").await.unwrap().unwrap();
        assert_eq!(balance.points, first.awarded_points);
        assert_eq!(TransactionRepository::new(db.clone()).get_all_transactions("alice").await.unwrap().len(), 1);

        let play = GamePlayRepository::new(db.clone()).get_play("alice", "catan", "2025-05-20").await.unwrap().unwrap();
        assert_eq!(play.play_count, 2);
        assert_eq!(play.points_awarded, first.awarded_xp);
        assert_eq!(play.latest_points, Some(10));

        // A new canonical day is a new first play
        calendar.freeze_at(Utc.with_ymd_and_hms(2025, 5, 21, 0, 30, 0).unwrap());
        assert!(service.award_game(command("alice", "catan")).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_game_of_the_day_bonus_with_tier() {
        let db = DbConnection::init_test().await.unwrap();
        // Single known game with one game per day: it is always the Game of the Day
        let (service, _) = build_service(db.clone(), rules_with(&[("catan", Some(10))])).await;
        grant_xp(&db, "alice", 2000).await;

        let mut award = command("alice", "catan");
        award.level = Some("hard".to_string());
        award.retry = 1;
        let result = service.award_game(award).await.unwrap();

        assert!(result.is_game_of_day);
        assert_eq!(result.applied_multiplier, 2);
        assert_eq!(result.current_tier, "Gold");
        assert_eq!(result.tier_multiplier, 1.25);
        assert_eq!(result.awarded_xp, 30);
        assert_eq!(result.awarded_points, 38);

        let board = LeaderboardRepository::new(db).top_entries("catan", 10).await.unwrap();
        assert_eq!(board[0].total_points, 30);
    }

    #[tokio::test]
    async fn test_empty_game_id_is_rejected() {
        let db = DbConnection::init_test().await.unwrap();
        let (service, _) = build_service(db.clone(), RewardConfig::default()).await;
        let err = service.award_game(command("alice", "  ")).await.unwrap_err();
        assert!(matches!(err, PointsError::Validation(_)));
        assert!(BalanceRepository::new(db).get_balance("alice").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_awards_grant_one_first_play() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("points.db").display());
        let db = DbConnection::new(&url, 5).await.unwrap();
        let (service, _) = build_service(db.clone(), rules_with(&[("catan", Some(10))])).await;
        // Generate today's rotation up front
        service.rotation_service.game_of_the_day("2025-05-20").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.award_game(command("alice", "catan")).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().success {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);

        let balance = BalanceRepository::new(db.clone()).get_balance("alice").await.unwrap().unwrap();
        assert_eq!(balance.points, 20);
        assert_eq!(TransactionRepository::new(db).get_all_transactions("alice").await.unwrap().len(), 1);
    }
}
