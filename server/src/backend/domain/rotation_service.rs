//! Daily game rotation and the Game of the Day.
//!
//! A date's rotation is written with insert-if-absent, so concurrent first
//! requests of the day converge on whichever list was stored first. Only an
//! admin re-roll overwrites, and only the current date.

use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::domain::calendar::{CalendarService, DATE_FORMAT};
use crate::backend::domain::commands::rotation::{ReplacePolicyCommand, RotationSnapshot};
use crate::backend::domain::models::rotation::{
    draw_rotation, RotationPolicy, MAX_GAMES_PER_DAY, MIN_GAMES_PER_DAY,
};
use crate::backend::domain::models::{PointsError, PointsResult};
use crate::backend::storage::{RotationRepository, SettingsRepository};

/// Settings key of the Game-of-the-Day mirror
pub const GAME_OF_THE_DAY_KEY: &str = "game_of_the_day";

/// Days of schedule, ending today, returned with the policy
pub const SCHEDULE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameOfTheDayMirror {
    date: String,
    game_id: Option<String>,
}

#[derive(Clone)]
pub struct RotationService {
    rotation_repository: RotationRepository,
    settings_repository: SettingsRepository,
    calendar: CalendarService,
    known_games: Vec<String>,
    fallback_games: Vec<String>,
    default_games_per_day: u32,
}

impl RotationService {
    pub fn new(
        rotation_repository: RotationRepository,
        settings_repository: SettingsRepository,
        calendar: CalendarService,
        known_games: Vec<String>,
        fallback_games: Vec<String>,
        default_games_per_day: u32,
    ) -> Self {
        Self {
            rotation_repository,
            settings_repository,
            calendar,
            known_games,
            fallback_games,
            default_games_per_day,
        }
    }

    /// Today's policy, generating today's rotation on first use
    pub async fn current_policy(&self) -> PointsResult<RotationSnapshot> {
        let today = self.calendar.today_string();
        let mut policy = self.load_policy().await?;

        if policy.enabled && policy.active_games(&today).is_empty() {
            self.generate(&policy, &today, false).await?;
            policy = self.load_policy().await?;
        }

        Ok(RotationSnapshot { policy, date: today })
    }

    /// Replace the policy settings and force a fresh rotation for today
    pub async fn replace_policy(&self, command: ReplacePolicyCommand) -> PointsResult<RotationSnapshot> {
        if !RotationPolicy::is_valid_games_per_day(command.games_per_day) {
            return Err(PointsError::Validation(format!(
                "gamesPerDay must be between {} and {}",
                MIN_GAMES_PER_DAY, MAX_GAMES_PER_DAY
            )));
        }

        let today = self.calendar.today_string();
        let mut policy = self.load_policy().await?;
        policy.enabled = command.enabled;
        policy.games_per_day = command.games_per_day;
        policy.selected_games = normalize_games(command.selected_games);
        policy.version += 1;
        self.rotation_repository.save_policy(&policy).await?;
        info!(
            "Rotation policy v{} saved: enabled={}, games_per_day={}, selected={}",
            policy.version,
            policy.enabled,
            policy.games_per_day,
            policy.selected_games.len()
        );

        if policy.enabled {
            self.generate(&policy, &today, true).await?;
        } else {
            self.write_mirror(&today, None).await?;
        }

        let policy = self.load_policy().await?;
        Ok(RotationSnapshot { policy, date: today })
    }

    /// Re-roll today's rotation with the existing pool and size
    pub async fn reroll_today(&self) -> PointsResult<RotationSnapshot> {
        let today = self.calendar.today_string();
        let policy = self.load_policy().await?;
        if !policy.enabled {
            return Err(PointsError::Conflict("Rotation is disabled".to_string()));
        }

        self.generate(&policy, &today, true).await?;
        let policy = self.load_policy().await?;
        Ok(RotationSnapshot { policy, date: today })
    }

    /// Game of the Day for `today`, read from the settings mirror when it is
    /// current and otherwise from (lazily generated) rotation
    pub async fn game_of_the_day(&self, today: &str) -> PointsResult<Option<String>> {
        if let Some(raw) = self.settings_repository.get(GAME_OF_THE_DAY_KEY).await? {
            match serde_json::from_str::<GameOfTheDayMirror>(&raw) {
                Ok(mirror) if mirror.date == today => return Ok(mirror.game_id),
                Ok(_) => {}
                Err(e) => warn!("Ignoring unreadable Game of the Day mirror: {}", e),
            }
        }

        let policy = self.load_policy().await?;
        if !policy.enabled {
            return Ok(None);
        }
        if policy.active_games(today).is_empty() {
            let games = self.generate(&policy, today, false).await?;
            return Ok(games.first().cloned());
        }

        self.rotation_repository
            .refresh_day_mirror(GAME_OF_THE_DAY_KEY, today)
            .await?;
        Ok(self
            .rotation_repository
            .get_day(today)
            .await?
            .and_then(|games| games.into_iter().next()))
    }

    /// Policy with the recent schedule window only
    async fn load_policy(&self) -> Result<RotationPolicy> {
        let since = self.calendar.today() - Duration::days(SCHEDULE_WINDOW_DAYS - 1);
        self.rotation_repository
            .load_policy(self.default_games_per_day, &since.format(DATE_FORMAT).to_string())
            .await
    }

    /// Draw and store a rotation for `date`. Returns the list now stored,
    /// which may be another writer's when `force` is false.
    async fn generate(&self, policy: &RotationPolicy, date: &str, force: bool) -> Result<Vec<String>> {
        let pool = policy.rotation_pool(&self.known_games, &self.fallback_games);
        let drawn = {
            let mut rng = rand::thread_rng();
            draw_rotation(&pool, policy.games_per_day, &mut rng)
        };
        let now = self.calendar.now_rfc3339();

        let written = if force {
            self.rotation_repository.replace_day(date, &drawn, &now).await?;
            true
        } else {
            self.rotation_repository
                .insert_day_if_absent(date, &drawn, &now)
                .await?
        };
        if written {
            self.rotation_repository.record_rotation(policy, &now).await?;
            info!("Rotation for {} set to {:?}", date, drawn);
        }

        self.rotation_repository
            .refresh_day_mirror(GAME_OF_THE_DAY_KEY, date)
            .await?;
        Ok(self
            .rotation_repository
            .get_day(date)
            .await?
            .unwrap_or_default())
    }

    async fn write_mirror(&self, date: &str, game_id: Option<&str>) -> Result<()> {
        let mirror = GameOfTheDayMirror {
            date: date.to_string(),
            game_id: game_id.map(str::to_string),
        };
        self.settings_repository
            .put(GAME_OF_THE_DAY_KEY, &serde_json::to_string(&mirror)?)
            .await
    }
}

fn normalize_games(games: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(games.len());
    for game in games {
        let game = game.trim().to_string();
        if !game.is_empty() && !normalized.contains(&game) {
            normalized.push(game);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::DbConnection;
    use chrono::{TimeZone, Utc};

    fn games(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    async fn setup_test(known: &[&str], per_day: u32) -> (RotationService, CalendarService) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let calendar = CalendarService::utc();
        calendar.freeze_at(Utc.with_ymd_and_hms(2025, 4, 10, 9, 0, 0).unwrap());
        let service = RotationService::new(
            RotationRepository::new(db.clone()),
            SettingsRepository::new(db),
            calendar.clone(),
            games(known),
            games(&["fallback-a", "fallback-b"]),
            per_day,
        );
        (service, calendar)
    }

    #[tokio::test]
    async fn test_rotation_is_stable_within_a_day() {
        let (service, _) = setup_test(&["a", "b", "c", "d", "e"], 3).await;
        let first = service.current_policy().await.unwrap();
        let second = service.current_policy().await.unwrap();

        assert_eq!(first.date, "2025-04-10");
        assert_eq!(first.active_games().len(), 3);
        assert_eq!(first.active_games(), second.active_games());
        assert_eq!(first.game_of_the_day(), second.game_of_the_day());
        assert!(first.policy.last_rotation.is_some());
    }

    #[tokio::test]
    async fn test_new_day_generates_new_entry_and_keeps_past() {
        let (service, calendar) = setup_test(&["a", "b", "c", "d", "e"], 2).await;
        let day_one = service.current_policy().await.unwrap();

        calendar.freeze_at(Utc.with_ymd_and_hms(2025, 4, 11, 9, 0, 0).unwrap());
        let day_two = service.current_policy().await.unwrap();

        assert_eq!(day_two.date, "2025-04-11");
        assert_eq!(
            day_two.policy.active_games("2025-04-10"),
            day_one.active_games().as_slice()
        );
        assert_eq!(day_two.active_games().len(), 2);
    }

    #[tokio::test]
    async fn test_game_of_the_day_matches_rotation() {
        let (service, _) = setup_test(&["a", "b", "c"], 2).await;
        let gotd = service.game_of_the_day("2025-04-10").await.unwrap();
        let snapshot = service.current_policy().await.unwrap();
        assert!(gotd.is_some());
        assert_eq!(gotd, snapshot.game_of_the_day());
        // Served from the mirror the second time
        assert_eq!(service.game_of_the_day("2025-04-10").await.unwrap(), gotd);
    }

    #[tokio::test]
    async fn test_replace_policy_validates_and_rerolls() {
        let (service, _) = setup_test(&["a", "b", "c"], 2).await;
        service.current_policy().await.unwrap();

        let err = service
            .replace_policy(ReplacePolicyCommand {
                enabled: true,
                games_per_day: 0,
                selected_games: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PointsError::Validation(_)));

        let snapshot = service
            .replace_policy(ReplacePolicyCommand {
                enabled: true,
                games_per_day: 1,
                selected_games: games(&["solo", " solo ", ""]),
            })
            .await
            .unwrap();
        assert_eq!(snapshot.policy.version, 2);
        assert_eq!(snapshot.policy.selected_games, games(&["solo"]));
        assert_eq!(snapshot.active_games(), games(&["solo"]));
        assert_eq!(
            service.game_of_the_day("2025-04-10").await.unwrap().as_deref(),
            Some("solo")
        );
    }

    #[tokio::test]
    async fn test_disabled_policy_has_no_game_of_the_day() {
        let (service, _) = setup_test(&["a", "b"], 1).await;
        service
            .replace_policy(ReplacePolicyCommand {
                enabled: false,
                games_per_day: 1,
                selected_games: vec![],
            })
            .await
            .unwrap();

        assert_eq!(service.game_of_the_day("2025-04-10").await.unwrap(), None);
        let snapshot = service.current_policy().await.unwrap();
        assert!(snapshot.active_games().is_empty());
        assert!(matches!(
            service.reroll_today().await.unwrap_err(),
            PointsError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_stale_generation_keeps_rerolled_game_of_the_day() {
        let (service, _) = setup_test(&["a", "b", "c", "d", "e", "f", "g", "h"], 1).await;
        let stale = service.load_policy().await.unwrap();
        service.current_policy().await.unwrap();

        let rerolled = service.reroll_today().await.unwrap();
        let rerolled_game = rerolled.game_of_the_day();

        // A lazy generator holding the pre-reroll policy loses to the stored day
        let stored = service.generate(&stale, "2025-04-10", false).await.unwrap();
        assert_eq!(stored.first().cloned(), rerolled_game);
        assert_eq!(service.game_of_the_day("2025-04-10").await.unwrap(), rerolled_game);
    }

    #[tokio::test]
    async fn test_schedule_is_limited_to_recent_days() {
        let (service, calendar) = setup_test(&["a", "b", "c"], 1).await;
        service.current_policy().await.unwrap();

        calendar.freeze_at(Utc.with_ymd_and_hms(2025, 4, 16, 9, 0, 0).unwrap());
        let within = service.current_policy().await.unwrap();
        assert!(within.policy.rotation_schedule.contains_key("2025-04-10"));

        calendar.freeze_at(Utc.with_ymd_and_hms(2025, 4, 17, 9, 0, 0).unwrap());
        let later = service.current_policy().await.unwrap();
        assert!(!later.policy.rotation_schedule.contains_key("2025-04-10"));
        assert!(later.policy.rotation_schedule.contains_key("2025-04-16"));
        assert_eq!(later.active_games().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_pool_when_no_games_are_known() {
        let (service, _) = setup_test(&[], 5).await;
        let snapshot = service.current_policy().await.unwrap();
        let mut active = snapshot.active_games();
        active.sort();
        assert_eq!(active, games(&["fallback-a", "fallback-b"]));
    }

    #[tokio::test]
    async fn test_reroll_overwrites_today_only() {
        let (service, calendar) = setup_test(&["a", "b", "c", "d", "e", "f", "g", "h"], 3).await;
        let yesterday = service.current_policy().await.unwrap();

        calendar.freeze_at(Utc.with_ymd_and_hms(2025, 4, 11, 9, 0, 0).unwrap());
        service.current_policy().await.unwrap();
        let rerolled = service.reroll_today().await.unwrap();

        assert_eq!(rerolled.active_games().len(), 3);
        assert_eq!(
            rerolled.policy.active_games("2025-04-10"),
            yesterday.active_games().as_slice()
        );
    }
}
