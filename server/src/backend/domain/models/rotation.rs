//! Daily game rotation policy.
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

pub const MIN_GAMES_PER_DAY: u32 = 1;
pub const MAX_GAMES_PER_DAY: u32 = 20;

/// Used when neither the policy nor the configuration names any game
pub const FALLBACK_GAMES: &[&str] = &[
    "memory-match",
    "word-scramble",
    "dice-duel",
    "tile-slide",
    "card-flip",
    "meeple-maze",
];

#[derive(Debug, Clone, PartialEq)]
pub struct RotationPolicy {
    pub version: u32,
    pub enabled: bool,
    pub games_per_day: u32,
    /// Pool to rotate from; empty means every known game
    pub selected_games: Vec<String>,
    pub rotation_schedule: BTreeMap<String, Vec<String>>,
    pub last_rotation: Option<String>,
}

impl RotationPolicy {
    pub fn new(games_per_day: u32) -> Self {
        Self {
            version: 1,
            enabled: true,
            games_per_day,
            selected_games: Vec::new(),
            rotation_schedule: BTreeMap::new(),
            last_rotation: None,
        }
    }

    pub fn active_games(&self, date: &str) -> &[String] {
        self.rotation_schedule
            .get(date)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First entry of the day's active list
    pub fn game_of_the_day(&self, date: &str) -> Option<&String> {
        self.active_games(date).first()
    }

    pub fn is_valid_games_per_day(games_per_day: u32) -> bool {
        (MIN_GAMES_PER_DAY..=MAX_GAMES_PER_DAY).contains(&games_per_day)
    }

    /// Rotation pool: selected games, else known games, else the configured
    /// fallback list, else the built-in one
    pub fn rotation_pool(&self, known_games: &[String], fallback_games: &[String]) -> Vec<String> {
        if !self.selected_games.is_empty() {
            return self.selected_games.clone();
        }
        if !known_games.is_empty() {
            return known_games.to_vec();
        }
        if !fallback_games.is_empty() {
            return fallback_games.to_vec();
        }
        FALLBACK_GAMES.iter().map(|g| g.to_string()).collect()
    }
}

/// Shuffle the pool and keep the first `games_per_day` entries.
/// Duplicates in the pool are dropped first so a game is never listed twice.
pub fn draw_rotation<R: Rng + ?Sized>(pool: &[String], games_per_day: u32, rng: &mut R) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::with_capacity(pool.len());
    for game in pool {
        if !game.trim().is_empty() && !candidates.contains(game) {
            candidates.push(game.clone());
        }
    }
    candidates.shuffle(rng);
    candidates.truncate(games_per_day as usize);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn games(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rotation_pool_precedence() {
        let mut policy = RotationPolicy::new(3);
        let known = games(&["a", "b"]);
        let fallback = games(&["f"]);
        assert_eq!(policy.rotation_pool(&known, &fallback), known);
        assert_eq!(policy.rotation_pool(&[], &fallback), fallback);
        assert_eq!(policy.rotation_pool(&[], &[]).len(), FALLBACK_GAMES.len());

        policy.selected_games = games(&["x"]);
        assert_eq!(policy.rotation_pool(&known, &fallback), games(&["x"]));
    }

    #[test]
    fn test_draw_rotation_respects_size_and_uniqueness() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = games(&["a", "b", "c", "d", "a", ""]);
        let drawn = draw_rotation(&pool, 3, &mut rng);
        assert_eq!(drawn.len(), 3);
        let mut unique = drawn.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);
        assert!(drawn.iter().all(|g| pool.contains(g) && !g.is_empty()));

        let all = draw_rotation(&pool, 20, &mut rng);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_game_of_the_day_is_first_active_game() {
        let mut policy = RotationPolicy::new(2);
        policy
            .rotation_schedule
            .insert("2025-01-01".to_string(), games(&["b", "a"]));
        assert_eq!(policy.game_of_the_day("2025-01-01").map(String::as_str), Some("b"));
        assert!(policy.game_of_the_day("2025-01-02").is_none());
    }

    #[test]
    fn test_games_per_day_bounds() {
        assert!(!RotationPolicy::is_valid_games_per_day(0));
        assert!(RotationPolicy::is_valid_games_per_day(1));
        assert!(RotationPolicy::is_valid_games_per_day(20));
        assert!(!RotationPolicy::is_valid_games_per_day(21));
    }
}
