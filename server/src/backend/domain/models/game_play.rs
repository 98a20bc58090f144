//! Daily game completion records and difficulty levels.

/// One record per (user, game, calendar day). Its existence is the
/// once-per-day guard for the first-play award and the Game-of-the-Day bonus.
#[derive(Debug, Clone, PartialEq)]
pub struct GamePlayRecord {
    pub uid: String,
    pub game_id: String,
    /// YYYY-MM-DD in the server's canonical calendar
    pub date: String,
    pub played_at: String,
    pub retry_count: u32,
    pub level: Option<String>,
    /// First-play award before the tier multiplier
    pub points_awarded: i64,
    pub is_game_of_day: bool,
    /// Game-of-the-Day factor (1 or 2)
    pub applied_multiplier: i64,
    /// Tier multiplier in force when the award was granted; absent on legacy rows
    pub tier_multiplier: Option<f64>,
    pub last_played_at: Option<String>,
    pub latest_points: Option<i64>,
    pub play_count: i64,
}

impl GamePlayRecord {
    pub fn record_id(&self) -> String {
        Self::id_for(&self.game_id, &self.date)
    }

    pub fn id_for(game_id: &str, date: &str) -> String {
        format!("{}_{}", game_id, date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn parse(level: &str) -> Option<Self> {
        match level.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            "expert" => Some(Difficulty::Expert),
            _ => None,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 1.5,
            Difficulty::Hard => 2.0,
            Difficulty::Expert => 3.0,
        }
    }

    /// Multiplier for an optional, possibly unrecognized level (defaults to 1)
    pub fn multiplier_for(level: Option<&str>) -> f64 {
        level
            .and_then(Difficulty::parse)
            .map(|d| d.multiplier())
            .unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_multipliers() {
        assert_eq!(Difficulty::multiplier_for(Some("easy")), 1.0);
        assert_eq!(Difficulty::multiplier_for(Some("Medium")), 1.5);
        assert_eq!(Difficulty::multiplier_for(Some("hard")), 2.0);
        assert_eq!(Difficulty::multiplier_for(Some("EXPERT")), 3.0);
        assert_eq!(Difficulty::multiplier_for(Some("nightmare")), 1.0);
        assert_eq!(Difficulty::multiplier_for(None), 1.0);
    }

    #[test]
    fn test_record_id() {
        assert_eq!(GamePlayRecord::id_for("catan", "2025-03-01"), "catan_2025-03-01");
    }
}
