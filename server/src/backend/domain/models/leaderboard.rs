#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub game_id: String,
    pub uid: String,
    pub name: String,
    /// Sum of pre-tier `finalPoints` across every awarded play of this game
    pub total_points: i64,
    pub plays: i64,
    pub last_played: String,
}
