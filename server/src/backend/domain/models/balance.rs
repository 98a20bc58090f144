/// Spendable points and lifetime experience of one user
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    pub uid: String,
    pub points: i64,
    pub xp: i64,
    pub game_xp: i64,
    /// Calendar day (YYYY-MM-DD) of the last free wheel spin
    pub last_spin_date: Option<String>,
    pub updated_at: String,
}

impl AccountBalance {
    pub fn empty(uid: &str, now: &str) -> Self {
        Self {
            uid: uid.to_string(),
            points: 0,
            xp: 0,
            game_xp: 0,
            last_spin_date: None,
            updated_at: now.to_string(),
        }
    }
}
