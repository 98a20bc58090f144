/// A caller whose bearer token has been verified
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub uid: String,
    /// Display name used on leaderboards; falls back to the uid
    pub name: String,
    /// Resolved server-side from configuration, never from the token
    pub is_admin: bool,
}
