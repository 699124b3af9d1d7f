/// A live web/mail-auth session. The store invariant enforces at most one
/// live session per user; issuing a new one supersedes the old.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Session {
    pub token: String,
    pub username: String,
    pub expiry: i64,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expiry
    }
}
