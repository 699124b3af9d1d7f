/// A one-shot per-semester excuse waiving the initial-submission visibility
/// penalty for `user` on `assignment`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Oopsie {
    pub user: String,
    pub assignment: String,
    pub timestamp: i64,
}
