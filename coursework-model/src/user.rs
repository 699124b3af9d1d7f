/// A roster entry.
///
/// `pwdhash` is `None` for an unregistered placeholder row created ahead of
/// time (e.g. from a class roster import) — registration later exchanges a
/// `student_id` for `(username, generated password)` and fills it in.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub username: String,
    pub pwdhash: Option<String>,
    pub student_id: Option<String>,
    pub fullname: String,
}

impl User {
    pub fn is_registered(&self) -> bool {
        self.pwdhash.is_some()
    }
}
