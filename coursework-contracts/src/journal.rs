use async_trait::async_trait;

use crate::error::StoreResult;

/// Visibility gate applied to a user's view of the append-only journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Allow,
    Deny,
}

/// Append-only email journal with per-user visibility gates.
///
/// A user with `Deny` must not receive any record appended between that
/// `deny` and the next `allow`; records delivered before the most recent
/// `deny` remain visible. Implementations hold an exclusive lock for the
/// duration of `append` so concurrent writers cannot interleave partial
/// records.
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn append(&self, bytes: &[u8]) -> StoreResult<()>;
    async fn set_visibility(&self, user: &str, visibility: Visibility) -> StoreResult<()>;
}
