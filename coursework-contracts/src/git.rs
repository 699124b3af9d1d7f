use async_trait::async_trait;
use std::path::Path;

use crate::error::StoreResult;

/// Identity under which a GitBackend operation commits. The grading
/// pipeline always runs as one of two bot identities: `mailman` (patchset
/// ingestion and tagging) or `denis` (deadline tag promotion and notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitIdentity {
    Mailman,
    Denis,
}

impl GitIdentity {
    pub fn name(self) -> &'static str {
        match self {
            GitIdentity::Mailman => "mailman",
            GitIdentity::Denis => "denis",
        }
    }

    pub fn email(self) -> &'static str {
        match self {
            GitIdentity::Mailman => "mailman@mailman",
            GitIdentity::Denis => "denis@denis",
        }
    }
}

/// Whitespace handling for a `git am` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitespaceMode {
    Default,
    ErrorAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyCommitMode {
    /// Fail if the patch has no diff.
    Disallow,
    /// Accept a diffless patch as an empty commit.
    Keep,
}

/// Clone/init, tag creation/promotion, and notes on a single shared
/// grading repository. Implementations may shell out to a `git` binary or
/// use an in-process library so long as operation semantics and push
/// atomicity are preserved.
#[async_trait]
pub trait GitBackend: Send + Sync {
    async fn init(&self, path: &Path, identity: GitIdentity) -> StoreResult<()>;

    async fn clone_from(
        &self,
        url: &str,
        path: &Path,
        identity: GitIdentity,
        branch: Option<&str>,
    ) -> StoreResult<()>;

    /// Apply a single mail file (`git am`) in the repo at `path`.
    async fn apply_mail(
        &self,
        path: &Path,
        mail_path: &Path,
        whitespace: WhitespaceMode,
        empty: EmptyCommitMode,
    ) -> StoreResult<()>;

    async fn abort_apply(&self, path: &Path) -> StoreResult<()>;

    /// Create an empty commit from the contents of `source` (used to give
    /// a fatally-invalid patchset's tag something to point at).
    async fn commit_empty_from_file(&self, path: &Path, source: &Path) -> StoreResult<()>;

    async fn create_tag(&self, path: &Path, name: &str, reference: Option<&str>, message: Option<&str>) -> StoreResult<()>;

    async fn tag_exists(&self, path: &Path, name: &str) -> StoreResult<bool>;

    async fn push_tags(&self, path: &Path, remote: &str) -> StoreResult<()>;

    async fn fetch_notes(&self, path: &Path, remote: &str, notes_ref: &str) -> StoreResult<()>;

    async fn add_note(&self, path: &Path, notes_ref: &str, target: &str, body: &str) -> StoreResult<()>;

    async fn push_notes(&self, path: &Path, remote: &str, notes_ref: &str) -> StoreResult<()>;

    /// Commits reachable from `tag` in forward chronological order, each as
    /// `(subject, body, author_email)`.
    async fn commits_on_tag(&self, path: &Path, tag: &str) -> StoreResult<Vec<CommitInfo>>;

    async fn diffstat(&self, path: &Path, from: &str, to: &str) -> StoreResult<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub subject: String,
    pub body: String,
    pub author_email: String,
}
