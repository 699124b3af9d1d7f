use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::journal::{JournalStore, Visibility};

/// Append-only journal file with a sidecar visibility file. `append` takes
/// an OS-level exclusive lock on the journal for the duration of the write
/// so concurrent ingestors can't interleave partial records; `set_visibility`
/// locks the much smaller sidecar instead.
#[derive(Debug, Clone)]
pub struct FileJournalStore {
    journal_path: PathBuf,
    visibility_path: PathBuf,
}

impl FileJournalStore {
    pub fn new(journal_root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = journal_root.as_ref();
        std::fs::create_dir_all(root)?;
        Ok(Self {
            journal_path: root.join("journal"),
            visibility_path: root.join("visibility"),
        })
    }
}

#[async_trait]
impl JournalStore for FileJournalStore {
    async fn append(&self, bytes: &[u8]) -> StoreResult<()> {
        let path = self.journal_path.clone();
        let owned = bytes.to_vec();
        tokio::task::spawn_blocking(move || append_locked(&path, &owned))
            .await
            .map_err(|err| StoreError::TransientIo(format!("append task panicked: {err}")))??;
        Ok(())
    }

    async fn set_visibility(&self, user: &str, visibility: Visibility) -> StoreResult<()> {
        let path = self.visibility_path.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || set_visibility_locked(&path, &user, visibility))
            .await
            .map_err(|err| StoreError::TransientIo(format!("set_visibility task panicked: {err}")))??;
        Ok(())
    }
}

fn append_locked(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive().map_err(|err| StoreError::TransientIo(format!("journal lock failed: {err}")))?;
    let result = (|| -> StoreResult<()> {
        file.write_all(bytes)?;
        file.write_all(b"\n")?;
        file.sync_data()?;
        Ok(())
    })();
    let _ = FileExt::unlock(&file);
    result
}

fn set_visibility_locked(path: &Path, user: &str, visibility: Visibility) -> StoreResult<()> {
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive().map_err(|err| StoreError::TransientIo(format!("visibility lock failed: {err}")))?;
    let marker = match visibility {
        Visibility::Allow => "allow",
        Visibility::Deny => "deny",
    };
    let line = format!("{} {}\n", user, marker);
    let result = file.write_all(line.as_bytes()).map_err(StoreError::from);
    let _ = FileExt::unlock(&file);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_is_durable_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJournalStore::new(dir.path()).unwrap();

        store.append(b"first").await.unwrap();
        store.append(b"second").await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("journal")).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[tokio::test]
    async fn set_visibility_appends_a_marker_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJournalStore::new(dir.path()).unwrap();

        store.set_visibility("alice", Visibility::Deny).await.unwrap();
        store.set_visibility("alice", Visibility::Allow).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("visibility")).unwrap();
        assert_eq!(contents, "alice deny\nalice allow\n");
    }
}
