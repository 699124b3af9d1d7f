use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::git::{CommitInfo, EmptyCommitMode, GitBackend, GitIdentity, WhitespaceMode};

/// `GitBackend` implementation that shells out to a `git` binary on `PATH`.
/// Every mutating operation logs at `debug` on success and `warn` on
/// failure, including the full argv (but never stdin contents, which may
/// hold a student's mail body).
#[derive(Debug, Clone)]
pub struct ProcessGitBackend {
    git_binary: String,
}

impl Default for ProcessGitBackend {
    fn default() -> Self {
        Self { git_binary: "git".to_string() }
    }
}

impl ProcessGitBackend {
    pub fn new(git_binary: impl Into<String>) -> Self {
        Self { git_binary: git_binary.into() }
    }

    async fn run(&self, path: &Path, args: &[&str]) -> StoreResult<std::process::Output> {
        debug!(?args, dir = %path.display(), "running git");
        let output = Command::new(&self.git_binary)
            .current_dir(path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| StoreError::TransientIo(format!("failed to spawn git {:?}: {err}", args)))?;

        if !output.status.success() {
            warn!(?args, status = ?output.status, stderr = %String::from_utf8_lossy(&output.stderr), "git command failed");
        }
        Ok(output)
    }

    async fn run_identity(&self, path: &Path, identity: GitIdentity, args: &[&str]) -> StoreResult<std::process::Output> {
        debug!(?args, dir = %path.display(), identity = identity.name(), "running git");
        let output = Command::new(&self.git_binary)
            .current_dir(path)
            .env("GIT_AUTHOR_NAME", identity.name())
            .env("GIT_AUTHOR_EMAIL", identity.email())
            .env("GIT_COMMITTER_NAME", identity.name())
            .env("GIT_COMMITTER_EMAIL", identity.email())
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| StoreError::TransientIo(format!("failed to spawn git {:?}: {err}", args)))?;

        if !output.status.success() {
            warn!(?args, status = ?output.status, stderr = %String::from_utf8_lossy(&output.stderr), "git command failed");
        }
        Ok(output)
    }

    fn ok_or_malformed(output: std::process::Output, context: &str) -> StoreResult<std::process::Output> {
        if output.status.success() {
            Ok(output)
        } else {
            Err(StoreError::Malformed(format!(
                "{context}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[async_trait]
impl GitBackend for ProcessGitBackend {
    async fn init(&self, path: &Path, identity: GitIdentity) -> StoreResult<()> {
        tokio::fs::create_dir_all(path).await?;
        let output = self.run_identity(path, identity, &["init", "--quiet"]).await?;
        Self::ok_or_malformed(output, "git init failed").map(|_| ())
    }

    async fn clone_from(&self, url: &str, path: &Path, identity: GitIdentity, branch: Option<&str>) -> StoreResult<()> {
        let mut args = vec!["clone", "--quiet", url, path.to_str().unwrap_or(".")];
        if let Some(branch) = branch {
            args.insert(1, "--branch");
            args.insert(2, branch);
        }
        let parent = path.parent().unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(parent).await?;
        let output = self.run_identity(parent, identity, &args).await?;
        Self::ok_or_malformed(output, "git clone failed").map(|_| ())
    }

    async fn apply_mail(
        &self,
        path: &Path,
        mail_path: &Path,
        whitespace: WhitespaceMode,
        empty: EmptyCommitMode,
    ) -> StoreResult<()> {
        let mut args = vec!["am"];
        match whitespace {
            WhitespaceMode::Default => {}
            WhitespaceMode::ErrorAll => args.push("--whitespace=error-all"),
        }
        match empty {
            EmptyCommitMode::Disallow => {}
            EmptyCommitMode::Keep => args.push("--empty=keep"),
        }
        let mail = mail_path.to_str().ok_or_else(|| StoreError::Malformed("non-utf8 mail path".into()))?;
        args.push(mail);

        let output = self.run(path, &args).await?;
        Self::ok_or_malformed(output, "git am failed").map(|_| ())
    }

    async fn abort_apply(&self, path: &Path) -> StoreResult<()> {
        let output = self.run(path, &["am", "--abort"]).await?;
        Self::ok_or_malformed(output, "git am --abort failed").map(|_| ())
    }

    async fn commit_empty_from_file(&self, path: &Path, source: &Path) -> StoreResult<()> {
        let message = tokio::fs::read_to_string(source).await?;
        let output = self
            .run(path, &["commit", "--allow-empty", "--quiet", "--message", message.trim()])
            .await?;
        Self::ok_or_malformed(output, "git commit --allow-empty failed").map(|_| ())
    }

    async fn create_tag(&self, path: &Path, name: &str, reference: Option<&str>, message: Option<&str>) -> StoreResult<()> {
        let mut args = vec!["tag", "--force"];
        if let Some(message) = message {
            args.push("-m");
            args.push(message);
        }
        args.push(name);
        if let Some(reference) = reference {
            args.push(reference);
        }
        let output = self.run(path, &args).await?;
        Self::ok_or_malformed(output, "git tag failed").map(|_| ())
    }

    async fn tag_exists(&self, path: &Path, name: &str) -> StoreResult<bool> {
        let output = self.run(path, &["rev-parse", "--verify", "--quiet", &format!("refs/tags/{name}")]).await?;
        Ok(output.status.success())
    }

    async fn push_tags(&self, path: &Path, remote: &str) -> StoreResult<()> {
        let output = self.run(path, &["push", "--force", remote, "refs/tags/*:refs/tags/*"]).await?;
        Self::ok_or_malformed(output, "git push tags failed").map(|_| ())
    }

    async fn fetch_notes(&self, path: &Path, remote: &str, notes_ref: &str) -> StoreResult<()> {
        let refspec = format!("{notes_ref}:{notes_ref}");
        let output = self.run(path, &["fetch", remote, &refspec]).await?;
        // A remote with no notes ref yet is not an error: there is simply
        // nothing to merge before the first `add_note`.
        if output.status.success() {
            Ok(())
        } else {
            debug!(stderr = %String::from_utf8_lossy(&output.stderr), "notes fetch found nothing, continuing");
            Ok(())
        }
    }

    async fn add_note(&self, path: &Path, notes_ref: &str, target: &str, body: &str) -> StoreResult<()> {
        let output = self
            .run(path, &["notes", "--ref", notes_ref, "add", "--force", "--message", body, target])
            .await?;
        Self::ok_or_malformed(output, "git notes add failed").map(|_| ())
    }

    async fn push_notes(&self, path: &Path, remote: &str, notes_ref: &str) -> StoreResult<()> {
        let refspec = format!("{notes_ref}:{notes_ref}");
        let output = self.run(path, &["push", "--force", remote, &refspec]).await?;
        Self::ok_or_malformed(output, "git push notes failed").map(|_| ())
    }

    async fn commits_on_tag(&self, path: &Path, tag: &str) -> StoreResult<Vec<CommitInfo>> {
        let format = "--format=%x00%s%x01%b%x01%ae%x02";
        let output = self.run(path, &["log", format, tag]).await?;
        let output = Self::ok_or_malformed(output, "git log failed")?;
        let text = String::from_utf8_lossy(&output.stdout);

        let mut commits: Vec<CommitInfo> = text
            .split('\u{2}')
            .filter(|chunk| !chunk.trim().is_empty())
            .filter_map(|chunk| {
                let chunk = chunk.trim_start_matches('\u{0}');
                let mut parts = chunk.splitn(3, '\u{1}');
                let subject = parts.next()?.to_string();
                let body = parts.next().unwrap_or_default().trim().to_string();
                let author_email = parts.next().unwrap_or_default().trim().to_string();
                Some(CommitInfo { subject, body, author_email })
            })
            .collect();
        commits.reverse();
        Ok(commits)
    }

    async fn diffstat(&self, path: &Path, from: &str, to: &str) -> StoreResult<String> {
        let range = format!("{from}..{to}");
        let output = self.run(path, &["diff", "--stat", &range]).await?;
        let output = Self::ok_or_malformed(output, "git diff --stat failed")?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
