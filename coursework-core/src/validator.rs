use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use coursework_config::Config;
use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::git::{EmptyCommitMode, GitBackend, GitIdentity, WhitespaceMode};
use coursework_contracts::validator::{InboundEmail, PatchsetValidator, Rubric};
use coursework_model::AutoFeedback;

static FROM_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^From:.*?<([^@>]+)@[^>]*>").unwrap());
static DIFF_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(---|\+\+\+) ([ab]/\S+|/dev/null)").unwrap());

/// `PatchsetValidator` implementation that applies each email as a `git am`
/// patch in a fresh scratch clone, one per call, removed on drop regardless
/// of outcome.
#[derive(Clone)]
pub struct GitPatchsetValidator {
    git: Arc<dyn GitBackend>,
    config: Arc<Config>,
}

impl GitPatchsetValidator {
    pub fn new(git: Arc<dyn GitBackend>, config: Arc<Config>) -> Self {
        Self { git, config }
    }

    /// Raw mail files live flat under `patchset_root`, named by Message-ID,
    /// as delivered by the mail transport before the Ingestor ever assigns
    /// a submission id.
    fn mail_path(&self, email: &InboundEmail) -> PathBuf {
        self.config.patchset_root.join(&email.msg_id)
    }

    /// Clone of the shared grading repo, not a bare scratch repo: a
    /// successful `validate` ends by tagging and pushing here, which is how
    /// `DeadlineRunner::update_tags` later finds the commit for this
    /// submission.
    async fn scratch_repo(&self) -> StoreResult<tempfile::TempDir> {
        let dir = tempfile::tempdir().map_err(StoreError::from)?;
        (*self.git)
            .clone_from(self.config.git.mailman_remote.as_str(), dir.path(), GitIdentity::Mailman, None)
            .await?;
        Ok(dir)
    }

    async fn tag_and_push(&self, repo_path: &Path, submission_id: &str, feedback: &AutoFeedback) -> StoreResult<()> {
        self.git.create_tag(repo_path, submission_id, None, Some(feedback.as_str())).await?;
        self.git.push_tags(repo_path, self.config.git.mailman_remote.as_str()).await
    }

    fn author_local_part(contents: &str) -> Option<String> {
        FROM_HEADER.captures(contents).map(|caps| caps[1].to_string())
    }

    fn path_first_component(raw_path: &str) -> Option<String> {
        if raw_path == "/dev/null" {
            return None;
        }
        let stripped = Self::strip_ab_prefix(raw_path);
        stripped.split('/').next().map(str::to_string)
    }

    /// Strips just the leading `a/`/`b/` diff prefix, keeping the rest of
    /// the path intact, for reporting the offending path in feedback.
    fn strip_ab_prefix(raw_path: &str) -> &str {
        raw_path.strip_prefix("a/").or_else(|| raw_path.strip_prefix("b/")).unwrap_or(raw_path)
    }

    fn change_pairs(contents: &str) -> Vec<(String, String)> {
        let mut paths: Vec<String> = Vec::new();
        for caps in DIFF_PATH.captures_iter(contents) {
            paths.push(caps[2].to_string());
        }
        paths.chunks(2).filter(|chunk| chunk.len() == 2).map(|c| (c[0].clone(), c[1].clone())).collect()
    }
}

#[async_trait]
impl PatchsetValidator for GitPatchsetValidator {
    async fn validate(
        &self,
        cover_letter: &InboundEmail,
        patches: &[InboundEmail],
        submission_id: &str,
        rubric: Option<&Rubric>,
    ) -> StoreResult<AutoFeedback> {
        let repo = self.scratch_repo().await?;
        let cover_path = self.mail_path(cover_letter);

        let has_diff = self
            .git
            .apply_mail(repo.path(), &cover_path, WhitespaceMode::Default, EmptyCommitMode::Disallow)
            .await
            .is_ok();
        if has_diff {
            return Ok(self.fail_fatal(repo.path(), submission_id, Some(&cover_path), "missing cover letter!").await);
        }
        self.git.abort_apply(repo.path()).await.ok();

        if self
            .git
            .apply_mail(repo.path(), &cover_path, WhitespaceMode::Default, EmptyCommitMode::Keep)
            .await
            .is_err()
        {
            return Ok(self.fail_fatal(repo.path(), submission_id, Some(&cover_path), "missing cover letter and first patch failed to apply!").await);
        }

        if let Some(rubric) = rubric {
            if patches.len() != rubric.patch_count() {
                return Ok(self
                    .fail_fatal(
                        repo.path(),
                        submission_id,
                        Some(&cover_path),
                        &format!("patch count {} violates expected rubric patch count of {}!", patches.len(), rubric.patch_count()),
                    )
                    .await);
            }
        }

        let template_author = rubric
            .and_then(|r| r.patches.first())
            .and_then(|dict| dict.keys().next())
            .map(|(from, _)| from.clone());

        let mut whitespace_errors = Vec::new();

        for (idx, email) in patches.iter().enumerate() {
            let n = idx + 1;
            let patch_path = self.mail_path(email);
            let contents = tokio::fs::read_to_string(&patch_path).await.map_err(StoreError::from)?;

            let Some(author) = Self::author_local_part(&contents) else {
                tracing::error!(submission_id, patch = n, "malformed patch: no author header");
                return Ok(self.fail_fatal(repo.path(), submission_id, Some(&patch_path), &format!("malformed patch {n}: no author!")).await);
            };

            let pairs = Self::change_pairs(&contents);
            for (from, to) in &pairs {
                for raw in [from, to] {
                    if let Some(component) = Self::path_first_component(raw) {
                        if component != author {
                            let path = Self::strip_ab_prefix(raw);
                            return Ok(self
                                .fail_fatal(repo.path(), submission_id, Some(&patch_path), &format!("illegal patch {n}: permission denied for path {path}!"))
                                .await);
                        }
                    }
                }
            }

            if let Some(rubric) = rubric {
                if let Some(expected) = rubric.patches.get(idx) {
                    let mut counters: HashMap<(String, String), u32> = expected.keys().cloned().map(|key| (key, 0)).collect();
                    let normalize_author = template_author.as_deref().unwrap_or(author.as_str());
                    for (from, to) in &pairs {
                        let key = (
                            normalize_component(from, &author, normalize_author),
                            normalize_component(to, &author, normalize_author),
                        );
                        if let Some(count) = counters.get_mut(&key) {
                            *count += 1;
                        }
                    }
                    if counters.values().any(|&count| count == 0) {
                        return Ok(self
                            .fail_fatal(repo.path(), submission_id, Some(&patch_path), &format!("patch {n} violates the assignment rubric!"))
                            .await);
                    }
                }
            }

            let only_patch_file = pairs.len() == 1
                && pairs[0].1.ends_with(".patch")
                && contents.matches("\n@@").count() <= 1;

            if only_patch_file {
                if self
                    .git
                    .apply_mail(repo.path(), &patch_path, WhitespaceMode::Default, EmptyCommitMode::Disallow)
                    .await
                    .is_err()
                {
                    return Ok(self.fail_fatal(repo.path(), submission_id, Some(&patch_path), &format!("patch {n} failed to apply!")).await);
                }
                continue;
            }

            if self
                .git
                .apply_mail(repo.path(), &patch_path, WhitespaceMode::ErrorAll, EmptyCommitMode::Keep)
                .await
                .is_ok()
            {
                continue;
            }
            self.git.abort_apply(repo.path()).await.ok();

            if self
                .git
                .apply_mail(repo.path(), &patch_path, WhitespaceMode::Default, EmptyCommitMode::Keep)
                .await
                .is_ok()
            {
                whitespace_errors.push(n.to_string());
                continue;
            }

            return Ok(self.fail_fatal(repo.path(), submission_id, Some(&patch_path), &format!("patch {n} failed to apply!")).await);
        }

        let feedback = if whitespace_errors.is_empty() {
            AutoFeedback::new("patchset applies.")
        } else {
            let word = if whitespace_errors.len() == 1 { "patch" } else { "patches" };
            AutoFeedback::new(format!("whitespace error {word} {}?", whitespace_errors.join(",")))
        };
        self.tag_and_push(repo.path(), submission_id, &feedback).await?;
        Ok(feedback)
    }

    async fn apply_peer_review(&self, email: &InboundEmail, submission_id: &str, review_id: &str) -> StoreResult<AutoFeedback> {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(err) => return Ok(AutoFeedback::new(format!("peer review apply failed: {err}!"))),
        };

        let cloned = (*self.git)
            .clone_from(self.config.git.mailman_remote.as_str(), dir.path(), GitIdentity::Mailman, Some(review_id))
            .await;
        if cloned.is_err() {
            return Ok(AutoFeedback::new(format!("peer review apply failed: could not clone {review_id}!")));
        }

        let reply_path = self.mail_path(email);
        let applied = self
            .git
            .apply_mail(dir.path(), &reply_path, WhitespaceMode::Default, EmptyCommitMode::Keep)
            .await;

        if applied.is_err() {
            return Ok(AutoFeedback::new(format!("peer review reply to {review_id} failed to apply!")));
        }

        let feedback = AutoFeedback::new("peer review applies.");
        if self.tag_and_push(dir.path(), submission_id, &feedback).await.is_err() {
            return Ok(AutoFeedback::new("peer review apply failed: could not tag result!"));
        }

        Ok(feedback)
    }
}

impl GitPatchsetValidator {
    /// On any fatal (`!`) outcome the tag still has to refer to something,
    /// so an empty commit is made from the offending mail's raw contents
    /// (when there is one) before tagging and pushing as usual.
    async fn fail_fatal(&self, repo_path: &Path, submission_id: &str, source: Option<&Path>, message: &str) -> AutoFeedback {
        self.git.abort_apply(repo_path).await.ok();
        if let Some(source) = source {
            if self.git.commit_empty_from_file(repo_path, source).await.is_err() {
                tracing::warn!(submission_id, "failed to create placeholder empty commit for fatal outcome");
            }
        }
        let feedback = AutoFeedback::new(message.to_string());
        if let Err(err) = self.tag_and_push(repo_path, submission_id, &feedback).await {
            tracing::warn!(submission_id, %err, "failed to tag fatal outcome");
        }
        feedback
    }
}

fn normalize_component(raw_path: &str, actual_author: &str, template_author: &str) -> (String, String) {
    let component = GitPatchsetValidator::path_first_component(raw_path).unwrap_or_default();
    let rest = raw_path.splitn(2, '/').nth(1).unwrap_or_default();
    if component == actual_author {
        (template_author.to_string(), rest.to_string())
    } else {
        (component, rest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_first_component_strips_ab_prefix() {
        assert_eq!(GitPatchsetValidator::path_first_component("a/alice/hw.c"), Some("alice".to_string()));
        assert_eq!(GitPatchsetValidator::path_first_component("b/alice/hw.c"), Some("alice".to_string()));
        assert_eq!(GitPatchsetValidator::path_first_component("/dev/null"), None);
    }

    #[test]
    fn author_local_part_extracts_from_header() {
        let mail = "From: Alice Example <alice@students.example>\nSubject: [PATCH]\n\ndiff --git a/alice/x.c b/alice/x.c\n";
        assert_eq!(GitPatchsetValidator::author_local_part(mail), Some("alice".to_string()));
    }

    #[test]
    fn strip_ab_prefix_keeps_rest_of_path() {
        assert_eq!(GitPatchsetValidator::strip_ab_prefix("a/bob/x.c"), "bob/x.c");
        assert_eq!(GitPatchsetValidator::strip_ab_prefix("b/bob/x.c"), "bob/x.c");
        assert_eq!(GitPatchsetValidator::strip_ab_prefix("/dev/null"), "/dev/null");
    }

    #[test]
    fn change_pairs_collects_from_to_sequentially() {
        let mail = "--- a/alice/x.c\n+++ b/alice/x.c\n--- a/alice/y.c\n+++ b/alice/y.c\n";
        let pairs = GitPatchsetValidator::change_pairs(mail);
        assert_eq!(pairs, vec![("a/alice/x.c".to_string(), "b/alice/x.c".to_string()), ("a/alice/y.c".to_string(), "b/alice/y.c".to_string())]);
    }
}
