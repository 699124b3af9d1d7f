use async_trait::async_trait;

use coursework_model::AutoFeedback;

use crate::error::StoreResult;

/// One email of a submission session: either the cover letter or a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEmail {
    pub recipient: String,
    pub msg_id: String,
}

/// Expected shape of a submission expressed as a sequence of multisets of
/// `(from_path, to_path)` change pairs, one multiset per expected patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rubric {
    pub patches: Vec<std::collections::HashMap<(String, String), u32>>,
}

impl Rubric {
    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }
}

/// Validates an ordered patchset against a rubric and per-user path
/// namespacing, in an ephemeral scratch repository.
#[async_trait]
pub trait PatchsetValidator: Send + Sync {
    async fn validate(
        &self,
        cover_letter: &InboundEmail,
        patches: &[InboundEmail],
        submission_id: &str,
        rubric: Option<&Rubric>,
    ) -> StoreResult<AutoFeedback>;

    /// Apply a single peer-review reply onto the reviewed submission's
    /// branch in the shared grading repo, tagging the result.
    async fn apply_peer_review(
        &self,
        email: &InboundEmail,
        submission_id: &str,
        review_id: &str,
    ) -> StoreResult<AutoFeedback>;
}
