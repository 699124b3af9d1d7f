/// A peer-review pairing formed at the initial deadline: `reviewer` owes
/// reviews to up to two reviewees. `reviewee2` is `None` when the
/// submitting cohort for this assignment run has fewer than 3 members.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PeerReviewAssignment {
    pub assignment: String,
    pub reviewer: String,
    pub reviewee1: Option<String>,
    pub reviewee2: Option<String>,
}
