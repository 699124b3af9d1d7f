use crate::error::{ModelError, Result};
use crate::FAR_FUTURE;

/// A named work unit with three ordered deadlines.
///
/// `initial_due`, `peer_review_due`, and `final_due` are Unix-seconds
/// timestamps; any of the three may be [`FAR_FUTURE`] to disable that
/// deadline entirely (the Orchestrator then never spawns a waiter for it).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Assignment {
    pub id: i64,
    pub name: String,
    pub initial_due: i64,
    pub peer_review_due: i64,
    pub final_due: i64,
}

impl Assignment {
    /// Construct a new assignment, rejecting deadline orderings that would
    /// violate the invariant `initial <= peer_review <= final` once any
    /// `FAR_FUTURE` sentinels are accounted for.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        initial_due: i64,
        peer_review_due: i64,
        final_due: i64,
    ) -> Result<Self> {
        let asn = Self {
            id,
            name: name.into(),
            initial_due,
            peer_review_due,
            final_due,
        };
        asn.validate()?;
        Ok(asn)
    }

    pub fn validate(&self) -> Result<()> {
        let finite: Vec<i64> = [self.initial_due, self.peer_review_due, self.final_due]
            .into_iter()
            .filter(|d| *d != FAR_FUTURE)
            .collect();
        if finite.windows(2).all(|w| w[0] <= w[1]) {
            Ok(())
        } else {
            Err(ModelError::InvalidDeadlineOrder {
                assignment: self.name.clone(),
            })
        }
    }

    pub fn due_for(&self, stage: crate::Stage) -> i64 {
        match stage {
            crate::Stage::Initial => self.initial_due,
            crate::Stage::Peer => self.peer_review_due,
            crate::Stage::Final => self.final_due,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_order_finite_deadlines() {
        let err = Assignment::new(1, "programming1", 200, 100, 300).unwrap_err();
        assert!(matches!(err, ModelError::InvalidDeadlineOrder { .. }));
    }

    #[test]
    fn far_future_deadlines_are_skipped_in_ordering_check() {
        Assignment::new(1, "programming1", 100, FAR_FUTURE, 50).unwrap_err();
        Assignment::new(1, "programming1", 100, FAR_FUTURE, FAR_FUTURE).unwrap();
    }
}
