use crate::stage::Component;

/// Free-text feedback string whose trailing character is a stable,
/// machine-readable severity marker: `!` fatal, `?` warning, `.` pass.
///
/// Downstream stages (tag promotion, automated checks, journal release)
/// branch on [`AutoFeedback::is_fatal`] rather than parsing the message, so
/// the suffix is a contract, not incidental formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AutoFeedback(pub String);

impl AutoFeedback {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn is_fatal(&self) -> bool {
        self.0.ends_with('!')
    }

    pub fn is_warning(&self) -> bool {
        self.0.ends_with('?')
    }

    pub fn is_pass(&self) -> bool {
        self.0.ends_with('.')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AutoFeedback {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for AutoFeedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A per-stage work item: points at the `Submission` currently "in play"
/// for a given user, assignment, and [`Component`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gradeable {
    pub submission_id: String,
    pub timestamp: i64,
    pub user: String,
    pub assignment: String,
    pub component: Component,
    pub auto_feedback: AutoFeedback,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_classifies_severity() {
        assert!(AutoFeedback::new("patchset applies.").is_pass());
        assert!(AutoFeedback::new("whitespace error patch 2?").is_warning());
        assert!(AutoFeedback::new("missing cover letter!").is_fatal());
    }
}
