use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug)]
pub enum ModelError {
    InvalidDeadlineOrder { assignment: String },
    InvalidStage(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidDeadlineOrder { assignment } => write!(
                f,
                "assignment {assignment}: deadlines must satisfy initial <= peer_review <= final"
            ),
            ModelError::InvalidStage(raw) => write!(f, "invalid stage: {raw}"),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
