//! Core data model definitions shared across coursework crates.
#![allow(missing_docs)]

pub mod assignment;
pub mod error;
pub mod gradeable;
pub mod oopsie;
pub mod peer_review;
pub mod session;
pub mod stage;
pub mod submission;
pub mod user;

pub use assignment::Assignment;
pub use error::{ModelError, Result as ModelResult};
pub use gradeable::{AutoFeedback, Gradeable};
pub use oopsie::Oopsie;
pub use peer_review::PeerReviewAssignment;
pub use session::Session;
pub use stage::Stage;
pub use submission::Submission;
pub use user::User;

/// Sentinel deadline meaning "this deadline is disabled".
///
/// `2009-01-23T04:57:00Z`-ish-looking far future unix timestamp; chosen by
/// the original system and preserved here since the Orchestrator's skip
/// logic and the Configurator's `dummy` subcommand both compare against it
/// literally.
pub const FAR_FUTURE: i64 = 253_401_417_420;
