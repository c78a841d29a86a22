//! Learner progress tracking built on top of the document collections.
//!
//! Learners live in the `users` collection, keyed by email. Each learner has a parent
//! account in the `parents` collection that can read the learner dashboard and leave
//! feedback.

use std::sync::Arc;
use bson::{doc, Document};
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::obs::logger::{LoggerAndTracer, NoOpLogger};
use crate::options::LearningOptions;
use crate::TutorDB;

pub mod accounts;
pub mod achievements;
pub mod dashboard;
mod lenient;
pub mod playlist;
pub mod progress;

pub use accounts::{LoginSession, NewLearner, ParentLink};
pub use achievements::evaluate_achievements;
pub use dashboard::{ChildDashboard, FeedbackEntry};
pub use playlist::{PlaylistView, QuizOutcome};
pub use progress::{SectionProgress, SectionUpdate};

pub const USERS_COLLECTION: &str = "users";
pub const PARENTS_COLLECTION: &str = "parents";

/// The subjects every new learner starts with.
pub const SUBJECTS: [&str; 4] = ["Reading", "Mathematics", "Science", "Problem Solving"];

/// Who is making a request: a signed up learner, or an anonymous visitor whose
/// progress only lives as long as the caller keeps the [`SessionProgress`].
#[derive(Debug)]
pub enum Learner<'a> {
    Account(&'a str),
    Anonymous(&'a mut SessionProgress),
}

/// Progress of an anonymous visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProgress {
    pub history_unlocked: i64,
}

#[derive(Clone)]
pub struct LearningService {
    users: Collection,
    parents: Collection,
    options: LearningOptions,
    logger: Arc<dyn LoggerAndTracer>,
}

impl LearningService {
    /// Creates a service over the learner collections of `db`, logging through the
    /// database logger.
    pub fn new(db: &TutorDB, options: LearningOptions) -> Self {
        Self::with_collections(
            db.collection(USERS_COLLECTION),
            db.collection(PARENTS_COLLECTION),
            options,
        )
        .with_logger(db.logger())
    }

    pub fn with_collections(users: Collection, parents: Collection, options: LearningOptions) -> Self {
        LearningService { users, parents, options, logger: Arc::new(NoOpLogger) }
    }

    pub fn with_logger(mut self, logger: Arc<dyn LoggerAndTracer>) -> Self {
        self.logger = logger;
        self
    }

    pub fn options(&self) -> &LearningOptions {
        &self.options
    }

    /// Returns the learner document registered under `email`.
    pub fn find_learner(&self, email: &str) -> Result<Option<Document>> {
        self.users.find_one(learner_filter(email))
    }
}

fn learner_filter(email: &str) -> Document {
    doc! { "email": email }
}

/// Rejects blank values and values that would be read as a nested path.
fn field_name<'a>(kind: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidRequest(format!("Missing {}", kind)));
    }
    if value.contains('.') || value.starts_with('$') {
        return Err(Error::InvalidRequest(format!("Invalid {}: {}", kind, value)));
    }
    Ok(value)
}
