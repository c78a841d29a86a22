use bson::{DateTime, Document};
use crate::error::{Error, Result};
use crate::learning::{learner_filter, Learner, LearningService};
use crate::query::update::UpdateExpr;
use crate::util::bson_utils::as_i64;
use crate::debug;

/// Field holding the unlock frontier of the history playlist.
pub const HISTORY_PROGRESS: &str = "history_progress";

const HISTORY_SUBJECT_PATH: &str = "progress.History";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistView {
    pub playlist: Vec<String>,
    /// Index of the highest video the learner may watch.
    pub unlocked: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizOutcome {
    Passed { unlocked: i64 },
    Failed { unlocked: i64, message: String },
}

impl QuizOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, QuizOutcome::Passed { .. })
    }

    pub fn unlocked(&self) -> i64 {
        match self {
            QuizOutcome::Passed { unlocked } | QuizOutcome::Failed { unlocked, .. } => *unlocked,
        }
    }
}

impl LearningService {
    pub fn history_view(&self, learner: &Learner<'_>) -> Result<PlaylistView> {
        Ok(PlaylistView {
            playlist: self.options.history_playlist(),
            unlocked: self.history_unlocked(learner)?,
        })
    }

    /// Records a quiz result for the video at `video_index`.
    ///
    /// A passing score on the frontier video, or beyond it, unlocks the next video. The
    /// frontier never moves back. Accounts also earn History progress for every pass.
    ///
    /// Fails with [`Error::InvalidRequest`] for an account that is not registered.
    pub fn submit_history_quiz(&self, learner: Learner<'_>, video_index: i64, score: i64) -> Result<QuizOutcome> {
        let videos = self.options.history_playlist().len() as i64;
        if video_index < 0 || video_index >= videos {
            return Err(Error::InvalidRequest(format!("Invalid video index: {}", video_index)));
        }

        let unlocked = match &learner {
            Learner::Account(email) => match self.find_learner(email)? {
                Some(doc) => stored_frontier(&doc),
                None => return Err(Error::InvalidRequest(format!("Unknown learner: {}", email))),
            },
            Learner::Anonymous(session) => session.history_unlocked,
        };
        if score < self.options.pass_score() {
            return Ok(QuizOutcome::Failed {
                unlocked,
                message: "Please try the quiz again to unlock the next video.".to_string(),
            });
        }

        let unlocked = unlocked.max(video_index + 1);
        match learner {
            Learner::Account(email) => {
                let update = UpdateExpr::new()
                    .max(HISTORY_PROGRESS, video_index + 1)?
                    .inc_capped(HISTORY_SUBJECT_PATH, self.options.default_progress_step(), self.options.progress_cap())?
                    .push("completed_works", format!("History video {} quiz", video_index))?
                    .set("last_activity", DateTime::now())?;
                self.users.update_one_with(learner_filter(email), &update)?;
                self.award_achievements(email)?;
            }
            Learner::Anonymous(session) => session.history_unlocked = unlocked,
        }
        debug!(self.logger, "history quiz passed, video={}, unlocked={}", video_index, unlocked);

        Ok(QuizOutcome::Passed { unlocked })
    }

    fn history_unlocked(&self, learner: &Learner<'_>) -> Result<i64> {
        match learner {
            Learner::Account(email) => Ok(self.find_learner(email)?.map(|doc| stored_frontier(&doc)).unwrap_or(0)),
            Learner::Anonymous(session) => Ok(session.history_unlocked),
        }
    }
}

fn stored_frontier(learner: &Document) -> i64 {
    learner.get(HISTORY_PROGRESS).and_then(as_i64).unwrap_or(0)
}
