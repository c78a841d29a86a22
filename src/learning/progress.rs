use bson::DateTime;
use serde::Deserialize;
use crate::error::{Error, Result};
use crate::learning::{field_name, learner_filter, lenient, LearningService};
use crate::query::update::UpdateExpr;
use crate::util::bson_utils::as_f64;

/// The pre-primary sections whose progress is tracked.
pub const PRE_PRIMARY_SECTIONS: [&str; 6] = ["colors", "animals", "fruits", "vegetables", "numbers", "strokes"];

const MAX_QUIZ_SCORE: i64 = 4;

/// Activity reported by a pre-primary section page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionUpdate {
    pub section: String,
    pub video_watched: bool,
    /// Number of games played since the last report.
    pub games_played: i64,
    /// Quiz score out of 4. Out of range scores are clamped.
    pub quiz_score: Option<i64>,
}

/// The stored progress of a pre-primary section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SectionProgress {
    #[serde(deserialize_with = "lenient::date")]
    pub last_updated: Option<DateTime>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub video_watched: bool,
    #[serde(deserialize_with = "lenient::count")]
    pub games_played: i64,
    #[serde(deserialize_with = "lenient::optional_count")]
    pub quiz_score: Option<i64>,
}

impl LearningService {
    /// Records an activity on `subject`, adding `delta` (or the configured default step)
    /// to the subject progress without exceeding the progress cap.
    ///
    /// Returns the new progress, or `None` if no learner is registered under `email`.
    pub fn record_activity(
        &self,
        email: &str,
        subject: &str,
        delta: Option<i64>,
        activity_name: &str,
    ) -> Result<Option<f64>> {
        let subject = field_name("subject", subject)?;
        let activity_name = activity_name.trim();
        if activity_name.is_empty() {
            return Err(Error::InvalidRequest("Missing activity name".to_string()));
        }

        let progress_path = format!("progress.{}", subject);
        let delta = delta.unwrap_or_else(|| self.options.default_progress_step());
        let update = UpdateExpr::new()
            .inc_capped(&progress_path, delta, self.options.progress_cap())?
            .push("completed_works", activity_name)?
            .set("last_activity", DateTime::now())?;
        self.users.update_one_with(learner_filter(email), &update)?;

        let progress = self
            .find_learner(email)?
            .map(|learner| {
                learner
                    .get_document("progress")
                    .ok()
                    .and_then(|progress| progress.get(subject))
                    .and_then(as_f64)
                    .unwrap_or(0.0)
            });

        if progress.is_some() {
            self.award_achievements(email)?;
        }
        Ok(progress)
    }

    /// Records the activity of a pre-primary section and returns the section progress.
    pub fn update_preprimary_section(&self, email: &str, update: &SectionUpdate) -> Result<SectionProgress> {
        let section = update.section.trim().to_lowercase();
        if !PRE_PRIMARY_SECTIONS.contains(&section.as_str()) {
            return Err(Error::InvalidRequest(format!("Invalid section: {}", update.section)));
        }

        let now = DateTime::now();
        let prefix = format!("preprimary_progress.{}", section);
        let mut expr = UpdateExpr::new().set(&format!("{}.last_updated", prefix), now)?;
        if update.video_watched {
            expr = expr.set(&format!("{}.video_watched", prefix), true)?;
        }
        let quiz_score = update.quiz_score.map(|score| score.clamp(0, MAX_QUIZ_SCORE));
        if let Some(score) = quiz_score {
            expr = expr.set(&format!("{}.quiz_score", prefix), score)?;
        }
        if update.games_played != 0 {
            expr = expr.inc(&format!("{}.games_played", prefix), update.games_played)?;
        }

        let title = title_case(&section);
        let summary = match quiz_score {
            Some(score) => Some(format!("Pre-Primary {}: quiz {}/{}", title, score, MAX_QUIZ_SCORE)),
            None if update.games_played != 0 => {
                Some(format!("Pre-Primary {}: played {} game(s)", title, update.games_played))
            }
            None => None,
        };
        if let Some(summary) = summary {
            expr = expr.push("completed_works", summary)?.set("last_activity", now)?;
        }

        self.users.update_one_with(learner_filter(email), &expr)?;

        let section_doc = self
            .find_learner(email)?
            .and_then(|learner| learner.get_document("preprimary_progress").ok().cloned())
            .and_then(|sections| sections.get_document(&section).ok().cloned());
        match section_doc {
            Some(doc) => Ok(bson::from_document(doc)?),
            None => Ok(SectionProgress::default()),
        }
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
