use bson::{Bson, Document};
use crate::error::Result;
use crate::learning::{learner_filter, LearningService};
use crate::query::update::UpdateExpr;
use crate::util::bson_utils::{as_f64, as_i64};
use crate::debug;

pub const FIRST_STEPS: &str = "First Steps";
pub const LEARNING_EXPLORER: &str = "Learning Explorer";
pub const DEDICATED_LEARNER: &str = "Dedicated Learner";

const FIRST_STEPS_LOGINS: i64 = 5;
const LEARNING_EXPLORER_WORKS: usize = 10;
const MASTER_PROGRESS: f64 = 80.0;
const CHAMPION_PROGRESS: f64 = 100.0;
/// 50 hours, in minutes.
const DEDICATED_LEARNER_MINUTES: i64 = 3000;

/// Returns the achievements `learner` qualifies for and does not hold yet, in the
/// order they are granted.
pub fn evaluate_achievements(learner: &Document) -> Vec<String> {
    let held: Vec<&str> = match learner.get_array("achievements") {
        Ok(achievements) => achievements.iter().filter_map(Bson::as_str).collect(),
        Err(_) => Vec::new(),
    };
    let number = |field: &str| learner.get(field).and_then(as_i64).unwrap_or(0);
    let progress: Vec<(&str, f64)> = match learner.get_document("progress") {
        Ok(progress) => progress
            .iter()
            .filter_map(|(subject, value)| as_f64(value).map(|v| (subject.as_str(), v)))
            .collect(),
        Err(_) => Vec::new(),
    };

    let mut candidates = Vec::new();
    if number("login_count") >= FIRST_STEPS_LOGINS {
        candidates.push(FIRST_STEPS.to_string());
    }
    let completed = learner.get_array("completed_works").map(|works| works.len()).unwrap_or(0);
    if completed >= LEARNING_EXPLORER_WORKS {
        candidates.push(LEARNING_EXPLORER.to_string());
    }
    for (subject, value) in &progress {
        if *value >= MASTER_PROGRESS {
            candidates.push(format!("{} Master", subject));
        }
    }
    for (subject, value) in &progress {
        if *value >= CHAMPION_PROGRESS {
            candidates.push(format!("{} Champion", subject));
        }
    }
    if number("time_spent") >= DEDICATED_LEARNER_MINUTES {
        candidates.push(DEDICATED_LEARNER.to_string());
    }

    candidates.retain(|label| !held.contains(&label.as_str()));
    candidates
}

impl LearningService {
    /// Grants the achievements the learner newly qualifies for and returns them.
    /// Granted achievements are never removed.
    pub fn award_achievements(&self, email: &str) -> Result<Vec<String>> {
        let learner = match self.find_learner(email)? {
            Some(learner) => learner,
            None => return Ok(Vec::new()),
        };

        let granted = evaluate_achievements(&learner);
        if !granted.is_empty() {
            let update = UpdateExpr::new().push_each("achievements", granted.iter().cloned())?;
            self.users.update_one_with(learner_filter(email), &update)?;
            debug!(self.logger, "granted achievements {:?} to {}", granted, email);
        }
        Ok(granted)
    }
}
