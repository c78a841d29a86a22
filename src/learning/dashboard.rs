use std::collections::BTreeMap;
use bson::{doc, DateTime};
use serde::Deserialize;
use crate::error::{Error, Result};
use crate::learning::{learner_filter, lenient, LearningService, ParentLink, SectionProgress, SUBJECTS};
use crate::query::update::UpdateExpr;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedbackEntry {
    pub date: DateTime,
    pub message: String,
    pub parent_email: String,
}

/// The read-only view of a learner shown to its parent.
///
/// Fields missing from the learner document take the values of
/// [`ChildDashboard::default`]. Fields holding unexpected types read as empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChildDashboard {
    #[serde(deserialize_with = "lenient::or_default")]
    pub name: String,
    #[serde(deserialize_with = "lenient::percentages")]
    pub progress: BTreeMap<String, f64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub grades: BTreeMap<String, String>,
    /// Minutes.
    #[serde(deserialize_with = "lenient::count")]
    pub time_spent: i64,
    #[serde(deserialize_with = "lenient::list")]
    pub completed_works: Vec<String>,
    #[serde(deserialize_with = "lenient::date")]
    pub last_activity: Option<DateTime>,
    #[serde(deserialize_with = "lenient::list")]
    pub achievements: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub feedback: Vec<FeedbackEntry>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub preprimary_progress: BTreeMap<String, SectionProgress>,
    #[serde(deserialize_with = "lenient::count")]
    pub login_count: i64,
    #[serde(deserialize_with = "lenient::count")]
    pub history_progress: i64,
}

impl Default for ChildDashboard {
    fn default() -> Self {
        ChildDashboard {
            name: "Child".to_string(),
            progress: SUBJECTS.iter().map(|s| (s.to_string(), 0.0)).collect(),
            grades: SUBJECTS.iter().map(|s| (s.to_string(), "N/A".to_string())).collect(),
            time_spent: 0,
            completed_works: Vec::new(),
            last_activity: None,
            achievements: Vec::new(),
            feedback: Vec::new(),
            preprimary_progress: BTreeMap::new(),
            login_count: 0,
            history_progress: 0,
        }
    }
}

impl LearningService {
    /// Returns the dashboard of the learner registered under `child_email`, or a blank
    /// dashboard if there is none.
    pub fn dashboard(&self, child_email: &str) -> Result<ChildDashboard> {
        match self.find_learner(child_email)? {
            Some(learner) => Ok(bson::from_document(learner)?),
            None => Ok(ChildDashboard::default()),
        }
    }

    pub fn submit_feedback(&self, parent: &ParentLink, message: &str) -> Result<()> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidRequest("Please enter feedback.".to_string()));
        }
        let entry = doc! {
            "date": DateTime::now(),
            "message": message,
            "parent_email": parent.parent_email.as_str()
        };
        let update = UpdateExpr::new().push("feedback", entry)?;
        self.users.update_one_with(learner_filter(&parent.child_email), &update)
    }
}
