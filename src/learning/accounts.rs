use bson::{doc, DateTime, Document};
use serde::Deserialize;
use crate::error::{Error, Result};
use crate::learning::{learner_filter, LearningService, SUBJECTS};
use crate::query::update::UpdateExpr;
use crate::info;

const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewLearner {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A learner session opened by [`LearningService::record_login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSession {
    pub email: String,
    pub name: String,
    pub started_at: DateTime,
}

/// A parent account and the learner it follows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParentLink {
    #[serde(rename = "email")]
    pub parent_email: String,
    pub child_email: String,
    pub child_name: String,
}

/// Returns the email of the parent account created along with a learner.
pub fn parent_email(child_email: &str) -> String {
    format!("parent_{}", child_email)
}

impl LearningService {
    /// Registers a learner and its parent account, returning the parent email.
    pub fn sign_up(&self, learner: NewLearner) -> Result<String> {
        let name = learner.name.trim();
        let email = learner.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(Error::InvalidRequest("Name and email are required".to_string()));
        }
        if self.find_learner(email)?.is_some() {
            return Err(Error::DuplicateEmail(email.to_string()));
        }

        let mut progress = Document::new();
        let mut grades = Document::new();
        for subject in SUBJECTS {
            progress.insert(subject, 0);
            grades.insert(subject, "N/A");
        }
        let phone = learner.phone.as_deref().map(str::trim).unwrap_or_default();
        self.users.insert_one(doc! {
            "name": name,
            "email": email,
            "phone": phone,
            "progress": progress,
            "grades": grades,
            "time_spent": 0,
            "completed_works": [],
            "last_activity": null,
            "achievements": [],
            "feedback": [],
            "login_count": 0
        })?;

        let parent = parent_email(email);
        self.parents.insert_one(doc! {
            "email": parent.as_str(),
            "child_email": email,
            "child_name": name
        })?;
        info!(self.logger, "signed up {} with parent account {}", email, parent);
        Ok(parent)
    }

    /// Opens a session for a registered learner, counting the login.
    pub fn record_login(&self, email: &str) -> Result<Option<LoginSession>> {
        let learner = match self.find_learner(email)? {
            Some(learner) => learner,
            None => return Ok(None),
        };

        let now = DateTime::now();
        let update = UpdateExpr::new().set("last_activity", now)?.inc("login_count", 1)?;
        self.users.update_one_with(learner_filter(email), &update)?;
        self.award_achievements(email)?;

        Ok(Some(LoginSession {
            email: email.to_string(),
            name: learner.get_str("name").unwrap_or("Student").to_string(),
            started_at: now,
        }))
    }

    /// Closes `session`, adding the whole minutes elapsed since login to the time spent.
    /// Returns the number of minutes added.
    pub fn record_logout(&self, session: &LoginSession) -> Result<i64> {
        self.record_logout_at(session, DateTime::now())
    }

    pub fn record_logout_at(&self, session: &LoginSession, ended_at: DateTime) -> Result<i64> {
        let elapsed = ended_at.timestamp_millis() - session.started_at.timestamp_millis();
        let minutes = (elapsed / MILLIS_PER_MINUTE).max(0);
        self.add_time_spent(&session.email, minutes)?;
        Ok(minutes)
    }

    pub fn add_time_spent(&self, email: &str, minutes: i64) -> Result<()> {
        if minutes < 0 {
            return Err(Error::InvalidRequest(format!("Time spent cannot be negative: {}", minutes)));
        }
        let update = UpdateExpr::new().inc("time_spent", minutes)?;
        self.users.update_one_with(learner_filter(email), &update)?;
        self.award_achievements(email)?;
        Ok(())
    }

    /// Resolves the learner followed by a parent account.
    pub fn parent_login(&self, parent_email: &str) -> Result<Option<ParentLink>> {
        match self.parents.find_one(doc! { "email": parent_email })? {
            Some(parent) => Ok(Some(bson::from_document(parent)?)),
            None => Ok(None),
        }
    }
}
