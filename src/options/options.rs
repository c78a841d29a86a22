/// What to do when an update path walks through a field that holds a non-document value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathConflictPolicy {
    /// Fail the update with a type mismatch.
    #[default]
    Reject,
    /// Overwrite the value with an empty document and continue.
    Replace,
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// How updates treat non-document values found on a dotted path.
    path_conflict_policy: Option<PathConflictPolicy>,

    /// Number of bytes written before the wal will issue a fsync. Zero syncs every record.
    wal_bytes_per_sync: Option<usize>,
}

impl Options {
    pub fn with_path_conflict_policy(mut self, policy: PathConflictPolicy) -> Self {
        self.path_conflict_policy = Some(policy);
        self
    }

    pub fn with_wal_bytes_per_sync(mut self, bytes: usize) -> Self {
        self.wal_bytes_per_sync = Some(bytes);
        self
    }

    pub fn path_conflict_policy(&self) -> PathConflictPolicy {
        self.path_conflict_policy.unwrap_or_default()
    }

    pub fn wal_bytes_per_sync(&self) -> usize {
        self.wal_bytes_per_sync.unwrap_or(0)
    }
}

/// The ordered ids of the history video series.
pub const HISTORY_PLAYLIST: [&str; 9] = [
    "o4IsZBynx88",
    "DxaUKNG-Tks",
    "hvSl9EJ0m_8",
    "qzWxZGx3F8A",
    "1wH3OCFhPNE",
    "WcTtlB_3V08",
    "hEp-vWeF904",
    "c9H5ka7sesQ",
    "MKqtCib-QNg",
];

#[derive(Debug, Clone, Default)]
pub struct LearningOptions {
    /// Progress added for an activity when the caller does not give an amount.
    default_progress_step: Option<i64>,

    /// Upper bound of a subject progress.
    progress_cap: Option<i64>,

    /// Minimum quiz score unlocking the next video.
    pass_score: Option<i64>,

    history_playlist: Option<Vec<String>>,
}

impl LearningOptions {
    pub fn with_default_progress_step(mut self, step: i64) -> Self {
        self.default_progress_step = Some(step);
        self
    }

    pub fn with_progress_cap(mut self, cap: i64) -> Self {
        self.progress_cap = Some(cap);
        self
    }

    pub fn with_pass_score(mut self, score: i64) -> Self {
        self.pass_score = Some(score);
        self
    }

    pub fn with_history_playlist(mut self, playlist: Vec<String>) -> Self {
        self.history_playlist = Some(playlist);
        self
    }

    pub fn default_progress_step(&self) -> i64 {
        self.default_progress_step.unwrap_or(5)
    }

    pub fn progress_cap(&self) -> i64 {
        self.progress_cap.unwrap_or(100)
    }

    pub fn pass_score(&self) -> i64 {
        self.pass_score.unwrap_or(60)
    }

    pub fn history_playlist(&self) -> Vec<String> {
        match &self.history_playlist {
            Some(playlist) => playlist.clone(),
            None => HISTORY_PLAYLIST.iter().map(|id| id.to_string()).collect(),
        }
    }
}
