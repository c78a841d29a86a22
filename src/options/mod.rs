#[allow(clippy::module_inception)]
pub mod options;

pub use options::{LearningOptions, Options, PathConflictPolicy, HISTORY_PLAYLIST};
