pub mod updates;

pub use updates::{apply_update, apply_update_atomically};
