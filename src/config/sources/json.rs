//! JSON rule files.

use std::path::PathBuf;

use super::file_source::FileSource;
use crate::config::model::RuleSet;

#[must_use]
pub fn new(path: PathBuf) -> FileSource {
    FileSource::new(path, "json", |content| {
        serde_json::from_str::<RuleSet>(content).map_err(Into::into)
    })
}
