//! YAML rule files, the default format.

use std::path::PathBuf;

use super::file_source::FileSource;
use crate::config::model::RuleSet;

#[must_use]
pub fn new(path: PathBuf) -> FileSource {
    FileSource::new(path, "yaml", |content| {
        serde_yml::from_str::<RuleSet>(content).map_err(Into::into)
    })
}
