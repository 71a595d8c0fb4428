//! TOML rule files (`[[rules]]` tables).

use std::path::PathBuf;

use super::file_source::FileSource;
use crate::config::model::RuleSet;

#[must_use]
pub fn new(path: PathBuf) -> FileSource {
    FileSource::new(path, "toml", |content| {
        toml::from_str::<RuleSet>(content).map_err(Into::into)
    })
}
