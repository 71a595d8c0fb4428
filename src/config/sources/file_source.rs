//! File-backed rule loader with SHA-256 change detection.
//!
//! [`FileSource`] works for any format: the deserializer is supplied at
//! construction time. Reads go through Tokio so the refresh loop never
//! blocks a runtime worker.

use std::path::PathBuf;

use async_trait::async_trait;

use super::sha256_hex;
use crate::config::model::RuleSet;
use crate::config::validation::validate;
use crate::config::{RuleLoader, RuleVersion};
use crate::error::DetourError;

pub type Deserialize = fn(&str) -> Result<RuleSet, Box<dyn std::error::Error + Send + Sync>>;

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    deserialize: Deserialize,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf, name: &'static str, deserialize: Deserialize) -> Self {
        Self {
            path,
            name,
            deserialize,
        }
    }

    async fn read_content(&self) -> Result<String, DetourError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DetourError::RuleFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                DetourError::Io(e)
            }
        })
    }
}

#[async_trait]
impl RuleLoader for FileSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<(RuleSet, RuleVersion), DetourError> {
        let content = self.read_content().await?;

        let rules = (self.deserialize)(&content).map_err(|e| DetourError::RuleParse {
            path: self.path.display().to_string(),
            source: e,
        })?;

        validate(&rules).map_err(|errors| DetourError::RuleValidation { errors })?;

        Ok((rules, RuleVersion::Hash(sha256_hex(content.as_bytes()))))
    }

    async fn has_changed(&self, current: &RuleVersion) -> Result<bool, DetourError> {
        let content = self.read_content().await?;
        Ok(*current != RuleVersion::Hash(sha256_hex(content.as_bytes())))
    }
}
