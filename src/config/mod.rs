//! Rule loading, validation, and the live rule snapshot.
//!
//! Two traits meet here. [`RuleLoader`] is the pluggable backend that reads
//! a complete [`RuleSet`](model::RuleSet) and reports when it changed.
//! [`RuleSource`] is the read-only view the dispatcher asks for a snapshot
//! on every request; [`RuleCache`](cache::RuleCache) implements it on top of
//! whatever a loader last produced.

pub mod cache;
pub mod model;
pub mod sources;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DetourError;
use model::{RoutingRule, RuleSet};

/// An ordered view of the rules as observed at one instant.
pub type RuleSnapshot = Arc<Vec<RoutingRule>>;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RuleVersion {
    Hash(String),
}

impl RuleVersion {
    /// First eight characters, for display.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}

// async_trait keeps these object safe: both are used as trait objects.
#[async_trait]
pub trait RuleLoader: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(RuleSet, RuleVersion), DetourError>;
    async fn has_changed(&self, current: &RuleVersion) -> Result<bool, DetourError>;
}

/// Supplies the current rule snapshot. Called once per dispatched request.
#[async_trait]
pub trait RuleSource: Send + Sync {
    async fn list(&self) -> Result<RuleSnapshot, DetourError>;
}
