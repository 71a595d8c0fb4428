//! In-memory rule cache kept fresh by a polling loop.
//!
//! [`RuleCache`] is the eventually consistent [`RuleSource`] the server
//! hands to the dispatcher. [`refresh_loop`] polls a [`RuleLoader`] and
//! swaps in a new snapshot when the backing rules change; a failed reload
//! keeps serving the previous snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::RuleSet;
use super::{RuleLoader, RuleSnapshot, RuleSource, RuleVersion};
use crate::error::DetourError;

#[derive(Debug)]
pub struct LoadedRules {
    pub rules: RuleSnapshot,
    pub version: RuleVersion,
    pub loaded_at: Instant,
}

#[derive(Debug)]
pub struct RuleCache {
    source_name: &'static str,
    current: RwLock<Option<LoadedRules>>,
    reloads: AtomicU64,
}

/// What the health endpoint reports about the cache.
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub source: &'static str,
    pub version: Option<String>,
    pub loaded_ago_seconds: Option<u64>,
    pub total: usize,
    pub available: usize,
    pub reloads: u64,
}

impl RuleCache {
    /// A cache that has not been synced yet; `list` fails until [`Self::store`].
    #[must_use]
    pub fn empty(source_name: &'static str) -> Self {
        Self {
            source_name,
            current: RwLock::new(None),
            reloads: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_rules(source_name: &'static str, rules: RuleSet, version: RuleVersion) -> Self {
        Self {
            source_name,
            current: RwLock::new(Some(LoadedRules {
                rules: Arc::new(rules.rules),
                version,
                loaded_at: Instant::now(),
            })),
            reloads: AtomicU64::new(0),
        }
    }

    pub async fn store(&self, rules: RuleSet, version: RuleVersion) {
        let loaded = LoadedRules {
            rules: Arc::new(rules.rules),
            version,
            loaded_at: Instant::now(),
        };
        let previous = self.current.write().await.replace(loaded);
        if previous.is_some() {
            self.reloads.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub async fn version(&self) -> Option<RuleVersion> {
        self.current.read().await.as_ref().map(|l| l.version.clone())
    }

    pub async fn status(&self) -> CacheStatus {
        let current = self.current.read().await;
        let (version, loaded_ago_seconds, total, available) = match current.as_ref() {
            Some(loaded) => (
                Some(loaded.version.short().to_string()),
                Some(loaded.loaded_at.elapsed().as_secs()),
                loaded.rules.len(),
                loaded.rules.iter().filter(|r| r.is_available()).count(),
            ),
            None => (None, None, 0, 0),
        };
        CacheStatus {
            source: self.source_name,
            version,
            loaded_ago_seconds,
            total,
            available,
            reloads: self.reloads.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl RuleSource for RuleCache {
    async fn list(&self) -> Result<RuleSnapshot, DetourError> {
        // Only the Arc is cloned; the lock is released before returning.
        self.current
            .read()
            .await
            .as_ref()
            .map(|loaded| Arc::clone(&loaded.rules))
            .ok_or_else(|| DetourError::RuleSource {
                source_name: self.source_name,
                message: "rule cache has not been synced".into(),
            })
    }
}

/// Poll `loader` every `interval` and refresh `cache` on change until
/// `shutdown` flips.
pub async fn refresh_loop(
    cache: Arc<RuleCache>,
    loader: Box<dyn RuleLoader>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // first tick is immediate

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                tracing::debug!("rule refresh loop shutting down");
                return;
            }
        }

        let Some(current) = cache.version().await else {
            reload(&cache, &*loader).await;
            continue;
        };

        match loader.has_changed(&current).await {
            Ok(true) => {
                tracing::info!(source = loader.name(), "rule change detected, reloading");
                reload(&cache, &*loader).await;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(source = loader.name(), error = %e, "rule change check failed");
            }
        }
    }
}

async fn reload(cache: &RuleCache, loader: &dyn RuleLoader) {
    match loader.load().await {
        Ok((rules, version)) => {
            super::validation::warn_lint(&rules);
            let total = rules.rules.len();
            let available = rules.available();
            cache.store(rules, version).await;
            tracing::info!(rules = total, available, "rules reloaded");
        }
        Err(e) => {
            tracing::error!(error = %e, "rule reload failed, keeping current rules");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Matcher, RoutingRule, RuleState, Upstream};

    fn rule_set(names: &[&str]) -> RuleSet {
        RuleSet {
            rules: names
                .iter()
                .map(|name| RoutingRule {
                    name: (*name).into(),
                    state: RuleState::Available,
                    matcher: Matcher {
                        method: "*".into(),
                        path: "^/".into(),
                    },
                    upstream: Upstream::url("http://svc:80"),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn unsynced_cache_fails_to_list() {
        let cache = RuleCache::empty("test");
        let err = cache.list().await.unwrap_err();
        assert!(matches!(err, DetourError::RuleSource { .. }));
    }

    #[tokio::test]
    async fn list_returns_rules_in_stored_order() {
        let cache =
            RuleCache::with_rules("test", rule_set(&["b", "a"]), RuleVersion::Hash("v1".into()));
        let snapshot = cache.list().await.unwrap();
        let names: Vec<&str> = snapshot.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[tokio::test]
    async fn store_swaps_snapshot_without_touching_old_one() {
        let cache = RuleCache::with_rules("test", rule_set(&["a"]), RuleVersion::Hash("v1".into()));
        let before = cache.list().await.unwrap();

        cache
            .store(rule_set(&["x", "y"]), RuleVersion::Hash("v2".into()))
            .await;

        assert_eq!(before.len(), 1);
        assert_eq!(cache.list().await.unwrap().len(), 2);
        let status = cache.status().await;
        assert_eq!(status.reloads, 1);
        assert_eq!(status.version.as_deref(), Some("v2"));
    }

    struct ChangingLoader;

    #[async_trait]
    impl RuleLoader for ChangingLoader {
        fn name(&self) -> &'static str {
            "changing"
        }

        async fn load(&self) -> Result<(RuleSet, RuleVersion), DetourError> {
            Ok((rule_set(&["new"]), RuleVersion::Hash("v2".into())))
        }

        async fn has_changed(&self, current: &RuleVersion) -> Result<bool, DetourError> {
            Ok(*current != RuleVersion::Hash("v2".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_loop_picks_up_changes_and_stops_on_shutdown() {
        let cache = Arc::new(RuleCache::with_rules(
            "changing",
            rule_set(&["old"]),
            RuleVersion::Hash("v1".into()),
        ));
        let (tx, rx) = tokio::sync::watch::channel(false);
        let handle = tokio::spawn(refresh_loop(
            Arc::clone(&cache),
            Box::new(ChangingLoader),
            Duration::from_secs(5),
            rx,
        ));

        tokio::time::sleep(Duration::from_secs(6)).await;
        let snapshot = cache.list().await.unwrap();
        assert_eq!(snapshot[0].name, "new");

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
