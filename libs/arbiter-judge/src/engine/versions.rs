/// Runtime Version Cache
///
/// **Core Responsibility:**
/// Decide which runtime version the remote service should use for each
/// language, asking the service's catalog at most once per language for
/// the life of the cache.
///
/// **Resolution order:**
/// 1. Configured override (`PISTON_<LANG>_VERSION`), no catalog query
/// 2. Highest catalog version whose language or alias matches
/// 3. `"latest"` when the catalog is unreachable or has no match
///
/// Whatever step 2 or 3 yields is cached, including the fallback, so a
/// broken catalog is not queried again on every test case.

use anyhow::Result;
use arbiter_common::types::Language;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub const LATEST: &str = "latest";

/// One entry of the remote runtime catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub language: String,
    pub version: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl RuntimeInfo {
    fn matches(&self, names: &[String]) -> bool {
        let language = self.language.to_lowercase();
        names.iter().any(|name| {
            *name == language || self.aliases.iter().any(|alias| alias.to_lowercase() == *name)
        })
    }
}

/// Source of available runtimes
#[async_trait]
pub trait RuntimeCatalog: Send + Sync {
    async fn runtimes(&self) -> Result<Vec<RuntimeInfo>>;
}

pub struct RuntimeVersionCache {
    catalog: Arc<dyn RuntimeCatalog>,
    overrides: HashMap<Language, String>,
    names: HashMap<Language, Vec<String>>,
    resolved: HashMap<Language, OnceCell<String>>,
}

impl RuntimeVersionCache {
    /// `names` maps each language to the catalog names that count as a
    /// match (see `LanguageConfigManager::remote_aliases`)
    pub fn new(
        catalog: Arc<dyn RuntimeCatalog>,
        overrides: HashMap<Language, String>,
        names: HashMap<Language, Vec<String>>,
    ) -> Self {
        let resolved = Language::ALL
            .iter()
            .map(|language| (*language, OnceCell::new()))
            .collect();
        Self {
            catalog,
            overrides,
            names,
            resolved,
        }
    }

    /// Version to request for `language`
    pub async fn version_for(&self, language: Language) -> String {
        if let Some(version) = self.overrides.get(&language) {
            return version.clone();
        }

        let Some(cell) = self.resolved.get(&language) else {
            return LATEST.to_string();
        };

        cell.get_or_init(|| self.resolve(language)).await.clone()
    }

    /// Cached version without triggering a lookup
    pub fn cached(&self, language: Language) -> Option<String> {
        if let Some(version) = self.overrides.get(&language) {
            return Some(version.clone());
        }
        self.resolved.get(&language)?.get().cloned()
    }

    async fn resolve(&self, language: Language) -> String {
        let names = self
            .names
            .get(&language)
            .cloned()
            .unwrap_or_else(|| vec![language.as_str().to_string()]);

        match self.catalog.runtimes().await {
            Ok(runtimes) => match highest_version(&runtimes, &names) {
                Some(version) => {
                    info!(language = %language, version = %version, "Resolved runtime version");
                    version
                }
                None => {
                    warn!(language = %language, "No matching runtime in catalog, using latest");
                    LATEST.to_string()
                }
            },
            Err(e) => {
                warn!(language = %language, error = %e, "Runtime catalog unavailable, using latest");
                LATEST.to_string()
            }
        }
    }
}

/// Highest version among entries matching `names`, compared segment by
/// segment as numbers so that 10.2.0 outranks 9.4.0
pub fn highest_version(runtimes: &[RuntimeInfo], names: &[String]) -> Option<String> {
    let best = runtimes
        .iter()
        .filter(|runtime| runtime.matches(names))
        .max_by(|a, b| compare_versions(&a.version, &b.version))?;
    debug!(language = %best.language, version = %best.version, "Catalog match");
    Some(best.version.clone())
}

pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-', '+']);
    let mut right = b.split(['.', '-', '+']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Greater,
                    (Err(_), Ok(_)) => Ordering::Less,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    struct FakeCatalog {
        runtimes: Option<Vec<RuntimeInfo>>,
        calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn new(runtimes: Option<Vec<RuntimeInfo>>) -> Arc<Self> {
            Arc::new(Self {
                runtimes,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(AtomicOrdering::SeqCst)
        }
    }

    #[async_trait]
    impl RuntimeCatalog for FakeCatalog {
        async fn runtimes(&self) -> Result<Vec<RuntimeInfo>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            self.runtimes
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    fn runtime(language: &str, version: &str, aliases: &[&str]) -> RuntimeInfo {
        RuntimeInfo {
            language: language.to_string(),
            version: version.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn names() -> HashMap<Language, Vec<String>> {
        HashMap::from([
            (Language::Cpp, vec!["c++".to_string(), "cpp".to_string(), "gcc".to_string()]),
            (Language::Rust, vec!["rust".to_string()]),
        ])
    }

    #[test]
    fn test_numeric_version_order() {
        assert_eq!(compare_versions("10.2.0", "9.4.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.68.2", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("3.10", "3.10.0"), Ordering::Less);
        assert_eq!(compare_versions("15.0.2", "15.0.2"), Ordering::Equal);
    }

    #[test]
    fn test_highest_matching_version() {
        let runtimes = vec![
            runtime("gcc", "9.4.0", &["c", "c++"]),
            runtime("gcc", "10.2.0", &["c", "c++"]),
            runtime("python", "3.12.0", &[]),
        ];
        let names = vec!["c++".to_string(), "cpp".to_string()];
        assert_eq!(highest_version(&runtimes, &names), Some("10.2.0".to_string()));
        assert_eq!(highest_version(&runtimes, &["rust".to_string()]), None);
    }

    #[tokio::test]
    async fn test_catalog_queried_once_per_language() {
        let catalog = FakeCatalog::new(Some(vec![
            runtime("rust", "1.50.0", &["rs"]),
            runtime("rust", "1.68.2", &["rs"]),
        ]));
        let cache = RuntimeVersionCache::new(catalog.clone(), HashMap::new(), names());

        assert_eq!(cache.cached(Language::Rust), None);
        assert_eq!(cache.version_for(Language::Rust).await, "1.68.2");
        assert_eq!(cache.version_for(Language::Rust).await, "1.68.2");
        assert_eq!(catalog.calls(), 1);
        assert_eq!(cache.cached(Language::Rust), Some("1.68.2".to_string()));
    }

    #[tokio::test]
    async fn test_override_skips_catalog() {
        let catalog = FakeCatalog::new(Some(vec![runtime("gcc", "10.2.0", &["c++"])]));
        let overrides = HashMap::from([(Language::Cpp, "9.4.0".to_string())]);
        let cache = RuntimeVersionCache::new(catalog.clone(), overrides, names());

        assert_eq!(cache.version_for(Language::Cpp).await, "9.4.0");
        assert_eq!(catalog.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_catalog_caches_latest() {
        let catalog = FakeCatalog::new(None);
        let cache = RuntimeVersionCache::new(catalog.clone(), HashMap::new(), names());

        assert_eq!(cache.version_for(Language::Cpp).await, LATEST);
        assert_eq!(cache.version_for(Language::Cpp).await, LATEST);
        assert_eq!(catalog.calls(), 1);
        assert_eq!(cache.cached(Language::Cpp), Some(LATEST.to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_query() {
        let catalog = FakeCatalog::new(Some(vec![runtime("java", "15.0.2", &[])]));
        let cache = Arc::new(RuntimeVersionCache::new(
            catalog.clone(),
            HashMap::new(),
            HashMap::new(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.version_for(Language::Java).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "15.0.2");
        }
        assert_eq!(catalog.calls(), 1);
    }
}
