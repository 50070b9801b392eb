// src/sources/mod.rs
use crate::types::McQueryError;
use crate::utils::normalize_ending;
use async_trait::async_trait;
use log::{info, warn};
use std::collections::HashSet;
use tokio::sync::OnceCell;

mod builtin;
mod iana;

pub use builtin::{BUILTIN_ENDINGS, SUBDOMAIN_POOL};
pub use iana::{IanaSource, IANA_TLD_URL};

/// Somewhere a list of domain endings can be loaded from.
#[async_trait]
pub trait EndingSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<Vec<String>, McQueryError>;
}

/// Ending list ready to feed a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndingPool {
    pub endings: Vec<String>,
    /// Set when the source failed and only the built-in list is available.
    pub fallback_reason: Option<String>,
}

/// Loads the ending pool at most once and hands out the cached copy after.
///
/// Owned by the caller; nothing here is global.
#[derive(Debug, Default)]
pub struct EndingCache {
    pool: OnceCell<EndingPool>,
}

impl EndingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_or_reuse(&self, source: &dyn EndingSource) -> &EndingPool {
        self.pool
            .get_or_init(|| async {
                match source.fetch().await {
                    Ok(remote) => {
                        info!("Loaded {} domain endings from {}", remote.len(), source.name());
                        EndingPool {
                            endings: merge_unique_endings(&remote, BUILTIN_ENDINGS),
                            fallback_reason: None,
                        }
                    }
                    Err(e) => {
                        warn!("Could not load domain endings from {}, using built-in pool: {}", source.name(), e);
                        EndingPool {
                            endings: merge_unique_endings::<&str>(&[], BUILTIN_ENDINGS),
                            fallback_reason: Some(e.to_string()),
                        }
                    }
                }
            })
            .await
    }

    pub fn get(&self) -> Option<&EndingPool> {
        self.pool.get()
    }
}

/// Normalizes both lists and concatenates them without duplicates,
/// `primary` entries first.
pub fn merge_unique_endings<S: AsRef<str>>(primary: &[S], secondary: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut list = Vec::with_capacity(primary.len() + secondary.len());
    let all = primary.iter().map(AsRef::as_ref).chain(secondary.iter().copied());
    for value in all {
        let value = normalize_ending(value);
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.clone()) {
            list.push(value);
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EndingSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch(&self) -> Result<Vec<String>, McQueryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(McQueryError::NetworkError("offline".to_string()))
            } else {
                Ok(vec!["ZZZ".to_string(), "com".to_string()])
            }
        }
    }

    #[tokio::test]
    async fn test_cache_loads_once() {
        let source = CountingSource { calls: AtomicUsize::new(0), fail: false };
        let cache = EndingCache::new();
        assert!(cache.get().is_none());

        let first = cache.load_or_reuse(&source).await.clone();
        let second = cache.load_or_reuse(&source).await;
        assert_eq!(&first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.endings[0], "zzz");
        assert_eq!(first.endings[1], "com");
        assert_eq!(first.endings.iter().filter(|e| *e == "com").count(), 1);
        assert!(first.fallback_reason.is_none());
    }

    #[tokio::test]
    async fn test_cache_falls_back_to_builtin() {
        let source = CountingSource { calls: AtomicUsize::new(0), fail: true };
        let cache = EndingCache::new();
        let pool = cache.load_or_reuse(&source).await;
        assert_eq!(pool.endings.len(), BUILTIN_ENDINGS.len());
        assert!(pool.fallback_reason.as_deref().unwrap().contains("offline"));

        cache.load_or_reuse(&source).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_merge_unique_endings() {
        let merged = merge_unique_endings(&[".NET", "net", "io"], &["com", "io", " "]);
        assert_eq!(merged, vec!["net", "io", "com"]);
    }
}
