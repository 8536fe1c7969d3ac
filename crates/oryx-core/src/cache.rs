//! In-memory registry cache with single-flight fetches and a disk snapshot.
//!
//! The cache answers every registry read during a run. A name is fetched
//! over HTTP at most once: concurrent requests for the same name coalesce
//! on an in-flight marker, later requests hit the stored entry. Entries
//! loaded from the snapshot file count as already fetched, and the
//! registry host is only resolved on the first miss, so a warm snapshot
//! makes a run fully offline.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, OnceCell};
use url::Url;

use oryx_util::fs::{atomic_write, read_to_string_opt};

use crate::error::GenError;
use crate::registry::{registry_base_url, RegistryClient, RegistryEntry};

#[derive(Debug)]
struct CacheState {
    entries: BTreeMap<String, Arc<RegistryEntry>>,
    in_flight: HashMap<String, watch::Receiver<bool>>,
    dirty: bool,
    fetch_count: usize,
}

/// What the gate decided for one `fetch` call.
enum Gate {
    Hit(Arc<RegistryEntry>),
    Wait(watch::Receiver<bool>),
    Fetch(watch::Sender<bool>),
}

/// Shared handle to the registry cache. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct RegistryCache {
    registry: Url,
    client: Arc<OnceCell<RegistryClient>>,
    snapshot_path: PathBuf,
    state: Arc<Mutex<CacheState>>,
}

impl RegistryCache {
    /// Build the cache, seeding entries from the snapshot file when it
    /// exists. A missing file means an empty cache; an unreadable or
    /// unparseable file is fatal. The registry URL is validated here,
    /// but its host stays unresolved until the first miss.
    pub fn load(registry_url: &str, snapshot_path: &Path) -> Result<Self, GenError> {
        let registry = registry_base_url(registry_url)?;
        let entries = match read_to_string_opt(snapshot_path) {
            Ok(Some(raw)) => {
                let parsed: BTreeMap<String, RegistryEntry> =
                    serde_json::from_str(&raw).map_err(|err| GenError::SnapshotParse {
                        path: snapshot_path.to_path_buf(),
                        source: err,
                    })?;
                parsed
                    .into_iter()
                    .map(|(name, entry)| (name, Arc::new(entry)))
                    .collect()
            }
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                return Err(GenError::SnapshotRead {
                    path: snapshot_path.to_path_buf(),
                    source: err,
                })
            }
        };

        Ok(Self {
            registry,
            client: Arc::new(OnceCell::new()),
            snapshot_path: snapshot_path.to_path_buf(),
            state: Arc::new(Mutex::new(CacheState {
                entries,
                in_flight: HashMap::new(),
                dirty: false,
                fetch_count: 0,
            })),
        })
    }

    /// Entry for `name`, fetching it from the registry on a miss.
    ///
    /// When another task is already fetching the same name this call waits
    /// for that fetch instead of issuing its own. A waiter that wakes to
    /// find neither an entry nor an in-flight marker takes over the fetch.
    pub async fn fetch(&self, name: &str) -> Result<Arc<RegistryEntry>, GenError> {
        loop {
            let gate = {
                let mut state = self.state.lock().await;
                if let Some(entry) = state.entries.get(name) {
                    Gate::Hit(Arc::clone(entry))
                } else if let Some(rx) = state.in_flight.get(name) {
                    Gate::Wait(rx.clone())
                } else {
                    let (tx, rx) = watch::channel(false);
                    state.in_flight.insert(name.to_string(), rx);
                    Gate::Fetch(tx)
                }
            };

            match gate {
                Gate::Hit(entry) => return Ok(entry),
                Gate::Wait(mut rx) => {
                    while !*rx.borrow_and_update() {
                        if rx.changed().await.is_err() {
                            // Fetcher dropped the channel without storing
                            // an entry. Retake the gate.
                            break;
                        }
                    }
                }
                Gate::Fetch(tx) => {
                    // The first miss of the run connects; every later
                    // fetch reuses the same client.
                    let connect = self
                        .client
                        .get_or_try_init(|| RegistryClient::connect(self.registry.as_str()));
                    let result = match connect.await {
                        Ok(client) => client.fetch_entry(name).await,
                        Err(err) => Err(err),
                    };
                    let mut state = self.state.lock().await;
                    state.in_flight.remove(name);
                    let entry = Arc::new(result?);
                    state
                        .entries
                        .insert(name.to_string(), Arc::clone(&entry));
                    state.dirty = true;
                    state.fetch_count += 1;
                    drop(state);
                    let _ = tx.send(true);
                    return Ok(entry);
                }
            }
        }
    }

    /// Entry for `name` if it is already cached. Never fetches.
    pub async fn entry(&self, name: &str) -> Option<Arc<RegistryEntry>> {
        self.state.lock().await.entries.get(name).map(Arc::clone)
    }

    /// Base URL of the registry this cache fetches from.
    #[must_use]
    pub fn registry_url(&self) -> &Url {
        &self.registry
    }

    /// Number of fetches that went out over HTTP and succeeded.
    pub async fn fetch_count(&self) -> usize {
        self.state.lock().await.fetch_count
    }

    /// Immutable view of everything cached, for the resolution phases
    /// that run after the crawl.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.lock().await;
        RegistrySnapshot {
            entries: state.entries.clone(),
        }
    }

    /// Persist the cache to the snapshot file if anything was fetched
    /// this run. Returns whether a write happened.
    pub async fn save_if_dirty(&self) -> Result<bool, GenError> {
        let mut state = self.state.lock().await;
        if !state.dirty {
            return Ok(false);
        }
        let view: BTreeMap<&String, &RegistryEntry> = state
            .entries
            .iter()
            .map(|(name, entry)| (name, entry.as_ref()))
            .collect();
        let mut json = serde_json::to_string_pretty(&view)
            .map_err(|err| GenError::other(format!("serialize registry snapshot: {err}")))?;
        json.push('\n');
        atomic_write(&self.snapshot_path, json.as_bytes()).map_err(|err| GenError::Write {
            path: self.snapshot_path.clone(),
            source: err,
        })?;
        state.dirty = false;
        Ok(true)
    }

    #[cfg(test)]
    pub(crate) async fn insert_for_tests(&self, name: &str, entry: RegistryEntry) {
        let mut state = self.state.lock().await;
        state.entries.insert(name.to_string(), Arc::new(entry));
    }
}

/// Frozen view of the cache taken once the crawl reaches quiescence.
/// The resolution and rendering phases read from this and never fetch.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    entries: BTreeMap<String, Arc<RegistryEntry>>,
}

impl RegistrySnapshot {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name).map(Arc::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_entries(entries: impl IntoIterator<Item = (String, RegistryEntry)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, entry)| (name, Arc::new(entry)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::VersionInfo;

    // Nothing in these tests reaches the network.
    const OFFLINE_REGISTRY: &str = "http://127.0.0.1:9/";

    fn entry_with_versions(versions: &[&str]) -> RegistryEntry {
        let mut entry = RegistryEntry::default();
        for v in versions {
            entry
                .versions
                .insert((*v).to_string(), VersionInfo::default());
        }
        entry
    }

    #[tokio::test]
    async fn test_missing_snapshot_loads_empty_and_stays_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("npm-registry.json");
        let cache = RegistryCache::load(OFFLINE_REGISTRY, &path).unwrap();
        assert!(cache.snapshot().await.is_empty());
        assert!(!cache.save_if_dirty().await.unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_snapshot_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("npm-registry.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = RegistryCache::load(OFFLINE_REGISTRY, &path).unwrap_err();
        assert!(matches!(err, GenError::SnapshotParse { .. }));
    }

    #[test]
    fn test_bad_registry_url_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("npm-registry.json");
        let err = RegistryCache::load("not a url", &path).unwrap_err();
        assert!(matches!(err, GenError::RegistryUrl { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_file_seeds_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("npm-registry.json");
        std::fs::write(
            &path,
            r#"{ "react": { "versions": { "16.0.0": {} } } }"#,
        )
        .unwrap();
        let cache = RegistryCache::load(OFFLINE_REGISTRY, &path).unwrap();
        let entry = cache.entry("react").await.unwrap();
        assert!(entry.versions.contains_key("16.0.0"));
        // Seeded entries satisfy fetch without touching the registry.
        let fetched = cache.fetch("react").await.unwrap();
        assert!(fetched.versions.contains_key("16.0.0"));
        assert_eq!(cache.fetch_count().await, 0);
    }

    #[tokio::test]
    async fn test_seeded_fetch_never_resolves_the_host() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("npm-registry.json");
        std::fs::write(
            &path,
            r#"{ "react": { "versions": { "16.0.0": {} } } }"#,
        )
        .unwrap();
        // The .invalid TLD cannot resolve, so reaching DNS would fail
        // this fetch.
        let cache = RegistryCache::load("http://registry.invalid/", &path).unwrap();
        let fetched = cache.fetch("react").await.unwrap();
        assert!(fetched.versions.contains_key("16.0.0"));
        assert_eq!(cache.fetch_count().await, 0);
    }

    #[tokio::test]
    async fn test_entry_never_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("npm-registry.json");
        let cache = RegistryCache::load(OFFLINE_REGISTRY, &path).unwrap();
        assert!(cache.entry("left-pad").await.is_none());
        assert_eq!(cache.fetch_count().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_view_is_frozen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("npm-registry.json");
        let cache = RegistryCache::load(OFFLINE_REGISTRY, &path).unwrap();
        cache
            .insert_for_tests("a", entry_with_versions(&["1.0.0"]))
            .await;
        let snapshot = cache.snapshot().await;
        cache
            .insert_for_tests("b", entry_with_versions(&["2.0.0"]))
            .await;
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("a").is_some());
        assert!(snapshot.get("b").is_none());
    }
}
