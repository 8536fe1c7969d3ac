//! Breadth-first crawl of the external dependency graph.
//!
//! The crawl proceeds in waves. Each wave fetches the registry entries
//! for every pending name concurrently, bounded by the connection cap,
//! then expands the wave sequentially: resolve each pending range,
//! record the resolved module, and queue the runtime dependencies of
//! newly seen modules for the next wave. The crawl is at quiescence when
//! a wave queues nothing.

use std::collections::{BTreeSet, VecDeque};

use futures::stream::{self, StreamExt};

use crate::cache::RegistryCache;
use crate::error::GenError;
use crate::resolve::VersionResolver;
use crate::rules::{is_remote_url, ModuleId};

/// What a finished crawl saw.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Every external module the graph reaches, resolved.
    pub modules: BTreeSet<ModuleId>,

    /// Number of fetch-and-expand rounds until quiescence.
    pub waves: usize,
}

/// Crawl the external graph from `seeds` until no new modules appear.
///
/// `local_names` shadow the registry: a dependency carrying a local name
/// is satisfied inside the repository and is never fetched or recorded.
/// URL-pinned dependencies resolve to their URL and are leaves. Any
/// fetch or resolution failure aborts the crawl.
pub async fn crawl(
    cache: &RegistryCache,
    resolver: &mut VersionResolver,
    local_names: &BTreeSet<String>,
    seeds: impl IntoIterator<Item = (String, String)>,
    concurrency: usize,
) -> Result<CrawlOutcome, GenError> {
    let mut pending: VecDeque<(String, String)> = seeds.into_iter().collect();
    let mut modules = BTreeSet::new();
    let mut waves = 0;

    while !pending.is_empty() {
        waves += 1;
        let wave: Vec<(String, String)> = pending.drain(..).collect();

        // Fetch phase. One fetch per distinct name; the cache turns
        // names fetched in earlier waves into hits.
        let names: BTreeSet<&str> = wave
            .iter()
            .filter(|(_, range)| !is_remote_url(range))
            .map(|(name, _)| name.as_str())
            .collect();
        let results: Vec<Result<(), GenError>> = stream::iter(names)
            .map(|name| {
                let cache = cache.clone();
                async move { cache.fetch(name).await.map(|_| ()) }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;
        for result in results {
            result?;
        }

        // Expansion phase, sequential so resolution order is stable.
        for (name, range) in wave {
            let next = expand(cache, resolver, local_names, &mut modules, &name, &range).await?;
            pending.extend(next);
        }
    }

    Ok(CrawlOutcome { modules, waves })
}

/// Resolve one pending spec and return the dependencies to queue. A
/// module seen before expands to nothing, which is what terminates
/// cyclic graphs.
async fn expand(
    cache: &RegistryCache,
    resolver: &mut VersionResolver,
    local_names: &BTreeSet<String>,
    modules: &mut BTreeSet<ModuleId>,
    name: &str,
    range: &str,
) -> Result<Vec<(String, String)>, GenError> {
    if is_remote_url(range) {
        let version = resolver.resolve(name, range, None)?;
        modules.insert(ModuleId::new(name, version));
        return Ok(Vec::new());
    }

    let entry = cache
        .entry(name)
        .await
        .ok_or_else(|| GenError::EntryMissing {
            name: name.to_string(),
            range: range.to_string(),
        })?;
    let version = resolver.resolve(name, range, Some(&entry))?;
    if !modules.insert(ModuleId::new(name, version.clone())) {
        return Ok(Vec::new());
    }

    let mut next = Vec::new();
    if let Some(info) = entry.versions.get(&version) {
        for (dep_name, dep_range) in &info.dependencies {
            if local_names.contains(dep_name) {
                continue;
            }
            next.push((dep_name.clone(), dep_range.clone()));
        }
    }
    Ok(next)
}
