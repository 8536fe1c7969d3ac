//! Range resolution memoized per `name@range`.

use std::collections::HashMap;

use crate::error::GenError;
use crate::registry::RegistryEntry;
use crate::rules::is_remote_url;
use crate::version::max_satisfying;

/// Resolves dependency ranges to concrete versions.
///
/// Results are memoized on the `name@range` pair. The crawl, the closure
/// build, and rendering all resolve the same pairs, so after the crawl
/// has warmed the memo the later phases resolve without consulting
/// registry entries at all.
#[derive(Debug, Default)]
pub struct VersionResolver {
    memo: HashMap<String, String>,
}

impl VersionResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete version for `name` constrained by `range`.
    ///
    /// A URL range resolves to itself. Otherwise the highest published
    /// version in `entry` that satisfies the range wins. A missing entry
    /// or a range nothing satisfies is a hard error.
    pub fn resolve(
        &mut self,
        name: &str,
        range: &str,
        entry: Option<&RegistryEntry>,
    ) -> Result<String, GenError> {
        let key = format!("{name}@{range}");
        if let Some(hit) = self.memo.get(&key) {
            return Ok(hit.clone());
        }

        let resolved = if is_remote_url(range) {
            range.to_string()
        } else {
            let entry = entry.ok_or_else(|| GenError::EntryMissing {
                name: name.to_string(),
                range: range.to_string(),
            })?;
            max_satisfying(entry.version_names(), range)?
                .ok_or_else(|| GenError::Unresolvable {
                    name: name.to_string(),
                    range: range.to_string(),
                })?
                .to_string()
        };
        self.memo.insert(key, resolved.clone());
        Ok(resolved)
    }
}
