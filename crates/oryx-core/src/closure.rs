//! Transitive closures over the resolved external graph.
//!
//! Runs strictly after the crawl: every lookup is answered by the frozen
//! snapshot and the resolver memo, so closure construction is pure
//! computation with no network access.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;
use url::Url;

use crate::cache::RegistrySnapshot;
use crate::error::GenError;
use crate::resolve::VersionResolver;
use crate::rules::{tarball_url, ModuleId};

/// Computes, per resolved module, the set of modules reachable through
/// runtime dependency edges, and collects the download URL of every
/// module visited along the way.
///
/// Cycles are handled with a two-phase memo: a module's (initially
/// empty) result set is installed before its dependencies are walked, so
/// a cyclic edge observes the shared set instead of recursing forever.
/// A set handed out mid-cycle fills in once the outermost call for that
/// cycle returns, which is why closures are only read back after every
/// top-level call has completed.
pub struct ClosureBuilder<'a> {
    snapshot: &'a RegistrySnapshot,
    local_names: &'a BTreeSet<String>,
    registry: Url,
    memo: HashMap<ModuleId, Rc<RefCell<BTreeSet<ModuleId>>>>,
    urls: BTreeMap<String, String>,
}

impl<'a> ClosureBuilder<'a> {
    #[must_use]
    pub fn new(
        snapshot: &'a RegistrySnapshot,
        local_names: &'a BTreeSet<String>,
        registry: Url,
    ) -> Self {
        Self {
            snapshot,
            local_names,
            registry,
            memo: HashMap::new(),
            urls: BTreeMap::new(),
        }
    }

    /// Closure of `id`, shared with the memo table.
    pub fn closure(
        &mut self,
        resolver: &mut VersionResolver,
        id: &ModuleId,
    ) -> Result<Rc<RefCell<BTreeSet<ModuleId>>>, GenError> {
        if let Some(hit) = self.memo.get(id) {
            return Ok(Rc::clone(hit));
        }

        self.register_url(id);
        let set = Rc::new(RefCell::new(BTreeSet::new()));
        self.memo.insert(id.clone(), Rc::clone(&set));

        // Pinned tarballs carry no metadata to walk.
        if id.is_url_pinned() {
            return Ok(set);
        }

        let deps: Vec<(String, String)> = self
            .snapshot
            .get(id.name())
            .and_then(|entry| entry.versions.get(id.version()))
            .map(|info| {
                info.dependencies
                    .iter()
                    .map(|(name, range)| (name.clone(), range.clone()))
                    .collect()
            })
            .unwrap_or_default();

        for (dep_name, dep_range) in deps {
            if self.local_names.contains(&dep_name) {
                continue;
            }
            let dep_entry = self.snapshot.get(&dep_name);
            let version = resolver
                .resolve(&dep_name, &dep_range, dep_entry)
                .map_err(|err| err.while_resolving_dep_of(id.code()))?;
            let dep_id = ModuleId::new(dep_name, version);
            // The direct edge goes in before recursing, so a back edge
            // into this set already finds it there.
            set.borrow_mut().insert(dep_id.clone());
            let dep_closure = self.closure(resolver, &dep_id)?;

            // Copy out before mutating: on a tight cycle `dep_closure`
            // and `set` are the same cell.
            let members: Vec<ModuleId> = dep_closure.borrow().iter().cloned().collect();
            set.borrow_mut().extend(members);
        }

        Ok(set)
    }

    fn register_url(&mut self, id: &ModuleId) {
        let url = if id.is_url_pinned() {
            id.version().to_string()
        } else {
            tarball_url(&self.registry, id.name(), id.version())
        };
        self.urls.insert(id.rule_name(), url);
    }

    /// Download URLs of every module visited, keyed by rule name.
    #[must_use]
    pub fn into_workspace_urls(self) -> BTreeMap<String, String> {
        self.urls
    }
}
