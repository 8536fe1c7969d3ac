//! Identity of resolved modules and the identifiers derived from it.

use std::cmp::Ordering;
use std::fmt;
use url::Url;

/// True when a dependency spec is a direct source URL rather than a range.
#[must_use]
pub fn is_remote_url(spec: &str) -> bool {
    spec.starts_with("http://") || spec.starts_with("https://")
}

/// A resolved module: package name plus concrete version or pinned URL.
///
/// The canonical identity is `name@version`, which is also the order
/// rendered output sorts by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId {
    name: String,
    version: String,
}

impl ModuleId {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concrete version, or the pinned URL for URL-pinned modules.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Canonical `name@version` form.
    #[must_use]
    pub fn code(&self) -> String {
        self.to_string()
    }

    #[must_use]
    pub fn is_url_pinned(&self) -> bool {
        is_remote_url(&self.version)
    }

    /// Normalized identifier usable as a build rule name.
    ///
    /// URL-pinned modules derive from `name_tarball`, everything else from
    /// `name_version`. Runs of characters outside `[A-Za-z0-9_]` collapse
    /// to a single underscore and leading underscores are stripped, so
    /// `@types/node` at `1.0.0` becomes `types_node_1_0_0`.
    #[must_use]
    pub fn rule_name(&self) -> String {
        let raw = if self.is_url_pinned() {
            format!("{}_tarball", self.name)
        } else {
            format!("{}_{}", self.name, self.version)
        };
        normalize_rule_name(&raw)
    }

    fn identity_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.name
            .bytes()
            .chain(std::iter::once(b'@'))
            .chain(self.version.bytes())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl Ord for ModuleId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity_bytes().cmp(other.identity_bytes())
    }
}

impl PartialOrd for ModuleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn normalize_rule_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else if c == '_' {
            // Literal underscores survive except at the very front.
            if !out.is_empty() {
                if pending_sep {
                    out.push('_');
                }
                pending_sep = false;
                out.push(c);
            }
        } else {
            pending_sep = true;
        }
    }
    if pending_sep && !out.is_empty() {
        out.push('_');
    }
    out
}

/// URL-encode a package name for use in a registry path segment.
///
/// Scoped names keep their `@` but encode the `/` so the whole name stays
/// one segment: `@types/node` becomes `@types%2Fnode`.
#[must_use]
pub fn encode_name(name: &str) -> String {
    name.replace('/', "%2F")
}

/// Deterministic registry tarball URL for a resolved name and version.
///
/// The scope prefix is dropped from the archive filename, matching the
/// registry's layout: `@types/node` at `1.0.0` maps to
/// `{registry}@types%2Fnode/-/node-1.0.0.tgz`.
#[must_use]
pub fn tarball_url(registry: &Url, name: &str, version: &str) -> String {
    let bare = name.rsplit('/').next().unwrap_or(name);
    format!("{}{}/-/{}-{}.tgz", registry, encode_name(name), bare, version)
}
