//! Typed view of the npm registry HTTP surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::time::Duration;
use url::Url;

use crate::error::GenError;
use crate::rules::encode_name;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One published version inside a registry entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Runtime dependencies, `name -> range`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
}

/// The slice of a registry packument the generator cares about: published
/// versions and each version's runtime dependencies. Everything else in
/// the packument is dropped on parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(default)]
    pub versions: BTreeMap<String, VersionInfo>,
}

impl RegistryEntry {
    /// Published version strings in registry order.
    pub fn version_names(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }
}

/// Parse and validate a registry URL without resolving its host. The
/// base URL is normalized to end with a slash so package names
/// concatenate as a path segment.
pub fn registry_base_url(registry_url: &str) -> Result<Url, GenError> {
    let bad_url = |reason: String| GenError::RegistryUrl {
        url: registry_url.to_string(),
        reason,
    };

    let mut base_url = Url::parse(registry_url).map_err(|err| bad_url(err.to_string()))?;
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }
    if base_url.host_str().is_none() {
        return Err(bad_url("missing host".to_string()));
    }
    if base_url.port_or_known_default().is_none() {
        return Err(bad_url("no known port for scheme".to_string()));
    }
    Ok(base_url)
}

/// HTTP client pinned to one registry.
///
/// The registry host is resolved once at construction and the address
/// reused for every request, so a run sees one consistent registry even
/// if DNS rotates mid-crawl.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: reqwest::Client,
}

impl RegistryClient {
    /// Validate the registry URL, resolve its host once, and build the
    /// client.
    pub async fn connect(registry_url: &str) -> Result<Self, GenError> {
        let bad_url = |reason: String| GenError::RegistryUrl {
            url: registry_url.to_string(),
            reason,
        };

        let base_url = registry_base_url(registry_url)?;
        let host = base_url
            .host_str()
            .ok_or_else(|| bad_url("missing host".to_string()))?
            .to_string();
        let port = base_url
            .port_or_known_default()
            .ok_or_else(|| bad_url("no known port for scheme".to_string()))?;

        let addr = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|err| GenError::Dns {
                host: host.clone(),
                source: err,
            })?
            .next()
            .ok_or_else(|| GenError::Dns {
                host: host.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "host has no addresses"),
            })?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("oryx/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .resolve(&host, addr)
            .build()
            .map_err(|err| bad_url(err.to_string()))?;

        Ok(Self { base_url, http })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the registry entry for `name`. A 404 is reported as the
    /// package not existing; any other non-success status is fatal.
    pub async fn fetch_entry(&self, name: &str) -> Result<RegistryEntry, GenError> {
        let url = format!("{}{}", self.base_url, encode_name(name));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| GenError::RegistryRequest {
                name: name.to_string(),
                source: err,
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GenError::PackageNotFound {
                name: name.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(GenError::RegistryStatus {
                name: name.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<RegistryEntry>()
            .await
            .map_err(|err| GenError::RegistryParse {
                name: name.to_string(),
                source: err,
            })
    }
}
