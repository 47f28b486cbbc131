//! Locating and loading the operator's kubeconfig.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::clean::KubeConfig;
use crate::direct;
use crate::error::ConfigError;

/// Environment variable that overrides the kubeconfig location.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Namespace used when neither the flag nor the current context names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Where the connection config comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `$KUBECONFIG`, taken verbatim.
    Env(PathBuf),
    /// `~/.kube/config`.
    Home(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Env(path) | ConfigSource::Home(path) => path,
        }
    }
}

/// `~/.kube`
pub fn kube_dir() -> Result<PathBuf, ConfigError> {
    home::home_dir()
        .map(|home| home.join(".kube"))
        .ok_or(ConfigError::HomeDirectory)
}

pub fn resolve_source() -> Result<ConfigSource, ConfigError> {
    source_from(env::var_os(KUBECONFIG_ENV), kube_dir)
}

fn source_from(
    env_value: Option<OsString>,
    kube_dir: impl FnOnce() -> Result<PathBuf, ConfigError>,
) -> Result<ConfigSource, ConfigError> {
    match env_value {
        Some(value) if !value.is_empty() => Ok(ConfigSource::Env(PathBuf::from(value))),
        _ => Ok(ConfigSource::Home(kube_dir()?.join("config"))),
    }
}

/// The API server the derived kubeconfigs point at, and the operator's own
/// CA for it. The CA is informational; each credential carries its Secret's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterEndpoint {
    pub host: String,
    pub ca_data: Vec<u8>,
}

/// The loaded connection config. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub source: ConfigSource,
    pub document: KubeConfig,
    pub endpoint: ClusterEndpoint,
}

impl ConnectionConfig {
    pub fn load(source: ConfigSource) -> Result<Self, ConfigError> {
        let document: KubeConfig = direct::KubeConfig::read_from(source.path())?.into();
        let base_dir = source
            .path()
            .parent()
            .map(Path::to_owned)
            .unwrap_or_default();
        let endpoint = endpoint_of(&document, &base_dir)?;
        debug!(path = %source.path().display(), host = %endpoint.host, "loaded connection config");

        Ok(Self {
            source,
            document,
            endpoint,
        })
    }

    /// The explicit namespace if given, else the current context's, else `default`.
    pub fn namespace_or_default(&self, explicit: Option<&str>) -> String {
        let context_namespace = self
            .document
            .current_context_spec()
            .ok()
            .and_then(|ctx| ctx.namespace.as_deref());

        [explicit, context_namespace]
            .into_iter()
            .flatten()
            .find(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_owned()
    }
}

fn endpoint_of(document: &KubeConfig, base_dir: &Path) -> Result<ClusterEndpoint, ConfigError> {
    let mut cluster = document.current_cluster()?.clone();
    let ca_data = match cluster.inline(base_dir).and_then(|()| cluster.ca_data()) {
        Ok(ca_data) => ca_data,
        Err(err) => {
            warn!(server = %cluster.server, error = %err, "ignoring unusable certificate authority");
            Vec::new()
        }
    };

    Ok(ClusterEndpoint {
        ca_data,
        host: cluster.server,
    })
}
