use std::collections::BTreeMap;

use serde_yaml::Value as YamlValue;

use crate::direct;
pub use crate::direct::{
    ApiVersion, Cluster, ClusterSpec, Context, ContextSpec, Kind, User, UserSpec,
};
use crate::error::ConfigError;

/// A kubeconfig with clusters, contexts and users keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KubeConfig {
    pub contexts: BTreeMap<String, ContextSpec>,
    pub current_context: String,
    pub clusters: BTreeMap<String, ClusterSpec>,
    pub preferences: BTreeMap<String, YamlValue>,
    pub users: BTreeMap<String, UserSpec>,
}

impl KubeConfig {
    /// The context named by `current-context`.
    pub fn current_context_spec(&self) -> Result<&ContextSpec, ConfigError> {
        if self.current_context.is_empty() {
            return Err(ConfigError::NoCurrentContext);
        }
        self.contexts
            .get(&self.current_context)
            .ok_or_else(|| ConfigError::UnknownContext(self.current_context.clone()))
    }

    /// The cluster the current context points at.
    pub fn current_cluster(&self) -> Result<&ClusterSpec, ConfigError> {
        let context = self.current_context_spec()?;
        self.clusters
            .get(&context.cluster)
            .ok_or_else(|| ConfigError::UnknownCluster(context.cluster.clone()))
    }
}

impl From<direct::KubeConfig> for KubeConfig {
    fn from(kc: direct::KubeConfig) -> Self {
        Self {
            current_context: kc.current_context,
            preferences: kc.preferences,
            contexts: kc
                .contexts
                .into_iter()
                .map(|ctx| (ctx.name, ctx.context))
                .collect(),
            clusters: kc
                .clusters
                .into_iter()
                .map(|cls| (cls.name, cls.cluster))
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|usr| (usr.name, usr.user))
                .collect(),
        }
    }
}

impl From<KubeConfig> for direct::KubeConfig {
    fn from(kc: KubeConfig) -> Self {
        direct::KubeConfig {
            kind: Kind::Config,
            api_version: ApiVersion::V1,
            preferences: kc.preferences,
            current_context: kc.current_context,

            clusters: kc
                .clusters
                .into_iter()
                .map(|(name, cluster)| Cluster { name, cluster })
                .collect(),
            contexts: kc
                .contexts
                .into_iter()
                .map(|(name, context)| Context { name, context })
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|(name, user)| User { name, user })
                .collect(),
        }
    }
}
