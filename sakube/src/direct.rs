//! The kubeconfig document exactly as it is laid out on disk: named lists of
//! clusters, contexts and users.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::*;
use serde_yaml::Value as YamlValue;

use crate::error::ConfigError;

// region: Context
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContextSpec {
    pub cluster: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
}
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Context {
    pub name: String,
    pub context: ContextSpec,
}
// endregion

// region: Cluster
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure_skip_tls_verify: Option<YamlValue>,
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
}

impl ClusterSpec {
    /// Replaces a `certificate-authority` file reference with the file's
    /// contents, base64-encoded, as `certificate-authority-data`. Relative
    /// paths are taken relative to `base_dir`.
    pub fn inline(&mut self, base_dir: &Path) -> Result<(), ConfigError> {
        if self.certificate_authority_data.is_some() {
            return Ok(());
        }

        let Some(path) = self.certificate_authority.take() else {
            return Ok(());
        };
        let path = base_dir.join(path);
        let contents = fs::read(&path).map_err(|source| ConfigError::ReadCertificate {
            path: path.clone(),
            source,
        })?;
        self.certificate_authority_data = Some(STANDARD.encode(contents));

        Ok(())
    }

    /// Decoded CA bytes, or empty when the cluster carries none.
    pub fn ca_data(&self) -> Result<Vec<u8>, ConfigError> {
        match &self.certificate_authority_data {
            Some(data) => STANDARD
                .decode(data.trim())
                .map_err(|source| ConfigError::DecodeCertificate {
                    server: self.server.clone(),
                    source,
                }),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Cluster {
    pub name: String,
    pub cluster: ClusterSpec,
}

// endregion

// region: User
// Anything that is not a plain token (exec plugins, auth providers) reads as
// an empty `Cert`; we only ever write `Token`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", untagged)]
pub enum UserSpec {
    Token {
        token: String,
    },
    #[serde(rename_all = "kebab-case")]
    Cert {
        #[serde(skip_serializing_if = "Option::is_none")]
        client_certificate: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_certificate_data: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_key: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_key_data: Option<String>,
    },
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct User {
    pub name: String,
    pub user: UserSpec,
}
// endregion

// region: Common
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "v1")]
    V1,
}
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    #[default]
    Config,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfig {
    #[serde(rename = "apiVersion", default)]
    pub api_version: ApiVersion,
    #[serde(default)]
    pub kind: Kind,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub contexts: Vec<Context>,
    #[serde(default)]
    pub current_context: String,
    #[serde(default)]
    pub preferences: BTreeMap<String, YamlValue>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl KubeConfig {
    pub fn read_from(path: impl AsRef<Path>) -> Result<KubeConfig, ConfigError> {
        let path = path.as_ref();
        let file = fs::OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?;
        serde_yaml::from_reader(file).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}
// endregion
