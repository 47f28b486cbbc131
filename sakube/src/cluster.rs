//! The four cluster calls the tool needs, behind a trait so the workflow can
//! run against something other than a live API server.

use std::collections::BTreeMap;
use std::path::Path;

use k8s_openapi::api::core::v1::{ObjectReference, Secret, ServiceAccount as KubeServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::PostParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::{debug, info};

use crate::error::{ConfigError, Error, Result};

/// Secret type the API server fills with a ServiceAccount token.
pub const SERVICE_ACCOUNT_TOKEN_TYPE: &str = "kubernetes.io/service-account-token";

/// Annotation binding a token Secret to its ServiceAccount.
pub const SERVICE_ACCOUNT_NAME_ANNOTATION: &str = "kubernetes.io/service-account.name";

/// The ServiceAccount whose credentials are extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccountRef {
    pub name: String,
    pub namespace: String,
}

/// A fetched ServiceAccount and the names of the Secrets it references, in
/// server order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub name: String,
    pub namespace: String,
    pub secrets: Vec<String>,
}

/// A Secret with its data already base64-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSecret {
    pub name: String,
    pub namespace: String,
    pub type_: String,
    pub annotations: BTreeMap<String, String>,
    pub data: BTreeMap<String, Vec<u8>>,
}

#[allow(async_fn_in_trait)]
pub trait ClusterClient {
    async fn get_service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<TokenSecret>;

    async fn create_secret(&self, secret: &TokenSecret) -> Result<()>;

    /// Replace the account's secret references with `account.secrets`.
    async fn update_service_account(&self, account: &ServiceAccount) -> Result<()>;
}

/// [`ClusterClient`] backed by a real API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the kubeconfig at `path`, using its current context.
    pub async fn connect(path: &Path) -> Result<Self, ConfigError> {
        let kubeconfig = Kubeconfig::read_from(path).map_err(ConfigError::Kubeconfig)?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(ConfigError::Kubeconfig)?;
        debug!(cluster_url = %config.cluster_url, "connecting");
        let client = Client::try_from(config).map_err(ConfigError::Client)?;
        Ok(Self::new(client))
    }

    fn service_accounts(&self, namespace: &str) -> Api<KubeServiceAccount> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn api_error(
    err: kube::Error,
    verb: &str,
    kind: &'static str,
    namespace: &str,
    name: &str,
) -> Error {
    match err {
        kube::Error::Api(response) if response.code == 404 => Error::NotFound {
            kind,
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        },
        err => Error::Api {
            action: format!("{verb} {kind} {namespace}/{name}"),
            source: Box::new(err),
        },
    }
}

impl ClusterClient for KubeClusterClient {
    async fn get_service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount> {
        let sa = self
            .service_accounts(namespace)
            .get(name)
            .await
            .map_err(|err| api_error(err, "get", "ServiceAccount", namespace, name))?;
        Ok(service_account_from(sa, namespace))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<TokenSecret> {
        let secret = self
            .secrets(namespace)
            .get(name)
            .await
            .map_err(|err| api_error(err, "get", "Secret", namespace, name))?;
        Ok(token_secret_from(secret, namespace))
    }

    async fn create_secret(&self, secret: &TokenSecret) -> Result<()> {
        self.secrets(&secret.namespace)
            .create(&PostParams::default(), &Secret::from(secret))
            .await
            .map_err(|err| api_error(err, "create", "Secret", &secret.namespace, &secret.name))?;
        info!(namespace = %secret.namespace, name = %secret.name, "created secret");
        Ok(())
    }

    async fn update_service_account(&self, account: &ServiceAccount) -> Result<()> {
        let api = self.service_accounts(&account.namespace);
        let fail = |err: kube::Error| {
            api_error(err, "update", "ServiceAccount", &account.namespace, &account.name)
        };

        // Replace on top of the live object so the resourceVersion matches.
        let mut live = api.get(&account.name).await.map_err(fail)?;
        live.secrets = Some(
            account
                .secrets
                .iter()
                .map(|name| ObjectReference {
                    name: Some(name.clone()),
                    ..ObjectReference::default()
                })
                .collect(),
        );
        api.replace(&account.name, &PostParams::default(), &live)
            .await
            .map_err(fail)?;
        info!(
            namespace = %account.namespace,
            name = %account.name,
            secrets = ?account.secrets,
            "updated service account"
        );
        Ok(())
    }
}

fn service_account_from(sa: KubeServiceAccount, namespace: &str) -> ServiceAccount {
    ServiceAccount {
        name: sa.metadata.name.unwrap_or_default(),
        namespace: sa.metadata.namespace.unwrap_or_else(|| namespace.to_owned()),
        secrets: sa
            .secrets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|reference| reference.name)
            .collect(),
    }
}

fn token_secret_from(secret: Secret, namespace: &str) -> TokenSecret {
    TokenSecret {
        name: secret.metadata.name.unwrap_or_default(),
        namespace: secret.metadata.namespace.unwrap_or_else(|| namespace.to_owned()),
        type_: secret.type_.unwrap_or_default(),
        annotations: secret.metadata.annotations.unwrap_or_default(),
        data: secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, ByteString(bytes))| (key, bytes))
            .collect(),
    }
}

impl From<&TokenSecret> for Secret {
    fn from(secret: &TokenSecret) -> Self {
        Secret {
            metadata: ObjectMeta {
                name: Some(secret.name.clone()),
                namespace: Some(secret.namespace.clone()),
                annotations: (!secret.annotations.is_empty()).then(|| secret.annotations.clone()),
                ..ObjectMeta::default()
            },
            type_: Some(secret.type_.clone()),
            data: (!secret.data.is_empty()).then(|| {
                secret
                    .data
                    .iter()
                    .map(|(key, value)| (key.clone(), ByteString(value.clone())))
                    .collect()
            }),
            ..Secret::default()
        }
    }
}
