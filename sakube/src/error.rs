//! Error handling in [`sakube`][crate]
use std::path::PathBuf;
use std::string::FromUtf8Error;
use std::time::Duration;

use thiserror::Error;

/// A boxed error from a cluster client implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every way a run can fail. All of them end the run with exit status 1.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing command-line input
    #[error("{0}")]
    Usage(String),

    /// The cluster connection config could not be located, loaded or used
    #[error("failed to resolve the cluster connection config")]
    ConfigResolution(#[from] ConfigError),

    /// A ServiceAccount or Secret does not exist
    #[error("{kind} not found: {namespace}/{name}")]
    NotFound {
        /// `ServiceAccount` or `Secret`
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// The ServiceAccount references no Secrets and auto-creation is off
    #[error("ServiceAccount {namespace}/{name} has no secrets (rerun with --create-secret to create one)")]
    NoUsableSecret { namespace: String, name: String },

    /// The operator refused to create a Secret
    #[error("no secret was created for ServiceAccount {namespace}/{name}")]
    Declined { namespace: String, name: String },

    /// The confirmation prompt could not be shown or read
    #[error("failed to read confirmation")]
    Prompt(#[source] dialoguer::Error),

    /// A referenced Secret is not a ServiceAccount token
    #[error("secret {name} has type {type_:?}, expected kubernetes.io/service-account-token")]
    WrongSecretType { name: String, type_: String },

    /// A token Secret without a `token` key
    #[error("secret {name} has no token field")]
    MissingTokenField { name: String },

    /// A created Secret was still without a token when the wait ran out
    #[error("secret {namespace}/{name} was not issued a token within {waited:?}")]
    TokenNotIssued {
        namespace: String,
        name: String,
        waited: Duration,
    },

    /// The token bytes are not valid UTF-8
    #[error("secret {name} holds a token that is not valid UTF-8")]
    InvalidToken {
        name: String,
        #[source]
        source: FromUtf8Error,
    },

    /// Any other failed cluster request
    #[error("failed to {action}")]
    Api {
        action: String,
        #[source]
        source: BoxError,
    },

    /// The kubeconfig could not be rendered as JSON
    #[error("failed to serialize kubeconfig as JSON")]
    Json(#[source] serde_json::Error),

    /// The kubeconfig could not be rendered as YAML
    #[error("failed to serialize kubeconfig as YAML")]
    Yaml(#[source] serde_yaml::Error),

    /// The kubeconfig file could not be written
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while locating or interpreting the operator's own kubeconfig.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the current user's home directory")]
    HomeDirectory,

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("kubeconfig has no current-context")]
    NoCurrentContext,

    #[error("current-context {0:?} is not defined")]
    UnknownContext(String),

    #[error("cluster {0:?} is not defined")]
    UnknownCluster(String),

    #[error("failed to read certificate authority {}", path.display())]
    ReadCertificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("certificate-authority-data of {server} is not valid base64")]
    DecodeCertificate {
        server: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("failed to load client configuration")]
    Kubeconfig(#[source] kube::config::KubeconfigError),

    #[error("failed to create cluster client")]
    Client(#[source] kube::Error),
}

/// Convenient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
