//! Materialize standalone kubeconfig files that authenticate as a
//! ServiceAccount, from the token Secrets the ServiceAccount references.

pub mod clean;
pub mod cluster;
pub mod direct;
pub mod emit;
pub mod error;
pub mod options;
pub mod prompt;
pub mod resolve;
pub mod token;
pub mod tracing_support;

pub use cluster::{ClusterClient, KubeClusterClient, ServiceAccount, ServiceAccountRef, TokenSecret};
pub use emit::{destination_path, emit, OutputFormat};
pub use error::{ConfigError, Error, Result};
pub use options::{FlagPrecedence, Options};
pub use prompt::{Confirmation, TerminalPrompt};
pub use resolve::{kube_dir, resolve_source, ClusterEndpoint, ConfigSource, ConnectionConfig};
pub use token::{acquire_credentials, Acquisition, DerivedCredential};
