//! Writing a derived credential out as a standalone kubeconfig.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::clean::{ClusterSpec, ContextSpec, KubeConfig, UserSpec};
use crate::direct;
use crate::error::{Error, Result};
use crate::resolve::DEFAULT_NAMESPACE;
use crate::token::DerivedCredential;

pub const CLUSTER_NAME: &str = "my-cluster";
pub const CONTEXT_NAME: &str = "my-context";
pub const EXTENSION: &str = "kubeconfig";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Yaml => f.write_str("yaml"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// `<dir>/<sa>.kubeconfig` for the first credential, `<dir>/<sa>-<n>.kubeconfig`
/// for the n-th after that.
pub fn destination_path(dir: &Path, sa_name: &str, index: usize) -> PathBuf {
    let file_name = match index {
        0 => format!("{sa_name}.{EXTENSION}"),
        i => format!("{sa_name}-{}.{EXTENSION}", i + 1),
    };
    dir.join(file_name)
}

/// One cluster, one context, one token user.
pub fn build_document(cred: &DerivedCredential) -> direct::KubeConfig {
    let cluster = ClusterSpec {
        certificate_authority_data: (!cred.ca_data.is_empty())
            .then(|| STANDARD.encode(&cred.ca_data)),
        certificate_authority: None,
        insecure_skip_tls_verify: None,
        server: cred.host.clone(),
        extensions: None,
    };
    // The context namespace is always `default`, whatever namespace the
    // ServiceAccount lives in.
    let context = ContextSpec {
        cluster: CLUSTER_NAME.to_owned(),
        namespace: Some(DEFAULT_NAMESPACE.to_owned()),
        user: cred.username.clone(),
        extensions: None,
    };
    let user = UserSpec::Token {
        token: cred.bearer_token.clone(),
    };

    KubeConfig {
        clusters: BTreeMap::from([(CLUSTER_NAME.to_owned(), cluster)]),
        contexts: BTreeMap::from([(CONTEXT_NAME.to_owned(), context)]),
        users: BTreeMap::from([(cred.username.clone(), user)]),
        current_context: CONTEXT_NAME.to_owned(),
        preferences: BTreeMap::new(),
    }
    .into()
}

pub fn render(document: &direct::KubeConfig, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(document).map_err(Error::Yaml),
        OutputFormat::Json => serde_json::to_string_pretty(document)
            .map(|mut json| {
                json.push('\n');
                json
            })
            .map_err(Error::Json),
    }
}

/// Write the kubeconfig for `cred` to `destination`, replacing any existing file.
pub fn emit(cred: &DerivedCredential, destination: &Path, format: OutputFormat) -> Result<()> {
    let rendered = render(&build_document(cred), format)?;
    let write_err = |source: std::io::Error| Error::Write {
        path: destination.to_owned(),
        source,
    };

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(destination).map_err(write_err)?;
    file.write_all(rendered.as_bytes()).map_err(write_err)?;
    debug!(path = %destination.display(), %format, "wrote kubeconfig");

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    use super::*;

    fn build_bot() -> DerivedCredential {
        DerivedCredential {
            username: "build-bot".into(),
            ca_data: b"CERTBYTES".to_vec(),
            bearer_token: "XYZ".into(),
            host: "https://10.0.0.1:6443".into(),
        }
    }

    #[test]
    fn destination_naming() {
        let dir = Path::new("/work");
        assert_eq!(destination_path(dir, "build-bot", 0), Path::new("/work/build-bot.kubeconfig"));
        assert_eq!(destination_path(dir, "build-bot", 1), Path::new("/work/build-bot-2.kubeconfig"));
        assert_eq!(destination_path(dir, "build-bot", 2), Path::new("/work/build-bot-3.kubeconfig"));
    }

    #[test]
    fn json_document_shape() {
        let rendered = render(&build_document(&build_bot()), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_json_eq!(
            value,
            json!({
                "apiVersion": "v1",
                "kind": "Config",
                "clusters": [{
                    "name": "my-cluster",
                    "cluster": {
                        "certificate-authority-data": STANDARD.encode("CERTBYTES"),
                        "server": "https://10.0.0.1:6443"
                    }
                }],
                "contexts": [{
                    "name": "my-context",
                    "context": { "cluster": "my-cluster", "namespace": "default", "user": "build-bot" }
                }],
                "current-context": "my-context",
                "preferences": {},
                "users": [{ "name": "build-bot", "user": { "token": "XYZ" } }]
            })
        );
        assert!(rendered.contains("\n  \"kind\": \"Config\""));
    }

    #[test]
    fn yaml_and_json_agree() {
        let document = build_document(&build_bot());
        let yaml = render(&document, OutputFormat::Yaml).unwrap();
        let json = render(&document, OutputFormat::Json).unwrap();

        let from_yaml: direct::KubeConfig = serde_yaml::from_str(&yaml).unwrap();
        let from_json: direct::KubeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(from_yaml, from_json);
        assert_eq!(from_yaml, document);
    }

    #[test]
    fn empty_ca_is_omitted() {
        let cred = DerivedCredential {
            ca_data: Vec::new(),
            ..build_bot()
        };

        let yaml = render(&build_document(&cred), OutputFormat::Yaml).unwrap();

        assert!(!yaml.contains("certificate-authority-data"));
    }

    #[test]
    fn emit_writes_yaml_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = destination_path(dir.path(), "build-bot", 0);
        fs::write(&path, "x".repeat(4096)).unwrap();

        emit(&build_bot(), &path, OutputFormat::Yaml).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("server: https://10.0.0.1:6443"));
        assert!(written.contains("token: XYZ"));
        assert!(written.contains(&format!("certificate-authority-data: {}", STANDARD.encode("CERTBYTES"))));
        assert!(written.contains("current-context: my-context"));
        assert!(!written.contains("xxxx"));
    }

    #[cfg(unix)]
    #[test]
    fn emitted_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sa.kubeconfig");

        emit(&build_bot(), &path, OutputFormat::Json).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn unwritable_destination_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("sa.kubeconfig");

        let err = emit(&build_bot(), &path, OutputFormat::Yaml).unwrap_err();

        assert!(matches!(err, Error::Write { .. }));
    }
}
