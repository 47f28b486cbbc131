//! The build-bot scenario, from the operator's kubeconfig to the files on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sakube::cluster::SERVICE_ACCOUNT_TOKEN_TYPE;
use sakube::{
    acquire_credentials, destination_path, emit, ClusterClient, ConfigSource, Confirmation, ConnectionConfig, Error,
    Options, OutputFormat, Result, ServiceAccount, ServiceAccountRef, TokenSecret,
};

const OPERATOR_KUBECONFIG: &str = "apiVersion: v1
kind: Config
clusters:
- name: lab
  cluster:
    server: https://10.0.0.1:6443
contexts:
- name: admin@lab
  context:
    cluster: lab
    namespace: ci
    user: admin
current-context: admin@lab
users:
- name: admin
  user:
    client-certificate-data: Y2VydA==
    client-key-data: a2V5
";

struct Cluster {
    secrets: Vec<&'static str>,
}

fn secret(name: &str, token: &str) -> TokenSecret {
    TokenSecret {
        name: name.to_owned(),
        namespace: "ci".to_owned(),
        type_: SERVICE_ACCOUNT_TOKEN_TYPE.to_owned(),
        annotations: BTreeMap::new(),
        data: BTreeMap::from([
            ("token".to_owned(), token.as_bytes().to_vec()),
            ("ca.crt".to_owned(), b"CERTBYTES".to_vec()),
        ]),
    }
}

impl ClusterClient for Cluster {
    async fn get_service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount> {
        if name != "build-bot" || namespace != "ci" {
            return Err(Error::NotFound {
                kind: "ServiceAccount",
                namespace: namespace.to_owned(),
                name: name.to_owned(),
            });
        }
        Ok(ServiceAccount {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            secrets: self.secrets.iter().map(|s| s.to_string()).collect(),
        })
    }

    async fn get_secret(&self, _namespace: &str, name: &str) -> Result<TokenSecret> {
        Ok(match name {
            "build-bot-token-abcde" => secret(name, "XYZ"),
            _ => secret(name, "SECOND"),
        })
    }

    async fn create_secret(&self, _secret: &TokenSecret) -> Result<()> {
        unreachable!("build-bot already has a secret")
    }

    async fn update_service_account(&self, _account: &ServiceAccount) -> Result<()> {
        unreachable!("build-bot already has a secret")
    }
}

struct NeverAsked;

impl Confirmation for NeverAsked {
    fn confirm(&self, _question: &str) -> Result<bool> {
        panic!("no prompt expected")
    }
}

async fn run(dir: &Path, cluster: &Cluster, name: &str, format: OutputFormat) -> Result<Vec<PathBuf>> {
    let config_path = dir.join("config");
    fs::write(&config_path, OPERATOR_KUBECONFIG).unwrap();

    let connection = ConnectionConfig::load(ConfigSource::Env(config_path))?;
    let account = ServiceAccountRef {
        name: name.to_owned(),
        namespace: connection.namespace_or_default(None),
    };
    let acquired =
        acquire_credentials(cluster, &account, &connection.endpoint, &Options::default(), &NeverAsked).await?;

    let mut written = Vec::new();
    for (index, credential) in acquired.credentials.iter().enumerate() {
        let destination = destination_path(dir, &account.name, index);
        emit(credential, &destination, format)?;
        written.push(destination);
    }
    Ok(written)
}

#[tokio::test]
async fn writes_build_bot_kubeconfig() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = Cluster {
        secrets: vec!["build-bot-token-abcde"],
    };

    let written = run(dir.path(), &cluster, "build-bot", OutputFormat::Yaml).await.unwrap();

    assert_eq!(written.len(), 1);
    assert!(written[0].ends_with("build-bot.kubeconfig"));
    let yaml = fs::read_to_string(&written[0]).unwrap();
    assert!(yaml.contains("server: https://10.0.0.1:6443"));
    assert!(yaml.contains("token: XYZ"));
    assert!(yaml.contains(&format!("certificate-authority-data: {}", STANDARD.encode("CERTBYTES"))));
    assert!(yaml.contains("current-context: my-context"));
}

#[tokio::test]
async fn one_file_per_secret() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = Cluster {
        secrets: vec!["build-bot-token-abcde", "build-bot-token-fghij"],
    };

    let written = run(dir.path(), &cluster, "build-bot", OutputFormat::Json).await.unwrap();

    assert_eq!(written.len(), 2);
    assert!(written[1].ends_with("build-bot-2.kubeconfig"));
    let second: serde_json::Value = serde_json::from_str(&fs::read_to_string(&written[1]).unwrap()).unwrap();
    assert_eq!(second["users"][0]["user"]["token"], "SECOND");
    assert_eq!(second["clusters"][0]["cluster"]["server"], "https://10.0.0.1:6443");
}

#[tokio::test]
async fn unknown_account_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = Cluster {
        secrets: vec!["build-bot-token-abcde"],
    };

    let err = run(dir.path(), &cluster, "ghost", OutputFormat::Yaml).await.unwrap_err();

    assert!(matches!(err, Error::NotFound { kind: "ServiceAccount", .. }));
    let kubeconfigs = fs::read_dir(dir.path())
        .unwrap()
        .filter(|entry| entry.as_ref().unwrap().path().extension().is_some_and(|ext| ext == "kubeconfig"))
        .count();
    assert_eq!(kubeconfigs, 0);
}
