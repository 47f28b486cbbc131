//! Turning a ServiceAccount into bearer-token credentials.

use std::collections::BTreeMap;

use rand::Rng;
use tokio::time;
use tracing::{debug, info};

use crate::cluster::{
    ClusterClient, ServiceAccount, ServiceAccountRef, TokenSecret, SERVICE_ACCOUNT_NAME_ANNOTATION,
    SERVICE_ACCOUNT_TOKEN_TYPE,
};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::prompt::Confirmation;
use crate::resolve::ClusterEndpoint;

const TOKEN_KEY: &str = "token";
const CA_KEY: &str = "ca.crt";
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 5;

/// Everything needed to authenticate as the ServiceAccount through one Secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedCredential {
    pub username: String,
    pub ca_data: Vec<u8>,
    pub bearer_token: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquisition {
    /// One per referenced Secret, in reference order.
    pub credentials: Vec<DerivedCredential>,
    /// Name of the Secret created for an account that had none.
    pub created_secret: Option<String>,
}

/// Collect a credential for every Secret the ServiceAccount references.
///
/// Every Secret is fetched and checked before anything is returned, so a
/// single bad reference fails the whole account.
pub async fn acquire_credentials<C: ClusterClient>(
    client: &C,
    account: &ServiceAccountRef,
    endpoint: &ClusterEndpoint,
    options: &Options,
    prompt: &dyn Confirmation,
) -> Result<Acquisition> {
    let mut sa = client
        .get_service_account(&account.namespace, &account.name)
        .await?;
    debug!(
        namespace = %account.namespace,
        name = %account.name,
        secrets = ?sa.secrets,
        "found service account"
    );

    let mut created_secret = None;
    if sa.secrets.is_empty() {
        let secret_name = create_token_secret(client, &sa, options, prompt).await?;
        wait_for_token(client, &account.namespace, &secret_name, options).await?;
        sa = client
            .get_service_account(&account.namespace, &account.name)
            .await?;
        created_secret = Some(secret_name);
    }

    let mut credentials = Vec::with_capacity(sa.secrets.len());
    for secret_name in &sa.secrets {
        let secret = client.get_secret(&account.namespace, secret_name).await?;
        credentials.push(credential_from(&secret, &account.name, endpoint)?);
    }

    Ok(Acquisition {
        credentials,
        created_secret,
    })
}

async fn create_token_secret<C: ClusterClient>(
    client: &C,
    sa: &ServiceAccount,
    options: &Options,
    prompt: &dyn Confirmation,
) -> Result<String> {
    if options.strict_secret_existence {
        return Err(Error::NoUsableSecret {
            namespace: sa.namespace.clone(),
            name: sa.name.clone(),
        });
    }

    if options.interactive_auto_create {
        let question = format!(
            "ServiceAccount {}/{} has no secrets. Create a token secret for it?",
            sa.namespace, sa.name
        );
        if !prompt.confirm(&question)? {
            return Err(Error::Declined {
                namespace: sa.namespace.clone(),
                name: sa.name.clone(),
            });
        }
    }

    let secret = token_secret_for(sa, &mut rand::rng());
    client.create_secret(&secret).await?;

    let updated = ServiceAccount {
        secrets: vec![secret.name.clone()],
        ..sa.clone()
    };
    client.update_service_account(&updated).await?;
    info!(
        namespace = %sa.namespace,
        name = %sa.name,
        secret = %secret.name,
        "attached new token secret"
    );

    Ok(secret.name)
}

/// Wait until the token controller has written a token into `name`.
async fn wait_for_token<C: ClusterClient>(
    client: &C,
    namespace: &str,
    name: &str,
    options: &Options,
) -> Result<()> {
    time::timeout(options.token_timeout, poll_for_token(client, namespace, name, options))
        .await
        .map_err(|_elapsed| Error::TokenNotIssued {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            waited: options.token_timeout,
        })?
}

async fn poll_for_token<C: ClusterClient>(
    client: &C,
    namespace: &str,
    name: &str,
    options: &Options,
) -> Result<()> {
    loop {
        let secret = client.get_secret(namespace, name).await?;
        if secret.data.get(TOKEN_KEY).is_some_and(|token| !token.is_empty()) {
            return Ok(());
        }
        debug!(%namespace, %name, "waiting for token");
        time::sleep(options.token_poll_interval).await;
    }
}

/// `<sa>-secret-xxxxx`, an empty token Secret the token controller will fill.
fn token_secret_for(sa: &ServiceAccount, rng: &mut impl Rng) -> TokenSecret {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    TokenSecret {
        name: format!("{}-secret-{suffix}", sa.name),
        namespace: sa.namespace.clone(),
        type_: SERVICE_ACCOUNT_TOKEN_TYPE.to_owned(),
        annotations: BTreeMap::from([(
            SERVICE_ACCOUNT_NAME_ANNOTATION.to_owned(),
            sa.name.clone(),
        )]),
        data: BTreeMap::new(),
    }
}

fn credential_from(
    secret: &TokenSecret,
    username: &str,
    endpoint: &ClusterEndpoint,
) -> Result<DerivedCredential> {
    if secret.type_ != SERVICE_ACCOUNT_TOKEN_TYPE {
        return Err(Error::WrongSecretType {
            name: secret.name.clone(),
            type_: secret.type_.clone(),
        });
    }
    let token = secret
        .data
        .get(TOKEN_KEY)
        .ok_or_else(|| Error::MissingTokenField {
            name: secret.name.clone(),
        })?;
    let bearer_token = String::from_utf8(token.clone()).map_err(|source| Error::InvalidToken {
        name: secret.name.clone(),
        source,
    })?;
    Ok(DerivedCredential {
        username: username.to_owned(),
        ca_data: secret.data.get(CA_KEY).cloned().unwrap_or_default(),
        bearer_token,
        host: endpoint.host.clone(),
    })
}
